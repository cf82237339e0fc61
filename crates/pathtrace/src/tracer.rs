//! Explicit tracer handle.
//!
//! A [`Tracer`] pairs a [`ContextStore`] with a [`RootFactory`]. Each call
//! reads the current state of one context, applies one transition and writes
//! the successor back.

use crate::guard::SectionGuard;
use crate::store::ContextStore;
use pathtrace_core::{
    AggregateTable, MonotonicClock, PrefixMap, Result, StdoutSink, SummarySink, TraceClock,
    TraceConfig, TraceState,
};
use std::fmt;
use std::sync::Arc;

/// Recipe for the root state of a new context.
///
/// Every context gets its own aggregate table unless one is shared
/// explicitly with [`RootFactory::shared_table`].
#[derive(Clone)]
pub struct RootFactory {
    config: TraceConfig,
    prefixes: PrefixMap,
    clock: Arc<dyn TraceClock>,
    sink: Arc<dyn SummarySink>,
    shared_table: Option<AggregateTable>,
}

impl RootFactory {
    /// Factory with default config, stdout summaries and a monotonic clock.
    pub fn new() -> Self {
        Self {
            config: TraceConfig::default(),
            prefixes: PrefixMap::new(),
            clock: Arc::new(MonotonicClock::new()),
            sink: Arc::new(StdoutSink),
            shared_table: None,
        }
    }

    /// Use `config` for new roots
    pub fn config(mut self, config: TraceConfig) -> Self {
        self.config = config;
        self
    }

    /// Render namespaces through `prefixes`
    pub fn prefixes(mut self, prefixes: PrefixMap) -> Self {
        self.prefixes = prefixes;
        self
    }

    /// Timestamp segments with `clock`
    pub fn clock(mut self, clock: Arc<dyn TraceClock>) -> Self {
        self.clock = clock;
        self
    }

    /// Write summaries to `sink`
    pub fn sink(mut self, sink: Arc<dyn SummarySink>) -> Self {
        self.sink = sink;
        self
    }

    /// Make every root created by this factory aggregate into `table`.
    pub fn shared_table(mut self, table: AggregateTable) -> Self {
        self.shared_table = Some(table);
        self
    }

    /// Configuration applied to new roots
    pub fn trace_config(&self) -> &TraceConfig {
        &self.config
    }

    /// Build a fresh root state.
    pub fn create(&self) -> TraceState {
        TraceState::builder()
            .config(self.config.clone())
            .prefixes(self.prefixes.clone())
            .clock(Arc::clone(&self.clock))
            .sink(Arc::clone(&self.sink))
            .aggregate_table(self.shared_table.clone().unwrap_or_default())
            .build()
    }
}

impl Default for RootFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RootFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RootFactory")
            .field("config", &self.config)
            .field("prefixes", &self.prefixes)
            .field("shared_table", &self.shared_table.is_some())
            .finish_non_exhaustive()
    }
}

/// Enter/exit API over a context store.
#[derive(Debug, Clone)]
pub struct Tracer<S> {
    store: S,
    factory: RootFactory,
}

impl<S: ContextStore> Tracer<S> {
    /// Tracer over `store` with a default [`RootFactory`].
    pub fn new(store: S) -> Self {
        Self::with_factory(store, RootFactory::new())
    }

    /// Tracer over `store` creating roots with `factory`.
    pub fn with_factory(store: S, factory: RootFactory) -> Self {
        Self { store, factory }
    }

    /// Underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Root factory for new contexts
    pub fn factory(&self) -> &RootFactory {
        &self.factory
    }

    /// Context id used by the default-context calls
    pub fn default_context(&self) -> &str {
        &self.factory.config.default_context
    }

    /// Current state of `context`, creating its root if needed.
    pub fn state(&self, context: &str) -> TraceState {
        self.store
            .get_or_insert_with(context, &|| self.factory.create())
    }

    /// Enter `section` in `context`, namespaced by the context id.
    pub fn enter(&self, context: &str, section: &str) -> Result<()> {
        let next = self.state(context).append_path_element(section, context)?;
        self.store.set(context, next);
        Ok(())
    }

    /// Leave the innermost section of `context`.
    pub fn exit(&self, context: &str) -> Result<()> {
        let next = self.state(context).pop()?;
        self.store.set(context, next);
        Ok(())
    }

    /// Enter `section` in the default context, without a namespace.
    pub fn enter_default(&self, section: &str) -> Result<()> {
        let context = self.default_context();
        let next = self.state(context).push(section)?;
        self.store.set(context, next);
        Ok(())
    }

    /// Leave the innermost section of the default context.
    pub fn exit_default(&self) -> Result<()> {
        self.exit(self.default_context())
    }

    /// Forget every context in the store.
    pub fn clear_all(&self) {
        self.store.clear_all();
    }

    /// Enter `section` in `context` and exit it when the guard drops.
    pub fn section(&self, context: &str, section: &str) -> Result<SectionGuard<'_, S>> {
        self.enter(context, section)?;
        Ok(SectionGuard::new(self, Some(context.to_string())))
    }

    /// Enter `section` in the default context and exit it when the guard drops.
    pub fn default_section(&self, section: &str) -> Result<SectionGuard<'_, S>> {
        self.enter_default(section)?;
        Ok(SectionGuard::new(self, None))
    }
}
