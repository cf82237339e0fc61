//! Immutable trace states.
//!
//! A [`TraceState`] is a path plus a handle to its lineage: the prefix map,
//! aggregate table, configuration, clock and summary sink shared by every
//! state descended from one root. Transitions return a new state and never
//! touch the receiver; only the aggregate table is written, on `pop`.

use crate::aggregate::AggregateTable;
use crate::clock::{MonotonicClock, TraceClock};
use crate::config::TraceConfig;
use crate::errors::{Result, TraceError};
use crate::path::{PrefixMap, Segment, TracePath};
use crate::summary::{StdoutSink, Summary, SummarySink};
use std::backtrace::Backtrace;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Everything a lineage shares besides its path.
struct Lineage {
    prefixes: PrefixMap,
    table: AggregateTable,
    config: TraceConfig,
    clock: Arc<dyn TraceClock>,
    sink: Arc<dyn SummarySink>,
}

/// Immutable snapshot of a trace path plus its shared lineage.
///
/// Equality and hashing look at the path only.
#[derive(Clone)]
pub struct TraceState {
    path: TracePath,
    lineage: Arc<Lineage>,
}

impl TraceState {
    /// Root state with an empty prefix map and a fresh table.
    pub fn root() -> Self {
        Self::builder().build()
    }

    /// Root state sharing `table` and rendering with `prefixes`.
    pub fn with_shared(prefixes: PrefixMap, table: AggregateTable) -> Self {
        Self::builder()
            .prefixes(prefixes)
            .aggregate_table(table)
            .build()
    }

    /// Start configuring a root state
    pub fn builder() -> TraceStateBuilder {
        TraceStateBuilder::default()
    }

    /// Enter `name` with no namespace.
    pub fn push(&self, name: &str) -> Result<Self> {
        self.enter(None, name)
    }

    /// Enter `name` under `namespace`.
    pub fn append_path_element(&self, name: &str, namespace: &str) -> Result<Self> {
        self.enter(Some(namespace), name)
    }

    fn enter(&self, namespace: Option<&str>, name: &str) -> Result<Self> {
        let segment = Segment::new(
            namespace.map(str::to_string),
            name,
            self.lineage.clock.now_ms(),
        )?;

        let limit = self.lineage.config.max_depth;
        if self.path.len() > limit {
            tracing::warn!(
                depth = self.path.len(),
                limit,
                section = name,
                backtrace = %Backtrace::force_capture(),
                "path exceeds depth limit, push dropped; is a matching exit missing?"
            );
            return Ok(self.clone());
        }

        tracing::trace!(section = name, depth = self.path.len() + 1, "enter");
        Ok(self.with_path(self.path.pushed(segment)))
    }

    /// Leave the innermost section, charging its elapsed time to the
    /// current full path. Popping the last section prints the summary.
    pub fn pop(&self) -> Result<Self> {
        let current = self
            .path
            .last()
            .ok_or_else(|| TraceError::empty_path("pop"))?;
        let parent = self
            .path
            .popped()
            .ok_or_else(|| TraceError::empty_path("pop"))?;

        let elapsed_ms = self.lineage.clock.now_ms().saturating_sub(current.start_ms());
        let elapsed = elapsed_ms as f64 / 1000.0;
        let aggregate = self.lineage.table.record(&self.path, elapsed);
        tracing::trace!(
            section = current.name(),
            depth = parent.len(),
            elapsed,
            total = aggregate.seconds,
            "exit"
        );

        let next = self.with_path(parent);
        if next.is_root() && self.lineage.config.print_on_root_exit {
            next.print_summary();
        }
        Ok(next)
    }

    /// Summary of the shared table without printing it.
    pub fn summary(&self) -> Summary {
        Summary::from_table(
            &self.lineage.table,
            &self.lineage.prefixes,
            self.lineage.config.total_basis,
        )
    }

    /// Write the summary of the shared table to the lineage's sink.
    pub fn print_summary(&self) {
        let summary = self.summary();
        tracing::debug!(
            entries = summary.lines.len(),
            total = summary.total,
            "printing aggregate summary"
        );
        summary.emit(self.lineage.sink.as_ref());
    }

    /// Number of entered sections
    pub fn depth(&self) -> usize {
        self.path.len()
    }

    /// True when no section is entered
    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    /// Name of the innermost section.
    pub fn current_segment_name(&self) -> Result<&str> {
        self.path
            .last()
            .map(Segment::name)
            .ok_or_else(|| TraceError::empty_path("current_segment_name"))
    }

    /// Current path
    pub fn path(&self) -> &TracePath {
        &self.path
    }

    /// Prefix map shared by the lineage
    pub fn prefixes(&self) -> &PrefixMap {
        &self.lineage.prefixes
    }

    /// Aggregate table shared by the lineage
    pub fn aggregate_table(&self) -> &AggregateTable {
        &self.lineage.table
    }

    /// Configuration shared by the lineage
    pub fn config(&self) -> &TraceConfig {
        &self.lineage.config
    }

    fn with_path(&self, path: TracePath) -> Self {
        Self {
            path,
            lineage: Arc::clone(&self.lineage),
        }
    }
}

impl Default for TraceState {
    fn default() -> Self {
        Self::root()
    }
}

impl PartialEq for TraceState {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for TraceState {}

impl PartialOrd for TraceState {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TraceState {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.path.cmp(&other.path)
    }
}

impl Hash for TraceState {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}

impl fmt::Display for TraceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TraceState [path={}]", self.path.render(&self.lineage.prefixes))
    }
}

impl fmt::Debug for TraceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraceState")
            .field("path", &self.path)
            .field("config", &self.lineage.config)
            .finish_non_exhaustive()
    }
}

/// Builder for root states.
#[derive(Default)]
pub struct TraceStateBuilder {
    prefixes: Option<PrefixMap>,
    table: Option<AggregateTable>,
    config: Option<TraceConfig>,
    clock: Option<Arc<dyn TraceClock>>,
    sink: Option<Arc<dyn SummarySink>>,
}

impl TraceStateBuilder {
    /// Namespace display prefixes
    pub fn prefixes(mut self, prefixes: PrefixMap) -> Self {
        self.prefixes = Some(prefixes);
        self
    }

    /// Share an existing aggregate table
    pub fn aggregate_table(mut self, table: AggregateTable) -> Self {
        self.table = Some(table);
        self
    }

    /// Lineage configuration
    pub fn config(mut self, config: TraceConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Clock used to timestamp segments
    pub fn clock(mut self, clock: Arc<dyn TraceClock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Where summaries are written
    pub fn sink(mut self, sink: Arc<dyn SummarySink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Build the root state
    pub fn build(self) -> TraceState {
        let lineage = Lineage {
            prefixes: self.prefixes.unwrap_or_default(),
            table: self.table.unwrap_or_default(),
            config: self.config.unwrap_or_default(),
            clock: self
                .clock
                .unwrap_or_else(|| Arc::new(MonotonicClock::new())),
            sink: self.sink.unwrap_or_else(|| Arc::new(StdoutSink)),
        };
        TraceState {
            path: TracePath::root(),
            lineage: Arc::new(lineage),
        }
    }
}
