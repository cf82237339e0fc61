//! Pathtrace - enter/exit call-path timing
//!
//! Mark the entry and exit of named sections; when the outermost section of
//! a context exits, the time spent in every path is printed, ranked
//! shortest path first:
//!
//! ```text
//! Aggregates. Node: /ProgramStart Time: 1.000000 s. Pct: 100.00%
//! Aggregates. Node: /ProgramStart/Task 1 Time: 0.100000 s. Pct: 10.00%
//! Aggregates. Node: /ProgramStart/Task 2 Time: 0.900000 s. Pct: 90.00%
//! ```
//!
//! # Three ways in
//!
//! - Thread the immutable [`TraceState`] through your own code:
//!   `state = state.push("Task")?; ... state = state.pop()?;`
//! - Hold a [`Tracer`] over a [`ContextStore`]; use [`ScopedStore`] when work
//!   is isolated per task rather than per OS thread.
//! - Call the free functions here, which use a per-thread [`Tracer`] over
//!   [`ThreadLocalStore`].
//!
//! ```
//! pathtrace::enter_default("ProgramStart")?;
//! pathtrace::enter_default("Task 1")?;
//! pathtrace::exit_default()?;
//! pathtrace::exit_default()?; // prints the summary
//! # Ok::<(), pathtrace::TraceError>(())
//! ```

#![forbid(unsafe_code)]

/// RAII section guards
pub mod guard;

/// Context stores
pub mod store;

/// Explicit tracer handle
pub mod tracer;

pub use guard::SectionGuard;
pub use pathtrace_core::{
    Aggregate, AggregateTable, ManualClock, MemorySink, MonotonicClock, PrefixMap, Result,
    Segment, StdoutSink, Summary, SummaryLine, SummarySink, TotalBasis, TraceClock,
    TraceConfig, TraceError, TracePath, TraceState, TracingSink,
};
pub use store::{ContextStore, ExecutionUnitId, ScopedStore, ThreadLocalStore, UnitScope};
pub use tracer::{RootFactory, Tracer};

use std::cell::RefCell;

thread_local! {
    static THREAD_TRACER: RefCell<Tracer<ThreadLocalStore>> =
        RefCell::new(Tracer::new(ThreadLocalStore));
}

// The cell is released before `f` runs so sinks and root factories may call
// back into the free functions, including `configure`.
fn with_tracer<R>(f: impl FnOnce(&Tracer<ThreadLocalStore>) -> R) -> R {
    let tracer = THREAD_TRACER.with(|tracer| tracer.borrow().clone());
    f(&tracer)
}

/// Set how this thread creates roots for contexts it has not seen yet.
/// Contexts that already exist keep their lineage.
pub fn configure(factory: RootFactory) {
    THREAD_TRACER.with(|tracer| {
        *tracer.borrow_mut() = Tracer::with_factory(ThreadLocalStore, factory);
    });
}

/// Enter `section` in the named `context` on this thread.
pub fn enter(context: &str, section: &str) -> Result<()> {
    with_tracer(|tracer| tracer.enter(context, section))
}

/// Leave the innermost section of `context` on this thread.
pub fn exit(context: &str) -> Result<()> {
    with_tracer(|tracer| tracer.exit(context))
}

/// Enter `section` in this thread's default context.
pub fn enter_default(section: &str) -> Result<()> {
    with_tracer(|tracer| tracer.enter_default(section))
}

/// Leave the innermost section of this thread's default context.
pub fn exit_default() -> Result<()> {
    with_tracer(Tracer::exit_default)
}

/// Current state of `context` on this thread.
pub fn state(context: &str) -> TraceState {
    with_tracer(|tracer| tracer.state(context))
}

/// Forget every context on this thread.
pub fn clear_all() {
    with_tracer(Tracer::clear_all);
}
