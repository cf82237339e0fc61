//! Pathtrace Core - immutable call-path trace states
//!
//! Callers mark entry and exit of named sections. Each transition returns a
//! new [`TraceState`]; the elapsed time of every exit is charged to the full
//! path that was open, in an [`AggregateTable`] shared by the whole lineage.
//! Popping back to the root prints a ranked [`Summary`].
//!
//! ```
//! use pathtrace_core::{MemorySink, TraceState};
//! use std::sync::Arc;
//!
//! let sink = MemorySink::new();
//! let root = TraceState::builder().sink(Arc::new(sink.clone())).build();
//!
//! let state = root.push("ProgramStart")?.push("Task 1")?;
//! let state = state.pop()?.pop()?;
//!
//! assert!(state.is_root());
//! assert_eq!(sink.lines().len(), 2);
//! # Ok::<(), pathtrace_core::TraceError>(())
//! ```
//!
//! This crate holds no global state; the context registry lives in the
//! `pathtrace` crate.

#![forbid(unsafe_code)]

/// Shared path → seconds table
pub mod aggregate;

/// Millisecond clock seam
pub mod clock;

/// Lineage configuration
pub mod config;

/// Error type
pub mod errors;

/// Segments, paths and prefix maps
pub mod path;

/// Immutable trace states and transitions
pub mod state;

/// Summary formatting and sinks
pub mod summary;

pub use aggregate::{Aggregate, AggregateTable};
pub use clock::{ManualClock, MonotonicClock, TraceClock};
pub use config::{TotalBasis, TraceConfig, DEFAULT_CONTEXT, DEFAULT_MAX_DEPTH};
pub use errors::{Result, TraceError};
pub use path::{PrefixMap, Segment, TracePath};
pub use state::{TraceState, TraceStateBuilder};
pub use summary::{
    format_grouped, MemorySink, StdoutSink, Summary, SummaryLine, SummarySink, TracingSink,
};
