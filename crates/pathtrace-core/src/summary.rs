//! Ranked summaries of an aggregate table and where they are written.
//!
//! Each line reads:
//!
//! ```text
//! Aggregates. Node: /ProgramStart/Task 1 Time: 0.100000 s. Pct: 10.00%
//! ```
//!
//! Lines are ordered like the table (shortest path first). Percentages are
//! relative to a total picked by [`TotalBasis`].

use crate::aggregate::AggregateTable;
use crate::config::TotalBasis;
use crate::path::PrefixMap;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// One rendered summary entry.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryLine {
    /// Path rendered through the lineage's prefix map
    pub path: String,
    /// Accumulated seconds
    pub seconds: f64,
    /// Share of the total, in percent
    pub percent: f64,
    /// Completed visits
    pub visits: u64,
}

impl fmt::Display for SummaryLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Aggregates. Node: {} Time: {:.6} s. Pct: {}%",
            self.path,
            self.seconds,
            format_grouped(self.percent, 2)
        )
    }
}

/// Snapshot of a table ready to print.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    /// Lines in path order
    pub lines: Vec<SummaryLine>,
    /// Value percentages are relative to
    pub total: f64,
}

impl Summary {
    /// Build a summary from `table`, rendering paths with `prefixes`.
    pub fn from_table(table: &AggregateTable, prefixes: &PrefixMap, basis: TotalBasis) -> Self {
        let entries = table.entries();
        let total = match basis {
            TotalBasis::FirstSorted => entries.first().map_or(0.0, |(_, a)| a.seconds),
            TotalBasis::RootLevelSum => table.root_total(),
        };

        let lines = entries
            .into_iter()
            .map(|(path, aggregate)| SummaryLine {
                path: path.render(prefixes),
                seconds: aggregate.seconds,
                percent: percent_of(aggregate.seconds, total),
                visits: aggregate.visits,
            })
            .collect();

        Self { lines, total }
    }

    /// True when there is nothing to print
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Write every line to `sink`.
    pub fn emit(&self, sink: &dyn SummarySink) {
        for line in &self.lines {
            sink.emit(&line.to_string());
        }
    }
}

fn percent_of(seconds: f64, total: f64) -> f64 {
    if total > 0.0 {
        seconds / total * 100.0
    } else {
        0.0
    }
}

/// Format with `decimals` places and `,` between thousands groups.
pub fn format_grouped(value: f64, decimals: usize) -> String {
    let plain = format!("{value:.decimals$}");
    let (sign, unsigned) = match plain.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", plain.as_str()),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };
    if !int_part.bytes().all(|b| b.is_ascii_digit()) {
        return plain;
    }

    let mut grouped = String::with_capacity(plain.len() + int_part.len() / 3);
    grouped.push_str(sign);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if let Some(frac) = frac_part {
        grouped.push('.');
        grouped.push_str(frac);
    }
    grouped
}

/// Destination for summary lines.
pub trait SummarySink: Send + Sync {
    /// Write one line
    fn emit(&self, line: &str);
}

/// Prints lines to standard output.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutSink;

impl SummarySink for StdoutSink {
    fn emit(&self, line: &str) {
        println!("{line}");
    }
}

/// Routes lines through `tracing` at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl SummarySink for TracingSink {
    fn emit(&self, line: &str) {
        tracing::info!(target: "pathtrace::summary", "{line}");
    }
}

/// Keeps lines in memory. Clones share the buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    /// Empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines written so far
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    /// Remove and return the lines written so far
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.lines.lock())
    }
}

impl SummarySink for MemorySink {
    fn emit(&self, line: &str) {
        self.lines.lock().push(line.to_string());
    }
}
