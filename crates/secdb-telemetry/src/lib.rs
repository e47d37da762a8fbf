//! SecDB Telemetry
//!
//! Scoring of predicted labels against ground truth.
//!
//! Provides:
//! - A scoreboard for exact-match, hit rate and per-label precision/recall
//! - A live, lock-guarded view fed by dispatcher completions
//! - The deterministic final pass and the end-of-run report

pub mod metrics;
pub mod report;

pub use metrics::{
    final_pass, LabelCounts, LabelStats, LiveMetrics, LiveSnapshot, PairOutcome, Scoreboard,
    ScoringPolicy,
};
pub use report::{render_report, MetricsSummary};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::metrics::{final_pass, LiveMetrics, Scoreboard, ScoringPolicy};
    pub use crate::report::{render_report, MetricsSummary};
}
