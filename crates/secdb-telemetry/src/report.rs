//! End-of-run summary

use crate::metrics::{LabelStats, Scoreboard};
use serde::Serialize;
use std::fmt::Write as _;

/// Serializable view of a finished [`Scoreboard`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSummary {
    pub total: u64,
    pub exact_matches: u64,
    pub exact_match_accuracy: f64,
    pub hits: u64,
    pub hit_rate: f64,
    pub count_empty_as_hit: bool,
    pub nonempty_hits: u64,
    pub any_ground_truth: u64,
    pub any_predicted: u64,
    pub false_positive_records: u64,
    pub false_negative_records: u64,
    pub labels: Vec<LabelStats>,
}

impl From<&Scoreboard> for MetricsSummary {
    fn from(board: &Scoreboard) -> Self {
        Self {
            total: board.completed,
            exact_matches: board.exact_matches,
            exact_match_accuracy: board.exact_match_rate(),
            hits: board.hits,
            hit_rate: board.hit_rate(),
            count_empty_as_hit: board.policy().count_empty_as_hit,
            nonempty_hits: board.nonempty_hits,
            any_ground_truth: board.any_ground_truth,
            any_predicted: board.any_predicted,
            false_positive_records: board.false_positive_records,
            false_negative_records: board.false_negative_records,
            labels: board.label_table(),
        }
    }
}

fn share(count: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 * 100.0 / total as f64
    }
}

impl MetricsSummary {
    /// Console report. `nonempty_diagnostics` adds the non-empty counts.
    pub fn render(&self, nonempty_diagnostics: bool) -> String {
        let mut out = String::new();
        let total = self.total;

        let _ = writeln!(out, "Exact-match accuracy: {:.4}", self.exact_match_accuracy);
        let hit_scope = if self.count_empty_as_hit {
            "incl. none/none"
        } else {
            "non-empty only"
        };
        let _ = writeln!(
            out,
            "At least one correct ({}): {} / {} ({:.1}%)",
            hit_scope,
            self.hits,
            total,
            self.hit_rate * 100.0
        );

        if nonempty_diagnostics {
            let _ = writeln!(
                out,
                "Ground-truth with >=1 label: {} ({:.1}%)",
                self.any_ground_truth,
                share(self.any_ground_truth, total)
            );
            let _ = writeln!(
                out,
                "Predictions with >=1 label:  {} ({:.1}%)",
                self.any_predicted,
                share(self.any_predicted, total)
            );
            let _ = writeln!(
                out,
                "At least one correct (non-empty only): {} ({:.1}%)",
                self.nonempty_hits,
                share(self.nonempty_hits, total)
            );
        }

        let _ = writeln!(
            out,
            "False-positive records (pred non-empty, gt empty): {}",
            self.false_positive_records
        );
        let _ = writeln!(
            out,
            "False-negative records (gt non-empty, pred empty): {}",
            self.false_negative_records
        );

        let _ = writeln!(out);
        let _ = writeln!(out, "By-label counts (GT vs Pred, TP/FP/FN and precision/recall):");
        for stats in &self.labels {
            let _ = writeln!(
                out,
                " - {:20} GT={:4}  Pred={:4}  TP={:4}  FP={:4}  FN={:4}  P={:.2} R={:.2}",
                stats.label.as_str(),
                stats.ground_truth,
                stats.predicted,
                stats.true_positives,
                stats.false_positives,
                stats.false_negatives,
                stats.precision,
                stats.recall
            );
        }

        out
    }
}

/// Render the console report for a finished scoreboard
pub fn render_report(board: &Scoreboard, nonempty_diagnostics: bool) -> String {
    MetricsSummary::from(board).render(nonempty_diagnostics)
}
