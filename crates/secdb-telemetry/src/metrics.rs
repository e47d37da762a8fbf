//! Accuracy, hit-rate, and per-label precision/recall
//!
//! Both the live view and the final pass fold pairs through the same
//! [`Scoreboard::record`], so replaying the completed results in record order
//! reproduces the live totals exactly.

use parking_lot::Mutex;
use secdb_core::{ClassificationResult, CommentRecord, CompletionObserver, Label, LabelSet, Result};
use serde::Serialize;
use std::fmt::Write as _;
use tracing::info;

/// Scoring options that change what a reported metric means
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoringPolicy {
    /// Count an empty prediction against empty ground truth as a hit
    pub count_empty_as_hit: bool,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            count_empty_as_hit: true,
        }
    }
}

/// One counter per taxonomy label
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LabelCounts([u64; Label::ALL.len()]);

impl LabelCounts {
    pub fn get(&self, label: Label) -> u64 {
        self.0[label.index()]
    }

    pub fn add(&mut self, label: Label) {
        self.0[label.index()] += 1;
    }

    pub fn add_all(&mut self, labels: &LabelSet) {
        for label in labels.iter() {
            self.add(label);
        }
    }

    pub fn total(&self) -> u64 {
        self.0.iter().sum()
    }

    /// Labels with a non-zero count
    pub fn seen(&self) -> impl Iterator<Item = Label> + '_ {
        Label::ALL.into_iter().filter(|label| self.get(*label) > 0)
    }
}

/// How one prediction compared to its ground truth
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairOutcome {
    pub exact_match: bool,
    pub hit: bool,
}

/// Counters for one label
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelStats {
    pub label: Label,
    pub ground_truth: u64,
    pub predicted: u64,
    pub true_positives: u64,
    pub false_positives: u64,
    pub false_negatives: u64,
    pub precision: f64,
    pub recall: f64,
}

/// Running totals over (predicted, ground truth) pairs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scoreboard {
    policy: ScoringPolicy,

    pub completed: u64,
    pub exact_matches: u64,
    /// Hits, including empty-vs-empty when the policy allows
    pub hits: u64,
    /// Hits that share at least one label
    pub nonempty_hits: u64,
    pub any_predicted: u64,
    pub any_ground_truth: u64,
    /// Predicted something where ground truth is empty
    pub false_positive_records: u64,
    /// Predicted nothing where ground truth is not empty
    pub false_negative_records: u64,

    pub predicted: LabelCounts,
    pub ground_truth: LabelCounts,
    pub true_positives: LabelCounts,
    pub false_positives: LabelCounts,
    pub false_negatives: LabelCounts,
}

impl Scoreboard {
    pub fn new(policy: ScoringPolicy) -> Self {
        Self {
            policy,
            completed: 0,
            exact_matches: 0,
            hits: 0,
            nonempty_hits: 0,
            any_predicted: 0,
            any_ground_truth: 0,
            false_positive_records: 0,
            false_negative_records: 0,
            predicted: LabelCounts::default(),
            ground_truth: LabelCounts::default(),
            true_positives: LabelCounts::default(),
            false_positives: LabelCounts::default(),
            false_negatives: LabelCounts::default(),
        }
    }

    pub fn policy(&self) -> ScoringPolicy {
        self.policy
    }

    /// Fold one pair into the totals
    pub fn record(&mut self, predicted: &LabelSet, ground_truth: &LabelSet) -> PairOutcome {
        let overlap = predicted.intersection(ground_truth);
        let both_empty = predicted.is_empty() && ground_truth.is_empty();

        let outcome = PairOutcome {
            exact_match: predicted.same_labels(ground_truth),
            hit: !overlap.is_empty() || (self.policy.count_empty_as_hit && both_empty),
        };

        self.completed += 1;
        if outcome.exact_match {
            self.exact_matches += 1;
        }
        if outcome.hit {
            self.hits += 1;
        }
        if !overlap.is_empty() {
            self.nonempty_hits += 1;
        }
        if !predicted.is_empty() {
            self.any_predicted += 1;
        }
        if !ground_truth.is_empty() {
            self.any_ground_truth += 1;
        }
        if !predicted.is_empty() && ground_truth.is_empty() {
            self.false_positive_records += 1;
        }
        if predicted.is_empty() && !ground_truth.is_empty() {
            self.false_negative_records += 1;
        }

        self.predicted.add_all(predicted);
        self.ground_truth.add_all(ground_truth);
        self.true_positives.add_all(&overlap);
        self.false_positives.add_all(&predicted.difference(ground_truth));
        self.false_negatives.add_all(&ground_truth.difference(predicted));

        outcome
    }

    /// Exact-match fraction in `[0, 1]`
    pub fn exact_match_rate(&self) -> f64 {
        ratio(self.exact_matches, self.completed)
    }

    /// Hit fraction in `[0, 1]`
    pub fn hit_rate(&self) -> f64 {
        ratio(self.hits, self.completed)
    }

    pub fn label_stats(&self, label: Label) -> LabelStats {
        let tp = self.true_positives.get(label);
        let fp = self.false_positives.get(label);
        let fn_ = self.false_negatives.get(label);

        LabelStats {
            label,
            ground_truth: self.ground_truth.get(label),
            predicted: self.predicted.get(label),
            true_positives: tp,
            false_positives: fp,
            false_negatives: fn_,
            precision: ratio(tp, tp + fp),
            recall: ratio(tp, tp + fn_),
        }
    }

    /// Stats for every label seen in predictions or ground truth, by wire name
    pub fn label_table(&self) -> Vec<LabelStats> {
        let mut labels: Vec<Label> = Label::ALL
            .into_iter()
            .filter(|label| self.predicted.get(*label) > 0 || self.ground_truth.get(*label) > 0)
            .collect();
        labels.sort_by_key(|label| label.as_str());
        labels.into_iter().map(|label| self.label_stats(label)).collect()
    }
}

impl Default for Scoreboard {
    fn default() -> Self {
        Self::new(ScoringPolicy::default())
    }
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Point-in-time view of the live totals
#[derive(Debug, Clone, PartialEq)]
pub struct LiveSnapshot {
    pub completed: u64,
    pub total: usize,
    pub exact_match_pct: f64,
    pub hit_pct: f64,
    pub predicted: LabelCounts,
}

impl LiveSnapshot {
    /// Compact progress line, e.g. `acc=50.000 hit=75.000 cred=1 netid=0 ...`
    pub fn postfix(&self) -> String {
        let mut line = format!("acc={:.3} hit={:.3}", self.exact_match_pct, self.hit_pct);
        for label in Label::ALL {
            let _ = write!(line, " {}={}", label.short_name(), self.predicted.get(label));
        }
        line
    }
}

/// Scoreboard updated by dispatcher workers as results complete
pub struct LiveMetrics {
    board: Mutex<Scoreboard>,
    total: usize,
    progress_interval: usize,
}

impl LiveMetrics {
    /// `total` is the number of records being dispatched. A progress line is
    /// logged every `progress_interval` completions and on the last one.
    pub fn new(policy: ScoringPolicy, total: usize, progress_interval: usize) -> Self {
        Self {
            board: Mutex::new(Scoreboard::new(policy)),
            total,
            progress_interval: progress_interval.max(1),
        }
    }

    pub fn record(&self, predicted: &LabelSet, ground_truth: &LabelSet) -> LiveSnapshot {
        let mut board = self.board.lock();
        board.record(predicted, ground_truth);
        self.snapshot_of(&board)
    }

    pub fn snapshot(&self) -> LiveSnapshot {
        let board = self.board.lock();
        self.snapshot_of(&board)
    }

    /// Copy of the current totals
    pub fn scoreboard(&self) -> Scoreboard {
        self.board.lock().clone()
    }

    fn snapshot_of(&self, board: &Scoreboard) -> LiveSnapshot {
        LiveSnapshot {
            completed: board.completed,
            total: self.total,
            exact_match_pct: board.exact_match_rate() * 100.0,
            hit_pct: board.hit_rate() * 100.0,
            predicted: board.predicted,
        }
    }
}

impl CompletionObserver for LiveMetrics {
    fn on_complete(&self, record: &CommentRecord, result: &ClassificationResult) {
        let snapshot = self.record(&result.predicted_labels, &record.ground_truth);

        metrics::gauge!("secdb_live_exact_match_pct").set(snapshot.exact_match_pct);
        metrics::gauge!("secdb_live_hit_pct").set(snapshot.hit_pct);

        let completed = snapshot.completed as usize;
        if completed % self.progress_interval == 0 || completed == self.total {
            info!(
                completed,
                total = self.total,
                "Classifying (parallel): {}",
                snapshot.postfix()
            );
        }
    }
}

/// Recompute the totals from the collected results, in record order.
///
/// `results` must hold exactly one result per record, indexed by identifier.
pub fn final_pass(
    records: &[CommentRecord],
    results: &[ClassificationResult],
    policy: ScoringPolicy,
) -> Result<Scoreboard> {
    if records.len() != results.len() {
        return Err(secdb_core::Error::internal(format!(
            "{} results for {} records",
            results.len(),
            records.len()
        )));
    }

    let mut board = Scoreboard::new(policy);
    for record in records {
        let result = results
            .get(record.identifier)
            .filter(|result| result.identifier == record.identifier)
            .ok_or_else(|| {
                secdb_core::Error::internal(format!(
                    "no result positioned for record {}",
                    record.identifier
                ))
            })?;
        board.record(&result.predicted_labels, &record.ground_truth);
    }

    Ok(board)
}
