// crates/core/src/ranks.rs
//! Personal-best detection and percentile rank tiers.
//!
//! Every (Scenario, Sens) combo keeps a sorted list of its earlier scores.
//! Each run is ranked against that list *before* its own score is inserted,
//! so a run never contributes to its own baseline.

use crate::types::{ComboKey, RankTier, Run};
use std::collections::HashMap;

/// Sorted multiset of a combo's prior scores.
#[derive(Debug, Clone, Default)]
pub struct PriorScores {
    sorted: Vec<f64>,
}

/// Where a score stands against the prior scores of its combo.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Standing {
    /// 0..=100
    pub percentile: f64,
    pub is_pb: bool,
    pub is_first: bool,
    /// Runs on the combo including this one.
    pub run_count: usize,
}

impl PriorScores {
    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }

    pub fn max(&self) -> Option<f64> {
        self.sorted.last().copied()
    }

    /// Percentile of `score` against the prior scores.
    ///
    /// 100 when there are no priors or `score` ties/beats the max; otherwise
    /// the share of priors strictly below `score`.
    pub fn percentile_of(&self, score: f64) -> f64 {
        match self.max() {
            None => 100.0,
            Some(max) if score >= max => 100.0,
            Some(_) => {
                let below = self.sorted.partition_point(|&s| s < score);
                below as f64 / self.sorted.len() as f64 * 100.0
            }
        }
    }

    pub fn insert(&mut self, score: f64) {
        let at = self.sorted.partition_point(|&s| s <= score);
        self.sorted.insert(at, score);
    }

    /// Rank `score`, then record it as a prior for later runs.
    pub fn observe(&mut self, score: f64) -> Standing {
        let is_first = self.is_empty();
        let is_pb = match self.max() {
            None => true,
            Some(max) => score > max,
        };
        let standing = Standing {
            percentile: self.percentile_of(score),
            is_pb,
            is_first,
            run_count: self.len() + 1,
        };
        self.insert(score);
        standing
    }
}

/// Tiers earned at `percentile` by a combo's `run_count`-th run, highest first.
pub fn tiers_for(percentile: f64, run_count: usize) -> Vec<RankTier> {
    RankTier::ALL
        .into_iter()
        .filter(|tier| !tier.is_gated() || run_count >= RankTier::GATE_MIN_RUNS)
        .filter(|tier| percentile >= tier.threshold())
        .collect()
}

/// Sort by time and compute `is_first`, `is_pb`, `is_scen_pb` and `ranks`.
///
/// Any previously computed flags are overwritten, so enriching an already
/// enriched history gives the same result.
pub fn enrich(mut runs: Vec<Run>) -> Vec<Run> {
    if runs.is_empty() {
        return runs;
    }
    runs.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

    let mut combos: HashMap<ComboKey, PriorScores> = HashMap::new();
    // Scenario-level PBs only need the running max, no percentile.
    let mut scenario_max: HashMap<String, f64> = HashMap::new();

    for run in runs.iter_mut() {
        let standing = combos.entry(run.combo_key()).or_default().observe(run.score);
        run.is_first = standing.is_first;
        run.is_pb = standing.is_pb;
        run.ranks = tiers_for(standing.percentile, standing.run_count);

        run.is_scen_pb = match scenario_max.get_mut(&run.scenario) {
            None => {
                scenario_max.insert(run.scenario.clone(), run.score);
                true
            }
            Some(max) if run.score > *max => {
                *max = run.score;
                true
            }
            Some(_) => false,
        };
    }

    runs
}
