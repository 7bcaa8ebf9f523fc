// crates/core/src/stats.rs
//! Descriptive statistics over a set of runs and over the whole profile.

use crate::metrics::format_hours_minutes;
use crate::types::{ComboKey, RankTier, Run};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Window for `recent_avg` and `launchpad_avg`.
pub const RECENT_WINDOW: usize = 20;

/// How many scenarios `profile_stats` lists by play count.
pub const TOP_SCENARIOS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedStats {
    pub count: usize,
    pub max: f64,
    pub avg: f64,
    /// Sample standard deviation, 0 for a single run.
    pub std_dev: f64,
    pub p50: f64,
    pub p75: f64,
    pub min: f64,
    /// First run that reached `max`.
    pub pb_date: NaiveDateTime,
    pub pb_sens: f64,
    /// Mean of the last runs, up to [`RECENT_WINDOW`].
    pub recent_avg: f64,
    /// Mean of the runs right before the PB, up to [`RECENT_WINDOW`]; 0 if none.
    pub launchpad_avg: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioCount {
    pub scenario: String,
    pub runs: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileStats {
    pub total_runs: usize,
    /// Summed run durations, seconds.
    pub active_secs: f64,
    /// `active_secs` as `Xh Ym`.
    pub active_label: String,
    pub unique_scenarios: usize,
    pub unique_combos: usize,
    pub total_pbs: usize,
    /// Every tier is present, zero included.
    pub rank_counts: BTreeMap<RankTier, usize>,
    pub top_scenarios: Vec<ScenarioCount>,
}

/// Linear-interpolated quantile of an ascending, non-empty slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

fn mean_of<'a>(runs: impl ExactSizeIterator<Item = &'a Run>) -> f64 {
    let n = runs.len();
    if n == 0 {
        return 0.0;
    }
    runs.map(|r| r.score).sum::<f64>() / n as f64
}

/// Statistics for `runs` (typically one scenario or one combo).
///
/// Returns `None` for an empty slice.
pub fn detailed_stats(runs: &[Run]) -> Option<DetailedStats> {
    if runs.is_empty() {
        return None;
    }
    let mut ordered: Vec<&Run> = runs.iter().collect();
    ordered.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

    let mut scores: Vec<f64> = ordered.iter().map(|r| r.score).collect();
    let count = scores.len();
    let avg = scores.iter().sum::<f64>() / count as f64;
    let std_dev = if count > 1 {
        let var = scores.iter().map(|s| (s - avg).powi(2)).sum::<f64>() / (count - 1) as f64;
        var.sqrt()
    } else {
        0.0
    };

    // First occurrence of the max in time order
    let mut pb_idx = 0;
    for (i, run) in ordered.iter().enumerate() {
        if run.score > ordered[pb_idx].score {
            pb_idx = i;
        }
    }
    let pb = ordered[pb_idx];

    let recent = &ordered[count.saturating_sub(RECENT_WINDOW)..];
    let launchpad = &ordered[pb_idx.saturating_sub(RECENT_WINDOW)..pb_idx];

    scores.sort_by(f64::total_cmp);
    Some(DetailedStats {
        count,
        max: scores[count - 1],
        avg,
        std_dev,
        p50: quantile(&scores, 0.5),
        p75: quantile(&scores, 0.75),
        min: scores[0],
        pb_date: pb.timestamp,
        pb_sens: pb.sens,
        recent_avg: mean_of(recent.iter().copied()),
        launchpad_avg: mean_of(launchpad.iter().copied()),
    })
}

/// Whole-history profile numbers. Expects an enriched history.
///
/// Returns `None` for an empty history.
pub fn profile_stats(history: &[Run]) -> Option<ProfileStats> {
    if history.is_empty() {
        return None;
    }

    let mut per_scenario: HashMap<&str, usize> = HashMap::new();
    let mut combos: HashSet<ComboKey> = HashSet::new();
    let mut rank_counts: BTreeMap<RankTier, usize> =
        RankTier::ALL.into_iter().map(|tier| (tier, 0)).collect();
    let mut total_pbs = 0;
    let mut active_secs = 0.0;

    for run in history {
        *per_scenario.entry(run.scenario.as_str()).or_default() += 1;
        combos.insert(run.combo_key());
        for tier in &run.ranks {
            *rank_counts.entry(*tier).or_default() += 1;
        }
        if run.is_pb {
            total_pbs += 1;
        }
        active_secs += run.duration;
    }

    let mut top_scenarios: Vec<ScenarioCount> = per_scenario
        .iter()
        .map(|(scenario, runs)| ScenarioCount {
            scenario: scenario.to_string(),
            runs: *runs,
        })
        .collect();
    top_scenarios.sort_by(|a, b| b.runs.cmp(&a.runs).then_with(|| a.scenario.cmp(&b.scenario)));
    top_scenarios.truncate(TOP_SCENARIOS);

    Some(ProfileStats {
        total_runs: history.len(),
        active_secs,
        active_label: format_hours_minutes(active_secs),
        unique_scenarios: per_scenario.len(),
        unique_combos: combos.len(),
        total_pbs,
        rank_counts,
        top_scenarios,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranks::enrich;
    use chrono::{Duration, NaiveDate};
    use pretty_assertions::assert_eq;

    fn t(i: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
            + Duration::minutes(i)
    }

    fn runs(scores: &[f64]) -> Vec<Run> {
        scores
            .iter()
            .enumerate()
            .map(|(i, &s)| Run::new("Gridshot", 30.0, s, t(i as i64)))
            .collect()
    }

    #[test]
    fn test_detailed_stats_empty() {
        assert!(detailed_stats(&[]).is_none());
    }

    #[test]
    fn test_detailed_stats_single_run() {
        let stats = detailed_stats(&runs(&[42.0])).unwrap();
        assert_eq!(stats.count, 1);
        assert_eq!(stats.std_dev, 0.0);
        assert_eq!(stats.p50, 42.0);
        assert_eq!(stats.p75, 42.0);
        assert_eq!(stats.recent_avg, 42.0);
        assert_eq!(stats.launchpad_avg, 0.0);
    }

    #[test]
    fn test_detailed_stats_basic() {
        let stats = detailed_stats(&runs(&[10.0, 40.0, 20.0, 30.0])).unwrap();
        assert_eq!(stats.max, 40.0);
        assert_eq!(stats.min, 10.0);
        assert_eq!(stats.avg, 25.0);
        assert_eq!(stats.p50, 25.0);
        // pos 2.25 between 30 and 40
        assert_eq!(stats.p75, 32.5);
        assert!((stats.std_dev - (500.0_f64 / 3.0).sqrt()).abs() < 1e-9);
        assert_eq!(stats.pb_date, t(1));
        assert_eq!(stats.launchpad_avg, 10.0);
    }

    #[test]
    fn test_pb_is_first_occurrence_of_max() {
        let stats = detailed_stats(&runs(&[5.0, 9.0, 1.0, 9.0])).unwrap();
        assert_eq!(stats.pb_date, t(1));
    }

    #[test]
    fn test_recent_and_launchpad_windows() {
        let mut scores: Vec<f64> = vec![1.0; 25];
        scores.push(100.0);
        scores.extend([3.0; 4]);
        let stats = detailed_stats(&runs(&scores)).unwrap();
        // 20 runs before the PB are all 1.0
        assert_eq!(stats.launchpad_avg, 1.0);
        // last 20: 15 ones, the PB, four threes
        assert_eq!(stats.recent_avg, (15.0 + 100.0 + 12.0) / 20.0);
    }

    #[test]
    fn test_profile_stats() {
        let mut history = runs(&[10.0, 20.0, 15.0]);
        history.push(Run::new("Sixshot", 40.0, 5.0, t(10)));
        history.push(Run::new("Gridshot", 35.0, 5.0, t(11)));
        let history = enrich(history);

        let profile = profile_stats(&history).unwrap();
        assert_eq!(profile.total_runs, 5);
        assert_eq!(profile.active_secs, 300.0);
        assert_eq!(profile.active_label, "0h 5m");
        assert_eq!(profile.unique_scenarios, 2);
        assert_eq!(profile.unique_combos, 3);
        // 10, 20 at 30cm; first runs at the other two combos
        assert_eq!(profile.total_pbs, 4);
        assert_eq!(profile.rank_counts.len(), RankTier::ALL.len());
        assert_eq!(profile.rank_counts[&RankTier::Singularity], 0);
        assert_eq!(
            profile.top_scenarios,
            vec![
                ScenarioCount { scenario: "Gridshot".into(), runs: 4 },
                ScenarioCount { scenario: "Sixshot".into(), runs: 1 },
            ]
        );
    }

    #[test]
    fn test_profile_stats_empty() {
        assert!(profile_stats(&[]).is_none());
    }
}
