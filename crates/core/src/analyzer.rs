// crates/core/src/analyzer.rs
//! Session analysis: how a session's runs compare to everything before it.
//!
//! The session is analyzed twice, once keyed by (Scenario, Sens) and once by
//! Scenario alone. Both views share the same shape:
//!
//! - a per-run percentage series (score, trend, flow, pulse)
//! - PB entries against the pre-session max
//! - per-key "played" and average-comparison entries

use crate::metrics::{format_hms, mean, pct_change};
use crate::types::{Run, SensKey};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Default number of trailing points averaged into `flow_pct`.
pub const DEFAULT_FLOW_WINDOW: usize = 5;

/// Grouping key of a view. `sens` is `None` in the scenario-only view.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupKey {
    pub scenario: String,
    pub sens: Option<SensKey>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grouping {
    /// (Scenario, Sens)
    Grid,
    /// Scenario only
    Scenario,
}

impl Grouping {
    pub fn key(self, run: &Run) -> GroupKey {
        GroupKey {
            scenario: run.scenario.clone(),
            sens: match self {
                Grouping::Grid => Some(SensKey(run.sens)),
                Grouping::Scenario => None,
            },
        }
    }
}

/// Mean and max score per key, from runs strictly before the session.
#[derive(Debug, Clone, Default)]
struct Baselines {
    mean: HashMap<GroupKey, f64>,
    max: HashMap<GroupKey, f64>,
}

impl Baselines {
    fn from_prior(history: &[Run], before: NaiveDateTime, grouping: Grouping) -> Self {
        let mut sums: HashMap<GroupKey, (f64, usize)> = HashMap::new();
        let mut max: HashMap<GroupKey, f64> = HashMap::new();
        for run in history.iter().filter(|r| r.timestamp < before) {
            let key = grouping.key(run);
            let entry = sums.entry(key.clone()).or_insert((0.0, 0));
            entry.0 += run.score;
            entry.1 += 1;
            max.entry(key)
                .and_modify(|m| *m = m.max(run.score))
                .or_insert(run.score);
        }
        let mean = sums
            .into_iter()
            .map(|(k, (sum, n))| (k, sum / n as f64))
            .collect();
        Self { mean, max }
    }

    /// Prior max to beat. A zero max is not a reference; negative ones are.
    fn reference_max(&self, key: &GroupKey) -> Option<f64> {
        self.max.get(key).copied().filter(|m| *m != 0.0)
    }
}

/// One point of a view's performance series.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesPoint {
    pub time: NaiveDateTime,
    pub score_pct: f64,
    pub trend_pct: f64,
    pub flow_pct: f64,
    pub pulse_pct: f64,
    pub scenario: String,
    pub sens: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PbEntry {
    pub scenario: String,
    pub sens: Option<f64>,
    pub score: f64,
    pub previous: f64,
    pub improvement: f64,
    pub improvement_pct: f64,
    pub time: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayedEntry {
    pub scenario: String,
    pub sens: Option<f64>,
    pub count: usize,
    pub best: f64,
    pub avg: f64,
    /// Session best beat a non-zero pre-session max.
    pub is_pb: bool,
    pub first_played: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AverageEntry {
    pub scenario: String,
    pub sens: Option<f64>,
    pub session_avg: f64,
    pub all_time_avg: f64,
    pub diff_pct: f64,
    pub first_played: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub series: Vec<SeriesPoint>,
    pub pbs: Vec<PbEntry>,
    pub played: Vec<PlayedEntry>,
    pub averages: Vec<AverageEntry>,
    pub pb_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMeta {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// Seconds between the first and last run start.
    pub span_secs: f64,
    /// Sum of run durations.
    pub active_secs: f64,
    pub play_count: usize,
    /// e.g. `March 07, 2025`
    pub date_label: String,
    pub span_label: String,
    pub active_label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub meta: SessionMeta,
    pub grid: SessionView,
    pub scenario: SessionView,
}

/// Analyze one session against the history that precedes it.
///
/// `history` may contain the session itself; only runs strictly before the
/// session's first run feed the baselines. Returns `None` for an empty
/// session.
pub fn analyze_session(
    session_runs: &[Run],
    history: &[Run],
    flow_window: usize,
    stack_pbs: bool,
) -> Option<SessionSummary> {
    let mut runs: Vec<&Run> = session_runs.iter().collect();
    runs.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    let start = runs.first()?.timestamp;

    let meta = session_meta(&runs);
    let grid = analyze_view(&runs, history, start, Grouping::Grid, flow_window, stack_pbs);
    let scenario = analyze_view(&runs, history, start, Grouping::Scenario, flow_window, stack_pbs);

    Some(SessionSummary {
        meta,
        grid,
        scenario,
    })
}

fn session_meta(runs: &[&Run]) -> SessionMeta {
    let start = runs[0].timestamp;
    let end = runs[runs.len() - 1].timestamp;
    let span_secs = (end - start).num_milliseconds() as f64 / 1000.0;
    let active_secs: f64 = runs.iter().map(|r| r.duration).sum();
    SessionMeta {
        start,
        end,
        span_secs,
        active_secs,
        play_count: runs.len(),
        date_label: start.format("%B %d, %Y").to_string(),
        span_label: format_hms(span_secs),
        active_label: format_hms(active_secs),
    }
}

fn analyze_view(
    runs: &[&Run],
    history: &[Run],
    start: NaiveDateTime,
    grouping: Grouping,
    flow_window: usize,
    stack_pbs: bool,
) -> SessionView {
    let baselines = Baselines::from_prior(history, start, grouping);
    let series = build_series(runs, &baselines, grouping, flow_window);

    // Chronological order is kept inside each group
    let mut groups: BTreeMap<GroupKey, Vec<&Run>> = BTreeMap::new();
    for run in runs {
        groups.entry(grouping.key(run)).or_default().push(run);
    }

    let pbs = if stack_pbs {
        stacked_pbs(runs, &baselines, grouping)
    } else {
        unique_pbs(&groups, &baselines)
    };
    let played = played_entries(&groups, &baselines);
    let averages = average_entries(&groups, &baselines);

    SessionView {
        pb_count: pbs.len(),
        series,
        pbs,
        played,
        averages,
    }
}

// ============================================================================
// Series
// ============================================================================

fn build_series(
    runs: &[&Run],
    baselines: &Baselines,
    grouping: Grouping,
    flow_window: usize,
) -> Vec<SeriesPoint> {
    let window = flow_window.max(1);
    let mut running: HashMap<GroupKey, (f64, usize)> = HashMap::new();
    let mut score_pcts: Vec<f64> = Vec::with_capacity(runs.len());
    let mut previous_pulse: Option<f64> = None;
    let mut series = Vec::with_capacity(runs.len());

    for run in runs {
        let key = grouping.key(run);
        let baseline = baselines.mean.get(&key).copied().unwrap_or(0.0);
        let acc = running.entry(key).or_insert((0.0, 0));
        acc.0 += run.score;
        acc.1 += 1;
        let running_avg = acc.0 / acc.1 as f64;
        let effective = if baseline > 0.0 { baseline } else { running_avg };

        let score_pct = pct_change(run.score, effective);
        let trend_pct = pct_change(running_avg, effective);

        score_pcts.push(score_pct);
        let tail = &score_pcts[score_pcts.len().saturating_sub(window)..];
        let flow_pct = mean(tail).unwrap_or(score_pct);

        let pulse_pct = match previous_pulse {
            None => score_pct,
            Some(prev) => 0.5 * score_pct + 0.5 * prev,
        };
        previous_pulse = Some(pulse_pct);

        series.push(SeriesPoint {
            time: run.timestamp,
            score_pct,
            trend_pct,
            flow_pct,
            pulse_pct,
            scenario: run.scenario.clone(),
            sens: run.sens,
        });
    }
    series
}

// ============================================================================
// Lists
// ============================================================================

fn pb_entry(key: &GroupKey, score: f64, previous: f64, time: NaiveDateTime) -> PbEntry {
    PbEntry {
        scenario: key.scenario.clone(),
        sens: key.sens.map(|s| s.0),
        score,
        previous,
        improvement: score - previous,
        improvement_pct: pct_change(score, previous),
        time,
    }
}

fn group_best(group: &[&Run]) -> f64 {
    group.iter().map(|r| r.score).fold(f64::NEG_INFINITY, f64::max)
}

fn group_mean(group: &[&Run]) -> f64 {
    group.iter().map(|r| r.score).sum::<f64>() / group.len() as f64
}

/// One entry per key whose session best beats the pre-session max.
fn unique_pbs(groups: &BTreeMap<GroupKey, Vec<&Run>>, baselines: &Baselines) -> Vec<PbEntry> {
    groups
        .iter()
        .filter_map(|(key, group)| {
            let previous = baselines.reference_max(key)?;
            let best = group_best(group);
            (best > previous).then(|| pb_entry(key, best, previous, group[0].timestamp))
        })
        .collect()
}

/// One entry per run that beats the running max, seeded from the baseline.
fn stacked_pbs(runs: &[&Run], baselines: &Baselines, grouping: Grouping) -> Vec<PbEntry> {
    let mut current: HashMap<GroupKey, f64> = HashMap::new();
    let mut pbs = Vec::new();
    for run in runs {
        let key = grouping.key(run);
        let previous = match current.get(&key) {
            Some(&max) => max,
            None => match baselines.reference_max(&key) {
                Some(max) => max,
                None => continue,
            },
        };
        if run.score > previous {
            pbs.push(pb_entry(&key, run.score, previous, run.timestamp));
            current.insert(key, run.score);
        } else {
            current.entry(key).or_insert(previous);
        }
    }
    pbs
}

fn played_entries(groups: &BTreeMap<GroupKey, Vec<&Run>>, baselines: &Baselines) -> Vec<PlayedEntry> {
    groups
        .iter()
        .map(|(key, group)| {
            let best = group_best(group);
            PlayedEntry {
                scenario: key.scenario.clone(),
                sens: key.sens.map(|s| s.0),
                count: group.len(),
                best,
                avg: group_mean(group),
                is_pb: baselines.reference_max(key).is_some_and(|prev| best > prev),
                first_played: group[0].timestamp,
            }
        })
        .collect()
}

fn average_entries(groups: &BTreeMap<GroupKey, Vec<&Run>>, baselines: &Baselines) -> Vec<AverageEntry> {
    groups
        .iter()
        .filter_map(|(key, group)| {
            let session_avg = group_mean(group);
            let all_time_avg = baselines.mean.get(key).copied().unwrap_or(session_avg);
            (all_time_avg > 0.0).then(|| AverageEntry {
                scenario: key.scenario.clone(),
                sens: key.sens.map(|s| s.0),
                session_avg,
                all_time_avg,
                diff_pct: pct_change(session_avg, all_time_avg),
                first_played: group[0].timestamp,
            })
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
