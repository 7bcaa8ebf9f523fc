// crates/core/src/activity.rs
//! Calendar rollups: sessions, days, months, and the intraday activity curve.

use crate::types::{ComboKey, Run};
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Half-hour bins in a day.
pub const ACTIVITY_BINS: usize = 48;
const BIN_SECS: f64 = 1800.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOverview {
    pub session_id: u32,
    pub start: NaiveDateTime,
    pub runs: usize,
    /// Summed run durations, seconds.
    pub active_secs: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySummary {
    pub date: NaiveDate,
    pub runs: usize,
    pub active_secs: f64,
    /// Scenario PBs, one per run.
    pub scenario_pbs_stacked: usize,
    /// Distinct scenarios with a PB that day.
    pub scenario_pbs_unique: usize,
    /// Combo PBs, one per run.
    pub combo_pbs_stacked: usize,
    /// Distinct combos with a PB that day.
    pub combo_pbs_unique: usize,
    pub sessions: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySummary {
    pub year: i32,
    pub month: u32,
    pub runs: usize,
    pub active_secs: f64,
}

/// One entry per session, newest first.
pub fn session_list(history: &[Run]) -> Vec<SessionOverview> {
    let mut by_id: BTreeMap<u32, SessionOverview> = BTreeMap::new();
    for run in history {
        let entry = by_id.entry(run.session_id).or_insert_with(|| SessionOverview {
            session_id: run.session_id,
            start: run.timestamp,
            runs: 0,
            active_secs: 0.0,
        });
        entry.start = entry.start.min(run.timestamp);
        entry.runs += 1;
        entry.active_secs += run.duration;
    }
    by_id.into_values().rev().collect()
}

/// One entry per calendar day with runs, oldest first.
///
/// PB counts leave out first-ever runs on a combo, which are always PBs.
/// Expects an enriched history.
pub fn daily_summaries(history: &[Run]) -> Vec<DailySummary> {
    let mut by_day: BTreeMap<NaiveDate, Vec<&Run>> = BTreeMap::new();
    for run in history {
        by_day.entry(run.timestamp.date()).or_default().push(run);
    }

    by_day
        .into_iter()
        .map(|(date, runs)| {
            let counted: Vec<&&Run> = runs.iter().filter(|r| !r.is_first).collect();
            let scenario_pbs: Vec<&&Run> = counted.iter().copied().filter(|r| r.is_scen_pb).collect();
            let combo_pbs: Vec<&&Run> = counted.iter().copied().filter(|r| r.is_pb).collect();

            let unique_scenarios: HashSet<&str> =
                scenario_pbs.iter().map(|r| r.scenario.as_str()).collect();
            let unique_combos: HashSet<ComboKey> = combo_pbs.iter().map(|r| r.combo_key()).collect();
            let sessions: BTreeSet<u32> = runs.iter().map(|r| r.session_id).collect();

            DailySummary {
                date,
                runs: runs.len(),
                active_secs: runs.iter().map(|r| r.duration).sum(),
                scenario_pbs_stacked: scenario_pbs.len(),
                scenario_pbs_unique: unique_scenarios.len(),
                combo_pbs_stacked: combo_pbs.len(),
                combo_pbs_unique: unique_combos.len(),
                sessions: sessions.into_iter().collect(),
            }
        })
        .collect()
}

/// One entry per calendar month with runs, newest first.
pub fn monthly_summaries(history: &[Run]) -> Vec<MonthlySummary> {
    let mut by_month: BTreeMap<(i32, u32), (usize, f64)> = BTreeMap::new();
    for run in history {
        let key = (run.timestamp.year(), run.timestamp.month());
        let entry = by_month.entry(key).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += run.duration;
    }
    by_month
        .into_iter()
        .rev()
        .map(|((year, month), (runs, active_secs))| MonthlySummary {
            year,
            month,
            runs,
            active_secs,
        })
        .collect()
}

/// Intraday activity curve for the runs of a single day.
///
/// Bins are half hours from midnight of the earliest run's day; each run adds
/// its share of a half hour to its starting bin. The result is smoothed with
/// a centered 3-bin mean that shrinks at the edges. Empty input gives all
/// zeros.
pub fn day_activity_curve(runs: &[Run]) -> [f64; ACTIVITY_BINS] {
    let mut bins = [0.0; ACTIVITY_BINS];
    let Some(day) = runs.iter().map(|r| r.timestamp.date()).min() else {
        return bins;
    };

    for run in runs {
        let offset = (run.timestamp.date() - day).num_days() * 86_400
            + i64::from(run.timestamp.num_seconds_from_midnight());
        let idx = offset / BIN_SECS as i64;
        if (0..ACTIVITY_BINS as i64).contains(&idx) {
            bins[idx as usize] += run.duration / BIN_SECS;
        }
    }

    let mut smoothed = [0.0; ACTIVITY_BINS];
    for (i, slot) in smoothed.iter_mut().enumerate() {
        let lo = i.saturating_sub(1);
        let hi = (i + 1).min(ACTIVITY_BINS - 1);
        let window = &bins[lo..=hi];
        *slot = window.iter().sum::<f64>() / window.len() as f64;
    }
    smoothed
}
