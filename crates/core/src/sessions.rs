// crates/core/src/sessions.rs
//! Session segmentation: clusters of runs separated by an idle gap.

use crate::types::Run;
use chrono::Duration;

/// Default idle gap (minutes) that starts a new session.
pub const DEFAULT_SESSION_GAP_MINUTES: u32 = 30;

/// Sort `runs` by timestamp and assign session ids.
///
/// Ids start at 0 and increase by one whenever the gap to the previous run
/// is strictly greater than `gap_minutes`. The sort is stable, so runs with
/// equal timestamps keep their relative order.
pub fn assign_sessions(runs: &mut [Run], gap_minutes: u32) {
    runs.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

    let gap = Duration::minutes(i64::from(gap_minutes));
    let mut session_id: u32 = 0;
    let mut previous = None;

    for run in runs.iter_mut() {
        if let Some(prev) = previous {
            if run.timestamp - prev > gap {
                session_id += 1;
            }
        }
        run.session_id = session_id;
        previous = Some(run.timestamp);
    }
}

/// The runs belonging to one session, in chronological order.
pub fn session_runs(history: &[Run], session_id: u32) -> Vec<Run> {
    let mut runs: Vec<Run> = history
        .iter()
        .filter(|r| r.session_id == session_id)
        .cloned()
        .collect();
    runs.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    runs
}

/// Highest session id in the history, if any.
pub fn latest_session_id(history: &[Run]) -> Option<u32> {
    history.iter().map(|r| r.session_id).max()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 10)
            .unwrap()
            .and_hms_opt(18, 0, 0)
            .unwrap()
    }

    fn run_at(minutes: i64) -> Run {
        Run::new("Gridshot", 30.0, 100.0, t0() + Duration::minutes(minutes))
    }

    fn ids(runs: &[Run]) -> Vec<u32> {
        runs.iter().map(|r| r.session_id).collect()
    }

    #[test]
    fn test_gap_over_threshold_starts_new_session() {
        let mut runs = vec![run_at(0), run_at(10), run_at(40)];
        assign_sessions(&mut runs, 30);
        assert_eq!(ids(&runs), vec![0, 0, 1]);
    }

    #[test]
    fn test_gap_equal_to_threshold_keeps_session() {
        let mut runs = vec![run_at(0), run_at(30), run_at(61)];
        assign_sessions(&mut runs, 30);
        assert_eq!(ids(&runs), vec![0, 0, 1]);
    }

    #[test]
    fn test_unsorted_input_is_sorted_first() {
        let mut runs = vec![run_at(200), run_at(0), run_at(100), run_at(5)];
        assign_sessions(&mut runs, 30);
        assert_eq!(ids(&runs), vec![0, 0, 1, 2]);
        assert!(runs.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn test_empty_history_is_noop() {
        let mut runs: Vec<Run> = Vec::new();
        assign_sessions(&mut runs, 30);
        assert!(runs.is_empty());
    }

    #[test]
    fn test_session_runs_and_latest() {
        let mut runs = vec![run_at(0), run_at(10), run_at(90), run_at(95)];
        assign_sessions(&mut runs, DEFAULT_SESSION_GAP_MINUTES);
        assert_eq!(session_runs(&runs, 1).len(), 2);
        assert_eq!(latest_session_id(&runs), Some(1));
        assert_eq!(latest_session_id(&[]), None);
    }
}
