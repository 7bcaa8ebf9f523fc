// crates/core/src/indexer.rs
//! Indexer module: scan → diff → parse → merge pipeline.
//!
//! Orchestrates the full ingestion flow:
//! 1. `scan_files()`: list stat files directly inside the stats directory
//! 2. `diff_against_cache()`: compare their mtimes against the cached map
//! 3. parse only the changed files, dropping any that fail
//! 4. `merge_runs()`: append to the cached history and dedup
//! 5. re-segment sessions over the whole history and persist

use crate::cache::{CacheStore, FileInfoMap};
use crate::error::ScanError;
use crate::parser::{parse_stat_file_with, ParseOptions};
use crate::sessions::{assign_sessions, DEFAULT_SESSION_GAP_MINUTES};
use crate::types::Run;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Substring every stat file name carries.
pub const CHALLENGE_MARKER: &str = "- Challenge -";
/// Extension of stat files.
pub const STAT_FILE_EXTENSION: &str = "csv";

// ============================================================================
// Types
// ============================================================================

/// A discovered stat file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileInfo {
    pub path: PathBuf,
    /// Last modification time as Unix seconds (fractional).
    pub modified_at: f64,
}

impl FileInfo {
    /// Identity used as the key in the cached file map.
    pub fn identity(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }
}

/// Result of diffing discovered files against the cached file map.
#[derive(Debug, Default)]
pub struct DiffResult {
    /// Files never seen, or whose mtime increased.
    pub changed_files: Vec<FileInfo>,
    pub unchanged_count: usize,
}

/// Knobs for a scan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanOptions {
    pub session_gap_minutes: u32,
    pub parse: ParseOptions,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            session_gap_minutes: DEFAULT_SESSION_GAP_MINUTES,
            parse: ParseOptions::default(),
        }
    }
}

// ============================================================================
// scan_files
// ============================================================================

/// Whether a file name follows the stat file naming convention.
pub fn is_stat_file_name(name: &str) -> bool {
    name.contains(CHALLENGE_MARKER)
        && Path::new(name)
            .extension()
            .map(|e| e == STAT_FILE_EXTENSION)
            .unwrap_or(false)
}

/// List stat files directly inside `stats_dir` (non-recursive).
///
/// Entries whose metadata can't be read are skipped. A directory that
/// exists but can't be listed yields no files, so the scan falls back to the
/// cached history.
///
/// # Errors
/// `ScanError::InvalidDirectory` if `stats_dir` is missing or not a directory.
pub fn scan_files(stats_dir: &Path) -> Result<Vec<FileInfo>, ScanError> {
    if !stats_dir.is_dir() {
        return Err(ScanError::InvalidDirectory {
            path: stats_dir.to_path_buf(),
        });
    }

    let Some(entries) = listing_or_empty(stats_dir, std::fs::read_dir(stats_dir)) else {
        return Ok(Vec::new());
    };
    let mut files = Vec::new();

    for entry in entries {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                debug!("Failed to read entry in {}: {}", stats_dir.display(), e);
                continue;
            }
        };

        let name = entry.file_name();
        if !is_stat_file_name(&name.to_string_lossy()) {
            continue;
        }

        let metadata = match entry.metadata() {
            Ok(m) if m.is_file() => m,
            _ => continue,
        };

        let modified_at = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);

        files.push(FileInfo {
            path: entry.path(),
            modified_at,
        });
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}

fn listing_or_empty<T>(stats_dir: &Path, listing: std::io::Result<T>) -> Option<T> {
    match listing {
        Ok(entries) => Some(entries),
        Err(e) => {
            warn!(path = %stats_dir.display(), error = %e, "Cannot list stats directory, using cached history");
            None
        }
    }
}

// ============================================================================
// diff_against_cache
// ============================================================================

/// Split discovered files into changed (new or newer mtime) and unchanged.
pub fn diff_against_cache(files: &[FileInfo], known: &FileInfoMap) -> DiffResult {
    let mut result = DiffResult::default();
    for file in files {
        match known.get(&file.identity()) {
            Some(&seen) if file.modified_at <= seen => result.unchanged_count += 1,
            _ => result.changed_files.push(file.clone()),
        }
    }
    result
}

// ============================================================================
// merge
// ============================================================================

/// Append `new_runs` to `prior` and drop duplicates by (Scenario, Sens,
/// Timestamp, Score). The first occurrence wins, so cached rows are kept
/// over re-parsed copies.
pub fn merge_runs(prior: Vec<Run>, new_runs: Vec<Run>) -> Vec<Run> {
    let mut seen = HashSet::with_capacity(prior.len() + new_runs.len());
    prior
        .into_iter()
        .chain(new_runs)
        .filter(|run| seen.insert(run.key()))
        .collect()
}

// ============================================================================
// scan
// ============================================================================

/// Scan `stats_dir` with default parse options and the given session gap.
pub fn scan(stats_dir: &Path, cache: &CacheStore, session_gap_minutes: u32) -> Result<Vec<Run>, ScanError> {
    let options = ScanOptions {
        session_gap_minutes,
        ..ScanOptions::default()
    };
    scan_with(stats_dir, cache, &options)
}

/// Incrementally ingest `stats_dir` into the cached history.
///
/// Returns the full, time-sorted, session-segmented history (not yet
/// enriched). An empty `Vec` means the directory is valid but holds no runs.
/// Cache read and write problems are logged and otherwise ignored.
///
/// # Errors
/// Only `ScanError::InvalidDirectory`.
pub fn scan_with(stats_dir: &Path, cache: &CacheStore, options: &ScanOptions) -> Result<Vec<Run>, ScanError> {
    let start = Instant::now();
    let files = scan_files(stats_dir)?;
    let snapshot = cache.load();
    let diff = diff_against_cache(&files, &snapshot.file_info);

    let mut parsed = Vec::with_capacity(diff.changed_files.len());
    let mut dropped = 0usize;
    for file in &diff.changed_files {
        match parse_stat_file_with(&file.path, &options.parse) {
            Ok(run) => parsed.push(run),
            Err(e) => {
                dropped += 1;
                debug!(error = %e, "Skipping unparseable stat file");
            }
        }
    }
    let new_count = parsed.len();

    let mut history = merge_runs(snapshot.history, parsed);
    if history.is_empty() {
        info!(path = %stats_dir.display(), "Stats directory holds no runs");
        return Ok(history);
    }

    assign_sessions(&mut history, options.session_gap_minutes);

    let current_info: FileInfoMap = files.iter().map(|f| (f.identity(), f.modified_at)).collect();
    if let Err(e) = cache.save(&history, &current_info) {
        warn!(error = %e, "Failed to persist run cache (non-fatal)");
    }

    info!(
        files = files.len(),
        changed = diff.changed_files.len(),
        unchanged = diff.unchanged_count,
        parsed = new_count,
        dropped,
        total_runs = history.len(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Scan complete"
    );
    Ok(history)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn write_stat(dir: &Path, name: &str, scenario: &str, score: f64) -> PathBuf {
        let path = dir.join(name);
        let body = format!("Scenario:,{scenario}\nScore:,{score}\nHoriz Sens:,30\n");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_is_stat_file_name() {
        assert!(is_stat_file_name("Gridshot - Challenge - 2025.01.01-10.00.00 Stats.csv"));
        assert!(!is_stat_file_name("Gridshot - Challenge - 2025.01.01-10.00.00 Stats.txt"));
        assert!(!is_stat_file_name("Gridshot - 2025.01.01-10.00.00 Stats.csv"));
    }

    #[test]
    fn test_scan_files_filters_and_is_not_recursive() {
        let dir = TempDir::new().unwrap();
        write_stat(dir.path(), "A - Challenge - 2025.01.01-10.00.00 Stats.csv", "A", 1.0);
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();
        let nested = dir.path().join("old");
        std::fs::create_dir(&nested).unwrap();
        write_stat(&nested, "B - Challenge - 2025.01.01-10.00.00 Stats.csv", "B", 1.0);

        let files = scan_files(dir.path()).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].modified_at > 0.0);
    }

    #[test]
    fn test_scan_files_invalid_dir() {
        let err = scan_files(Path::new("/nonexistent/stats")).unwrap_err();
        assert!(matches!(err, ScanError::InvalidDirectory { .. }));
    }

    #[test]
    fn test_diff_new_modified_unchanged() {
        let files = vec![
            FileInfo { path: "/s/new.csv".into(), modified_at: 10.0 },
            FileInfo { path: "/s/touched.csv".into(), modified_at: 20.0 },
            FileInfo { path: "/s/same.csv".into(), modified_at: 30.0 },
        ];
        let mut known = FileInfoMap::new();
        known.insert("/s/touched.csv".into(), 15.0);
        known.insert("/s/same.csv".into(), 30.0);

        let diff = diff_against_cache(&files, &known);
        let changed: Vec<_> = diff.changed_files.iter().map(|f| f.identity()).collect();
        assert_eq!(changed, vec!["/s/new.csv", "/s/touched.csv"]);
        assert_eq!(diff.unchanged_count, 1);
    }

    #[test]
    fn test_merge_dedups_identical_run() {
        let t0 = NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let cached = Run::new("Gridshot", 30.0, 120.0, t0).with_duration(42.0);
        let reparsed = Run::new("Gridshot", 30.0, 120.0, t0);

        let merged = merge_runs(vec![cached], vec![reparsed]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].duration, 42.0);
    }

    #[test]
    fn test_scan_persists_and_reuses_cache() {
        let stats = TempDir::new().unwrap();
        let cache_dir = TempDir::new().unwrap();
        let cache = CacheStore::new(cache_dir.path());

        write_stat(stats.path(), "A - Challenge - 2025.01.01-10.00.00 Stats.csv", "A", 100.0);
        write_stat(stats.path(), "A - Challenge - 2025.01.01-10.05.00 Stats.csv", "A", 110.0);
        std::fs::write(
            stats.path().join("Broken - Challenge - 2025.01.01-10.06.00 Stats.csv"),
            "Scenario:,Broken\n",
        )
        .unwrap();

        let history = scan(stats.path(), &cache, 30).unwrap();
        assert_eq!(history.len(), 2);
        assert!(cache.history_path().exists());
        assert_eq!(cache.load().file_info.len(), 3);

        // Second scan: nothing changed, the cached history is returned as-is
        let again = scan(stats.path(), &cache, 30).unwrap();
        assert_eq!(again, history);
    }

    #[test]
    fn test_scan_backfill_resegments_whole_history() {
        let stats = TempDir::new().unwrap();
        let cache_dir = TempDir::new().unwrap();
        let cache = CacheStore::new(cache_dir.path());

        write_stat(stats.path(), "A - Challenge - 2025.01.01-10.00.00 Stats.csv", "A", 1.0);
        write_stat(stats.path(), "A - Challenge - 2025.01.01-11.00.00 Stats.csv", "A", 2.0);
        let first = scan(stats.path(), &cache, 30).unwrap();
        assert_eq!(first.iter().map(|r| r.session_id).collect::<Vec<_>>(), vec![0, 1]);

        // An old file bridging the gap arrives later
        write_stat(stats.path(), "A - Challenge - 2025.01.01-10.30.00 Stats.csv", "A", 3.0);
        let second = scan(stats.path(), &cache, 30).unwrap();
        assert_eq!(second.iter().map(|r| r.session_id).collect::<Vec<_>>(), vec![0, 0, 0]);
    }

    #[test]
    fn test_scan_empty_dir_is_valid_and_empty() {
        let stats = TempDir::new().unwrap();
        let cache_dir = TempDir::new().unwrap();
        let history = scan(stats.path(), &CacheStore::new(cache_dir.path()), 30).unwrap();
        assert!(history.is_empty());
    }

    #[test]
    fn test_scan_survives_unwritable_cache() {
        let stats = TempDir::new().unwrap();
        let blocker = TempDir::new().unwrap();
        // A regular file where the cache directory should be
        let cache_path = blocker.path().join("cache");
        std::fs::write(&cache_path, "not a dir").unwrap();

        write_stat(stats.path(), "A - Challenge - 2025.01.01-10.00.00 Stats.csv", "A", 1.0);
        let history = scan(stats.path(), &CacheStore::new(&cache_path), 30).unwrap();
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_listing_error_yields_no_files() {
        let denied = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(listing_or_empty::<()>(Path::new("/stats"), Err(denied)).is_none());
        assert_eq!(listing_or_empty(Path::new("/stats"), Ok(3)), Some(3));
    }

    #[cfg(unix)]
    #[test]
    fn test_unlistable_dir_returns_cached_history() {
        use std::os::unix::fs::PermissionsExt;

        let stats = TempDir::new().unwrap();
        let cache_dir = TempDir::new().unwrap();
        let cache = CacheStore::new(cache_dir.path());
        write_stat(stats.path(), "A - Challenge - 2025.01.01-10.00.00 Stats.csv", "A", 1.0);
        assert_eq!(scan(stats.path(), &cache, 30).unwrap().len(), 1);

        std::fs::set_permissions(stats.path(), std::fs::Permissions::from_mode(0o000)).unwrap();
        let result = scan(stats.path(), &cache, 30);
        std::fs::set_permissions(stats.path(), std::fs::Permissions::from_mode(0o755)).unwrap();

        // Root can still list the directory; the cached run comes back either way
        assert_eq!(result.unwrap().len(), 1);
    }

    #[test]
    fn test_corrupt_start_time_does_not_abort_scan() {
        let stats = TempDir::new().unwrap();
        let cache_dir = TempDir::new().unwrap();
        write_stat(stats.path(), "A - Challenge - 2025.01.01-10.00.00 Stats.csv", "A", 1.0);
        std::fs::write(
            stats.path().join("B - Challenge - 2025.01.01-12.00.00 Stats.csv"),
            "Scenario:,B\nScore:,2\nHoriz Sens:,30\nChallenge Start:,11:59:00.12345\u{e9}x\n",
        )
        .unwrap();
        std::fs::write(stats.path().join("C - Challenge - garbage.csv"), "\u{fffd}\u{e9}").unwrap();

        let history = scan(stats.path(), &CacheStore::new(cache_dir.path()), 30).unwrap();
        let scenarios: Vec<&str> = history.iter().map(|r| r.scenario.as_str()).collect();
        assert_eq!(scenarios, vec!["A", "B"]);
        assert_eq!(history[1].duration, crate::types::DEFAULT_RUN_DURATION_SECS);
    }
}
