// crates/core/src/parser.rs
//! Parser for the per-run stat files written by the aim trainer.
//!
//! A stat file is a small CSV-ish text file. Only a handful of labeled lines
//! matter here:
//!
//! ```text
//! Scenario:,1w4ts reload
//! Score:,812.4
//! Horiz Sens:,34.64
//! Challenge Start:,19:42:07.512
//! ```
//!
//! The run's end time comes from the `YYYY.MM.DD-HH.MM.SS` stamp embedded in
//! the file name, falling back to the file's modification time.

use crate::error::ParseError;
use crate::types::{Run, DEFAULT_RUN_DURATION_SECS};
use chrono::{DateTime, Duration, Local, NaiveDateTime, NaiveTime};
use regex_lite::Regex;
use std::path::Path;
use std::sync::OnceLock;
use tracing::debug;

const SCENARIO_LABEL: &str = "Scenario:";
const SCORE_LABEL: &str = "Score:";
const SENS_LABEL: &str = "Horiz Sens:";
const CHALLENGE_START_LABEL: &str = "Challenge Start:";

const FILENAME_TIMESTAMP_FORMAT: &str = "%Y.%m.%d-%H.%M.%S";

fn filename_timestamp_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\d{4}\.\d{2}\.\d{2}-\d{2}\.\d{2}\.\d{2})").expect("static timestamp pattern")
    })
}

/// Tunables for duration derivation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParseOptions {
    /// Duration assigned when the start time is missing or implausible.
    pub fallback_duration_secs: f64,
    /// Derived durations must lie strictly between zero and this bound.
    pub max_duration_secs: f64,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            fallback_duration_secs: DEFAULT_RUN_DURATION_SECS,
            max_duration_secs: 600.0,
        }
    }
}

/// Extract the end-of-run timestamp embedded in a stat file name, if any.
///
/// Returns `Some(Err(..))` when a stamp-shaped substring is present but is not
/// a real date (e.g. month 13).
pub fn timestamp_from_filename(file_name: &str) -> Option<Result<NaiveDateTime, chrono::ParseError>> {
    filename_timestamp_regex()
        .captures(file_name)
        .and_then(|caps| caps.get(1))
        .map(|m| NaiveDateTime::parse_from_str(m.as_str(), FILENAME_TIMESTAMP_FORMAT))
}

/// Parse a stat file with default options.
pub fn parse_stat_file(path: &Path) -> Result<Run, ParseError> {
    parse_stat_file_with(path, &ParseOptions::default())
}

/// Parse a stat file into a [`Run`].
///
/// # Errors
/// - `ParseError::NotFound` / `PermissionDenied` / `Io` when the file can't be read
/// - `ParseError::MissingField` when Scenario, Score or Horiz Sens is absent
/// - `ParseError::InvalidNumber` when Score or Horiz Sens is not a number
/// - `ParseError::NoTimestamp` when neither the name nor the mtime yields a time
pub fn parse_stat_file_with(path: &Path, options: &ParseOptions) -> Result<Run, ParseError> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let end_time = match timestamp_from_filename(&file_name) {
        Some(Ok(ts)) => ts,
        Some(Err(_)) => return Err(ParseError::NoTimestamp { path: path.to_path_buf() }),
        None => modified_local_time(path)?,
    };

    let contents = std::fs::read_to_string(path).map_err(|e| ParseError::io(path, e))?;
    parse_stat_contents(path, &contents, end_time, options)
}

fn modified_local_time(path: &Path) -> Result<NaiveDateTime, ParseError> {
    let metadata = std::fs::metadata(path).map_err(|e| ParseError::io(path, e))?;
    let modified = metadata
        .modified()
        .map_err(|_| ParseError::NoTimestamp { path: path.to_path_buf() })?;
    Ok(DateTime::<Local>::from(modified).naive_local())
}

/// Parse already-loaded stat file text, given the run's end time.
///
/// The first occurrence of each labeled line wins.
pub fn parse_stat_contents(
    path: &Path,
    contents: &str,
    end_time: NaiveDateTime,
    options: &ParseOptions,
) -> Result<Run, ParseError> {
    let mut scenario: Option<String> = None;
    let mut score: Option<f64> = None;
    let mut sens: Option<f64> = None;
    let mut start_raw: Option<String> = None;

    for line in contents.lines() {
        if line.starts_with(SCENARIO_LABEL) {
            if scenario.is_none() {
                let value = line
                    .split_once(',')
                    .map(|(_, v)| v.trim().to_string())
                    .ok_or_else(|| missing(path, "Scenario"))?;
                scenario = Some(value);
            }
        } else if line.starts_with(SCORE_LABEL) {
            if score.is_none() {
                score = Some(number_field(path, line, "Score")?);
            }
        } else if line.starts_with(SENS_LABEL) {
            if sens.is_none() {
                sens = Some(number_field(path, line, "Horiz Sens")?);
            }
        } else if line.starts_with(CHALLENGE_START_LABEL) && start_raw.is_none() {
            start_raw = line.split(',').nth(1).map(|v| v.trim().to_string());
        }
    }

    let scenario = scenario.ok_or_else(|| missing(path, "Scenario"))?;
    let score = score.ok_or_else(|| missing(path, "Score"))?;
    let sens = sens.ok_or_else(|| missing(path, "Horiz Sens"))?;

    let duration = start_raw
        .as_deref()
        .and_then(|raw| derive_duration(raw, end_time, options))
        .unwrap_or(options.fallback_duration_secs);

    Ok(Run::new(scenario, sens, score, end_time).with_duration(duration))
}

fn missing(path: &Path, field: &'static str) -> ParseError {
    ParseError::MissingField {
        path: path.to_path_buf(),
        field,
    }
}

fn number_field(path: &Path, line: &str, field: &'static str) -> Result<f64, ParseError> {
    let raw = line
        .split(',')
        .nth(1)
        .map(str::trim)
        .ok_or_else(|| missing(path, field))?;
    raw.parse::<f64>().map_err(|_| ParseError::InvalidNumber {
        path: path.to_path_buf(),
        field,
        value: raw.to_string(),
    })
}

/// Seconds between the `Challenge Start` time of day and `end_time`.
///
/// A start later than the end means the run crossed midnight. Returns `None`
/// for unparseable times or durations outside `(0, max_duration_secs)`.
pub fn derive_duration(raw_start: &str, end_time: NaiveDateTime, options: &ParseOptions) -> Option<f64> {
    let start_of_day = parse_time_of_day(raw_start)?;
    let mut start = end_time.date().and_time(start_of_day);
    if start > end_time {
        start -= Duration::days(1);
    }
    let micros = (end_time - start).num_microseconds()?;
    let seconds = micros as f64 / 1_000_000.0;
    if seconds > 0.0 && seconds < options.max_duration_secs {
        Some(seconds)
    } else {
        debug!(seconds, "Discarding implausible run duration");
        None
    }
}

fn parse_time_of_day(raw: &str) -> Option<NaiveTime> {
    // Keep at most microsecond precision. A cut inside a multi-byte char
    // leaves the text whole, and it then fails to parse.
    let trimmed = match raw.find('.') {
        Some(dot) if raw.len() > dot + 7 => raw.get(..dot + 7).unwrap_or(raw),
        _ => raw,
    };
    NaiveTime::parse_from_str(trimmed, "%H:%M:%S%.f").ok()
}
