// crates/core/src/metrics.rs
//! Small derived numbers and display helpers shared by the analyzers.
//!
//! Everything here is computed on read, never stored in the cache.

/// Format seconds as `HH:MM:SS`.
///
/// Hours are not wrapped at 24, so a 26-hour total reads `26:00:00`.
/// Negative and non-finite inputs format as zero.
pub fn format_hms(seconds: f64) -> String {
    let total = whole_seconds(seconds);
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

/// Format seconds as `Xh Ym`, e.g. `12h 5m`.
pub fn format_hours_minutes(seconds: f64) -> String {
    let total = whole_seconds(seconds);
    format!("{}h {}m", total / 3600, (total % 3600) / 60)
}

fn whole_seconds(seconds: f64) -> u64 {
    if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    }
}

/// Relative change of `value` against `baseline`, in percent.
///
/// Returns 0 when the baseline is zero. A negative baseline keeps its sign,
/// so improving on a negative score reads as a negative percentage.
pub fn pct_change(value: f64, baseline: f64) -> f64 {
    if baseline != 0.0 {
        (value - baseline) / baseline * 100.0
    } else {
        0.0
    }
}

/// Arithmetic mean. `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

// ============================================================================
// Tests
// ============================================================================
