//! Centralized path functions for all app storage locations.
//!
//! Everything else takes its directories as arguments; these are only the
//! per-user defaults.

use std::path::PathBuf;

const APP_DIR: &str = "scorebook";

/// App data root: `~/Library/Application Support/scorebook/` (macOS) or
/// `~/.local/share/scorebook/` (Linux).
pub fn app_data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join(APP_DIR))
}

/// Default run cache directory: `<app_cache_dir>/`.
///
/// Holds `history.json` and `file_info.json`.
pub fn default_cache_dir() -> Option<PathBuf> {
    dirs::cache_dir().map(|d| d.join(APP_DIR))
}

/// Settings file: `<app_data_dir>/settings.json`.
pub fn settings_path() -> Option<PathBuf> {
    app_data_dir().map(|d| d.join("settings.json"))
}

/// Rolling log directory: `<app_data_dir>/logs/`.
pub fn log_dir() -> Option<PathBuf> {
    app_data_dir().map(|d| d.join("logs"))
}
