// crates/core/src/settings.rs
//! Persisted user settings.
//!
//! The file is a JSON object:
//!
//! ```json
//! {
//!   "config_version": 2,
//!   "global": { "stats_path": "", "session_gap": 30, ... },
//!   "scenarios": { "Gridshot": { "flow_window": 8 } },
//!   "favorites": ["Gridshot"]
//! }
//! ```
//!
//! On load the user file is deep-merged into the defaults, so keys added in
//! later versions always exist. Lookups check the scenario override first,
//! then the global section. Every setter writes the file immediately.

use crate::analyzer::DEFAULT_FLOW_WINDOW;
use crate::error::SettingsError;
use crate::indexer::ScanOptions;
use crate::parser::ParseOptions;
use crate::paths;
use crate::sessions::DEFAULT_SESSION_GAP_MINUTES;
use crate::types::DEFAULT_RUN_DURATION_SECS;
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const CONFIG_VERSION: u64 = 2;

pub const KEY_STATS_PATH: &str = "stats_path";
pub const KEY_SESSION_GAP: &str = "session_gap";
pub const KEY_FLOW_WINDOW: &str = "flow_window";
pub const KEY_STACK_PBS: &str = "session_stack_pbs";
pub const KEY_FALLBACK_DURATION: &str = "fallback_duration_secs";

fn default_settings() -> Map<String, Value> {
    let defaults = json!({
        "config_version": CONFIG_VERSION,
        "global": {
            KEY_STATS_PATH: "",
            KEY_SESSION_GAP: DEFAULT_SESSION_GAP_MINUTES,
            KEY_FLOW_WINDOW: DEFAULT_FLOW_WINDOW,
            KEY_STACK_PBS: false,
            KEY_FALLBACK_DURATION: DEFAULT_RUN_DURATION_SECS,
        },
        "scenarios": {},
        "favorites": [],
    });
    match defaults {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Recursively merge `user` into `base`: objects merge key by key, anything
/// else replaces.
pub fn deep_merge(base: &mut Map<String, Value>, user: Map<String, Value>) {
    for (key, value) in user {
        match (base.get_mut(&key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => deep_merge(existing, incoming),
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

/// The object stored under `key`, replacing a missing or non-object value.
fn object_entry<'a>(map: &'a mut Map<String, Value>, key: &str) -> &'a mut Map<String, Value> {
    let entry = map
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !entry.is_object() {
        *entry = Value::Object(Map::new());
    }
    match entry {
        Value::Object(inner) => inner,
        _ => unreachable!("entry was just made an object"),
    }
}

/// Settings file handle plus the merged in-memory document.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
    doc: Map<String, Value>,
}

impl SettingsStore {
    /// Open the per-user settings file.
    pub fn open_default() -> Result<Self, SettingsError> {
        let path = paths::settings_path().ok_or(SettingsError::HomeDirNotFound)?;
        Ok(Self::open(path))
    }

    /// Open `path`, falling back to defaults when it is missing or corrupt.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut doc = default_settings();
        match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<Value>(&contents) {
                Ok(Value::Object(user)) => deep_merge(&mut doc, user),
                Ok(_) => warn!(path = %path.display(), "Settings file is not an object, using defaults"),
                Err(e) => warn!(path = %path.display(), error = %e, "Corrupt settings file, using defaults"),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No settings file yet");
            }
            Err(e) => warn!(path = %path.display(), error = %e, "Cannot read settings file, using defaults"),
        }
        Self { path, doc }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the document to disk, creating the parent directory if needed.
    pub fn save(&self) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SettingsError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        let json = serde_json::to_string_pretty(&self.doc).map_err(|e| SettingsError::Serialize {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&self.path, json).map_err(|e| SettingsError::Io {
            path: self.path.clone(),
            source: e,
        })
    }

    fn section(&self, name: &str) -> Option<&Map<String, Value>> {
        self.doc.get(name).and_then(Value::as_object)
    }

    fn section_mut(&mut self, name: &str) -> &mut Map<String, Value> {
        object_entry(&mut self.doc, name)
    }

    /// Raw lookup: scenario override first, then global.
    pub fn get(&self, key: &str, scenario: Option<&str>) -> Option<&Value> {
        let scenario_value = scenario.and_then(|name| {
            self.section("scenarios")
                .and_then(|s| s.get(name))
                .and_then(|s| s.get(key))
        });
        scenario_value.or_else(|| self.section("global").and_then(|g| g.get(key)))
    }

    /// Typed lookup. A value of the wrong shape reads as absent.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str, scenario: Option<&str>) -> Option<T> {
        self.get(key, scenario)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn set_global(&mut self, key: &str, value: impl Into<Value>) -> Result<(), SettingsError> {
        self.section_mut("global").insert(key.to_string(), value.into());
        self.save()
    }

    pub fn set_scenario(
        &mut self,
        scenario: &str,
        key: &str,
        value: impl Into<Value>,
    ) -> Result<(), SettingsError> {
        let scenarios = self.section_mut("scenarios");
        object_entry(scenarios, scenario).insert(key.to_string(), value.into());
        self.save()
    }

    // ------------------------------------------------------------------------
    // Typed accessors
    // ------------------------------------------------------------------------

    /// Configured stats directory; `None` when unset or blank.
    pub fn stats_path(&self) -> Option<PathBuf> {
        self.get_as::<String>(KEY_STATS_PATH, None)
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
    }

    pub fn session_gap_minutes(&self) -> u32 {
        self.get_as(KEY_SESSION_GAP, None)
            .unwrap_or(DEFAULT_SESSION_GAP_MINUTES)
    }

    pub fn flow_window(&self, scenario: Option<&str>) -> usize {
        self.get_as(KEY_FLOW_WINDOW, scenario)
            .filter(|w: &usize| *w > 0)
            .unwrap_or(DEFAULT_FLOW_WINDOW)
    }

    pub fn stack_pbs(&self) -> bool {
        self.get_as(KEY_STACK_PBS, None).unwrap_or(false)
    }

    pub fn fallback_duration_secs(&self) -> f64 {
        self.get_as(KEY_FALLBACK_DURATION, None)
            .filter(|d: &f64| *d > 0.0)
            .unwrap_or(DEFAULT_RUN_DURATION_SECS)
    }

    /// Scan options assembled from the stored settings.
    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            session_gap_minutes: self.session_gap_minutes(),
            parse: ParseOptions {
                fallback_duration_secs: self.fallback_duration_secs(),
                ..ParseOptions::default()
            },
        }
    }

    // ------------------------------------------------------------------------
    // Favorites
    // ------------------------------------------------------------------------

    pub fn favorites(&self) -> Vec<String> {
        self.doc
            .get("favorites")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn is_favorite(&self, scenario: &str) -> bool {
        self.favorites().iter().any(|f| f == scenario)
    }

    /// Add a favorite. Saves only when something changed.
    pub fn add_favorite(&mut self, scenario: &str) -> Result<(), SettingsError> {
        let mut favorites = self.favorites();
        if favorites.iter().any(|f| f == scenario) {
            return Ok(());
        }
        favorites.push(scenario.to_string());
        self.set_favorites(favorites)
    }

    /// Remove a favorite. Saves only when something changed.
    pub fn remove_favorite(&mut self, scenario: &str) -> Result<(), SettingsError> {
        let mut favorites = self.favorites();
        let before = favorites.len();
        favorites.retain(|f| f != scenario);
        if favorites.len() == before {
            return Ok(());
        }
        self.set_favorites(favorites)
    }

    fn set_favorites(&mut self, favorites: Vec<String>) -> Result<(), SettingsError> {
        self.doc.insert("favorites".to_string(), json!(favorites));
        self.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_deep_merge_keeps_new_defaults() {
        let mut base = object(json!({"global": {"a": 1, "b": 2}, "list": [1]}));
        deep_merge(&mut base, object(json!({"global": {"b": 3}, "list": [9, 9]})));
        assert_eq!(
            Value::Object(base),
            json!({"global": {"a": 1, "b": 3}, "list": [9, 9]})
        );
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let store = SettingsStore::open(dir.path().join("settings.json"));
        assert_eq!(store.session_gap_minutes(), DEFAULT_SESSION_GAP_MINUTES);
        assert_eq!(store.flow_window(None), DEFAULT_FLOW_WINDOW);
        assert!(!store.stack_pbs());
        assert_eq!(store.stats_path(), None);
        assert_eq!(store.fallback_duration_secs(), DEFAULT_RUN_DURATION_SECS);
    }

    #[test]
    fn test_user_file_merged_into_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"global": {"session_gap": 45, "stats_path": "/games/stats"}, "theme": "dark"}"#,
        )
        .unwrap();

        let store = SettingsStore::open(&path);
        assert_eq!(store.session_gap_minutes(), 45);
        assert_eq!(store.stats_path(), Some(PathBuf::from("/games/stats")));
        // Untouched default still present
        assert_eq!(store.flow_window(None), DEFAULT_FLOW_WINDOW);
        assert_eq!(store.get("theme", None), None);
    }

    #[test]
    fn test_corrupt_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ nope").unwrap();
        let store = SettingsStore::open(&path);
        assert_eq!(store.session_gap_minutes(), DEFAULT_SESSION_GAP_MINUTES);
    }

    #[test]
    fn test_scenario_override_wins() {
        let dir = TempDir::new().unwrap();
        let mut store = SettingsStore::open(dir.path().join("settings.json"));
        store.set_global(KEY_FLOW_WINDOW, 7).unwrap();
        store.set_scenario("Gridshot", KEY_FLOW_WINDOW, 3).unwrap();

        assert_eq!(store.flow_window(Some("Gridshot")), 3);
        assert_eq!(store.flow_window(Some("Sixshot")), 7);
        assert_eq!(store.flow_window(None), 7);
    }

    #[test]
    fn test_setters_persist() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let mut store = SettingsStore::open(&path);
        store.set_global(KEY_STACK_PBS, true).unwrap();
        store.set_global(KEY_SESSION_GAP, 20).unwrap();

        let reopened = SettingsStore::open(&path);
        assert!(reopened.stack_pbs());
        assert_eq!(reopened.scan_options().session_gap_minutes, 20);
    }

    #[test]
    fn test_favorites() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        let mut store = SettingsStore::open(&path);
        store.add_favorite("Gridshot").unwrap();
        store.add_favorite("Gridshot").unwrap();
        store.add_favorite("Sixshot").unwrap();
        assert_eq!(store.favorites(), vec!["Gridshot", "Sixshot"]);

        store.remove_favorite("Gridshot").unwrap();
        store.remove_favorite("Missing").unwrap();
        let reopened = SettingsStore::open(&path);
        assert!(!reopened.is_favorite("Gridshot"));
        assert!(reopened.is_favorite("Sixshot"));
    }

    #[test]
    fn test_wrong_type_reads_as_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"global": {"session_gap": "soon", "flow_window": 0}}"#).unwrap();
        let store = SettingsStore::open(&path);
        assert_eq!(store.session_gap_minutes(), DEFAULT_SESSION_GAP_MINUTES);
        assert_eq!(store.flow_window(None), DEFAULT_FLOW_WINDOW);
    }
}
