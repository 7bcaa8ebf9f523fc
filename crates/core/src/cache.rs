// crates/core/src/cache.rs
//! Persisted run cache.
//!
//! Two JSON files live in an injected cache directory:
//! - `history.json`: every run parsed so far
//! - `file_info.json`: stat file path → modification time (Unix seconds)

use crate::error::CacheError;
use crate::types::Run;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const HISTORY_FILE: &str = "history.json";
pub const FILE_INFO_FILE: &str = "file_info.json";

/// Stat file path → last-seen modification time in seconds.
pub type FileInfoMap = BTreeMap<String, f64>;

/// What a previous scan left behind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheSnapshot {
    pub history: Vec<Run>,
    pub file_info: FileInfoMap,
}

/// Handle on the cache directory. Nothing is touched until load/save.
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn history_path(&self) -> PathBuf {
        self.dir.join(HISTORY_FILE)
    }

    pub fn file_info_path(&self) -> PathBuf {
        self.dir.join(FILE_INFO_FILE)
    }

    /// Load the cache, degrading to an empty snapshot on any problem.
    ///
    /// A missing cache is a normal cold start; a corrupt one is logged.
    pub fn load(&self) -> CacheSnapshot {
        match self.try_load() {
            Ok(snapshot) => snapshot,
            Err(CacheError::NotFound { path }) => {
                debug!(path = %path.display(), "No run cache yet, starting cold");
                CacheSnapshot::default()
            }
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable run cache");
                CacheSnapshot::default()
            }
        }
    }

    /// Load the cache. Both files must exist for the history to be trusted.
    pub fn try_load(&self) -> Result<CacheSnapshot, CacheError> {
        let history_path = self.history_path();
        let info_path = self.file_info_path();
        if !history_path.exists() {
            return Err(CacheError::NotFound { path: history_path });
        }
        if !info_path.exists() {
            return Err(CacheError::NotFound { path: info_path });
        }

        let history: Vec<Run> = read_json(&history_path)?;
        let file_info: FileInfoMap = read_json(&info_path)?;
        Ok(CacheSnapshot { history, file_info })
    }

    /// Write both cache files, creating the directory if needed.
    pub fn save(&self, history: &[Run], file_info: &FileInfoMap) -> Result<(), CacheError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| CacheError::io(&self.dir, e))?;
        write_json(&self.history_path(), history)?;
        write_json(&self.file_info_path(), file_info)?;
        Ok(())
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, CacheError> {
    let contents = std::fs::read_to_string(path).map_err(|e| CacheError::io(path, e))?;
    serde_json::from_str(&contents).map_err(|e| CacheError::Corrupt {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Serialize to a sibling temp file, then rename over the target.
fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), CacheError> {
    let json = serde_json::to_string(value).map_err(|e| CacheError::Serialize {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json).map_err(|e| CacheError::io(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| CacheError::io(path, e))?;
    Ok(())
}
