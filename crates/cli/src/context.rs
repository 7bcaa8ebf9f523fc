use crate::cli::Cli;
use anyhow::{Context, Result};
use scorebook_core::indexer::scan_with;
use scorebook_core::{enrich, paths, CacheStore, Run, ScanOptions, SettingsStore};
use std::path::PathBuf;

/// Everything a command needs, resolved from flags and stored settings.
pub struct AppContext {
    pub settings: SettingsStore,
    stats_dir: Option<PathBuf>,
    pub cache: CacheStore,
    pub scan_options: ScanOptions,
}

impl AppContext {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let settings = match &cli.settings {
            Some(path) => SettingsStore::open(path),
            None => SettingsStore::open_default().context("cannot locate settings file")?,
        };

        let cache_dir = match &cli.cache_dir {
            Some(dir) => dir.clone(),
            None => paths::default_cache_dir().context("cannot locate a cache directory")?,
        };

        let mut scan_options = settings.scan_options();
        if let Some(gap) = cli.gap {
            scan_options.session_gap_minutes = gap;
        }

        Ok(Self {
            stats_dir: cli.stats_dir.clone().or_else(|| settings.stats_path()),
            settings,
            cache: CacheStore::new(cache_dir),
            scan_options,
        })
    }

    pub fn stats_dir(&self) -> Result<&PathBuf> {
        self.stats_dir
            .as_ref()
            .context("no stats directory: pass --stats-dir or `config set stats_path <dir>`")
    }

    /// Scan, segment and enrich.
    pub fn load_history(&self) -> Result<Vec<Run>> {
        let dir = self.stats_dir()?;
        let history = scan_with(dir, &self.cache, &self.scan_options)
            .with_context(|| format!("scanning {}", dir.display()))?;
        Ok(enrich(history))
    }
}
