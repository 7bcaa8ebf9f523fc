//! `scorebook watch`: re-scan the stats directory whenever stat files change.
//!
//! The aim trainer writes one file per finished run, often followed by a
//! rename or a second write. Events are collected until the directory has
//! been quiet for [`DEBOUNCE`], then a single scan runs on this thread, so
//! scans never overlap.

use crate::context::AppContext;
use anyhow::{Context, Result};
use notify::{EventKind, RecursiveMode, Watcher};
use scorebook_core::indexer::is_stat_file_name;
use scorebook_core::latest_session_id;
use std::path::Path;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;
use tracing::{error, info, warn};

pub const DEBOUNCE: Duration = Duration::from_millis(2000);

/// Whether a notify event touches a stat file.
pub fn is_relevant(event: &notify::Event) -> bool {
    let kind_matches = matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    );
    kind_matches
        && event.paths.iter().any(|p| {
            p.file_name()
                .map(|name| is_stat_file_name(&name.to_string_lossy()))
                .unwrap_or(false)
        })
}

pub fn run(ctx: &AppContext) -> Result<()> {
    let stats_dir = ctx.stats_dir()?.clone();
    rescan(ctx, &stats_dir);

    let (tx, rx) = mpsc::channel::<()>();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| match res {
        Ok(event) if is_relevant(&event) => {
            // Receiver gone means we're shutting down
            let _ = tx.send(());
        }
        Ok(_) => {}
        Err(e) => error!("File watcher error: {}", e),
    })
    .context("creating file watcher")?;

    watcher
        .watch(&stats_dir, RecursiveMode::NonRecursive)
        .with_context(|| format!("watching {}", stats_dir.display()))?;
    info!(path = %stats_dir.display(), "Watching for new stat files");

    while rx.recv().is_ok() {
        // Wait for a quiet period before scanning
        loop {
            match rx.recv_timeout(DEBOUNCE) {
                Ok(()) => continue,
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => return Ok(()),
            }
        }
        rescan(ctx, &stats_dir);
    }
    Ok(())
}

fn rescan(ctx: &AppContext, stats_dir: &Path) {
    match ctx.load_history() {
        Ok(history) => {
            let latest = latest_session_id(&history);
            println!(
                "{}",
                serde_json::json!({ "runs": history.len(), "latestSession": latest })
            );
        }
        Err(e) => warn!(path = %stats_dir.display(), error = %format!("{e:#}"), "Scan failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind};
    use std::path::PathBuf;

    fn event(kind: EventKind, path: &str) -> notify::Event {
        notify::Event::new(kind).add_path(PathBuf::from(path))
    }

    #[test]
    fn test_stat_file_events_are_relevant() {
        let e = event(
            EventKind::Create(CreateKind::File),
            "/stats/Gridshot - Challenge - 2025.01.01-10.00.00 Stats.csv",
        );
        assert!(is_relevant(&e));
    }

    #[test]
    fn test_other_files_and_access_events_are_ignored() {
        let other = event(EventKind::Modify(ModifyKind::Any), "/stats/notes.txt");
        assert!(!is_relevant(&other));

        let access = event(
            EventKind::Access(notify::event::AccessKind::Any),
            "/stats/Gridshot - Challenge - 2025.01.01-10.00.00 Stats.csv",
        );
        assert!(!is_relevant(&access));
    }
}
