use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::markdown::reconcile::Reconciler;

/// Invoked with the transition count after each successful sync.
pub type OnSynced = Arc<dyn Fn(usize) + Send + Sync>;

/// Editors often write in bursts (write-then-rename); events inside this
/// window coalesce into one sync cycle.
const DEBOUNCE: Duration = Duration::from_millis(250);

const CHANNEL_CAPACITY: usize = 64;

/// Watches a generated markdown file and drives the parse→reconcile
/// pipeline when it changes.
///
/// Filesystem events are bridged from the `notify` callback thread into a
/// tokio channel and drained by a single consumer task, so two edits can
/// never run reconciliation concurrently against the same file.
pub struct FileWatcher {
    reconciler: Arc<Reconciler>,
    sync_on_edit: bool,
    active: Option<ActiveWatch>,
}

struct ActiveWatch {
    /// Keeps the OS watch registered; dropping it stops event delivery.
    _watcher: RecommendedWatcher,
    task: tokio::task::JoinHandle<()>,
}

impl FileWatcher {
    pub fn new(reconciler: Arc<Reconciler>, sync_on_edit: bool) -> Self {
        Self {
            reconciler,
            sync_on_edit,
            active: None,
        }
    }

    /// Start watching `path`. A no-op when sync-on-edit is disabled in the
    /// config. Re-calling while already watching stops the previous watch
    /// first, so there is never more than one OS watch alive.
    pub fn watch(&mut self, path: &Path, on_synced: Option<OnSynced>) -> Result<()> {
        if !self.sync_on_edit {
            debug!("sync_on_edit disabled, not watching {}", path.display());
            return Ok(());
        }
        self.unwatch();

        let target = absolute(path);
        let dir = target
            .parent()
            .with_context(|| format!("{} has no parent directory", target.display()))?
            .to_path_buf();

        let (tx, rx) = mpsc::channel::<PathBuf>(CHANNEL_CAPACITY);
        let mut watcher = RecommendedWatcher::new(
            move |res: std::result::Result<notify::Event, notify::Error>| match res {
                Ok(event) => {
                    if matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                        for path in event.paths {
                            // Channel full means a sync is already queued;
                            // dropping the event loses nothing.
                            let _ = tx.try_send(path);
                        }
                    }
                }
                Err(e) => warn!("filesystem watcher error: {e}"),
            },
            notify::Config::default(),
        )
        .context("failed to create filesystem watcher")?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("failed to watch {}", dir.display()))?;

        info!("watching {} for edits", target.display());

        let reconciler = Arc::clone(&self.reconciler);
        let task = tokio::spawn(run_sync_loop(rx, target, reconciler, on_synced));

        self.active = Some(ActiveWatch {
            _watcher: watcher,
            task,
        });
        Ok(())
    }

    /// Stop watching. Safe to call when not currently watching.
    pub fn unwatch(&mut self) {
        if let Some(active) = self.active.take() {
            active.task.abort();
        }
    }

    pub fn is_watching(&self) -> bool {
        self.active.is_some()
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        self.unwatch();
    }
}

/// Serial consumer: drains change events, debounces bursts, and runs one
/// sync cycle at a time. A failed sync is logged and watching continues.
async fn run_sync_loop(
    mut rx: mpsc::Receiver<PathBuf>,
    target: PathBuf,
    reconciler: Arc<Reconciler>,
    on_synced: Option<OnSynced>,
) {
    while let Some(first) = rx.recv().await {
        let mut relevant = is_target(&first, &target);

        // Coalesce the rest of the burst.
        loop {
            match tokio::time::timeout(DEBOUNCE, rx.recv()).await {
                Ok(Some(path)) => relevant |= is_target(&path, &target),
                Ok(None) => return,
                Err(_) => break,
            }
        }

        if !relevant {
            continue;
        }

        debug!("markdown file modified: {}", target.display());
        match reconciler.sync_file(&target).await {
            Ok(count) => {
                info!(count, "synced {} to tracker", target.display());
                if let Some(callback) = &on_synced {
                    callback(count);
                }
            }
            Err(e) => warn!("sync failed for {}: {e:#}", target.display()),
        }
    }
}

fn absolute(path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    joined.canonicalize().unwrap_or(joined)
}

/// An event path qualifies if its resolved absolute form equals the target.
fn is_target(event_path: &Path, target: &Path) -> bool {
    match event_path.canonicalize() {
        Ok(resolved) => resolved == *target,
        Err(_) => event_path == target,
    }
}
