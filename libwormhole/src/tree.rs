//! Watch-tree manager.
//!
//! Owns the set of directories currently subscribed to the event source and
//! keeps it in step with the shape of the subtree.  Nothing outside this
//! module reads the set; its only observable effect is the subscriptions
//! held by the [`Subscriber`].

use crate::config::WatchMode;
use crate::error::{Error, Result};
use crate::event::{ChangeKind, WatchEvent};
use crate::source::Subscriber;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

pub struct WatchTree<S: Subscriber> {
    source: S,
    // ordered so everything at or below a path is one contiguous range
    watched: BTreeSet<PathBuf>,
    mode: WatchMode,
}

impl<S: Subscriber> WatchTree<S> {
    pub fn new(source: S, mode: WatchMode) -> Self {
        Self {
            source,
            watched: BTreeSet::new(),
            mode,
        }
    }

    /// Subscribe `root` and, in recursive mode, every directory below it.
    ///
    /// Any failure is a scan error.  Subscriptions made before the failure
    /// are left in place.
    pub fn initialize(&mut self, root: &Path) -> Result<()> {
        let meta = fs::metadata(root)
            .map_err(|e| Error::Scan(format!("{}: {e}", root.display())))?;

        if self.mode == WatchMode::Single {
            self.source
                .subscribe(root)
                .map_err(|e| Error::Scan(format!("failed to watch {}: {e}", root.display())))?;
            self.watched.insert(root.to_path_buf());
            info!(path = %root.display(), "watching single path");
            return Ok(());
        }

        if !meta.is_dir() {
            return Err(Error::Scan(format!("{} is not a directory", root.display())));
        }

        for entry in WalkDir::new(root) {
            let entry = entry.map_err(|e| Error::Scan(format!("walking {}: {e}", root.display())))?;
            if !entry.file_type().is_dir() {
                continue;
            }
            let dir = entry.path();
            self.source
                .subscribe(dir)
                .map_err(|e| Error::Scan(format!("failed to watch {}: {e}", dir.display())))?;
            self.watched.insert(dir.to_path_buf());
        }

        info!(root = %root.display(), dirs = self.watched.len(), "recursive watch established");
        Ok(())
    }

    /// Adjust subscriptions for one raw event.  Never fails: problems are
    /// logged and the directory in question stays unwatched or over-watched.
    pub fn on_structural_event(&mut self, event: &WatchEvent) {
        if self.mode == WatchMode::Single {
            return;
        }
        match event.kind {
            ChangeKind::Create => self.on_create(&event.path),
            ChangeKind::Remove | ChangeKind::Rename => self.forget(&event.path),
            ChangeKind::Write | ChangeKind::PermissionChange => {}
        }
    }

    fn on_create(&mut self, path: &Path) {
        // the path may already be gone again; that just means "not a directory"
        match fs::metadata(path) {
            Ok(meta) if meta.is_dir() => {}
            _ => return,
        }

        // nested directories can appear before we get to subscribe their parent
        for entry in WalkDir::new(path).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_dir() || self.watched.contains(entry.path()) {
                continue;
            }
            let dir = entry.path();
            match self.source.subscribe(dir) {
                Ok(()) => {
                    self.watched.insert(dir.to_path_buf());
                    debug!(dir = %dir.display(), "added to watch set");
                }
                Err(e) => warn!(dir = %dir.display(), error = %e, "could not watch new directory"),
            }
        }
    }

    /// Drop `path` and anything subscribed beneath it.  Unknown paths are a no-op.
    fn forget(&mut self, path: &Path) {
        let gone: Vec<PathBuf> = self
            .watched
            .range(path.to_path_buf()..)
            .take_while(|p| p.starts_with(path))
            .cloned()
            .collect();

        for dir in gone {
            self.watched.remove(&dir);
            match self.source.unsubscribe(&dir) {
                Ok(()) => debug!(dir = %dir.display(), "removed from watch set"),
                Err(e) => warn!(dir = %dir.display(), error = %e, "could not unwatch directory"),
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.watched.len()
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, path: &Path) -> bool {
        self.watched.contains(path)
    }

    #[cfg(test)]
    pub(crate) fn source(&self) -> &S {
        &self.source
    }
}
