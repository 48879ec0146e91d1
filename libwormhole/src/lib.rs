//! libwormhole – public API surface for the wormhole core.
//!
//! Watches a directory subtree, coalesces bursts of changes into one batch
//! once the subtree has been quiet for a configured interval, and hands the
//! batch to a transfer mechanism.  The binary crate should only need what is
//! re-exported here plus the [`Wormhole`] façade.

pub mod coalesce;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod journal;
pub mod logging;
pub mod source;
pub mod tree;
pub mod utils;
pub mod watcher;

#[cfg(test)]
mod test_utils;

#[cfg(test)]
mod dispatch_tests;

pub use coalesce::{Coalescer, TimerToken, WatcherState};
pub use config::{Config, Overrides, RemoteTarget, TransferCommand, WatchMode};
pub use dispatch::{Batch, Dispatcher, LogDispatcher, ScpDispatcher};
pub use error::{Error, Result};
pub use event::{ChangeKind, WatchEvent};
pub use journal::{EventLog, LogEntry, LogLevel};
pub use watcher::{FileWatcher, RunState, WatcherStatus};

use std::sync::Arc;
use tracing::info;

/// Primary façade – resolve the pieces a configuration asks for, then watch.
pub struct Wormhole {
    cfg: Config,
    journal: Arc<EventLog>,
}

impl Wormhole {
    /// Open the change log named by `cfg`.  Failing to open it is a startup error.
    pub fn open(cfg: Config) -> Result<Self> {
        let journal = Arc::new(EventLog::open(&cfg.log_file)?);
        info!(log = %cfg.log_file.display(), "change log opened");
        Ok(Self { cfg, journal })
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn journal(&self) -> &Arc<EventLog> {
        &self.journal
    }

    /// The dispatcher the configuration implies: secure copy to the remote
    /// when one is set, log-only otherwise.
    pub fn dispatcher(&self) -> Arc<dyn Dispatcher> {
        match &self.cfg.remote {
            Some(target) => Arc::new(
                ScpDispatcher::new(self.cfg.transfer.clone(), target.clone())
                    .with_journal(self.journal.clone()),
            ),
            None => Arc::new(LogDispatcher),
        }
    }

    /// Scan the tree and start watching it.
    pub fn watch(&self) -> Result<FileWatcher> {
        FileWatcher::new(&self.cfg, self.dispatcher(), Some(self.journal.clone()))
    }
}
