//! Batch dispatch: hands every flushed path to the transfer mechanism.
//!
//! Each path is transferred on its own.  A failure is logged and forgotten;
//! it neither stops the rest of the batch nor puts the path back in the
//! pending set.

use crate::config::{RemoteTarget, TransferCommand};
use crate::journal::{EventLog, LogLevel};
use crossbeam_channel::Sender;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use tracing::{error, info, warn};

/// An unordered set of changed paths.
pub type Batch = HashSet<PathBuf>;

pub trait Dispatcher: Send + Sync {
    fn dispatch(&self, batch: Batch);
}

/// Forward batches to whoever holds the receiving end.
impl Dispatcher for Sender<Batch> {
    fn dispatch(&self, batch: Batch) {
        if self.send(batch).is_err() {
            warn!("batch receiver gone, batch dropped");
        }
    }
}

/// Used when no remote is configured: report the batch and stop there.
#[derive(Debug, Default)]
pub struct LogDispatcher;

impl Dispatcher for LogDispatcher {
    fn dispatch(&self, batch: Batch) {
        info!(paths = batch.len(), "batch ready (no remote configured)");
        for p in &batch {
            info!(path = %p.display(), "changed");
        }
    }
}

/// Copies each path with an external secure-copy style command.
pub struct ScpDispatcher {
    command: TransferCommand,
    target: RemoteTarget,
    journal: Option<Arc<EventLog>>,
}

/// Outcome of one transfer attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transfer {
    Sent,
    Failed(String),
}

impl ScpDispatcher {
    pub fn new(command: TransferCommand, target: RemoteTarget) -> Self {
        Self {
            command,
            target,
            journal: None,
        }
    }

    /// Also append an `ERROR` record to the change log for every failed transfer.
    pub fn with_journal(mut self, journal: Arc<EventLog>) -> Self {
        self.journal = Some(journal);
        self
    }

    /// The full command line used for `path`.
    pub fn command_for(&self, path: &Path) -> Command {
        let mut cmd = Command::new(&self.command.program);
        cmd.args(&self.command.args);
        if path.is_dir() {
            cmd.arg("-r");
        }
        cmd.arg(path).arg(self.target.destination());
        cmd
    }

    pub fn transfer(&self, path: &Path) -> Transfer {
        let output = match self.command_for(path).output() {
            Ok(o) => o,
            Err(e) => return Transfer::Failed(format!("{}: {e}", self.command.program)),
        };
        if output.status.success() {
            return Transfer::Sent;
        }
        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        Transfer::Failed(format!("{}: {}", output.status, combined.trim_end()))
    }
}

impl Dispatcher for ScpDispatcher {
    fn dispatch(&self, batch: Batch) {
        let dest = self.target.destination();
        let mut failed = 0usize;
        for path in &batch {
            match self.transfer(path) {
                Transfer::Sent => info!(path = %path.display(), dest = %dest, "transferred"),
                Transfer::Failed(output) => {
                    failed += 1;
                    error!(path = %path.display(), dest = %dest, %output, "transfer failed");
                    if let Some(j) = &self.journal {
                        let action = format!("transfer failed: {output}");
                        if let Err(e) = j.record(&action, path, Some(LogLevel::Error)) {
                            warn!(error = %e, "could not write change log");
                        }
                    }
                }
            }
        }
        info!(sent = batch.len() - failed, failed, "batch dispatched");
    }
}
