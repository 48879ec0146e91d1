//! Append-only JSON change log.
//!
//! One line per record:
//! `{"action":"create file/dir","path":"/opt/hole/a","timestamp":"2024-05-01T10:00:00+08:00","level":1}`

use crate::error::Result;
use crate::event::WatchEvent;
use chrono::{Local, SecondsFormat};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Severity, lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum LogLevel {
    Info = 1,
    Warn = 2,
    Error = 3,
    Fatal = 4,
}

impl From<LogLevel> for u8 {
    fn from(level: LogLevel) -> Self {
        level as u8
    }
}

impl TryFrom<u8> for LogLevel {
    type Error = String;

    fn try_from(v: u8) -> std::result::Result<Self, String> {
        match v {
            1 => Ok(LogLevel::Info),
            2 => Ok(LogLevel::Warn),
            3 => Ok(LogLevel::Error),
            4 => Ok(LogLevel::Fatal),
            other => Err(format!("unknown log level {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub action: String,
    pub path: String,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<LogLevel>,
}

impl LogEntry {
    pub fn now(action: &str, path: &Path, level: Option<LogLevel>) -> Self {
        Self {
            action: action.to_string(),
            path: path.to_string_lossy().into_owned(),
            timestamp: Local::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            level,
        }
    }
}

pub struct EventLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl EventLog {
    /// Open `path` for appending, creating it if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(&self, action: &str, path: &Path, level: Option<LogLevel>) -> Result<()> {
        self.append(&LogEntry::now(action, path, level))
    }

    pub fn record_event(&self, event: &WatchEvent) -> Result<()> {
        self.record(event.kind.action(), &event.path, Some(LogLevel::Info))
    }

    pub fn append(&self, entry: &LogEntry) -> Result<()> {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');
        // one write per record so concurrent writers never interleave lines
        let mut f = self
            .file
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f.write_all(&line)?;
        Ok(())
    }
}
