//! Error types for wormhole
//!
//! Startup and adapter errors travel up to the binary as `Error`; per-event
//! and per-path failures never leave the component that hit them.

use std::io;

/// Result type for wormhole - convenience wrapper around Result<T, Error>
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The initial recursive scan could not subscribe the whole tree
    #[error("Scan error: {0}")]
    Scan(String),

    /// An error from the notify library
    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    /// The event source reported an error while running; the watch loop is over
    #[error("Event source failed: {0}")]
    Source(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// The JSON change log could not be encoded
    #[error("Log error: {0}")]
    Log(#[from] serde_json::Error),

    /// Invalid state for the requested operation
    #[error("Invalid state: {0}")]
    InvalidState(String),
}
