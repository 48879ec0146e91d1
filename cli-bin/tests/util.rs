//! tests/util.rs
//! Small helpers shared across integration tests.

#![allow(dead_code)]

use assert_cmd::Command;
use std::path::{Path, PathBuf};

/// Absolute path to the freshly-built `wormhole` binary.
pub fn bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_wormhole"))
}

/// Build a `Command` for `wormhole` whose change log is `log` and whose
/// environment carries no interval or log overrides from the caller.
pub fn wormhole(log: &Path) -> Command {
    let mut cmd = Command::new(bin());
    cmd.env_remove("WORMHOLE_INTERVAL_SECS");
    cmd.env("WORMHOLE_LOG_PATH", log);
    cmd
}
