//! Command-line definitions.

pub mod watch;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Wormhole – watch a directory, ship each quiet burst of changes elsewhere
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Debug-level diagnostics on stderr (same as RUST_LOG=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Watch a directory tree and transfer changes once it goes quiet
    ///
    /// Example:
    ///     wormhole watch /opt/hole --host backup.example --user ops --remote-dir /srv/drop
    Watch(watch::WatchOpts),

    /// Generate a shell completion script
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}
