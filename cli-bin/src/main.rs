//! Wormhole CLI entry-point
//!
//! The watching, coalescing and transfer logic lives in `libwormhole`; this
//! file handles argument parsing, logging and shell completions.

#![deny(warnings)]

mod cli; // sub-command definitions and argument structs

use libwormhole::logging;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use std::{env, io};

use cli::{Cli, Commands};

fn main() -> Result<()> {
    /* ── CLI parsing & logging ────────────────────────────────── */
    let args = Cli::parse();
    if args.verbose {
        env::set_var("RUST_LOG", "debug");
    }
    logging::init();

    /* ── command dispatch ─────────────────────────────────────── */
    match &args.command {
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(*shell, &mut cmd, "wormhole", &mut io::stdout());
        }
        Commands::Watch(opts) => cli::watch::run(opts)?,
    }

    Ok(())
}
