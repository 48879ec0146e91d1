// src/cli/watch.rs

use anyhow::{bail, Context, Result};
use clap::Args;
use libwormhole::config::DEFAULT_ROOT;
use libwormhole::{Config, Overrides, RunState, Wormhole};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::info;

/// Options for the `watch` command
#[derive(Args, Debug)]
pub struct WatchOpts {
    /// Directory to watch
    #[arg(default_value = DEFAULT_ROOT)]
    pub root: PathBuf,

    /// Append-only JSON change log (default: $WORMHOLE_LOG_PATH, then the XDG data dir)
    #[arg(long)]
    pub logfile: Option<PathBuf>,

    /// Seconds of quiet before a batch is flushed (default: $WORMHOLE_INTERVAL_SECS or 60)
    #[arg(long, value_name = "SECS")]
    pub interval: Option<u64>,

    /// Remote host to copy changed paths to; without it batches are only logged
    #[arg(long)]
    pub host: Option<String>,

    /// Login on the remote host
    #[arg(long)]
    pub user: Option<String>,

    /// Destination directory on the remote host (default: ".")
    #[arg(long)]
    pub remote_dir: Option<String>,

    /// Transfer command and leading arguments
    #[arg(long, value_name = "CMD")]
    pub transfer_cmd: Option<String>,

    /// Watch only the given path itself, without descending into subdirectories
    #[arg(long)]
    pub single: bool,
}

impl WatchOpts {
    fn overrides(&self) -> Overrides {
        Overrides {
            root: Some(self.root.clone()),
            log_file: self.logfile.clone(),
            interval_secs: self.interval,
            host: self.host.clone(),
            user: self.user.clone(),
            remote_dir: self.remote_dir.clone(),
            transfer_cmd: self.transfer_cmd.clone(),
            single: self.single,
        }
    }
}

/// Run until the event source fails (error) or Ctrl+C (clean exit).
pub fn run(opts: &WatchOpts) -> Result<()> {
    let cfg = Config::load(opts.overrides()).context("invalid configuration")?;
    info!("logfile: {}", cfg.log_file.display());
    info!("watched path: {}", cfg.root.display());

    let log_file = cfg.log_file.clone();
    let wormhole = Wormhole::open(cfg)
        .with_context(|| format!("cannot open change log {}", log_file.display()))?;
    let mut watcher = wormhole
        .watch()
        .with_context(|| format!("cannot watch {}", wormhole.config().root.display()))?;

    let running = Arc::new(AtomicBool::new(true));
    let r_clone = running.clone();
    ctrlc::set_handler(move || {
        info!("Ctrl+C received. Signaling watcher to stop...");
        r_clone.store(false, Ordering::SeqCst);
    })?;

    info!("Watcher started. Press Ctrl+C to stop watching.");
    let start_time = Instant::now();
    let mut last_status_time = Instant::now();

    while running.load(Ordering::SeqCst) {
        let status = watcher.status()?;
        if let RunState::Failed(msg) = &status.state {
            let msg = msg.clone();
            let err = watcher.wait().err();
            match err {
                Some(e) => return Err(e).context("watching stopped"),
                None => bail!("watching stopped: {msg}"),
            }
        }

        if last_status_time.elapsed() > Duration::from_secs(10) {
            info!(
                "Watcher running for {}s, processed {} events, pending: {}, batches: {}, state: {:?}",
                start_time.elapsed().as_secs(),
                status.events_processed,
                status.pending,
                status.flushes,
                status.idle
            );
            last_status_time = Instant::now();
        }
        thread::sleep(Duration::from_millis(200));
    }

    info!("Stopping watcher; pending changes are discarded.");
    watcher.stop()?;
    info!("Watcher stopped.");
    Ok(())
}
