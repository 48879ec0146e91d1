//! File system watcher for wormhole
//!
//! Wires the pieces together: one dedicated thread drains the event source,
//! lets the watch tree follow structural changes, writes each event to the
//! change log and feeds the path to the coalescing engine.  An error from
//! the event source ends the loop for good.

use crate::coalesce::{Coalescer, WatcherState};
use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::error::{Error, Result};
use crate::event::WatchEvent;
use crate::journal::{EventLog, LogLevel};
use crate::source::{EventStream, NotifySource, Subscriber};
use crate::tree::WatchTree;
use crossbeam_channel::{bounded, select, Receiver, Sender};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{error, info, warn};

// ────── public state/useful telemetry ────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Watching,
    Stopped,
    /// The event source reported an error; nothing more will be processed.
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct WatcherStatus {
    pub state: RunState,
    pub idle: WatcherState,
    pub events_processed: usize,
    pub pending: usize,
    pub flushes: usize,
    pub start_time: Instant,
}

// ────── main watcher struct ───────────────────────────────────────────────────
pub struct FileWatcher {
    state: Arc<Mutex<RunState>>,
    coalescer: Arc<Coalescer>,
    processor_thread: Option<JoinHandle<Result<()>>>,
    stop_tx: Sender<()>,
    events_processed: Arc<AtomicUsize>,
    start_time: Instant,
    root: PathBuf,
}

impl FileWatcher {
    /// Start watching `config.root` with the OS event source.
    pub fn new(
        config: &Config,
        dispatcher: Arc<dyn Dispatcher>,
        journal: Option<Arc<EventLog>>,
    ) -> Result<Self> {
        let (source, stream) = NotifySource::new()?;
        Self::with_source(source, stream, config, dispatcher, journal)
    }

    /// Same as [`new`](Self::new) over any subscriber/stream pair.
    pub fn with_source<S>(
        source: S,
        stream: EventStream,
        config: &Config,
        dispatcher: Arc<dyn Dispatcher>,
        journal: Option<Arc<EventLog>>,
    ) -> Result<Self>
    where
        S: Subscriber + Send + 'static,
    {
        let mut tree = WatchTree::new(source, config.mode);
        tree.initialize(&config.root)?;
        info!(
            root = %config.root.display(),
            dirs = tree.len(),
            interval_secs = config.interval.as_secs_f64(),
            "watching"
        );

        let coalescer = Arc::new(Coalescer::new(config.interval, dispatcher));
        let state = Arc::new(Mutex::new(RunState::Watching));
        let events_processed = Arc::new(AtomicUsize::new(0));
        let (stop_tx, stop_rx) = bounded(1);

        let ctx = Drain {
            tree,
            stream,
            stop_rx,
            coalescer: coalescer.clone(),
            journal,
            state: state.clone(),
            events_processed: events_processed.clone(),
            root: config.root.clone(),
        };
        let processor_thread = thread::spawn(move || ctx.run());

        Ok(Self {
            state,
            coalescer,
            processor_thread: Some(processor_thread),
            stop_tx,
            events_processed,
            start_time: Instant::now(),
            root: config.root.clone(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Block until the watch loop ends.  `Err` when the event source failed.
    pub fn wait(&mut self) -> Result<()> {
        match self.processor_thread.take() {
            Some(h) => h
                .join()
                .map_err(|_| Error::InvalidState("watch loop panicked".into()))?,
            None => Ok(()),
        }
    }

    /// Stop the watch loop.  Changes still pending are discarded.
    pub fn stop(&mut self) -> Result<()> {
        let _ = self.stop_tx.try_send(());
        let res = self.wait();
        let mut g = self
            .state
            .lock()
            .map_err(|_| Error::InvalidState("state mutex poisoned".into()))?;
        if *g == RunState::Watching {
            *g = RunState::Stopped;
        }
        res
    }

    pub fn status(&self) -> Result<WatcherStatus> {
        let state = self
            .state
            .lock()
            .map_err(|_| Error::InvalidState("state mutex poisoned".into()))?
            .clone();
        Ok(WatcherStatus {
            state,
            idle: self.coalescer.state(),
            events_processed: self.events_processed.load(Ordering::SeqCst),
            pending: self.coalescer.pending_len(),
            flushes: self.coalescer.flush_count(),
            start_time: self.start_time,
        })
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        let _ = self.stop(); // ignore errors during drop
    }
}

// ────── event-draining thread ────────────────────────────────────────────────
struct Drain<S: Subscriber> {
    tree: WatchTree<S>,
    stream: EventStream,
    stop_rx: Receiver<()>,
    coalescer: Arc<Coalescer>,
    journal: Option<Arc<EventLog>>,
    state: Arc<Mutex<RunState>>,
    events_processed: Arc<AtomicUsize>,
    root: PathBuf,
}

impl<S: Subscriber> Drain<S> {
    fn run(mut self) -> Result<()> {
        let events = self.stream.events.clone();
        let errors = self.stream.errors.clone();
        let stop = self.stop_rx.clone();
        loop {
            select! {
                recv(events) -> msg => match msg {
                    Ok(ev) => self.handle(ev),
                    Err(_) => return self.fail("event channel closed".into()),
                },
                recv(errors) -> msg => match msg {
                    Ok(e) => return self.fail(e.to_string()),
                    Err(_) => return self.fail("error channel closed".into()),
                },
                recv(stop) -> _ => {
                    info!(pending = self.coalescer.pending_len(), "watch loop stopped");
                    return Ok(());
                }
            }
        }
    }

    fn handle(&mut self, ev: WatchEvent) {
        self.events_processed.fetch_add(1, Ordering::SeqCst);
        info!(action = ev.kind.action(), path = %ev.path.display(), "change");

        if let Some(j) = &self.journal {
            if let Err(e) = j.record_event(&ev) {
                warn!(error = %e, "could not write change log");
            }
        }

        if ev.kind.is_structural() {
            self.tree.on_structural_event(&ev);
        }
        self.coalescer.on_event(ev.path);
    }

    fn fail(&self, msg: String) -> Result<()> {
        error!(error = %msg, "event source failed, no further changes will be processed");
        if let Some(j) = &self.journal {
            let action = format!("event source failed: {msg}");
            if let Err(e) = j.record(&action, &self.root, Some(LogLevel::Fatal)) {
                warn!(error = %e, "could not write change log");
            }
        }
        if let Ok(mut g) = self.state.lock() {
            *g = RunState::Failed(msg.clone());
        }
        Err(Error::Source(msg))
    }
}
