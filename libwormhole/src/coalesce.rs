//! Coalescing engine.
//!
//! Collects changed paths into a deduplicated pending set and hands the set
//! to a [`Dispatcher`] once no event has arrived for a full `interval`.
//! There is one idle timer for the whole engine: every event re-arms it,
//! cancelling whatever was armed before.
//!
//! The pending set, the idle/active flag and the armed timer live together
//! behind one mutex.  The event-draining thread and the timer thread both go
//! through it; dispatch itself always runs after the lock is released.

use crate::dispatch::{Batch, Dispatcher};
use std::collections::HashSet;
use std::mem;
use std::path::PathBuf;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info};

// ────── public state ─────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    /// Nothing has happened since the last flush (or ever).
    Idle,
    /// Events arrived and the idle timer has not run out yet.
    Active,
}

/// Identifies one arming of the idle timer.  An expiry carrying an older
/// token than the current one belongs to a cancelled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimerToken(u64);

// ────── internal bookkeeping ─────────────────────────────────────────────────
struct Pending {
    paths: HashSet<PathBuf>,
    state: WatcherState,
    generation: u64,
    deadline: Option<Instant>,
    flushes: usize,
    shutdown: bool,
}

impl Pending {
    /// Snapshot-and-clear, only while idle.
    fn take_if_idle(&mut self) -> Option<Batch> {
        if self.state != WatcherState::Idle {
            debug!(pending = self.paths.len(), "flush skipped: changes still arriving");
            return None;
        }
        if self.paths.is_empty() {
            return None;
        }
        self.flushes += 1;
        Some(mem::take(&mut self.paths))
    }
}

struct Shared {
    pending: Mutex<Pending>,
    rearmed: Condvar,
    interval: Duration,
    dispatcher: Arc<dyn Dispatcher>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Pending> {
        // a panicking dispatcher never holds this lock, but don't wedge if it happens
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn expire(&self, token: TimerToken) -> bool {
        let batch = {
            let mut p = self.lock();
            if p.deadline.is_none() || p.generation != token.0 {
                debug!(?token, "stale idle timer ignored");
                return false;
            }
            p.deadline = None;
            p.state = WatcherState::Idle;
            p.take_if_idle()
        };
        self.send(batch)
    }

    fn send(&self, batch: Option<Batch>) -> bool {
        match batch {
            Some(batch) => {
                info!(paths = batch.len(), "subtree idle, flushing batch");
                self.dispatcher.dispatch(batch);
                true
            }
            None => false,
        }
    }
}

// ────── engine ───────────────────────────────────────────────────────────────
pub struct Coalescer {
    shared: Arc<Shared>,
    timer_thread: Option<JoinHandle<()>>,
}

impl Coalescer {
    /// Build an engine whose idle timer runs on its own thread.
    pub fn new(interval: Duration, dispatcher: Arc<dyn Dispatcher>) -> Self {
        let mut engine = Self::without_timer(interval, dispatcher);
        let shared = engine.shared.clone();
        engine.timer_thread = Some(thread::spawn(move || run_timer(shared)));
        engine
    }

    /// An engine nobody expires on its own; callers drive
    /// [`on_timer_expiry`](Self::on_timer_expiry) themselves.
    pub(crate) fn without_timer(interval: Duration, dispatcher: Arc<dyn Dispatcher>) -> Self {
        Self {
            shared: Arc::new(Shared {
                pending: Mutex::new(Pending {
                    paths: HashSet::new(),
                    state: WatcherState::Idle,
                    generation: 0,
                    deadline: None,
                    flushes: 0,
                    shutdown: false,
                }),
                rearmed: Condvar::new(),
                interval,
                dispatcher,
            }),
            timer_thread: None,
        }
    }

    /// Record a change to `path` and (re)arm the idle timer.
    pub fn on_event(&self, path: PathBuf) -> TimerToken {
        let token = {
            let mut p = self.shared.lock();
            p.paths.insert(path);
            p.generation += 1;
            p.deadline = Some(Instant::now() + self.shared.interval);
            p.state = WatcherState::Active;
            TimerToken(p.generation)
        };
        self.shared.rearmed.notify_one();
        token
    }

    /// Idle timer `token` ran out.  Returns whether a batch was dispatched.
    pub fn on_timer_expiry(&self, token: TimerToken) -> bool {
        self.shared.expire(token)
    }

    /// Dispatch the pending set if the engine is idle.  While active the
    /// pending set is left untouched.  Returns the number of paths dispatched.
    pub fn flush(&self) -> usize {
        let batch = self.shared.lock().take_if_idle();
        let n = batch.as_ref().map_or(0, HashSet::len);
        self.shared.send(batch);
        n
    }

    pub fn state(&self) -> WatcherState {
        self.shared.lock().state
    }

    pub fn pending_len(&self) -> usize {
        self.shared.lock().paths.len()
    }

    /// Number of batches handed to the dispatcher so far.
    pub fn flush_count(&self) -> usize {
        self.shared.lock().flushes
    }

    pub fn interval(&self) -> Duration {
        self.shared.interval
    }
}

impl Drop for Coalescer {
    fn drop(&mut self) {
        self.shared.lock().shutdown = true;
        self.shared.rearmed.notify_all();
        if let Some(h) = self.timer_thread.take() {
            let _ = h.join();
        }
    }
}

fn run_timer(shared: Arc<Shared>) {
    let mut p = shared.lock();
    loop {
        if p.shutdown {
            break;
        }
        let Some(deadline) = p.deadline else {
            p = shared
                .rearmed
                .wait(p)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            continue;
        };

        let now = Instant::now();
        if now < deadline {
            p = shared
                .rearmed
                .wait_timeout(p, deadline - now)
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .0;
            continue;
        }

        // a re-arm can slip in here; expire() rechecks the token under the lock
        let token = TimerToken(p.generation);
        drop(p);
        shared.expire(token);
        p = shared.lock();
    }
}
