use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crossbeam_channel::{unbounded, Receiver};
use lazy_static::lazy_static;

use crate::dispatch::{Batch, Dispatcher};
use crate::error::{Error, Result};
use crate::source::Subscriber;

lazy_static! {
    /// Global mutex to serialize environment-variable modifications in tests.
    pub static ref ENV_MUTEX: Mutex<()> = Mutex::new(());
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Subscribe(PathBuf),
    Unsubscribe(PathBuf),
}

/// Subscriber that remembers what it was asked to do.
#[derive(Debug, Default)]
pub struct RecordingSubscriber {
    pub active: HashSet<PathBuf>,
    pub calls: Vec<Call>,
    /// Subscribing this path fails.
    pub fail_on: Option<PathBuf>,
}

impl RecordingSubscriber {
    pub fn failing_on(path: impl Into<PathBuf>) -> Self {
        Self {
            fail_on: Some(path.into()),
            ..Default::default()
        }
    }

    pub fn unsubscribe_calls(&self, path: &Path) -> usize {
        self.calls
            .iter()
            .filter(|c| **c == Call::Unsubscribe(path.to_path_buf()))
            .count()
    }
}

impl Subscriber for RecordingSubscriber {
    fn subscribe(&mut self, path: &Path) -> Result<()> {
        if self.fail_on.as_deref() == Some(path) {
            return Err(Error::Watch(notify::Error::generic("refused")));
        }
        self.calls.push(Call::Subscribe(path.to_path_buf()));
        self.active.insert(path.to_path_buf());
        Ok(())
    }

    fn unsubscribe(&mut self, path: &Path) -> Result<()> {
        self.calls.push(Call::Unsubscribe(path.to_path_buf()));
        self.active.remove(path);
        Ok(())
    }
}

/// Handle onto a [`RecordingSubscriber`] that stays inspectable after the
/// watcher thread has taken ownership of its clone.
#[derive(Debug, Clone, Default)]
pub struct SharedSubscriber(pub Arc<Mutex<RecordingSubscriber>>);

impl SharedSubscriber {
    pub fn is_active(&self, path: &Path) -> bool {
        self.0.lock().unwrap().active.contains(path)
    }
}

impl Subscriber for SharedSubscriber {
    fn subscribe(&mut self, path: &Path) -> Result<()> {
        self.0.lock().unwrap().subscribe(path)
    }

    fn unsubscribe(&mut self, path: &Path) -> Result<()> {
        self.0.lock().unwrap().unsubscribe(path)
    }
}

/// A dispatcher whose batches come out of the returned receiver.
pub fn channel_dispatcher() -> (Arc<dyn Dispatcher>, Receiver<Batch>) {
    let (tx, rx) = unbounded();
    (Arc::new(tx), rx)
}

pub fn batch_of<I, P>(paths: I) -> Batch
where
    I: IntoIterator<Item = P>,
    P: Into<PathBuf>,
{
    paths.into_iter().map(Into::into).collect()
}
