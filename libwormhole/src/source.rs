//! Event source adapter over the `notify` crate.
//!
//! Every directory is subscribed on its own in non-recursive mode; the
//! watch tree decides which directories those are.  Raw notify results are
//! split into two channels: translated [`WatchEvent`]s and fatal errors.

use crate::error::{Error, Result};
use crate::event::{ChangeKind, WatchEvent};
use crossbeam_channel::{unbounded, Receiver, Sender};
use notify::{
    event::{ModifyKind, RenameMode},
    Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcherTrait,
};
use std::path::Path;
use tracing::{debug, trace};

/// Anything the watch tree can (un)subscribe directories against.
pub trait Subscriber {
    fn subscribe(&mut self, path: &Path) -> Result<()>;
    fn unsubscribe(&mut self, path: &Path) -> Result<()>;
}

/// The two ordered sequences an event source delivers.
pub struct EventStream {
    pub events: Receiver<WatchEvent>,
    pub errors: Receiver<notify::Error>,
}

/// OS-level watcher; the subscription half of the adapter.
pub struct NotifySource {
    watcher: RecommendedWatcher,
}

impl NotifySource {
    pub fn new() -> Result<(Self, EventStream)> {
        let (event_tx, event_rx) = unbounded();
        let (error_tx, error_rx) = unbounded();

        let watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| forward(res, &event_tx, &error_tx),
            notify::Config::default(),
        )?;

        Ok((
            Self { watcher },
            EventStream {
                events: event_rx,
                errors: error_rx,
            },
        ))
    }
}

impl Subscriber for NotifySource {
    fn subscribe(&mut self, path: &Path) -> Result<()> {
        self.watcher.watch(path, RecursiveMode::NonRecursive)?;
        trace!(path = %path.display(), "subscribed");
        Ok(())
    }

    fn unsubscribe(&mut self, path: &Path) -> Result<()> {
        match self.watcher.unwatch(path) {
            Ok(()) => Ok(()),
            // the backend already dropped it (deleted directories do that)
            Err(e) if matches!(e.kind, notify::ErrorKind::WatchNotFound) => Ok(()),
            Err(e) => Err(Error::Watch(e)),
        }
    }
}

/// Route one raw notify result onto the event or error channel.
///
/// A backend that lost events (inotify queue overflow) says so with a
/// rescan flag rather than an `Err`.  Changes are gone at that point, so it
/// goes out as an error like any other.
pub(crate) fn forward(
    res: notify::Result<Event>,
    events: &Sender<WatchEvent>,
    errors: &Sender<notify::Error>,
) {
    match res {
        Ok(ev) if ev.need_rescan() => {
            let _ = errors.send(
                notify::Error::generic("event queue overflowed, changes were lost")
                    .set_paths(ev.paths),
            );
        }
        Ok(ev) => {
            for translated in translate(&ev) {
                let _ = events.send(translated);
            }
        }
        Err(e) => {
            let _ = errors.send(e);
        }
    }
}

/// Map one notify event onto the closed [`ChangeKind`] set.
///
/// A single notify event may name several paths (renames) or none of
/// interest (access notifications), so this yields zero or more events.
pub fn translate(event: &Event) -> Vec<WatchEvent> {
    let each = |kind: ChangeKind| -> Vec<WatchEvent> {
        event
            .paths
            .iter()
            .map(|p| WatchEvent::new(p.clone(), kind))
            .collect()
    };

    match event.kind {
        EventKind::Create(_) => each(ChangeKind::Create),
        EventKind::Remove(_) => each(ChangeKind::Remove),

        EventKind::Modify(ModifyKind::Name(mode)) => match mode {
            RenameMode::From => each(ChangeKind::Rename),
            RenameMode::To => each(ChangeKind::Create),
            RenameMode::Both => {
                // inotify reports From and To as well as a tracked Both summary
                if event.tracker().is_some() {
                    debug!(paths = ?event.paths, "rename summary already seen as halves");
                    return Vec::new();
                }
                let mut out = Vec::with_capacity(2);
                if let Some(old) = event.paths.first() {
                    out.push(WatchEvent::new(old.clone(), ChangeKind::Rename));
                }
                if let Some(new) = event.paths.get(1) {
                    out.push(WatchEvent::new(new.clone(), ChangeKind::Create));
                }
                out
            }
            // backends that can't tell which side of the move this is
            RenameMode::Any | RenameMode::Other => event
                .paths
                .iter()
                .map(|p| {
                    let kind = if p.exists() {
                        ChangeKind::Create
                    } else {
                        ChangeKind::Rename
                    };
                    WatchEvent::new(p.clone(), kind)
                })
                .collect(),
        },

        EventKind::Modify(ModifyKind::Metadata(_)) => each(ChangeKind::PermissionChange),
        EventKind::Modify(_) | EventKind::Any => each(ChangeKind::Write),

        EventKind::Access(_) | EventKind::Other => {
            trace!(kind = ?event.kind, "ignored");
            Vec::new()
        }
    }
}
