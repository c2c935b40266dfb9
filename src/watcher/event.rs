//! Typed watch events and translation from raw `notify` events.

use std::path::PathBuf;

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind};

/// What happened to a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEventKind {
    Created,
    Updated,
    Deleted,
}

/// A single accepted filesystem change, consumed once by the watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub path: PathBuf,
    pub kind: WatchEventKind,
}

impl WatchEvent {
    pub fn new(path: impl Into<PathBuf>, kind: WatchEventKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    /// Translate a raw backend event into typed events, in path order.
    ///
    /// Renames become a delete of the old path followed by a create of the
    /// new one, taken from the `From` and `To` halves. The combined `Both`
    /// event repeats those halves and produces nothing, as do access and
    /// unclassified events.
    pub fn from_notify(event: Event) -> Vec<WatchEvent> {
        let kind = match event.kind {
            EventKind::Create(_) => WatchEventKind::Created,
            EventKind::Remove(_) => WatchEventKind::Deleted,
            EventKind::Modify(ModifyKind::Name(RenameMode::From)) => WatchEventKind::Deleted,
            EventKind::Modify(ModifyKind::Name(RenameMode::To)) => WatchEventKind::Created,
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => return Vec::new(),
            EventKind::Modify(_) => WatchEventKind::Updated,
            EventKind::Access(_) | EventKind::Any | EventKind::Other => return Vec::new(),
        };

        event
            .paths
            .into_iter()
            .map(|path| WatchEvent::new(path, kind))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, DataChange, MetadataKind, RemoveKind};

    #[test]
    fn test_create_modify_remove() {
        let created = WatchEvent::from_notify(
            Event::new(EventKind::Create(CreateKind::File)).add_path("/r/a.coffee".into()),
        );
        assert_eq!(
            created,
            vec![WatchEvent::new("/r/a.coffee", WatchEventKind::Created)]
        );

        let updated = WatchEvent::from_notify(
            Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content)))
                .add_path("/r/a.coffee".into()),
        );
        assert_eq!(updated[0].kind, WatchEventKind::Updated);

        let touched = WatchEvent::from_notify(
            Event::new(EventKind::Modify(ModifyKind::Metadata(MetadataKind::WriteTime)))
                .add_path("/r/a.coffee".into()),
        );
        assert_eq!(touched[0].kind, WatchEventKind::Updated);

        let removed = WatchEvent::from_notify(
            Event::new(EventKind::Remove(RemoveKind::File)).add_path("/r/a.coffee".into()),
        );
        assert_eq!(removed[0].kind, WatchEventKind::Deleted);
    }

    #[test]
    fn test_rename_is_reported_once() {
        // inotify delivers both halves and then the combined event
        let raw = [
            Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::From)))
                .add_path("/r/old.coffee".into()),
            Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::To)))
                .add_path("/r/new.coffee".into()),
            Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
                .add_path("/r/old.coffee".into())
                .add_path("/r/new.coffee".into()),
        ];

        let events: Vec<_> = raw.into_iter().flat_map(WatchEvent::from_notify).collect();
        assert_eq!(
            events,
            vec![
                WatchEvent::new("/r/old.coffee", WatchEventKind::Deleted),
                WatchEvent::new("/r/new.coffee", WatchEventKind::Created),
            ]
        );
    }

    #[test]
    fn test_rename_halves() {
        let from = WatchEvent::from_notify(
            Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::From)))
                .add_path("/r/old.coffee".into()),
        );
        assert_eq!(from[0].kind, WatchEventKind::Deleted);

        let to = WatchEvent::from_notify(
            Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::To)))
                .add_path("/r/new.coffee".into()),
        );
        assert_eq!(to[0].kind, WatchEventKind::Created);
    }

    #[test]
    fn test_access_events_are_dropped() {
        let events = WatchEvent::from_notify(
            Event::new(EventKind::Access(AccessKind::Any)).add_path("/r/a.coffee".into()),
        );
        assert!(events.is_empty());
    }
}
