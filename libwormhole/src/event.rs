//! Change events as seen by the watch tree and the coalescing engine.

use std::fmt;
use std::path::PathBuf;

/// The closed set of filesystem changes wormhole reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Create,
    Write,
    Remove,
    Rename,
    PermissionChange,
}

impl ChangeKind {
    /// Human-readable description written to the `action` field of the change log.
    pub fn action(self) -> &'static str {
        match self {
            ChangeKind::Create => "create file/dir",
            ChangeKind::Write => "modify file/dir content",
            ChangeKind::Remove => "remove file/dir",
            ChangeKind::Rename => "rename file/dir",
            ChangeKind::PermissionChange => "change file/dir permissions",
        }
    }

    /// Create, remove and rename may change the shape of the watched tree.
    pub fn is_structural(self) -> bool {
        matches!(
            self,
            ChangeKind::Create | ChangeKind::Remove | ChangeKind::Rename
        )
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.action())
    }
}

/// One notification for one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

impl WatchEvent {
    pub fn new(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_tree_shaping_kinds_are_structural() {
        assert!(ChangeKind::Create.is_structural());
        assert!(ChangeKind::Remove.is_structural());
        assert!(ChangeKind::Rename.is_structural());
        assert!(!ChangeKind::Write.is_structural());
        assert!(!ChangeKind::PermissionChange.is_structural());
    }

    #[test]
    fn display_uses_action_text() {
        assert_eq!(ChangeKind::Write.to_string(), "modify file/dir content");
    }
}
