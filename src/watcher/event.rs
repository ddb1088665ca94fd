//! Filesystem changes as the watch loop sees them.

use std::path::PathBuf;

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind};

/// What happened to a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Create,
    Write,
    Remove,
    /// The path was renamed away; its old name is gone.
    Rename,
    /// Metadata, access and anything else that does not change content.
    Other,
}

/// One change to one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsChange {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

impl FsChange {
    pub fn new(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    /// Translate a notify event into changes, one per affected path.
    ///
    /// A rename reported with both ends becomes a `Rename` of the old path
    /// followed by a `Create` of the new one.
    pub fn from_notify(event: Event) -> Vec<FsChange> {
        let kind = match event.kind {
            EventKind::Create(_) => ChangeKind::Create,
            EventKind::Remove(_) => ChangeKind::Remove,
            EventKind::Modify(ModifyKind::Name(mode)) => {
                return Self::from_rename(mode, event.paths);
            }
            EventKind::Modify(ModifyKind::Metadata(_)) => ChangeKind::Other,
            EventKind::Modify(_) => ChangeKind::Write,
            EventKind::Access(_) | EventKind::Any | EventKind::Other => ChangeKind::Other,
        };

        event
            .paths
            .into_iter()
            .map(|path| FsChange::new(path, kind))
            .collect()
    }

    fn from_rename(mode: RenameMode, paths: Vec<PathBuf>) -> Vec<FsChange> {
        match mode {
            RenameMode::From => paths
                .into_iter()
                .map(|path| FsChange::new(path, ChangeKind::Rename))
                .collect(),
            RenameMode::To => paths
                .into_iter()
                .map(|path| FsChange::new(path, ChangeKind::Create))
                .collect(),
            RenameMode::Both => {
                let mut paths = paths.into_iter();
                let mut changes = Vec::with_capacity(2);
                if let Some(from) = paths.next() {
                    changes.push(FsChange::new(from, ChangeKind::Rename));
                }
                if let Some(to) = paths.next() {
                    changes.push(FsChange::new(to, ChangeKind::Create));
                }
                changes
            }
            // Backends that cannot tell the two ends apart.
            RenameMode::Any | RenameMode::Other => paths
                .into_iter()
                .map(|path| {
                    let kind = if path.exists() {
                        ChangeKind::Create
                    } else {
                        ChangeKind::Rename
                    };
                    FsChange::new(path, kind)
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, MetadataKind, RemoveKind};
    use std::fs;
    use tempfile::TempDir;

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        paths
            .iter()
            .fold(Event::new(kind), |event, path| event.add_path(PathBuf::from(path)))
    }

    #[test]
    fn test_basic_kinds() {
        let cases = [
            (EventKind::Create(CreateKind::File), ChangeKind::Create),
            (EventKind::Modify(ModifyKind::Data(DataChange::Content)), ChangeKind::Write),
            (EventKind::Modify(ModifyKind::Any), ChangeKind::Write),
            (EventKind::Modify(ModifyKind::Metadata(MetadataKind::Any)), ChangeKind::Other),
            (EventKind::Remove(RemoveKind::File), ChangeKind::Remove),
            (EventKind::Any, ChangeKind::Other),
        ];

        for (kind, expected) in cases {
            let label = format!("{kind:?}");
            let changes = FsChange::from_notify(event(kind, &["/w/a.md"]));
            assert_eq!(changes, vec![FsChange::new("/w/a.md", expected)], "{label}");
        }
    }

    #[test]
    fn test_rename_both_splits_into_remove_and_create() {
        let changes = FsChange::from_notify(event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/w/old.md", "/w/new.md"],
        ));

        assert_eq!(
            changes,
            vec![
                FsChange::new("/w/old.md", ChangeKind::Rename),
                FsChange::new("/w/new.md", ChangeKind::Create),
            ]
        );
    }

    #[test]
    fn test_rename_halves() {
        let from = FsChange::from_notify(event(
            EventKind::Modify(ModifyKind::Name(RenameMode::From)),
            &["/w/old.md"],
        ));
        let to = FsChange::from_notify(event(
            EventKind::Modify(ModifyKind::Name(RenameMode::To)),
            &["/w/new.md"],
        ));

        assert_eq!(from[0].kind, ChangeKind::Rename);
        assert_eq!(to[0].kind, ChangeKind::Create);
    }

    #[test]
    fn test_ambiguous_rename_checks_existence() {
        let temp_dir = TempDir::new().unwrap();
        let present = temp_dir.path().join("here.md");
        fs::write(&present, "x").unwrap();
        let absent = temp_dir.path().join("gone.md");

        let changes = FsChange::from_notify(
            Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Any)))
                .add_path(present.clone())
                .add_path(absent.clone()),
        );

        assert_eq!(
            changes,
            vec![
                FsChange::new(present, ChangeKind::Create),
                FsChange::new(absent, ChangeKind::Rename),
            ]
        );
    }
}
