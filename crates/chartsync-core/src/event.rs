//! Records and the change events that mutate them.

use serde::{Deserialize, Serialize};

/// A uniquely identified payload tracked by the synchronizer.
///
/// Identity is decided by [`Record::id`] alone; two records with the same id
/// are versions of the same remote document.
pub trait Record: Clone {
    /// The document identifier.
    fn id(&self) -> &str;
}

/// Kind of a remote change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// Document appeared in the collection
    Added,
    /// Document content changed
    Modified,
    /// Document left the collection
    Removed,
}

impl ChangeKind {
    /// Parse a change kind from its wire name.
    #[must_use]
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "added" => Some(Self::Added),
            "modified" => Some(Self::Modified),
            "removed" => Some(Self::Removed),
            _ => None,
        }
    }

    /// Wire name of this kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Added => "added",
            ChangeKind::Modified => "modified",
            ChangeKind::Removed => "removed",
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single typed change delivered by a change-stream source.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent<R> {
    /// A new record
    Added(R),
    /// A new version of an existing record
    Modified(R),
    /// Removal of the record with this id
    Removed(String),
}

impl<R: Record> ChangeEvent<R> {
    /// Id of the record this event targets.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            ChangeEvent::Added(record) | ChangeEvent::Modified(record) => record.id(),
            ChangeEvent::Removed(id) => id,
        }
    }

    /// Kind of this event.
    #[must_use]
    pub fn kind(&self) -> ChangeKind {
        match self {
            ChangeEvent::Added(_) => ChangeKind::Added,
            ChangeEvent::Modified(_) => ChangeKind::Modified,
            ChangeEvent::Removed(_) => ChangeKind::Removed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item(String);

    impl Record for Item {
        fn id(&self) -> &str {
            &self.0
        }
    }

    #[test]
    fn change_kind_wire_names() {
        for kind in [ChangeKind::Added, ChangeKind::Modified, ChangeKind::Removed] {
            assert_eq!(ChangeKind::from_wire(kind.as_str()), Some(kind));
        }
        assert_eq!(ChangeKind::from_wire("renamed"), None);
        assert_eq!(
            serde_json::to_string(&ChangeKind::Modified).unwrap(),
            "\"modified\""
        );
    }

    #[test]
    fn event_targets_record_id() {
        let added = ChangeEvent::Added(Item("a".into()));
        let removed: ChangeEvent<Item> = ChangeEvent::Removed("b".into());

        assert_eq!(added.id(), "a");
        assert_eq!(added.kind(), ChangeKind::Added);
        assert_eq!(removed.id(), "b");
        assert_eq!(removed.kind(), ChangeKind::Removed);
    }
}
