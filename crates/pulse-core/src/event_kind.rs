//! The [`EventKind`] enum — raw interaction event discriminators.
//!
//! Every variant has an exact `#[serde(rename)]` matching the dot-separated
//! string persisted in the event log (e.g., `"item.created"`). Domain helper
//! methods replace ad-hoc numeric range checks with compile-time
//! exhaustiveness.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// All raw interaction event kinds consumed by the aggregation engine.
///
/// Each variant serializes to the exact dot-separated string stored in the
/// `events.kind` column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventKind {
    // -- Item lifecycle --
    /// Item (document or collection) created.
    #[serde(rename = "item.created")]
    ItemCreated,
    /// Item soft-deleted (recoverable).
    #[serde(rename = "item.deleted")]
    ItemDeleted,
    /// Item hard-deleted (purged).
    #[serde(rename = "item.hard_deleted")]
    ItemHardDeleted,

    // -- Editing --
    /// A document was edited within an editing session.
    #[serde(rename = "binder.edited")]
    BinderEdited,

    // -- Reading --
    /// Reader opened a published document.
    #[serde(rename = "document.opened")]
    DocumentOpened,
    /// Reader closed a published document.
    #[serde(rename = "document.closed")]
    DocumentClosed,
    /// Reader scrolled a chunk into view.
    #[serde(rename = "chunk.browsed")]
    ChunkBrowsed,
    /// Read session regained focus.
    #[serde(rename = "read_session.focus")]
    ReadSessionFocus,
    /// Read session lost focus.
    #[serde(rename = "read_session.blur")]
    ReadSessionBlur,
}

/// All event kind variants in definition order.
pub const ALL_EVENT_KINDS: [EventKind; 9] = [
    EventKind::ItemCreated,
    EventKind::ItemDeleted,
    EventKind::ItemHardDeleted,
    EventKind::BinderEdited,
    EventKind::DocumentOpened,
    EventKind::DocumentClosed,
    EventKind::ChunkBrowsed,
    EventKind::ReadSessionFocus,
    EventKind::ReadSessionBlur,
];

impl EventKind {
    /// Return the canonical string representation (e.g., `"item.created"`).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ItemCreated => "item.created",
            Self::ItemDeleted => "item.deleted",
            Self::ItemHardDeleted => "item.hard_deleted",
            Self::BinderEdited => "binder.edited",
            Self::DocumentOpened => "document.opened",
            Self::DocumentClosed => "document.closed",
            Self::ChunkBrowsed => "chunk.browsed",
            Self::ReadSessionFocus => "read_session.focus",
            Self::ReadSessionBlur => "read_session.blur",
        }
    }

    /// Whether this kind belongs to a read session (`document.*`,
    /// `chunk.*`, `read_session.*`).
    #[must_use]
    pub fn is_read_kind(self) -> bool {
        matches!(
            self,
            Self::DocumentOpened
                | Self::DocumentClosed
                | Self::ChunkBrowsed
                | Self::ReadSessionFocus
                | Self::ReadSessionBlur
        )
    }

    /// Whether this is an item create/delete kind (one event, one action).
    #[must_use]
    pub fn is_item_churn_kind(self) -> bool {
        matches!(
            self,
            Self::ItemCreated | Self::ItemDeleted | Self::ItemHardDeleted
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // The `#[serde(rename)]` attributes are the source of truth.
        serde_json::from_value(serde_json::Value::String(s.to_owned()))
            .map_err(|_| format!("unknown event kind: {s}"))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_kinds_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for kind in &ALL_EVENT_KINDS {
            assert!(seen.insert(kind), "duplicate event kind: {kind}");
        }
    }

    #[test]
    fn serde_roundtrip_all_variants() {
        for kind in &ALL_EVENT_KINDS {
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, serde_json::Value::String(kind.as_str().to_owned()));
            let back: EventKind = serde_json::from_value(json).unwrap();
            assert_eq!(*kind, back);
        }
    }

    #[test]
    fn from_str_all_variants() {
        for kind in &ALL_EVENT_KINDS {
            let parsed: EventKind = kind.as_str().parse().unwrap();
            assert_eq!(*kind, parsed);
        }
    }

    #[test]
    fn from_str_rejects_invalid() {
        let err = "not.a.kind".parse::<EventKind>();
        assert!(err.is_err());
        assert!(err.unwrap_err().contains("unknown event kind"));
    }

    #[test]
    fn display_matches_as_str() {
        for kind in &ALL_EVENT_KINDS {
            assert_eq!(format!("{kind}"), kind.as_str());
        }
    }

    #[test]
    fn read_kinds() {
        assert!(EventKind::DocumentOpened.is_read_kind());
        assert!(EventKind::ChunkBrowsed.is_read_kind());
        assert!(EventKind::ReadSessionBlur.is_read_kind());
        assert!(!EventKind::BinderEdited.is_read_kind());
        assert!(!EventKind::ItemCreated.is_read_kind());
    }

    #[test]
    fn item_churn_kinds() {
        assert!(EventKind::ItemCreated.is_item_churn_kind());
        assert!(EventKind::ItemDeleted.is_item_churn_kind());
        assert!(EventKind::ItemHardDeleted.is_item_churn_kind());
        assert!(!EventKind::BinderEdited.is_item_churn_kind());
    }
}
