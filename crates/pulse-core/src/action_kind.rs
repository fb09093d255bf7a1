//! The [`UserActionKind`] enum — aggregated user action discriminators.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// All user action kinds produced by the aggregation engine.
///
/// Note: aggregator kinds do not map 1:1 onto action kinds — e.g. all read
/// session events collapse into `document.read`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UserActionKind {
    /// Item created.
    #[serde(rename = "item.created")]
    ItemCreated,
    /// Item soft-deleted.
    #[serde(rename = "item.deleted")]
    ItemDeleted,
    /// Item hard-deleted.
    #[serde(rename = "item.hard_deleted")]
    ItemHardDeleted,
    /// Editing session on an item (merged from edit events).
    #[serde(rename = "item.edited")]
    ItemEdited,
    /// Read session on a published document.
    #[serde(rename = "document.read")]
    DocumentRead,
}

/// All user action kind variants in definition order.
pub const ALL_USER_ACTION_KINDS: [UserActionKind; 5] = [
    UserActionKind::ItemCreated,
    UserActionKind::ItemDeleted,
    UserActionKind::ItemHardDeleted,
    UserActionKind::ItemEdited,
    UserActionKind::DocumentRead,
];

impl UserActionKind {
    /// Return the canonical string representation (e.g., `"item.edited"`).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ItemCreated => "item.created",
            Self::ItemDeleted => "item.deleted",
            Self::ItemHardDeleted => "item.hard_deleted",
            Self::ItemEdited => "item.edited",
            Self::DocumentRead => "document.read",
        }
    }
}

impl fmt::Display for UserActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserActionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(serde_json::Value::String(s.to_owned()))
            .map_err(|_| format!("unknown user action kind: {s}"))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_roundtrip_all_variants() {
        for kind in &ALL_USER_ACTION_KINDS {
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, serde_json::Value::String(kind.as_str().to_owned()));
            let back: UserActionKind = serde_json::from_value(json).unwrap();
            assert_eq!(*kind, back);
        }
    }

    #[test]
    fn from_str_roundtrip() {
        for kind in &ALL_USER_ACTION_KINDS {
            assert_eq!(*kind, kind.as_str().parse().unwrap());
        }
        assert!("document.written".parse::<UserActionKind>().is_err());
    }
}
