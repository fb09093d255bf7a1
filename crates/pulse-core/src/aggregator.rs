//! The [`AggregatorKind`] catalogue — which raw event kinds feed which
//! user action kind, and how they merge.
//!
//! Every aggregator owns an independent cursor per account; a run over one
//! aggregator never observes or blocks another.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::action_kind::UserActionKind;
use crate::event_kind::EventKind;

/// How an aggregator folds events into actions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AggregatorMode {
    /// One event maps deterministically to one new action; no merging.
    Instant,
    /// Events are grouped by merge key; a group extends an existing open
    /// action when one is recent enough, else starts a new one.
    Session,
}

/// A tagged category of aggregation logic with its own cursor and merge rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AggregatorKind {
    /// Item creations (instant).
    #[serde(rename = "item-creations")]
    ItemCreations,
    /// Item soft-deletions (instant).
    #[serde(rename = "item-deletions")]
    ItemDeletions,
    /// Item hard-deletions (instant).
    #[serde(rename = "item-hard-deletions")]
    ItemHardDeletions,
    /// Editing sessions (merged on session ID).
    #[serde(rename = "item-edits")]
    ItemEdits,
    /// Read sessions (merged on session ID).
    #[serde(rename = "read-sessions")]
    ReadSessions,
}

/// All aggregator kinds — the default set for a full aggregation run.
pub const ALL_AGGREGATOR_KINDS: [AggregatorKind; 5] = [
    AggregatorKind::ItemCreations,
    AggregatorKind::ItemDeletions,
    AggregatorKind::ItemHardDeletions,
    AggregatorKind::ItemEdits,
    AggregatorKind::ReadSessions,
];

impl AggregatorKind {
    /// Return the canonical string representation (e.g., `"item-edits"`).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ItemCreations => "item-creations",
            Self::ItemDeletions => "item-deletions",
            Self::ItemHardDeletions => "item-hard-deletions",
            Self::ItemEdits => "item-edits",
            Self::ReadSessions => "read-sessions",
        }
    }

    /// The raw event kinds this aggregator consumes.
    #[must_use]
    pub fn source_kinds(self) -> &'static [EventKind] {
        match self {
            Self::ItemCreations => &[EventKind::ItemCreated],
            Self::ItemDeletions => &[EventKind::ItemDeleted],
            Self::ItemHardDeletions => &[EventKind::ItemHardDeleted],
            Self::ItemEdits => &[EventKind::BinderEdited],
            Self::ReadSessions => &[
                EventKind::DocumentOpened,
                EventKind::ChunkBrowsed,
                EventKind::ReadSessionFocus,
                EventKind::ReadSessionBlur,
                EventKind::DocumentClosed,
            ],
        }
    }

    /// The user action kind this aggregator produces.
    #[must_use]
    pub fn action_kind(self) -> UserActionKind {
        match self {
            Self::ItemCreations => UserActionKind::ItemCreated,
            Self::ItemDeletions => UserActionKind::ItemDeleted,
            Self::ItemHardDeletions => UserActionKind::ItemHardDeleted,
            Self::ItemEdits => UserActionKind::ItemEdited,
            Self::ReadSessions => UserActionKind::DocumentRead,
        }
    }

    /// The merge mode of this aggregator.
    #[must_use]
    pub fn mode(self) -> AggregatorMode {
        match self {
            Self::ItemCreations | Self::ItemDeletions | Self::ItemHardDeletions => {
                AggregatorMode::Instant
            }
            Self::ItemEdits | Self::ReadSessions => AggregatorMode::Session,
        }
    }
}

impl fmt::Display for AggregatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregatorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(serde_json::Value::String(s.to_owned()))
            .map_err(|_| format!("unknown aggregator kind: {s}"))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
