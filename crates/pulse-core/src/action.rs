//! The [`UserAction`] struct — a derived, interval-based record summarizing
//! one or more raw events.
//!
//! A user action is mutable until its session closes: later aggregation
//! passes may push `end` forward and merge payload state. Identity is the
//! deterministic idempotency key, so "create" and "extend" are both
//! expressible as a single upsert and replays are no-ops.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::action_kind::UserActionKind;
use crate::payloads::{ChunkTiming, EditPayload, ItemChurnPayload};

/// An aggregated user action with a start/end interval.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAction {
    /// Account the action belongs to.
    pub account_id: String,
    /// Action kind discriminator.
    pub kind: UserActionKind,
    /// Acting user, when known.
    pub user_id: Option<String>,
    /// Interval start in milliseconds since epoch. Never changes once set.
    pub start: i64,
    /// Interval end in milliseconds since epoch. Pushed forward by later
    /// events in the same session.
    pub end: i64,
    /// Typed, kind-specific payload.
    pub data: ActionData,
}

impl UserAction {
    /// The deterministic idempotency key:
    /// `sha256(accountId|kind|mergeKey|start)`, lowercase hex.
    ///
    /// Two aggregation runs that observe the same underlying session produce
    /// the same key, enabling upsert-as-extend rather than duplicate
    /// insertion. Extension never changes `start`, so the key is stable for
    /// the lifetime of the action.
    #[must_use]
    pub fn idempotency_key(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.account_id.as_bytes());
        hasher.update(b"|");
        hasher.update(self.kind.as_str().as_bytes());
        hasher.update(b"|");
        hasher.update(self.data.merge_key().as_bytes());
        hasher.update(b"|");
        hasher.update(self.start.to_le_bytes());
        let digest = hasher.finalize();
        let mut out = String::with_capacity(64);
        for byte in digest {
            use std::fmt::Write;
            let _ = write!(out, "{byte:02x}");
        }
        out
    }

    /// The merge key of the underlying payload.
    #[must_use]
    pub fn merge_key(&self) -> &str {
        self.data.merge_key()
    }

    /// Duration of the interval in milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> i64 {
        self.end - self.start
    }
}

/// Closed union of user action payloads.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ActionData {
    /// Payload for item create/delete actions.
    ItemChurn(ItemChurnPayload),
    /// Payload for `item.edited` actions.
    Edit(EditPayload),
    /// Payload for `document.read` actions.
    Read(ReadActionPayload),
}

impl ActionData {
    /// The merge key of this action (item identity or session identifier).
    #[must_use]
    pub fn merge_key(&self) -> &str {
        match self {
            Self::ItemChurn(p) => &p.item_id,
            Self::Edit(p) => &p.session_id,
            Self::Read(p) => &p.session_id,
        }
    }

    /// The item ID this action is recorded against, when it has one.
    ///
    /// Used by the read path's denormalized `item_id` column for hierarchy
    /// scoped queries.
    #[must_use]
    pub fn item_id(&self) -> Option<&str> {
        match self {
            Self::ItemChurn(p) => Some(&p.item_id),
            Self::Edit(p) => Some(&p.item_id),
            Self::Read(p) => Some(&p.binder_id),
        }
    }

    /// Serialize the inner payload (without the variant tag) to JSON.
    pub fn payload_json(&self) -> Result<String, serde_json::Error> {
        match self {
            Self::ItemChurn(p) => serde_json::to_string(p),
            Self::Edit(p) => serde_json::to_string(p),
            Self::Read(p) => serde_json::to_string(p),
        }
    }

    /// Decode a payload JSON string for the given action kind.
    pub fn decode(kind: UserActionKind, payload: &str) -> Result<Self, serde_json::Error> {
        Ok(match kind {
            UserActionKind::ItemCreated
            | UserActionKind::ItemDeleted
            | UserActionKind::ItemHardDeleted => Self::ItemChurn(serde_json::from_str(payload)?),
            UserActionKind::ItemEdited => Self::Edit(serde_json::from_str(payload)?),
            UserActionKind::DocumentRead => Self::Read(serde_json::from_str(payload)?),
        })
    }
}

/// Payload for `document.read` actions.
///
/// Accumulates per-chunk timings across the read session; `incomplete`
/// stays `true` until a `document.closed` event is observed (possibly by a
/// later aggregation pass, which then counts the action as "completed").
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadActionPayload {
    /// Read session identifier (merge key).
    pub session_id: String,
    /// Source binder ID.
    pub binder_id: String,
    /// Publication being read.
    pub publication_id: String,
    /// Document title at read time.
    pub item_title: String,
    /// Whether the session is still missing its `document.closed` event.
    pub incomplete: bool,
    /// Per-chunk reading statistics, keyed by chunk index.
    #[serde(default)]
    pub chunk_timings: BTreeMap<u32, ChunkTiming>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
