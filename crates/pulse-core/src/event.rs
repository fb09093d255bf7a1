//! The [`Event`] struct — the immutable unit of input to aggregation.
//!
//! Events carry two timestamps: `occurred_at` (event time, reported by the
//! client) and `logged_at` (ingestion time, assigned by the server).
//! Aggregation cursors advance along `logged_at` to guarantee forward
//! progress even when client clocks are skewed.
//!
//! [`EventData`] is a closed tagged union: one variant per [`EventKind`],
//! each holding a typed payload. Merge-key extraction is an exhaustive
//! match, so adding an event kind without deciding its merge semantics is
//! a compile error.

use serde::{Deserialize, Serialize};

use crate::event_kind::EventKind;
use crate::payloads::{
    ChunkBrowsedPayload, EditPayload, FocusChangePayload, ItemChurnPayload, ReadPayload,
};

/// An immutable interaction event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Unique event ID (UUID v7, assigned at ingestion).
    pub id: String,
    /// Account the event belongs to.
    pub account_id: String,
    /// Acting user, when known.
    pub user_id: Option<String>,
    /// Event time in milliseconds since epoch (client-reported).
    pub occurred_at: i64,
    /// Ingestion time in milliseconds since epoch (cursor axis).
    pub logged_at: i64,
    /// Typed, kind-specific payload.
    pub data: EventData,
}

impl Event {
    /// The event kind, derived from the payload variant.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        self.data.kind()
    }
}

/// Closed union of event payloads, one variant per [`EventKind`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum EventData {
    /// `item.created`
    ItemCreated(ItemChurnPayload),
    /// `item.deleted`
    ItemDeleted(ItemChurnPayload),
    /// `item.hard_deleted`
    ItemHardDeleted(ItemChurnPayload),
    /// `binder.edited`
    BinderEdited(EditPayload),
    /// `document.opened`
    DocumentOpened(ReadPayload),
    /// `document.closed`
    DocumentClosed(ReadPayload),
    /// `chunk.browsed`
    ChunkBrowsed(ChunkBrowsedPayload),
    /// `read_session.focus`
    ReadSessionFocus(FocusChangePayload),
    /// `read_session.blur`
    ReadSessionBlur(FocusChangePayload),
}

impl EventData {
    /// The event kind this payload belongs to.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::ItemCreated(_) => EventKind::ItemCreated,
            Self::ItemDeleted(_) => EventKind::ItemDeleted,
            Self::ItemHardDeleted(_) => EventKind::ItemHardDeleted,
            Self::BinderEdited(_) => EventKind::BinderEdited,
            Self::DocumentOpened(_) => EventKind::DocumentOpened,
            Self::DocumentClosed(_) => EventKind::DocumentClosed,
            Self::ChunkBrowsed(_) => EventKind::ChunkBrowsed,
            Self::ReadSessionFocus(_) => EventKind::ReadSessionFocus,
            Self::ReadSessionBlur(_) => EventKind::ReadSessionBlur,
        }
    }

    /// The merge key deciding whether an event extends an existing user
    /// action or starts a new one.
    ///
    /// Item churn kinds merge on item identity (one event, one action);
    /// session-style kinds merge on their session identifier.
    #[must_use]
    pub fn merge_key(&self) -> &str {
        match self {
            Self::ItemCreated(p) | Self::ItemDeleted(p) | Self::ItemHardDeleted(p) => &p.item_id,
            Self::BinderEdited(p) => &p.session_id,
            Self::DocumentOpened(p) | Self::DocumentClosed(p) => &p.session_id,
            Self::ChunkBrowsed(p) => &p.session_id,
            Self::ReadSessionFocus(p) | Self::ReadSessionBlur(p) => &p.session_id,
        }
    }

    /// Serialize the inner payload (without the variant tag) to JSON.
    ///
    /// The variant tag is redundant with the `kind` column in storage; the
    /// payload column holds only the payload fields.
    pub fn payload_json(&self) -> Result<String, serde_json::Error> {
        match self {
            Self::ItemCreated(p) | Self::ItemDeleted(p) | Self::ItemHardDeleted(p) => {
                serde_json::to_string(p)
            }
            Self::BinderEdited(p) => serde_json::to_string(p),
            Self::DocumentOpened(p) | Self::DocumentClosed(p) => serde_json::to_string(p),
            Self::ChunkBrowsed(p) => serde_json::to_string(p),
            Self::ReadSessionFocus(p) | Self::ReadSessionBlur(p) => serde_json::to_string(p),
        }
    }

    /// Decode a payload JSON string for the given kind.
    ///
    /// This is the inverse of [`payload_json`](Self::payload_json): the kind
    /// comes from the `kind` column, the payload from the `payload` column.
    pub fn decode(kind: EventKind, payload: &str) -> Result<Self, serde_json::Error> {
        Ok(match kind {
            EventKind::ItemCreated => Self::ItemCreated(serde_json::from_str(payload)?),
            EventKind::ItemDeleted => Self::ItemDeleted(serde_json::from_str(payload)?),
            EventKind::ItemHardDeleted => Self::ItemHardDeleted(serde_json::from_str(payload)?),
            EventKind::BinderEdited => Self::BinderEdited(serde_json::from_str(payload)?),
            EventKind::DocumentOpened => Self::DocumentOpened(serde_json::from_str(payload)?),
            EventKind::DocumentClosed => Self::DocumentClosed(serde_json::from_str(payload)?),
            EventKind::ChunkBrowsed => Self::ChunkBrowsed(serde_json::from_str(payload)?),
            EventKind::ReadSessionFocus => Self::ReadSessionFocus(serde_json::from_str(payload)?),
            EventKind::ReadSessionBlur => Self::ReadSessionBlur(serde_json::from_str(payload)?),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn churn_payload() -> ItemChurnPayload {
        ItemChurnPayload {
            item_id: "item-1".into(),
            item_kind: "binder".into(),
            item_title: "item 1".into(),
        }
    }

    fn edit_payload() -> EditPayload {
        EditPayload {
            session_id: "session-1".into(),
            binder_id: "item-1".into(),
            item_id: "item-1".into(),
            user_id: "uid-123".into(),
            item_title: "item 1".into(),
            iso_code: "nl".into(),
        }
    }

    #[test]
    fn kind_matches_variant() {
        assert_eq!(
            EventData::ItemCreated(churn_payload()).kind(),
            EventKind::ItemCreated
        );
        assert_eq!(
            EventData::BinderEdited(edit_payload()).kind(),
            EventKind::BinderEdited
        );
    }

    #[test]
    fn merge_key_item_churn_is_item_id() {
        assert_eq!(EventData::ItemDeleted(churn_payload()).merge_key(), "item-1");
    }

    #[test]
    fn merge_key_edit_is_session_id() {
        assert_eq!(
            EventData::BinderEdited(edit_payload()).merge_key(),
            "session-1"
        );
    }

    #[test]
    fn payload_json_roundtrip() {
        let data = EventData::BinderEdited(edit_payload());
        let json = data.payload_json().unwrap();
        let back = EventData::decode(EventKind::BinderEdited, &json).unwrap();
        assert_eq!(data, back);
    }

    #[test]
    fn payload_json_is_camel_case() {
        let json = EventData::ItemCreated(churn_payload()).payload_json().unwrap();
        assert!(json.contains("\"itemId\""));
        assert!(json.contains("\"itemTitle\""));
        assert!(!json.contains("item_id"));
    }

    #[test]
    fn decode_rejects_mismatched_payload() {
        // An edit payload cannot decode as an item churn payload.
        let json = EventData::BinderEdited(edit_payload()).payload_json().unwrap();
        assert!(EventData::decode(EventKind::ItemCreated, &json).is_err());
    }

    #[test]
    fn decode_rejects_corrupt_json() {
        assert!(EventData::decode(EventKind::ItemCreated, "{not json").is_err());
    }
}
