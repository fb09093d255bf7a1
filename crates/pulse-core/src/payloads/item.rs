//! Item lifecycle payloads (`item.created`, `item.deleted`, `item.hard_deleted`).

use serde::{Deserialize, Serialize};

/// Payload for item create/delete events and the actions derived from them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemChurnPayload {
    /// Affected item ID.
    pub item_id: String,
    /// `"binder"` (document) or `"collection"`.
    pub item_kind: String,
    /// Human-readable title at the time of the event.
    pub item_title: String,
}
