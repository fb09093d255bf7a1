//! Editing payloads (`binder.edited`).

use serde::{Deserialize, Serialize};

/// Payload for `binder.edited` events and `item.edited` actions.
///
/// `session_id` is the merge key: edit events sharing a session collapse
/// into a single editing action regardless of how many aggregation passes
/// separate them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditPayload {
    /// Editing session identifier (merge key).
    pub session_id: String,
    /// Edited binder ID.
    pub binder_id: String,
    /// Item ID (same as `binder_id` for documents).
    pub item_id: String,
    /// Editing user.
    pub user_id: String,
    /// Item title at edit time.
    pub item_title: String,
    /// Language of the edited chunk.
    pub iso_code: String,
}
