//! Read session payloads (`document.*`, `chunk.browsed`, `read_session.*`).

use serde::{Deserialize, Serialize};

/// Payload for `document.opened` and `document.closed` events.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadPayload {
    /// Read session identifier (merge key).
    pub session_id: String,
    /// Source binder ID.
    pub binder_id: String,
    /// Publication being read.
    pub publication_id: String,
    /// Document title at read time.
    pub item_title: String,
}

/// Payload for `chunk.browsed` events.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkBrowsedPayload {
    /// Read session identifier (merge key).
    pub session_id: String,
    /// Source binder ID.
    pub binder_id: String,
    /// Publication being read.
    pub publication_id: String,
    /// Zero-based chunk index.
    pub chunk_index: u32,
    /// Word count of the chunk.
    pub word_count: u32,
    /// Milliseconds the chunk was in view.
    pub time_spent_ms: u64,
}

/// Payload for `read_session.focus` / `read_session.blur` events.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusChangePayload {
    /// Read session identifier (merge key).
    pub session_id: String,
    /// Publication being read.
    pub publication_id: String,
}

/// Per-chunk reading statistics accumulated on a `document.read` action.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkTiming {
    /// Word count of the chunk.
    pub word_count: u32,
    /// Total milliseconds the chunk was in view across the session.
    pub time_spent_ms: u64,
}
