//! Raw row structs for the `SQLite` backend.
//!
//! Rows hold columns exactly as stored; decoding into domain types is a
//! separate, fallible step so callers decide how to handle malformed
//! payloads (the aggregation path treats them as batch truncation points
//! rather than hard failures).

use pulse_core::{ActionData, AggregatorKind, Event, EventData, UserAction};

use crate::errors::{Result, StoreError};

/// A row from the `events` table.
#[derive(Debug, Clone)]
pub struct EventRow {
    /// Event ID.
    pub id: String,
    /// Owning account.
    pub account_id: String,
    /// Acting user, when recorded.
    pub user_id: Option<String>,
    /// Kind discriminator string (e.g. `"item.created"`).
    pub kind: String,
    /// Client-reported event time (ms since epoch).
    pub occurred_at: i64,
    /// Server ingestion time (ms since epoch).
    pub logged_at: i64,
    /// Kind-specific payload JSON.
    pub payload: String,
}

impl EventRow {
    /// Decode this row into a domain [`Event`].
    ///
    /// # Errors
    ///
    /// [`StoreError::UnknownKind`] when the `kind` column names no known
    /// event kind; [`StoreError::MalformedPayload`] when the payload JSON
    /// does not decode for that kind.
    pub fn into_event(self) -> Result<Event> {
        let kind = self
            .kind
            .parse()
            .map_err(|_| StoreError::UnknownKind(self.kind.clone()))?;
        let data = EventData::decode(kind, &self.payload).map_err(|e| {
            StoreError::MalformedPayload {
                event_id: self.id.clone(),
                message: e.to_string(),
            }
        })?;
        Ok(Event {
            id: self.id,
            account_id: self.account_id,
            user_id: self.user_id,
            occurred_at: self.occurred_at,
            logged_at: self.logged_at,
            data,
        })
    }
}

/// A row from the `aggregator_cursors` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorRow {
    /// Account this cursor belongs to.
    pub account_id: String,
    /// Aggregator the cursor tracks.
    pub aggregator: AggregatorKind,
    /// `logged_at` of the last event consumed by this aggregator.
    pub last_event_ts: i64,
    /// Wall-clock time of the last aggregation run (ms since epoch).
    pub last_aggregation_at: i64,
}

/// A row from the `user_actions` table.
#[derive(Debug, Clone)]
pub struct UserActionRow {
    /// Idempotency key (primary key).
    pub key: String,
    /// Owning account.
    pub account_id: String,
    /// Action kind discriminator string (e.g. `"document.read"`).
    pub kind: String,
    /// Acting user, when recorded.
    pub user_id: Option<String>,
    /// Denormalized item ID for hierarchy-scoped queries.
    pub item_id: Option<String>,
    /// Interval start (ms since epoch).
    pub start_ts: i64,
    /// Interval end (ms since epoch).
    pub end_ts: i64,
    /// Kind-specific payload JSON.
    pub payload: String,
}

impl UserActionRow {
    /// Decode this row into a domain [`UserAction`].
    pub fn into_action(self) -> Result<UserAction> {
        let kind = self
            .kind
            .parse()
            .map_err(|_| StoreError::UnknownKind(self.kind.clone()))?;
        let data = ActionData::decode(kind, &self.payload).map_err(|e| {
            StoreError::MalformedPayload {
                event_id: self.key.clone(),
                message: e.to_string(),
            }
        })?;
        Ok(UserAction {
            account_id: self.account_id,
            kind,
            user_id: self.user_id,
            start: self.start_ts,
            end: self.end_ts,
            data,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
