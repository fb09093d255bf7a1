//! The [`EventSource`] trait — the aggregation engine's read seam over the
//! event log.
//!
//! The engine only ever reads the log through this trait, so tests can
//! inject sources that fail for particular accounts and verify fault
//! isolation without touching `SQLite` internals.

use pulse_core::EventKind;

use crate::errors::Result;
use crate::sqlite::row_types::EventRow;
use crate::store::tracking_store::TrackingStore;

/// Read access to the raw event log, cursor-relative.
pub trait EventSource: Send + Sync {
    /// Fetch up to `limit` events of the given kinds with
    /// `logged_at > after_logged_at`, in `(logged_at, id)` order.
    fn fetch_events(
        &self,
        account_id: &str,
        kinds: &[EventKind],
        after_logged_at: i64,
        limit: i64,
    ) -> Result<Vec<EventRow>>;

    /// Whether any event of the given kinds exists past the cursor.
    fn has_events_after(
        &self,
        account_id: &str,
        kinds: &[EventKind],
        after_logged_at: i64,
    ) -> Result<bool>;
}

impl EventSource for TrackingStore {
    fn fetch_events(
        &self,
        account_id: &str,
        kinds: &[EventKind],
        after_logged_at: i64,
        limit: i64,
    ) -> Result<Vec<EventRow>> {
        TrackingStore::fetch_events(self, account_id, kinds, after_logged_at, limit)
    }

    fn has_events_after(
        &self,
        account_id: &str,
        kinds: &[EventKind],
        after_logged_at: i64,
    ) -> Result<bool> {
        TrackingStore::has_events_after(self, account_id, kinds, after_logged_at)
    }
}
