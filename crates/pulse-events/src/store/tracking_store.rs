//! High-level transactional [`TrackingStore`] API.
//!
//! Composes the repositories into atomic operations. Every write method
//! runs inside a single `SQLite` transaction — an aggregation outcome
//! (actions plus cursor) commits together or not at all, so a crash never
//! leaves the cursor ahead of the actions it accounts for.

use std::time::Duration;

use rand::Rng;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use pulse_core::{AggregatorKind, Event, EventData, EventKind, UserAction, UserActionKind};

use crate::errors::{Result, StoreError};
use crate::sqlite::connection::{self, ConnectionConfig, ConnectionPool, PooledConnection};
use crate::sqlite::migrations::run_migrations;
use crate::sqlite::repositories::{
    CursorRepo, EventRepo, FetchOptions, UpsertOutcome, UserActionRepo,
};
use crate::sqlite::row_types::{CursorRow, EventRow, UserActionRow};

const BUSY_MAX_ATTEMPTS: u32 = 5;
const BUSY_BASE_DELAY_MS: u64 = 50;

/// A not-yet-logged event; ID and `logged_at` are assigned at ingestion.
#[derive(Debug, Clone)]
pub struct NewEvent {
    /// Owning account.
    pub account_id: String,
    /// Acting user, when known.
    pub user_id: Option<String>,
    /// Client-reported event time (ms since epoch).
    pub occurred_at: i64,
    /// Typed payload.
    pub data: EventData,
}

/// Filter for reading back aggregated actions.
#[derive(Debug, Clone, Default)]
pub struct ActionFilter {
    /// Restrict to these kinds; empty means all kinds.
    pub kinds: Vec<UserActionKind>,
    /// Only actions whose interval ends at or after this time.
    pub from: Option<i64>,
    /// Only actions whose interval starts at or before this time.
    pub to: Option<i64>,
    /// Restrict to actions recorded against these item IDs.
    pub item_ids: Option<Vec<String>>,
}

/// Insert/extend counts from committing an aggregation outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutcomeCounts {
    /// Actions newly inserted.
    pub inserted: usize,
    /// Existing actions extended in place.
    pub extended: usize,
}

/// High-level store wrapping a connection pool and all repositories.
pub struct TrackingStore {
    pool: ConnectionPool,
}

impl TrackingStore {
    /// Wrap an existing pool. Runs pending migrations.
    pub fn new(pool: ConnectionPool) -> Result<Self> {
        let store = Self { pool };
        let conn = store.conn()?;
        let _ = run_migrations(&conn)?;
        Ok(store)
    }

    /// Open a file-backed store, creating the schema if needed.
    pub fn open_file(path: &str, config: &ConnectionConfig) -> Result<Self> {
        Self::new(connection::new_file(path, config)?)
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> Result<Self> {
        Self::new(connection::new_in_memory(&ConnectionConfig::default())?)
    }

    fn conn(&self) -> Result<PooledConnection> {
        Ok(self.pool.get()?)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Ingestion
    // ─────────────────────────────────────────────────────────────────────

    /// Log a single event, assigning its ID and `logged_at` timestamp.
    pub fn log_event(&self, new: &NewEvent) -> Result<Event> {
        let mut events = self.log_events(std::slice::from_ref(new))?;
        Ok(events.remove(0))
    }

    /// Log a batch of events in one transaction.
    ///
    /// All events in the batch share the same `logged_at` assignment moment;
    /// IDs are UUID v7 so ties on `logged_at` still order by arrival.
    #[instrument(skip_all, fields(count = batch.len()))]
    pub fn log_events(&self, batch: &[NewEvent]) -> Result<Vec<Event>> {
        retry_on_busy(|| {
            let conn = self.conn()?;
            let tx = conn.unchecked_transaction()?;

            let mut logged = Vec::with_capacity(batch.len());
            for new in batch {
                let event = Event {
                    id: format!("evt_{}", Uuid::now_v7()),
                    account_id: new.account_id.clone(),
                    user_id: new.user_id.clone(),
                    occurred_at: new.occurred_at,
                    logged_at: chrono::Utc::now().timestamp_millis(),
                    data: new.data.clone(),
                };
                EventRepo::insert(&tx, &event)?;
                logged.push(event);
            }

            tx.commit()?;
            debug!(count = logged.len(), "events logged");
            Ok(logged)
        })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Aggregation reads
    // ─────────────────────────────────────────────────────────────────────

    /// Fetch up to `limit` events of the given kinds past the cursor, in
    /// log order. Rows are returned undecoded; the caller decides how to
    /// handle malformed payloads.
    pub fn fetch_events(
        &self,
        account_id: &str,
        kinds: &[EventKind],
        after_logged_at: i64,
        limit: i64,
    ) -> Result<Vec<EventRow>> {
        let conn = self.conn()?;
        EventRepo::fetch_for_aggregation(
            &conn,
            account_id,
            kinds,
            &FetchOptions {
                after_logged_at,
                limit,
            },
        )
    }

    /// Whether events of the given kinds exist past the cursor.
    pub fn has_events_after(
        &self,
        account_id: &str,
        kinds: &[EventKind],
        after_logged_at: i64,
    ) -> Result<bool> {
        let conn = self.conn()?;
        EventRepo::exists_after(&conn, account_id, kinds, after_logged_at)
    }

    /// The cursor for a pair, if one exists.
    pub fn cursor(
        &self,
        account_id: &str,
        aggregator: AggregatorKind,
    ) -> Result<Option<CursorRow>> {
        let conn = self.conn()?;
        CursorRepo::get(&conn, account_id, aggregator)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Aggregation writes
    // ─────────────────────────────────────────────────────────────────────

    /// Commit an aggregation outcome: upsert the produced actions and
    /// advance the cursor, atomically.
    ///
    /// `last_event_ts` is the `logged_at` of the newest event consumed;
    /// `now_ms` is recorded as the run time.
    #[instrument(skip(self, actions), fields(actions = actions.len()))]
    pub fn commit_outcome(
        &self,
        account_id: &str,
        aggregator: AggregatorKind,
        actions: &[UserAction],
        last_event_ts: i64,
        now_ms: i64,
    ) -> Result<OutcomeCounts> {
        retry_on_busy(|| {
            let conn = self.conn()?;
            let tx = conn.unchecked_transaction()?;

            let mut counts = OutcomeCounts::default();
            for action in actions {
                match UserActionRepo::upsert(&tx, action)? {
                    UpsertOutcome::Inserted => counts.inserted += 1,
                    UpsertOutcome::Extended => counts.extended += 1,
                }
            }

            CursorRepo::upsert(
                &tx,
                &CursorRow {
                    account_id: account_id.to_string(),
                    aggregator,
                    last_event_ts,
                    last_aggregation_at: now_ms,
                },
            )?;

            tx.commit()?;
            debug!(
                inserted = counts.inserted,
                extended = counts.extended,
                last_event_ts,
                "aggregation outcome committed"
            );
            Ok(counts)
        })
    }

    /// Delete the cursor for a pair so the next run replays from the start
    /// of the log. Returns whether a cursor existed.
    pub fn reset_cursor(&self, account_id: &str, aggregator: AggregatorKind) -> Result<bool> {
        let conn = self.conn()?;
        CursorRepo::delete(&conn, account_id, aggregator)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Read-back
    // ─────────────────────────────────────────────────────────────────────

    /// Find aggregated actions for an account, decoded.
    pub fn find_user_actions(
        &self,
        account_id: &str,
        filter: &ActionFilter,
    ) -> Result<Vec<UserAction>> {
        let conn = self.conn()?;
        let rows = UserActionRepo::find(
            &conn,
            account_id,
            &filter.kinds,
            filter.from,
            filter.to,
            filter.item_ids.as_deref(),
        )?;
        rows.into_iter().map(UserActionRow::into_action).collect()
    }

    /// The most recent aggregation run time across an account's cursors.
    pub fn last_aggregation_time(&self, account_id: &str) -> Result<Option<i64>> {
        let conn = self.conn()?;
        CursorRepo::last_aggregation_at(&conn, account_id)
    }

    /// All account IDs present in the event log.
    pub fn distinct_account_ids(&self) -> Result<Vec<String>> {
        let conn = self.conn()?;
        EventRepo::distinct_account_ids(&conn)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Busy retry
// ─────────────────────────────────────────────────────────────────────────────

/// Retry a write a few times when `SQLite` reports the database busy or
/// locked, with linear backoff and jitter. Other errors pass through.
fn retry_on_busy<T>(mut op: impl FnMut() -> Result<T>) -> Result<T> {
    let mut attempt: u32 = 0;
    loop {
        match op() {
            Err(StoreError::Sqlite(e)) if is_busy(&e) && attempt + 1 < BUSY_MAX_ATTEMPTS => {
                attempt += 1;
                let jitter = rand::rng().random_range(0..BUSY_BASE_DELAY_MS);
                let delay = BUSY_BASE_DELAY_MS * u64::from(attempt) + jitter;
                warn!(attempt, delay_ms = delay, "database busy, retrying");
                std::thread::sleep(Duration::from_millis(delay));
            }
            other => return other,
        }
    }
}

fn is_busy(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::DatabaseBusy
                || err.code == rusqlite::ErrorCode::DatabaseLocked
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(unused_results)]
mod tests {
    use super::*;
    use pulse_core::{ActionData, EditPayload, ItemChurnPayload};

    fn store() -> TrackingStore {
        TrackingStore::open_in_memory().unwrap()
    }

    fn churn_data(item: &str) -> EventData {
        EventData::ItemCreated(ItemChurnPayload {
            item_id: item.to_string(),
            item_kind: "binder".into(),
            item_title: format!("Item {item}"),
        })
    }

    fn new_event(account: &str, item: &str, occurred_at: i64) -> NewEvent {
        NewEvent {
            account_id: account.to_string(),
            user_id: Some("user-1".into()),
            occurred_at,
            data: churn_data(item),
        }
    }

    fn edit_action(account: &str, session: &str, start: i64, end: i64) -> UserAction {
        UserAction {
            account_id: account.to_string(),
            kind: UserActionKind::ItemEdited,
            user_id: Some("user-1".into()),
            start,
            end,
            data: ActionData::Edit(EditPayload {
                session_id: session.to_string(),
                binder_id: "bin-1".into(),
                item_id: "item-1".into(),
                user_id: "user-1".into(),
                item_title: "Item 1".into(),
                iso_code: "en".into(),
            }),
        }
    }

    #[test]
    fn log_event_assigns_id_and_logged_at() {
        let store = store();
        let event = store.log_event(&new_event("acct-1", "item-1", 123)).unwrap();
        assert!(event.id.starts_with("evt_"));
        assert!(event.logged_at > 0);
        assert_eq!(event.occurred_at, 123);
    }

    #[test]
    fn log_events_batch_then_fetch() {
        let store = store();
        let batch: Vec<NewEvent> = (0..3)
            .map(|i| new_event("acct-1", &format!("item-{i}"), i * 100))
            .collect();
        let logged = store.log_events(&batch).unwrap();
        assert_eq!(logged.len(), 3);

        let rows = store
            .fetch_events("acct-1", &[EventKind::ItemCreated], 0, 10)
            .unwrap();
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn commit_outcome_is_atomic_pair_of_actions_and_cursor() {
        let store = store();
        let actions = vec![edit_action("acct-1", "sess-1", 1_000, 2_000)];
        let counts = store
            .commit_outcome("acct-1", AggregatorKind::ItemEdits, &actions, 2_500, 3_000)
            .unwrap();
        assert_eq!(counts.inserted, 1);
        assert_eq!(counts.extended, 0);

        let cursor = store
            .cursor("acct-1", AggregatorKind::ItemEdits)
            .unwrap()
            .unwrap();
        assert_eq!(cursor.last_event_ts, 2_500);
        assert_eq!(cursor.last_aggregation_at, 3_000);
    }

    #[test]
    fn commit_outcome_counts_extensions() {
        let store = store();
        let first = vec![edit_action("acct-1", "sess-1", 1_000, 2_000)];
        store
            .commit_outcome("acct-1", AggregatorKind::ItemEdits, &first, 2_000, 2_100)
            .unwrap();

        let second = vec![edit_action("acct-1", "sess-1", 1_000, 6_000)];
        let counts = store
            .commit_outcome("acct-1", AggregatorKind::ItemEdits, &second, 6_000, 6_100)
            .unwrap();
        assert_eq!(counts.inserted, 0);
        assert_eq!(counts.extended, 1);

        let actions = store
            .find_user_actions("acct-1", &ActionFilter::default())
            .unwrap();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].end, 6_000);
    }

    #[test]
    fn reset_cursor_replays_from_start() {
        let store = store();
        store
            .commit_outcome("acct-1", AggregatorKind::ItemEdits, &[], 2_000, 2_100)
            .unwrap();
        assert!(store.reset_cursor("acct-1", AggregatorKind::ItemEdits).unwrap());
        assert!(store.cursor("acct-1", AggregatorKind::ItemEdits).unwrap().is_none());
        assert!(!store.reset_cursor("acct-1", AggregatorKind::ItemEdits).unwrap());
    }

    #[test]
    fn last_aggregation_time_tracks_max() {
        let store = store();
        assert!(store.last_aggregation_time("acct-1").unwrap().is_none());
        store
            .commit_outcome("acct-1", AggregatorKind::ItemEdits, &[], 100, 1_000)
            .unwrap();
        store
            .commit_outcome("acct-1", AggregatorKind::ReadSessions, &[], 100, 2_000)
            .unwrap();
        assert_eq!(store.last_aggregation_time("acct-1").unwrap(), Some(2_000));
    }

    #[test]
    fn distinct_account_ids_across_batches() {
        let store = store();
        store.log_event(&new_event("acct-b", "item-1", 0)).unwrap();
        store.log_event(&new_event("acct-a", "item-2", 0)).unwrap();
        assert_eq!(
            store.distinct_account_ids().unwrap(),
            vec!["acct-a".to_string(), "acct-b".to_string()]
        );
    }
}
