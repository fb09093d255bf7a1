//! Event repository — the append-only raw event log.
//!
//! Events are immutable once logged. The aggregation path reads them in
//! `logged_at` order per (account, kind set), strictly after a cursor
//! position; ties on `logged_at` are broken by `id` so a fetch is
//! deterministic across runs.

use pulse_core::{Event, EventKind};
use rusqlite::{params, Connection, OptionalExtension};

use crate::errors::Result;
use crate::sqlite::row_types::EventRow;

const EVENT_COLUMNS: &str = "id, account_id, user_id, kind, occurred_at, logged_at, payload";

/// Options for an aggregation fetch.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Only events with `logged_at` strictly greater than this (cursor).
    pub after_logged_at: i64,
    /// Maximum number of events to return.
    pub limit: i64,
}

/// Event repository — stateless, every method takes `&Connection`.
pub struct EventRepo;

impl EventRepo {
    /// Insert a single event.
    pub fn insert(conn: &Connection, event: &Event) -> Result<()> {
        let payload = event.data.payload_json()?;
        let _ = conn.execute(
            "INSERT INTO events (id, account_id, user_id, kind, occurred_at, logged_at, payload)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                event.id,
                event.account_id,
                event.user_id,
                event.kind().as_str(),
                event.occurred_at,
                event.logged_at,
                payload,
            ],
        )?;
        Ok(())
    }

    /// Get a single event row by ID.
    pub fn get_by_id(conn: &Connection, event_id: &str) -> Result<Option<EventRow>> {
        let row = conn
            .query_row(
                &format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1"),
                params![event_id],
                Self::map_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Fetch events of the given kinds for an account, in log order.
    ///
    /// Returns at most `opts.limit` rows with `logged_at > opts.after_logged_at`,
    /// ordered by `(logged_at, id)`.
    pub fn fetch_for_aggregation(
        conn: &Connection,
        account_id: &str,
        kinds: &[EventKind],
        opts: &FetchOptions,
    ) -> Result<Vec<EventRow>> {
        if kinds.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders: Vec<String> = (3..=kinds.len() + 2).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM events
             WHERE account_id = ?1 AND logged_at > ?2 AND kind IN ({})
             ORDER BY logged_at ASC, id ASC LIMIT {}",
            placeholders.join(", "),
            opts.limit
        );

        let mut stmt = conn.prepare(&sql)?;
        let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
        params.push(Box::new(account_id.to_string()));
        params.push(Box::new(opts.after_logged_at));
        for kind in kinds {
            params.push(Box::new(kind.as_str().to_string()));
        }
        let params_refs: Vec<&dyn rusqlite::types::ToSql> =
            params.iter().map(Box::as_ref).collect();

        let rows = stmt
            .query_map(params_refs.as_slice(), Self::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Whether any event of the given kinds exists past the cursor.
    ///
    /// Cheaper than a fetch; the aggregation loop short-circuits on `false`.
    pub fn exists_after(
        conn: &Connection,
        account_id: &str,
        kinds: &[EventKind],
        after_logged_at: i64,
    ) -> Result<bool> {
        if kinds.is_empty() {
            return Ok(false);
        }

        let placeholders: Vec<String> = (3..=kinds.len() + 2).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM events
             WHERE account_id = ?1 AND logged_at > ?2 AND kind IN ({}))",
            placeholders.join(", ")
        );

        let mut stmt = conn.prepare(&sql)?;
        let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
        params.push(Box::new(account_id.to_string()));
        params.push(Box::new(after_logged_at));
        for kind in kinds {
            params.push(Box::new(kind.as_str().to_string()));
        }
        let params_refs: Vec<&dyn rusqlite::types::ToSql> =
            params.iter().map(Box::as_ref).collect();

        let exists: bool = stmt.query_row(params_refs.as_slice(), |row| row.get(0))?;
        Ok(exists)
    }

    /// All account IDs present in the event log, sorted.
    pub fn distinct_account_ids(conn: &Connection) -> Result<Vec<String>> {
        let mut stmt =
            conn.prepare("SELECT DISTINCT account_id FROM events ORDER BY account_id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    /// Count events for an account.
    pub fn count_by_account(conn: &Connection, account_id: &str) -> Result<i64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM events WHERE account_id = ?1",
            params![account_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EventRow> {
        Ok(EventRow {
            id: row.get(0)?,
            account_id: row.get(1)?,
            user_id: row.get(2)?,
            kind: row.get(3)?,
            occurred_at: row.get(4)?,
            logged_at: row.get(5)?,
            payload: row.get(6)?,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(unused_results)]
mod tests {
    use super::*;
    use crate::sqlite::migrations::run_migrations;
    use pulse_core::{EventData, ItemChurnPayload};

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA foreign_keys = ON;")
            .unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    fn churn_event(id: &str, account: &str, kind: EventKind, logged_at: i64) -> Event {
        let payload = ItemChurnPayload {
            item_id: format!("item-{id}"),
            item_kind: "binder".into(),
            item_title: format!("Item {id}"),
        };
        let data = match kind {
            EventKind::ItemCreated => EventData::ItemCreated(payload),
            EventKind::ItemDeleted => EventData::ItemDeleted(payload),
            EventKind::ItemHardDeleted => EventData::ItemHardDeleted(payload),
            other => panic!("not a churn kind: {other}"),
        };
        Event {
            id: id.to_string(),
            account_id: account.to_string(),
            user_id: Some("user-1".into()),
            occurred_at: logged_at - 50,
            logged_at,
            data,
        }
    }

    #[test]
    fn insert_and_get() {
        let conn = setup();
        let event = churn_event("evt-1", "acct-1", EventKind::ItemCreated, 1_000);
        EventRepo::insert(&conn, &event).unwrap();

        let row = EventRepo::get_by_id(&conn, "evt-1").unwrap().unwrap();
        assert_eq!(row.kind, "item.created");
        assert_eq!(row.logged_at, 1_000);
        let back = row.into_event().unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn fetch_respects_cursor_and_limit() {
        let conn = setup();
        for i in 1..=5 {
            let event = churn_event(
                &format!("evt-{i}"),
                "acct-1",
                EventKind::ItemCreated,
                i * 100,
            );
            EventRepo::insert(&conn, &event).unwrap();
        }

        let rows = EventRepo::fetch_for_aggregation(
            &conn,
            "acct-1",
            &[EventKind::ItemCreated],
            &FetchOptions {
                after_logged_at: 200,
                limit: 2,
            },
        )
        .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].logged_at, 300);
        assert_eq!(rows[1].logged_at, 400);
    }

    #[test]
    fn fetch_filters_by_kind() {
        let conn = setup();
        EventRepo::insert(
            &conn,
            &churn_event("evt-1", "acct-1", EventKind::ItemCreated, 100),
        )
        .unwrap();
        EventRepo::insert(
            &conn,
            &churn_event("evt-2", "acct-1", EventKind::ItemDeleted, 200),
        )
        .unwrap();

        let rows = EventRepo::fetch_for_aggregation(
            &conn,
            "acct-1",
            &[EventKind::ItemDeleted],
            &FetchOptions {
                after_logged_at: 0,
                limit: 10,
            },
        )
        .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "evt-2");
    }

    #[test]
    fn fetch_is_scoped_to_account() {
        let conn = setup();
        EventRepo::insert(
            &conn,
            &churn_event("evt-1", "acct-1", EventKind::ItemCreated, 100),
        )
        .unwrap();
        EventRepo::insert(
            &conn,
            &churn_event("evt-2", "acct-2", EventKind::ItemCreated, 100),
        )
        .unwrap();

        let rows = EventRepo::fetch_for_aggregation(
            &conn,
            "acct-2",
            &[EventKind::ItemCreated],
            &FetchOptions {
                after_logged_at: 0,
                limit: 10,
            },
        )
        .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "evt-2");
    }

    #[test]
    fn fetch_breaks_logged_at_ties_by_id() {
        let conn = setup();
        EventRepo::insert(
            &conn,
            &churn_event("evt-b", "acct-1", EventKind::ItemCreated, 100),
        )
        .unwrap();
        EventRepo::insert(
            &conn,
            &churn_event("evt-a", "acct-1", EventKind::ItemCreated, 100),
        )
        .unwrap();

        let rows = EventRepo::fetch_for_aggregation(
            &conn,
            "acct-1",
            &[EventKind::ItemCreated],
            &FetchOptions {
                after_logged_at: 0,
                limit: 10,
            },
        )
        .unwrap();
        assert_eq!(rows[0].id, "evt-a");
        assert_eq!(rows[1].id, "evt-b");
    }

    #[test]
    fn exists_after_cursor() {
        let conn = setup();
        EventRepo::insert(
            &conn,
            &churn_event("evt-1", "acct-1", EventKind::ItemCreated, 100),
        )
        .unwrap();

        assert!(EventRepo::exists_after(&conn, "acct-1", &[EventKind::ItemCreated], 0).unwrap());
        assert!(!EventRepo::exists_after(&conn, "acct-1", &[EventKind::ItemCreated], 100).unwrap());
        assert!(!EventRepo::exists_after(&conn, "acct-1", &[EventKind::ItemDeleted], 0).unwrap());
    }

    #[test]
    fn distinct_account_ids_sorted() {
        let conn = setup();
        EventRepo::insert(
            &conn,
            &churn_event("evt-1", "acct-b", EventKind::ItemCreated, 100),
        )
        .unwrap();
        EventRepo::insert(
            &conn,
            &churn_event("evt-2", "acct-a", EventKind::ItemCreated, 200),
        )
        .unwrap();
        EventRepo::insert(
            &conn,
            &churn_event("evt-3", "acct-a", EventKind::ItemCreated, 300),
        )
        .unwrap();

        let ids = EventRepo::distinct_account_ids(&conn).unwrap();
        assert_eq!(ids, vec!["acct-a".to_string(), "acct-b".to_string()]);
    }

    #[test]
    fn empty_kind_list_fetches_nothing() {
        let conn = setup();
        let rows = EventRepo::fetch_for_aggregation(
            &conn,
            "acct-1",
            &[],
            &FetchOptions {
                after_logged_at: 0,
                limit: 10,
            },
        )
        .unwrap();
        assert!(rows.is_empty());
        assert!(!EventRepo::exists_after(&conn, "acct-1", &[], 0).unwrap());
    }
}
