//! User action repository — the aggregated output store.
//!
//! Actions are keyed by their deterministic idempotency key, so writing is
//! always an upsert: a replayed aggregation run lands on the same key and
//! extends the row instead of duplicating it. `end_ts` only ever moves
//! forward.

use pulse_core::{UserAction, UserActionKind};
use rusqlite::{params, Connection, OptionalExtension};

use crate::errors::Result;
use crate::sqlite::row_types::UserActionRow;

const ACTION_COLUMNS: &str = "key, account_id, kind, user_id, item_id, start_ts, end_ts, payload";

/// Whether an upsert created a new row or extended an existing one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// A new action row was inserted.
    Inserted,
    /// An existing row was extended in place.
    Extended,
}

/// User action repository — stateless, every method takes `&Connection`.
pub struct UserActionRepo;

impl UserActionRepo {
    /// Insert or extend the action identified by its idempotency key.
    ///
    /// On conflict the payload is replaced and `end_ts` is pushed forward,
    /// never back. `start_ts` is immutable (it participates in the key).
    pub fn upsert(conn: &Connection, action: &UserAction) -> Result<UpsertOutcome> {
        let key = action.idempotency_key();
        let existed: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM user_actions WHERE key = ?1)",
            params![key],
            |row| row.get(0),
        )?;

        let payload = action.data.payload_json()?;
        let _ = conn.execute(
            "INSERT INTO user_actions (key, account_id, kind, user_id, item_id, start_ts, end_ts, payload)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(key) DO UPDATE SET
               end_ts = MAX(user_actions.end_ts, excluded.end_ts),
               user_id = COALESCE(excluded.user_id, user_actions.user_id),
               payload = excluded.payload",
            params![
                key,
                action.account_id,
                action.kind.as_str(),
                action.user_id,
                action.data.item_id(),
                action.start,
                action.end,
                payload,
            ],
        )?;

        Ok(if existed {
            UpsertOutcome::Extended
        } else {
            UpsertOutcome::Inserted
        })
    }

    /// Get an action row by idempotency key.
    pub fn get_by_key(conn: &Connection, key: &str) -> Result<Option<UserActionRow>> {
        let row = conn
            .query_row(
                &format!("SELECT {ACTION_COLUMNS} FROM user_actions WHERE key = ?1"),
                params![key],
                Self::map_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Find actions for an account, optionally filtered by kind, interval
    /// overlap, and item IDs. Ordered by `(start_ts, key)`.
    ///
    /// The interval filter matches any action whose `[start_ts, end_ts]`
    /// overlaps `[from, to]`.
    pub fn find(
        conn: &Connection,
        account_id: &str,
        kinds: &[UserActionKind],
        from: Option<i64>,
        to: Option<i64>,
        item_ids: Option<&[String]>,
    ) -> Result<Vec<UserActionRow>> {
        let mut sql = format!("SELECT {ACTION_COLUMNS} FROM user_actions WHERE account_id = ?1");
        let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
        params.push(Box::new(account_id.to_string()));

        if !kinds.is_empty() {
            let placeholders: Vec<String> = kinds
                .iter()
                .map(|kind| {
                    params.push(Box::new(kind.as_str().to_string()));
                    format!("?{}", params.len())
                })
                .collect();
            sql.push_str(&format!(" AND kind IN ({})", placeholders.join(", ")));
        }
        if let Some(from) = from {
            params.push(Box::new(from));
            sql.push_str(&format!(" AND end_ts >= ?{}", params.len()));
        }
        if let Some(to) = to {
            params.push(Box::new(to));
            sql.push_str(&format!(" AND start_ts <= ?{}", params.len()));
        }
        if let Some(item_ids) = item_ids {
            if item_ids.is_empty() {
                return Ok(Vec::new());
            }
            let placeholders: Vec<String> = item_ids
                .iter()
                .map(|id| {
                    params.push(Box::new(id.clone()));
                    format!("?{}", params.len())
                })
                .collect();
            sql.push_str(&format!(" AND item_id IN ({})", placeholders.join(", ")));
        }
        sql.push_str(" ORDER BY start_ts ASC, key ASC");

        let mut stmt = conn.prepare(&sql)?;
        let params_refs: Vec<&dyn rusqlite::types::ToSql> =
            params.iter().map(Box::as_ref).collect();
        let rows = stmt
            .query_map(params_refs.as_slice(), Self::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Count actions of a kind for an account.
    pub fn count_by_kind(
        conn: &Connection,
        account_id: &str,
        kind: UserActionKind,
    ) -> Result<i64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM user_actions WHERE account_id = ?1 AND kind = ?2",
            params![account_id, kind.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserActionRow> {
        Ok(UserActionRow {
            key: row.get(0)?,
            account_id: row.get(1)?,
            kind: row.get(2)?,
            user_id: row.get(3)?,
            item_id: row.get(4)?,
            start_ts: row.get(5)?,
            end_ts: row.get(6)?,
            payload: row.get(7)?,
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
    use pulse_core::{ActionData, EditPayload, ItemChurnPayload};

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA foreign_keys = ON;")
            .unwrap();
        run_migrations(&conn).unwrap();
        conn
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

    fn churn_action(account: &str, item: &str, start: i64) -> UserAction {
        UserAction {
            account_id: account.to_string(),
            kind: UserActionKind::ItemCreated,
            user_id: None,
            start,
            end: start,
            data: ActionData::ItemChurn(ItemChurnPayload {
                item_id: item.to_string(),
                item_kind: "binder".into(),
                item_title: format!("Item {item}"),
            }),
        }
    }

    #[test]
    fn upsert_inserts_then_extends() {
        let conn = setup();
        let action = edit_action("acct-1", "sess-1", 1_000, 2_000);
        assert_eq!(
            UserActionRepo::upsert(&conn, &action).unwrap(),
            UpsertOutcome::Inserted
        );

        let mut extended = action.clone();
        extended.end = 5_000;
        assert_eq!(
            UserActionRepo::upsert(&conn, &extended).unwrap(),
            UpsertOutcome::Extended
        );

        let row = UserActionRepo::get_by_key(&conn, &action.idempotency_key())
            .unwrap()
            .unwrap();
        assert_eq!(row.start_ts, 1_000);
        assert_eq!(row.end_ts, 5_000);
        assert_eq!(UserActionRepo::count_by_kind(&conn, "acct-1", UserActionKind::ItemEdited).unwrap(), 1);
    }

    #[test]
    fn upsert_never_moves_end_backward() {
        let conn = setup();
        let action = edit_action("acct-1", "sess-1", 1_000, 5_000);
        UserActionRepo::upsert(&conn, &action).unwrap();

        let mut stale = action.clone();
        stale.end = 2_000;
        UserActionRepo::upsert(&conn, &stale).unwrap();

        let row = UserActionRepo::get_by_key(&conn, &action.idempotency_key())
            .unwrap()
            .unwrap();
        assert_eq!(row.end_ts, 5_000);
    }

    #[test]
    fn upsert_replay_is_noop() {
        let conn = setup();
        let action = churn_action("acct-1", "item-1", 1_000);
        UserActionRepo::upsert(&conn, &action).unwrap();
        UserActionRepo::upsert(&conn, &action).unwrap();
        assert_eq!(
            UserActionRepo::count_by_kind(&conn, "acct-1", UserActionKind::ItemCreated).unwrap(),
            1
        );
    }

    #[test]
    fn find_filters_by_kind_and_interval_overlap() {
        let conn = setup();
        UserActionRepo::upsert(&conn, &churn_action("acct-1", "item-1", 1_000)).unwrap();
        UserActionRepo::upsert(&conn, &edit_action("acct-1", "sess-1", 2_000, 6_000)).unwrap();
        UserActionRepo::upsert(&conn, &edit_action("acct-1", "sess-2", 10_000, 12_000)).unwrap();

        let rows = UserActionRepo::find(
            &conn,
            "acct-1",
            &[UserActionKind::ItemEdited],
            Some(5_000),
            Some(8_000),
            None,
        )
        .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].start_ts, 2_000);
    }

    #[test]
    fn find_filters_by_item_ids() {
        let conn = setup();
        UserActionRepo::upsert(&conn, &churn_action("acct-1", "item-1", 1_000)).unwrap();
        UserActionRepo::upsert(&conn, &churn_action("acct-1", "item-2", 2_000)).unwrap();

        let wanted = vec!["item-2".to_string()];
        let rows =
            UserActionRepo::find(&conn, "acct-1", &[], None, None, Some(&wanted)).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].item_id.as_deref(), Some("item-2"));

        let empty: Vec<String> = Vec::new();
        let rows = UserActionRepo::find(&conn, "acct-1", &[], None, None, Some(&empty)).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn find_is_scoped_to_account() {
        let conn = setup();
        UserActionRepo::upsert(&conn, &churn_action("acct-1", "item-1", 1_000)).unwrap();
        UserActionRepo::upsert(&conn, &churn_action("acct-2", "item-1", 1_000)).unwrap();

        let rows = UserActionRepo::find(&conn, "acct-1", &[], None, None, None).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].account_id, "acct-1");
    }
}
