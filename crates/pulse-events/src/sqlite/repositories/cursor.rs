//! Cursor repository — resumable aggregation positions.
//!
//! One cursor per (account, aggregator) pair. `last_event_ts` is the
//! `logged_at` of the newest event consumed; `last_aggregation_at` is the
//! wall-clock time of the run that advanced it.

use pulse_core::AggregatorKind;
use rusqlite::{params, Connection, OptionalExtension};

use crate::errors::{Result, StoreError};
use crate::sqlite::row_types::CursorRow;

/// Cursor repository — stateless, every method takes `&Connection`.
pub struct CursorRepo;

impl CursorRepo {
    /// Get the cursor for a pair, if one has ever been written.
    pub fn get(
        conn: &Connection,
        account_id: &str,
        aggregator: AggregatorKind,
    ) -> Result<Option<CursorRow>> {
        let row = conn
            .query_row(
                "SELECT account_id, aggregator, last_event_ts, last_aggregation_at
                 FROM aggregator_cursors WHERE account_id = ?1 AND aggregator = ?2",
                params![account_id, aggregator.as_str()],
                Self::map_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Insert or advance the cursor for a pair.
    ///
    /// `last_event_ts` never moves backwards: a limited backfill commits the
    /// old log position it replayed up to, and rewinding the resume point
    /// would make every later run re-report already-aggregated events.
    /// Replays are driven by the caller's range override, not the cursor.
    pub fn upsert(conn: &Connection, cursor: &CursorRow) -> Result<()> {
        let _ = conn.execute(
            "INSERT INTO aggregator_cursors (account_id, aggregator, last_event_ts, last_aggregation_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(account_id, aggregator) DO UPDATE SET
               last_event_ts = MAX(aggregator_cursors.last_event_ts, excluded.last_event_ts),
               last_aggregation_at = excluded.last_aggregation_at",
            params![
                cursor.account_id,
                cursor.aggregator.as_str(),
                cursor.last_event_ts,
                cursor.last_aggregation_at,
            ],
        )?;
        Ok(())
    }

    /// All cursors for an account, ordered by aggregator.
    pub fn list_for_account(conn: &Connection, account_id: &str) -> Result<Vec<CursorRow>> {
        let mut stmt = conn.prepare(
            "SELECT account_id, aggregator, last_event_ts, last_aggregation_at
             FROM aggregator_cursors WHERE account_id = ?1 ORDER BY aggregator",
        )?;
        let rows = stmt
            .query_map(params![account_id], Self::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// The most recent `last_aggregation_at` across an account's cursors.
    pub fn last_aggregation_at(conn: &Connection, account_id: &str) -> Result<Option<i64>> {
        let ts: Option<i64> = conn
            .query_row(
                "SELECT MAX(last_aggregation_at) FROM aggregator_cursors WHERE account_id = ?1",
                params![account_id],
                |row| row.get(0),
            )
            .optional()?
            .flatten();
        Ok(ts)
    }

    /// Delete the cursor for a pair. Returns whether one existed.
    ///
    /// Used by backfill: removing the cursor re-aggregates the pair from
    /// the beginning of the log (idempotent upserts make the replay safe).
    pub fn delete(
        conn: &Connection,
        account_id: &str,
        aggregator: AggregatorKind,
    ) -> Result<bool> {
        let changed = conn.execute(
            "DELETE FROM aggregator_cursors WHERE account_id = ?1 AND aggregator = ?2",
            params![account_id, aggregator.as_str()],
        )?;
        Ok(changed > 0)
    }

    fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CursorRow> {
        let aggregator_str: String = row.get(1)?;
        let aggregator = aggregator_str.parse().map_err(|_| {
            rusqlite::Error::FromSqlConversionFailure(
                1,
                rusqlite::types::Type::Text,
                Box::new(StoreError::UnknownKind(aggregator_str)),
            )
        })?;
        Ok(CursorRow {
            account_id: row.get(0)?,
            aggregator,
            last_event_ts: row.get(2)?,
            last_aggregation_at: row.get(3)?,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
