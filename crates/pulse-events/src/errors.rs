//! Error types for the persistence layer.
//!
//! [`StoreError`] is the primary error type returned by all store
//! operations, with specific variants for the common failure modes.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// `SQLite` database error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Connection pool error.
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// JSON serialization/deserialization error.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Schema migration failed.
    #[error("migration error: {message}")]
    Migration {
        /// Describes which migration failed and why.
        message: String,
    },

    /// A persisted event payload could not be decoded for its kind.
    #[error("malformed payload on event {event_id}: {message}")]
    MalformedPayload {
        /// ID of the offending event.
        event_id: String,
        /// Decode failure detail.
        message: String,
    },

    /// A persisted row referenced an unknown kind discriminator.
    #[error("unknown kind in column: {0}")]
    UnknownKind(String),

    /// Internal error (e.g. poisoned lock).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Convenience type alias for store results.
pub type Result<T> = std::result::Result<T, StoreError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_error_display() {
        let err = StoreError::Sqlite(rusqlite::Error::QueryReturnedNoRows);
        assert!(err.to_string().contains("sqlite error"));
    }

    #[test]
    fn malformed_payload_display() {
        let err = StoreError::MalformedPayload {
            event_id: "evt-1".into(),
            message: "missing field `sessionId`".into(),
        };
        assert_eq!(
            err.to_string(),
            "malformed payload on event evt-1: missing field `sessionId`"
        );
    }

    #[test]
    fn from_rusqlite_error() {
        let err: StoreError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, StoreError::Sqlite(_)));
    }

    #[test]
    fn from_serde_error() {
        let serde_err = serde_json::from_str::<String>("bad").unwrap_err();
        let err: StoreError = serde_err.into();
        assert!(matches!(err, StoreError::Serde(_)));
    }

    #[test]
    fn unknown_kind_display() {
        let err = StoreError::UnknownKind("item.rotated".into());
        assert_eq!(err.to_string(), "unknown kind in column: item.rotated");
    }
}
