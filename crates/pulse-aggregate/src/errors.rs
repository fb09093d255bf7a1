//! Error types for the aggregation engine.
//!
//! Only caller mistakes surface as errors from the top-level entry points;
//! per-pair runtime failures are captured inside the report instead.

use pulse_events::StoreError;
use thiserror::Error;

/// Errors that can occur in the aggregation layer.
#[derive(Debug, Error)]
pub enum AggregateError {
    /// The caller passed arguments that can never be valid.
    #[error("usage error: {0}")]
    Usage(String),

    /// Underlying storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Convenience type alias for aggregation results.
pub type Result<T> = std::result::Result<T, AggregateError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
