//! Aggregation report types.
//!
//! A report is data, never an error: per-pair failures land in the
//! `exception` field of the pair's body and the run keeps going. The sweep
//! binary turns [`AggregationReport::has_exceptions`] into its exit code.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use pulse_core::AggregatorKind;

/// The log-time range a pair actually consumed during one run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeUsed {
    /// Exclusive lower bound (`logged_at` cursor before the run).
    pub range_start: i64,
    /// Inclusive upper bound (`logged_at` of the last event consumed).
    pub range_end: i64,
}

/// Per-(account, aggregator) outcome of one aggregation run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatorReportBody {
    /// Actions newly created.
    pub to_add_count: u64,
    /// Previously persisted actions extended or closed.
    pub to_complete_count: u64,
    /// Earliest `start` among the actions written, if any.
    pub oldest: Option<i64>,
    /// Latest `start` among the actions written, if any.
    pub newest: Option<i64>,
    /// `logged_at` of the last event consumed (the new cursor position).
    pub last_event_timestamp: Option<i64>,
    /// Log-time range consumed, when a fetch happened.
    pub range_used: Option<RangeUsed>,
    /// Informational note (e.g. the no-new-events short-circuit).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
    /// Captured failure for this pair, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception: Option<String>,
}

impl AggregatorReportBody {
    /// Fold another run's body into this one (for multi-batch drains).
    ///
    /// Counts add; `oldest`/`newest` widen; the later run wins
    /// `last_event_timestamp`; `range_used` spans both; exceptions and info
    /// keep the first non-empty value.
    pub fn merge(&mut self, other: &Self) {
        self.to_add_count += other.to_add_count;
        self.to_complete_count += other.to_complete_count;
        self.oldest = min_opt(self.oldest, other.oldest);
        self.newest = max_opt(self.newest, other.newest);
        if other.last_event_timestamp.is_some() {
            self.last_event_timestamp = other.last_event_timestamp;
        }
        self.range_used = match (self.range_used, other.range_used) {
            (Some(a), Some(b)) => Some(RangeUsed {
                range_start: a.range_start.min(b.range_start),
                range_end: a.range_end.max(b.range_end),
            }),
            (a, b) => a.or(b),
        };
        if self.info.is_none() {
            self.info.clone_from(&other.info);
        }
        if self.exception.is_none() {
            self.exception.clone_from(&other.exception);
        }
    }
}

fn min_opt(a: Option<i64>, b: Option<i64>) -> Option<i64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

fn max_opt(a: Option<i64>, b: Option<i64>) -> Option<i64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

/// Per-account report: one body per aggregator, plus an account-level
/// exception for failures outside any single pair.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountAggregationReport {
    /// Bodies keyed by aggregator.
    pub aggregator_reports: BTreeMap<AggregatorKind, AggregatorReportBody>,
    /// Account-level failure, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception: Option<String>,
}

impl AccountAggregationReport {
    /// Whether any body, or the account itself, carries an exception.
    #[must_use]
    pub fn has_exceptions(&self) -> bool {
        self.exception.is_some()
            || self
                .aggregator_reports
                .values()
                .any(|body| body.exception.is_some())
    }
}

/// Full report of one aggregation call, keyed by account ID.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregationReport(pub BTreeMap<String, AccountAggregationReport>);

impl AggregationReport {
    /// The mutable per-account entry, created on first touch.
    pub fn account_mut(&mut self, account_id: &str) -> &mut AccountAggregationReport {
        self.0.entry(account_id.to_string()).or_default()
    }

    /// Whether any account carries an exception.
    #[must_use]
    pub fn has_exceptions(&self) -> bool {
        self.0.values().any(AccountAggregationReport::has_exceptions)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
