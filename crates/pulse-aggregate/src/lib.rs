//! # pulse-aggregate
//!
//! The aggregation engine: folds raw interaction events into interval-based
//! user actions, resumably and idempotently.
//!
//! Work is partitioned into independent (account, aggregator) pairs, each
//! with its own cursor. The [`merger`] is pure; the [`coordinator`] wires it
//! to storage and isolates per-pair faults into report entries; the
//! [`service`] facade is the public surface.

#![deny(unsafe_code)]

pub mod coordinator;
pub mod errors;
pub mod lease;
pub mod merger;
pub mod report;
pub mod service;

pub use coordinator::{
    AggregateOptions, AggregationConfig, AggregationEngine, EngineDeps, RangeOverride,
};
pub use errors::{AggregateError, Result};
pub use merger::{merge_events, MergeOutcome};
pub use report::{AccountAggregationReport, AggregationReport, AggregatorReportBody, RangeUsed};
pub use service::{FindUserActionsFilter, TrackingService};
