//! # pulse-events
//!
//! `SQLite` persistence for the usage-tracking aggregation engine: the raw
//! event log, per-(account, aggregator) cursors, and the user action store
//! with its idempotent upsert.
//!
//! Layout follows the repository pattern: stateless repo structs take a
//! `&Connection`; the high-level [`TrackingStore`] wraps a pool and runs
//! every write inside a transaction.

#![deny(unsafe_code)]

pub mod errors;
pub mod hierarchy;
pub mod source;
pub mod sqlite;
pub mod store;

pub use errors::{Result, StoreError};
pub use hierarchy::{FlatHierarchy, HierarchyLookup, StaticHierarchy};
pub use source::EventSource;
pub use sqlite::connection::{ConnectionConfig, ConnectionPool};
pub use store::tracking_store::{ActionFilter, NewEvent, OutcomeCounts, TrackingStore};
