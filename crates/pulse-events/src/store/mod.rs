//! High-level transactional store API.

pub mod tracking_store;

pub use tracking_store::{ActionFilter, NewEvent, OutcomeCounts, TrackingStore};
