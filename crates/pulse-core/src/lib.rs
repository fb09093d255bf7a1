//! # pulse-core
//!
//! Domain types for the usage-tracking aggregation engine: raw interaction
//! events, the closed payload unions behind them, aggregated user actions,
//! and the aggregator kind catalogue.
//!
//! Everything here is pure data — persistence lives in `pulse-events` and
//! the aggregation pipeline in `pulse-aggregate`.

#![deny(unsafe_code)]

pub mod action;
pub mod action_kind;
pub mod aggregator;
pub mod event;
pub mod event_kind;
pub mod payloads;

pub use action::{ActionData, ReadActionPayload, UserAction};
pub use action_kind::{UserActionKind, ALL_USER_ACTION_KINDS};
pub use aggregator::{AggregatorKind, AggregatorMode, ALL_AGGREGATOR_KINDS};
pub use event::{Event, EventData};
pub use event_kind::{EventKind, ALL_EVENT_KINDS};
pub use payloads::{
    ChunkBrowsedPayload, ChunkTiming, EditPayload, FocusChangePayload, ItemChurnPayload,
    ReadPayload,
};
