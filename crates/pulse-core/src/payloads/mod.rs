//! Typed event and action payloads.
//!
//! Each raw event kind carries exactly one payload struct; the closed
//! [`EventData`](crate::event::EventData) union ties kinds to payloads so
//! merge-key extraction is exhaustive and compiler-checked.

pub mod edit;
pub mod item;
pub mod read;

pub use edit::EditPayload;
pub use item::ItemChurnPayload;
pub use read::{ChunkBrowsedPayload, ChunkTiming, FocusChangePayload, ReadPayload};
