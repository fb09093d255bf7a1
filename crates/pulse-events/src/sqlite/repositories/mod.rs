//! Stateless repositories — every method takes `&Connection`.

pub mod cursor;
pub mod event;
pub mod user_action;

pub use cursor::CursorRepo;
pub use event::{EventRepo, FetchOptions};
pub use user_action::{UpsertOutcome, UserActionRepo};
