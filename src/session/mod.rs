//! Session state
//!
//! Bounded, process-local history of single-text analyses together with
//! statistics derived from it. Nothing here is persisted.

mod store;

pub use store::{SessionStatistics, SessionStore, DEFAULT_HISTORY_CAPACITY};
