//! Sentiment Service
//!
//! Single entry point for every user-facing operation: single analysis,
//! threshold comparison, explanation and batch runs. Owns the session
//! history and the in-flight guards.

mod guard;
mod sentiment;

pub use guard::{InFlight, InFlightGuard, Operation};
pub use sentiment::{SentimentService, ServiceConfig};
