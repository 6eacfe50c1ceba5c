//! Analysis domain
//!
//! Core types shared by every operation:
//!
//! - **types**: sentiment labels, confidence buckets, history records
//! - **validation**: input checks performed before any request
//! - **explain**: word-importance ranking and highlighting

mod explain;
mod types;
mod validation;

pub use explain::{highlight_spans, importance_percent, Explanation, TextSpan, WordImportance};
pub use types::{
    confidence_level, format_percent, AnalysisRecord, AnalysisSettings, Comparison,
    ConfidenceLevel, Sentiment, ThresholdResult, COMPARISON_THRESHOLDS,
};
pub use validation::{
    validate_comparison_text, validate_text, validate_threshold, MAX_TEXT_CHARS, MIN_TEXT_CHARS,
};
