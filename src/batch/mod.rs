//! Batch CSV analysis
//!
//! Turns an uploaded CSV file into aggregate and per-item results with a
//! single request to the batch endpoint.
//!
//! - **parser**: extracts the `texto` column
//! - **progress**: phase definitions and the cosmetic progress reporter
//! - **result**: batch results with client-side percentage recomputation
//! - **pipeline**: the five-phase run
//! - **export**: CSV and JSON downloads of a result
//!
//! # Flow
//!
//! ```text
//! Reading (0-20%) -> Preparing (20-30%) -> Submitting (30-70%)
//!   -> Processing (70-90%) -> Finalizing (90-100%)
//! ```

mod export;
mod parser;
mod pipeline;
mod progress;
mod result;

pub use export::{to_csv, to_json, CSV_HEADER};
pub use parser::{CsvError, CsvTextParser, TEXT_COLUMN};
pub use pipeline::{ensure_csv_extension, BatchConfig, BatchPipeline, PipelineState};
pub use progress::{BatchPhase, NoopProgress, ProgressReporter, TracingProgress};
pub use result::{positive_percent, BatchItem, BatchResult};
