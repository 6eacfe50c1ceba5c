//! # Sentilens
//!
//! Client toolkit for a remote sentiment-analysis REST service: single-text
//! classification, threshold comparison, word-level explanations and CSV
//! batch runs, with a bounded in-memory session history.
//!
//! ## Modules
//!
//! - [`analysis`]: sentiment labels, confidence buckets, validation, explanations
//! - [`client`]: the [`SentimentApi`] seam and its HTTP implementation
//! - [`session`]: bounded analysis history and derived statistics
//! - [`batch`]: CSV parsing, the five-phase batch pipeline and exports
//! - [`service`]: the facade tying them together, with in-flight guards
//! - [`presenter`]: display-ready view models
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sentilens::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//!     let client = SentimentClient::new(ClientConfig::default())?;
//!     let service = SentimentService::new(Arc::new(client), ServiceConfig::default());
//!
//!     let record = service.analyze_default("I love this product").await?;
//!     println!("{}", AnalysisView::from(&record));
//!
//!     let batch = service
//!         .run_batch_file("comments.csv".as_ref(), None, &TracingProgress)
//!         .await?;
//!     println!("{}", BatchView::from(&batch));
//!
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod batch;
pub mod client;
pub mod config;
pub mod error;
pub mod presenter;
pub mod service;
pub mod session;

// Re-export top-level types for convenience
pub use analysis::{
    confidence_level, AnalysisRecord, AnalysisSettings, Comparison, Explanation, Sentiment,
};

pub use batch::{
    BatchConfig, BatchPhase, BatchPipeline, BatchResult, CsvError, CsvTextParser, NoopProgress,
    ProgressReporter, TracingProgress,
};

pub use client::{ClientConfig, ClientError, SentimentApi, SentimentClient};

pub use config::{Config, ConfigError, LoggingConfig};

pub use error::{Error, ErrorKind, Result, ValidationError};

pub use presenter::{
    AnalysisView, BatchView, ComparisonView, ExplanationView, HistoryView, StatisticsView, Tone,
};

pub use service::{Operation, SentimentService, ServiceConfig};

pub use session::{SessionStatistics, SessionStore};
