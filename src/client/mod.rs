//! Sentiment API client
//!
//! Talks to the remote sentiment-analysis service.
//!
//! ## Endpoints
//!
//! - `POST /sentiment`: classify one text at a threshold
//! - `POST /sentiment/explain`: classify and rank influential words
//! - `POST /sentiment/batch`: classify a list of texts in one request
//!
//! [`SentimentApi`] is the seam the rest of the crate depends on;
//! [`SentimentClient`] is its HTTP implementation.

mod dto;
mod http;

pub use dto::{
    AnalyzeRequest, AnalyzeResponse, BatchItemResponse, BatchRequest, BatchResponse, ErrorBody,
    ExplainRequest, ExplainResponse, ImportantWord,
};
pub use http::{ClientConfig, ClientError, SentimentClient};

use async_trait::async_trait;

/// Operations offered by the remote sentiment service
#[async_trait]
pub trait SentimentApi: Send + Sync {
    /// Classify a single text
    async fn analyze(&self, request: &AnalyzeRequest) -> Result<AnalyzeResponse, ClientError>;

    /// Classify a text and report the words that drove the decision
    async fn explain(&self, request: &ExplainRequest) -> Result<ExplainResponse, ClientError>;

    /// Classify every text of a batch in one round trip
    ///
    /// Returns the undecoded JSON body, shaped like [`BatchResponse`].
    /// Decoding belongs to the caller's processing step.
    async fn analyze_batch(&self, request: &BatchRequest) -> Result<String, ClientError>;
}
