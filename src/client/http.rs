//! Sentiment REST API client over HTTP
//!
//! HTTP client for communicating with the sentiment service.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use super::dto::{
    AnalyzeRequest, AnalyzeResponse, BatchRequest, ErrorBody, ExplainRequest, ExplainResponse,
};
use super::SentimentApi;

/// Sentiment REST API client
pub struct SentimentClient {
    client: Client,
    config: ClientConfig,
}

/// Configuration for the sentiment client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the sentiment API (e.g., "http://localhost:8080")
    pub base_url: String,
    /// Request timeout in seconds, `0` disables it
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            request_timeout_secs: 60,
        }
    }
}

impl SentimentClient {
    /// Create a new client with the given configuration
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let mut builder =
            Client::builder().user_agent(concat!("sentilens/", env!("CARGO_PKG_VERSION")));
        if config.request_timeout_secs > 0 {
            builder =
                builder.timeout(std::time::Duration::from_secs(config.request_timeout_secs));
        }
        let client = builder.build().map_err(ClientError::Setup)?;

        Ok(Self { client, config })
    }

    /// Get the current configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Absolute URL for an API path
    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Send a JSON POST and decode the JSON answer
    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, ClientError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let body = self.post(path, body).await?;
        serde_json::from_str(&body).map_err(|e| ClientError::Decode(e.to_string()))
    }

    /// Send a JSON POST and return the undecoded success body
    ///
    /// Non-2xx responses become [`ClientError::Api`] carrying the body's
    /// `message` (or `detail`) when one can be extracted.
    async fn post<B>(&self, path: &str, body: &B) -> Result<String, ClientError>
    where
        B: Serialize + ?Sized,
    {
        let url = self.endpoint(path);
        tracing::debug!(url = %url, "Sending request");

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status.is_success() {
            response.text().await.map_err(transport_error)
        } else {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&text)
                .ok()
                .and_then(ErrorBody::into_message);

            tracing::warn!(
                url = %url,
                status = status.as_u16(),
                message = message.as_deref().unwrap_or(""),
                "Sentiment API returned an error"
            );

            Err(ClientError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}

fn transport_error(e: reqwest::Error) -> ClientError {
    if e.is_timeout() {
        ClientError::Timeout
    } else {
        ClientError::Transport(e)
    }
}

#[async_trait]
impl SentimentApi for SentimentClient {
    async fn analyze(&self, request: &AnalyzeRequest) -> Result<AnalyzeResponse, ClientError> {
        self.post_json("/sentiment", request).await
    }

    async fn explain(&self, request: &ExplainRequest) -> Result<ExplainResponse, ClientError> {
        self.post_json("/sentiment/explain", request).await
    }

    async fn analyze_batch(&self, request: &BatchRequest) -> Result<String, ClientError> {
        self.post("/sentiment/batch", request).await
    }
}

// ============================================
// Errors
// ============================================

/// Errors that can occur when communicating with the sentiment API
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Failed to create HTTP client: {0}")]
    Setup(reqwest::Error),

    #[error("Could not connect to the server: {0}")]
    Transport(reqwest::Error),

    #[error("Request timeout")]
    Timeout,

    #[error("{}", api_message(.status, .message))]
    Api { status: u16, message: Option<String> },

    #[error("Invalid response from the server: {0}")]
    Decode(String),
}

fn api_message(status: &u16, message: &Option<String>) -> String {
    match message {
        Some(message) => message.clone(),
        None => format!("Error {}", status),
    }
}
