//! Service facade over the sentiment API

use chrono::{DateTime, Utc};
use futures_util::future::try_join_all;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::guard::{InFlight, Operation};
use crate::analysis::{
    confidence_level, validate_comparison_text, validate_text, validate_threshold,
    AnalysisRecord, AnalysisSettings, Comparison, Explanation, ThresholdResult,
    COMPARISON_THRESHOLDS,
};
use crate::batch::{self, BatchConfig, BatchPipeline, BatchResult, ProgressReporter};
use crate::client::{AnalyzeRequest, ExplainRequest, SentimentApi};
use crate::error::{Error, Result, ValidationError};
use crate::session::{SessionStatistics, SessionStore, DEFAULT_HISTORY_CAPACITY};

/// Defaults applied when a caller leaves a setting out
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Language and threshold for single analyses
    pub analysis: AnalysisSettings,
    /// Number of words requested from the explain endpoint
    pub top_n: usize,
    /// Maximum number of analyses kept in the session history
    pub history_capacity: usize,
    pub batch: BatchConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            analysis: AnalysisSettings::default(),
            top_n: 10,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            batch: BatchConfig::default(),
        }
    }
}

/// Runs sentiment operations against a [`SentimentApi`] and keeps the
/// session state they produce
pub struct SentimentService {
    api: Arc<dyn SentimentApi>,
    config: ServiceConfig,
    session: RwLock<SessionStore>,
    pipeline: BatchPipeline,
    analyzing: InFlight,
    comparing: InFlight,
    explaining: InFlight,
    /// Text of the most recent successful analysis
    last_text: RwLock<Option<String>>,
    /// Result of the most recent successful batch run
    last_batch: RwLock<Option<BatchResult>>,
}

impl SentimentService {
    /// Create a new service
    pub fn new(api: Arc<dyn SentimentApi>, config: ServiceConfig) -> Self {
        let pipeline = BatchPipeline::new(Arc::clone(&api), config.batch.clone());
        Self {
            session: RwLock::new(SessionStore::with_capacity(config.history_capacity)),
            pipeline,
            api,
            config,
            analyzing: InFlight::new(Operation::Analyze),
            comparing: InFlight::new(Operation::Compare),
            explaining: InFlight::new(Operation::Explain),
            last_text: RwLock::new(None),
            last_batch: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Whether a call of this kind is currently running
    pub fn is_busy(&self, operation: Operation) -> bool {
        match operation {
            Operation::Analyze => self.analyzing.is_busy(),
            Operation::Compare => self.comparing.is_busy(),
            Operation::Explain => self.explaining.is_busy(),
            Operation::Batch => self.pipeline.state() != batch::PipelineState::Idle,
        }
    }

    // ============================================
    // Single analysis
    // ============================================

    /// Analyze one text with the configured default settings
    pub async fn analyze_default(&self, text: &str) -> Result<AnalysisRecord> {
        let settings = self.config.analysis.clone();
        self.analyze(text, &settings).await
    }

    /// Analyze one text and record the result in the session history
    pub async fn analyze(
        &self,
        text: &str,
        settings: &AnalysisSettings,
    ) -> Result<AnalysisRecord> {
        let _guard = self.analyzing.try_acquire()?;

        let text = validate_text(text)?;
        let threshold = validate_threshold(settings.threshold)?;

        let request = AnalyzeRequest {
            text: text.to_string(),
            language: settings.language.clone(),
            threshold,
        };

        let response = self.api.analyze(&request).await.map_err(|e| {
            tracing::warn!(error = %e, "Analysis request failed");
            Error::from(e)
        })?;

        if let Some(detected) = &response.detected_language {
            tracing::debug!(language = %detected, "Server detected language");
        }

        let recorded_text = if response.text.trim().is_empty() {
            text.to_string()
        } else {
            response.text
        };
        let mut record = AnalysisRecord::new(
            recorded_text,
            response.sentiment,
            response.probability,
            response.confidence,
            settings,
        );
        record.id = self.session.write().await.record(record.clone());
        *self.last_text.write().await = Some(record.text.clone());

        tracing::info!(
            id = record.id,
            sentiment = %record.sentiment,
            probability = record.probability,
            "Text analyzed"
        );

        Ok(record)
    }

    /// Analyze a history entry's text again with its recorded settings
    pub async fn reanalyze(&self, id: i64) -> Result<AnalysisRecord> {
        let (text, settings) = {
            let session = self.session.read().await;
            let record = session
                .get(id)
                .ok_or(ValidationError::UnknownRecord(id))?;
            (record.text.clone(), record.settings())
        };
        self.analyze(&text, &settings).await
    }

    // ============================================
    // Threshold comparison
    // ============================================

    /// Classify one text at each comparison threshold
    ///
    /// The three requests run concurrently; if any fails, the whole
    /// comparison fails. Results are not recorded in the history.
    pub async fn compare(&self, text: &str, language: Option<&str>) -> Result<Comparison> {
        let _guard = self.comparing.try_acquire()?;

        let text = validate_comparison_text(text)?;
        let language = language.unwrap_or(&self.config.analysis.language);

        let calls = COMPARISON_THRESHOLDS.iter().map(|&threshold| {
            let request = AnalyzeRequest {
                text: text.to_string(),
                language: language.to_string(),
                threshold,
            };
            async move {
                let response = self.api.analyze(&request).await?;
                Ok::<_, Error>(ThresholdResult {
                    threshold,
                    sentiment: response.sentiment,
                    probability: response.probability,
                    confidence: response
                        .confidence
                        .filter(|c| !c.trim().is_empty())
                        .unwrap_or_else(|| confidence_level(response.probability).to_string()),
                })
            }
        });

        let results = try_join_all(calls).await.map_err(|e| {
            tracing::warn!(error = %e, "Threshold comparison failed");
            e
        })?;

        tracing::info!(thresholds = results.len(), "Comparison completed");

        Ok(Comparison {
            text: text.to_string(),
            language: language.to_string(),
            results,
        })
    }

    // ============================================
    // Explanation
    // ============================================

    /// Explain a classification
    ///
    /// Without `text`, explains the most recently analyzed text.
    pub async fn explain(
        &self,
        text: Option<&str>,
        language: Option<&str>,
        top_n: Option<usize>,
    ) -> Result<Explanation> {
        let _guard = self.explaining.try_acquire()?;

        let text = match text {
            Some(text) => validate_text(text)?.to_string(),
            None => self
                .last_text
                .read()
                .await
                .clone()
                .ok_or(ValidationError::NothingToExplain)?,
        };

        let request = ExplainRequest {
            text: text.clone(),
            language: language
                .unwrap_or(&self.config.analysis.language)
                .to_string(),
            top_n: top_n.unwrap_or(self.config.top_n),
        };

        let response = self.api.explain(&request).await.map_err(|e| {
            tracing::warn!(error = %e, "Explain request failed");
            Error::from(e)
        })?;

        let explanation = Explanation::from_response(response, &text);
        tracing::info!(words = explanation.words.len(), "Explanation received");

        Ok(explanation)
    }

    /// Text of the most recent successful analysis
    pub async fn last_text(&self) -> Option<String> {
        self.last_text.read().await.clone()
    }

    // ============================================
    // Batch
    // ============================================

    /// Run a batch over a CSV file
    pub async fn run_batch_file(
        &self,
        path: &Path,
        language: Option<&str>,
        progress: &dyn ProgressReporter,
    ) -> Result<BatchResult> {
        let outcome = self.pipeline.run_file(path, language, progress).await;
        self.keep_batch(outcome).await
    }

    /// Run a batch over CSV contents
    pub async fn run_batch_contents(
        &self,
        contents: &str,
        language: Option<&str>,
        progress: &dyn ProgressReporter,
    ) -> Result<BatchResult> {
        let outcome = self.pipeline.run_contents(contents, language, progress).await;
        self.keep_batch(outcome).await
    }

    /// Replace the stored batch result on success, keep the old one otherwise
    async fn keep_batch(&self, outcome: Result<BatchResult>) -> Result<BatchResult> {
        let result = outcome?;
        *self.last_batch.write().await = Some(result.clone());
        Ok(result)
    }

    /// Result of the most recent successful batch run
    pub async fn last_batch(&self) -> Option<BatchResult> {
        self.last_batch.read().await.clone()
    }

    /// Export the last batch result as CSV
    pub async fn export_csv(&self) -> Result<String> {
        let last = self.last_batch.read().await;
        let result = last.as_ref().ok_or(ValidationError::NothingToExport)?;
        batch::to_csv(result)
    }

    /// Export the last batch result as JSON stamped with `generated_at`
    pub async fn export_json(&self, generated_at: DateTime<Utc>) -> Result<String> {
        let last = self.last_batch.read().await;
        let result = last.as_ref().ok_or(ValidationError::NothingToExport)?;
        batch::to_json(result, generated_at)
    }

    // ============================================
    // Session history
    // ============================================

    /// History snapshot, most recent first
    pub async fn history(&self) -> Vec<AnalysisRecord> {
        self.session.read().await.records().cloned().collect()
    }

    pub async fn statistics(&self) -> SessionStatistics {
        self.session.read().await.statistics()
    }

    /// Remove one history entry; returns whether it existed
    pub async fn remove(&self, id: i64) -> bool {
        let removed = self.session.write().await.remove(id);
        tracing::debug!(id, removed, "Remove history entry");
        removed
    }

    pub async fn clear_history(&self) {
        self.session.write().await.clear();
        tracing::debug!("History cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Sentiment;
    use crate::batch::NoopProgress;
    use crate::client::{AnalyzeResponse, BatchRequest, ClientError, ExplainResponse, ImportantWord};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::sync::Notify;

    /// Fake service with a fixed probability of 0.62
    #[derive(Default)]
    struct FakeApi {
        analyze_calls: AtomicUsize,
        thresholds_seen: Mutex<Vec<f64>>,
        fail_at_threshold: Option<f64>,
        fail_explain: bool,
        gate: Option<Arc<Notify>>,
        /// Text echoed back instead of the request's
        echo: Option<String>,
    }

    #[async_trait]
    impl SentimentApi for FakeApi {
        async fn analyze(
            &self,
            request: &AnalyzeRequest,
        ) -> std::result::Result<AnalyzeResponse, ClientError> {
            self.analyze_calls.fetch_add(1, Ordering::SeqCst);
            self.thresholds_seen.lock().unwrap().push(request.threshold);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if self.fail_at_threshold == Some(request.threshold) {
                return Err(ClientError::Api {
                    status: 503,
                    message: Some("Model unavailable".to_string()),
                });
            }

            let probability = 0.62;
            Ok(AnalyzeResponse {
                text: self.echo.clone().unwrap_or_else(|| request.text.clone()),
                sentiment: if probability >= request.threshold {
                    Sentiment::Positive
                } else {
                    Sentiment::Negative
                },
                probability,
                confidence: None,
                detected_language: None,
            })
        }

        async fn explain(
            &self,
            request: &ExplainRequest,
        ) -> std::result::Result<ExplainResponse, ClientError> {
            if self.fail_explain {
                return Err(ClientError::Api {
                    status: 422,
                    message: None,
                });
            }
            Ok(ExplainResponse {
                text: request.text.clone(),
                sentiment: Sentiment::Positive,
                probability: 0.91,
                confidence: None,
                words: vec![
                    ImportantWord {
                        word: Some("hate".to_string()),
                        importance: 0.1,
                    },
                    ImportantWord {
                        word: Some("love".to_string()),
                        importance: 0.9,
                    },
                ],
            })
        }

        async fn analyze_batch(
            &self,
            request: &BatchRequest,
        ) -> std::result::Result<String, ClientError> {
            let results: Vec<_> = request
                .texts
                .iter()
                .map(|text| {
                    let label = if text.contains("love") {
                        "Positivo"
                    } else {
                        "Negativo"
                    };
                    json!({
                        "texto": text,
                        "prevision": label,
                        "probabilidad": 0.7,
                        "confianza": "Media",
                    })
                })
                .collect();
            Ok(json!({ "resultados": results }).to_string())
        }
    }

    fn service(api: FakeApi) -> (Arc<FakeApi>, SentimentService) {
        let api = Arc::new(api);
        let service = SentimentService::new(api.clone(), ServiceConfig::default());
        (api, service)
    }

    #[tokio::test]
    async fn test_analyze_records_history() {
        let (_, service) = service(FakeApi::default());

        let record = service.analyze_default("  I love this  ").await.unwrap();

        assert_eq!(record.text, "I love this");
        assert_eq!(record.sentiment, Sentiment::Positive);
        assert_eq!(record.confidence, "Medium");
        assert_eq!(record.language, "auto");
        assert_eq!(record.threshold, 0.5);

        let history = service.history().await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, record.id);

        let stats = service.statistics().await;
        assert_eq!(stats.total, 1);
        assert_eq!(stats.positive, 1);
        assert_eq!(stats.average_confidence_percent, 62.0);
        assert_eq!(service.last_text().await.as_deref(), Some("I love this"));
    }

    #[tokio::test]
    async fn test_history_keeps_server_echoed_text() {
        let (_, echoing) = service(FakeApi {
            echo: Some("I love this!".to_string()),
            ..FakeApi::default()
        });
        let record = echoing.analyze_default("i love this").await.unwrap();
        assert_eq!(record.text, "I love this!");
        assert_eq!(echoing.history().await[0].text, "I love this!");
        assert_eq!(echoing.last_text().await.as_deref(), Some("I love this!"));

        let (_, blank_echo) = service(FakeApi {
            echo: Some("  ".to_string()),
            ..FakeApi::default()
        });
        let record = blank_echo.analyze_default("  i love this ").await.unwrap();
        assert_eq!(record.text, "i love this");
    }

    #[tokio::test]
    async fn test_invalid_input_never_reaches_the_api() {
        let (api, service) = service(FakeApi::default());

        let err = service.analyze_default("   ").await.unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::EmptyText)));

        let err = service.analyze_default("hi").await.unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::TextTooShort { min: 3 })
        ));

        let long = "a".repeat(5001);
        assert!(service.analyze_default(&long).await.is_err());

        let settings = AnalysisSettings {
            language: "es".to_string(),
            threshold: 1.5,
        };
        assert!(service.analyze("valid text", &settings).await.is_err());

        assert_eq!(api.analyze_calls.load(Ordering::SeqCst), 0);
        assert!(service.history().await.is_empty());
        assert!(!service.is_busy(Operation::Analyze));
    }

    #[tokio::test]
    async fn test_compare_fans_out_three_thresholds() {
        let (api, service) = service(FakeApi::default());

        let comparison = service.compare("I love this", None).await.unwrap();

        let thresholds: Vec<f64> = comparison.results.iter().map(|r| r.threshold).collect();
        assert_eq!(thresholds, vec![0.3, 0.5, 0.7]);
        assert_eq!(comparison.results[0].sentiment, Sentiment::Positive);
        assert_eq!(comparison.results[2].sentiment, Sentiment::Negative);
        assert_eq!(comparison.language, "auto");

        let mut seen = api.thresholds_seen.lock().unwrap().clone();
        seen.sort_by(f64::total_cmp);
        assert_eq!(seen, vec![0.3, 0.5, 0.7]);

        assert!(service.history().await.is_empty());
    }

    #[tokio::test]
    async fn test_compare_is_all_or_nothing() {
        let (_, service) = service(FakeApi {
            fail_at_threshold: Some(0.5),
            ..Default::default()
        });

        let err = service.compare("I love this", Some("en")).await.unwrap_err();

        assert_eq!(err.user_message(), "Model unavailable");
        assert!(!service.is_busy(Operation::Compare));
    }

    #[tokio::test]
    async fn test_concurrent_call_of_same_kind_is_busy() {
        let gate = Arc::new(Notify::new());
        let (_, service) = service(FakeApi {
            gate: Some(gate.clone()),
            ..Default::default()
        });

        let (first, second) = tokio::join!(service.analyze_default("first text"), async {
            let second = service.analyze_default("second text").await;
            gate.notify_one();
            second
        });

        assert!(first.is_ok());
        assert!(matches!(second, Err(Error::Busy(Operation::Analyze))));
        assert_eq!(service.history().await.len(), 1);
        assert!(!service.is_busy(Operation::Analyze));
    }

    #[tokio::test]
    async fn test_explain_defaults_to_last_text() {
        let (_, service) = service(FakeApi::default());

        let err = service.explain(None, None, None).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::NothingToExplain)
        ));

        service.analyze_default("I love it, I hate waiting").await.unwrap();
        let explanation = service.explain(None, None, None).await.unwrap();

        assert_eq!(explanation.text, "I love it, I hate waiting");
        assert_eq!(explanation.confidence, "Very High");
        assert_eq!(explanation.words[0].word, "love");
        assert_eq!(explanation.words[1].word, "hate");
    }

    #[tokio::test]
    async fn test_explain_failure_uses_status_message() {
        let (_, service) = service(FakeApi {
            fail_explain: true,
            ..Default::default()
        });

        let err = service
            .explain(Some("some text"), Some("es"), Some(5))
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "Error 422");
        assert!(!service.is_busy(Operation::Explain));
    }

    #[tokio::test]
    async fn test_reanalyze_reuses_settings() {
        let (api, service) = service(FakeApi::default());
        let settings = AnalysisSettings {
            language: "en".to_string(),
            threshold: 0.7,
        };

        let first = service.analyze("I love this", &settings).await.unwrap();
        let again = service.reanalyze(first.id).await.unwrap();

        assert_eq!(again.text, first.text);
        assert_eq!(again.language, "en");
        assert_eq!(again.threshold, 0.7);
        assert_ne!(again.id, first.id);
        assert_eq!(api.analyze_calls.load(Ordering::SeqCst), 2);
        assert_eq!(service.history().await.len(), 2);

        let err = service.reanalyze(42).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::UnknownRecord(42))
        ));
    }

    #[tokio::test]
    async fn test_remove_and_clear_history() {
        let (_, service) = service(FakeApi::default());
        let a = service.analyze_default("first text").await.unwrap();
        service.analyze_default("second text").await.unwrap();

        assert!(service.remove(a.id).await);
        assert!(!service.remove(a.id).await);
        assert_eq!(service.statistics().await.total, 1);

        service.clear_history().await;
        assert_eq!(service.statistics().await, SessionStatistics::default());
    }

    #[tokio::test]
    async fn test_failed_batch_keeps_previous_result() {
        let (_, service) = service(FakeApi::default());

        assert!(matches!(
            service.export_csv().await,
            Err(Error::Validation(ValidationError::NothingToExport))
        ));

        let result = service
            .run_batch_contents("texto\nI love this\nI hate this\n", None, &NoopProgress)
            .await
            .unwrap();
        assert_eq!(result.positive, 1);
        assert_eq!(result.positive_percent, 50.0);

        let err = service
            .run_batch_contents("comment\nnothing here\n", None, &NoopProgress)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Validation);

        assert_eq!(service.last_batch().await, Some(result));

        let csv = service.export_csv().await.unwrap();
        assert!(csv.starts_with(batch::CSV_HEADER));
        assert_eq!(csv.lines().count(), 3);

        let json = service.export_json(Utc::now()).await.unwrap();
        assert!(json.contains("\"positivos\": 1"));
    }
}
