//! Batch Pipeline
//!
//! Runs one batch: parse, validate, submit in a single request, convert,
//! hand back. A failure in any phase aborts the rest and returns the
//! pipeline to idle; nothing from the failed run is kept.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::Instrument;

use super::parser::CsvTextParser;
use super::progress::{BatchPhase, ProgressReporter};
use super::result::BatchResult;
use crate::client::{BatchRequest, BatchResponse, ClientError, SentimentApi};
use crate::error::{Error, Result, ValidationError};
use crate::service::Operation;

/// Limits and defaults for batch runs
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Maximum number of texts per run
    pub max_rows: usize,
    /// Language sent when the caller does not choose one
    pub language: String,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_rows: 1000,
            language: "auto".to_string(),
        }
    }
}

/// What the pipeline is doing right now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Running(BatchPhase),
}

/// Source of the CSV contents for one run
enum Input<'a> {
    File(&'a Path),
    Contents(&'a str),
}

/// Five-phase batch runner
pub struct BatchPipeline {
    api: Arc<dyn SentimentApi>,
    parser: CsvTextParser,
    config: BatchConfig,
    state: Mutex<PipelineState>,
}

/// Marks the pipeline busy for the lifetime of one run
struct RunGuard<'a> {
    state: &'a Mutex<PipelineState>,
}

impl RunGuard<'_> {
    fn enter(&self, phase: BatchPhase, progress: &dyn ProgressReporter, message: &str) {
        *lock(self.state) = PipelineState::Running(phase);
        tracing::debug!(phase = %phase, "Entering batch phase");
        progress.phase_started(phase, message);
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        *lock(self.state) = PipelineState::Idle;
    }
}

fn lock(state: &Mutex<PipelineState>) -> MutexGuard<'_, PipelineState> {
    // the state is a plain enum, a poisoned lock still holds a valid value
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Reject files without a `.csv` extension (case-insensitive)
pub fn ensure_csv_extension(path: &Path) -> std::result::Result<(), ValidationError> {
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);

    if is_csv {
        Ok(())
    } else {
        Err(ValidationError::NotCsv(path.display().to_string()))
    }
}

impl BatchPipeline {
    /// Create a pipeline submitting through `api`
    pub fn new(api: Arc<dyn SentimentApi>, config: BatchConfig) -> Self {
        Self {
            api,
            parser: CsvTextParser::new(),
            config,
            state: Mutex::new(PipelineState::Idle),
        }
    }

    /// Use a custom text parser
    pub fn with_parser(mut self, parser: CsvTextParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Current state
    pub fn state(&self) -> PipelineState {
        *lock(&self.state)
    }

    /// Run a batch over a CSV file on disk
    pub async fn run_file(
        &self,
        path: &Path,
        language: Option<&str>,
        progress: &dyn ProgressReporter,
    ) -> Result<BatchResult> {
        ensure_csv_extension(path)?;
        self.run(Input::File(path), language, progress).await
    }

    /// Run a batch over CSV contents already in memory
    pub async fn run_contents(
        &self,
        contents: &str,
        language: Option<&str>,
        progress: &dyn ProgressReporter,
    ) -> Result<BatchResult> {
        self.run(Input::Contents(contents), language, progress).await
    }

    async fn run(
        &self,
        input: Input<'_>,
        language: Option<&str>,
        progress: &dyn ProgressReporter,
    ) -> Result<BatchResult> {
        let run = self.begin()?;
        let language = language.unwrap_or(&self.config.language);
        let run_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("batch_run", run_id = %run_id, language = %language);

        let outcome = self
            .execute(&run, input, language, progress)
            .instrument(span.clone())
            .await;

        span.in_scope(|| match &outcome {
            Ok(result) => {
                tracing::info!(
                    total = result.total,
                    positive = result.positive,
                    negative = result.negative,
                    "Batch run finished"
                );
                progress.completed(result);
            }
            Err(e) => {
                tracing::error!(error = %e, "Batch run aborted");
                progress.failed(e);
            }
        });

        outcome
    }

    fn begin(&self) -> Result<RunGuard<'_>> {
        let mut state = lock(&self.state);
        if *state != PipelineState::Idle {
            return Err(Error::Busy(Operation::Batch));
        }
        *state = PipelineState::Running(BatchPhase::Reading);
        Ok(RunGuard { state: &self.state })
    }

    async fn execute(
        &self,
        run: &RunGuard<'_>,
        input: Input<'_>,
        language: &str,
        progress: &dyn ProgressReporter,
    ) -> Result<BatchResult> {
        // Reading
        run.enter(BatchPhase::Reading, progress, "Reading file...");
        let texts = self
            .read(input)
            .await
            .map_err(|e| e.in_phase(BatchPhase::Reading))?;

        // Preparing
        run.enter(
            BatchPhase::Preparing,
            progress,
            &format!("Preparing {} texts...", texts.len()),
        );
        let request = self
            .prepare(texts, language)
            .map_err(|e| Error::from(e).in_phase(BatchPhase::Preparing))?;

        // Submitting
        let count = request.texts.len();
        run.enter(
            BatchPhase::Submitting,
            progress,
            &format!("Analyzing {} texts...", count),
        );
        tracing::info!(rows = count, "Submitting batch");
        let body = self
            .api
            .analyze_batch(&request)
            .await
            .map_err(|e| Error::from(e).in_phase(BatchPhase::Submitting))?;

        // Processing
        run.enter(BatchPhase::Processing, progress, "Processing results...");
        let response: BatchResponse = serde_json::from_str(&body).map_err(|e| {
            Error::from(ClientError::Decode(e.to_string())).in_phase(BatchPhase::Processing)
        })?;
        let result = BatchResult::from_response(response);
        if result.items.len() != count {
            tracing::warn!(
                submitted = count,
                returned = result.items.len(),
                "Batch response item count differs from submission"
            );
        }

        // Finalizing
        run.enter(BatchPhase::Finalizing, progress, "Completed!");
        Ok(result)
    }

    async fn read(&self, input: Input<'_>) -> Result<Vec<String>> {
        let texts = match input {
            Input::Contents(contents) => self.parser.parse(contents)?,
            Input::File(path) => {
                let contents = tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| Error::Io {
                        path: path.to_path_buf(),
                        source,
                    })?;
                self.parser.parse(&contents)?
            }
        };
        Ok(texts)
    }

    fn prepare(
        &self,
        texts: Vec<String>,
        language: &str,
    ) -> std::result::Result<BatchRequest, ValidationError> {
        if texts.is_empty() {
            return Err(ValidationError::EmptyBatch);
        }
        if texts.len() > self.config.max_rows {
            return Err(ValidationError::TooManyRows {
                count: texts.len(),
                max: self.config.max_rows,
            });
        }

        Ok(BatchRequest {
            texts,
            language: language.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::CsvError;
    use crate::client::{AnalyzeRequest, AnalyzeResponse, ExplainRequest, ExplainResponse};
    use crate::error::ErrorKind;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Batch endpoint stub: labels texts containing "love" as positive
    #[derive(Default)]
    struct StubApi {
        calls: AtomicUsize,
        fail_with: Option<Option<String>>,
        raw_body: Option<String>,
    }

    #[async_trait]
    impl SentimentApi for StubApi {
        async fn analyze(
            &self,
            _: &AnalyzeRequest,
        ) -> std::result::Result<AnalyzeResponse, ClientError> {
            unreachable!("batch pipeline never calls single analysis")
        }

        async fn explain(
            &self,
            _: &ExplainRequest,
        ) -> std::result::Result<ExplainResponse, ClientError> {
            unreachable!("batch pipeline never calls explain")
        }

        async fn analyze_batch(
            &self,
            request: &BatchRequest,
        ) -> std::result::Result<String, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(message) = &self.fail_with {
                return Err(ClientError::Api {
                    status: 500,
                    message: message.clone(),
                });
            }
            if let Some(body) = &self.raw_body {
                return Ok(body.clone());
            }

            let results: Vec<_> = request
                .texts
                .iter()
                .map(|text| {
                    let label = if text.contains("love") {
                        "Positivo"
                    } else {
                        "Negativo"
                    };
                    json!({"texto": text, "prevision": label, "probabilidad": 0.8})
                })
                .collect();
            let positives = request.texts.iter().filter(|t| t.contains("love")).count();

            Ok(json!({
                "total": results.len(),
                "positivos": positives,
                "negativos": results.len() - positives,
                "resultados": results,
            })
            .to_string())
        }
    }

    #[derive(Default)]
    struct RecordingProgress {
        phases: Mutex<Vec<BatchPhase>>,
        completed: AtomicUsize,
        failed: AtomicUsize,
    }

    impl ProgressReporter for RecordingProgress {
        fn phase_started(&self, phase: BatchPhase, _message: &str) {
            self.phases.lock().unwrap().push(phase);
        }

        fn completed(&self, _result: &BatchResult) {
            self.completed.fetch_add(1, Ordering::SeqCst);
        }

        fn failed(&self, _error: &Error) {
            self.failed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn pipeline(api: Arc<StubApi>) -> BatchPipeline {
        BatchPipeline::new(api, BatchConfig::default())
    }

    #[tokio::test]
    async fn test_successful_run_walks_all_phases() {
        let api = Arc::new(StubApi::default());
        let pipeline = pipeline(Arc::clone(&api));
        let progress = RecordingProgress::default();

        let result = pipeline
            .run_contents("texto\nI love this\nI hate this\n", None, &progress)
            .await
            .unwrap();

        assert_eq!(result.total, 2);
        assert_eq!(result.positive, 1);
        assert_eq!(result.positive_percent, 50.0);
        assert_eq!(result.items[0].text, "I love this");
        assert_eq!(result.items[1].confidence, "High");

        assert_eq!(*progress.phases.lock().unwrap(), BatchPhase::ALL.to_vec());
        assert_eq!(progress.completed.load(Ordering::SeqCst), 1);
        assert_eq!(api.calls.load(Ordering::SeqCst), 1);
        assert_eq!(pipeline.state(), PipelineState::Idle);
    }

    #[tokio::test]
    async fn test_too_many_rows_fails_before_network() {
        let api = Arc::new(StubApi::default());
        let pipeline = pipeline(Arc::clone(&api));
        let progress = RecordingProgress::default();

        let mut csv = String::from("texto\n");
        for i in 0..1001 {
            csv.push_str(&format!("text number {}\n", i));
        }

        let err = pipeline.run_contents(&csv, None, &progress).await.unwrap_err();

        assert_eq!(
            err.user_message(),
            "Maximum 1000 rows allowed. Your file has 1001"
        );
        assert!(matches!(
            err,
            Error::Batch {
                phase: BatchPhase::Preparing,
                ..
            }
        ));
        assert_eq!(api.calls.load(Ordering::SeqCst), 0);
        assert_eq!(progress.failed.load(Ordering::SeqCst), 1);
        assert_eq!(pipeline.state(), PipelineState::Idle);
    }

    #[tokio::test]
    async fn test_exactly_max_rows_is_accepted() {
        let api = Arc::new(StubApi::default());
        let pipeline = pipeline(Arc::clone(&api));

        let mut csv = String::from("texto\n");
        for i in 0..1000 {
            csv.push_str(&format!("row {}\n", i));
        }

        let result = pipeline
            .run_contents(&csv, Some("es"), &crate::batch::NoopProgress)
            .await
            .unwrap();
        assert_eq!(result.total, 1000);
    }

    #[tokio::test]
    async fn test_all_values_empty_is_empty_batch() {
        let api = Arc::new(StubApi::default());
        let pipeline = pipeline(Arc::clone(&api));

        let err = pipeline
            .run_contents("id,texto\n1,\n2,\"\"\n", None, &crate::batch::NoopProgress)
            .await
            .unwrap_err();

        match err {
            Error::Batch { phase, source } => {
                assert_eq!(phase, BatchPhase::Preparing);
                assert!(matches!(*source, Error::Validation(ValidationError::EmptyBatch)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(api.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_column_fails_in_reading() {
        let api = Arc::new(StubApi::default());
        let pipeline = pipeline(Arc::clone(&api));
        let progress = RecordingProgress::default();

        let err = pipeline
            .run_contents("comment\nnice\n", None, &progress)
            .await
            .unwrap_err();

        match err {
            Error::Batch { phase, source } => {
                assert_eq!(phase, BatchPhase::Reading);
                assert!(matches!(*source, Error::Csv(CsvError::MissingColumn(_))));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(*progress.phases.lock().unwrap(), vec![BatchPhase::Reading]);
    }

    #[tokio::test]
    async fn test_remote_failure_uses_server_message_then_phase_message() {
        let api = Arc::new(StubApi {
            fail_with: Some(Some("Servicio no disponible".to_string())),
            ..Default::default()
        });
        let err = pipeline(api)
            .run_contents("texto\nhello world\n", None, &crate::batch::NoopProgress)
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "Servicio no disponible");

        let api = Arc::new(StubApi {
            fail_with: Some(None),
            ..Default::default()
        });
        let pipeline = pipeline(api);
        let err = pipeline
            .run_contents("texto\nhello world\n", None, &crate::batch::NoopProgress)
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "Failed to process the file");
        assert_eq!(pipeline.state(), PipelineState::Idle);
    }

    #[tokio::test]
    async fn test_run_file_checks_extension_and_reads() {
        let dir = tempfile::tempdir().unwrap();
        let api = Arc::new(StubApi::default());
        let pipeline = pipeline(Arc::clone(&api));

        let txt = dir.path().join("comments.txt");
        std::fs::write(&txt, "texto\nI love this\n").unwrap();
        let err = pipeline
            .run_file(&txt, None, &crate::batch::NoopProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::NotCsv(_))));

        let csv = dir.path().join("comments.CSV");
        std::fs::write(&csv, "texto\nI love this\n").unwrap();
        let result = pipeline
            .run_file(&csv, None, &crate::batch::NoopProgress)
            .await
            .unwrap();
        assert_eq!(result.positive, 1);

        let missing = dir.path().join("missing.csv");
        let err = pipeline
            .run_file(&missing, None, &crate::batch::NoopProgress)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Io);
    }

    #[tokio::test]
    async fn test_concurrent_run_is_rejected() {
        let api = Arc::new(StubApi::default());
        let pipeline = pipeline(api);

        let guard = pipeline.begin().unwrap();
        assert_eq!(
            pipeline.state(),
            PipelineState::Running(BatchPhase::Reading)
        );

        let err = pipeline
            .run_contents("texto\nabc\n", None, &crate::batch::NoopProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Busy(Operation::Batch)));

        drop(guard);
        assert_eq!(pipeline.state(), PipelineState::Idle);
    }

    #[tokio::test]
    async fn test_malformed_response_fails_in_processing() {
        let api = Arc::new(StubApi {
            raw_body: Some("<html>Bad Gateway</html>".to_string()),
            ..StubApi::default()
        });
        let pipeline = pipeline(Arc::clone(&api));
        let progress = RecordingProgress::default();

        let err = pipeline
            .run_contents("texto
I love this
", None, &progress)
            .await
            .unwrap_err();

        match &err {
            Error::Batch { phase, source } => {
                assert_eq!(*phase, BatchPhase::Processing);
                assert!(matches!(
                    source.as_ref(),
                    Error::Client(ClientError::Decode(_))
                ));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.kind(), ErrorKind::Parse);
        assert!(err
            .user_message()
            .starts_with("Invalid response from the server"));
        assert_eq!(
            progress.phases.lock().unwrap().last(),
            Some(&BatchPhase::Processing)
        );
        assert_eq!(progress.failed.load(Ordering::SeqCst), 1);
        assert_eq!(pipeline.state(), PipelineState::Idle);
    }
}
