//! Batch phases and progress reporting
//!
//! Percentages are cosmetic: each phase owns a fixed range that says
//! nothing about real transfer progress.

use std::fmt;

use super::result::BatchResult;
use crate::error::Error;

/// The five phases of a batch run, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BatchPhase {
    Reading,
    Preparing,
    Submitting,
    Processing,
    Finalizing,
}

impl BatchPhase {
    pub const ALL: [BatchPhase; 5] = [
        BatchPhase::Reading,
        BatchPhase::Preparing,
        BatchPhase::Submitting,
        BatchPhase::Processing,
        BatchPhase::Finalizing,
    ];

    /// Progress-bar range `(from, to)` in percent
    pub fn progress_range(&self) -> (u8, u8) {
        match self {
            BatchPhase::Reading => (0, 20),
            BatchPhase::Preparing => (20, 30),
            BatchPhase::Submitting => (30, 70),
            BatchPhase::Processing => (70, 90),
            BatchPhase::Finalizing => (90, 100),
        }
    }

    /// Generic message used when a failure carries no server message
    pub fn failure_message(&self) -> &'static str {
        match self {
            BatchPhase::Reading => "Failed to read the CSV file",
            BatchPhase::Preparing => "Failed to prepare the batch request",
            BatchPhase::Submitting => "Failed to process the file",
            BatchPhase::Processing => "Failed to process the batch results",
            BatchPhase::Finalizing => "Failed to finalize the batch results",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BatchPhase::Reading => "reading",
            BatchPhase::Preparing => "preparing",
            BatchPhase::Submitting => "submitting",
            BatchPhase::Processing => "processing",
            BatchPhase::Finalizing => "finalizing",
        }
    }
}

impl fmt::Display for BatchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observer of a batch run
pub trait ProgressReporter: Send + Sync {
    /// A phase has started; `message` is a short human-readable status
    fn phase_started(&self, phase: BatchPhase, message: &str);

    /// The run completed
    fn completed(&self, _result: &BatchResult) {}

    /// The run aborted
    fn failed(&self, _error: &Error) {}
}

/// Reporter that ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn phase_started(&self, _phase: BatchPhase, _message: &str) {}
}

/// Reporter that logs phase transitions through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgress;

impl ProgressReporter for TracingProgress {
    fn phase_started(&self, phase: BatchPhase, message: &str) {
        let (from, to) = phase.progress_range();
        tracing::info!(phase = %phase, from, to, "{}", message);
    }

    fn completed(&self, result: &BatchResult) {
        tracing::info!(
            total = result.total,
            positive = result.positive,
            negative = result.negative,
            "Batch completed"
        );
    }

    fn failed(&self, error: &Error) {
        tracing::warn!(error = %error, "Batch failed");
    }
}
