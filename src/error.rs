//! Error types
//!
//! Every operation converts its failure into one of these variants. The
//! caller turns it into a single user-visible message with
//! [`Error::user_message`]; nothing is retried.

use std::path::PathBuf;
use thiserror::Error;

use crate::batch::{BatchPhase, CsvError};
use crate::client::ClientError;
use crate::service::Operation;

/// Input rejected before any request was sent
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Please enter a text to analyze")]
    EmptyText,

    #[error("The text must be at least {min} characters long")]
    TextTooShort { min: usize },

    #[error("The text cannot exceed {max} characters")]
    TextTooLong { max: usize },

    #[error("Threshold must be between 0 and 1, got {0}")]
    ThresholdOutOfRange(f64),

    #[error("The file must be in CSV format: {0}")]
    NotCsv(String),

    #[error("The CSV file has no texts to analyze")]
    EmptyBatch,

    #[error("Maximum {max} rows allowed. Your file has {count}")]
    TooManyRows { count: usize, max: usize },

    #[error("History entry {0} not found")]
    UnknownRecord(i64),

    #[error("There is no analyzed text to explain. Analyze a text first")]
    NothingToExplain,

    #[error("There are no batch results to export")]
    NothingToExport,
}

/// Top-level error for every client operation
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Csv(#[from] CsvError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Export failed: {0}")]
    Export(String),

    #[error("{0} already in progress")]
    Busy(Operation),

    /// A batch run aborted in the given phase
    #[error("{phase} failed: {source}")]
    Batch {
        phase: BatchPhase,
        #[source]
        source: Box<Error>,
    },
}

/// Coarse classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input, caught locally
    Validation,
    /// The server answered with a non-2xx status
    Remote,
    /// The request never got a response
    Transport,
    /// Malformed CSV or an undecodable response body
    Parse,
    /// Local file access or export failure
    Io,
    /// The same operation is already running
    Busy,
}

impl Error {
    /// Attach the batch phase in which this error occurred
    pub fn in_phase(self, phase: BatchPhase) -> Self {
        match self {
            Error::Batch { .. } => self,
            other => Error::Batch {
                phase,
                source: Box::new(other),
            },
        }
    }

    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::Validation,
            Error::Csv(CsvError::MissingColumn(_)) => ErrorKind::Validation,
            Error::Csv(CsvError::EmptyInput) => ErrorKind::Parse,
            Error::Client(ClientError::Api { .. }) => ErrorKind::Remote,
            Error::Client(ClientError::Decode(_)) => ErrorKind::Parse,
            Error::Client(_) => ErrorKind::Transport,
            Error::Io { .. } | Error::Export(_) => ErrorKind::Io,
            Error::Busy(_) => ErrorKind::Busy,
            Error::Batch { source, .. } => source.kind(),
        }
    }

    /// The single message shown to the user for this failure
    ///
    /// Batch failures prefer the server's message and otherwise fall back
    /// to a generic message for the phase that failed.
    pub fn user_message(&self) -> String {
        match self {
            Error::Batch { phase, source } => match source.as_ref() {
                Error::Client(ClientError::Api { message: None, .. }) => {
                    phase.failure_message().to_string()
                }
                other => other.user_message(),
            },
            other => other.to_string(),
        }
    }
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, Error>;
