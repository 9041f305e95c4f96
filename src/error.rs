//! Error types.
//!
//! - `FetchError`: everything that can go wrong while talking to a live source.
//!   It never leaves a fetcher; `data::SourceFetcher::fetch` turns it into the
//!   synthetic fallback.
//! - `ShapeError`: a dataset is missing a column (or a value cannot be parsed)
//!   after normalization.
//! - `PipelineError`: the single terminal error of an ingest run.
//! - `AppError`: CLI-facing error carrying a process exit code.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    /// Network failure or non-success status, after the retry budget ran out.
    #[error("request to {url} failed after {attempts} attempt(s): {reason}")]
    Transient {
        url: String,
        attempts: u32,
        status: Option<u16>,
        reason: String,
    },

    /// The request could not be built or the failure is not worth retrying.
    #[error("request to {url} failed permanently: {reason}")]
    Permanent { url: String, reason: String },

    /// The body arrived but could not be turned into records.
    #[error("unusable response from {source_name}: {reason}")]
    Shape { source_name: String, reason: String },

    /// The source answered, but had nothing for the requested window.
    #[error("{source_name} returned no rows for the requested window")]
    Empty { source_name: String },

    #[error("deadline exceeded while fetching {url}")]
    DeadlineExceeded { url: String },
}

impl FetchError {
    pub fn shape(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Shape {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    pub fn is_empty_result(&self) -> bool {
        matches!(self, Self::Empty { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    #[error("{dataset}: missing required column `{column}`")]
    MissingColumn { dataset: String, column: String },

    #[error("{dataset}: invalid value '{value}' in column `{column}` (line {line})")]
    InvalidValue {
        dataset: String,
        column: String,
        value: String,
        line: usize,
    },
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Shape(#[from] ShapeError),

    #[error("I/O error at '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error at '{}': {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to serialize manifest: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("pipeline deadline exceeded before {stage}")]
    DeadlineExceeded { stage: &'static str },

    #[error("invalid run parameters: {0}")]
    InvalidParams(String),
}

impl PipelineError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        let code = match err {
            PipelineError::InvalidParams(_) => 2,
            _ => 4,
        };
        AppError::new(code, format!("Ingest failed: {err}"))
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
