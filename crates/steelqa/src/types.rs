//! Shared result types and the library error.

use serde::{Deserialize, Serialize};

/// Outcome of one structural predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
}

impl CheckResult {
    pub fn new(name: impl Into<String>, passed: bool) -> Self {
        Self {
            name: name.into(),
            passed,
        }
    }
}

/// Errors that can occur while packaging or probing.
#[derive(thiserror::Error, Debug)]
pub enum QaError {
    #[error("Source directory not found: {0}")]
    SourceNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Missing credentials: {0}")]
    MissingCredentials(String),
}

impl QaError {
    /// Whether the error came from talking to the target application.
    pub fn is_network(&self) -> bool {
        matches!(self, QaError::Http(_) | QaError::Status { .. })
    }
}

/// Convenience result type.
pub type QaResult<T> = Result<T, QaError>;
