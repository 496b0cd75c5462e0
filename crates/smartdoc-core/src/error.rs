//! Error types for smartdoc-core
//!
//! Intake rejections and backend failures are recoverable: the
//! orchestrator turns them into notifications and degraded results. Only
//! `CoreError` reaches callers.

use std::path::PathBuf;
use thiserror::Error;

/// Reason code for a rejected upload candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionCode {
    TooManyFiles,
    UnsupportedType,
    TooLarge,
}

/// Intake validation failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntakeError {
    #[error("Maximum {max} documents allowed")]
    TooManyFiles { max: usize },

    #[error("Invalid file type: {name}")]
    UnsupportedType { name: String, mime_type: String },

    #[error("File too large: {name}")]
    TooLarge {
        name: String,
        size_bytes: u64,
        max_bytes: u64,
    },
}

impl IntakeError {
    /// Bare reason code, for callers that branch on the rejection kind
    pub fn code(&self) -> RejectionCode {
        match self {
            Self::TooManyFiles { .. } => RejectionCode::TooManyFiles,
            Self::UnsupportedType { .. } => RejectionCode::UnsupportedType,
            Self::TooLarge { .. } => RejectionCode::TooLarge,
        }
    }
}

/// Failure of the backend analysis call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    /// Transport-level failure (connection refused, timeout, TLS)
    #[error("{message}")]
    Network { message: String },

    /// Backend answered with a non-success status
    #[error("{detail}")]
    Status { status: u16, detail: String },

    /// Backend rejected the credentials (HTTP 401)
    #[error("Session expired. Please log in again.")]
    SessionExpired,

    /// Response arrived but lacks the expected summary/pair structure
    #[error("Malformed analysis response: {reason}")]
    Malformed { reason: String },
}

impl AnalysisError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed { .. })
    }
}

/// Core error type for smartdoc operations
#[derive(Error, Debug)]
pub enum CoreError {
    // ===================
    // IO Errors
    // ===================
    #[error("Failed to read file: {path}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ===================
    // Config Errors
    // ===================
    #[error("Failed to parse config {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    // ===================
    // Workflow Errors
    // ===================
    #[error(transparent)]
    Intake(#[from] IntakeError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error("An analysis is already in progress")]
    AnalysisInProgress,

    #[error("Please upload between {min} and {max} documents (currently {count})")]
    DocumentCount {
        count: usize,
        min: usize,
        max: usize,
    },

    #[error("No analysis result to export")]
    NoResult,

    #[error("Report export failed: {message}")]
    Export { message: String },
}

impl CoreError {
    /// Actionable hint for the user, when one exists
    pub fn suggestion(&self) -> Option<String> {
        match self {
            CoreError::FileRead { path, .. } => Some(format!(
                "Check that the file exists and is readable: ls -l {}",
                path.display()
            )),
            CoreError::ConfigParse { path, .. } => Some(format!(
                "Fix the TOML syntax or remove {} to use defaults",
                path.display()
            )),
            CoreError::Intake(IntakeError::UnsupportedType { .. }) => {
                Some("Supported formats: .pdf, .docx, .txt".to_string())
            }
            CoreError::Intake(IntakeError::TooLarge { max_bytes, .. }) => Some(format!(
                "Split the document; the limit is {} MB",
                max_bytes / (1024 * 1024)
            )),
            CoreError::DocumentCount { min, .. } => {
                Some(format!("Add at least {} documents before analyzing", min))
            }
            CoreError::Analysis(AnalysisError::Network { .. }) => {
                Some("Check the backend URL (--backend-url) and that the server is running".to_string())
            }
            _ => None,
        }
    }
}
