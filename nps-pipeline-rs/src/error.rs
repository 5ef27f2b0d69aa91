//! Error types for the NPS pipeline

use thiserror::Error;

use crate::exit_codes;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Table-level failures
///
/// Per-row classification failures never surface here; they become sentinel
/// records inside the batch result.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Required input columns are absent; the run aborts before any call
    #[error("Missing required columns: {}", missing.join(", "))]
    Schema { missing: Vec<String> },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid column map {path}: {source}")]
    ColumnMap {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    pub fn schema(missing: Vec<String>) -> Self {
        PipelineError::Schema { missing }
    }

    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn is_schema(&self) -> bool {
        matches!(self, PipelineError::Schema { .. })
    }

    /// Process exit code for this failure
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineError::Schema { .. } | PipelineError::ColumnMap { .. } | PipelineError::Config(_) => {
                exit_codes::INVALID_INPUT
            }
            PipelineError::Io { .. } | PipelineError::Csv(_) => exit_codes::RUNTIME_FAILURE,
        }
    }
}

impl From<classifier_sdk::ServiceError> for PipelineError {
    fn from(err: classifier_sdk::ServiceError) -> Self {
        PipelineError::Config(err.to_string())
    }
}
