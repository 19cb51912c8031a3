//! Error taxonomy for artifact loading and scoring

use thiserror::Error;

/// Errors raised while loading artifacts or scoring customers.
#[derive(Debug, Error)]
pub enum ChurnError {
    /// Classifier or feature schema is unreadable or inconsistent
    #[error("model artifact error: {0}")]
    Artifact(String),

    /// Uploaded table lacks columns the model expects
    #[error("Missing required columns: {}", format_columns(.missing))]
    MissingColumns { missing: Vec<String> },

    /// Uploaded content could not be parsed
    #[error("could not parse upload: {0}")]
    Parse(String),

    /// Out-of-range customer input or unsupported upload
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The classifier failed while scoring
    #[error("inference failed: {0}")]
    Inference(String),

    /// Scored results could not be serialized
    #[error("could not write results: {0}")]
    Export(String),
}

impl ChurnError {
    /// Whether the error was caused by the request rather than the server
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ChurnError::MissingColumns { .. } | ChurnError::Parse(_) | ChurnError::InvalidInput(_)
        )
    }
}

impl From<csv::Error> for ChurnError {
    fn from(e: csv::Error) -> Self {
        ChurnError::Parse(e.to_string())
    }
}

fn format_columns(columns: &[String]) -> String {
    let quoted: Vec<String> = columns.iter().map(|c| format!("'{}'", c)).collect();
    format!("[{}]", quoted.join(", "))
}

/// Result alias for scoring operations
pub type Result<T> = std::result::Result<T, ChurnError>;
