use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReviewError {
    /// an external backend call failed; carries the native error text
    #[error("{operation} failed for {resource}: {message}")]
    Backend {
        operation: String,
        resource: String,
        message: String,
    },
    /// a report could not be rendered from the analysis
    #[error("Formatting error: {0}")]
    Formatting(String),
    /// missing or malformed configuration
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// the run exceeded its invocation budget and was abandoned
    #[error("run timed out after {0:?}")]
    Timeout(std::time::Duration),
    /// IO-related errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ReviewError {
    pub fn backend(operation: &str, resource: &str, message: impl Into<String>) -> Self {
        ReviewError::Backend {
            operation: operation.to_string(),
            resource: resource.to_string(),
            message: message.into(),
        }
    }
}

/// result type alias for logreview operations
pub type Result<T> = std::result::Result<T, ReviewError>;
