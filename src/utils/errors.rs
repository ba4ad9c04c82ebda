use thiserror::Error;

/// Main error type for Solace
#[derive(Error, Debug)]
pub enum SolaceError {
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Backend returned {status}: {body}")]
    ApiError { status: u16, body: String },

    #[error("Failed to decode backend response: {0}")]
    DecodeError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl SolaceError {
    /// Whether the backend answered at all (as opposed to an unreachable host)
    pub fn is_backend_response(&self) -> bool {
        matches!(self, SolaceError::ApiError { .. } | SolaceError::DecodeError(_))
    }
}
