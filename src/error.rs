use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Input rejected before any request was made
    #[error("{0}")]
    Validation(String),

    /// Error text reported by the backend in an `{error}` body
    #[error("{0}")]
    Backend(String),

    #[error("Backend returned status {0}")]
    Status(u16),

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Invalid JSON at {path}: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Text shown to the user for this failure.
    ///
    /// Validation and backend-reported messages pass through verbatim,
    /// everything else collapses to `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ClientError::Validation(msg) | ClientError::Backend(msg) => msg.clone(),
            _ => fallback.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
