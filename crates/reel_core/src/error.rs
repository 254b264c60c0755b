use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    /// The user provided invalid arguments (e.g., a URL the tools cannot handle).
    /// Surfaced as an `error` event or `success: false`.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The requested artifact was not found.
    /// Maps to **HTTP 404 Not Found**.
    #[error("Artifact {0} not found")]
    NotFound(String),

    /// Failure inside the wrapped media tools.
    /// Maps to **HTTP 500 Internal Server Error** outside of a stream.
    #[error("Backend failure: {0}")]
    System(String),

    /// The backend does not support this operation.
    /// Maps to **HTTP 501 Not Implemented**.
    #[error("Operation not supported: {0}")]
    Unsupported(String),
}
