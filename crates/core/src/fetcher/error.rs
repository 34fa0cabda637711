use thiserror::Error;

/// Errors that can occur while fetching a job's target.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Request timed out.
    #[error("Request timed out")]
    Timeout,

    /// Could not reach the remote side.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Remote side answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Target could not be turned into a request.
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    /// Any other transport or decoding failure.
    #[error("Request failed: {0}")]
    Request(String),
}

impl FetchError {
    /// Whether a later attempt could plausibly succeed.
    ///
    /// Informational: no retry is performed anywhere in the crate.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout | Self::ConnectionFailed(_) => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::InvalidTarget(_) | Self::Request(_) => false,
        }
    }
}
