use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Malformed results line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    #[error("Sink unavailable: {0}")]
    Unavailable(String),
}
