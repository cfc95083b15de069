use thiserror::Error;

/// Top-level error type for Blacksky.
#[derive(Debug, Error)]
pub enum BlackskyError {
    /// Error from the chat transport (connect, send, logout).
    #[error("transport error: {0}")]
    Transport(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Command loading or execution error.
    #[error("command error: {0}")]
    Command(String),

    /// Credential store error.
    #[error("credentials error: {0}")]
    Credentials(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
