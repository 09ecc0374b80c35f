//! Error types for the stake server.

/// Top-level error type for the query service.
#[derive(Debug, thiserror::Error)]
pub enum StakeError {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// HTTP server error (bind, address lookup).
    #[error("server error: {0}")]
    Server(String),

    /// Quote lookup error.
    #[error(transparent)]
    Scout(#[from] stake_scout::ScoutError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, StakeError>;
