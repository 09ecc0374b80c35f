//! Error types for the stake-scout crate.
//!
//! Messages are stable strings suitable for logs and programmatic handling.
//! Source-level failures never escape the adapter boundary as errors; they
//! are folded into a [`crate::types::Quote`] with an internal diagnostic.
//! Only [`ScoutError::InvalidInput`] and [`ScoutError::Config`] reach callers
//! of the aggregator.

/// Errors that can occur while looking up quotes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScoutError {
    /// The search term was empty or whitespace-only.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The render capability could not load the source page.
    #[error("navigation failed: {0}")]
    Navigation(String),

    /// A bounded wait elapsed (navigation, selector wait, or control activation).
    #[error("timed out: {0}")]
    Timeout(String),

    /// The page loaded but the container holding source rows never appeared.
    #[error("container not found: {0}")]
    ContainerNotFound(String),

    /// A selector was invalid or extraction from the rendered document failed.
    #[error("extraction error: {0}")]
    Extraction(String),

    /// Raw price text did not contain a parseable number.
    #[error("unparseable price: {0:?}")]
    UnparseablePrice(String),

    /// An HTTP request made by the renderer failed.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Invalid scout configuration.
    #[error("config error: {0}")]
    Config(String),
}

/// Convenience type alias for stake-scout results.
pub type Result<T> = std::result::Result<T, ScoutError>;
