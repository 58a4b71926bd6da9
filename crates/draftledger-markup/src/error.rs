//! Error types for markup operations.

/// Result type alias for markup operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Markup error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid content type.
    #[error("Invalid content type: {0}")]
    InvalidContentType(String),
}
