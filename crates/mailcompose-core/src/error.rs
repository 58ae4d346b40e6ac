//! Error types for message composition.

/// Result type alias for composition operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Composition error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Template references a placeholder that has no value.
    #[error("Unknown template placeholder `{name}`")]
    UnknownPlaceholder {
        /// Placeholder identifier.
        name: String,
    },

    /// Template failed to parse or render.
    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    /// Content-ID cannot be embedded in an image tag.
    #[error("Invalid content id: {0:?}")]
    InvalidContentId(String),

    /// Base64 decode error.
    #[error("Base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// I/O error while reading a template or settings file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings file could not be parsed or written.
    #[error("Settings error: {0}")]
    Settings(#[from] serde_json::Error),
}
