use thiserror::Error;

/// Top-level error type for the ElderCare system.
///
/// Subsystem crates define their own error types and implement
/// `From<ElderCareError>` so that `?` works across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ElderCareError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMedia(String),

    #[error("Invalid media payload: {0}")]
    InvalidMedia(String),
}

impl From<toml::de::Error> for ElderCareError {
    fn from(err: toml::de::Error) -> Self {
        ElderCareError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for ElderCareError {
    fn from(err: toml::ser::Error) -> Self {
        ElderCareError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for ElderCareError {
    fn from(err: serde_json::Error) -> Self {
        ElderCareError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for ElderCare operations.
pub type Result<T> = std::result::Result<T, ElderCareError>;
