use thiserror::Error;

#[derive(Debug, Error)]
pub enum MbrError {
    #[error("Signature error: {0}")]
    Signature(String),

    #[error("Invalid partition entry: {0}")]
    Format(String),

    #[error("Capacity exceeded: {0}")]
    Capacity(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
