use thiserror::Error;

/// Errors that can occur when interacting with the geo registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The backing store failed.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// The store returned a status string we do not know.
    #[error("Unknown driver status: {0}")]
    UnknownStatus(String),
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;
