use std::error::Error;

use thiserror::Error;

/// Database model definitions.
pub mod models;
/// Room storage and retrieval operations.
pub mod room_store;

/// Result alias for room store operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by a room store backend, regardless of the database behind it.
/// Callers treat it as a signal to fail the request with a degraded-mode 503.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend cannot serve the operation right now.
    #[error("room storage unavailable: {message}")]
    Unavailable {
        /// What the backend was doing when it failed.
        message: String,
        /// The backend-specific failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl StorageError {
    /// Wrap any backend failure as an unavailability error.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }
}
