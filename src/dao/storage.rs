//! Storage error taxonomy shared by every [`QuizStore`](crate::dao::quiz_store::QuizStore)
//! implementation.

use thiserror::Error;

/// Errors surfaced by storage backends.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not be reached or the operation failed mid-flight.
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// Human-readable description of the failure.
        message: String,
        /// Underlying driver error, when one exists.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
    /// A uniqueness constraint rejected the write.
    #[error("duplicate record for {key}")]
    Duplicate {
        /// Description of the conflicting key.
        key: String,
    },
}

impl StorageError {
    /// Build an [`StorageError::Unavailable`] from any driver error.
    pub fn unavailable(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        StorageError::Unavailable {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Build an [`StorageError::Unavailable`] without an underlying cause.
    pub fn unavailable_msg(message: impl Into<String>) -> Self {
        StorageError::Unavailable {
            message: message.into(),
            source: None,
        }
    }

    /// Build a [`StorageError::Duplicate`] for the given key description.
    pub fn duplicate(key: impl Into<String>) -> Self {
        StorageError::Duplicate { key: key.into() }
    }
}

/// Convenient alias for storage operation results.
pub type StorageResult<T> = Result<T, StorageError>;
