use std::error::Error;
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends regardless of the underlying database.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not be reached or refused the request.
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// Backend-specific description.
        message: String,
        /// Underlying failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// A document already exists under the game code.
    #[error("game `{code}` already exists")]
    AlreadyExists {
        /// Conflicting game code.
        code: String,
    },
    /// A stored document could not be decoded into a game.
    #[error("stored game `{code}` could not be decoded")]
    Corrupt {
        /// Game code of the document.
        code: String,
        /// Decoding failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }

    /// Construct a decoding error for the document stored under `code`.
    pub fn corrupt(code: impl Into<String>, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Corrupt {
            code: code.into(),
            source: Box::new(source),
        }
    }
}
