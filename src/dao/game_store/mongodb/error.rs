use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use thiserror::Error;

/// Result alias for MongoDB backend operations.
pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

/// MongoDB error code for a unique index violation.
const DUPLICATE_KEY: i32 = 11_000;

/// Failures that can occur while interacting with MongoDB.
#[derive(Debug, Error)]
pub enum MongoDaoError {
    /// Required environment variable is missing.
    #[error("missing MongoDB environment variable `{var}`")]
    MissingEnvVar {
        /// Variable name.
        var: &'static str,
    },
    /// The connection string could not be parsed.
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        /// Offending URI.
        uri: String,
        /// Underlying failure.
        #[source]
        source: MongoError,
    },
    /// The driver refused the client options.
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        /// Underlying failure.
        #[source]
        source: MongoError,
    },
    /// The server never answered the initial ping.
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        /// Attempts made.
        attempts: u32,
        /// Last failure.
        #[source]
        source: MongoError,
    },
    /// A health check ping failed.
    #[error("MongoDB ping health check failed")]
    HealthPing {
        /// Underlying failure.
        #[source]
        source: MongoError,
    },
    /// A game with the same code is already stored.
    #[error("game `{code}` already exists")]
    DuplicateGame {
        /// Conflicting code.
        code: String,
    },
    /// Inserting a new game failed.
    #[error("failed to create game `{code}`")]
    CreateGame {
        /// Game code.
        code: String,
        /// Underlying failure.
        #[source]
        source: MongoError,
    },
    /// Replacing a game document failed.
    #[error("failed to save game `{code}`")]
    SaveGame {
        /// Game code.
        code: String,
        /// Underlying failure.
        #[source]
        source: MongoError,
    },
    /// Reading a game document failed.
    #[error("failed to load game `{code}`")]
    LoadGame {
        /// Game code.
        code: String,
        /// Underlying failure.
        #[source]
        source: MongoError,
    },
    /// Deleting a game document failed.
    #[error("failed to delete game `{code}`")]
    DeleteGame {
        /// Game code.
        code: String,
        /// Underlying failure.
        #[source]
        source: MongoError,
    },
    /// Opening or reading a change stream failed.
    #[error("change stream for game `{code}` failed")]
    WatchGame {
        /// Game code.
        code: String,
        /// Underlying failure.
        #[source]
        source: MongoError,
    },
}

/// Whether the driver error is a unique index violation.
pub(super) fn is_duplicate_key(err: &MongoError) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY
    )
}
