//! Error types for inventory and sink operations

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors raised by the inventory and by any of the three sinks
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Connection could not be established
    #[error("failed to connect to storage backend: {0}")]
    ConnectionFailed(String),

    /// Query or statement failed
    #[error("storage query failed: {0}")]
    QueryFailed(String),

    #[error("database migration failed: {0}")]
    MigrationFailed(String),

    /// A stored value could not be mapped onto the domain types
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Backend-specific error, e.g. a rejected write
    #[error("storage backend error: {0}")]
    BackendError(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(feature = "storage-sqlite")]
impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(io_err) => StorageError::Io(io_err),
            sqlx::Error::RowNotFound => StorageError::QueryFailed("no rows found".to_string()),
            _ => StorageError::QueryFailed(err.to_string()),
        }
    }
}

#[cfg(feature = "storage-sqlite")]
impl From<sqlx::migrate::MigrateError> for StorageError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StorageError::MigrationFailed(err.to_string())
    }
}
