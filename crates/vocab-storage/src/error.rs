use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("malformed persisted json in column {column}: {source}")]
    MalformedJson {
        column: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Storage failures always surface to the engine as `persistence_unavailable`;
/// the engine never branches on a storage-specific error shape.
impl From<StorageError> for vocab_core::EngineError {
    fn from(err: StorageError) -> Self {
        vocab_core::EngineError::PersistenceUnavailable(err.to_string())
    }
}
