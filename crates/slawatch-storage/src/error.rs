/// Errors that can occur within the storage layer.
///
/// # Examples
///
/// ```rust
/// use slawatch_storage::error::StorageError;
///
/// let err = StorageError::NotFound {
///     entity: "incident",
///     id: "inc-99".to_string(),
/// };
/// assert!(err.to_string().contains("incident"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A required record was not found in the database.
    #[error("Storage: {entity} not found (id={id})")]
    NotFound { entity: &'static str, id: String },

    /// An optimistic update lost its compare-and-swap race: the row's
    /// version moved (or the row vanished) between read and write.
    #[error("Storage: concurrent update on {entity} (id={id})")]
    Conflict { entity: &'static str, id: String },

    /// An underlying SeaORM/SQLx error.
    #[error("Storage: database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Filesystem error while preparing the data directory.
    #[error("Storage: io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience `Result` alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
