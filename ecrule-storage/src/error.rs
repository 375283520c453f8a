//! Error types for editing contexts and object stores.

use ecrule_model::ModelError;
use ecrule_types::{ContextId, EntityId};
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An object failed validation against its entity definition.
    #[error("validation failed: {0}")]
    Validation(#[from] ModelError),

    /// No registered model declares this entity.
    #[error("unknown entity: {0}")]
    UnknownEntity(String),

    #[error("object not found: {0}")]
    NotFound(EntityId),

    #[error("object already exists: {0}")]
    DuplicateObject(EntityId),

    #[error("editing context {0} is not locked")]
    NotLocked(ContextId),

    #[error("editing context {0} has been disposed")]
    Disposed(ContextId),

    #[error("object store is closed")]
    Closed,

    /// Stored data could not be decoded.
    #[error("invalid data: {0}")]
    InvalidData(String),
}
