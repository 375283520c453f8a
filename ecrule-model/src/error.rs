//! Error types for model parsing and entity validation.

use crate::AttributeType;
use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Debug, Error)]
pub enum ModelError {
    /// The model definition itself is malformed.
    #[error("invalid model '{model}': {reason}")]
    InvalidModel { model: String, reason: String },

    #[error("entity '{found}' validated against definition of '{expected}'")]
    EntityMismatch { expected: String, found: String },

    #[error("entity '{entity}' has no attribute named '{attribute}'")]
    UnknownAttribute { entity: String, attribute: String },

    #[error("attribute '{entity}.{attribute}' does not allow null")]
    NullViolation { entity: String, attribute: String },

    #[error("attribute '{entity}.{attribute}' expects {expected}, found {found}")]
    TypeMismatch {
        entity: String,
        attribute: String,
        expected: AttributeType,
        found: String,
    },

    #[error("entity data must be a JSON object, found {0}")]
    NotAnObject(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
