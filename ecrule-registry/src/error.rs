//! Error types for the model registry.

use ecrule_model::ModelError;
use thiserror::Error;

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

#[derive(Debug, Error)]
pub enum RegistryError {
    /// No resource could be resolved for the requested model name.
    #[error("Cannot load model named '{0}'")]
    ModelNotFound(String),

    #[error("model '{0}' is already registered")]
    DuplicateModel(String),

    #[error("entity '{entity}' of model '{model}' is already declared by model '{existing}'")]
    DuplicateEntity {
        model: String,
        entity: String,
        existing: String,
    },

    /// A resource was found but could not be read or parsed.
    #[error("failed to load model '{name}': {source}")]
    InvalidModel {
        name: String,
        #[source]
        source: ModelError,
    },
}
