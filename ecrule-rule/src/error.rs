//! Error types for the editing context rule.

use crate::RuleState;
use ecrule_registry::RegistryError;
use ecrule_storage::StorageError;
use thiserror::Error;

/// Result type for rule operations.
pub type RuleResult<T> = Result<T, RuleError>;

#[derive(Debug, Error)]
pub enum RuleError {
    /// Model loading failed, e.g. `Cannot load model named 'UnknownModel'`.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("cannot run {operation}() on an editing context rule that is {state}")]
    InvalidTransition {
        state: RuleState,
        operation: &'static str,
    },
}
