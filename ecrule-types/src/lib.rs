//! Core type definitions for ecrule.
//!
//! This crate defines the small, framework-agnostic types used throughout
//! the workspace:
//! - Entity and editing-context identifiers (UUID v7)
//! - The lifecycle call log used to verify callback ordering in tests

mod call_log;
mod ids;

pub use call_log::{CallLog, LifecycleEvent};
pub use ids::{ContextId, EntityId};
