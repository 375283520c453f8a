//! Model definitions for ecrule.
//!
//! Defines the schema and data types every other crate in the workspace
//! depends on:
//! - [`Model`]: a named schema definition loaded from a `.eomodel` resource
//! - [`EntityDefinition`] / [`Attribute`]: an entity's declared attributes
//! - [`Entity`]: a persistent object: id, entity name, JSON attribute values
//!
//! Models are plain data. Loading them into a shared registry is the job of
//! `ecrule-registry`; tracking changes to entities is the job of
//! `ecrule-storage`.

mod entity;
mod error;
mod model;

pub use entity::Entity;
pub use error::{ModelError, ModelResult};
pub use model::{Attribute, AttributeType, EntityDefinition, Model, MODEL_EXTENSION};
