//! Model registry for ecrule.
//!
//! - [`ModelRegistry`]: a cloneable handle onto a name → [`Model`] map.
//!   Handles are passed explicitly; [`ModelRegistry::global`] exists for
//!   callers that want a single process-wide registry.
//! - [`ResourceLocator`]: maps a model name to its `.eomodel` resource.
//! - [`ModelLoader`]: loads batches of models by name and reports which ones
//!   it actually loaded, so the caller can unload exactly those later.
//!
//! [`Model`]: ecrule_model::Model

mod error;
mod loader;
mod locator;
mod registry;

pub use error::{RegistryError, RegistryResult};
pub use loader::ModelLoader;
pub use locator::ResourceLocator;
pub use registry::ModelRegistry;
