//! Batch loading and unloading of models by name.

use crate::{ModelRegistry, RegistryError, RegistryResult, ResourceLocator};
use ecrule_types::{CallLog, LifecycleEvent};
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::{debug, info};

/// Loads models into a [`ModelRegistry`] from resources found by a
/// [`ResourceLocator`], remembering nothing itself: callers keep the set
/// returned by [`ensure_loaded`](Self::ensure_loaded) and hand it back to
/// [`unload`](Self::unload) when they are done.
#[derive(Debug, Clone)]
pub struct ModelLoader {
    registry: ModelRegistry,
    locator: ResourceLocator,
    call_log: Option<CallLog>,
}

impl ModelLoader {
    pub fn new(registry: ModelRegistry, locator: ResourceLocator) -> Self {
        Self {
            registry,
            locator,
            call_log: None,
        }
    }

    /// Records `LoadModel` / `UnloadModel` events into `log`.
    #[must_use]
    pub fn with_call_log(mut self, log: CallLog) -> Self {
        self.call_log = Some(log);
        self
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn locator(&self) -> &ResourceLocator {
        &self.locator
    }

    fn record(&self, event: LifecycleEvent) {
        if let Some(log) = &self.call_log {
            log.record(event);
        }
    }

    /// Makes sure every named model is registered.
    ///
    /// All names are resolved before anything is loaded: the first name
    /// without a resource fails the whole batch with
    /// [`RegistryError::ModelNotFound`] and leaves the registry untouched.
    /// Models already present are left alone. If loading a resolved resource
    /// fails, the models this call already loaded are removed again.
    ///
    /// Returns the names this call actually loaded.
    pub fn ensure_loaded<S: AsRef<str>>(&self, names: &[S]) -> RegistryResult<BTreeSet<String>> {
        let mut resolved: Vec<(&str, PathBuf)> = Vec::with_capacity(names.len());
        for name in names.iter().map(AsRef::as_ref) {
            if resolved.iter().any(|(seen, _)| *seen == name) {
                continue;
            }
            let path = self
                .locator
                .resolve(name)
                .ok_or_else(|| RegistryError::ModelNotFound(name.to_string()))?;
            resolved.push((name, path));
        }

        let mut loaded = BTreeSet::new();
        for (name, path) in resolved {
            if self.registry.contains(name) {
                debug!(model = %name, "Model already registered, not loading");
                continue;
            }
            if let Err(err) = self.registry.add_model_with_path(&path) {
                self.unload(&loaded);
                return Err(err);
            }
            info!(model = %name, path = %path.display(), "Model loaded");
            self.record(LifecycleEvent::LoadModel(name.to_string()));
            loaded.insert(name.to_string());
        }
        Ok(loaded)
    }

    /// Removes each named model from the registry; absent names are skipped.
    pub fn unload(&self, names: &BTreeSet<String>) {
        for name in names {
            if self.registry.remove_model(name).is_some() {
                info!(model = %name, "Model unloaded");
                self.record(LifecycleEvent::UnloadModel(name.clone()));
            } else {
                debug!(model = %name, "Model not registered, nothing to unload");
            }
        }
    }
}
