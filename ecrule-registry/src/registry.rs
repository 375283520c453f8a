use crate::{RegistryError, RegistryResult};
use ecrule_model::{EntityDefinition, Model};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// Name → model map shared by every editing context that uses it.
///
/// Cloning yields another handle onto the same map. Entity names are unique
/// across all registered models, so an entity can be looked up without
/// knowing which model declares it.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    models: Arc<RwLock<BTreeMap<String, Arc<Model>>>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide default registry.
    pub fn global() -> &'static ModelRegistry {
        static GLOBAL: OnceLock<ModelRegistry> = OnceLock::new();
        GLOBAL.get_or_init(ModelRegistry::new)
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, Arc<Model>>> {
        self.models.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, Arc<Model>>> {
        self.models.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn model_named(&self, name: &str) -> Option<Arc<Model>> {
        self.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    /// Registered model names, sorted.
    pub fn model_names(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Registers a model.
    ///
    /// Fails if a model with the same name is present or if one of its
    /// entities is already declared by another registered model.
    pub fn add_model(&self, model: Model) -> RegistryResult<Arc<Model>> {
        model.check().map_err(|source| RegistryError::InvalidModel {
            name: model.name.clone(),
            source,
        })?;

        let mut models = self.write();
        if models.contains_key(&model.name) {
            return Err(RegistryError::DuplicateModel(model.name));
        }
        for entity in model.entity_names() {
            if let Some(existing) = models.values().find(|m| m.entity_named(entity).is_some()) {
                return Err(RegistryError::DuplicateEntity {
                    model: model.name.clone(),
                    entity: entity.to_string(),
                    existing: existing.name.clone(),
                });
            }
        }

        let model = Arc::new(model);
        models.insert(model.name.clone(), Arc::clone(&model));
        debug!(model = %model.name, entities = model.entities.len(), "Model registered");
        Ok(model)
    }

    /// Reads the model resource at `path` and registers it.
    pub fn add_model_with_path(&self, path: &Path) -> RegistryResult<Arc<Model>> {
        let model = Model::from_path(path).map_err(|source| RegistryError::InvalidModel {
            name: path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
            source,
        })?;
        self.add_model(model)
    }

    /// Removes a model by name. Returns `None` if it was not registered.
    pub fn remove_model(&self, name: &str) -> Option<Arc<Model>> {
        let removed = self.write().remove(name);
        if removed.is_some() {
            debug!(model = %name, "Model removed");
        }
        removed
    }

    /// Looks an entity definition up across every registered model.
    pub fn entity_named(&self, entity: &str) -> Option<EntityDefinition> {
        self.read()
            .values()
            .find_map(|m| m.entity_named(entity).cloned())
    }

    /// Name of the model that declares `entity`.
    pub fn model_for_entity(&self, entity: &str) -> Option<String> {
        self.read()
            .values()
            .find(|m| m.entity_named(entity).is_some())
            .map(|m| m.name.clone())
    }
}
