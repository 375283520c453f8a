use crate::{ChangeSet, ObjectStore, StorageError, StorageResult};
use ecrule_model::Entity;
use ecrule_types::EntityId;
use std::collections::BTreeMap;

/// Object store backed by a map; nothing ever reaches a database.
#[derive(Debug)]
pub struct MemoryObjectStore {
    objects: Option<BTreeMap<EntityId, Entity>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self {
            objects: Some(BTreeMap::new()),
        }
    }

    fn objects(&self) -> StorageResult<&BTreeMap<EntityId, Entity>> {
        self.objects.as_ref().ok_or(StorageError::Closed)
    }

    pub fn len(&self) -> usize {
        self.objects.as_ref().map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStore for MemoryObjectStore {
    fn fetch_all(&self, entity_name: &str) -> StorageResult<Vec<Entity>> {
        Ok(self
            .objects()?
            .values()
            .filter(|e| e.entity_name == entity_name)
            .cloned()
            .collect())
    }

    fn fetch(&self, id: &EntityId) -> StorageResult<Option<Entity>> {
        Ok(self.objects()?.get(id).cloned())
    }

    fn commit(&mut self, changes: &ChangeSet) -> StorageResult<()> {
        let objects = self.objects.as_mut().ok_or(StorageError::Closed)?;

        // Check everything before touching the map so a failed commit
        // leaves it unchanged.
        if let Some(id) = changes.inserted.keys().find(|id| objects.contains_key(id)) {
            return Err(StorageError::DuplicateObject(*id));
        }
        if let Some(id) = changes
            .updated
            .keys()
            .chain(changes.deleted.iter())
            .find(|id| !objects.contains_key(id))
        {
            return Err(StorageError::NotFound(*id));
        }

        for id in &changes.deleted {
            objects.remove(id);
        }
        for (id, entity) in changes.inserted.iter().chain(changes.updated.iter()) {
            objects.insert(*id, entity.clone());
        }
        Ok(())
    }

    fn close(&mut self) -> StorageResult<()> {
        self.objects = None;
        Ok(())
    }
}
