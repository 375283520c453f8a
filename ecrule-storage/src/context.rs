use crate::{ChangeSet, MemoryObjectStore, ObjectStore, SqliteObjectStore, StorageError, StorageResult};
use ecrule_model::{Entity, EntityDefinition, ModelError};
use ecrule_registry::ModelRegistry;
use ecrule_types::{CallLog, ContextId, EntityId, LifecycleEvent};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info};

/// A unit of work over the objects of the models in a [`ModelRegistry`].
///
/// Reads see committed objects overlaid with this context's pending changes.
/// Mutations require the context to be locked and stay pending until
/// [`save_changes`](Self::save_changes); [`revert`](Self::revert) discards
/// them. After [`dispose`](Self::dispose) every operation except the lock
/// counters fails with [`StorageError::Disposed`].
pub struct EditingContext {
    id: ContextId,
    registry: ModelRegistry,
    store: Box<dyn ObjectStore>,
    changes: ChangeSet,
    lock_count: usize,
    unlock_calls: usize,
    disposed: bool,
    call_log: Option<CallLog>,
}

impl EditingContext {
    pub fn new(registry: ModelRegistry, store: impl ObjectStore + 'static) -> Self {
        Self {
            id: ContextId::new(),
            registry,
            store: Box::new(store),
            changes: ChangeSet::default(),
            lock_count: 0,
            unlock_calls: 0,
            disposed: false,
            call_log: None,
        }
    }

    /// A context over its own in-memory SQLite database.
    pub fn temporary(registry: ModelRegistry) -> StorageResult<Self> {
        Ok(Self::new(registry, SqliteObjectStore::open_in_memory()?))
    }

    /// A context whose saves only reach an in-process map.
    pub fn mock(registry: ModelRegistry) -> Self {
        Self::new(registry, MemoryObjectStore::new())
    }

    /// Records lifecycle operations into `log`.
    #[must_use]
    pub fn with_call_log(mut self, log: CallLog) -> Self {
        self.call_log = Some(log);
        self
    }

    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    fn record(&self, event: LifecycleEvent) {
        if let Some(log) = &self.call_log {
            log.record(event);
        }
    }

    fn ensure_open(&self) -> StorageResult<()> {
        if self.disposed {
            return Err(StorageError::Disposed(self.id));
        }
        Ok(())
    }

    fn ensure_writable(&self) -> StorageResult<()> {
        self.ensure_open()?;
        if !self.is_locked() {
            return Err(StorageError::NotLocked(self.id));
        }
        Ok(())
    }

    fn definition(&self, entity_name: &str) -> StorageResult<EntityDefinition> {
        self.registry
            .entity_named(entity_name)
            .ok_or_else(|| StorageError::UnknownEntity(entity_name.to_string()))
    }

    // ── Locking ──────────────────────────────────────────────────────

    pub fn lock(&mut self) -> StorageResult<()> {
        self.record(LifecycleEvent::Lock);
        self.ensure_open()?;
        self.lock_count += 1;
        debug!(context = %self.id, holds = self.lock_count, "Editing context locked");
        Ok(())
    }

    /// Releases one hold. Every call is counted; calls with no hold
    /// outstanding leave the lock state unchanged.
    pub fn unlock(&mut self) {
        self.record(LifecycleEvent::Unlock);
        self.unlock_calls += 1;
        if self.lock_count > 0 {
            self.lock_count -= 1;
            debug!(context = %self.id, holds = self.lock_count, "Editing context unlocked");
        } else {
            debug!(context = %self.id, "Unlock without an outstanding lock");
        }
    }

    pub fn is_locked(&self) -> bool {
        self.lock_count > 0
    }

    pub fn lock_count(&self) -> usize {
        self.lock_count
    }

    /// Total number of `unlock` calls, including the one made by `dispose`.
    pub fn unlock_calls(&self) -> usize {
        self.unlock_calls
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    // ── Objects ──────────────────────────────────────────────────────

    /// Creates a new object of `entity_name` with every attribute null.
    pub fn create_object(&mut self, entity_name: &str) -> StorageResult<EntityId> {
        self.ensure_writable()?;
        let entity = self.definition(entity_name)?.instantiate();
        let id = entity.id;
        self.changes.inserted.insert(id, entity);
        Ok(id)
    }

    /// Registers an externally built object as a pending insert.
    pub fn insert_object(&mut self, entity: Entity) -> StorageResult<EntityId> {
        self.ensure_writable()?;
        self.definition(&entity.entity_name)?;
        let id = entity.id;
        if self.changes.inserted.contains_key(&id) || self.store.fetch(&id)?.is_some() {
            return Err(StorageError::DuplicateObject(id));
        }
        self.changes.inserted.insert(id, entity);
        Ok(id)
    }

    /// Current state of an object as seen through this context.
    pub fn object(&self, id: &EntityId) -> StorageResult<Option<Entity>> {
        self.ensure_open()?;
        match self.changes.pending(id) {
            Some(pending) => Ok(pending.cloned()),
            None => self.store.fetch(id),
        }
    }

    /// Sets one attribute of an object.
    ///
    /// The attribute must be declared by the object's entity; its value is
    /// type-checked when changes are saved.
    pub fn set_value(
        &mut self,
        id: &EntityId,
        attribute: &str,
        value: impl Into<Value>,
    ) -> StorageResult<()> {
        self.ensure_writable()?;
        let mut entity = self.object(id)?.ok_or(StorageError::NotFound(*id))?;
        if self.definition(&entity.entity_name)?.attribute(attribute).is_none() {
            return Err(ModelError::UnknownAttribute {
                entity: entity.entity_name,
                attribute: attribute.to_string(),
            }
            .into());
        }
        entity.set(attribute, value);
        self.stage_update(entity);
        Ok(())
    }

    /// Replaces an existing object wholesale. An object cannot change its
    /// entity.
    pub fn update_object(&mut self, entity: Entity) -> StorageResult<()> {
        self.ensure_writable()?;
        let current = self.object(&entity.id)?.ok_or(StorageError::NotFound(entity.id))?;
        if current.entity_name != entity.entity_name {
            return Err(ModelError::EntityMismatch {
                expected: current.entity_name,
                found: entity.entity_name,
            }
            .into());
        }
        self.stage_update(entity);
        Ok(())
    }

    fn stage_update(&mut self, entity: Entity) {
        match self.changes.inserted.get_mut(&entity.id) {
            Some(inserted) => *inserted = entity,
            None => {
                self.changes.updated.insert(entity.id, entity);
            }
        }
    }

    pub fn delete_object(&mut self, id: &EntityId) -> StorageResult<()> {
        self.ensure_writable()?;
        if self.changes.inserted.remove(id).is_some() {
            return Ok(());
        }
        if self.object(id)?.is_none() {
            return Err(StorageError::NotFound(*id));
        }
        self.changes.updated.remove(id);
        self.changes.deleted.insert(*id);
        Ok(())
    }

    /// Every object of `entity_name` visible to this context, ordered by id.
    pub fn fetch_all(&self, entity_name: &str) -> StorageResult<Vec<Entity>> {
        self.ensure_open()?;
        self.definition(entity_name)?;

        let mut objects: BTreeMap<EntityId, Entity> = self
            .store
            .fetch_all(entity_name)?
            .into_iter()
            .map(|e| (e.id, e))
            .collect();
        for id in &self.changes.deleted {
            objects.remove(id);
        }
        for entity in self.changes.written() {
            if entity.entity_name == entity_name {
                objects.insert(entity.id, entity.clone());
            }
        }
        Ok(objects.into_values().collect())
    }

    // ── Unit of work ─────────────────────────────────────────────────

    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    pub fn pending_changes(&self) -> &ChangeSet {
        &self.changes
    }

    /// Validates and commits every pending change. On failure nothing is
    /// committed and the pending changes are kept.
    pub fn save_changes(&mut self) -> StorageResult<()> {
        self.record(LifecycleEvent::SaveChanges);
        self.ensure_writable()?;
        for entity in self.changes.written() {
            self.definition(&entity.entity_name)?.validate(entity)?;
        }
        self.store.commit(&self.changes)?;
        info!(context = %self.id, changes = self.changes.len(), "Saved changes");
        self.changes.clear();
        Ok(())
    }

    /// Discards every pending change.
    pub fn revert(&mut self) -> StorageResult<()> {
        self.record(LifecycleEvent::Revert);
        self.ensure_open()?;
        if self.has_changes() {
            debug!(context = %self.id, changes = self.changes.len(), "Reverting pending changes");
        }
        self.changes.clear();
        Ok(())
    }

    /// Releases the context: unlocks once, drops pending changes and closes
    /// the store. Disposing twice is a no-op.
    pub fn dispose(&mut self) -> StorageResult<()> {
        if self.disposed {
            debug!(context = %self.id, "Editing context already disposed");
            return Ok(());
        }
        self.record(LifecycleEvent::Dispose);
        self.unlock();
        self.changes.clear();
        self.disposed = true;
        info!(context = %self.id, "Editing context disposed");
        self.store.close()
    }
}

impl fmt::Debug for EditingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditingContext")
            .field("id", &self.id)
            .field("lock_count", &self.lock_count)
            .field("unlock_calls", &self.unlock_calls)
            .field("pending_changes", &self.changes.len())
            .field("disposed", &self.disposed)
            .finish()
    }
}
