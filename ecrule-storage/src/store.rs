use crate::{ChangeSet, StorageResult};
use ecrule_model::Entity;
use ecrule_types::EntityId;

/// Committed storage behind an [`EditingContext`](crate::EditingContext).
///
/// Stores only see committed state; pending changes stay in the context
/// until they are saved.
pub trait ObjectStore: Send {
    /// Every committed object of `entity_name`, ordered by id.
    fn fetch_all(&self, entity_name: &str) -> StorageResult<Vec<Entity>>;

    fn fetch(&self, id: &EntityId) -> StorageResult<Option<Entity>>;

    /// Applies a change set atomically: either every change lands or none.
    fn commit(&mut self, changes: &ChangeSet) -> StorageResult<()>;

    /// Releases the store's resources. Later calls fail with
    /// [`StorageError::Closed`](crate::StorageError::Closed).
    fn close(&mut self) -> StorageResult<()>;
}
