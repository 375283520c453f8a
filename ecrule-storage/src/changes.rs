use ecrule_model::Entity;
use ecrule_types::EntityId;
use std::collections::{BTreeMap, BTreeSet};

/// Pending changes of an editing context.
///
/// An id appears in at most one of the three collections: deleting an
/// inserted object simply drops the insert, and updating an inserted object
/// rewrites the insert.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    pub inserted: BTreeMap<EntityId, Entity>,
    pub updated: BTreeMap<EntityId, Entity>,
    pub deleted: BTreeSet<EntityId>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.inserted.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inserted.len() + self.updated.len() + self.deleted.len()
    }

    pub fn clear(&mut self) {
        self.inserted.clear();
        self.updated.clear();
        self.deleted.clear();
    }

    /// Pending state of `id`: `Some(Some(_))` if inserted or updated,
    /// `Some(None)` if deleted, `None` if untouched.
    pub fn pending(&self, id: &EntityId) -> Option<Option<&Entity>> {
        if self.deleted.contains(id) {
            return Some(None);
        }
        self.inserted
            .get(id)
            .or_else(|| self.updated.get(id))
            .map(Some)
    }

    /// Inserted objects followed by updated ones.
    pub fn written(&self) -> impl Iterator<Item = &Entity> {
        self.inserted.values().chain(self.updated.values())
    }
}
