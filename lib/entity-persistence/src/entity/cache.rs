//! Identity map for one unit of work.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::{Entity, PrimaryKey};

/// A shared, mutable entity instance handed out by the identity cache.
pub type Managed<T> = Rc<RefCell<T>>;

/// Identity of a persistent instance: its type and primary key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityKey {
    entity_type: TypeId,
    type_name: &'static str,
    id: PrimaryKey,
}

impl EntityKey {
    pub fn new(entity_type: TypeId, type_name: &'static str, id: impl Into<PrimaryKey>) -> Self {
        Self {
            entity_type,
            type_name,
            id: id.into(),
        }
    }

    pub fn of<T: Entity>(id: impl Into<PrimaryKey>) -> Self {
        Self::new(TypeId::of::<T>(), std::any::type_name::<T>(), id)
    }

    pub fn entity_type(&self) -> TypeId {
        self.entity_type
    }

    pub fn id(&self) -> &PrimaryKey {
        &self.id
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.type_name, self.id)
    }
}

/// Keyed store of materialized instances.
///
/// No eviction and no capacity bound; the cache lives as long as its unit of
/// work. It is deliberately `!Send`.
#[derive(Default)]
pub struct PersistenceCache {
    entries: HashMap<EntityKey, Rc<dyn Any>>,
}

impl PersistenceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<T: 'static>(&mut self, key: EntityKey, entity: Managed<T>) {
        self.entries.insert(key, entity);
    }

    /// The instance stored under `key`, if it is a `T`.
    pub fn get<T: 'static>(&self, key: &EntityKey) -> Option<Managed<T>> {
        let entry = self.entries.get(key)?.clone();
        entry.downcast::<RefCell<T>>().ok()
    }

    pub fn remove(&mut self, key: &EntityKey) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn contains(&self, key: &EntityKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl fmt::Debug for PersistenceCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.keys().map(ToString::to_string))
            .finish()
    }
}
