//! Unit of work tying the loader, persister and identity cache together.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::trace;

use crate::{
    DefaultDmlQueryBuilder, Entity, EntityKey, EntityLoader, EntityPersister, JdbcTemplate,
    Managed, PersistenceCache, PersistenceConfig, PersistenceError, PersistentClassRegistry,
    PrimaryKey,
};

/// One unit of work against a [`JdbcTemplate`].
///
/// Instances found or persisted through the manager are held in its
/// [`PersistenceCache`], so repeated lookups of the same key return the same
/// shared instance until [`clear`](Self::clear) is called or the manager is
/// dropped. The manager is meant to be owned by a single thread.
#[derive(Debug)]
pub struct EntityManager<'r, J> {
    jdbc: J,
    registry: &'r PersistentClassRegistry,
    builder: DefaultDmlQueryBuilder,
    show_sql: bool,
    cache: PersistenceCache,
}

impl<'r, J: JdbcTemplate> EntityManager<'r, J> {
    pub fn new(jdbc: J, registry: &'r PersistentClassRegistry, config: &PersistenceConfig) -> Self {
        Self {
            jdbc,
            registry,
            builder: config.query_builder(),
            show_sql: config.show_sql,
            cache: PersistenceCache::new(),
        }
    }

    fn loader(&self) -> EntityLoader<'_, J> {
        EntityLoader::new(&self.jdbc, self.registry, self.builder.clone()).show_sql(self.show_sql)
    }

    fn persister(&self) -> EntityPersister<'_, J> {
        EntityPersister::new(&self.jdbc, self.registry, self.builder.clone())
            .show_sql(self.show_sql)
    }

    fn key_of<T: Entity>(&self, entity: &T) -> Result<Option<EntityKey>, PersistenceError> {
        let class = self.registry.persistent_class::<T>()?;
        Ok(class
            .primary_key_value(entity)?
            .map(|id| EntityKey::new(class.type_id(), class.type_name(), id)))
    }

    fn require_key<T: Entity>(&self, entity: &T) -> Result<EntityKey, PersistenceError> {
        self.key_of(entity)?
            .ok_or_else(|| PersistenceError::MissingPrimaryKeyValue {
                entity: std::any::type_name::<T>().to_string(),
            })
    }

    /// Find the entity with primary key `id`, from the cache when present.
    pub fn find<T: Entity>(
        &mut self,
        id: impl Into<PrimaryKey>,
    ) -> Result<Option<Managed<T>>, PersistenceError> {
        let key = EntityKey::of::<T>(id);
        if let Some(entity) = self.cache.get::<T>(&key) {
            trace!(%key, "identity cache hit");
            return Ok(Some(entity));
        }

        let Some(entity) = self.loader().load::<T>(key.id().clone())? else {
            return Ok(None);
        };
        let entity = Rc::new(RefCell::new(entity));
        self.cache.add(key, entity.clone());
        Ok(Some(entity))
    }

    /// Insert `entity` and return it as a managed instance.
    ///
    /// Instances whose key is generated by the database are not cached, since
    /// the key is unknown after the insert.
    pub fn persist<T: Entity>(&mut self, entity: T) -> Result<Managed<T>, PersistenceError> {
        self.persister().insert(&entity)?;
        let key = if self.registry.persistent_class::<T>()?.primary_key().generated {
            None
        } else {
            self.key_of(&entity)?
        };
        let entity = Rc::new(RefCell::new(entity));
        if let Some(key) = key {
            self.cache.add(key, entity.clone());
        }
        Ok(entity)
    }

    /// Write the current state of a managed instance.
    pub fn merge<T: Entity>(&mut self, entity: &Managed<T>) -> Result<u64, PersistenceError> {
        let entity = entity.borrow();
        let affected = self.persister().update(&*entity)?;
        let key = self.require_key(&*entity)?;
        drop(entity);
        trace!(%key, "merged");
        Ok(affected)
    }

    /// Delete a managed instance and evict it from the cache.
    pub fn remove<T: Entity>(&mut self, entity: &Managed<T>) -> Result<u64, PersistenceError> {
        let (affected, key) = {
            let entity = entity.borrow();
            (self.persister().delete(&*entity)?, self.require_key(&*entity)?)
        };
        self.cache.remove(&key);
        Ok(affected)
    }

    /// Populate a lazy one-to-many field of a managed instance.
    pub fn load_collection<T: Entity>(
        &mut self,
        entity: &Managed<T>,
        field_name: &str,
    ) -> Result<usize, PersistenceError> {
        let mut entity = entity.borrow_mut();
        self.loader().load_collection(&mut *entity, field_name)
    }

    pub fn contains<T: Entity>(&self, id: impl Into<PrimaryKey>) -> bool {
        self.cache.contains(&EntityKey::of::<T>(id))
    }

    /// End the unit of work: drop every cached instance.
    pub fn clear(&mut self) {
        self.cache.clear();
    }

    pub fn jdbc(&self) -> &J {
        &self.jdbc
    }
}
