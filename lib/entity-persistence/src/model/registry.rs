//! Process-lifetime cache of derived metadata.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use tracing::{debug, trace};

use crate::{
    CollectionPersistentClass, Entity, EntityDeclaration, FieldDeclaration, PersistenceError,
    PersistentClass,
};

/// Registry of [`PersistentClass`] metadata keyed by Rust type.
///
/// Metadata is derived on first access and kept for the lifetime of the
/// registry. Entries are immutable once inserted, so concurrent readers need
/// no further coordination; two threads racing on first access derive the
/// same metadata and one result wins.
#[derive(Debug, Default)]
pub struct PersistentClassRegistry {
    classes: RwLock<HashMap<TypeId, Arc<PersistentClass>>>,
    collections: RwLock<HashMap<String, Arc<CollectionPersistentClass>>>,
}

static GLOBAL: OnceLock<PersistentClassRegistry> = OnceLock::new();

impl PersistentClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> &'static PersistentClassRegistry {
        GLOBAL.get_or_init(PersistentClassRegistry::new)
    }

    /// Metadata for `T`, derived and registered on first access.
    pub fn persistent_class<T: Entity>(&self) -> Result<Arc<PersistentClass>, PersistenceError> {
        if let Some(class) = self.get(TypeId::of::<T>()) {
            return Ok(class);
        }
        self.register(&T::declaration())
    }

    /// Derive and register a declaration together with the element classes
    /// of its one-to-many fields.
    pub fn register(
        &self,
        declaration: &EntityDeclaration,
    ) -> Result<Arc<PersistentClass>, PersistenceError> {
        if let Some(class) = self.get(declaration.type_id) {
            return Ok(class);
        }

        let class = Arc::new(PersistentClass::derive(declaration)?);
        self.classes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(declaration.type_id, class.clone());

        // Visible during element registration for self-references; withdrawn
        // if any element fails.
        let collections = match self.derive_collections(declaration, &class) {
            Ok(collections) => collections,
            Err(e) => {
                self.classes
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove(&declaration.type_id);
                return Err(e);
            }
        };

        let mut registered = self
            .collections
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        for collection in collections {
            let join_field = collection.join_field();
            debug!(
                owner = class.type_name(),
                element = join_field.element_type_name,
                join_column = %join_field.join_column_name,
                "registered collection persistent class"
            );
            registered.insert(join_field.element_type_name.to_string(), collection);
        }

        Ok(class)
    }

    fn derive_collections(
        &self,
        declaration: &EntityDeclaration,
        class: &PersistentClass,
    ) -> Result<Vec<Arc<CollectionPersistentClass>>, PersistenceError> {
        let mut collections = Vec::new();
        for field in &declaration.fields {
            let FieldDeclaration::OneToMany(association) = field else {
                continue;
            };
            let element = self.register(&(association.element)())?;
            if let Some(join_field) = class.join_field(association.field_name) {
                collections.push(Arc::new(CollectionPersistentClass::new(
                    element,
                    join_field.clone(),
                )));
            }
        }
        Ok(collections)
    }

    /// Look up already-registered metadata by fully qualified type name.
    pub fn persistent_class_by_name(
        &self,
        type_name: &str,
    ) -> Result<Arc<PersistentClass>, PersistenceError> {
        self.classes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .find(|class| class.type_name() == type_name)
            .cloned()
            .ok_or_else(|| PersistenceError::UnregisteredEntity {
                entity: type_name.to_string(),
            })
    }

    /// Element metadata for a registered one-to-many association.
    ///
    /// Collections are keyed by element type only. When several owners share
    /// an element type, the returned `join_field` is that of the owner
    /// registered last; callers needing a specific owner's join column read
    /// it from that owner's [`EntityJoinField`](crate::EntityJoinField).
    pub fn collection_persistent_class(
        &self,
        element_type_name: &str,
    ) -> Result<Arc<CollectionPersistentClass>, PersistenceError> {
        self.collections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(element_type_name)
            .cloned()
            .ok_or_else(|| PersistenceError::UnregisteredCollection {
                element: element_type_name.to_string(),
            })
    }

    /// Drop all registered metadata.
    pub fn reset(&self) {
        self.classes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.collections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn get(&self, type_id: TypeId) -> Option<Arc<PersistentClass>> {
        let class = self
            .classes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&type_id)
            .cloned();
        if let Some(class) = &class {
            trace!(entity = class.type_name(), "persistent class cache hit");
        }
        class
    }
}
