//! Materialization of result rows into entity instances.

use std::marker::PhantomData;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::trace;

use crate::{
    CollectionPersistentClass, Entity, Persistable, PersistenceError, PersistentClass, PrimaryKey,
    ResultSet, RowMapper,
};

/// Label of a cell in a result row.
pub fn column_label(table_name: &str, column_name: &str) -> String {
    format!("{table_name}.{column_name}")
}

fn read_cell(
    row: &dyn ResultSet,
    table_name: &str,
    column_name: &str,
) -> Result<crate::Value, PersistenceError> {
    let label = column_label(table_name, column_name);
    row.get_object(&label)
        .map_err(|e| PersistenceError::data_access(label, e))
}

/// Assign every column of `class` on `entity` from the row's
/// `table.column` cells.
pub fn set_entity_fields(
    class: &PersistentClass,
    entity: &mut dyn Persistable,
    row: &dyn ResultSet,
) -> Result<(), PersistenceError> {
    for column in class.columns() {
        let value = read_cell(row, class.table_name(), &column.name)?;
        entity
            .set_field_value(&column.field_name, value)
            .map_err(|e| {
                PersistenceError::data_access(column_label(class.table_name(), &column.name), e)
            })?;
    }
    Ok(())
}

/// Maps a row to a type-erased instance of a persistent class.
#[derive(Debug, Clone)]
pub struct EntityRowMapper {
    class: Arc<PersistentClass>,
}

impl EntityRowMapper {
    pub fn new(class: Arc<PersistentClass>) -> Self {
        Self { class }
    }
}

impl RowMapper<Box<dyn Persistable>> for EntityRowMapper {
    fn map_row(&self, row: &dyn ResultSet) -> Result<Box<dyn Persistable>, PersistenceError> {
        let mut instance = self.class.create_instance()?;
        set_entity_fields(&self.class, instance.as_mut(), row)?;
        Ok(instance)
    }
}

/// Maps each row to one instance of `T`.
#[derive(Debug, Clone)]
pub struct SingleEntityRowMapper<T> {
    inner: EntityRowMapper,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Entity> SingleEntityRowMapper<T> {
    pub fn new(class: Arc<PersistentClass>) -> Self {
        Self {
            inner: EntityRowMapper::new(class),
            _marker: PhantomData,
        }
    }
}

impl<T: Entity> RowMapper<T> for SingleEntityRowMapper<T> {
    fn map_row(&self, row: &dyn ResultSet) -> Result<T, PersistenceError> {
        let instance = self.inner.map_row(row)?;
        self.inner.class.downcast::<T>(instance)
    }
}

/// One physical row of an eager LEFT JOIN: an owner and at most one element.
pub struct JoinedRow<T> {
    pub key: PrimaryKey,
    pub owner: T,
    pub element: Option<Box<dyn Persistable>>,
}

/// Maps joined rows to owner/element pairs.
///
/// Rows whose owner key is null map to `None`; rows whose element key is null
/// (an owner without elements) carry no element.
#[derive(Debug, Clone)]
pub struct CollectionEntityRowMapper<T> {
    owner: Arc<PersistentClass>,
    collection: Arc<CollectionPersistentClass>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Entity> CollectionEntityRowMapper<T> {
    pub fn new(owner: Arc<PersistentClass>, collection: Arc<CollectionPersistentClass>) -> Self {
        Self {
            owner,
            collection,
            _marker: PhantomData,
        }
    }
}

impl<T: Entity> RowMapper<Option<JoinedRow<T>>> for CollectionEntityRowMapper<T> {
    fn map_row(&self, row: &dyn ResultSet) -> Result<Option<JoinedRow<T>>, PersistenceError> {
        let owner_table = self.owner.table_name();
        let owner_key = read_cell(row, owner_table, &self.owner.primary_key().name)?;
        let Some(key) = PrimaryKey::from_value(&owner_key).map_err(|e| {
            PersistenceError::data_access(
                column_label(owner_table, &self.owner.primary_key().name),
                e,
            )
        })?
        else {
            return Ok(None);
        };

        let mut owner = self.owner.create_instance()?;
        set_entity_fields(&self.owner, owner.as_mut(), row)?;
        let owner = self.owner.downcast::<T>(owner)?;

        let element_class = self.collection.element();
        let element_key = read_cell(
            row,
            element_class.table_name(),
            &element_class.primary_key().name,
        )?;
        let element = if element_key.is_null() {
            None
        } else {
            let mut element = element_class.create_instance()?;
            set_entity_fields(element_class, element.as_mut(), row)?;
            Some(element)
        };

        Ok(Some(JoinedRow {
            key,
            owner,
            element,
        }))
    }
}

/// Collapse the fan-out of a LEFT JOIN into one owner per primary key.
///
/// Owners are emitted in first-seen order; each owner receives its elements
/// in row order on the collection field `field_name`.
pub fn collapse_joined_rows<T: Entity>(
    rows: impl IntoIterator<Item = Option<JoinedRow<T>>>,
    field_name: &str,
) -> Result<Vec<T>, PersistenceError> {
    let mut owners: IndexMap<PrimaryKey, T> = IndexMap::new();
    for row in rows.into_iter().flatten() {
        let JoinedRow {
            key,
            owner,
            element,
        } = row;
        if owners.contains_key(&key) {
            trace!(%key, "collapsing duplicate joined owner row");
        }
        let owner = owners.entry(key).or_insert(owner);
        if let Some(element) = element {
            owner.attach(field_name, element)?;
        }
    }
    Ok(owners.into_values().collect())
}
