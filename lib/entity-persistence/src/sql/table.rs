//! Rendering-ready projection of entity metadata.

use indexmap::IndexMap;

use crate::{
    Column, Entity, Persistable, PersistenceError, PersistentClass, PersistentClassRegistry, Value,
};

/// A table with its columns, optionally bound to an instance's values and
/// carrying at most one joined table.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: String,
    columns: Vec<Column>,
    primary_key: usize,
    values: IndexMap<String, Value>,
    join: Option<Box<JoinTable>>,
}

/// A table joined to its owner with `owner.pk = joined.join_column`.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinTable {
    pub table: Table,
    pub join_column: String,
}

impl Table {
    pub fn from_class(class: &PersistentClass) -> Self {
        let columns = class.columns().to_vec();
        let primary_key = columns
            .iter()
            .position(|column| column.primary_key)
            .unwrap_or_default();
        Self {
            name: class.table_name().to_string(),
            columns,
            primary_key,
            values: IndexMap::new(),
            join: None,
        }
    }

    /// Project `class` and bind the column values of `entity`.
    pub fn with_values(
        class: &PersistentClass,
        entity: &dyn Persistable,
    ) -> Result<Self, PersistenceError> {
        let mut table = Self::from_class(class);
        table.values = class.extract_values(entity)?;
        Ok(table)
    }

    /// Attach `joined` as this table's single LEFT JOIN.
    ///
    /// A joined table may not carry a join of its own.
    pub fn join(
        mut self,
        joined: Table,
        join_column: impl Into<String>,
    ) -> Result<Self, PersistenceError> {
        if joined.join.is_some() {
            return Err(PersistenceError::NestedJoin { table: joined.name });
        }
        self.join = Some(Box::new(JoinTable {
            table: joined,
            join_column: join_column.into(),
        }));
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn primary_key(&self) -> &Column {
        &self.columns[self.primary_key]
    }

    pub fn column(&self, column_name: &str) -> Result<&Column, PersistenceError> {
        self.columns
            .iter()
            .find(|column| column.name == column_name)
            .ok_or_else(|| PersistenceError::UnknownColumn {
                table: self.name.clone(),
                column: column_name.to_string(),
            })
    }

    /// Bound value of a column, if the table was created from an instance.
    pub fn value(&self, column_name: &str) -> Option<&Value> {
        self.values.get(column_name)
    }

    pub fn joined(&self) -> Option<&JoinTable> {
        self.join.as_deref()
    }
}

/// Builds [`Table`]s from registered metadata.
#[derive(Debug, Clone, Copy)]
pub struct TableBinder<'a> {
    registry: &'a PersistentClassRegistry,
}

impl<'a> TableBinder<'a> {
    pub fn new(registry: &'a PersistentClassRegistry) -> Self {
        Self { registry }
    }

    pub fn create_table<T: Entity>(&self) -> Result<Table, PersistenceError> {
        Ok(Table::from_class(&*self.registry.persistent_class::<T>()?))
    }

    /// Table for `entity`'s type with its current values bound.
    pub fn create_table_for<T: Entity>(&self, entity: &T) -> Result<Table, PersistenceError> {
        Table::with_values(&*self.registry.persistent_class::<T>()?, entity)
    }

    /// Table for `T` joined to the element table of its eager association.
    pub fn create_joined_table<T: Entity>(&self) -> Result<Table, PersistenceError> {
        self.create_joined_table_for_class(&*self.registry.persistent_class::<T>()?)
    }

    pub fn create_joined_table_for_class(
        &self,
        class: &PersistentClass,
    ) -> Result<Table, PersistenceError> {
        let table = Table::from_class(class);
        match class.eager_join_field() {
            Some(join_field) => {
                let collection = self
                    .registry
                    .collection_persistent_class(join_field.element_type_name)?;
                let joined = Table::from_class(collection.element());
                table.join(joined, join_field.join_column_name.clone())
            }
            None => Ok(table),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ColumnDeclaration, EntityDeclaration};

    struct Note;

    fn note() -> PersistentClass {
        PersistentClass::derive(
            &EntityDeclaration::of::<Note>("Note")
                .table("notes")
                .field(ColumnDeclaration::new("id", "i64").id())
                .field(ColumnDeclaration::new("body", "String")),
        )
        .unwrap()
    }

    #[test]
    fn joined_table_may_not_nest() {
        let inner = Table::from_class(&note())
            .join(Table::from_class(&note()), "note_id")
            .unwrap();

        let err = Table::from_class(&note()).join(inner, "note_id").unwrap_err();
        assert!(matches!(err, PersistenceError::NestedJoin { .. }));
    }

    #[test]
    fn unknown_column_is_reported() {
        let table = Table::from_class(&note());
        assert_eq!(table.column("body").unwrap().field_name, "body");
        assert_eq!(
            table.column("title").unwrap_err().to_string(),
            "unknown column title on table notes"
        );
    }
}
