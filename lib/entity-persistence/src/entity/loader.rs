//! Loading entities through the execution collaborator.

use std::sync::Arc;

use tracing::debug;

use crate::entity::log_statement;
use crate::{
    CollectionEntityRowMapper, DefaultDmlQueryBuilder, DmlQueryBuilder, Entity, EntityJoinField,
    EntityRowMapper, JdbcTemplate, JoinedRow, Persistable, PersistenceError, PersistentClass,
    PersistentClassRegistry, PrimaryKey, Select, SingleEntityRowMapper, Table, TableBinder, Where,
    collapse_joined_rows,
};

/// Runs rendered SELECTs and maps their rows, with or without a joined
/// collection.
#[derive(Debug)]
pub struct CollectionEntityLoader<'a, J> {
    jdbc: &'a J,
}

impl<'a, J: JdbcTemplate> CollectionEntityLoader<'a, J> {
    pub fn new(jdbc: &'a J) -> Self {
        Self { jdbc }
    }

    /// Execute a LEFT JOIN select for `owner` and its eager association.
    ///
    /// Owners are returned once each, in first-seen order, with their
    /// collections assembled.
    pub fn query_with_eager_column<T: Entity>(
        &self,
        owner: Arc<PersistentClass>,
        join_field: &EntityJoinField,
        registry: &PersistentClassRegistry,
        select_query: &str,
    ) -> Result<Vec<T>, PersistenceError> {
        let collection = registry.collection_persistent_class(join_field.element_type_name)?;
        let mapper = CollectionEntityRowMapper::<T>::new(owner, collection);
        let rows: Vec<Option<JoinedRow<T>>> = self.jdbc.query(select_query, &mapper)?;
        let row_count = rows.len();
        let owners = collapse_joined_rows(rows, &join_field.field_name)?;
        debug!(
            rows = row_count,
            owners = owners.len(),
            "collapsed eager join rows"
        );
        Ok(owners)
    }

    /// Execute a plain select, mapping each row independently.
    pub fn query_with_lazy_column<T: Entity>(
        &self,
        class: Arc<PersistentClass>,
        select_query: &str,
    ) -> Result<Vec<T>, PersistenceError> {
        let mapper = SingleEntityRowMapper::<T>::new(class);
        self.jdbc.query(select_query, &mapper)
    }
}

/// Entry point for loading entities by key or predicate.
#[derive(Debug)]
pub struct EntityLoader<'a, J> {
    jdbc: &'a J,
    registry: &'a PersistentClassRegistry,
    builder: DefaultDmlQueryBuilder,
    show_sql: bool,
}

impl<'a, J: JdbcTemplate> EntityLoader<'a, J> {
    pub fn new(
        jdbc: &'a J,
        registry: &'a PersistentClassRegistry,
        builder: DefaultDmlQueryBuilder,
    ) -> Self {
        Self {
            jdbc,
            registry,
            builder,
            show_sql: false,
        }
    }

    pub fn show_sql(mut self, show_sql: bool) -> Self {
        self.show_sql = show_sql;
        self
    }

    /// Load the entity with primary key `id`, eager collection included.
    pub fn load<T: Entity>(&self, id: impl Into<PrimaryKey>) -> Result<Option<T>, PersistenceError> {
        let class = self.registry.persistent_class::<T>()?;
        let id: PrimaryKey = id.into();
        let key = class.primary_key();
        let predicate = Where::eq(key.name.clone(), id.to_value(key.sql_type));
        Ok(self.load_where(vec![predicate])?.into_iter().next())
    }

    pub fn load_all<T: Entity>(&self) -> Result<Vec<T>, PersistenceError> {
        self.load_where(Vec::new())
    }

    /// Load every entity matching `wheres`, qualified with `T`'s table.
    pub fn load_where<T: Entity>(&self, wheres: Vec<Where>) -> Result<Vec<T>, PersistenceError> {
        let class = self.registry.persistent_class::<T>()?;
        let table = TableBinder::new(self.registry).create_joined_table_for_class(&class)?;
        let sql = self
            .builder
            .build_select_query(&Select::with_wheres(table, wheres))?;
        log_statement(self.show_sql, &sql);

        let loader = CollectionEntityLoader::new(self.jdbc);
        let eager = class.eager_join_field().cloned();
        match eager {
            Some(join_field) => {
                loader.query_with_eager_column(class, &join_field, self.registry, &sql)
            }
            None => loader.query_with_lazy_column(class, &sql),
        }
    }

    /// Populate the one-to-many field `field_name` of `owner` with a separate
    /// query on the element table, filtered by the owner's key.
    ///
    /// The field is replaced with the elements in row order; returns how
    /// many were attached.
    pub fn load_collection<T: Entity>(
        &self,
        owner: &mut T,
        field_name: &str,
    ) -> Result<usize, PersistenceError> {
        let class = self.registry.persistent_class::<T>()?;
        let join_field =
            class
                .join_field(field_name)
                .ok_or_else(|| PersistenceError::UnknownField {
                    entity: class.type_name().to_string(),
                    field: field_name.to_string(),
                })?;
        let key = class.primary_key_value(&*owner)?.ok_or_else(|| {
            PersistenceError::MissingPrimaryKeyValue {
                entity: class.type_name().to_string(),
            }
        })?;

        let collection = self
            .registry
            .collection_persistent_class(join_field.element_type_name)?;
        let element = collection.element().clone();
        let select = Select::new(Table::from_class(&element)).filter(Where::eq(
            join_field.join_column_name.clone(),
            key.to_value(class.primary_key().sql_type),
        ));
        let sql = self.builder.build_select_query(&select)?;
        log_statement(self.show_sql, &sql);

        let elements: Vec<Box<dyn Persistable>> =
            self.jdbc.query(&sql, &EntityRowMapper::new(element))?;
        let count = elements.len();
        owner.clear_collection(field_name)?;
        for child in elements {
            owner.attach(field_name, child)?;
        }
        debug!(
            entity = class.type_name(),
            field = field_name,
            count,
            "loaded collection"
        );
        Ok(count)
    }
}
