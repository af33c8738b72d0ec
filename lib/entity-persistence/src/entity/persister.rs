use crate::entity::log_statement;
use crate::{
    DefaultDmlQueryBuilder, Delete, DmlQueryBuilder, Entity, Insert, JdbcTemplate,
    PersistenceError, PersistentClassRegistry, Table, TableBinder, Update, Where,
};

/// Renders and executes single-entity writes.
#[derive(Debug)]
pub struct EntityPersister<'a, J> {
    jdbc: &'a J,
    registry: &'a PersistentClassRegistry,
    builder: DefaultDmlQueryBuilder,
    show_sql: bool,
}

impl<'a, J: JdbcTemplate> EntityPersister<'a, J> {
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

    pub fn insert<T: Entity>(&self, entity: &T) -> Result<u64, PersistenceError> {
        let table = TableBinder::new(self.registry).create_table_for(entity)?;
        let sql = self.builder.build_insert_query(&Insert::new(table))?;
        self.execute(&sql)
    }

    /// Update every non-key column of the row with `entity`'s primary key.
    pub fn update<T: Entity>(&self, entity: &T) -> Result<u64, PersistenceError> {
        let table = TableBinder::new(self.registry).create_table_for(entity)?;
        let sql = self.builder.build_update_query(&Update::new(table))?;
        self.execute(&sql)
    }

    /// Delete the row with `entity`'s primary key.
    pub fn delete<T: Entity>(&self, entity: &T) -> Result<u64, PersistenceError> {
        let class = self.registry.persistent_class::<T>()?;
        let key = class.primary_key_value(entity)?.ok_or_else(|| {
            PersistenceError::MissingPrimaryKeyValue {
                entity: class.type_name().to_string(),
            }
        })?;
        let column = class.primary_key();
        let delete = Delete::new(Table::from_class(&class))
            .filter(Where::eq(column.name.clone(), key.to_value(column.sql_type)));
        let sql = self.builder.build_delete_query(&delete)?;
        self.execute(&sql)
    }

    fn execute(&self, sql: &str) -> Result<u64, PersistenceError> {
        log_statement(self.show_sql, sql);
        self.jdbc.execute(sql)
    }
}
