use thiserror::Error;

use crate::value::SqlType;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("no primary key declared on entity {entity}")]
    MissingPrimaryKey { entity: String },

    #[error("more than one primary key declared on entity {entity}: {fields:?}")]
    DuplicatePrimaryKey { entity: String, fields: Vec<String> },

    #[error("no sql type mapping for field {entity}.{field} of type {rust_type}")]
    UnmappedFieldType {
        entity: String,
        field: String,
        rust_type: String,
    },

    #[error("primary key {entity}.{field} must be an integer or text column, found {sql_type}")]
    UnsupportedPrimaryKeyType {
        entity: String,
        field: String,
        sql_type: SqlType,
    },

    #[error("entity {entity} declares more than one eager association: {fields:?}")]
    MultipleEagerAssociations { entity: String, fields: Vec<String> },

    #[error("not equal class type - meta data type: {expected}, parameter type: {actual}")]
    ClassMismatch { expected: String, actual: String },

    #[error("entity {entity} has no no-argument constructor")]
    Instantiation { entity: String },

    #[error("entity {entity} is not registered")]
    UnregisteredEntity { entity: String },

    #[error("no collection persistent class registered for element {element}")]
    UnregisteredCollection { element: String },

    #[error("unknown field {field} on entity {entity}")]
    UnknownField { entity: String, field: String },

    #[error("unknown column {column} on table {table}")]
    UnknownColumn { table: String, column: String },

    #[error("no column labeled {label} in result row")]
    MissingColumn { label: String },

    #[error("joined table {table} may not carry a further join")]
    NestedJoin { table: String },

    #[error("no value bound for column {table}.{column}")]
    MissingValue { table: String, column: String },

    #[error("primary key of {entity} has no value")]
    MissingPrimaryKeyValue { entity: String },

    #[error("table {table} has no updatable columns")]
    NothingToUpdate { table: String },

    #[error("cannot render {datum} as a {sql_type} literal")]
    Rendering { sql_type: SqlType, datum: String },

    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("failed to read column {label}: {source}")]
    DataAccess {
        label: String,
        #[source]
        source: Box<PersistenceError>,
    },

    #[error("configuration error: {0}")]
    Config(#[from] serde_json::Error),

    #[error(transparent)]
    Execution(Box<dyn std::error::Error + Send + Sync>),
}

impl PersistenceError {
    /// Wrap a failure from the execution collaborator without altering it.
    pub fn execution(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        PersistenceError::Execution(Box::new(error))
    }

    /// Wrap a cell read failure as a data-access fault for `label`.
    pub fn data_access(label: impl Into<String>, source: PersistenceError) -> Self {
        PersistenceError::DataAccess {
            label: label.into(),
            source: Box::new(source),
        }
    }
}
