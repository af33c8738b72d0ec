//! Entity Persistence - a small object-relational mapper over a JDBC-style
//! execution layer.
//!
//! Mapped structs derive [`Entity`]; their metadata is derived once into a
//! [`PersistentClass`] and cached in a [`PersistentClassRegistry`]. Statements
//! are rendered to SQL text by a [`DmlQueryBuilder`] for a [`Dialect`],
//! executed through a caller-supplied [`JdbcTemplate`], and result rows are
//! materialized back into entities, including one eager one-to-many join.
//!
//! # Core Concepts
//!
//! - **Persistent class**: immutable description of a mapped type: table,
//!   ordered columns, primary key and association fields.
//! - **Eager association**: a `Vec<Child>` field fetched with a LEFT JOIN in
//!   the owner's query; the join fan-out is collapsed to one owner per key.
//! - **Lazy association**: fetched by [`EntityLoader::load_collection`].
//! - **Identity map**: [`PersistenceCache`], one per [`EntityManager`], so a
//!   key resolves to one shared instance within a unit of work.
//!
//! # Example
//!
//! ```text
//! #[derive(Entity, Default)]
//! #[entity(table = "users")]
//! struct Person {
//!     #[id(generated)]
//!     id: Option<i64>,
//!     #[column(name = "nick_name")]
//!     name: String,
//! }
//!
//! let mut manager = EntityManager::new(jdbc, PersistentClassRegistry::global(), &config);
//! let person = manager.find::<Person>(1)?;
//! ```

#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::unwrap_in_result,
        clippy::panic
    )
)]

// Lets the derive macro's `::entity_persistence` paths resolve inside this crate.
extern crate self as entity_persistence;

mod config;
mod entity;
mod error;
mod jdbc;
mod model;
mod sql;
mod value;

pub use config::{DialectKind, PersistenceConfig};
pub use entity::{
    CollectionEntityLoader, CollectionEntityRowMapper, EntityKey, EntityLoader, EntityManager,
    EntityPersister, EntityRowMapper, JoinedRow, Managed, PersistenceCache,
    SingleEntityRowMapper, collapse_joined_rows, column_label, set_entity_fields,
};
pub use error::PersistenceError;
pub use jdbc::{JdbcTemplate, ResultSet, Row, RowMapper};
pub use model::{
    AssociationDeclaration, CollectionPersistentClass, Column, ColumnDeclaration, Entity,
    EntityDeclaration, EntityFactory, EntityField, EntityJoinField, FetchType, FieldDeclaration,
    Persistable, PersistentClass, PersistentClassRegistry,
};
pub use sql::{
    ComparisonOperator, DefaultDmlQueryBuilder, Delete, Dialect, DmlQueryBuilder, H2Dialect,
    Insert, JoinTable, LogicalOperator, Select, Table, TableBinder, Update, Where,
};
pub use value::{ColumnValue, Datum, PrimaryKey, SqlType, Value};

// Re-export derive macro
pub use entity_persistence_derive::Entity;
