//! Loading, writing and caching of entity instances.

mod cache;
mod loader;
mod manager;
mod persister;
mod row_mapper;

use tracing::{debug, info};

pub use cache::{EntityKey, Managed, PersistenceCache};
pub use loader::{CollectionEntityLoader, EntityLoader};
pub use manager::EntityManager;
pub use persister::EntityPersister;
pub use row_mapper::{
    CollectionEntityRowMapper, EntityRowMapper, JoinedRow, SingleEntityRowMapper,
    collapse_joined_rows, column_label, set_entity_fields,
};

pub(crate) fn log_statement(show_sql: bool, sql: &str) {
    if show_sql {
        info!(target: "entity_persistence::sql", "\n{sql}");
    } else {
        debug!(sql, "executing statement");
    }
}
