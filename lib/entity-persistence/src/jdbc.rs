//! Interface to the SQL execution collaborator.
//!
//! The persistence core renders SQL text and hands it to a [`JdbcTemplate`]
//! implementation; reads come back through a [`RowMapper`] supplied by the
//! core. Cells are addressed by their qualified label (`table.column`), never
//! by ordinal position.

use indexmap::IndexMap;

use crate::{PersistenceError, Value};

/// One row of a result set.
pub trait ResultSet {
    /// Read the cell labeled `label`.
    fn get_object(&self, label: &str) -> Result<Value, PersistenceError>;
}

/// An in-memory result row with ordered, labeled cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: IndexMap<String, Value>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, label: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(label, value);
        self
    }

    pub fn insert(&mut self, label: impl Into<String>, value: impl Into<Value>) {
        self.cells.insert(label.into(), value.into());
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(String::as_str)
    }
}

impl ResultSet for Row {
    fn get_object(&self, label: &str) -> Result<Value, PersistenceError> {
        self.cells
            .get(label)
            .cloned()
            .ok_or_else(|| PersistenceError::MissingColumn {
                label: label.to_string(),
            })
    }
}

/// Maps one result row to a value.
pub trait RowMapper<T> {
    fn map_row(&self, row: &dyn ResultSet) -> Result<T, PersistenceError>;
}

impl<T, F> RowMapper<T> for F
where
    F: Fn(&dyn ResultSet) -> Result<T, PersistenceError>,
{
    fn map_row(&self, row: &dyn ResultSet) -> Result<T, PersistenceError> {
        self(row)
    }
}

/// Synchronous SQL execution.
///
/// Implementations report their own failures through
/// [`PersistenceError::Execution`]; the core propagates them unchanged.
pub trait JdbcTemplate {
    /// Execute a write statement and return the number of affected rows.
    fn execute(&self, sql: &str) -> Result<u64, PersistenceError>;

    /// Execute a query and map every row with `mapper`, in row order.
    fn query<T, M>(&self, sql: &str, mapper: &M) -> Result<Vec<T>, PersistenceError>
    where
        M: RowMapper<T> + ?Sized;
}

impl<J: JdbcTemplate> JdbcTemplate for &J {
    fn execute(&self, sql: &str) -> Result<u64, PersistenceError> {
        (**self).execute(sql)
    }

    fn query<T, M>(&self, sql: &str, mapper: &M) -> Result<Vec<T>, PersistenceError>
    where
        M: RowMapper<T> + ?Sized,
    {
        (**self).query(sql, mapper)
    }
}
