use crate::SqlType;

/// A mapped column of an entity table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    /// Rust field the column is read from and written to.
    pub field_name: String,
    pub sql_type: SqlType,
    pub primary_key: bool,
    pub nullable: bool,
    /// Values are assigned by the database on insert.
    pub generated: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, field_name: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            name: name.into(),
            field_name: field_name.into(),
            sql_type,
            primary_key: false,
            nullable: false,
            generated: false,
        }
    }

    pub fn primary_key(mut self, generated: bool) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self.generated = generated;
        self
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable && !self.primary_key;
        self
    }
}
