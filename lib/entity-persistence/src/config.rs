use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{DefaultDmlQueryBuilder, Dialect, H2Dialect, PersistenceError};

/// SQL dialects available to the query builder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectKind {
    #[default]
    H2,
}

/// Settings for an [`EntityManager`](crate::EntityManager).
///
/// ```json
/// { "dialect": "h2", "show_sql": true }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    pub dialect: DialectKind,
    /// Log every executed statement at info level.
    pub show_sql: bool,
}

impl PersistenceConfig {
    pub fn from_json_str(json: &str) -> Result<Self, PersistenceError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn dialect(&self) -> Arc<dyn Dialect> {
        match self.dialect {
            DialectKind::H2 => Arc::new(H2Dialect),
        }
    }

    pub fn query_builder(&self) -> DefaultDmlQueryBuilder {
        DefaultDmlQueryBuilder::new(self.dialect())
    }
}
