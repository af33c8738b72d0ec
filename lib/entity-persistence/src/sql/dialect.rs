//! SQL dialects: identifier quoting, key defaults and literal rendering.

use crate::{Datum, PersistenceError, SqlType, Value};

/// Rendering rules specific to a database product.
pub trait Dialect: Send + Sync + std::fmt::Debug {
    /// Quote an identifier. Identifiers are emitted verbatim by default.
    fn quote_identifier(&self, identifier: &str) -> String {
        identifier.to_string()
    }

    /// Value clause used in place of a database-generated key on insert.
    fn primary_key_default_clause(&self) -> &'static str;

    fn null_keyword(&self) -> &'static str;

    /// Render `value` as a literal of its SQL type.
    fn render_literal(&self, value: &Value) -> Result<String, PersistenceError> {
        render_standard_literal(value, self.null_keyword())
    }
}

/// H2-compatible dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct H2Dialect;

impl Dialect for H2Dialect {
    fn primary_key_default_clause(&self) -> &'static str {
        "default"
    }

    fn null_keyword(&self) -> &'static str {
        "null"
    }
}

fn render_standard_literal(value: &Value, null_keyword: &str) -> Result<String, PersistenceError> {
    let rendered = match (&value.datum, value.sql_type) {
        (Datum::Null, _) => null_keyword.to_string(),
        (Datum::Integer(n), sql_type) if sql_type.is_numeric() => n.to_string(),
        (Datum::Double(n), SqlType::Double) if n.is_finite() => n.to_string(),
        (Datum::Boolean(b), SqlType::Boolean) => b.to_string(),
        (Datum::Text(s), SqlType::Varchar) => quote(s),
        (Datum::Timestamp(ts), SqlType::Timestamp) => {
            quote(&ts.format("%Y-%m-%d %H:%M:%S%.f").to_string())
        }
        (datum, sql_type) => {
            return Err(PersistenceError::Rendering {
                sql_type,
                datum: datum.to_string(),
            });
        }
    };
    Ok(rendered)
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}
