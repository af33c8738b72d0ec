//! Column values and their SQL type tags.
//!
//! A [`Value`] pairs a runtime [`Datum`] with the [`SqlType`] of the column it
//! was read from or is bound to. Field types convert to and from values
//! through [`ColumnValue`].

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::PersistenceError;

/// SQL type of a mapped column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SqlType {
    SmallInt,
    Integer,
    BigInt,
    Double,
    Boolean,
    Varchar,
    Timestamp,
}

impl SqlType {
    /// Map the textual Rust type of a field to its SQL type.
    ///
    /// Returns the SQL type and whether the field is nullable (`Option<T>`),
    /// or `None` when the type has no mapping.
    pub fn for_rust_type(rust_type: &str) -> Option<(SqlType, bool)> {
        let compact: String = rust_type.chars().filter(|c| !c.is_whitespace()).collect();
        let unqualified = ["::std::option::", "std::option::", "::core::option::", "core::option::"]
            .iter()
            .find_map(|path| compact.strip_prefix(path))
            .unwrap_or(compact.as_str());
        let (inner, nullable) = match unqualified
            .strip_prefix("Option<")
            .and_then(|rest| rest.strip_suffix('>'))
        {
            Some(inner) => (inner, true),
            None => (unqualified, false),
        };

        let sql_type = match inner {
            "i16" => SqlType::SmallInt,
            "i32" => SqlType::Integer,
            "i64" => SqlType::BigInt,
            "f32" | "f64" => SqlType::Double,
            "bool" => SqlType::Boolean,
            "String" | "std::string::String" => SqlType::Varchar,
            "NaiveDateTime" | "chrono::NaiveDateTime" => SqlType::Timestamp,
            _ => return None,
        };
        Some((sql_type, nullable))
    }

    /// Whether values of this type render as bare numeric literals.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            SqlType::SmallInt | SqlType::Integer | SqlType::BigInt | SqlType::Double
        )
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SqlType::SmallInt => "SMALLINT",
            SqlType::Integer => "INTEGER",
            SqlType::BigInt => "BIGINT",
            SqlType::Double => "DOUBLE",
            SqlType::Boolean => "BOOLEAN",
            SqlType::Varchar => "VARCHAR",
            SqlType::Timestamp => "TIMESTAMP",
        };
        f.write_str(name)
    }
}

/// Runtime payload of a value.
#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    Null,
    Integer(i64),
    Double(f64),
    Boolean(bool),
    Text(String),
    Timestamp(NaiveDateTime),
}

impl Datum {
    /// Name of the runtime type, used in conversion errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Datum::Null => "null",
            Datum::Integer(_) => "integer",
            Datum::Double(_) => "double",
            Datum::Boolean(_) => "boolean",
            Datum::Text(_) => "text",
            Datum::Timestamp(_) => "timestamp",
        }
    }
}

impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Datum::Null => f.write_str("null"),
            Datum::Integer(n) => write!(f, "{n}"),
            Datum::Double(n) => write!(f, "{n}"),
            Datum::Boolean(b) => write!(f, "{b}"),
            Datum::Text(s) => write!(f, "{s:?}"),
            Datum::Timestamp(ts) => write!(f, "{ts}"),
        }
    }
}

/// A datum tagged with the SQL type it is bound to.
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    pub sql_type: SqlType,
    pub datum: Datum,
}

impl Value {
    pub fn new(sql_type: SqlType, datum: Datum) -> Self {
        Self { sql_type, datum }
    }

    pub fn null(sql_type: SqlType) -> Self {
        Self::new(sql_type, Datum::Null)
    }

    pub fn is_null(&self) -> bool {
        self.datum == Datum::Null
    }

    /// Re-tag this value with a column's SQL type.
    pub fn with_sql_type(self, sql_type: SqlType) -> Self {
        Self { sql_type, ..self }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::new(SqlType::Varchar, Datum::Text(s.to_string()))
    }
}

macro_rules! value_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    v.to_value()
                }
            }
        )*
    };
}

value_from!(i16, i32, i64, f32, f64, bool, String, NaiveDateTime);

/// Conversion between a Rust field type and a column [`Value`].
///
/// Implemented for every field type the derive macro maps to a column.
pub trait ColumnValue: Sized {
    const SQL_TYPE: SqlType;

    fn to_value(&self) -> Value;

    fn from_value(value: Value) -> Result<Self, PersistenceError>;
}

fn mismatch<T>(expected: SqlType, datum: &Datum) -> Result<T, PersistenceError> {
    Err(PersistenceError::TypeMismatch {
        expected: expected.to_string(),
        found: datum.type_name().to_string(),
    })
}

macro_rules! integer_column_value {
    ($ty:ty, $sql_type:expr) => {
        impl ColumnValue for $ty {
            const SQL_TYPE: SqlType = $sql_type;

            fn to_value(&self) -> Value {
                Value::new(Self::SQL_TYPE, Datum::Integer(i64::from(*self)))
            }

            fn from_value(value: Value) -> Result<Self, PersistenceError> {
                match value.datum {
                    Datum::Integer(n) => <$ty>::try_from(n).map_err(|_| {
                        PersistenceError::TypeMismatch {
                            expected: Self::SQL_TYPE.to_string(),
                            found: format!("out of range integer {n}"),
                        }
                    }),
                    other => mismatch(Self::SQL_TYPE, &other),
                }
            }
        }
    };
}

integer_column_value!(i16, SqlType::SmallInt);
integer_column_value!(i32, SqlType::Integer);
integer_column_value!(i64, SqlType::BigInt);

impl ColumnValue for f64 {
    const SQL_TYPE: SqlType = SqlType::Double;

    fn to_value(&self) -> Value {
        Value::new(Self::SQL_TYPE, Datum::Double(*self))
    }

    fn from_value(value: Value) -> Result<Self, PersistenceError> {
        match value.datum {
            Datum::Double(n) => Ok(n),
            Datum::Integer(n) => Ok(n as f64),
            other => mismatch(Self::SQL_TYPE, &other),
        }
    }
}

impl ColumnValue for f32 {
    const SQL_TYPE: SqlType = SqlType::Double;

    fn to_value(&self) -> Value {
        Value::new(Self::SQL_TYPE, Datum::Double(f64::from(*self)))
    }

    fn from_value(value: Value) -> Result<Self, PersistenceError> {
        f64::from_value(value).map(|n| n as f32)
    }
}

impl ColumnValue for bool {
    const SQL_TYPE: SqlType = SqlType::Boolean;

    fn to_value(&self) -> Value {
        Value::new(Self::SQL_TYPE, Datum::Boolean(*self))
    }

    fn from_value(value: Value) -> Result<Self, PersistenceError> {
        match value.datum {
            Datum::Boolean(b) => Ok(b),
            other => mismatch(Self::SQL_TYPE, &other),
        }
    }
}

impl ColumnValue for String {
    const SQL_TYPE: SqlType = SqlType::Varchar;

    fn to_value(&self) -> Value {
        Value::new(Self::SQL_TYPE, Datum::Text(self.clone()))
    }

    fn from_value(value: Value) -> Result<Self, PersistenceError> {
        match value.datum {
            Datum::Text(s) => Ok(s),
            other => mismatch(Self::SQL_TYPE, &other),
        }
    }
}

impl ColumnValue for NaiveDateTime {
    const SQL_TYPE: SqlType = SqlType::Timestamp;

    fn to_value(&self) -> Value {
        Value::new(Self::SQL_TYPE, Datum::Timestamp(*self))
    }

    fn from_value(value: Value) -> Result<Self, PersistenceError> {
        match value.datum {
            Datum::Timestamp(ts) => Ok(ts),
            other => mismatch(Self::SQL_TYPE, &other),
        }
    }
}

impl<T: ColumnValue> ColumnValue for Option<T> {
    const SQL_TYPE: SqlType = T::SQL_TYPE;

    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::null(T::SQL_TYPE),
        }
    }

    fn from_value(value: Value) -> Result<Self, PersistenceError> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_value(value).map(Some)
        }
    }
}

/// Hashable primary-key value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimaryKey {
    Integer(i64),
    Text(String),
}

impl PrimaryKey {
    /// Extract a key from a value; `None` for null.
    pub fn from_value(value: &Value) -> Result<Option<Self>, PersistenceError> {
        match &value.datum {
            Datum::Null => Ok(None),
            Datum::Integer(n) => Ok(Some(PrimaryKey::Integer(*n))),
            Datum::Text(s) => Ok(Some(PrimaryKey::Text(s.clone()))),
            other => Err(PersistenceError::TypeMismatch {
                expected: "integer or text primary key".to_string(),
                found: other.type_name().to_string(),
            }),
        }
    }

    /// Bind this key as a value of the given column type.
    pub fn to_value(&self, sql_type: SqlType) -> Value {
        match self {
            PrimaryKey::Integer(n) => Value::new(sql_type, Datum::Integer(*n)),
            PrimaryKey::Text(s) => Value::new(sql_type, Datum::Text(s.clone())),
        }
    }
}

impl From<i64> for PrimaryKey {
    fn from(n: i64) -> Self {
        PrimaryKey::Integer(n)
    }
}

impl From<&str> for PrimaryKey {
    fn from(s: &str) -> Self {
        PrimaryKey::Text(s.to_string())
    }
}

impl From<String> for PrimaryKey {
    fn from(s: String) -> Self {
        PrimaryKey::Text(s)
    }
}

impl fmt::Display for PrimaryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimaryKey::Integer(n) => write!(f, "{n}"),
            PrimaryKey::Text(s) => f.write_str(s),
        }
    }
}
