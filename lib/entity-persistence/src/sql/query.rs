//! Statement intents and predicates.
//!
//! These are plain values binding a [`Table`] to an intent. Rendering is done
//! by a [`DmlQueryBuilder`](crate::DmlQueryBuilder).

use crate::{Table, Value};

/// Operator joining a predicate to the one before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    And,
    Or,
    None,
}

/// Comparison between a column and a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOperator {
    /// column = value
    Eq,
    /// column <> value
    Ne,
    /// column > value
    Gt,
    /// column >= value
    Ge,
    /// column < value
    Lt,
    /// column <= value
    Le,
}

/// A single predicate of a WHERE clause.
#[derive(Debug, Clone, PartialEq)]
pub struct Where {
    /// Column name, qualified with the statement's table when rendered.
    pub column: String,
    pub value: Value,
    pub logical: LogicalOperator,
    pub comparison: ComparisonOperator,
}

impl Where {
    pub fn new(
        column: impl Into<String>,
        value: impl Into<Value>,
        logical: LogicalOperator,
        comparison: ComparisonOperator,
    ) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
            logical,
            comparison,
        }
    }

    /// Leading equality predicate.
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, value, LogicalOperator::None, ComparisonOperator::Eq)
    }

    /// Equality predicate joined with `and`.
    pub fn and_eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, value, LogicalOperator::And, ComparisonOperator::Eq)
    }

    /// Equality predicate joined with `or`.
    pub fn or_eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, value, LogicalOperator::Or, ComparisonOperator::Eq)
    }
}

/// INSERT of the values bound to a table.
#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    pub table: Table,
}

impl Insert {
    pub fn new(table: Table) -> Self {
        Self { table }
    }
}

/// SELECT of a table, including its joined table if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub table: Table,
    pub wheres: Vec<Where>,
}

impl Select {
    pub fn new(table: Table) -> Self {
        Self {
            table,
            wheres: Vec::new(),
        }
    }

    pub fn with_wheres(table: Table, wheres: Vec<Where>) -> Self {
        Self { table, wheres }
    }

    pub fn filter(mut self, predicate: Where) -> Self {
        self.wheres.push(predicate);
        self
    }
}

/// UPDATE of a single row by primary key.
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub table: Table,
}

impl Update {
    pub fn new(table: Table) -> Self {
        Self { table }
    }
}

/// DELETE of the rows matching the predicates.
#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    pub table: Table,
    pub wheres: Vec<Where>,
}

impl Delete {
    pub fn new(table: Table) -> Self {
        Self {
            table,
            wheres: Vec::new(),
        }
    }

    pub fn with_wheres(table: Table, wheres: Vec<Where>) -> Self {
        Self { table, wheres }
    }

    pub fn filter(mut self, predicate: Where) -> Self {
        self.wheres.push(predicate);
        self
    }
}
