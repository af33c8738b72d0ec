//! DML rendering.
//!
//! Statements render keyword-per-line with four-space indented bodies:
//!
//! ```text
//! insert
//! into
//!     users
//!     (nick_name, old, email, id)
//! values
//!     ('name', 1, 'email@domain.com', default)
//! ```

use std::sync::Arc;

use crate::{
    ComparisonOperator, Delete, Dialect, H2Dialect, Insert, LogicalOperator, PersistenceError,
    Select, Table, Update, Value, Where,
};

const INDENT: &str = "    ";

/// Renders statement intents to SQL text.
pub trait DmlQueryBuilder {
    fn build_insert_query(&self, insert: &Insert) -> Result<String, PersistenceError>;

    fn build_select_query(&self, select: &Select) -> Result<String, PersistenceError>;

    fn build_update_query(&self, update: &Update) -> Result<String, PersistenceError>;

    fn build_delete_query(&self, delete: &Delete) -> Result<String, PersistenceError>;
}

/// [`DmlQueryBuilder`] parameterized by a [`Dialect`].
#[derive(Debug, Clone)]
pub struct DefaultDmlQueryBuilder {
    dialect: Arc<dyn Dialect>,
}

impl DefaultDmlQueryBuilder {
    pub fn new(dialect: Arc<dyn Dialect>) -> Self {
        Self { dialect }
    }

    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    fn ident(&self, identifier: &str) -> String {
        self.dialect.quote_identifier(identifier)
    }

    fn qualified(&self, table: &str, column: &str) -> String {
        format!("{}.{}", self.ident(table), self.ident(column))
    }

    fn bound_value<'t>(&self, table: &'t Table, column: &str) -> Result<&'t Value, PersistenceError> {
        table.value(column).ok_or_else(|| PersistenceError::MissingValue {
            table: table.name().to_string(),
            column: column.to_string(),
        })
    }

    fn render_wheres(&self, table: &Table, wheres: &[Where]) -> Result<String, PersistenceError> {
        let mut clause = String::new();
        for (idx, predicate) in wheres.iter().enumerate() {
            if idx > 0 {
                let logical = match predicate.logical {
                    LogicalOperator::Or => "or",
                    LogicalOperator::And | LogicalOperator::None => "and",
                };
                clause.push(' ');
                clause.push_str(logical);
                clause.push(' ');
            }
            clause.push_str(&self.render_predicate(table.name(), predicate)?);
        }
        Ok(clause)
    }

    fn render_predicate(&self, table: &str, predicate: &Where) -> Result<String, PersistenceError> {
        let column = self.qualified(table, &predicate.column);
        if predicate.value.is_null() {
            match predicate.comparison {
                ComparisonOperator::Eq => return Ok(format!("{column} is null")),
                ComparisonOperator::Ne => return Ok(format!("{column} is not null")),
                _ => {}
            }
        }
        let op = match predicate.comparison {
            ComparisonOperator::Eq => "=",
            ComparisonOperator::Ne => "<>",
            ComparisonOperator::Gt => ">",
            ComparisonOperator::Ge => ">=",
            ComparisonOperator::Lt => "<",
            ComparisonOperator::Le => "<=",
        };
        let literal = self.dialect.render_literal(&predicate.value)?;
        Ok(format!("{column} {op} {literal}"))
    }

    fn push_where(
        &self,
        sql: &mut String,
        table: &Table,
        wheres: &[Where],
    ) -> Result<(), PersistenceError> {
        if wheres.is_empty() {
            return Ok(());
        }
        sql.push_str("\nwhere\n");
        sql.push_str(INDENT);
        sql.push_str(&self.render_wheres(table, wheres)?);
        Ok(())
    }
}

impl Default for DefaultDmlQueryBuilder {
    fn default() -> Self {
        Self::new(Arc::new(H2Dialect))
    }
}

impl DmlQueryBuilder for DefaultDmlQueryBuilder {
    fn build_insert_query(&self, insert: &Insert) -> Result<String, PersistenceError> {
        let table = &insert.table;
        let mut names = Vec::with_capacity(table.columns().len());
        let mut values = Vec::with_capacity(table.columns().len());

        for column in table.columns().iter().filter(|column| !column.primary_key) {
            names.push(self.ident(&column.name));
            values.push(
                self.dialect
                    .render_literal(self.bound_value(table, &column.name)?)?,
            );
        }

        for column in table.columns().iter().filter(|column| column.primary_key) {
            names.push(self.ident(&column.name));
            if column.generated {
                values.push(self.dialect.primary_key_default_clause().to_string());
            } else {
                values.push(
                    self.dialect
                        .render_literal(self.bound_value(table, &column.name)?)?,
                );
            }
        }

        Ok(format!(
            "insert\ninto\n{INDENT}{}\n{INDENT}({})\nvalues\n{INDENT}({})",
            self.ident(table.name()),
            names.join(", "),
            values.join(", ")
        ))
    }

    fn build_select_query(&self, select: &Select) -> Result<String, PersistenceError> {
        let table = &select.table;
        let mut columns: Vec<String> = table
            .columns()
            .iter()
            .map(|column| self.qualified(table.name(), &column.name))
            .collect();
        if let Some(joined) = table.joined() {
            columns.extend(
                joined
                    .table
                    .columns()
                    .iter()
                    .map(|column| self.qualified(joined.table.name(), &column.name)),
            );
        }

        let mut sql = format!(
            "select\n{INDENT}{}\nfrom\n{INDENT}{}",
            columns.join(", "),
            self.ident(table.name())
        );

        if let Some(joined) = table.joined() {
            sql.push_str(&format!(
                "\nleft join\n{INDENT}{}\non\n{INDENT}{} = {}",
                self.ident(joined.table.name()),
                self.qualified(table.name(), &table.primary_key().name),
                self.qualified(joined.table.name(), &joined.join_column)
            ));
        }

        self.push_where(&mut sql, table, &select.wheres)?;
        Ok(sql)
    }

    fn build_update_query(&self, update: &Update) -> Result<String, PersistenceError> {
        let table = &update.table;
        let assignments = table
            .columns()
            .iter()
            .filter(|column| !column.primary_key)
            .map(|column| {
                let literal = self
                    .dialect
                    .render_literal(self.bound_value(table, &column.name)?)?;
                Ok(format!("{} = {}", self.ident(&column.name), literal))
            })
            .collect::<Result<Vec<_>, PersistenceError>>()?;

        if assignments.is_empty() {
            return Err(PersistenceError::NothingToUpdate {
                table: table.name().to_string(),
            });
        }

        let primary_key = table.primary_key();
        let key = self.bound_value(table, &primary_key.name)?;
        if key.is_null() {
            return Err(PersistenceError::MissingValue {
                table: table.name().to_string(),
                column: primary_key.name.clone(),
            });
        }

        Ok(format!(
            "update\n{INDENT}{}\nset\n{INDENT}{}\nwhere\n{INDENT}{} = {}",
            self.ident(table.name()),
            assignments.join(", "),
            self.qualified(table.name(), &primary_key.name),
            self.dialect.render_literal(key)?
        ))
    }

    fn build_delete_query(&self, delete: &Delete) -> Result<String, PersistenceError> {
        let table = &delete.table;
        let mut sql = format!("delete\nfrom\n{INDENT}{}", self.ident(table.name()));
        self.push_where(&mut sql, table, &delete.wheres)?;
        Ok(sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ColumnDeclaration, EntityDeclaration, PersistentClass, SqlType};
    use pretty_assertions::assert_eq;

    struct Ticket;

    fn tickets() -> Table {
        Table::from_class(
            &PersistentClass::derive(
                &EntityDeclaration::of::<Ticket>("Ticket")
                    .table("tickets")
                    .field(ColumnDeclaration::new("code", "String").id())
                    .field(ColumnDeclaration::new("seat", "i32"))
                    .field(ColumnDeclaration::new("holder", "Option<String>")),
            )
            .unwrap(),
        )
    }

    #[test]
    fn combines_predicates_with_their_operators() {
        let select = Select::new(tickets())
            .filter(Where::eq("seat", 3i32))
            .filter(Where::or_eq("seat", 4i32))
            .filter(Where::new(
                "holder",
                Value::null(SqlType::Varchar),
                LogicalOperator::And,
                ComparisonOperator::Ne,
            ));

        let sql = DefaultDmlQueryBuilder::default()
            .build_select_query(&select)
            .unwrap();

        assert_eq!(
            sql,
            "select\n    tickets.code, tickets.seat, tickets.holder\nfrom\n    tickets\nwhere\n    \
             tickets.seat = 3 or tickets.seat = 4 and tickets.holder is not null"
        );
    }

    #[test]
    fn leading_operator_is_ignored_and_none_joins_with_and() {
        let select = Select::new(tickets())
            .filter(Where::new("seat", 1i32, LogicalOperator::Or, ComparisonOperator::Ge))
            .filter(Where::new("seat", 9i32, LogicalOperator::None, ComparisonOperator::Lt));

        let sql = DefaultDmlQueryBuilder::default()
            .build_select_query(&select)
            .unwrap();

        assert!(sql.ends_with("where\n    tickets.seat >= 1 and tickets.seat < 9"));
    }

    #[test]
    fn delete_without_predicates_has_no_where() {
        let sql = DefaultDmlQueryBuilder::default()
            .build_delete_query(&Delete::new(tickets()))
            .unwrap();

        assert_eq!(sql, "delete\nfrom\n    tickets");
    }

    #[test]
    fn insert_without_bound_values_fails() {
        let err = DefaultDmlQueryBuilder::default()
            .build_insert_query(&Insert::new(tickets()))
            .unwrap_err();

        assert_eq!(err.to_string(), "no value bound for column tickets.seat");
    }
}
