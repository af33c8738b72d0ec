#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;

use entity_persistence::{
    Entity, JdbcTemplate, PersistenceError, PersistentClassRegistry, ResultSet, Row, RowMapper,
};

#[derive(Entity, Debug, Default, Clone, PartialEq)]
#[entity(table = "users")]
pub struct PersonV3 {
    #[id(generated)]
    pub id: Option<i64>,
    #[column(name = "nick_name")]
    pub name: String,
    #[column(name = "old")]
    pub age: i32,
    pub email: String,
    #[column(skip)]
    pub index: i32,
}

impl PersonV3 {
    pub fn new(id: i64, name: &str, age: i32, email: &str) -> Self {
        Self {
            id: Some(id),
            name: name.to_string(),
            age,
            email: email.to_string(),
            index: 0,
        }
    }
}

#[derive(Entity, Debug, Default, Clone, PartialEq)]
#[entity(table = "orders")]
pub struct Order {
    #[id]
    pub id: i64,
    #[column(name = "orderNumber")]
    pub order_number: String,
    #[one_to_many(join_column = "order_id", fetch = "eager")]
    pub order_items: Vec<OrderItem>,
}

#[derive(Entity, Debug, Default, Clone, PartialEq)]
#[entity(table = "eager_order_items")]
pub struct OrderItem {
    #[id]
    pub id: i64,
    pub product: String,
    pub quantity: i32,
}

#[derive(Entity, Debug, Default, Clone, PartialEq)]
#[entity(table = "lazy_orders")]
pub struct LazyOrder {
    #[id]
    pub id: i64,
    #[column(name = "orderNumber")]
    pub order_number: String,
    #[one_to_many(join_column = "order_id", fetch = "lazy")]
    pub order_items: Vec<LazyOrderItem>,
}

#[derive(Entity, Debug, Default, Clone, PartialEq)]
#[entity(table = "lazy_order_items")]
pub struct LazyOrderItem {
    #[id]
    pub id: i64,
    pub product: String,
    pub quantity: i32,
}

/// Registry isolated from the global one, so tests do not share metadata.
pub fn registry() -> PersistentClassRegistry {
    PersistentClassRegistry::new()
}

pub fn person_row(id: i64, name: &str, age: i32, email: &str) -> Row {
    Row::new()
        .with("users.id", id)
        .with("users.nick_name", name)
        .with("users.old", age)
        .with("users.email", email)
}

/// In-memory `JdbcTemplate` that records every statement and answers
/// queries with canned rows, one result set per query in FIFO order.
#[derive(Debug, Default)]
pub struct RecordingJdbc {
    statements: RefCell<Vec<String>>,
    results: RefCell<VecDeque<Vec<Row>>>,
    affected: u64,
}

impl RecordingJdbc {
    pub fn new() -> Self {
        Self {
            affected: 1,
            ..Self::default()
        }
    }

    pub fn returning(self, rows: Vec<Row>) -> Self {
        self.results.borrow_mut().push_back(rows);
        self
    }

    pub fn push_result(&self, rows: Vec<Row>) {
        self.results.borrow_mut().push_back(rows);
    }

    pub fn statements(&self) -> Vec<String> {
        self.statements.borrow().clone()
    }

    pub fn last_statement(&self) -> Option<String> {
        self.statements.borrow().last().cloned()
    }
}

impl JdbcTemplate for RecordingJdbc {
    fn execute(&self, sql: &str) -> Result<u64, PersistenceError> {
        self.statements.borrow_mut().push(sql.to_string());
        Ok(self.affected)
    }

    fn query<T, M>(&self, sql: &str, mapper: &M) -> Result<Vec<T>, PersistenceError>
    where
        M: RowMapper<T> + ?Sized,
    {
        self.statements.borrow_mut().push(sql.to_string());
        let rows = self.results.borrow_mut().pop_front().unwrap_or_default();
        rows.iter()
            .map(|row| mapper.map_row(row as &dyn ResultSet))
            .collect()
    }
}

/// `JdbcTemplate` whose every call fails.
#[derive(Debug, Default)]
pub struct FailingJdbc;

#[derive(Debug, thiserror::Error)]
#[error("connection refused")]
pub struct ConnectionRefused;

impl JdbcTemplate for FailingJdbc {
    fn execute(&self, _sql: &str) -> Result<u64, PersistenceError> {
        Err(PersistenceError::execution(ConnectionRefused))
    }

    fn query<T, M>(&self, _sql: &str, _mapper: &M) -> Result<Vec<T>, PersistenceError>
    where
        M: RowMapper<T> + ?Sized,
    {
        Err(PersistenceError::execution(ConnectionRefused))
    }
}
