//! Table projections, statement intents and their rendering to SQL text.

mod builder;
mod dialect;
mod query;
mod table;

pub use builder::{DefaultDmlQueryBuilder, DmlQueryBuilder};
pub use dialect::{Dialect, H2Dialect};
pub use query::{ComparisonOperator, Delete, Insert, LogicalOperator, Select, Update, Where};
pub use table::{JoinTable, Table, TableBinder};
