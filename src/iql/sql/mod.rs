// SQL query engine for IQL.
// Provides the value algebra, expression evaluation and scope handling.

pub mod ast;
pub mod error;
pub mod execution;
pub mod scope;

// Re-export main API
pub use ast::{BinaryOperator, CastType, DateDiffUnit, Expr, UnaryOperator};
pub use error::{SqlError, SqlResult};
pub use execution::{
    Column, ColumnSelector, ColumnType, Query, Reference, Row, Source, Type, Value,
};
pub use scope::{init_system_variables, CancelToken, Scope, Variable};
