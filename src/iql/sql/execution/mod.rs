//! Query execution: values, sources and the evaluator.

pub mod expression;
pub mod query;
pub mod source;
pub mod types;

pub use expression::{EvalContext, ExpressionEvaluator};
pub use query::{FromBinding, Query, SelectItem};
pub use source::{Align, Column, ColumnSelector, ColumnType, Reference, Row, Source};
pub use types::{Type, Value, ValueFormat};
