//! Expression evaluation and built-in functions.

pub mod evaluator;
pub mod functions;

pub use evaluator::{EvalContext, ExpressionEvaluator};
pub use functions::{builtin, Function};
