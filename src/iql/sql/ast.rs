//! Expression tree consumed by the evaluator.
//!
//! The lexer/parser producing these nodes is an external collaborator;
//! this module fixes the interface between it and the execution engine.

use crate::iql::sql::error::{SqlError, SqlResult};
use crate::iql::sql::execution::expression::functions;
use crate::iql::sql::execution::source::Reference;
use crate::iql::sql::execution::types::Value;
use std::fmt;
use std::str::FromStr;

/// An expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Literal value
    Literal(Value),
    /// Column reference, optionally source-qualified
    Column(Reference),
    /// Scope variable reference
    Variable(String),
    /// Unary operations: op expr
    Unary { op: UnaryOperator, expr: Box<Expr> },
    /// Binary operations: expr op expr
    Binary {
        left: Box<Expr>,
        op: BinaryOperator,
        right: Box<Expr>,
    },
    /// Function calls: name(args...)
    Function { name: String, args: Vec<Expr> },
    /// CAST(expr AS type)
    Cast { expr: Box<Expr>, typ: CastType },
}

impl Expr {
    /// Literal constructor shorthand.
    pub fn literal(value: Value) -> Expr {
        Expr::Literal(value)
    }

    /// Unqualified column reference shorthand.
    pub fn column(name: impl Into<String>) -> Expr {
        Expr::Column(Reference::column(name))
    }

    /// Function call shorthand.
    pub fn function(name: impl Into<String>, args: Vec<Expr>) -> Expr {
        Expr::Function {
            name: name.into(),
            args,
        }
    }

    /// True when the tree contains an aggregate (idempotent) function
    /// call. Aggregates are evaluated once per row group instead of once
    /// per row.
    pub fn is_idempotent(&self) -> bool {
        match self {
            Expr::Literal(_) | Expr::Column(_) | Expr::Variable(_) => false,
            Expr::Unary { expr, .. } => expr.is_idempotent(),
            Expr::Binary { left, right, .. } => left.is_idempotent() || right.is_idempotent(),
            Expr::Function { name, args } => {
                functions::builtin(name).map(|f| f.idempotent).unwrap_or(false)
                    || args.iter().any(Expr::is_idempotent)
            }
            Expr::Cast { expr, .. } => expr.is_idempotent(),
        }
    }

    /// Rejects aggregate calls nested inside another aggregate's
    /// arguments. Checked once when a query is constructed.
    pub fn check_nested_aggregates(&self) -> SqlResult<()> {
        match self {
            Expr::Literal(_) | Expr::Column(_) | Expr::Variable(_) => Ok(()),
            Expr::Unary { expr, .. } => expr.check_nested_aggregates(),
            Expr::Binary { left, right, .. } => {
                left.check_nested_aggregates()?;
                right.check_nested_aggregates()
            }
            Expr::Cast { expr, .. } => expr.check_nested_aggregates(),
            Expr::Function { name, args } => {
                let aggregate = functions::builtin(name)
                    .map(|f| f.idempotent)
                    .unwrap_or(false);
                for arg in args {
                    if aggregate && arg.is_idempotent() {
                        return Err(SqlError::parse_error(format!(
                            "nested aggregate in {}",
                            name.to_uppercase()
                        )));
                    }
                    arg.check_nested_aggregates()?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(value) => write!(f, "{}", value),
            Expr::Column(reference) => write!(f, "{}", reference),
            Expr::Variable(name) => write!(f, "{}", name),
            Expr::Unary { op, expr } => write!(f, "{}{}", op, expr),
            Expr::Binary { left, op, right } => write!(f, "{} {} {}", left, op, right),
            Expr::Function { name, args } => {
                write!(f, "{}(", name.to_uppercase())?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Expr::Cast { expr, typ } => write!(f, "CAST({} AS {})", expr, typ),
        }
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Eq => "=",
            BinaryOperator::Neq => "<>",
            BinaryOperator::Lt => "<",
            BinaryOperator::Le => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::Ge => ">=",
            BinaryOperator::And => "AND",
            BinaryOperator::Or => "OR",
        };
        write!(f, "{}", op)
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
    Minus,
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOperator::Not => write!(f, "NOT "),
            UnaryOperator::Minus => write!(f, "-"),
        }
    }
}

/// Target types of CAST expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastType {
    Boolean,
    Integer,
    Real,
    Varchar,
}

impl fmt::Display for CastType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CastType::Boolean => "BOOLEAN",
            CastType::Integer => "INTEGER",
            CastType::Real => "REAL",
            CastType::Varchar => "VARCHAR",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for CastType {
    type Err = SqlError;

    fn from_str(s: &str) -> SqlResult<CastType> {
        match s.to_uppercase().as_str() {
            "BOOLEAN" => Ok(CastType::Boolean),
            "INTEGER" => Ok(CastType::Integer),
            "REAL" => Ok(CastType::Real),
            "VARCHAR" => Ok(CastType::Varchar),
            _ => Err(SqlError::parse_error(format!("unknown cast type '{}'", s))),
        }
    }
}

/// Units accepted by DATEDIFF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateDiffUnit {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    Millisecond,
    Microsecond,
    Nanosecond,
}

impl FromStr for DateDiffUnit {
    type Err = SqlError;

    fn from_str(s: &str) -> SqlResult<DateDiffUnit> {
        match s.to_lowercase().as_str() {
            "year" => Ok(DateDiffUnit::Year),
            "month" => Ok(DateDiffUnit::Month),
            "day" => Ok(DateDiffUnit::Day),
            "hour" => Ok(DateDiffUnit::Hour),
            "minute" => Ok(DateDiffUnit::Minute),
            "second" => Ok(DateDiffUnit::Second),
            "millisecond" => Ok(DateDiffUnit::Millisecond),
            "microsecond" => Ok(DateDiffUnit::Microsecond),
            "nanosecond" => Ok(DateDiffUnit::Nanosecond),
            _ => Err(SqlError::parse_error(format!(
                "unknown datediff unit '{}'",
                s
            ))),
        }
    }
}
