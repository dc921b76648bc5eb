//! Expression evaluator.
//!
//! Evaluates [`Expr`] trees against the current row tuple and, for
//! aggregate calls, over a grouped row set. One row and one column-metadata
//! list exist per FROM source; single-source queries carry length-1 slices.

use crate::iql::sql::ast::{BinaryOperator, Expr, UnaryOperator};
use crate::iql::sql::error::{SqlError, SqlResult};
use crate::iql::sql::execution::expression::functions;
use crate::iql::sql::execution::source::{Column, ColumnSelector, ColumnType, Reference, Row};
use crate::iql::sql::execution::types::{self, Value};
use crate::iql::sql::scope::Scope;
use std::cmp::Ordering;

/// Everything an expression sees during evaluation.
#[derive(Clone, Copy)]
pub struct EvalContext<'a> {
    /// Current row tuple, one row per FROM source
    pub row: &'a [Row],
    /// Column metadata aligned with `row`
    pub columns: &'a [Vec<ColumnSelector>],
    /// FROM binding names aligned with `row`, for absolute references
    pub aliases: &'a [Option<String>],
    /// Grouped row set; present only while an aggregate call evaluates
    pub rows: Option<&'a [Vec<Row>]>,
    /// Variable scope
    pub scope: &'a Scope,
}

impl<'a> EvalContext<'a> {
    /// A context with no input rows, for row-independent expressions.
    pub fn standalone(scope: &'a Scope) -> EvalContext<'a> {
        EvalContext {
            row: &[],
            columns: &[],
            aliases: &[],
            rows: None,
            scope,
        }
    }

    /// The same context with a grouped row set attached.
    pub fn with_groups(&self, rows: &'a [Vec<Row>]) -> EvalContext<'a> {
        EvalContext {
            rows: Some(rows),
            ..*self
        }
    }

    /// Per-row context used inside aggregate iteration: the group row
    /// becomes the current tuple and the group set is cleared.
    pub fn for_group_row(&self, row: &'a [Row]) -> EvalContext<'a> {
        EvalContext {
            row,
            rows: None,
            ..*self
        }
    }
}

/// Expression evaluation entry points.
pub struct ExpressionEvaluator;

impl ExpressionEvaluator {
    /// Evaluates an expression to a value.
    pub fn evaluate(expr: &Expr, ctx: &EvalContext) -> SqlResult<Value> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Column(reference) => Self::resolve_reference(reference, ctx),
            Expr::Variable(name) => Ok(ctx
                .scope
                .get(name)
                .map(|var| var.value)
                .unwrap_or(Value::Null)),
            Expr::Unary { op, expr } => Self::evaluate_unary(*op, expr, ctx),
            Expr::Binary { left, op, right } => Self::evaluate_binary(left, *op, right, ctx),
            Expr::Function { name, args } => match functions::builtin(name) {
                Some(function) => function.call(args, ctx),
                None => Err(SqlError::parse_error(format!(
                    "unknown function '{}'",
                    name.to_uppercase()
                ))),
            },
            Expr::Cast { expr, typ } => Self::evaluate(expr, ctx)?.cast_to(*typ),
        }
    }

    /// Evaluates an expression to a boolean row filter. `Null` does not
    /// match.
    pub fn evaluate_predicate(expr: &Expr, ctx: &EvalContext) -> SqlResult<bool> {
        match Self::evaluate(expr, ctx)?.bool_value()? {
            Value::Bool(b) => Ok(b),
            _ => Ok(false),
        }
    }

    /// Looks up a column reference in the current row tuple and converts
    /// the cell through the selector's resolved type.
    fn resolve_reference(reference: &Reference, ctx: &EvalContext) -> SqlResult<Value> {
        for (source_idx, columns) in ctx.columns.iter().enumerate() {
            if let Some(wanted) = &reference.source {
                let alias = ctx.aliases.get(source_idx).and_then(|a| a.as_deref());
                if alias != Some(wanted.as_str()) {
                    continue;
                }
            }
            if let Ok(idx) = reference.column.parse::<usize>() {
                if idx < columns.len() {
                    return Self::cell_value(ctx, source_idx, idx, &columns[idx]);
                }
            }
            for (column_idx, selector) in columns.iter().enumerate() {
                if selector.display_name() == reference.column
                    || selector.name.column == reference.column
                {
                    return Self::cell_value(ctx, source_idx, column_idx, selector);
                }
            }
            if reference.source.is_some() {
                break;
            }
        }
        Err(SqlError::parse_error(format!(
            "unknown column '{}'",
            reference
        )))
    }

    fn cell_value(
        ctx: &EvalContext,
        source_idx: usize,
        column_idx: usize,
        selector: &ColumnSelector,
    ) -> SqlResult<Value> {
        let cell = ctx
            .row
            .get(source_idx)
            .and_then(|row| row.get(column_idx))
            .ok_or_else(|| {
                SqlError::parse_error(format!("no current row for column '{}'", selector))
            })?;
        match selector.typ {
            ColumnType::Bool => cell.as_bool(),
            ColumnType::Int => cell.as_int(),
            ColumnType::Float => cell.as_float(),
            ColumnType::String => match cell {
                Column::Null => Ok(Value::Null),
                other => Ok(Value::String(other.to_string())),
            },
        }
    }

    fn evaluate_unary(op: UnaryOperator, expr: &Expr, ctx: &EvalContext) -> SqlResult<Value> {
        let value = Self::evaluate(expr, ctx)?;
        if value == Value::Null {
            return Ok(Value::Null);
        }
        match op {
            UnaryOperator::Not => match value.bool_value()? {
                Value::Bool(b) => Ok(Value::Bool(!b)),
                _ => Ok(Value::Null),
            },
            UnaryOperator::Minus => match value {
                Value::Int(i) => i
                    .checked_neg()
                    .map(Value::Int)
                    .ok_or_else(|| SqlError::type_error("int", "integer overflow in -", None)),
                Value::Float(f) => Ok(Value::Float(-f)),
                other => Err(SqlError::type_error("numeric", other.type_name(), None)),
            },
        }
    }

    fn evaluate_binary(
        left: &Expr,
        op: BinaryOperator,
        right: &Expr,
        ctx: &EvalContext,
    ) -> SqlResult<Value> {
        // AND/OR short-circuit before the right side evaluates.
        match op {
            BinaryOperator::And => {
                if !Self::evaluate_predicate(left, ctx)? {
                    return Ok(Value::Bool(false));
                }
                return Ok(Value::Bool(Self::evaluate_predicate(right, ctx)?));
            }
            BinaryOperator::Or => {
                if Self::evaluate_predicate(left, ctx)? {
                    return Ok(Value::Bool(true));
                }
                return Ok(Value::Bool(Self::evaluate_predicate(right, ctx)?));
            }
            _ => {}
        }

        let lhs = Self::evaluate(left, ctx)?;
        let rhs = Self::evaluate(right, ctx)?;

        match op {
            BinaryOperator::Add => lhs.add(&rhs),
            BinaryOperator::Subtract => lhs.subtract(&rhs),
            BinaryOperator::Multiply => lhs.multiply(&rhs),
            BinaryOperator::Divide => lhs.divide(&rhs),
            // Comparisons against Null never match.
            BinaryOperator::Eq => Ok(Value::Bool(types::equal(&lhs, &rhs)?)),
            BinaryOperator::Neq => {
                if lhs == Value::Null || rhs == Value::Null {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(!types::equal(&lhs, &rhs)?))
            }
            BinaryOperator::Lt => Self::compare_op(&lhs, &rhs, |ord| ord == Ordering::Less),
            BinaryOperator::Le => Self::compare_op(&lhs, &rhs, |ord| ord != Ordering::Greater),
            BinaryOperator::Gt => Self::compare_op(&lhs, &rhs, |ord| ord == Ordering::Greater),
            BinaryOperator::Ge => Self::compare_op(&lhs, &rhs, |ord| ord != Ordering::Less),
            BinaryOperator::And | BinaryOperator::Or => unreachable!("handled above"),
        }
    }

    fn compare_op(lhs: &Value, rhs: &Value, test: fn(Ordering) -> bool) -> SqlResult<Value> {
        if *lhs == Value::Null || *rhs == Value::Null {
            return Ok(Value::Bool(false));
        }
        Ok(Value::Bool(test(types::compare(lhs, rhs)?)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iql::sql::execution::types::Type;

    fn eval(expr: &Expr) -> SqlResult<Value> {
        let scope = Scope::new();
        let ctx = EvalContext::standalone(&scope);
        ExpressionEvaluator::evaluate(expr, &ctx)
    }

    fn binary(left: Expr, op: BinaryOperator, right: Expr) -> Expr {
        Expr::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    #[test]
    fn test_literal_and_arithmetic() {
        let expr = binary(
            Expr::literal(Value::Int(2)),
            BinaryOperator::Multiply,
            Expr::literal(Value::Int(21)),
        );
        assert_eq!(eval(&expr).unwrap(), Value::Int(42));
    }

    #[test]
    fn test_division_through_nullif() {
        // SELECT 5 / NULLIF(0.0, 0.0) => NULL
        let expr = binary(
            Expr::literal(Value::Int(5)),
            BinaryOperator::Divide,
            Expr::function(
                "NULLIF",
                vec![
                    Expr::literal(Value::Float(0.0)),
                    Expr::literal(Value::Float(0.0)),
                ],
            ),
        );
        assert_eq!(eval(&expr).unwrap(), Value::Null);

        // SELECT 5 / NULLIF(5.0, 0.0) => 1
        let expr = binary(
            Expr::literal(Value::Int(5)),
            BinaryOperator::Divide,
            Expr::function(
                "NULLIF",
                vec![
                    Expr::literal(Value::Float(5.0)),
                    Expr::literal(Value::Float(0.0)),
                ],
            ),
        );
        assert_eq!(eval(&expr).unwrap().to_string(), "1");
    }

    #[test]
    fn test_null_comparisons_never_match() {
        for op in [
            BinaryOperator::Eq,
            BinaryOperator::Neq,
            BinaryOperator::Lt,
            BinaryOperator::Ge,
        ] {
            let expr = binary(
                Expr::literal(Value::Null),
                op,
                Expr::literal(Value::Int(1)),
            );
            assert_eq!(eval(&expr).unwrap(), Value::Bool(false), "op {:?}", op);
        }
    }

    #[test]
    fn test_variable_lookup() {
        let scope = Scope::new();
        scope.declare("nstring", Type::String, None);
        scope
            .set("nstring", Value::String("Åkergatan 24".to_string()))
            .unwrap();
        let ctx = EvalContext::standalone(&scope);

        let expr = Expr::function("UNICODE", vec![Expr::Variable("nstring".to_string())]);
        assert_eq!(
            ExpressionEvaluator::evaluate(&expr, &ctx).unwrap(),
            Value::Int(197)
        );

        // Unknown variable reads are Null.
        let expr = Expr::Variable("missing".to_string());
        assert_eq!(
            ExpressionEvaluator::evaluate(&expr, &ctx).unwrap(),
            Value::Null
        );
    }

    #[test]
    fn test_cast_expression() {
        use crate::iql::sql::ast::CastType;
        let expr = Expr::Cast {
            expr: Box::new(Expr::literal(Value::String("5".to_string()))),
            typ: CastType::Integer,
        };
        assert_eq!(eval(&expr).unwrap(), Value::Int(5));

        let expr = Expr::Cast {
            expr: Box::new(Expr::literal(Value::Float(5.0))),
            typ: CastType::Varchar,
        };
        assert_eq!(eval(&expr).unwrap(), Value::String("5".to_string()));
    }

    #[test]
    fn test_column_resolution() {
        let columns = vec![vec![
            ColumnSelector {
                name: Reference::column("Year"),
                alias: String::new(),
                typ: ColumnType::Int,
            },
            ColumnSelector {
                name: Reference::column("Name"),
                alias: String::new(),
                typ: ColumnType::String,
            },
        ]];
        let row = vec![vec![
            Column::String("1970".to_string()),
            Column::String("epoch".to_string()),
        ]];
        let aliases = vec![Some("data".to_string())];
        let scope = Scope::new();
        let ctx = EvalContext {
            row: &row,
            columns: &columns,
            aliases: &aliases,
            rows: None,
            scope: &scope,
        };

        assert_eq!(
            ExpressionEvaluator::evaluate(&Expr::column("Year"), &ctx).unwrap(),
            Value::Int(1970)
        );
        // Zero-based positional reference.
        assert_eq!(
            ExpressionEvaluator::evaluate(&Expr::column("1"), &ctx).unwrap(),
            Value::String("epoch".to_string())
        );
        // Absolute reference through the FROM alias.
        let absolute = Expr::Column(Reference {
            source: Some("data".to_string()),
            column: "Year".to_string(),
        });
        assert_eq!(
            ExpressionEvaluator::evaluate(&absolute, &ctx).unwrap(),
            Value::Int(1970)
        );
        // Wrong alias does not resolve.
        let wrong = Expr::Column(Reference {
            source: Some("other".to_string()),
            column: "Year".to_string(),
        });
        assert!(ExpressionEvaluator::evaluate(&wrong, &ctx).is_err());
    }

    #[test]
    fn test_aggregates_over_groups() {
        let columns = vec![vec![ColumnSelector {
            name: Reference::column("Year"),
            alias: String::new(),
            typ: ColumnType::Int,
        }]];
        let groups: Vec<Vec<Row>> = (1970..1975)
            .map(|year| vec![vec![Column::String(year.to_string())]])
            .collect();
        let aliases = vec![None];
        let scope = Scope::new();
        let base = EvalContext {
            row: &groups[0],
            columns: &columns,
            aliases: &aliases,
            rows: None,
            scope: &scope,
        };
        let ctx = base.with_groups(&groups);

        let cases: &[(&str, Value)] = &[
            ("AVG", Value::Int(1972)),
            ("COUNT", Value::Int(5)),
            ("MAX", Value::Int(1974)),
            ("MIN", Value::Int(1970)),
            ("SUM", Value::Int(9860)),
        ];
        for (name, expected) in cases {
            let expr = Expr::function(*name, vec![Expr::column("Year")]);
            assert_eq!(
                ExpressionEvaluator::evaluate(&expr, &ctx).unwrap(),
                *expected,
                "{}",
                name
            );
        }
    }

    #[test]
    fn test_logical_operators() {
        let t = Expr::literal(Value::Bool(true));
        let f = Expr::literal(Value::Bool(false));
        assert_eq!(
            eval(&binary(t.clone(), BinaryOperator::And, f.clone())).unwrap(),
            Value::Bool(false)
        );
        assert_eq!(
            eval(&binary(t.clone(), BinaryOperator::Or, f.clone())).unwrap(),
            Value::Bool(true)
        );
        let not = Expr::Unary {
            op: UnaryOperator::Not,
            expr: Box::new(f),
        };
        assert_eq!(eval(&not).unwrap(), Value::Bool(true));
    }
}
