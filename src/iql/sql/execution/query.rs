//! Query execution as a composable data source.
//!
//! A [`Query`] projects expressions over the rows of its FROM sources and
//! is itself a [`Source`], so subqueries in FROM compose without special
//! cases. Sources materialize eagerly; a query evaluates once and caches
//! its result rows.

use crate::iql::sql::ast::Expr;
use crate::iql::sql::error::{SqlError, SqlResult};
use crate::iql::sql::execution::expression::evaluator::{EvalContext, ExpressionEvaluator};
use crate::iql::sql::execution::source::{Column, ColumnSelector, Reference, Row, Source};
use crate::iql::sql::scope::{self, Scope};
use crate::iql::sql::execution::types::Value;
use log::debug;
use std::rc::Rc;

/// One projected output column.
#[derive(Debug, Clone)]
pub struct SelectItem {
    pub expr: Expr,
    pub alias: String,
}

impl SelectItem {
    pub fn new(expr: Expr, alias: impl Into<String>) -> SelectItem {
        SelectItem {
            expr,
            alias: alias.into(),
        }
    }
}

/// A FROM clause entry: a source with an optional binding name for
/// absolute column references.
#[derive(Debug)]
pub struct FromBinding {
    pub alias: Option<String>,
    pub source: Box<dyn Source>,
}

impl FromBinding {
    pub fn new(alias: Option<String>, source: Box<dyn Source>) -> FromBinding {
        FromBinding { alias, source }
    }
}

/// A SELECT query over zero or more sources.
#[derive(Debug)]
pub struct Query {
    select: Vec<SelectItem>,
    from: Vec<FromBinding>,
    where_clause: Option<Expr>,
    scope: Rc<Scope>,
    columns: Vec<ColumnSelector>,
    resolved: Option<Vec<Row>>,
}

impl Query {
    /// Builds a query. Rejects empty projections, aggregate calls in
    /// WHERE and aggregates nested inside aggregates.
    pub fn new(
        select: Vec<SelectItem>,
        from: Vec<FromBinding>,
        where_clause: Option<Expr>,
        scope: Rc<Scope>,
    ) -> SqlResult<Query> {
        if select.is_empty() {
            return Err(SqlError::parse_error("SELECT requires at least one column"));
        }
        for item in &select {
            item.expr.check_nested_aggregates()?;
        }
        if let Some(filter) = &where_clause {
            filter.check_nested_aggregates()?;
            if filter.is_idempotent() {
                return Err(SqlError::parse_error("aggregate function in WHERE"));
            }
        }

        let columns = select
            .iter()
            .map(|item| {
                ColumnSelector::new(Reference::column(item.expr.to_string()), item.alias.clone())
            })
            .collect();

        Ok(Query {
            select,
            from,
            where_clause,
            scope,
            columns,
            resolved: None,
        })
    }

    fn materialize(&mut self) -> SqlResult<Vec<Row>> {
        let cancel = self.scope.cancel_token();

        let mut source_rows = Vec::with_capacity(self.from.len());
        for binding in &mut self.from {
            source_rows.push(binding.source.get()?);
        }
        let columns_meta: Vec<Vec<ColumnSelector>> = self
            .from
            .iter()
            .map(|binding| binding.source.columns().to_vec())
            .collect();
        let aliases: Vec<Option<String>> = self
            .from
            .iter()
            .map(|binding| binding.alias.clone())
            .collect();

        // Cross product of the FROM sources. A query without FROM
        // evaluates against a single empty tuple.
        let mut tuples: Vec<Vec<Row>> = vec![Vec::new()];
        for rows in source_rows {
            let mut next = Vec::with_capacity(tuples.len() * rows.len().max(1));
            for tuple in &tuples {
                for row in &rows {
                    let mut extended = tuple.clone();
                    extended.push(row.clone());
                    next.push(extended);
                }
            }
            tuples = next;
        }

        let format = scope::format(&self.scope);
        let mut filtered = Vec::with_capacity(tuples.len());
        for tuple in tuples {
            cancel.check()?;
            let keep = match &self.where_clause {
                Some(filter) => {
                    let ctx = EvalContext {
                        row: &tuple,
                        columns: &columns_meta,
                        aliases: &aliases,
                        rows: None,
                        scope: &self.scope,
                    };
                    ExpressionEvaluator::evaluate_predicate(filter, &ctx)?
                }
                None => true,
            };
            if keep {
                filtered.push(tuple);
            }
        }

        let aggregate = self.select.iter().any(|item| item.expr.is_idempotent());
        let mut rows = Vec::new();

        if aggregate {
            let empty_tuple: Vec<Row> = vec![Vec::new(); self.from.len()];
            let representative = filtered.first().unwrap_or(&empty_tuple);
            let base = EvalContext {
                row: representative,
                columns: &columns_meta,
                aliases: &aliases,
                rows: None,
                scope: &self.scope,
            };
            let ctx = base.with_groups(&filtered);
            let mut row = Vec::with_capacity(self.select.len());
            for (idx, item) in self.select.iter().enumerate() {
                let value = ExpressionEvaluator::evaluate(&item.expr, &ctx)?;
                row.push(output_cell(&mut self.columns[idx], &value, &format)?);
            }
            rows.push(row);
        } else {
            for tuple in &filtered {
                cancel.check()?;
                let ctx = EvalContext {
                    row: tuple,
                    columns: &columns_meta,
                    aliases: &aliases,
                    rows: None,
                    scope: &self.scope,
                };
                let mut row = Vec::with_capacity(self.select.len());
                for (idx, item) in self.select.iter().enumerate() {
                    let value = ExpressionEvaluator::evaluate(&item.expr, &ctx)?;
                    row.push(output_cell(&mut self.columns[idx], &value, &format)?);
                }
                rows.push(row);
            }
        }

        debug!(
            "query materialized {} rows over {} columns",
            rows.len(),
            self.columns.len()
        );
        Ok(rows)
    }
}

/// Formats an output value, feeding the column's type inference.
fn output_cell(
    selector: &mut ColumnSelector,
    value: &Value,
    format: &crate::iql::sql::execution::types::ValueFormat,
) -> SqlResult<Column> {
    match value {
        Value::Null => Ok(Column::Null),
        other => {
            let text = other.to_display_string(format)?;
            selector.resolve_type(&text);
            Ok(Column::String(text))
        }
    }
}

impl Source for Query {
    fn columns(&self) -> &[ColumnSelector] {
        &self.columns
    }

    fn get(&mut self) -> SqlResult<Vec<Row>> {
        if let Some(rows) = &self.resolved {
            return Ok(rows.clone());
        }
        let rows = self.materialize()?;
        self.resolved = Some(rows.clone());
        Ok(rows)
    }
}
