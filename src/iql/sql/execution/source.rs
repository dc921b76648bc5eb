//! Data source contract: columns, rows, selectors and type inference.
//!
//! A [`Source`] is a materialized table with typed columns. Adapters (CSV,
//! HTML) and [`Query`](crate::iql::sql::execution::query::Query) results all
//! implement the same contract so that query outputs compose as inputs.

use crate::iql::sql::error::{SqlError, SqlResult};
use crate::iql::sql::execution::types::{Value, FALSE, TRUE};
use std::fmt;

/// Resolved type of a data column.
///
/// Types form a ladder `Bool < Int < Float < String`; inference only ever
/// moves up the ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ColumnType {
    Bool,
    Int,
    Float,
    String,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Bool => "bool",
            ColumnType::Int => "int",
            ColumnType::Float => "float",
            ColumnType::String => "string",
        };
        write!(f, "{}", name)
    }
}

/// Column alignment for tabulated output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

impl ColumnType {
    /// Tabulation alignment: strings left, everything else right.
    pub fn align(&self) -> Align {
        match self {
            ColumnType::String => Align::Left,
            _ => Align::Right,
        }
    }
}

/// A reference to a data column, optionally qualified with a source name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Reference {
    pub source: Option<String>,
    pub column: String,
}

impl Reference {
    /// Parses dotted notation. At most one dot is permitted.
    pub fn parse(name: &str) -> SqlResult<Reference> {
        let parts: Vec<&str> = name.split('.').collect();
        match parts.as_slice() {
            [column] => Ok(Reference {
                source: None,
                column: (*column).to_string(),
            }),
            [source, column] => Ok(Reference {
                source: Some((*source).to_string()),
                column: (*column).to_string(),
            }),
            _ => Err(SqlError::parse_error(format!(
                "invalid column reference '{}'",
                name
            ))),
        }
    }

    /// Creates an unqualified reference.
    pub fn column(name: impl Into<String>) -> Reference {
        Reference {
            source: None,
            column: name.into(),
        }
    }

    /// True when both the source and the column are specified.
    pub fn is_absolute(&self) -> bool {
        self.source.is_some()
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{}.{}", source, self.column),
            None => write!(f, "{}", self.column),
        }
    }
}

/// Binds an input column reference to an output column with an alias and
/// an inferred type.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSelector {
    pub name: Reference,
    pub alias: String,
    pub typ: ColumnType,
}

impl ColumnSelector {
    pub fn new(name: Reference, alias: impl Into<String>) -> ColumnSelector {
        ColumnSelector {
            name,
            alias: alias.into(),
            typ: ColumnType::Bool,
        }
    }

    /// The alias when set, the referenced column name otherwise.
    pub fn display_name(&self) -> &str {
        if self.alias.is_empty() {
            &self.name.column
        } else {
            &self.alias
        }
    }

    /// A column is public when the first code point of its display name
    /// is uppercase.
    pub fn is_public(&self) -> bool {
        self.display_name()
            .chars()
            .next()
            .map(char::is_uppercase)
            .unwrap_or(false)
    }

    /// Resolves the most specific column type able to represent every
    /// observed value. Must be called once per cell during ingest.
    /// Empty values never promote.
    pub fn resolve_type(&mut self, val: &str) {
        if val.is_empty() {
            return;
        }
        loop {
            match self.typ {
                ColumnType::Bool => {
                    if val == TRUE || val == FALSE {
                        return;
                    }
                    self.typ = ColumnType::Int;
                }
                ColumnType::Int => {
                    if val.parse::<i64>().is_ok() {
                        return;
                    }
                    self.typ = ColumnType::Float;
                }
                ColumnType::Float => {
                    if val.parse::<f64>().is_ok() {
                        return;
                    }
                    self.typ = ColumnType::String;
                }
                ColumnType::String => return,
            }
        }
    }
}

impl fmt::Display for ColumnSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// A single cell of a row.
///
/// The column abstraction hides whether the underlying cell is scalar,
/// multi-valued or missing; the typed accessors implement the coercion
/// rules shared by every adapter.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    /// Missing cell
    Null,
    /// Scalar cell
    String(String),
    /// Multi-valued cell
    Strings(Vec<String>),
}

impl Column {
    /// Number of elements in the cell.
    pub fn count(&self) -> usize {
        match self {
            Column::Null => 0,
            Column::String(_) => 1,
            Column::Strings(items) => items.len(),
        }
    }

    /// Cell size in bytes; the longest element for multi-valued cells.
    pub fn size(&self) -> usize {
        match self {
            Column::Null => 0,
            Column::String(s) => s.len(),
            Column::Strings(items) => items.iter().map(|s| s.len()).max().unwrap_or(0),
        }
    }

    /// Coerce the cell to a boolean value. Empty cells yield `Null`.
    pub fn as_bool(&self) -> SqlResult<Value> {
        match self {
            Column::Null => Ok(Value::Null),
            Column::String(s) => {
                if s.is_empty() {
                    return Ok(Value::Null);
                }
                match s.as_str() {
                    TRUE => Ok(Value::Bool(true)),
                    FALSE => Ok(Value::Bool(false)),
                    _ => Err(SqlError::type_error("bool", "string", Some(s.clone()))),
                }
            }
            Column::Strings(items) => {
                if items.is_empty() {
                    Ok(Value::Null)
                } else {
                    Err(SqlError::type_error("bool", "string array", None))
                }
            }
        }
    }

    /// Coerce the cell to an integer value. Empty cells yield `Null`.
    pub fn as_int(&self) -> SqlResult<Value> {
        match self {
            Column::Null => Ok(Value::Null),
            Column::String(s) => {
                if s.is_empty() {
                    return Ok(Value::Null);
                }
                s.parse::<i64>()
                    .map(Value::Int)
                    .map_err(|_| SqlError::type_error("int", "string", Some(s.clone())))
            }
            Column::Strings(items) => {
                if items.is_empty() {
                    Ok(Value::Null)
                } else {
                    Err(SqlError::type_error("int", "string array", None))
                }
            }
        }
    }

    /// Coerce the cell to a float value. Empty cells yield `Null`.
    pub fn as_float(&self) -> SqlResult<Value> {
        match self {
            Column::Null => Ok(Value::Null),
            Column::String(s) => {
                if s.is_empty() {
                    return Ok(Value::Null);
                }
                s.parse::<f64>()
                    .map(Value::Float)
                    .map_err(|_| SqlError::type_error("float", "string", Some(s.clone())))
            }
            Column::Strings(items) => {
                if items.is_empty() {
                    Ok(Value::Null)
                } else {
                    Err(SqlError::type_error("float", "string array", None))
                }
            }
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Column::Null => write!(f, "NULL"),
            Column::String(s) => write!(f, "{}", s),
            Column::Strings(items) => write!(f, "[{}]", items.join(" ")),
        }
    }
}

/// An input data row; one [`Column`] per selector of the owning source.
pub type Row = Vec<Column>;

/// A materialized, iterable table with typed columns.
pub trait Source: std::fmt::Debug {
    /// Column metadata with final resolved types.
    fn columns(&self) -> &[ColumnSelector];

    /// All rows of the source, in ingest order. Every row has exactly
    /// `columns().len()` cells. Repeated calls return the same rows.
    fn get(&mut self) -> SqlResult<Vec<Row>>;
}
