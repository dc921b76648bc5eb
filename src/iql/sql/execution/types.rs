//! Core value types for the IQL query engine.
//!
//! This module contains the dynamically tagged value algebra used throughout
//! query evaluation:
//! - [`Value`] - the tagged value type with coercion, comparison and
//!   arithmetic widening rules
//! - [`Type`] - the declared-type ladder used by scopes and arrays
//! - [`ValueFormat`] - session formatting options (`REALFMT`)

use crate::iql::sql::ast::CastType;
use crate::iql::sql::error::{SqlError, SqlResult};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::ser::{SerializeSeq, Serializer};
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;

/// Value types supported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    Bool,
    Int,
    Float,
    String,
    Array,
    DateTime,
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Type::Bool => "bool",
            Type::Int => "int",
            Type::Float => "float",
            Type::String => "string",
            Type::Array => "array",
            Type::DateTime => "datetime",
        };
        write!(f, "{}", name)
    }
}

/// Literal string forms of boolean values.
pub const TRUE: &str = "true";
/// Literal string forms of boolean values.
pub const FALSE: &str = "false";

/// A value produced by expression evaluation.
///
/// All coercions go through the typed accessors ([`Value::bool_value`],
/// [`Value::int_value`], [`Value::float_value`], [`Value::datetime_value`]);
/// `Null` converts to `Null` on every accessor.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL NULL
    Null,
    /// Boolean value
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit floating point number
    Float(f64),
    /// UTF-8 string
    String(String),
    /// Array of values, all elements of one declared type
    Array { elem_type: Type, items: Vec<Value> },
    /// Point in time with a fixed UTC offset
    DateTime(DateTime<FixedOffset>),
}

impl Value {
    /// Returns a human-readable name of the value's type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Array { .. } => "array",
            Value::DateTime(_) => "datetime",
        }
    }

    /// Returns the declared type of the value, or `None` for `Null`.
    pub fn value_type(&self) -> Option<Type> {
        match self {
            Value::Null => None,
            Value::Bool(_) => Some(Type::Bool),
            Value::Int(_) => Some(Type::Int),
            Value::Float(_) => Some(Type::Float),
            Value::String(_) => Some(Type::String),
            Value::Array { .. } => Some(Type::Array),
            Value::DateTime(_) => Some(Type::DateTime),
        }
    }

    /// Returns true if the value is numeric (int or float).
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    /// Coerce to a boolean value. Numerics map through `x != 0`.
    pub fn bool_value(&self) -> SqlResult<Value> {
        match self {
            Value::Null => Ok(Value::Null),
            Value::Bool(b) => Ok(Value::Bool(*b)),
            Value::Int(i) => Ok(Value::Bool(*i != 0)),
            Value::Float(f) => Ok(Value::Bool(*f != 0.0)),
            Value::String(s) => match s.as_str() {
                TRUE => Ok(Value::Bool(true)),
                FALSE => Ok(Value::Bool(false)),
                _ => Err(SqlError::type_error("bool", "string", Some(s.clone()))),
            },
            other => Err(SqlError::type_error("bool", other.type_name(), None)),
        }
    }

    /// Coerce to an integer value. Floats truncate, strings parse,
    /// datetimes map to UNIX seconds.
    pub fn int_value(&self) -> SqlResult<Value> {
        match self {
            Value::Null => Ok(Value::Null),
            Value::Int(i) => Ok(Value::Int(*i)),
            Value::Float(f) => Ok(Value::Int(*f as i64)),
            Value::String(s) => s
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| SqlError::type_error("int", "string", Some(s.clone()))),
            Value::DateTime(dt) => Ok(Value::Int(dt.timestamp())),
            other => Err(SqlError::type_error("int", other.type_name(), None)),
        }
    }

    /// Coerce to a float value.
    pub fn float_value(&self) -> SqlResult<Value> {
        match self {
            Value::Null => Ok(Value::Null),
            Value::Int(i) => Ok(Value::Float(*i as f64)),
            Value::Float(f) => Ok(Value::Float(*f)),
            Value::String(s) => s
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| SqlError::type_error("float", "string", Some(s.clone()))),
            other => Err(SqlError::type_error("float", other.type_name(), None)),
        }
    }

    /// Coerce to a datetime. Strings parse in the documented preference
    /// order; integers map from UNIX seconds.
    pub fn datetime_value(&self) -> SqlResult<Value> {
        match self {
            Value::Null => Ok(Value::Null),
            Value::DateTime(dt) => Ok(Value::DateTime(*dt)),
            Value::String(s) => parse_datetime(s).map(Value::DateTime),
            Value::Int(i) => {
                let dt = DateTime::from_timestamp(*i, 0).ok_or_else(|| {
                    SqlError::type_error("datetime", "int", Some(i.to_string()))
                })?;
                Ok(Value::DateTime(dt.fixed_offset()))
            }
            other => Err(SqlError::type_error("datetime", other.type_name(), None)),
        }
    }

    /// CAST support: delegates to the typed accessors.
    pub fn cast_to(&self, target: CastType) -> SqlResult<Value> {
        match target {
            CastType::Boolean => self.bool_value(),
            CastType::Integer => self.int_value(),
            CastType::Real => self.float_value(),
            CastType::Varchar => match self {
                Value::Null => Ok(Value::Null),
                other => Ok(Value::String(other.to_string())),
            },
        }
    }

    /// Addition with arithmetic widening. `Int + Int` stays integer and
    /// reports overflow; mixed numerics widen to float; strings
    /// concatenate, also with stringified numeric operands.
    pub fn add(&self, other: &Value) -> SqlResult<Value> {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
            (Value::Int(a), Value::Int(b)) => a
                .checked_add(*b)
                .map(Value::Int)
                .ok_or_else(|| SqlError::type_error("int", "integer overflow in +", None)),
            (Value::Int(a), Value::Float(b)) => Ok(Value::Float(*a as f64 + b)),
            (Value::Float(a), Value::Int(b)) => Ok(Value::Float(a + *b as f64)),
            (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a + b)),
            (Value::String(a), Value::String(b)) => Ok(Value::String(format!("{}{}", a, b))),
            (Value::String(a), b) if b.is_numeric() => {
                Ok(Value::String(format!("{}{}", a, b)))
            }
            (a, Value::String(b)) if a.is_numeric() => {
                Ok(Value::String(format!("{}{}", a, b)))
            }
            (a, b) => Err(SqlError::type_error(
                "numeric or string",
                format!("{} + {}", a.type_name(), b.type_name()),
                None,
            )),
        }
    }

    /// Subtraction with arithmetic widening.
    pub fn subtract(&self, other: &Value) -> SqlResult<Value> {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
            (Value::Int(a), Value::Int(b)) => a
                .checked_sub(*b)
                .map(Value::Int)
                .ok_or_else(|| SqlError::type_error("int", "integer overflow in -", None)),
            (Value::Int(a), Value::Float(b)) => Ok(Value::Float(*a as f64 - b)),
            (Value::Float(a), Value::Int(b)) => Ok(Value::Float(a - *b as f64)),
            (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a - b)),
            (a, b) => Err(SqlError::type_error(
                "numeric",
                format!("{} - {}", a.type_name(), b.type_name()),
                None,
            )),
        }
    }

    /// Multiplication with arithmetic widening.
    pub fn multiply(&self, other: &Value) -> SqlResult<Value> {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
            (Value::Int(a), Value::Int(b)) => a
                .checked_mul(*b)
                .map(Value::Int)
                .ok_or_else(|| SqlError::type_error("int", "integer overflow in *", None)),
            (Value::Int(a), Value::Float(b)) => Ok(Value::Float(*a as f64 * b)),
            (Value::Float(a), Value::Int(b)) => Ok(Value::Float(a * *b as f64)),
            (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a * b)),
            (a, b) => Err(SqlError::type_error(
                "numeric",
                format!("{} * {}", a.type_name(), b.type_name()),
                None,
            )),
        }
    }

    /// Division. Division by zero yields `Null` for every numeric
    /// combination; this is a value-level rule, not an error.
    pub fn divide(&self, other: &Value) -> SqlResult<Value> {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
            (Value::Int(a), Value::Int(b)) => {
                if *b == 0 {
                    return Ok(Value::Null);
                }
                a.checked_div(*b)
                    .map(Value::Int)
                    .ok_or_else(|| SqlError::type_error("int", "integer overflow in /", None))
            }
            (Value::Int(a), Value::Float(b)) => {
                if *b == 0.0 {
                    return Ok(Value::Null);
                }
                Ok(Value::Float(*a as f64 / b))
            }
            (Value::Float(a), Value::Int(b)) => {
                if *b == 0 {
                    return Ok(Value::Null);
                }
                Ok(Value::Float(a / *b as f64))
            }
            (Value::Float(a), Value::Float(b)) => {
                if *b == 0.0 {
                    return Ok(Value::Null);
                }
                Ok(Value::Float(a / b))
            }
            (a, b) => Err(SqlError::type_error(
                "numeric",
                format!("{} / {}", a.type_name(), b.type_name()),
                None,
            )),
        }
    }

    /// Format with the session's real-number format.
    pub fn to_display_string(&self, format: &ValueFormat) -> SqlResult<String> {
        match self {
            Value::Null => Ok("NULL".to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            Value::Int(i) => Ok(i.to_string()),
            Value::Float(f) => format_float(&format.float, *f),
            Value::String(s) => Ok(s.clone()),
            Value::Array { items, .. } => {
                let mut parts = Vec::with_capacity(items.len());
                for item in items {
                    parts.push(item.to_display_string(format)?);
                }
                Ok(format!("[{}]", parts.join(" ")))
            }
            Value::DateTime(dt) => Ok(format_datetime(dt)),
        }
    }

    /// JSON representation of the value.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array { items, .. } => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::DateTime(dt) => serde_json::Value::String(format_datetime(dt)),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The default format always carries a valid float spec, so the
        // fallible path cannot trigger here.
        match self.to_display_string(&ValueFormat::default()) {
            Ok(s) => write!(f, "{}", s),
            Err(_) => write!(f, "{}", self.type_name()),
        }
    }
}

/// Serialization matches [`Value::to_json`]: datetimes become formatted
/// strings, arrays become sequences.
impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::String(s) => serializer.serialize_str(s),
            Value::Array { items, .. } => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::DateTime(dt) => serializer.serialize_str(&format_datetime(dt)),
        }
    }
}

/// Equality over values.
///
/// `Null` on either side compares false, including `Null = Null`.
/// Numerics widen to float; string/numeric comparisons require the string
/// side to parse as a number.
pub fn equal(a: &Value, b: &Value) -> SqlResult<bool> {
    match (a, b) {
        (Value::Null, _) | (_, Value::Null) => Ok(false),
        (Value::Bool(x), Value::Bool(y)) => Ok(x == y),
        (Value::Int(x), Value::Int(y)) => Ok(x == y),
        (Value::Int(x), Value::Float(y)) => Ok(*x as f64 == *y),
        (Value::Float(x), Value::Int(y)) => Ok(*x == *y as f64),
        (Value::Float(x), Value::Float(y)) => Ok(x == y),
        (Value::String(x), Value::String(y)) => Ok(x == y),
        (Value::String(s), n) if n.is_numeric() => numeric_string_eq(s, n),
        (n, Value::String(s)) if n.is_numeric() => numeric_string_eq(s, n),
        (Value::DateTime(x), Value::DateTime(y)) => Ok(x == y),
        (
            Value::Array {
                elem_type: ta,
                items: xs,
            },
            Value::Array {
                elem_type: tb,
                items: ys,
            },
        ) => {
            if ta != tb || xs.len() != ys.len() {
                return Ok(false);
            }
            for (x, y) in xs.iter().zip(ys.iter()) {
                if !equal(x, y)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        (a, b) => Err(SqlError::type_error(
            a.type_name(),
            b.type_name(),
            None,
        )),
    }
}

fn numeric_string_eq(s: &str, n: &Value) -> SqlResult<bool> {
    let parsed = s
        .parse::<f64>()
        .map_err(|_| SqlError::type_error("numeric", "string", Some(s.to_string())))?;
    match n.float_value()? {
        Value::Float(f) => Ok(parsed == f),
        _ => Ok(false),
    }
}

/// Total ordering over comparable values. Numerics widen to float,
/// strings compare code-point-wise, datetimes by instant. `Null` does
/// not order; callers handle it before comparing.
pub fn compare(a: &Value, b: &Value) -> SqlResult<Ordering> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Ok(x.cmp(y)),
        (Value::Int(x), Value::Float(y)) => float_cmp(*x as f64, *y),
        (Value::Float(x), Value::Int(y)) => float_cmp(*x, *y as f64),
        (Value::Float(x), Value::Float(y)) => float_cmp(*x, *y),
        (Value::String(x), Value::String(y)) => Ok(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Ok(x.cmp(y)),
        (Value::DateTime(x), Value::DateTime(y)) => Ok(x.cmp(y)),
        (a, b) => Err(SqlError::type_error(
            a.type_name(),
            b.type_name(),
            None,
        )),
    }
}

fn float_cmp(a: f64, b: f64) -> SqlResult<Ordering> {
    a.partial_cmp(&b).ok_or_else(|| {
        SqlError::type_error("comparable float", "NaN", None)
    })
}

/// Session value-formatting options, derived from the `REALFMT` system
/// variable.
#[derive(Debug, Clone)]
pub struct ValueFormat {
    /// printf-style float format specifier
    pub float: String,
}

impl Default for ValueFormat {
    fn default() -> Self {
        ValueFormat {
            float: "%g".to_string(),
        }
    }
}

/// Formats a float with a printf-style specifier (`%g`, `%.3f`,
/// `%12.4e`, ...). Supported conversions are `e`, `E`, `f`, `F`, `g`
/// and `G`.
pub fn format_float(spec: &str, v: f64) -> SqlResult<String> {
    let invalid = || SqlError::format_error(format!("invalid real format '{}'", spec));

    let body = spec.strip_prefix('%').ok_or_else(invalid)?;
    let mut chars = body.chars().peekable();

    let mut left_align = false;
    let mut zero_pad = false;
    while let Some(&c) = chars.peek() {
        match c {
            '-' => {
                left_align = true;
                chars.next();
            }
            '0' => {
                zero_pad = true;
                chars.next();
            }
            _ => break,
        }
    }

    let mut width = 0usize;
    while let Some(&c) = chars.peek() {
        if let Some(d) = c.to_digit(10) {
            width = width * 10 + d as usize;
            chars.next();
        } else {
            break;
        }
    }

    let mut precision = None;
    if chars.peek() == Some(&'.') {
        chars.next();
        let mut p = 0usize;
        while let Some(&c) = chars.peek() {
            if let Some(d) = c.to_digit(10) {
                p = p * 10 + d as usize;
                chars.next();
            } else {
                break;
            }
        }
        precision = Some(p);
    }

    let conv = chars.next().ok_or_else(invalid)?;
    if chars.next().is_some() {
        return Err(invalid());
    }

    let body = match conv {
        'f' | 'F' => format!("{:.*}", precision.unwrap_or(6), v),
        'e' => format_exponential(v, precision.unwrap_or(6)),
        'E' => format_exponential(v, precision.unwrap_or(6)).to_uppercase(),
        'g' => format_general(v, precision.unwrap_or(6)),
        'G' => format_general(v, precision.unwrap_or(6)).to_uppercase(),
        _ => return Err(invalid()),
    };

    if body.len() >= width {
        return Ok(body);
    }
    let pad = width - body.len();
    if left_align {
        Ok(format!("{}{}", body, " ".repeat(pad)))
    } else if zero_pad {
        // Zero padding goes between the sign and the digits.
        if let Some(rest) = body.strip_prefix('-') {
            Ok(format!("-{}{}", "0".repeat(pad), rest))
        } else {
            Ok(format!("{}{}", "0".repeat(pad), body))
        }
    } else {
        Ok(format!("{}{}", " ".repeat(pad), body))
    }
}

/// C-style `%e`: mantissa with fixed precision, exponent with a sign and
/// at least two digits.
fn format_exponential(v: f64, precision: usize) -> String {
    if !v.is_finite() {
        return v.to_string();
    }
    let raw = format!("{:.*e}", precision, v);
    match raw.split_once('e') {
        Some((mantissa, exp)) => {
            let exp: i32 = exp.parse().unwrap_or(0);
            format!(
                "{}e{}{:02}",
                mantissa,
                if exp < 0 { "-" } else { "+" },
                exp.abs()
            )
        }
        None => raw,
    }
}

/// C-style `%g`: significant-digit formatting with trailing zeros
/// removed, switching to exponential form for very small or very large
/// magnitudes.
fn format_general(v: f64, precision: usize) -> String {
    if !v.is_finite() {
        return v.to_string();
    }
    if v == 0.0 {
        return "0".to_string();
    }
    let p = if precision == 0 { 1 } else { precision };

    let exp_form = format!("{:.*e}", p - 1, v);
    let exp: i32 = exp_form
        .split_once('e')
        .map(|(_, e)| e.parse().unwrap_or(0))
        .unwrap_or(0);

    if exp < -4 || exp >= p as i32 {
        let mantissa = exp_form
            .split_once('e')
            .map(|(m, _)| m)
            .unwrap_or(&exp_form);
        format!(
            "{}e{}{:02}",
            trim_fraction(mantissa),
            if exp < 0 { "-" } else { "+" },
            exp.abs()
        )
    } else {
        let frac_digits = (p as i32 - 1 - exp).max(0) as usize;
        trim_fraction(&format!("{:.*}", frac_digits, v)).to_string()
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// Parses a datetime literal. Accepted forms, in preference order:
/// RFC-3339 (`2010-04-30T01:01:01.1234567-07:00`), date-time with a
/// space separator and optional zone, and a bare date. Fractional
/// seconds keep 100-nanosecond precision.
pub fn parse_datetime(s: &str) -> SqlResult<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt);
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f %:z") {
        return Ok(dt);
    }
    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(ndt.and_utc().fixed_offset());
    }
    if let Ok(nd) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(nd.and_time(NaiveTime::MIN).and_utc().fixed_offset());
    }
    Err(SqlError::type_error(
        "datetime",
        "string",
        Some(s.to_string()),
    ))
}

/// Formats a datetime as `YYYY-MM-DD HH:MM:SS[.fraction][±HH:MM]`,
/// omitting zero fractions and the zone suffix for UTC values.
pub fn format_datetime(dt: &DateTime<FixedOffset>) -> String {
    let mut out = dt.format("%Y-%m-%d %H:%M:%S").to_string();
    let nanos = dt.nanosecond() % 1_000_000_000;
    if nanos > 0 {
        let frac = format!("{:09}", nanos);
        out.push('.');
        out.push_str(frac.trim_end_matches('0'));
    }
    if dt.offset().local_minus_utc() != 0 {
        out.push_str(&dt.format("%:z").to_string());
    }
    out
}
