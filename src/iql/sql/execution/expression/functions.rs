//! Built-in scalar and aggregate functions.
//!
//! The registry is a process-wide table keyed by uppercase name; lookup is
//! case-insensitive. Aggregate functions are marked idempotent: their value
//! depends on the whole row group and they are evaluated exactly once per
//! group.

use crate::iql::sql::ast::{DateDiffUnit, Expr};
use crate::iql::sql::error::{SqlError, SqlResult};
use crate::iql::sql::execution::expression::evaluator::{EvalContext, ExpressionEvaluator};
use crate::iql::sql::execution::source::Row;
use crate::iql::sql::execution::types::Value;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Datelike, FixedOffset, Utc};
use std::collections::HashMap;
use std::sync::LazyLock;

/// Built-in function handler signature.
pub type FunctionImpl = fn(&[Expr], &EvalContext) -> SqlResult<Value>;

/// A built-in function with its arity contract.
pub struct Function {
    pub name: &'static str,
    pub min_args: usize,
    pub max_args: usize,
    /// Aggregates are idempotent: row-group-dependent, evaluated once
    /// per group.
    pub idempotent: bool,
    handler: FunctionImpl,
}

impl Function {
    /// Validates the argument count and runs the implementation.
    pub fn call(&self, args: &[Expr], ctx: &EvalContext) -> SqlResult<Value> {
        if args.len() < self.min_args || args.len() > self.max_args {
            return Err(SqlError::ArityError {
                function: self.name.to_string(),
                min_args: self.min_args,
                max_args: self.max_args,
                given: args.len(),
            });
        }
        (self.handler)(args, ctx)
    }
}

const MAX_CONCAT_ARGS: usize = 254;

static BUILT_INS: &[Function] = &[
    // Aggregate functions.
    Function {
        name: "AVG",
        min_args: 1,
        max_args: 1,
        idempotent: true,
        handler: builtin_avg,
    },
    Function {
        name: "COUNT",
        min_args: 1,
        max_args: 1,
        idempotent: true,
        handler: builtin_count,
    },
    Function {
        name: "MAX",
        min_args: 1,
        max_args: 1,
        idempotent: true,
        handler: builtin_max,
    },
    Function {
        name: "MIN",
        min_args: 1,
        max_args: 1,
        idempotent: true,
        handler: builtin_min,
    },
    Function {
        name: "SUM",
        min_args: 1,
        max_args: 1,
        idempotent: true,
        handler: builtin_sum,
    },
    Function {
        name: "NULLIF",
        min_args: 2,
        max_args: 2,
        idempotent: false,
        handler: builtin_nullif,
    },
    // String functions.
    Function {
        name: "BASE64DEC",
        min_args: 1,
        max_args: 1,
        idempotent: false,
        handler: builtin_base64dec,
    },
    Function {
        name: "BASE64ENC",
        min_args: 1,
        max_args: 1,
        idempotent: false,
        handler: builtin_base64enc,
    },
    Function {
        name: "CHAR",
        min_args: 1,
        max_args: 1,
        idempotent: false,
        handler: builtin_char,
    },
    Function {
        name: "CHARINDEX",
        min_args: 2,
        max_args: 3,
        idempotent: false,
        handler: builtin_charindex,
    },
    Function {
        name: "CONCAT",
        min_args: 2,
        max_args: MAX_CONCAT_ARGS,
        idempotent: false,
        handler: builtin_concat,
    },
    Function {
        name: "CONCAT_WS",
        min_args: 2,
        max_args: MAX_CONCAT_ARGS,
        idempotent: false,
        handler: builtin_concat_ws,
    },
    Function {
        name: "LASTCHARINDEX",
        min_args: 2,
        max_args: 2,
        idempotent: false,
        handler: builtin_lastcharindex,
    },
    Function {
        name: "LEFT",
        min_args: 2,
        max_args: 2,
        idempotent: false,
        handler: builtin_left,
    },
    Function {
        name: "LEN",
        min_args: 1,
        max_args: 1,
        idempotent: false,
        handler: builtin_len,
    },
    Function {
        name: "LOWER",
        min_args: 1,
        max_args: 1,
        idempotent: false,
        handler: builtin_lower,
    },
    Function {
        name: "LPAD",
        min_args: 2,
        max_args: 3,
        idempotent: false,
        handler: builtin_lpad,
    },
    Function {
        name: "LTRIM",
        min_args: 1,
        max_args: 1,
        idempotent: false,
        handler: builtin_ltrim,
    },
    Function {
        name: "NCHAR",
        min_args: 1,
        max_args: 1,
        idempotent: false,
        handler: builtin_char,
    },
    Function {
        name: "REPLICATE",
        min_args: 2,
        max_args: 2,
        idempotent: false,
        handler: builtin_replicate,
    },
    Function {
        name: "REVERSE",
        min_args: 1,
        max_args: 1,
        idempotent: false,
        handler: builtin_reverse,
    },
    Function {
        name: "RIGHT",
        min_args: 2,
        max_args: 2,
        idempotent: false,
        handler: builtin_right,
    },
    Function {
        name: "RTRIM",
        min_args: 1,
        max_args: 1,
        idempotent: false,
        handler: builtin_rtrim,
    },
    Function {
        name: "SPACE",
        min_args: 1,
        max_args: 1,
        idempotent: false,
        handler: builtin_space,
    },
    Function {
        name: "STUFF",
        min_args: 4,
        max_args: 4,
        idempotent: false,
        handler: builtin_stuff,
    },
    Function {
        name: "SUBSTRING",
        min_args: 3,
        max_args: 3,
        idempotent: false,
        handler: builtin_substring,
    },
    Function {
        name: "TRIM",
        min_args: 1,
        max_args: 1,
        idempotent: false,
        handler: builtin_trim,
    },
    Function {
        name: "UNICODE",
        min_args: 1,
        max_args: 1,
        idempotent: false,
        handler: builtin_unicode,
    },
    Function {
        name: "UPPER",
        min_args: 1,
        max_args: 1,
        idempotent: false,
        handler: builtin_upper,
    },
    // Datetime functions.
    Function {
        name: "DATEDIFF",
        min_args: 3,
        max_args: 3,
        idempotent: false,
        handler: builtin_datediff,
    },
    Function {
        name: "DAY",
        min_args: 1,
        max_args: 1,
        idempotent: false,
        handler: builtin_day,
    },
    Function {
        name: "GETDATE",
        min_args: 0,
        max_args: 0,
        idempotent: false,
        handler: builtin_getdate,
    },
    Function {
        name: "MONTH",
        min_args: 1,
        max_args: 1,
        idempotent: false,
        handler: builtin_month,
    },
    Function {
        name: "YEAR",
        min_args: 1,
        max_args: 1,
        idempotent: false,
        handler: builtin_year,
    },
];

static BUILT_INS_BY_NAME: LazyLock<HashMap<&'static str, &'static Function>> =
    LazyLock::new(|| BUILT_INS.iter().map(|f| (f.name, f)).collect());

/// Case-insensitive built-in lookup.
pub fn builtin(name: &str) -> Option<&'static Function> {
    BUILT_INS_BY_NAME.get(name.to_uppercase().as_str()).copied()
}

// Argument evaluation helpers. `None` stands for a Null argument so that
// every function spells out its own null behavior.

fn eval_string(expr: &Expr, ctx: &EvalContext) -> SqlResult<Option<String>> {
    match ExpressionEvaluator::evaluate(expr, ctx)? {
        Value::Null => Ok(None),
        value => Ok(Some(value.to_string())),
    }
}

fn eval_int(expr: &Expr, ctx: &EvalContext) -> SqlResult<Option<i64>> {
    match ExpressionEvaluator::evaluate(expr, ctx)?.int_value()? {
        Value::Null => Ok(None),
        Value::Int(i) => Ok(Some(i)),
        other => Err(SqlError::type_error("int", other.type_name(), None)),
    }
}

fn eval_datetime(expr: &Expr, ctx: &EvalContext) -> SqlResult<Option<DateTime<FixedOffset>>> {
    match ExpressionEvaluator::evaluate(expr, ctx)?.datetime_value()? {
        Value::Null => Ok(None),
        Value::DateTime(dt) => Ok(Some(dt)),
        other => Err(SqlError::type_error("datetime", other.type_name(), None)),
    }
}

fn group_rows<'a>(name: &str, ctx: &EvalContext<'a>) -> SqlResult<&'a [Vec<Row>]> {
    ctx.rows.ok_or_else(|| {
        SqlError::parse_error(format!("{} used outside aggregation context", name))
    })
}

fn aggregate_type_error(name: &str, value: &Value) -> SqlError {
    SqlError::type_error("numeric", format!("{} over {}", name, value.type_name()), None)
}

// Aggregate functions. Null values are skipped; a set of seen numeric
// types decides the result type.

fn builtin_avg(args: &[Expr], ctx: &EvalContext) -> SqlResult<Value> {
    let mut int_sum: i64 = 0;
    let mut float_sum: f64 = 0.0;
    let mut seen_int = false;
    let mut seen_float = false;
    let mut count: i64 = 0;

    for group_row in group_rows("AVG", ctx)? {
        let ctx = ctx.for_group_row(group_row);
        match ExpressionEvaluator::evaluate(&args[0], &ctx)? {
            Value::Null => {}
            Value::Int(i) => {
                int_sum = int_sum
                    .checked_add(i)
                    .ok_or_else(|| SqlError::type_error("int", "integer overflow in AVG", None))?;
                seen_int = true;
                count += 1;
            }
            Value::Float(f) => {
                float_sum += f;
                seen_float = true;
                count += 1;
            }
            other => return Err(aggregate_type_error("AVG", &other)),
        }
    }
    // Mixed int/float groups are ambiguous for AVG and yield Null.
    if count == 0 || (seen_int && seen_float) {
        return Ok(Value::Null);
    }
    if seen_float {
        Ok(Value::Float(float_sum / count as f64))
    } else {
        Ok(Value::Int(int_sum / count))
    }
}

fn builtin_count(args: &[Expr], ctx: &EvalContext) -> SqlResult<Value> {
    let mut count: i64 = 0;
    for group_row in group_rows("COUNT", ctx)? {
        let ctx = ctx.for_group_row(group_row);
        if ExpressionEvaluator::evaluate(&args[0], &ctx)? != Value::Null {
            count += 1;
        }
    }
    Ok(Value::Int(count))
}

fn builtin_max(args: &[Expr], ctx: &EvalContext) -> SqlResult<Value> {
    let mut int_max: i64 = 0;
    let mut float_max: f64 = 0.0;
    let mut seen_int = false;
    let mut seen_float = false;

    for group_row in group_rows("MAX", ctx)? {
        let ctx = ctx.for_group_row(group_row);
        match ExpressionEvaluator::evaluate(&args[0], &ctx)? {
            Value::Null => {}
            Value::Int(i) => {
                if !seen_int || i > int_max {
                    int_max = i;
                }
                seen_int = true;
            }
            Value::Float(f) => {
                if !seen_float || f > float_max {
                    float_max = f;
                }
                seen_float = true;
            }
            other => return Err(aggregate_type_error("MAX", &other)),
        }
    }
    match (seen_int, seen_float) {
        (true, true) => Ok(Value::Float((int_max as f64).max(float_max))),
        (false, true) => Ok(Value::Float(float_max)),
        (true, false) => Ok(Value::Int(int_max)),
        (false, false) => Ok(Value::Null),
    }
}

fn builtin_min(args: &[Expr], ctx: &EvalContext) -> SqlResult<Value> {
    let mut int_min: i64 = 0;
    let mut float_min: f64 = 0.0;
    let mut seen_int = false;
    let mut seen_float = false;

    for group_row in group_rows("MIN", ctx)? {
        let ctx = ctx.for_group_row(group_row);
        match ExpressionEvaluator::evaluate(&args[0], &ctx)? {
            Value::Null => {}
            Value::Int(i) => {
                if !seen_int || i < int_min {
                    int_min = i;
                }
                seen_int = true;
            }
            Value::Float(f) => {
                if !seen_float || f < float_min {
                    float_min = f;
                }
                seen_float = true;
            }
            other => return Err(aggregate_type_error("MIN", &other)),
        }
    }
    match (seen_int, seen_float) {
        (true, true) => Ok(Value::Float((int_min as f64).min(float_min))),
        (false, true) => Ok(Value::Float(float_min)),
        (true, false) => Ok(Value::Int(int_min)),
        (false, false) => Ok(Value::Null),
    }
}

fn builtin_sum(args: &[Expr], ctx: &EvalContext) -> SqlResult<Value> {
    let mut int_sum: i64 = 0;
    let mut float_sum: f64 = 0.0;
    let mut seen_int = false;
    let mut seen_float = false;

    for group_row in group_rows("SUM", ctx)? {
        let ctx = ctx.for_group_row(group_row);
        match ExpressionEvaluator::evaluate(&args[0], &ctx)? {
            Value::Null => {}
            Value::Int(i) => {
                int_sum = int_sum
                    .checked_add(i)
                    .ok_or_else(|| SqlError::type_error("int", "integer overflow in SUM", None))?;
                seen_int = true;
            }
            Value::Float(f) => {
                float_sum += f;
                seen_float = true;
            }
            other => return Err(aggregate_type_error("SUM", &other)),
        }
    }
    match (seen_int, seen_float) {
        (true, true) => Ok(Value::Float(float_sum + int_sum as f64)),
        (false, true) => Ok(Value::Float(float_sum)),
        (true, false) => Ok(Value::Int(int_sum)),
        (false, false) => Ok(Value::Int(0)),
    }
}

fn builtin_nullif(args: &[Expr], ctx: &EvalContext) -> SqlResult<Value> {
    let value = ExpressionEvaluator::evaluate(&args[0], ctx)?;
    let compare = ExpressionEvaluator::evaluate(&args[1], ctx)?;
    if crate::iql::sql::execution::types::equal(&value, &compare)? {
        Ok(Value::Null)
    } else {
        Ok(value)
    }
}

// String functions. Indices are 1-based and operate on characters.

fn builtin_base64enc(args: &[Expr], ctx: &EvalContext) -> SqlResult<Value> {
    match eval_string(&args[0], ctx)? {
        None => Ok(Value::Null),
        Some(s) => Ok(Value::String(BASE64.encode(s.as_bytes()))),
    }
}

fn builtin_base64dec(args: &[Expr], ctx: &EvalContext) -> SqlResult<Value> {
    match eval_string(&args[0], ctx)? {
        None => Ok(Value::Null),
        Some(s) => {
            let decoded = BASE64.decode(s.as_bytes())?;
            let text = String::from_utf8(decoded)
                .map_err(|err| SqlError::parse_error(err.to_string()))?;
            Ok(Value::String(text))
        }
    }
}

/// CHAR and NCHAR: code point to string; out-of-range yields Null.
fn builtin_char(args: &[Expr], ctx: &EvalContext) -> SqlResult<Value> {
    let n = match eval_int(&args[0], ctx)? {
        None => return Ok(Value::Null),
        Some(n) => n,
    };
    if !(0..=0x10FFFF).contains(&n) {
        return Ok(Value::Null);
    }
    match char::from_u32(n as u32) {
        Some(c) => Ok(Value::String(c.to_string())),
        None => Ok(Value::Null),
    }
}

fn builtin_charindex(args: &[Expr], ctx: &EvalContext) -> SqlResult<Value> {
    let haystack = match eval_string(&args[0], ctx)? {
        None => return Ok(Value::Null),
        Some(s) => s,
    };
    let needle = match eval_string(&args[1], ctx)? {
        None => return Ok(Value::Null),
        Some(s) => s,
    };
    let start = if args.len() > 2 {
        match eval_int(&args[2], ctx)? {
            None => return Ok(Value::Null),
            Some(n) => n.max(1),
        }
    } else {
        1
    };
    Ok(Value::Int(char_index(&haystack, &needle, start as usize)))
}

/// 1-based character position of `needle` in `haystack` at or after
/// `start`, or 0 when not found.
fn char_index(haystack: &str, needle: &str, start: usize) -> i64 {
    let hay: Vec<char> = haystack.chars().collect();
    let nee: Vec<char> = needle.chars().collect();
    if nee.is_empty() || nee.len() > hay.len() {
        return 0;
    }
    for i in (start - 1)..=(hay.len() - nee.len()) {
        if hay[i..i + nee.len()] == nee[..] {
            return (i + 1) as i64;
        }
    }
    0
}

/// CONCAT skips Null arguments entirely.
fn builtin_concat(args: &[Expr], ctx: &EvalContext) -> SqlResult<Value> {
    let mut out = String::new();
    for arg in args {
        if let Some(s) = eval_string(arg, ctx)? {
            out.push_str(&s);
        }
    }
    Ok(Value::String(out))
}

/// CONCAT_WS skips Null arguments; a Null separator acts as empty.
fn builtin_concat_ws(args: &[Expr], ctx: &EvalContext) -> SqlResult<Value> {
    let separator = eval_string(&args[0], ctx)?.unwrap_or_default();
    let mut parts = Vec::new();
    for arg in &args[1..] {
        if let Some(s) = eval_string(arg, ctx)? {
            parts.push(s);
        }
    }
    Ok(Value::String(parts.join(&separator)))
}

fn builtin_lastcharindex(args: &[Expr], ctx: &EvalContext) -> SqlResult<Value> {
    let haystack = match eval_string(&args[0], ctx)? {
        None => return Ok(Value::Null),
        Some(s) => s,
    };
    let needle = match eval_string(&args[1], ctx)? {
        None => return Ok(Value::Null),
        Some(s) => s,
    };
    let hay: Vec<char> = haystack.chars().collect();
    let nee: Vec<char> = needle.chars().collect();
    if nee.is_empty() || nee.len() > hay.len() {
        return Ok(Value::Int(0));
    }
    for i in (0..=(hay.len() - nee.len())).rev() {
        if hay[i..i + nee.len()] == nee[..] {
            return Ok(Value::Int((i + 1) as i64));
        }
    }
    Ok(Value::Int(0))
}

fn builtin_left(args: &[Expr], ctx: &EvalContext) -> SqlResult<Value> {
    let s = match eval_string(&args[0], ctx)? {
        None => return Ok(Value::Null),
        Some(s) => s,
    };
    let n = match eval_int(&args[1], ctx)? {
        None => return Ok(Value::Null),
        Some(n) => n,
    };
    if n < 0 {
        return Err(SqlError::type_error(
            "non-negative int",
            "int",
            Some(n.to_string()),
        ));
    }
    Ok(Value::String(s.chars().take(n as usize).collect()))
}

fn builtin_len(args: &[Expr], ctx: &EvalContext) -> SqlResult<Value> {
    match eval_string(&args[0], ctx)? {
        None => Ok(Value::Null),
        Some(s) => Ok(Value::Int(s.chars().count() as i64)),
    }
}

fn builtin_lower(args: &[Expr], ctx: &EvalContext) -> SqlResult<Value> {
    match eval_string(&args[0], ctx)? {
        None => Ok(Value::Null),
        Some(s) => Ok(Value::String(s.to_lowercase())),
    }
}

/// LPAD pads on the left to the requested length, truncating longer
/// inputs. The pad string defaults to a single space.
fn builtin_lpad(args: &[Expr], ctx: &EvalContext) -> SqlResult<Value> {
    let s = match eval_string(&args[0], ctx)? {
        None => return Ok(Value::Null),
        Some(s) => s,
    };
    let n = match eval_int(&args[1], ctx)? {
        None => return Ok(Value::Null),
        Some(n) => n,
    };
    if n < 0 {
        return Ok(Value::Null);
    }
    let n = n as usize;
    let pad = if args.len() > 2 {
        match eval_string(&args[2], ctx)? {
            None => return Ok(Value::Null),
            Some(p) => p,
        }
    } else {
        " ".to_string()
    };

    let len = s.chars().count();
    if len >= n {
        return Ok(Value::String(s.chars().take(n).collect()));
    }
    if pad.is_empty() {
        return Ok(Value::String(s));
    }
    let fill: String = pad.chars().cycle().take(n - len).collect();
    Ok(Value::String(format!("{}{}", fill, s)))
}

fn builtin_ltrim(args: &[Expr], ctx: &EvalContext) -> SqlResult<Value> {
    match eval_string(&args[0], ctx)? {
        None => Ok(Value::Null),
        Some(s) => Ok(Value::String(s.trim_start().to_string())),
    }
}

fn builtin_replicate(args: &[Expr], ctx: &EvalContext) -> SqlResult<Value> {
    let s = match eval_string(&args[0], ctx)? {
        None => return Ok(Value::Null),
        Some(s) => s,
    };
    match eval_int(&args[1], ctx)? {
        None => Ok(Value::Null),
        Some(n) if n < 0 => Ok(Value::Null),
        Some(n) => Ok(Value::String(s.repeat(n as usize))),
    }
}

fn builtin_reverse(args: &[Expr], ctx: &EvalContext) -> SqlResult<Value> {
    match eval_string(&args[0], ctx)? {
        None => Ok(Value::Null),
        Some(s) => Ok(Value::String(s.chars().rev().collect())),
    }
}

fn builtin_right(args: &[Expr], ctx: &EvalContext) -> SqlResult<Value> {
    let s = match eval_string(&args[0], ctx)? {
        None => return Ok(Value::Null),
        Some(s) => s,
    };
    let n = match eval_int(&args[1], ctx)? {
        None => return Ok(Value::Null),
        Some(n) => n,
    };
    if n < 0 {
        return Err(SqlError::type_error(
            "non-negative int",
            "int",
            Some(n.to_string()),
        ));
    }
    let chars: Vec<char> = s.chars().collect();
    let skip = chars.len().saturating_sub(n as usize);
    Ok(Value::String(chars[skip..].iter().collect()))
}

fn builtin_rtrim(args: &[Expr], ctx: &EvalContext) -> SqlResult<Value> {
    match eval_string(&args[0], ctx)? {
        None => Ok(Value::Null),
        Some(s) => Ok(Value::String(s.trim_end().to_string())),
    }
}

fn builtin_space(args: &[Expr], ctx: &EvalContext) -> SqlResult<Value> {
    match eval_int(&args[0], ctx)? {
        None => Ok(Value::Null),
        Some(n) if n < 0 => Ok(Value::Null),
        Some(n) => Ok(Value::String(" ".repeat(n as usize))),
    }
}

/// STUFF deletes `len` characters at `start` and inserts the
/// replacement. Out-of-range positions yield Null; a Null replacement
/// acts as empty.
fn builtin_stuff(args: &[Expr], ctx: &EvalContext) -> SqlResult<Value> {
    let s = match eval_string(&args[0], ctx)? {
        None => return Ok(Value::Null),
        Some(s) => s,
    };
    let start = match eval_int(&args[1], ctx)? {
        None => return Ok(Value::Null),
        Some(n) => n,
    };
    let len = match eval_int(&args[2], ctx)? {
        None => return Ok(Value::Null),
        Some(n) => n,
    };
    let replacement = eval_string(&args[3], ctx)?.unwrap_or_default();

    let chars: Vec<char> = s.chars().collect();
    if start < 1 || start as usize > chars.len() || len < 0 {
        return Ok(Value::Null);
    }
    let start = (start - 1) as usize;
    let end = (start + len as usize).min(chars.len());

    let mut out: String = chars[..start].iter().collect();
    out.push_str(&replacement);
    out.extend(&chars[end..]);
    Ok(Value::String(out))
}

/// SUBSTRING with a 1-based start; positions before 1 are dropped from
/// the window, out-of-range reads clamp to empty.
fn builtin_substring(args: &[Expr], ctx: &EvalContext) -> SqlResult<Value> {
    let s = match eval_string(&args[0], ctx)? {
        None => return Ok(Value::Null),
        Some(s) => s,
    };
    let start = match eval_int(&args[1], ctx)? {
        None => return Ok(Value::Null),
        Some(n) => n,
    };
    let len = match eval_int(&args[2], ctx)? {
        None => return Ok(Value::Null),
        Some(n) => n.max(0) as usize,
    };
    let start = start.max(1) as usize;
    Ok(Value::String(
        s.chars().skip(start - 1).take(len).collect(),
    ))
}

fn builtin_trim(args: &[Expr], ctx: &EvalContext) -> SqlResult<Value> {
    match eval_string(&args[0], ctx)? {
        None => Ok(Value::Null),
        Some(s) => Ok(Value::String(s.trim().to_string())),
    }
}

/// UNICODE: code point of the first character.
fn builtin_unicode(args: &[Expr], ctx: &EvalContext) -> SqlResult<Value> {
    match eval_string(&args[0], ctx)? {
        None => Ok(Value::Null),
        Some(s) => match s.chars().next() {
            Some(c) => Ok(Value::Int(c as i64)),
            None => Ok(Value::Null),
        },
    }
}

fn builtin_upper(args: &[Expr], ctx: &EvalContext) -> SqlResult<Value> {
    match eval_string(&args[0], ctx)? {
        None => Ok(Value::Null),
        Some(s) => Ok(Value::String(s.to_uppercase())),
    }
}

// Datetime functions.

fn builtin_getdate(_args: &[Expr], _ctx: &EvalContext) -> SqlResult<Value> {
    Ok(Value::DateTime(Utc::now().fixed_offset()))
}

fn builtin_year(args: &[Expr], ctx: &EvalContext) -> SqlResult<Value> {
    match eval_datetime(&args[0], ctx)? {
        None => Ok(Value::Null),
        Some(dt) => Ok(Value::Int(dt.year() as i64)),
    }
}

fn builtin_month(args: &[Expr], ctx: &EvalContext) -> SqlResult<Value> {
    match eval_datetime(&args[0], ctx)? {
        None => Ok(Value::Null),
        Some(dt) => Ok(Value::Int(dt.month() as i64)),
    }
}

fn builtin_day(args: &[Expr], ctx: &EvalContext) -> SqlResult<Value> {
    match eval_datetime(&args[0], ctx)? {
        None => Ok(Value::Null),
        Some(dt) => Ok(Value::Int(dt.day() as i64)),
    }
}

/// DATEDIFF counts unit boundaries crossed between two instants:
/// calendar components for year/month/day, truncated absolute time for
/// the subsecond units.
fn builtin_datediff(args: &[Expr], ctx: &EvalContext) -> SqlResult<Value> {
    // The unit argument is an identifier, not a column reference.
    let unit: DateDiffUnit = match &args[0] {
        Expr::Column(reference) if reference.source.is_none() => reference.column.parse()?,
        other => match eval_string(other, ctx)? {
            None => return Ok(Value::Null),
            Some(s) => s.parse()?,
        },
    };
    let a = match eval_datetime(&args[1], ctx)? {
        None => return Ok(Value::Null),
        Some(dt) => dt,
    };
    let b = match eval_datetime(&args[2], ctx)? {
        None => return Ok(Value::Null),
        Some(dt) => dt,
    };

    let diff = match unit {
        DateDiffUnit::Year => (b.year() - a.year()) as i64,
        DateDiffUnit::Month => {
            (b.year() as i64 - a.year() as i64) * 12 + (b.month() as i64 - a.month() as i64)
        }
        DateDiffUnit::Day => b
            .date_naive()
            .signed_duration_since(a.date_naive())
            .num_days(),
        DateDiffUnit::Hour => b.timestamp().div_euclid(3600) - a.timestamp().div_euclid(3600),
        DateDiffUnit::Minute => b.timestamp().div_euclid(60) - a.timestamp().div_euclid(60),
        DateDiffUnit::Second => b.timestamp() - a.timestamp(),
        DateDiffUnit::Millisecond => b.timestamp_millis() - a.timestamp_millis(),
        DateDiffUnit::Microsecond => b.timestamp_micros() - a.timestamp_micros(),
        DateDiffUnit::Nanosecond => {
            let a_nanos = a.timestamp_nanos_opt().ok_or_else(|| {
                SqlError::type_error("datetime", "nanosecond range overflow", None)
            })?;
            let b_nanos = b.timestamp_nanos_opt().ok_or_else(|| {
                SqlError::type_error("datetime", "nanosecond range overflow", None)
            })?;
            b_nanos - a_nanos
        }
    };
    Ok(Value::Int(diff))
}
