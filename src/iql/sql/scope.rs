//! Scoped variable store.
//!
//! Scopes form a chain of frames: lookups walk towards the root,
//! declarations land in the current frame and assignment mutates the
//! defining frame. The session scope persists across queries; each query
//! evaluates in a child scope that is discarded on completion.

use crate::iql::sql::error::{SqlError, SqlResult};
use crate::iql::sql::execution::types::{Type, Value, ValueFormat};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// System variable names.
pub const SYS_ARGS: &str = "ARGS";
pub const SYS_REALFMT: &str = "REALFMT";
pub const SYS_TABLEFMT: &str = "TABLEFMT";
pub const SYS_TERMOUT: &str = "TERMOUT";

/// Style keys understood by the tabulation layer. `TABLEFMT` accepts
/// exactly these values.
pub const TABLE_STYLES: &[&str] = &[
    "plain",
    "ascii",
    "uc",
    "uclight",
    "ucbold",
    "compactuc",
    "colon",
    "simple",
    "github",
    "csv",
    "json",
];

/// Per-variable validation hook. Returns a descriptive message on
/// rejection.
pub type Validator = fn(name: &str, value: &Value) -> Result<(), String>;

/// A declared variable.
#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub typ: Type,
    pub value: Value,
    validator: Option<Validator>,
}

/// Cancellation flag shared between a scope and the sources built under
/// it. Dropping the owning scope flips the flag, which aborts in-flight
/// ingest.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> CancelToken {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Fails with an I/O error once the token has been cancelled.
    pub fn check(&self) -> SqlResult<()> {
        if self.is_cancelled() {
            Err(SqlError::io_error("query cancelled"))
        } else {
            Ok(())
        }
    }
}

/// A frame of named, typed, optionally validated values.
#[derive(Debug, Default)]
pub struct Scope {
    vars: RefCell<HashMap<String, Variable>>,
    parent: Option<Rc<Scope>>,
    cancel: CancelToken,
}

impl Scope {
    /// Creates a root scope.
    pub fn new() -> Rc<Scope> {
        Rc::new(Scope::default())
    }

    /// Creates a child frame. The child sees the parent's declarations
    /// and carries its own cancel token.
    pub fn child(parent: &Rc<Scope>) -> Rc<Scope> {
        Rc::new(Scope {
            vars: RefCell::new(HashMap::new()),
            parent: Some(Rc::clone(parent)),
            cancel: CancelToken::new(),
        })
    }

    /// The scope's cancel token, cloned for sources built under it.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Declares a variable in the current frame with a `Null` initial
    /// value.
    pub fn declare(&self, name: impl Into<String>, typ: Type, validator: Option<Validator>) {
        let name = name.into();
        self.vars.borrow_mut().insert(
            name.clone(),
            Variable {
                name,
                typ,
                value: Value::Null,
                validator,
            },
        );
    }

    /// Assigns a declared variable, walking towards the root to find the
    /// defining frame. Fails on undeclared names, type mismatches and
    /// validator rejections.
    pub fn set(&self, name: &str, value: Value) -> SqlResult<()> {
        {
            let mut vars = self.vars.borrow_mut();
            if let Some(var) = vars.get_mut(name) {
                let value = coerce_assign(name, var.typ, value)?;
                if let Some(validator) = var.validator {
                    validator(name, &value)
                        .map_err(|message| SqlError::scope_error(name, message))?;
                }
                var.value = value;
                return Ok(());
            }
        }
        match &self.parent {
            Some(parent) => parent.set(name, value),
            None => Err(SqlError::scope_error(name, "undeclared variable")),
        }
    }

    /// Looks up a variable, walking the parent chain.
    pub fn get(&self, name: &str) -> Option<Variable> {
        if let Some(var) = self.vars.borrow().get(name) {
            return Some(var.clone());
        }
        self.parent.as_ref().and_then(|parent| parent.get(name))
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Assignability under the numeric ladder: exact type, `Null`, or an
/// integer widening into a float declaration.
fn coerce_assign(name: &str, declared: Type, value: Value) -> SqlResult<Value> {
    if value == Value::Null {
        return Ok(Value::Null);
    }
    match (declared, &value) {
        (Type::Float, Value::Int(i)) => Ok(Value::Float(*i as f64)),
        _ => {
            if value.value_type() == Some(declared) {
                Ok(value)
            } else {
                Err(SqlError::scope_error(
                    name,
                    format!(
                        "cannot assign {} to variable of type {}",
                        value.type_name(),
                        declared
                    ),
                ))
            }
        }
    }
}

fn validate_table_style(_name: &str, value: &Value) -> Result<(), String> {
    let style = value.to_string();
    if TABLE_STYLES.contains(&style.as_str()) {
        Ok(())
    } else {
        Err(format!("invalid table style: {}", style))
    }
}

/// Declares the session's system variables with their defaults.
pub fn init_system_variables(scope: &Scope) -> SqlResult<()> {
    scope.declare(SYS_ARGS, Type::Array, None);
    scope.set(
        SYS_ARGS,
        Value::Array {
            elem_type: Type::String,
            items: Vec::new(),
        },
    )?;

    scope.declare(SYS_REALFMT, Type::String, None);
    scope.set(SYS_REALFMT, Value::String("%g".to_string()))?;

    scope.declare(SYS_TABLEFMT, Type::String, Some(validate_table_style));
    scope.set(SYS_TABLEFMT, Value::String("uc".to_string()))?;

    scope.declare(SYS_TERMOUT, Type::Bool, None);
    scope.set(SYS_TERMOUT, Value::Bool(true))?;

    Ok(())
}

/// Value-formatting options derived from the scope's `REALFMT`.
pub fn format(scope: &Scope) -> ValueFormat {
    match scope.get(SYS_REALFMT) {
        Some(Variable {
            value: Value::String(float),
            ..
        }) => ValueFormat { float },
        _ => ValueFormat::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declare_set_get() {
        let scope = Scope::new();
        scope.declare("nstring", Type::String, None);
        scope
            .set("nstring", Value::String("Åkergatan 24".to_string()))
            .unwrap();

        let var = scope.get("nstring").unwrap();
        assert_eq!(var.value, Value::String("Åkergatan 24".to_string()));
        assert!(scope.get("missing").is_none());
    }

    #[test]
    fn test_set_undeclared_fails() {
        let scope = Scope::new();
        assert!(scope.set("x", Value::Int(1)).is_err());
    }

    #[test]
    fn test_type_mismatch_and_widening() {
        let scope = Scope::new();
        scope.declare("n", Type::Float, None);
        scope.set("n", Value::Int(5)).unwrap();
        assert_eq!(scope.get("n").unwrap().value, Value::Float(5.0));

        scope.declare("s", Type::String, None);
        assert!(scope.set("s", Value::Int(5)).is_err());
        scope.set("s", Value::Null).unwrap();
    }

    #[test]
    fn test_parent_chain() {
        let session = Scope::new();
        session.declare("x", Type::Int, None);
        session.set("x", Value::Int(1)).unwrap();

        let query = Scope::child(&session);
        assert_eq!(query.get("x").unwrap().value, Value::Int(1));

        // Assignment mutates the defining frame.
        query.set("x", Value::Int(2)).unwrap();
        assert_eq!(session.get("x").unwrap().value, Value::Int(2));

        // Shadowing declaration lives in the child frame only.
        query.declare("x", Type::Int, None);
        query.set("x", Value::Int(3)).unwrap();
        assert_eq!(session.get("x").unwrap().value, Value::Int(2));
        assert_eq!(query.get("x").unwrap().value, Value::Int(3));
    }

    #[test]
    fn test_system_variables() {
        let scope = Scope::new();
        init_system_variables(&scope).unwrap();

        assert_eq!(
            scope.get(SYS_REALFMT).unwrap().value,
            Value::String("%g".to_string())
        );
        assert_eq!(scope.get(SYS_TERMOUT).unwrap().value, Value::Bool(true));

        scope
            .set(SYS_TABLEFMT, Value::String("github".to_string()))
            .unwrap();
        let err = scope
            .set(SYS_TABLEFMT, Value::String("fancy".to_string()))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "variable 'TABLEFMT': invalid table style: fancy"
        );
    }

    #[test]
    fn test_cancel_token() {
        let scope = Scope::new();
        let token = scope.cancel_token();
        assert!(token.check().is_ok());
        drop(scope);
        assert!(token.is_cancelled());
        assert!(token.check().is_err());
    }
}
