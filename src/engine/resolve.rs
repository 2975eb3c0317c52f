//! Lazy resolution of dynamic fields.
//!
//! Every field of a record enters the resolver as either
//! [`FieldState::Resolved`] or [`FieldState::Pending`]. A pending field
//! evaluates its expression on first read and memoizes the result; the
//! explicit `resolving` stack detects re-entrant reads and raises
//! [`ExprError::CircularDependency`] instead of looping.

use indexmap::IndexMap;
use serde_json::Value;

use super::record::{FinalRecord, OutputValue, PartialRecord};
use crate::error::{ExprError, ExprResult};
use crate::expr::{self, Env};

#[derive(Debug, Clone)]
enum FieldState {
    Resolved(Value),
    Pending(String),
}

/// Per-record resolution context, bound to the external config.
///
/// Implements [`Env`] so conditions and dynamic expressions can read
/// sibling fields, triggering their resolution transitively.
pub struct Resolver<'a> {
    states: IndexMap<String, FieldState>,
    resolving: Vec<String>,
    config: &'a Value,
}

impl<'a> Resolver<'a> {
    pub fn new(record: &PartialRecord, config: &'a Value) -> Self {
        let states = record
            .fields
            .iter()
            .map(|(key, value)| {
                let state = match value {
                    OutputValue::Scalar(s) => FieldState::Resolved(s.to_value()),
                    OutputValue::Dynamic(expr) => FieldState::Pending(expr.clone()),
                };
                (key.clone(), state)
            })
            .collect();
        Self {
            states,
            resolving: Vec::new(),
            config,
        }
    }

    /// Force a field to its concrete value, evaluating and memoizing a
    /// pending expression. `Ok(None)` means the record has no such field.
    fn force(&mut self, name: &str) -> ExprResult<Option<Value>> {
        let expr = match self.states.get(name) {
            None => return Ok(None),
            Some(FieldState::Resolved(value)) => return Ok(Some(value.clone())),
            Some(FieldState::Pending(expr)) => expr.clone(),
        };

        if self.resolving.iter().any(|f| f == name) {
            return Err(ExprError::CircularDependency {
                field: name.to_string(),
                expr,
            });
        }

        self.resolving.push(name.to_string());
        let result = expr::evaluate(&expr, self);
        self.resolving.pop();

        // An empty-string or null result means the field resolves to
        // nothing; normalize so it contributes nothing further.
        let value = match result? {
            Value::String(s) if s.is_empty() => Value::Null,
            value => value,
        };
        self.states
            .insert(name.to_string(), FieldState::Resolved(value.clone()));
        Ok(Some(value))
    }

    /// Freeze every field at its first-read value, dropping fields that
    /// resolved to nothing.
    pub fn snapshot(mut self) -> ExprResult<FinalRecord> {
        let names: Vec<String> = self.states.keys().cloned().collect();
        let mut output = IndexMap::new();
        for name in names {
            if let Some(value) = self.force(&name)? {
                if !value.is_null() {
                    output.insert(name, value);
                }
            }
        }
        Ok(output)
    }
}

impl Env for Resolver<'_> {
    fn field(&mut self, name: &str) -> ExprResult<Option<Value>> {
        self.force(name)
    }

    fn config(&self) -> &Value {
        self.config
    }
}
