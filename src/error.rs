//! Error types for the matrix expansion pipeline.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`ExprError`] - Expression parsing and evaluation errors
//! - [`MatrixError`] - Input shape and expansion errors
//! - [`LoadError`] - Document decoding errors (CLI shims only)
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries. All failures are
//! synchronous and fatal to the current `generate` call; no partial
//! results are ever returned on error.

use thiserror::Error;

// =============================================================================
// Expression Errors
// =============================================================================

/// Errors raised while parsing or evaluating a predicate/value expression.
#[derive(Debug, Error)]
pub enum ExprError {
    /// Empty or whitespace-only expression text.
    #[error("Invalid predicate: empty expression")]
    EmptyPredicate,

    /// Unparseable expression text.
    #[error("Invalid predicate '{expr}': {message} (offset {offset})")]
    Parse {
        expr: String,
        message: String,
        offset: usize,
    },

    /// An expression referenced a record field the record does not carry.
    #[error("Unknown field '{name}' in expression '{expr}'")]
    UnknownField { name: String, expr: String },

    /// A dynamic field's evaluation re-entered itself, directly or through
    /// another dynamic field.
    #[error("Circular dependency computing field '{field}' for expression '{expr}'")]
    CircularDependency { field: String, expr: String },
}

// =============================================================================
// Matrix Errors (top-level)
// =============================================================================

/// Input shape and expansion errors.
///
/// This is the main error type returned by [`crate::engine::generate`].
/// Shape variants name the offending key and its document path; expression
/// failures are wrapped transparently.
#[derive(Debug, Error)]
pub enum MatrixError {
    /// A `$value` or `$dynamic` directive appeared in a context expecting
    /// a plain object.
    #[error("Illegal '{key}' key in object context at {path}")]
    IllegalDirectiveKey { key: String, path: String },

    /// A key that is neither a directive nor a plain identifier.
    #[error("Illegal key '{key}' at {path}: keys must be plain identifiers or directives")]
    IllegalKey { key: String, path: String },

    /// A node whose shape does not fit its context.
    #[error("Unexpected {found} at {path}: expected {expected}")]
    UnexpectedShape {
        path: String,
        expected: String,
        found: String,
    },

    /// An object in field-value position with zero keys.
    #[error("Object value for '{key}' at {path} must have at least one key")]
    EmptyValueObject { key: String, path: String },

    /// Expression parse or evaluation failure.
    #[error(transparent)]
    Expr(#[from] ExprError),
}

// =============================================================================
// Load Errors (CLI shims)
// =============================================================================

/// Errors while reading and decoding an input or config document.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Failed to read the file.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// Invalid JSON document.
    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },

    /// Invalid YAML document.
    #[error("Invalid YAML in {path}: {source}")]
    Yaml {
        path: String,
        source: serde_yaml::Error,
    },

    /// A YAML mapping key that is not a scalar.
    #[error("Unsupported mapping key in {path}: keys must be scalars")]
    Key { path: String },

    /// The document decoded to nothing (empty file or explicit null).
    #[error("Document {path} is empty")]
    Empty { path: String },
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for expression operations.
pub type ExprResult<T> = Result<T, ExprError>;

/// Result type for expansion operations.
pub type MatrixResult<T> = Result<T, MatrixError>;

/// Result type for document loading.
pub type LoadResult<T> = Result<T, LoadError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        // ExprError -> MatrixError
        let expr_err = ExprError::EmptyPredicate;
        let matrix_err: MatrixError = expr_err.into();
        assert!(matrix_err.to_string().contains("empty expression"));

        let cycle = ExprError::CircularDependency {
            field: "a".into(),
            expr: "this.b".into(),
        };
        let matrix_err: MatrixError = cycle.into();
        assert!(matrix_err.to_string().contains("'a'"));
        assert!(matrix_err.to_string().contains("this.b"));
    }

    #[test]
    fn test_shape_error_names_key_and_path() {
        let err = MatrixError::IllegalKey {
            key: "$bogus".into(),
            path: "$.build".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("$bogus"));
        assert!(msg.contains("$.build"));
    }
}
