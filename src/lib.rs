//! # Matrixgen - declarative CI matrix expansion
//!
//! Matrixgen expands a compact, declarative description of a build/test
//! configuration space into an explicit list of concrete configuration
//! records, ready to drive parallel CI jobs.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Document   │────▶│   Input     │────▶│   Engine    │────▶│ JSON matrix │
//! │ (YAML/JSON) │     │   Model     │     │ (flatten/   │     │  (records)  │
//! └─────────────┘     └─────────────┘     │  filter)    │     └─────────────┘
//!                                         └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use matrixgen::{generate, Node};
//! use serde_json::json;
//!
//! let doc = json!({"os": ["mac", "linux"], "$if": "os != 'mac'"});
//! let node = Node::from_value(&doc).unwrap();
//! let matrix = generate(&node, &json!({})).unwrap();
//! assert_eq!(matrix.len(), 1);
//! assert_eq!(matrix[0]["os"], json!("linux"));
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`input`] - Tagged input model and directive decoding
//! - [`expr`] - Predicate/value expression evaluator
//! - [`engine`] - Flattening, merging, filtering, deduplication
//! - [`trace`] - Explicit trace sink for pipeline introspection
//! - [`load`] - Document loading shims for the CLI

// Core modules
pub mod error;
pub mod input;

// Expressions
pub mod expr;

// Expansion engine
pub mod engine;

// Tracing
pub mod trace;

// Document loading
pub mod load;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{ExprError, ExprResult, LoadError, LoadResult, MatrixError, MatrixResult};

// =============================================================================
// Re-exports - Input model
// =============================================================================

pub use input::{directives_description, example_document, Entry, Node, Scalar};

// =============================================================================
// Re-exports - Engine
// =============================================================================

pub use engine::{
    cartesian_merge, dedup, filter_records, flatten, generate, generate_with_trace, FinalRecord,
    OutputValue, PartialRecord,
};

// =============================================================================
// Re-exports - Tracing
// =============================================================================

pub use trace::{NoopTrace, StderrTrace, TraceLevel, TraceSink};

// =============================================================================
// Re-exports - Loading
// =============================================================================

pub use load::{detect_format, load_document, parse_document, DocumentFormat};
