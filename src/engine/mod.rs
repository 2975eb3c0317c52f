//! Matrix expansion engine.
//!
//! This module wires the pipeline together:
//!
//! ```text
//! ┌───────────┐    ┌───────────┐    ┌──────────┐    ┌───────────┐
//! │  Input    │───▶│ Flatten   │───▶│  Filter  │───▶│  Dedup /  │
//! │  Model    │    │ (+ merge) │    │ (+ lazy) │    │  Override │
//! └───────────┘    └───────────┘    └──────────┘    └───────────┘
//! ```
//!
//! The engine is single-threaded, synchronous and free of I/O: given the
//! same input document and config it always produces the same output
//! sequence. Document order drives factor order, the cartesian product
//! drives record order, and the dedup pass preserves first-seen order.

pub mod dedup;
pub mod filter;
pub mod flatten;
pub mod merge;
pub mod record;
pub mod resolve;

use serde_json::Value;

use crate::error::{MatrixError, MatrixResult};
use crate::input::Node;
use crate::trace::{NoopTrace, TraceSink};

pub use dedup::dedup;
pub use filter::filter_records;
pub use flatten::flatten;
pub use merge::cartesian_merge;
pub use record::{FinalRecord, OutputValue, PartialRecord};
pub use resolve::Resolver;

/// Expand a matrix document against a config value.
///
/// The top-level node must be an object or a list. An empty result is not
/// an error at this level; callers decide whether zero configurations is
/// a failure (for a CI matrix it is).
pub fn generate(input: &Node, config: &Value) -> MatrixResult<Vec<FinalRecord>> {
    generate_with_trace(input, config, &NoopTrace)
}

/// [`generate`] with an explicit trace sink.
pub fn generate_with_trace(
    input: &Node,
    config: &Value,
    trace: &dyn TraceSink,
) -> MatrixResult<Vec<FinalRecord>> {
    if let Node::Scalar(_) = input {
        return Err(MatrixError::UnexpectedShape {
            path: "$".to_string(),
            expected: "an object or a list at the top level".to_string(),
            found: "a scalar".to_string(),
        });
    }

    let flattened = flatten(input, trace)?;
    trace.detailed(&format!("flattened into {} partial records", flattened.len()));

    let evaluated = filter_records(flattened, config, trace)?;
    trace.detailed(&format!("{} records after filtering", evaluated.len()));

    let merged = dedup(evaluated);
    trace.detailed(&format!("{} records after deduplication", merged.len()));

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExprError;
    use serde_json::json;

    fn generate_json(doc: serde_json::Value, config: serde_json::Value) -> MatrixResult<Vec<FinalRecord>> {
        let node = Node::from_value(&doc)?;
        generate(&node, &config)
    }

    fn as_json(records: &[FinalRecord]) -> serde_json::Value {
        serde_json::to_value(records).unwrap()
    }

    #[test]
    fn test_scenario_if_filters_branch() {
        let output = generate_json(
            json!({"os": ["mac", "linux"], "$if": "os != 'mac'"}),
            json!({}),
        )
        .unwrap();
        assert_eq!(as_json(&output), json!([{"os": "linux"}]));
    }

    #[test]
    fn test_scenario_nested_labels() {
        let output = generate_json(
            json!({"label": {"mac": {"os": "osx"}, "linux": {"os": "ubuntu"}}}),
            json!({}),
        )
        .unwrap();
        assert_eq!(
            as_json(&output),
            json!([
                {"label": "mac", "os": "osx"},
                {"label": "linux", "os": "ubuntu"}
            ])
        );
    }

    #[test]
    fn test_scenario_empty_input() {
        assert!(generate_json(json!({}), json!({})).unwrap().is_empty());
        assert!(generate_json(json!([]), json!({})).unwrap().is_empty());
    }

    #[test]
    fn test_top_level_scalar_rejected() {
        let err = generate_json(json!("nope"), json!({})).unwrap_err();
        assert!(matches!(err, MatrixError::UnexpectedShape { .. }));
    }

    #[test]
    fn test_determinism() {
        let doc = json!({
            "os": ["ubuntu-latest", "macos-latest"],
            "profile": {"quick": {"args": "--lib"}, "full": {"args": "--all-targets"}},
            "$if": "os != 'none'"
        });
        let first = as_json(&generate_json(doc.clone(), json!({})).unwrap());
        for _ in 0..3 {
            assert_eq!(as_json(&generate_json(doc.clone(), json!({})).unwrap()), first);
        }
        // Byte-identical serialization, not just structural equality.
        let a = serde_json::to_string(&generate_json(doc.clone(), json!({})).unwrap()).unwrap();
        let b = serde_json::to_string(&generate_json(doc, json!({})).unwrap()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_factor_neutrality() {
        let output = generate_json(json!({"a": ["x", "y"], "b": []}), json!({})).unwrap();
        assert_eq!(as_json(&output), json!([{"a": "x"}, {"a": "y"}]));
    }

    #[test]
    fn test_match_selects_exactly_one_branch() {
        let doc = json!({
            "runner": "default",
            "$match": {
                "config.os == 'mac'": {"os": "macos-latest"},
                "config.os == 'linux'": {"os": "ubuntu-latest"}
            }
        });

        let output = generate_json(doc.clone(), json!({"os": "mac"})).unwrap();
        assert_eq!(
            as_json(&output),
            json!([{"runner": "default", "os": "macos-latest"}])
        );

        let output = generate_json(doc.clone(), json!({"os": "linux"})).unwrap();
        assert_eq!(
            as_json(&output),
            json!([{"runner": "default", "os": "ubuntu-latest"}])
        );

        // No matching config: only the else branch survives.
        let output = generate_json(doc, json!({})).unwrap();
        assert_eq!(as_json(&output), json!([{"runner": "default"}]));
    }

    #[test]
    fn test_field_match_else_leaves_field_absent() {
        let doc = json!({
            "os": "linux",
            "toolchain": {"$match": {"config.nightly": "nightly"}}
        });

        let output = generate_json(doc.clone(), json!({"nightly": true})).unwrap();
        assert_eq!(
            as_json(&output),
            json!([{"os": "linux", "toolchain": "nightly"}])
        );

        let output = generate_json(doc, json!({})).unwrap();
        assert_eq!(as_json(&output), json!([{"os": "linux"}]));
    }

    #[test]
    fn test_dynamic_resolves_against_siblings_and_config() {
        let output = generate_json(
            json!({
                "os": ["mac", "linux"],
                "image": {"$dynamic": "os == 'mac' && 'macos-14' || 'ubuntu-24.04'"}
            }),
            json!({}),
        )
        .unwrap();
        assert_eq!(
            as_json(&output),
            json!([
                {"os": "mac", "image": "macos-14"},
                {"os": "linux", "image": "ubuntu-24.04"}
            ])
        );
    }

    #[test]
    fn test_dynamic_chain_memoized_through_pipeline() {
        let output = generate_json(
            json!({
                "os": "linux",
                "a": {"$dynamic": "this.b"},
                "b": {"$dynamic": "config.name || 'anon'"}
            }),
            json!({}),
        )
        .unwrap();
        assert_eq!(
            as_json(&output),
            json!([{"os": "linux", "a": "anon", "b": "anon"}])
        );
    }

    #[test]
    fn test_cycle_raises_circular_dependency() {
        let err = generate_json(
            json!({
                "a": {"$dynamic": "this.b"},
                "b": {"$dynamic": "this.a"}
            }),
            json!({}),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            MatrixError::Expr(ExprError::CircularDependency { .. })
        ));
    }

    #[test]
    fn test_dynamic_empty_result_drops_field() {
        let output = generate_json(
            json!({"os": "linux", "extra": {"$dynamic": "config.extra || ''"}}),
            json!({}),
        )
        .unwrap();
        assert_eq!(as_json(&output), json!([{"os": "linux"}]));
    }

    #[test]
    fn test_subsumption_dedup() {
        let output = generate_json(
            json!([
                {"os": "linux"},
                {"os": "linux", "arch": "arm"}
            ]),
            json!({}),
        )
        .unwrap();
        assert_eq!(as_json(&output), json!([{"os": "linux", "arch": "arm"}]));
    }

    #[test]
    fn test_example_document_expands() {
        let doc = crate::input::example_document();

        let output = generate_json(doc.clone(), json!({})).unwrap();
        // macOS rows filtered out, nightly case unmatched.
        assert_eq!(
            as_json(&output),
            json!([
                {"os": "ubuntu-latest", "profile": "quick", "cargo_args": "--lib",
                 "cache_key": "ubuntu-latest"},
                {"os": "ubuntu-latest", "profile": "full", "cargo_args": "--all-targets",
                 "cache_key": "ubuntu-latest"}
            ])
        );

        let output = generate_json(
            doc,
            json!({"enable_macos": true, "include_nightly": true}),
        )
        .unwrap();
        assert_eq!(output.len(), 4);
        assert!(output.iter().all(|r| r["toolchain"] == json!("nightly")));
    }
}
