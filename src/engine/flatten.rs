//! Recursive flattening of a matrix document into partial records.
//!
//! This is the central algorithm: each object key contributes one
//! cartesian factor (a list of alternative partial records), directives
//! reshape how a node fans out, and [`cartesian_merge`] combines the
//! factors of an object into its full product.

use super::merge::cartesian_merge;
use super::record::{OutputValue, PartialRecord};
use crate::error::{MatrixError, MatrixResult};
use crate::input::{Entry, Node, Scalar, DYNAMIC_KEY, VALUE_KEY};
use crate::trace::TraceSink;

/// Flatten a document node into its list of partial records.
pub fn flatten(node: &Node, trace: &dyn TraceSink) -> MatrixResult<Vec<PartialRecord>> {
    flatten_at(node, "$", trace)
}

fn flatten_at(node: &Node, path: &str, trace: &dyn TraceSink) -> MatrixResult<Vec<PartialRecord>> {
    match node {
        // List context: alternation. Records without real fields are
        // structurally empty here and contribute nothing.
        Node::List(items) => {
            let mut output = Vec::new();
            for (i, item) in items.iter().enumerate() {
                let flattened = flatten_at(item, &format!("{}[{}]", path, i), trace)?;
                output.extend(flattened.into_iter().filter(PartialRecord::has_fields));
            }
            trace.debugging(&format!("flatten list {} -> {} records", path, output.len()));
            Ok(output)
        }
        Node::Object(entries) => {
            if entries.is_empty() {
                return Ok(Vec::new());
            }
            let mut factors: Vec<Vec<PartialRecord>> = Vec::new();
            for entry in entries {
                match entry {
                    Entry::Value(_) => {
                        return Err(MatrixError::IllegalDirectiveKey {
                            key: VALUE_KEY.to_string(),
                            path: path.to_string(),
                        })
                    }
                    Entry::Dynamic(_) => {
                        return Err(MatrixError::IllegalDirectiveKey {
                            key: DYNAMIC_KEY.to_string(),
                            path: path.to_string(),
                        })
                    }
                    Entry::If(conditions) => {
                        factors.push(vec![PartialRecord::with_conditions(conditions.clone())]);
                    }
                    Entry::Match(cases) => {
                        factors.push(flatten_match(cases, path, trace)?);
                    }
                    Entry::Array(items) => {
                        let mut union = Vec::new();
                        for (i, item) in items.iter().enumerate() {
                            let child = format!("{}.$array[{}]", path, i);
                            union.extend(flatten_at(item, &child, trace)?);
                        }
                        factors.push(union);
                    }
                    Entry::Arrays(lists) => {
                        // One independent factor per member list; gaps skip.
                        for (i, list) in lists.iter().enumerate() {
                            let Some(list) = list else { continue };
                            let mut union = Vec::new();
                            for (j, item) in list.iter().enumerate() {
                                let child = format!("{}.$arrays[{}][{}]", path, i, j);
                                union.extend(flatten_at(item, &child, trace)?);
                            }
                            factors.push(union);
                        }
                    }
                    Entry::Field(key, value) => {
                        let child = format!("{}.{}", path, key);
                        let flattened = flatten_field(key, value, &child, trace)?;
                        trace.debugging(&format!(
                            "flatten key '{}' -> {} records",
                            key,
                            flattened.len()
                        ));
                        factors.push(flattened);
                    }
                }
            }
            Ok(cartesian_merge(factors))
        }
        Node::Scalar(_) => Err(MatrixError::UnexpectedShape {
            path: path.to_string(),
            expected: "an object or a list".to_string(),
            found: "a scalar".to_string(),
        }),
    }
}

/// Object-level `$match`: one union factor holding every case branch plus
/// the implicit else branch. Each case's condition list is the negation of
/// all prior cases followed by its own predicate; the else branch carries
/// every negation and no fields.
fn flatten_match(
    cases: &[(String, Node)],
    path: &str,
    trace: &dyn TraceSink,
) -> MatrixResult<Vec<PartialRecord>> {
    let mut union = Vec::new();
    let mut negations: Vec<String> = Vec::new();
    for (case_expr, case_node) in cases {
        let mut condition = negations.clone();
        condition.push(case_expr.clone());
        negations.push(format!("!({})", case_expr));

        let child = format!("{}.$match[{}]", path, case_expr);
        let branch = flatten_at(case_node, &child, trace)?;
        union.extend(cartesian_merge(vec![
            branch,
            vec![PartialRecord::with_conditions(condition)],
        ]));
    }
    union.push(PartialRecord::with_conditions(negations));
    Ok(union)
}

/// Flatten the value of a plain field.
fn flatten_field(
    key: &str,
    node: &Node,
    path: &str,
    trace: &dyn TraceSink,
) -> MatrixResult<Vec<PartialRecord>> {
    match node {
        Node::Scalar(scalar) => Ok(vec![PartialRecord::with_field(
            key,
            OutputValue::Scalar(scalar.clone()),
        )]),
        // A list fans the field out as alternation.
        Node::List(items) => {
            let mut output = Vec::new();
            for (i, item) in items.iter().enumerate() {
                output.extend(flatten_field(key, item, &format!("{}[{}]", path, i), trace)?);
            }
            Ok(output)
        }
        Node::Object(entries) => flatten_field_object(key, entries, path, trace),
    }
}

fn flatten_field_object(
    key: &str,
    entries: &[Entry],
    path: &str,
    trace: &dyn TraceSink,
) -> MatrixResult<Vec<PartialRecord>> {
    // Field-level `$match`: the same alternation rule as the object level,
    // specialized to this field and merged with the remaining sibling keys.
    if let Some(pos) = entries.iter().position(|e| matches!(e, Entry::Match(_))) {
        let Entry::Match(cases) = &entries[pos] else {
            unreachable!()
        };
        let rest = without_entry(entries, pos);
        let rest_flat = flatten_at(&Node::Object(rest), path, trace)?;

        let mut outputs = Vec::new();
        let mut negations: Vec<String> = Vec::new();
        for (case_expr, case_node) in cases {
            let mut condition = negations.clone();
            condition.push(case_expr.clone());
            negations.push(format!("!({})", case_expr));

            let child = format!("{}.$match[{}]", path, case_expr);
            let case_out = flatten_field(key, case_node, &child, trace)?;
            outputs.extend(cartesian_merge(vec![
                case_out,
                rest_flat.clone(),
                vec![PartialRecord::with_conditions(condition)],
            ]));
        }
        // Implicit else: the field stays absent, the negations still apply.
        outputs.extend(cartesian_merge(vec![
            rest_flat,
            vec![PartialRecord::with_conditions(negations)],
        ]));
        return Ok(outputs);
    }

    // `$dynamic`: the field becomes a lazily computed value.
    if let Some(pos) = entries.iter().position(|e| matches!(e, Entry::Dynamic(_))) {
        let Entry::Dynamic(expr) = &entries[pos] else {
            unreachable!()
        };
        let dynamic = vec![PartialRecord::with_field(
            key,
            OutputValue::Dynamic(expr.clone()),
        )];
        let rest = without_entry(entries, pos);
        if rest.is_empty() {
            return Ok(dynamic);
        }
        let rest_flat = flatten_at(&Node::Object(rest), path, trace)?;
        return Ok(cartesian_merge(vec![dynamic, rest_flat]));
    }

    // `$value`: unwrap, then merge with the remaining sibling keys.
    if let Some(pos) = entries.iter().position(|e| matches!(e, Entry::Value(_))) {
        let Entry::Value(wrapped) = &entries[pos] else {
            unreachable!()
        };
        let out = flatten_field(key, wrapped, &format!("{}.$value", path), trace)?;
        let rest = without_entry(entries, pos);
        if rest.is_empty() {
            return Ok(out);
        }
        let rest_flat = flatten_at(&Node::Object(rest), path, trace)?;
        return Ok(cartesian_merge(vec![out, rest_flat]));
    }

    // No directive: every key is a value label, one record per label.
    if entries.is_empty() {
        return Err(MatrixError::EmptyValueObject {
            key: key.to_string(),
            path: path.to_string(),
        });
    }
    let mut outputs = Vec::new();
    for entry in entries {
        match entry {
            Entry::Field(label, nested) => {
                let labeled = vec![PartialRecord::with_field(
                    key,
                    OutputValue::Scalar(Scalar::Str(label.clone())),
                )];
                let nested_flat = flatten_at(nested, &format!("{}.{}", path, label), trace)?;
                outputs.extend(cartesian_merge(vec![labeled, nested_flat]));
            }
            other => {
                return Err(MatrixError::IllegalDirectiveKey {
                    key: entry_key(other).to_string(),
                    path: path.to_string(),
                })
            }
        }
    }
    Ok(outputs)
}

fn without_entry(entries: &[Entry], pos: usize) -> Vec<Entry> {
    entries
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != pos)
        .map(|(_, e)| e.clone())
        .collect()
}

fn entry_key(entry: &Entry) -> &'static str {
    match entry {
        Entry::If(_) => crate::input::IF_KEY,
        Entry::Match(_) => crate::input::MATCH_KEY,
        Entry::Value(_) => VALUE_KEY,
        Entry::Dynamic(_) => DYNAMIC_KEY,
        Entry::Array(_) => crate::input::ARRAY_KEY,
        Entry::Arrays(_) => crate::input::ARRAYS_KEY,
        Entry::Field(_, _) => "",
    }
}
