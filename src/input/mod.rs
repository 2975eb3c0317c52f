//! Input model for matrix documents.
//!
//! Decodes an already-parsed JSON/YAML tree into a tagged [`Node`] /
//! [`Entry`] representation. Directive keys (`$if`, `$match`, `$value`,
//! `$dynamic`, `$array`, `$arrays`) are recognized exactly once here, so
//! the expansion engine never compares reserved strings during traversal.
//!
//! Decoding is strict: scalars are strings and booleans only, plain keys
//! must be identifiers, and every violation raises immediately with the
//! offending key and its document path.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::error::{MatrixError, MatrixResult};

/// Reserved directive keys.
pub const IF_KEY: &str = "$if";
pub const MATCH_KEY: &str = "$match";
pub const VALUE_KEY: &str = "$value";
pub const DYNAMIC_KEY: &str = "$dynamic";
pub const ARRAY_KEY: &str = "$array";
pub const ARRAYS_KEY: &str = "$arrays";

/// Plain field keys: letters, digits, underscore, dash; no leading digit
/// or dash. Dashes are common in CI field names (`fail-fast`, `runs-on`).
static IDENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]*$").expect("invalid identifier pattern"));

/// A scalar field value: the only leaf types a matrix document may carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scalar {
    Str(String),
    Bool(bool),
}

impl Scalar {
    pub fn to_value(&self) -> Value {
        match self {
            Scalar::Str(s) => Value::String(s.clone()),
            Scalar::Bool(b) => Value::Bool(*b),
        }
    }
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::Str(s) => write!(f, "{}", s),
            Scalar::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// One decoded node of the matrix document.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Scalar(Scalar),
    List(Vec<Node>),
    /// Object entries in document order.
    Object(Vec<Entry>),
}

/// One key of an object node, with directives decided at decode time.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    /// `$if`: condition(s) attached to the enclosing object (conjunction).
    If(Vec<String>),
    /// `$match`: case expression -> node, in document order.
    Match(Vec<(String, Node)>),
    /// `$value`: wrapped literal/nested value for a field written as an object.
    Value(Node),
    /// `$dynamic`: lazily computed field expression.
    Dynamic(String),
    /// `$array`: alternation over the listed nodes.
    Array(Vec<Node>),
    /// `$arrays`: one alternation factor per member list; `None` marks a
    /// numeric-key gap and contributes nothing.
    Arrays(Vec<Option<Vec<Node>>>),
    /// A plain field.
    Field(String, Node),
}

impl Node {
    /// Decode a parsed document into the tagged representation.
    pub fn from_value(value: &Value) -> MatrixResult<Node> {
        decode(value, "$")
    }

    /// Human-readable shape name for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Scalar(_) => "a scalar",
            Node::List(_) => "a list",
            Node::Object(_) => "an object",
        }
    }
}

/// Check a plain field key.
pub fn is_plain_identifier(key: &str) -> bool {
    IDENT_RE.is_match(key)
}

fn decode(value: &Value, path: &str) -> MatrixResult<Node> {
    match value {
        Value::String(s) => Ok(Node::Scalar(Scalar::Str(s.clone()))),
        Value::Bool(b) => Ok(Node::Scalar(Scalar::Bool(*b))),
        Value::Array(items) => {
            let mut nodes = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                nodes.push(decode(item, &format!("{}[{}]", path, i))?);
            }
            Ok(Node::List(nodes))
        }
        Value::Object(map) => {
            let mut entries = Vec::with_capacity(map.len());
            for (key, value) in map {
                entries.push(decode_entry(key, value, path)?);
            }
            Ok(Node::Object(entries))
        }
        Value::Number(_) | Value::Null => Err(MatrixError::UnexpectedShape {
            path: path.to_string(),
            expected: "a string, boolean, list or object".to_string(),
            found: value_kind(value).to_string(),
        }),
    }
}

fn decode_entry(key: &str, value: &Value, path: &str) -> MatrixResult<Entry> {
    let child = format!("{}.{}", path, key);
    match key {
        IF_KEY => Ok(Entry::If(decode_if(value, &child)?)),
        MATCH_KEY => Ok(Entry::Match(decode_match(value, &child)?)),
        VALUE_KEY => Ok(Entry::Value(decode(value, &child)?)),
        DYNAMIC_KEY => match value {
            Value::String(expr) => Ok(Entry::Dynamic(expr.clone())),
            other => Err(MatrixError::UnexpectedShape {
                path: child,
                expected: "an expression string".to_string(),
                found: value_kind(other).to_string(),
            }),
        },
        ARRAY_KEY => match value {
            Value::Array(items) => {
                let mut nodes = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    nodes.push(decode(item, &format!("{}[{}]", child, i))?);
                }
                Ok(Entry::Array(nodes))
            }
            other => Err(MatrixError::UnexpectedShape {
                path: child,
                expected: "an array".to_string(),
                found: value_kind(other).to_string(),
            }),
        },
        ARRAYS_KEY => Ok(Entry::Arrays(decode_arrays(value, &child)?)),
        _ if is_plain_identifier(key) => {
            Ok(Entry::Field(key.to_string(), decode(value, &child)?))
        }
        _ => Err(MatrixError::IllegalKey {
            key: key.to_string(),
            path: path.to_string(),
        }),
    }
}

fn decode_if(value: &Value, path: &str) -> MatrixResult<Vec<String>> {
    match value {
        Value::String(s) => Ok(vec![s.clone()]),
        Value::Array(items) => {
            let mut conditions = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                match item {
                    Value::String(s) => conditions.push(s.clone()),
                    other => {
                        return Err(MatrixError::UnexpectedShape {
                            path: format!("{}[{}]", path, i),
                            expected: "a condition string".to_string(),
                            found: value_kind(other).to_string(),
                        })
                    }
                }
            }
            Ok(conditions)
        }
        other => Err(MatrixError::UnexpectedShape {
            path: path.to_string(),
            expected: "a condition string or list of condition strings".to_string(),
            found: value_kind(other).to_string(),
        }),
    }
}

fn decode_match(value: &Value, path: &str) -> MatrixResult<Vec<(String, Node)>> {
    match value {
        Value::Object(map) => {
            let mut cases = Vec::with_capacity(map.len());
            for (case, node) in map {
                cases.push((case.clone(), decode(node, &format!("{}[{}]", path, case))?));
            }
            Ok(cases)
        }
        other => Err(MatrixError::UnexpectedShape {
            path: path.to_string(),
            expected: "an object mapping case expressions to values".to_string(),
            found: value_kind(other).to_string(),
        }),
    }
}

/// `$arrays` accepts a list of lists, or an object with numeric-string
/// keys treated as a (possibly sparse) list. Gaps decode to `None`.
fn decode_arrays(value: &Value, path: &str) -> MatrixResult<Vec<Option<Vec<Node>>>> {
    match value {
        Value::Array(items) => {
            let mut lists = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                lists.push(Some(decode_member_list(item, &format!("{}[{}]", path, i))?));
            }
            Ok(lists)
        }
        Value::Object(map) => {
            let mut lists: Vec<Option<Vec<Node>>> = Vec::new();
            for (key, item) in map {
                let index: usize = key.parse().map_err(|_| MatrixError::UnexpectedShape {
                    path: path.to_string(),
                    expected: "numeric keys".to_string(),
                    found: format!("key '{}'", key),
                })?;
                if index >= lists.len() {
                    lists.resize(index + 1, None);
                }
                lists[index] = Some(decode_member_list(item, &format!("{}[{}]", path, index))?);
            }
            Ok(lists)
        }
        other => Err(MatrixError::UnexpectedShape {
            path: path.to_string(),
            expected: "an array of arrays or an object with numeric keys".to_string(),
            found: value_kind(other).to_string(),
        }),
    }
}

fn decode_member_list(value: &Value, path: &str) -> MatrixResult<Vec<Node>> {
    match value {
        Value::Array(items) => {
            let mut nodes = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                nodes.push(decode(item, &format!("{}[{}]", path, i))?);
            }
            Ok(nodes)
        }
        other => Err(MatrixError::UnexpectedShape {
            path: path.to_string(),
            expected: "an array".to_string(),
            found: value_kind(other).to_string(),
        }),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Generate an example matrix document for the CLI `example` command.
pub fn example_document() -> Value {
    serde_json::json!({
        "os": ["ubuntu-latest", "macos-latest"],
        "profile": {
            "quick": { "cargo_args": "--lib" },
            "full": { "cargo_args": "--all-targets" }
        },
        "toolchain": {
            "$match": {
                "config.include_nightly": "nightly"
            }
        },
        "cache_key": { "$dynamic": "os" },
        "$if": "os != 'macos-latest' || config.enable_macos"
    })
}

/// Get a description of all directives for the CLI `directives` command.
pub fn directives_description() -> String {
    r#"Available directives:

| Directive  | Context      | Meaning                                                        |
|------------|--------------|----------------------------------------------------------------|
| $if        | object       | Condition (or list of conditions) records from this object must satisfy |
| $match     | object/field | Mutually exclusive alternation; each case key is a predicate, cases are tried in order, an implicit else branch carries all negations |
| $value     | field        | Wraps a literal or nested value for a field written as an object |
| $dynamic   | field        | Expression computed lazily per record, memoized on first read  |
| $array     | object       | Alternation (one-of) over the listed nodes                     |
| $arrays    | object       | List of lists (or object with numeric keys); each member list is an independent alternation factor |

Plain keys map a field name to a scalar, a list of alternatives, or a
nested object whose keys become value labels:

  { "label": { "mac": { "os": "osx" }, "linux": { "os": "ubuntu" } } }

yields one record per nested key with `label` set to that key.

Expressions may use ==, !=, &&, ||, !, parentheses, string/number/bool
literals, record fields (bare name or this.name) and config member access
(config.some.member)."#
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_example_document() {
        let node = Node::from_value(&example_document()).unwrap();
        let Node::Object(entries) = node else {
            panic!("expected object");
        };
        assert_eq!(entries.len(), 5);
        assert!(matches!(&entries[0], Entry::Field(key, Node::List(_)) if key == "os"));
        assert!(matches!(&entries[4], Entry::If(conds) if conds.len() == 1));
    }

    #[test]
    fn test_decode_preserves_document_order() {
        let node = Node::from_value(&json!({"b": "1", "a": "2", "c": "3"})).unwrap();
        let Node::Object(entries) = node else {
            panic!("expected object");
        };
        let keys: Vec<&str> = entries
            .iter()
            .map(|e| match e {
                Entry::Field(k, _) => k.as_str(),
                _ => panic!("expected plain fields"),
            })
            .collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_number_is_unexpected_shape() {
        let err = Node::from_value(&json!({"workers": 4})).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("a number"), "got: {msg}");
        assert!(msg.contains("$.workers"), "got: {msg}");
    }

    #[test]
    fn test_null_is_unexpected_shape() {
        let err = Node::from_value(&json!({"os": null})).unwrap_err();
        assert!(err.to_string().contains("null"));
    }

    #[test]
    fn test_unknown_reserved_key_is_illegal() {
        let err = Node::from_value(&json!({"$bogus": "x"})).unwrap_err();
        assert!(matches!(err, crate::error::MatrixError::IllegalKey { ref key, .. } if key == "$bogus"));
    }

    #[test]
    fn test_malformed_key_is_illegal() {
        let err = Node::from_value(&json!({"not a key": "x"})).unwrap_err();
        assert!(matches!(err, crate::error::MatrixError::IllegalKey { .. }));
    }

    #[test]
    fn test_dashed_key_is_plain() {
        assert!(is_plain_identifier("fail-fast"));
        assert!(is_plain_identifier("_private"));
        assert!(!is_plain_identifier("-leading"));
        assert!(!is_plain_identifier("9to5"));
        assert!(!is_plain_identifier("$if"));
    }

    #[test]
    fn test_if_accepts_string_and_list() {
        let node = Node::from_value(&json!({"$if": "a == 'b'"})).unwrap();
        assert!(matches!(&node, Node::Object(e) if matches!(&e[0], Entry::If(c) if c.len() == 1)));

        let node = Node::from_value(&json!({"$if": ["a == 'b'", "c != 'd'"]})).unwrap();
        assert!(matches!(&node, Node::Object(e) if matches!(&e[0], Entry::If(c) if c.len() == 2)));

        let err = Node::from_value(&json!({"$if": true})).unwrap_err();
        assert!(err.to_string().contains("condition"));
    }

    #[test]
    fn test_dynamic_must_be_string() {
        let err = Node::from_value(&json!({"x": {"$dynamic": ["nope"]}})).unwrap_err();
        assert!(err.to_string().contains("expression string"));
    }

    #[test]
    fn test_match_must_be_object() {
        let err = Node::from_value(&json!({"$match": ["nope"]})).unwrap_err();
        assert!(err.to_string().contains("case expressions"));
    }

    #[test]
    fn test_arrays_object_form_with_gaps() {
        let node = Node::from_value(&json!({
            "$arrays": {"2": [{"a": "x"}], "0": [{"b": "y"}]}
        }))
        .unwrap();
        let Node::Object(entries) = node else {
            panic!("expected object");
        };
        let Entry::Arrays(lists) = &entries[0] else {
            panic!("expected $arrays");
        };
        assert_eq!(lists.len(), 3);
        assert!(lists[0].is_some());
        assert!(lists[1].is_none(), "gap must decode to a skip entry");
        assert!(lists[2].is_some());
    }

    #[test]
    fn test_arrays_rejects_non_numeric_keys() {
        let err = Node::from_value(&json!({"$arrays": {"first": []}})).unwrap_err();
        assert!(err.to_string().contains("numeric"));
    }

    #[test]
    fn test_arrays_list_members_must_be_lists() {
        let err = Node::from_value(&json!({"$arrays": ["nope"]})).unwrap_err();
        assert!(err.to_string().contains("expected an array"));
    }
}
