//! Document loading for the CLI shims.
//!
//! Reads input and config documents from disk and decodes them to JSON
//! values with document order preserved. The format is picked by file
//! extension; anything unrecognized tries JSON first, then YAML.

use serde_json::Value;
use std::path::Path;

use crate::error::{LoadError, LoadResult};

/// Supported document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

/// Pick a format from the file extension, if it is unambiguous.
pub fn detect_format(path: &Path) -> Option<DocumentFormat> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => Some(DocumentFormat::Json),
        Some("yaml") | Some("yml") => Some(DocumentFormat::Yaml),
        _ => None,
    }
}

/// Decode document text in the given format.
pub fn parse_document(text: &str, format: DocumentFormat, origin: &str) -> LoadResult<Value> {
    match format {
        DocumentFormat::Json => serde_json::from_str(text).map_err(|source| LoadError::Json {
            path: origin.to_string(),
            source,
        }),
        DocumentFormat::Yaml => {
            let yaml: serde_yaml::Value =
                serde_yaml::from_str(text).map_err(|source| LoadError::Yaml {
                    path: origin.to_string(),
                    source,
                })?;
            yaml_to_json(yaml, origin)
        }
    }
}

/// Convert a YAML value to JSON, keeping mapping order and stringifying
/// scalar keys (YAML allows unquoted numeric keys, used by the `$arrays`
/// object form).
fn yaml_to_json(value: serde_yaml::Value, origin: &str) -> LoadResult<Value> {
    Ok(match value {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Number(i.into())
            } else if let Some(u) = n.as_u64() {
                Value::Number(u.into())
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
        }
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(items) => Value::Array(
            items
                .into_iter()
                .map(|item| yaml_to_json(item, origin))
                .collect::<LoadResult<_>>()?,
        ),
        serde_yaml::Value::Mapping(map) => {
            let mut object = serde_json::Map::new();
            for (key, item) in map {
                let key = match key {
                    serde_yaml::Value::String(s) => s,
                    serde_yaml::Value::Number(n) => n.to_string(),
                    serde_yaml::Value::Bool(b) => b.to_string(),
                    _ => {
                        return Err(LoadError::Key {
                            path: origin.to_string(),
                        })
                    }
                };
                object.insert(key, yaml_to_json(item, origin)?);
            }
            Value::Object(object)
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(tagged.value, origin)?,
    })
}

/// Read and decode a document from disk.
///
/// An empty file (or explicit null document) is an error: a matrix input
/// is required, and a config caller wanting "no config" passes no file.
pub fn load_document(path: &Path) -> LoadResult<Value> {
    let origin = path.display().to_string();
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: origin.clone(),
        source,
    })?;

    let value = match detect_format(path) {
        Some(format) => parse_document(&text, format, &origin)?,
        None => parse_document(&text, DocumentFormat::Json, &origin)
            .or_else(|_| parse_document(&text, DocumentFormat::Yaml, &origin))?,
    };

    if value.is_null() {
        return Err(LoadError::Empty { path: origin });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_detect_format() {
        assert_eq!(
            detect_format(Path::new("m.json")),
            Some(DocumentFormat::Json)
        );
        assert_eq!(
            detect_format(Path::new("m.yaml")),
            Some(DocumentFormat::Yaml)
        );
        assert_eq!(detect_format(Path::new("m.yml")), Some(DocumentFormat::Yaml));
        assert_eq!(detect_format(Path::new("m.txt")), None);
    }

    #[test]
    fn test_yaml_preserves_key_order() {
        let value = parse_document("b: '1'\na: '2'\nc: '3'\n", DocumentFormat::Yaml, "t").unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["b", "a", "c"]);
    }

    #[test]
    fn test_json_preserves_key_order() {
        let value =
            parse_document(r#"{"b": "1", "a": "2"}"#, DocumentFormat::Json, "t").unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["b", "a"]);
    }

    #[test]
    fn test_yaml_numeric_keys_become_strings() {
        let value = parse_document(
            "\"$arrays\":\n  0: [{os: mac}]\n  2: [{arch: arm}]\n",
            DocumentFormat::Yaml,
            "t",
        )
        .unwrap();
        let arrays = value["$arrays"].as_object().unwrap();
        let keys: Vec<&String> = arrays.keys().collect();
        assert_eq!(keys, ["0", "2"]);
    }

    #[test]
    fn test_load_document_roundtrip() {
        let mut file = tempfile::Builder::new()
            .suffix(".yaml")
            .tempfile()
            .unwrap();
        writeln!(file, "os: [mac, linux]").unwrap();
        let value = load_document(file.path()).unwrap();
        assert_eq!(value, json!({"os": ["mac", "linux"]}));
    }

    #[test]
    fn test_empty_document_is_an_error() {
        let file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        let err = load_document(file.path()).unwrap_err();
        assert!(matches!(err, LoadError::Empty { .. }));
    }
}
