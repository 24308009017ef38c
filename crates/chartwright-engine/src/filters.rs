//! Helm-flavoured template filters

use base64::Engine as _;
use minijinja::{Error, ErrorKind, Value};

use chartwright_core::ConfigTree;

fn invalid(message: impl ToString) -> Error {
    Error::new(ErrorKind::InvalidOperation, message.to_string())
}

/// Render a value as YAML without the document marker or trailing newline
///
/// Usage: {{ values.resources | toyaml | nindent(10) }}
pub fn toyaml(value: Value) -> Result<String, Error> {
    let json: serde_json::Value = serde_json::to_value(&value).map_err(invalid)?;
    if json.is_null() {
        return Ok(String::new());
    }
    let yaml = serde_yaml::to_string(&json).map_err(invalid)?;
    Ok(yaml.trim_start_matches("---\n").trim_end().to_string())
}

/// Usage: {{ values.config | tojson }}
pub fn tojson(value: Value) -> Result<String, Error> {
    serde_json::to_string(&value).map_err(invalid)
}

#[must_use]
pub fn b64encode(value: String) -> String {
    base64::engine::general_purpose::STANDARD.encode(value.as_bytes())
}

pub fn b64decode(value: String) -> Result<String, Error> {
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(value.as_bytes())
        .map_err(|e| invalid(format!("base64 decode error: {}", e)))?;
    String::from_utf8(decoded).map_err(|e| invalid(format!("UTF-8 decode error: {}", e)))
}

fn display(value: &Value) -> String {
    match value.as_str() {
        Some(s) => s.to_string(),
        None => value.to_string(),
    }
}

/// Usage: {{ values.name | quote }}
#[must_use]
pub fn quote(value: Value) -> String {
    format!(
        "\"{}\"",
        display(&value).replace('\\', "\\\\").replace('"', "\\\"")
    )
}

#[must_use]
pub fn squote(value: Value) -> String {
    format!("'{}'", display(&value).replace('\'', "''"))
}

/// Indent every non-empty line, leaving the first line where it is
pub fn indent(value: String, spaces: usize) -> String {
    let pad = " ".repeat(spaces);
    value
        .lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{}{}", pad, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Like [`indent`] but starts with a newline
///
/// Usage: {{ values.labels | toyaml | nindent(4) }}
pub fn nindent(value: String, spaces: usize) -> String {
    format!("\n{}", indent(value, spaces))
}

/// Fail when a value is missing or an empty string
///
/// Usage: {{ values.image.repository | required("image.repository is required") }}
pub fn required(value: Value, message: Option<String>) -> Result<Value, Error> {
    let missing = value.is_undefined()
        || value.is_none()
        || value.as_str().is_some_and(str::is_empty);

    if missing {
        Err(invalid(
            message.unwrap_or_else(|| "required value is missing".to_string()),
        ))
    } else {
        Ok(value)
    }
}

/// Usage: {% if values.tolerations | empty %}
pub fn empty(value: Value) -> bool {
    if value.is_undefined() || value.is_none() {
        return true;
    }
    match value.len() {
        Some(len) => len == 0,
        None => value.as_str().is_some_and(str::is_empty),
    }
}

pub fn haskey(value: Value, key: String) -> bool {
    value
        .get_attr(&key)
        .map(|v| !v.is_undefined())
        .unwrap_or(false)
}

/// Deep merge two mappings with the same rules as values files
///
/// Usage: {{ values.podLabels | merge(extra) | toyaml }}
pub fn merge(base: Value, overlay: Value) -> Result<Value, Error> {
    let base: ConfigTree = serde_json::to_value(&base)
        .and_then(serde_json::from_value)
        .map_err(|e| invalid(format!("merge expects mappings: {}", e)))?;
    let overlay: ConfigTree = serde_json::to_value(&overlay)
        .and_then(serde_json::from_value)
        .map_err(|e| invalid(format!("merge expects mappings: {}", e)))?;

    Ok(Value::from_serialize(chartwright_core::merge(base, overlay)))
}

/// Hex SHA-256 digest, handy for checksum annotations
pub fn sha256sum(value: String) -> String {
    use sha2::{Digest, Sha256};
    format!("{:x}", Sha256::digest(value.as_bytes()))
}

/// Usage: {{ release.name | trunc(63) }}
pub fn trunc(value: String, length: usize) -> String {
    value.chars().take(length).collect()
}

pub fn trimprefix(value: String, prefix: String) -> String {
    value.strip_prefix(prefix.as_str()).unwrap_or(&value).to_string()
}

pub fn trimsuffix(value: String, suffix: String) -> String {
    value.strip_suffix(suffix.as_str()).unwrap_or(&value).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toyaml() {
        let value = Value::from_serialize(serde_json::json!({"a": 1, "b": ["x"]}));
        assert_eq!(toyaml(value).unwrap(), "a: 1\nb:\n- x");
    }

    #[test]
    fn test_quote() {
        assert_eq!(quote(Value::from("a\"b")), "\"a\\\"b\"");
        assert_eq!(quote(Value::from(3)), "\"3\"");
        assert_eq!(squote(Value::from("it's")), "'it''s'");
    }

    #[test]
    fn test_indent_skips_empty_lines() {
        assert_eq!(indent("a\n\nb".to_string(), 2), "  a\n\n  b");
        assert_eq!(nindent("a".to_string(), 4), "\n    a");
    }

    #[test]
    fn test_required() {
        assert!(required(Value::UNDEFINED, None).is_err());
        assert!(required(Value::from(""), Some("need it".into())).is_err());
        assert!(required(Value::from("x"), None).is_ok());
    }

    #[test]
    fn test_empty() {
        assert!(empty(Value::UNDEFINED));
        assert!(empty(Value::from(Vec::<Value>::new())));
        assert!(!empty(Value::from("x")));
    }

    #[test]
    fn test_merge_uses_values_rules() {
        let base = Value::from_serialize(serde_json::json!({"a": {"x": 1, "y": 2}, "s": 1}));
        let overlay = Value::from_serialize(serde_json::json!({"a": {"y": 3}, "s": {"n": true}}));

        let merged: serde_json::Value = serde_json::to_value(merge(base, overlay).unwrap()).unwrap();
        assert_eq!(merged, serde_json::json!({"a": {"x": 1, "y": 3}, "s": {"n": true}}));
    }

    #[test]
    fn test_b64_round_trip() {
        assert_eq!(b64encode("hello".into()), "aGVsbG8=");
        assert_eq!(b64decode("aGVsbG8=".into()).unwrap(), "hello");
    }

    #[test]
    fn test_sha256() {
        assert_eq!(
            sha256sum("".into()),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_trim_helpers() {
        assert_eq!(trunc("abcdef".into(), 3), "abc");
        assert_eq!(trimprefix("v1.2".into(), "v".into()), "1.2");
        assert_eq!(trimsuffix("a.yaml".into(), ".yaml".into()), "a");
    }
}
