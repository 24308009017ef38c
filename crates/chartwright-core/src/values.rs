//! Configuration values with deep merge support
//!
//! A [`ConfigTree`] is a string-keyed mapping whose entries are [`Value`]s:
//! a scalar, a sequence, or another tree. Merging follows Helm's precedence
//! rules: the overlay wins on conflict, mappings that meet mappings are merged
//! recursively, and everything else is replaced wholesale.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use serde_yaml::Value as YamlValue;
use std::path::Path;

use crate::error::{CoreError, Result};

/// Key whose subtree is shared with every subchart
pub const GLOBAL_KEY: &str = "global";

/// A leaf value
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::Null => write!(f, "null"),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Int(i) => write!(f, "{}", i),
            Scalar::Float(x) => write!(f, "{}", x),
            Scalar::String(s) => write!(f, "{}", s),
        }
    }
}

/// A node of a configuration tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Scalar(Scalar),
    Sequence(Vec<Value>),
    Mapping(ConfigTree),
}

impl Default for Value {
    fn default() -> Self {
        Value::Scalar(Scalar::Null)
    }
}

impl Value {
    pub fn null() -> Self {
        Self::default()
    }

    pub fn is_mapping(&self) -> bool {
        matches!(self, Value::Mapping(_))
    }

    pub fn as_tree(&self) -> Option<&ConfigTree> {
        match self {
            Value::Mapping(tree) => Some(tree),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Scalar(Scalar::String(s)) => Some(s),
            _ => None,
        }
    }

    fn kind_name(&self) -> &'static str {
        match self {
            Value::Scalar(Scalar::Null) => "null",
            Value::Scalar(_) => "a scalar",
            Value::Sequence(_) => "a list",
            Value::Mapping(_) => "a mapping",
        }
    }
}

/// Decoded YAML to a tree node
///
/// Scalar mapping keys (`80:`, `true:`, `~:`) become their string form.
/// Tags are ignored. Merge keys (`<<`) must already be resolved.
impl TryFrom<YamlValue> for Value {
    type Error = String;

    fn try_from(raw: YamlValue) -> std::result::Result<Self, Self::Error> {
        Ok(match raw {
            YamlValue::Null => Value::null(),
            YamlValue::Bool(b) => Value::from(b),
            YamlValue::Number(n) => Value::Scalar(number_scalar(&n)),
            YamlValue::String(s) => Value::from(s),
            YamlValue::Sequence(items) => Value::Sequence(
                items
                    .into_iter()
                    .map(Value::try_from)
                    .collect::<std::result::Result<_, _>>()?,
            ),
            YamlValue::Mapping(mapping) => {
                let mut tree = ConfigTree::new();
                for (key, value) in mapping {
                    tree.insert(mapping_key(key)?, Value::try_from(value)?);
                }
                Value::Mapping(tree)
            }
            YamlValue::Tagged(tagged) => Value::try_from(tagged.value)?,
        })
    }
}

impl From<&JsonValue> for Value {
    fn from(json: &JsonValue) -> Self {
        match json {
            JsonValue::Null => Value::null(),
            JsonValue::Bool(b) => Value::from(*b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Value::from(i),
                None => n
                    .as_f64()
                    .map(Value::from)
                    .unwrap_or_else(|| Value::from(n.to_string())),
            },
            JsonValue::String(s) => Value::from(s.as_str()),
            JsonValue::Array(items) => Value::Sequence(items.iter().map(Value::from).collect()),
            JsonValue::Object(map) => Value::Mapping(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from(v)))
                    .collect(),
            ),
        }
    }
}

fn number_scalar(n: &serde_yaml::Number) -> Scalar {
    if let Some(i) = n.as_i64() {
        return Scalar::Int(i);
    }
    match n.as_f64() {
        Some(x) => Scalar::Float(x),
        None => Scalar::String(n.to_string()),
    }
}

fn mapping_key(key: YamlValue) -> std::result::Result<String, String> {
    match key {
        YamlValue::String(s) => Ok(s),
        YamlValue::Bool(b) => Ok(b.to_string()),
        YamlValue::Number(n) => Ok(n.to_string()),
        YamlValue::Null => Ok("null".to_string()),
        YamlValue::Tagged(tagged) => mapping_key(tagged.value),
        YamlValue::Sequence(_) | YamlValue::Mapping(_) => {
            Err("mapping keys must be scalars, found a collection key".to_string())
        }
    }
}

impl From<Scalar> for Value {
    fn from(scalar: Scalar) -> Self {
        Value::Scalar(scalar)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Scalar(Scalar::Bool(b))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Scalar(Scalar::Int(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Scalar(Scalar::Float(x))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Scalar(Scalar::String(s.to_string()))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Scalar(Scalar::String(s))
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Sequence(items)
    }
}

impl From<ConfigTree> for Value {
    fn from(tree: ConfigTree) -> Self {
        Value::Mapping(tree)
    }
}

impl PartialEq<&str> for Value {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == Some(*other)
    }
}

impl PartialEq<i64> for Value {
    fn eq(&self, other: &i64) -> bool {
        matches!(self, Value::Scalar(Scalar::Int(i)) if i == other)
    }
}

impl PartialEq<bool> for Value {
    fn eq(&self, other: &bool) -> bool {
        matches!(self, Value::Scalar(Scalar::Bool(b)) if b == other)
    }
}

/// Configuration tree: an insertion-ordered, string-keyed mapping
///
/// Equality is structural and ignores key order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigTree(IndexMap<String, Value>);

impl ConfigTree {
    /// Create an empty tree
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    /// Load a tree from a YAML file
    ///
    /// Read failures are reported as [`CoreError::SourceRead`], decode
    /// failures as [`CoreError::Parse`] naming the file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| CoreError::SourceRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_named(&path.display().to_string(), &content)
    }

    /// Parse a tree from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Self::from_yaml_named("values", yaml)
    }

    /// Parse a tree from YAML, naming the source in errors
    ///
    /// Empty, comment-only and `null` documents yield an empty tree. Any other
    /// non-mapping top level is an error.
    pub fn from_yaml_named(source_name: &str, yaml: &str) -> Result<Self> {
        if is_blank_yaml(yaml) {
            return Ok(Self::new());
        }
        let mut raw: YamlValue =
            serde_yaml::from_str(yaml).map_err(|e| CoreError::parse(source_name, e))?;
        raw.apply_merge()
            .map_err(|e| CoreError::parse(source_name, e))?;

        match Value::try_from(raw).map_err(|message| CoreError::parse(source_name, message))? {
            Value::Mapping(tree) => Ok(tree),
            Value::Scalar(Scalar::Null) => Ok(Self::new()),
            other => Err(CoreError::parse(
                source_name,
                format!("top level must be a mapping, found {}", other.kind_name()),
            )),
        }
    }

    /// Tree view of a JSON object; anything else gives an empty tree
    pub fn from_json(json: &JsonValue) -> Self {
        match Value::from(json) {
            Value::Mapping(tree) => tree,
            _ => Self::new(),
        }
    }

    /// Serialize to YAML
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| CoreError::parse("merged values", e))
    }

    /// Convert to a JSON value for template contexts
    pub fn to_json(&self) -> JsonValue {
        serde_json::to_value(self).unwrap_or(JsonValue::Null)
    }

    /// Values visible to a subchart named `name`
    ///
    /// The parent's `name` subtree becomes the subchart's root and the
    /// parent's `global` subtree is passed down as is.
    ///
    /// ```yaml
    /// global:
    ///   domain: example.com
    /// redis:
    ///   port: 6379
    /// ```
    ///
    /// scoped for `redis` is `{global: {domain: example.com}, port: 6379}`.
    pub fn scope_for_subchart(&self, name: &str) -> ConfigTree {
        let mut scoped = match self.get_key(name) {
            Some(Value::Mapping(own)) => own.clone(),
            _ => ConfigTree::new(),
        };
        if let Some(global) = self.get_key(GLOBAL_KEY) {
            let merged = match (scoped.0.shift_remove(GLOBAL_KEY), global) {
                (Some(Value::Mapping(own)), Value::Mapping(parent)) => {
                    Value::Mapping(merge(own, parent.clone()))
                }
                (_, parent) => parent.clone(),
            };
            scoped.insert(GLOBAL_KEY, merged);
        }
        scoped
    }

    /// Full values of a subchart: its own defaults, overridden by what the
    /// parent scopes down to it
    pub fn for_subchart(defaults: ConfigTree, parent: &ConfigTree, name: &str) -> ConfigTree {
        merge(defaults, parent.scope_for_subchart(name))
    }

    /// Deep merge `overlay` into this tree in place
    pub fn merge(&mut self, overlay: ConfigTree) {
        let base = std::mem::take(self);
        *self = merge(base, overlay);
    }

    /// Get a value by dotted path (e.g. `image.tag`)
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let first = parts.next()?;
        let mut current = self.0.get(first)?;
        for part in parts {
            current = current.as_tree()?.0.get(part)?;
        }
        Some(current)
    }

    /// Get a top-level entry
    pub fn get_key(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_key_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.0.get_mut(key)
    }

    /// Insert a top-level entry, returning the previous value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Value)> for ConfigTree {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for ConfigTree {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Merge `overlay` onto `base`
///
/// Rules, per key of the overlay:
/// - absent in base: inserted as is, nested structure included
/// - overlay value is a scalar or sequence: replaces the base value
/// - overlay value is a mapping and the base value is not: replaces it
/// - both are mappings: merged recursively
pub fn merge(mut base: ConfigTree, overlay: ConfigTree) -> ConfigTree {
    for (key, incoming) in overlay {
        match base.0.get_mut(&key) {
            Some(existing) => {
                let current = std::mem::take(existing);
                *existing = merge_value(current, incoming);
            }
            None => {
                base.0.insert(key, incoming);
            }
        }
    }
    base
}

fn merge_value(existing: Value, incoming: Value) -> Value {
    match (existing, incoming) {
        (Value::Mapping(base), Value::Mapping(overlay)) => Value::Mapping(merge(base, overlay)),
        (_, incoming) => incoming,
    }
}

/// Merge overrides onto `base` in order; later overrides win
pub fn merge_sequence<I>(base: ConfigTree, overrides: I) -> ConfigTree
where
    I: IntoIterator<Item = ConfigTree>,
{
    overrides.into_iter().fold(base, merge)
}

/// True when a YAML text holds no content (blank lines, comments, markers)
pub(crate) fn is_blank_yaml(text: &str) -> bool {
    text.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#') || line == "---" || line == "..."
    })
}
