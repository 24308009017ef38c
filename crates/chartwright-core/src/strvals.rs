//! Parser for `--set` style overrides
//!
//! Syntax, following Helm's conventions:
//!
//! ```text
//! name=value,image.tag=1.2,hosts={a,b},ports[1]=8080,msg=a\,b
//! ```
//!
//! - entries are separated by unescaped commas
//! - keys are dotted paths; a segment may carry list indices (`ports[1]`)
//! - `{a,b}` is a list
//! - `true`/`false`/`null` and plain integers are typed, anything else is a string
//! - `\` escapes the next character

use crate::error::{CoreError, Result};
use crate::values::{ConfigTree, Scalar, Value};

/// Upper bound for list indices, so `a[999999999]=x` cannot allocate wildly
const MAX_INDEX: usize = 65536;

const SOURCE: &str = "--set data";

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Key(String),
    Index(usize),
}

/// Parse a `--set` string into a fresh tree
pub fn parse_set(input: &str) -> Result<ConfigTree> {
    let mut tree = ConfigTree::new();
    parse_set_into(input, &mut tree)?;
    Ok(tree)
}

/// Parse several `--set` arguments in order; later assignments win
pub fn parse_set_values<S: AsRef<str>>(args: &[S]) -> Result<ConfigTree> {
    let mut tree = ConfigTree::new();
    for arg in args {
        parse_set_into(arg.as_ref(), &mut tree)?;
    }
    Ok(tree)
}

/// Parse a `--set` string, writing its assignments into `tree`
pub fn parse_set_into(input: &str, tree: &mut ConfigTree) -> Result<()> {
    for entry in split_unescaped(input, ',')? {
        if entry.is_empty() {
            continue;
        }
        let (raw_key, raw_value) = split_once_unescaped(&entry, '=').ok_or_else(|| {
            CoreError::parse(SOURCE, format!("key {:?} has no value", unescape(&entry)))
        })?;

        let path = parse_path(raw_key)?;
        let value = parse_value(raw_value)?;
        assign(tree, &path, value, raw_key)?;
    }
    Ok(())
}

/// Split on `sep` outside of escapes and `{...}` groups, keeping escapes intact
fn split_unescaped(input: &str, sep: char) -> Result<Vec<String>> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                current.push(c);
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            '{' => {
                depth += 1;
                current.push(c);
            }
            '}' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            c if c == sep && depth == 0 => parts.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }

    if depth > 0 {
        return Err(CoreError::parse(
            SOURCE,
            format!("unterminated list in {:?}", input),
        ));
    }
    parts.push(current);
    Ok(parts)
}

/// Split at the first unescaped `sep`
fn split_once_unescaped(input: &str, sep: char) -> Option<(&str, &str)> {
    let mut escaped = false;
    for (idx, c) in input.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == sep {
            return Some((&input[..idx], &input[idx + c.len_utf8()..]));
        }
    }
    None
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn parse_path(raw_key: &str) -> Result<Vec<Segment>> {
    let mut path = Vec::new();

    for raw_segment in split_unescaped(raw_key, '.')? {
        let (name, indices) = split_indices(&raw_segment, raw_key)?;
        if name.is_empty() {
            return Err(CoreError::parse(
                SOURCE,
                format!("empty key segment in {:?}", unescape(raw_key)),
            ));
        }
        path.push(Segment::Key(name));
        path.extend(indices.into_iter().map(Segment::Index));
    }

    Ok(path)
}

/// Split `name[1][2]` into `name` and `[1, 2]`
fn split_indices(raw_segment: &str, raw_key: &str) -> Result<(String, Vec<usize>)> {
    let Some(open) = first_unescaped(raw_segment, '[') else {
        return Ok((unescape(raw_segment), Vec::new()));
    };

    let name = unescape(&raw_segment[..open]);
    let mut indices = Vec::new();
    let mut rest = &raw_segment[open..];

    while !rest.is_empty() {
        let malformed = || {
            CoreError::parse(
                SOURCE,
                format!("malformed index in key {:?}", unescape(raw_key)),
            )
        };
        let inner = rest.strip_prefix('[').ok_or_else(malformed)?;
        let close = inner.find(']').ok_or_else(malformed)?;
        let index: usize = inner[..close].trim().parse().map_err(|_| malformed())?;
        if index > MAX_INDEX {
            return Err(CoreError::parse(
                SOURCE,
                format!("index {} exceeds maximum of {}", index, MAX_INDEX),
            ));
        }
        indices.push(index);
        rest = &inner[close + 1..];
    }

    Ok((name, indices))
}

fn first_unescaped(input: &str, needle: char) -> Option<usize> {
    let mut escaped = false;
    for (idx, c) in input.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == needle {
            return Some(idx);
        }
    }
    None
}

fn parse_value(raw: &str) -> Result<Value> {
    if let Some(body) = raw.strip_prefix('{') {
        let body = body.strip_suffix('}').ok_or_else(|| {
            CoreError::parse(SOURCE, format!("unterminated list in value {:?}", raw))
        })?;
        if body.is_empty() {
            return Ok(Value::Sequence(Vec::new()));
        }
        let items = split_unescaped(body, ',')?
            .iter()
            .map(|item| Value::Scalar(typed_scalar(&unescape(item))))
            .collect();
        return Ok(Value::Sequence(items));
    }

    Ok(Value::Scalar(typed_scalar(&unescape(raw))))
}

/// Infer the scalar type of a raw value
///
/// Values with a leading zero (other than `0` itself) stay strings so that
/// things like `007` or zip codes are not mangled.
pub fn typed_scalar(raw: &str) -> Scalar {
    if raw.eq_ignore_ascii_case("true") {
        return Scalar::Bool(true);
    }
    if raw.eq_ignore_ascii_case("false") {
        return Scalar::Bool(false);
    }
    if raw.eq_ignore_ascii_case("null") {
        return Scalar::Null;
    }
    if raw == "0" {
        return Scalar::Int(0);
    }
    if !raw.is_empty() && !raw.starts_with('0') {
        if let Ok(i) = raw.parse::<i64>() {
            return Scalar::Int(i);
        }
    }
    Scalar::String(raw.to_string())
}

fn assign(tree: &mut ConfigTree, path: &[Segment], value: Value, raw_key: &str) -> Result<()> {
    let Some((Segment::Key(key), rest)) = path.split_first() else {
        return Err(CoreError::parse(
            SOURCE,
            format!("key {:?} must start with a name", unescape(raw_key)),
        ));
    };

    if rest.is_empty() {
        tree.insert(key.clone(), value);
        return Ok(());
    }

    if !tree.contains_key(key) {
        tree.insert(key.clone(), Value::null());
    }
    match tree.get_key_mut(key) {
        Some(slot) => assign_in_value(slot, rest, value, raw_key),
        None => Ok(()),
    }
}

fn assign_in_value(slot: &mut Value, path: &[Segment], value: Value, raw_key: &str) -> Result<()> {
    let Some((segment, rest)) = path.split_first() else {
        *slot = value;
        return Ok(());
    };

    match segment {
        Segment::Key(_) => {
            if matches!(slot, Value::Scalar(Scalar::Null)) {
                *slot = Value::Mapping(ConfigTree::new());
            }
            match slot {
                Value::Mapping(tree) => assign(tree, path, value, raw_key),
                _ => Err(type_conflict(raw_key, "a mapping")),
            }
        }
        Segment::Index(index) => {
            if matches!(slot, Value::Scalar(Scalar::Null)) {
                *slot = Value::Sequence(Vec::new());
            }
            match slot {
                Value::Sequence(items) => {
                    if items.len() <= *index {
                        items.resize(*index + 1, Value::null());
                    }
                    assign_in_value(&mut items[*index], rest, value, raw_key)
                }
                _ => Err(type_conflict(raw_key, "a list")),
            }
        }
    }
}

fn type_conflict(raw_key: &str, expected: &str) -> CoreError {
    CoreError::parse(
        SOURCE,
        format!(
            "cannot set {:?}: an earlier assignment is not {}",
            unescape(raw_key),
            expected
        ),
    )
}
