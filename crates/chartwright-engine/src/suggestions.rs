//! Fuzzy suggestions for template errors

use serde_json::Value as JsonValue;

/// Maximum edit distance for a candidate to be suggested
const MAX_SUGGESTION_DISTANCE: usize = 3;

/// Filters registered by [`crate::Engine`] plus the common MiniJinja builtins
pub const AVAILABLE_FILTERS: &[&str] = &[
    "toyaml",
    "tojson",
    "b64encode",
    "b64decode",
    "quote",
    "squote",
    "nindent",
    "indent",
    "required",
    "empty",
    "haskey",
    "merge",
    "sha256",
    "trunc",
    "trimprefix",
    "trimsuffix",
    "default",
    "upper",
    "lower",
    "title",
    "replace",
    "trim",
    "join",
    "first",
    "last",
    "length",
    "sort",
    "map",
    "select",
    "reject",
    "dictsort",
    "items",
    "int",
    "float",
    "string",
    "list",
    "bool",
];

/// Functions registered by [`crate::Engine`] plus the MiniJinja globals
pub const AVAILABLE_FUNCTIONS: &[&str] = &[
    "fail",
    "dict",
    "list",
    "get",
    "coalesce",
    "ternary",
    "tostring",
    "toint",
    "printf",
    "range",
    "namespace",
];

/// Top-level names every template can see
pub const CONTEXT_VARIABLES: &[&str] = &["values", "release", "chart", "capabilities", "template"];

/// Up to `max_results` candidates within edit distance, closest first
pub fn find_closest_matches<'a>(input: &str, candidates: &[&'a str], max_results: usize) -> Vec<&'a str> {
    let mut scored: Vec<(usize, &str)> = candidates
        .iter()
        .map(|&candidate| (strsim::levenshtein(input, candidate), candidate))
        .filter(|(distance, _)| *distance > 0 && *distance <= MAX_SUGGESTION_DISTANCE)
        .collect();

    scored.sort_by_key(|(distance, _)| *distance);
    scored.truncate(max_results);
    scored.into_iter().map(|(_, candidate)| candidate).collect()
}

fn did_you_mean(matches: &[&str]) -> Option<String> {
    if matches.is_empty() {
        return None;
    }
    let quoted: Vec<String> = matches.iter().map(|m| format!("`{}`", m)).collect();
    Some(format!("Did you mean {}?", quoted.join(" or ")))
}

/// Suggest a fix for an undefined expression such as `values.imgae.tag`
pub fn suggest_undefined_variable(expression: &str, values: Option<&JsonValue>) -> Option<String> {
    if expression == "value" || expression.starts_with("value.") {
        return Some(format!(
            "Did you mean `{}`? Values are accessed through `values`.",
            expression.replacen("value", "values", 1)
        ));
    }

    if let (Some(path), Some(values)) = (expression.strip_prefix("values."), values) {
        return suggest_values_path(path, values);
    }

    let root = expression.split('.').next().unwrap_or(expression);
    did_you_mean(&find_closest_matches(root, CONTEXT_VARIABLES, 1))
}

/// Walk `path` through `values` and describe the first missing key
fn suggest_values_path(path: &str, values: &JsonValue) -> Option<String> {
    let mut current = values;
    let mut prefix = String::from("values");

    for part in path.split('.') {
        match current.get(part) {
            Some(next) => {
                current = next;
                prefix.push('.');
                prefix.push_str(part);
            }
            None => {
                let object = current.as_object()?;
                let available: Vec<&str> = object.keys().map(String::as_str).collect();
                let matches = find_closest_matches(part, &available, 3);

                return Some(match did_you_mean(&matches) {
                    Some(hint) => format!("Key `{}` not found in `{}`. {}", part, prefix, hint),
                    None => format!(
                        "Key `{}` not found in `{}`. Available keys: {}",
                        part,
                        prefix,
                        available.join(", ")
                    ),
                });
            }
        }
    }

    None
}

pub fn suggest_unknown_filter(name: &str) -> String {
    did_you_mean(&find_closest_matches(name, AVAILABLE_FILTERS, 3)).unwrap_or_else(|| {
        format!(
            "Unknown filter `{}`. Common filters: toyaml, tojson, b64encode, quote, default, nindent",
            name
        )
    })
}

pub fn suggest_unknown_function(name: &str) -> String {
    did_you_mean(&find_closest_matches(name, AVAILABLE_FUNCTIONS, 3)).unwrap_or_else(|| {
        format!(
            "Unknown function `{}`. Available functions: {}",
            name,
            AVAILABLE_FUNCTIONS.join(", ")
        )
    })
}

/// First quoted name in an error message
pub fn extract_quoted_name(msg: &str) -> Option<String> {
    for quote in ['`', '\'', '"'] {
        if let Some(start) = msg.find(quote) {
            let rest = &msg[start + 1..];
            if let Some(end) = rest.find(quote) {
                return Some(rest[..end].to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_find_closest_matches() {
        assert_eq!(find_closest_matches("toyml", AVAILABLE_FILTERS, 3)[0], "toyaml");
        assert!(find_closest_matches("toyaml", AVAILABLE_FILTERS, 3).is_empty());
    }

    #[test]
    fn test_value_typo() {
        let hint = suggest_undefined_variable("value.replicas", None).unwrap();
        assert!(hint.contains("`values.replicas`"));
    }

    #[test]
    fn test_missing_values_key() {
        let values = json!({"image": {"repository": "nginx", "tag": "1.25"}});
        let hint = suggest_undefined_variable("values.image.tga", Some(&values)).unwrap();

        assert!(hint.contains("`tga`"));
        assert!(hint.contains("`values.image`"));
        assert!(hint.contains("`tag`"));
    }

    #[test]
    fn test_context_variable_typo() {
        let hint = suggest_undefined_variable("relase.name", None).unwrap();
        assert!(hint.contains("`release`"));
    }

    #[test]
    fn test_unknown_filter() {
        assert!(suggest_unknown_filter("b64encod").contains("`b64encode`"));
        assert!(suggest_unknown_filter("zzzzzzzz").contains("Common filters"));
    }

    #[test]
    fn test_extract_quoted_name() {
        assert_eq!(extract_quoted_name("unknown filter `foo`"), Some("foo".to_string()));
        assert_eq!(extract_quoted_name("no quotes"), None);
    }
}
