//! Engine error types

use miette::{Diagnostic, NamedSource, SourceSpan};
use serde_json::Value as JsonValue;
use thiserror::Error;

use chartwright_core::CoreError;

use crate::suggestions::{
    extract_quoted_name, suggest_undefined_variable, suggest_unknown_filter,
    suggest_unknown_function,
};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Failed to read template {name}: {source}")]
    Read {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// Broad category of a template failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum TemplateErrorKind {
    UndefinedVariable,
    UnknownFilter,
    UnknownFunction,
    SyntaxError,
    TypeError,
    InvalidOperation,
    Other,
}

impl TemplateErrorKind {
    pub fn to_code_string(&self) -> &'static str {
        match self {
            Self::UndefinedVariable => "undefined_variable",
            Self::UnknownFilter => "unknown_filter",
            Self::UnknownFunction => "unknown_function",
            Self::SyntaxError => "syntax",
            Self::TypeError => "type",
            Self::InvalidOperation => "invalid_operation",
            Self::Other => "render",
        }
    }
}

impl From<minijinja::ErrorKind> for TemplateErrorKind {
    fn from(kind: minijinja::ErrorKind) -> Self {
        use minijinja::ErrorKind;

        match kind {
            ErrorKind::UndefinedError => Self::UndefinedVariable,
            ErrorKind::UnknownFilter => Self::UnknownFilter,
            ErrorKind::UnknownFunction => Self::UnknownFunction,
            ErrorKind::SyntaxError => Self::SyntaxError,
            ErrorKind::InvalidOperation => Self::InvalidOperation,
            ErrorKind::NonPrimitive | ErrorKind::NonKey => Self::TypeError,
            _ => Self::Other,
        }
    }
}

/// A template failure pointing into the template source
#[derive(Error, Debug, Diagnostic, Clone)]
#[error("{message}")]
#[diagnostic(code(chartwright::template::render))]
pub struct TemplateError {
    pub message: String,

    pub kind: TemplateErrorKind,

    #[source_code]
    pub src: NamedSource<String>,

    #[label("error occurred here")]
    pub span: Option<SourceSpan>,

    #[help]
    pub suggestion: Option<String>,
}

impl TemplateError {
    /// Convert a MiniJinja error raised while compiling or rendering `template_name`
    ///
    /// `values` is used to suggest existing keys for undefined lookups.
    pub fn from_minijinja(
        err: minijinja::Error,
        template_name: &str,
        template_source: &str,
        values: Option<&JsonValue>,
    ) -> Self {
        let kind = TemplateErrorKind::from(err.kind());
        let detailed = format!("{:#}", err);
        let expression = error_line_expression(&detailed);

        let message = match (kind, &expression) {
            (TemplateErrorKind::UndefinedVariable, Some(expr)) => {
                format!("undefined variable `{}`", expr)
            }
            _ => err
                .to_string()
                .replace("undefined value", "undefined variable"),
        };

        let suggestion = match kind {
            TemplateErrorKind::UndefinedVariable => expression
                .as_deref()
                .and_then(|expr| suggest_undefined_variable(expr, values)),
            TemplateErrorKind::UnknownFilter => {
                extract_quoted_name(&err.to_string()).map(|name| suggest_unknown_filter(&name))
            }
            TemplateErrorKind::UnknownFunction => {
                extract_quoted_name(&err.to_string()).map(|name| suggest_unknown_function(&name))
            }
            TemplateErrorKind::SyntaxError => Some(
                "Check bracket matching: `{{ }}` for expressions, `{% %}` for statements"
                    .to_string(),
            ),
            _ => None,
        };

        Self {
            message,
            kind,
            src: NamedSource::new(template_name, template_source.to_string()),
            span: err.line().and_then(|line| line_span(template_source, line)),
            suggestion,
        }
    }

    pub fn kind(&self) -> TemplateErrorKind {
        self.kind
    }

    /// Name of the template the error points into
    pub fn template_name(&self) -> &str {
        self.src.name()
    }
}

/// Expression on the line MiniJinja marks with `>` in its debug display
///
/// ```text
///    8 >   image: {{ values.imgae.tag }}
///      i            ^^^^^^^^^^^^^^^^^ undefined value
/// ```
fn error_line_expression(display: &str) -> Option<String> {
    let line = display.lines().find(|line| {
        let trimmed = line.trim_start();
        trimmed.contains(" > ") || trimmed.starts_with("> ")
    })?;

    let start = line.find("{{")?;
    let end = line[start..].find("}}")?;
    let expr = line[start + 2..start + end].trim();
    let expr = expr.split('|').next().unwrap_or(expr).trim();

    (!expr.is_empty()).then(|| expr.to_string())
}

/// Span covering line `line_num` (1-based) of `source`
fn line_span(source: &str, line_num: usize) -> Option<SourceSpan> {
    let mut offset = 0;
    for (index, line) in source.lines().enumerate() {
        if index + 1 == line_num {
            return Some(SourceSpan::new(offset.into(), line.len()));
        }
        offset += line.len() + 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_span() {
        let source = "a: 1\nbb: 2\nccc: 3";
        let span = line_span(source, 2).unwrap();
        assert_eq!(span.offset(), 5);
        assert_eq!(span.len(), 5);
        assert!(line_span(source, 9).is_none());
    }

    #[test]
    fn test_error_line_expression() {
        let display = "   1 | a: 1\n   2 >   image: {{ values.imgae.tag | quote }}\n     i            ^^^^^ undefined value";
        assert_eq!(
            error_line_expression(display),
            Some("values.imgae.tag".to_string())
        );
        assert_eq!(error_line_expression("no marker here"), None);
    }

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            TemplateErrorKind::from(minijinja::ErrorKind::UndefinedError),
            TemplateErrorKind::UndefinedVariable
        );
        assert_eq!(TemplateErrorKind::SyntaxError.to_code_string(), "syntax");
    }
}
