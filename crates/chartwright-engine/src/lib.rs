//! Chartwright Engine - Jinja2 templating for charts
//!
//! A MiniJinja environment with Helm-flavoured filters and functions, and
//! [`TemplateError`] diagnostics that point into the failing template.

pub mod engine;
pub mod error;
pub mod filters;
pub mod functions;
pub mod suggestions;

pub use engine::{Engine, EngineBuilder, RenderResult};
pub use error::{EngineError, Result, TemplateError, TemplateErrorKind};
pub use suggestions::{AVAILABLE_FILTERS, AVAILABLE_FUNCTIONS};
