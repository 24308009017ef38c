//! CLI error type with exit code mapping

use miette::Diagnostic;
use thiserror::Error;

use chartwright_core::CoreError;
use chartwright_engine::{EngineError, TemplateError};

use crate::exit_codes;

#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Template(TemplateError),

    #[error("Failed to parse {source_name}: {message}")]
    #[diagnostic(code(chartwright::cli::parse))]
    Parse {
        source_name: String,
        message: String,
    },

    #[error("apiVersion {version:?} in {document} is not available")]
    #[diagnostic(
        code(chartwright::cli::unsupported_version),
        help("add it with --api-versions {version} if the cluster serves it")
    )]
    UnsupportedVersion { document: String, version: String },

    #[error("Chart error: {message}")]
    #[diagnostic(code(chartwright::cli::chart))]
    Chart {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("IO error: {message}")]
    #[diagnostic(code(chartwright::cli::io))]
    Io { message: String },
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Template(_) => exit_codes::TEMPLATE_ERROR,
            CliError::Parse { .. } => exit_codes::PARSE_ERROR,
            CliError::UnsupportedVersion { .. } => exit_codes::UNSUPPORTED_VERSION,
            CliError::Chart { .. } => exit_codes::CHART_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
        }
    }

    pub fn chart(message: impl Into<String>) -> Self {
        Self::Chart {
            message: message.into(),
            help: None,
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Parse {
                source_name,
                message,
            } => CliError::Parse {
                source_name,
                message,
            },
            CoreError::UnsupportedVersion { document, version } => {
                CliError::UnsupportedVersion { document, version }
            }
            CoreError::ChartNotFound { path } => CliError::Chart {
                message: format!("chart not found: {}", path),
                help: Some("pass the path of a directory containing Chart.yaml".to_string()),
            },
            CoreError::InvalidChart { message } => CliError::chart(message),
            err @ (CoreError::SourceRead { .. } | CoreError::Io(_)) => CliError::Io {
                message: err.to_string(),
            },
        }
    }
}

impl From<EngineError> for CliError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Template(e) => CliError::Template(e),
            EngineError::Core(e) => e.into(),
            err @ EngineError::Read { .. } => CliError::Io {
                message: err.to_string(),
            },
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CliError>;
