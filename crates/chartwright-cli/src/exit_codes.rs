//! Process exit codes
//!
//! Argument errors are reported by clap with code 2 before any of these
//! apply, so none of them reuse it.

/// Template compilation or rendering failed
pub const TEMPLATE_ERROR: i32 = 3;

/// Invalid chart structure or Chart.yaml
pub const CHART_ERROR: i32 = 4;

/// File not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;

/// A rendered document uses an apiVersion outside the recognized set
pub const UNSUPPORTED_VERSION: i32 = 6;

/// A values file, `--set` argument or rendered document could not be parsed
pub const PARSE_ERROR: i32 = 7;
