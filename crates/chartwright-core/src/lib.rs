//! Chartwright Core - values merging, manifest classification and ordering
//!
//! This crate holds everything between "templates rendered" and "manifests
//! printed":
//! - [`ConfigTree`]: configuration values with deep merge and `--set` parsing
//! - [`Classifier`]: splits rendered documents into hooks and generic manifests
//! - [`sort_by_kind`]: orders generic manifests for installation
//! - [`LoadedChart`] and [`TemplateContext`]: inputs to the template engine

pub mod chart;
pub mod classify;
pub mod context;
pub mod error;
pub mod head;
pub mod hooks;
pub mod kind_sort;
pub mod release;
pub mod strvals;
pub mod values;
pub mod versions;

pub use chart::{
    ChartMetadata, Dependency, EngineConfig, LoadedChart, MAX_SUBCHART_DEPTH, Maintainer,
    NOTES_FILE, SUBCHARTS_DIR,
};
pub use classify::{Classified, Classifier, Manifest, base_name, is_partial};
pub use context::{Capabilities, ChartInfo, KubeVersion, TemplateContext};
pub use error::{CoreError, Result};
pub use head::ManifestHead;
pub use hooks::{HOOK_ANNOTATION, Hook, HookEvent, HookEventTable};
pub use kind_sort::{INSTALL_ORDER, SortOrder, sort_by_kind};
pub use release::{DEFAULT_NAMESPACE, DEFAULT_RELEASE_NAME, ReleaseInfo};
pub use strvals::{parse_set, parse_set_values};
pub use values::{ConfigTree, GLOBAL_KEY, Scalar, Value, merge, merge_sequence};
pub use versions::{DEFAULT_API_VERSIONS, VersionSet};
