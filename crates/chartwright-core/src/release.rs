//! Release information exposed to templates

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Release name used when none is given
pub const DEFAULT_RELEASE_NAME: &str = "RELEASE-NAME";

/// Namespace used when none is given
pub const DEFAULT_NAMESPACE: &str = "NAMESPACE";

/// Release information for templates
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseInfo {
    /// Release name
    pub name: String,

    /// Target namespace
    pub namespace: String,

    /// Render time
    pub time: DateTime<Utc>,

    /// Revision number
    pub revision: u32,

    /// Is this an install operation?
    pub is_install: bool,

    /// Is this an upgrade operation?
    pub is_upgrade: bool,

    /// Service (always "Chartwright")
    pub service: String,
}

impl ReleaseInfo {
    /// Create release info for a first install, timestamped now
    pub fn for_install(name: &str, namespace: &str) -> Self {
        Self {
            name: name.to_string(),
            namespace: namespace.to_string(),
            time: Utc::now(),
            revision: 1,
            is_install: true,
            is_upgrade: false,
            service: "Chartwright".to_string(),
        }
    }
}

impl Default for ReleaseInfo {
    fn default() -> Self {
        Self::for_install(DEFAULT_RELEASE_NAME, DEFAULT_NAMESPACE)
    }
}
