//! Template rendering context

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::chart::ChartMetadata;
use crate::release::ReleaseInfo;
use crate::values::ConfigTree;
use crate::versions::VersionSet;

/// Context available to all templates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateContext {
    /// Merged values
    pub values: JsonValue,

    pub release: ReleaseInfo,

    pub chart: ChartInfo,

    pub capabilities: Capabilities,

    /// Template currently being rendered
    pub template: TemplateInfo,
}

/// Chart information for templates
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartInfo {
    pub name: String,
    pub version: String,
    pub app_version: Option<String>,
    pub description: Option<String>,
}

impl From<&ChartMetadata> for ChartInfo {
    fn from(meta: &ChartMetadata) -> Self {
        Self {
            name: meta.name.clone(),
            version: meta.version.to_string(),
            app_version: meta.app_version.clone(),
            description: meta.description.clone(),
        }
    }
}

/// Cluster capabilities
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    pub kube_version: KubeVersion,

    /// Available API versions
    pub api_versions: Vec<String>,
}

impl Capabilities {
    pub fn new(versions: &VersionSet) -> Self {
        Self {
            kube_version: KubeVersion::default(),
            api_versions: versions.to_vec(),
        }
    }

    pub fn with_kube_version(mut self, version: &str) -> Self {
        self.kube_version = KubeVersion::new(version);
        self
    }
}

/// Kubernetes version info
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KubeVersion {
    pub version: String,
    pub major: String,
    pub minor: String,
}

impl Default for KubeVersion {
    fn default() -> Self {
        Self::new("1.28.0")
    }
}

impl KubeVersion {
    pub fn new(version: &str) -> Self {
        let version = version.trim_start_matches('v');
        let mut parts = version.split('.');

        Self {
            version: format!("v{}", version),
            major: parts.next().unwrap_or("1").to_string(),
            minor: parts.next().unwrap_or("0").to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateInfo {
    /// Document name of the template
    pub name: String,

    /// `<chart>/templates`
    pub base_path: String,
}

impl TemplateContext {
    pub fn new(values: &ConfigTree, release: ReleaseInfo, chart: &ChartMetadata) -> Self {
        Self {
            values: values.to_json(),
            release,
            chart: ChartInfo::from(chart),
            capabilities: Capabilities::default(),
            template: TemplateInfo::default(),
        }
    }

    /// Set the current template info
    pub fn with_template(mut self, name: &str, base_path: &str) -> Self {
        self.template = TemplateInfo {
            name: name.to_string(),
            base_path: base_path.to_string(),
        };
        self
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Context of a subchart: same release and capabilities, its own chart
    /// and values
    pub fn for_subchart(&self, values: &ConfigTree, chart: &ChartMetadata) -> Self {
        Self {
            values: values.to_json(),
            release: self.release.clone(),
            chart: ChartInfo::from(chart),
            capabilities: self.capabilities.clone(),
            template: TemplateInfo::default(),
        }
    }
}
