//! Chart definition and loading

use semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{CoreError, Result};
use crate::values::{ConfigTree, Scalar, Value};

/// File holding the chart metadata
pub const CHART_FILE: &str = "Chart.yaml";

/// File holding the chart's base configuration
pub const VALUES_FILE: &str = "values.yaml";

/// Template whose output is printed as release notes
pub const NOTES_FILE: &str = "NOTES.txt";

/// Directory holding unpacked subcharts
pub const SUBCHARTS_DIR: &str = "charts";

/// Deepest allowed nesting of subcharts
pub const MAX_SUBCHART_DEPTH: usize = 10;

/// Contents of `Chart.yaml`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMetadata {
    /// Chart name (required)
    pub name: String,

    /// Chart version (required, SemVer)
    #[serde(with = "version_serde")]
    pub version: Version,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub app_version: Option<String>,

    /// Kubernetes version constraint
    #[serde(default)]
    pub kube_version: Option<String>,

    #[serde(default)]
    pub home: Option<String>,

    #[serde(default)]
    pub icon: Option<String>,

    #[serde(default)]
    pub sources: Vec<String>,

    #[serde(default)]
    pub keywords: Vec<String>,

    #[serde(default)]
    pub maintainers: Vec<Maintainer>,

    #[serde(default)]
    pub annotations: BTreeMap<String, String>,

    /// Charts expected under `charts/`
    #[serde(default)]
    pub dependencies: Vec<Dependency>,

    /// Template engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Maintainer {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// A `dependencies` entry of `Chart.yaml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dependency {
    /// Name of the chart in `charts/`
    pub name: String,

    #[serde(default)]
    pub version: Option<String>,

    #[serde(default)]
    pub repository: Option<String>,

    /// Comma-separated value paths; the first one holding a boolean decides
    #[serde(default)]
    pub condition: Option<String>,

    /// Names looked up under the top-level `tags` mapping
    #[serde(default)]
    pub tags: Vec<String>,

    /// Name the subchart is rendered and scoped under
    #[serde(default)]
    pub alias: Option<String>,
}

impl Dependency {
    pub fn effective_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    /// Whether the dependency is rendered with the parent's `values`
    ///
    /// A condition path holding a boolean wins. Otherwise, tags set to a
    /// boolean enable the dependency when any of them is true. With neither,
    /// the dependency is enabled.
    pub fn is_enabled(&self, values: &ConfigTree) -> bool {
        if let Some(enabled) = self.condition_value(values) {
            return enabled;
        }

        let tags = values.get_key("tags").and_then(Value::as_tree);
        let mut tag_values = self
            .tags
            .iter()
            .filter_map(|tag| match tags.and_then(|t| t.get_key(tag)) {
                Some(Value::Scalar(Scalar::Bool(b))) => Some(*b),
                _ => None,
            })
            .peekable();

        tag_values.peek().is_none() || tag_values.any(|b| b)
    }

    fn condition_value(&self, values: &ConfigTree) -> Option<bool> {
        let condition = self.condition.as_deref()?;
        for path in condition.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            match values.get(path) {
                Some(Value::Scalar(Scalar::Bool(b))) => return Some(*b),
                Some(_) => {
                    warn!(dependency = %self.name, path, "condition is not a boolean, ignoring")
                }
                None => {}
            }
        }
        None
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Fail on undefined variables
    #[serde(default = "default_true")]
    pub strict: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { strict: true }
    }
}

fn default_true() -> bool {
    true
}

/// A chart loaded from disk, subcharts included
#[derive(Debug, Clone)]
pub struct LoadedChart {
    pub metadata: ChartMetadata,

    /// Root directory of the chart
    pub root: PathBuf,

    pub templates_dir: PathBuf,

    pub values_path: PathBuf,

    /// Prefix of document names: `<chart>` or `<parent>/charts/<subchart>`
    pub document_prefix: String,

    /// The parent's `dependencies` entry this chart was loaded for
    pub dependency: Option<Dependency>,

    /// Charts unpacked under `charts/`, sorted by directory then alias
    pub subcharts: Vec<LoadedChart>,
}

impl LoadedChart {
    /// Load a chart and its subcharts from a directory
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let root = path.as_ref().to_path_buf();

        if !root.is_dir() {
            return Err(CoreError::ChartNotFound {
                path: root.display().to_string(),
            });
        }

        let metadata = read_metadata(&root)?;
        let prefix = metadata.name.clone();
        Self::assemble(root, metadata, prefix, None, 0)
    }

    fn assemble(
        root: PathBuf,
        metadata: ChartMetadata,
        document_prefix: String,
        dependency: Option<Dependency>,
        depth: usize,
    ) -> Result<Self> {
        if depth > MAX_SUBCHART_DEPTH {
            return Err(CoreError::InvalidChart {
                message: format!(
                    "subcharts nested deeper than {} levels at {}",
                    MAX_SUBCHART_DEPTH,
                    root.display()
                ),
            });
        }

        debug!(chart = %metadata.name, version = %metadata.version, depth, "loaded chart");

        let mut chart = Self {
            metadata,
            templates_dir: root.join("templates"),
            values_path: root.join(VALUES_FILE),
            root,
            document_prefix,
            dependency,
            subcharts: Vec::new(),
        };
        chart.subcharts = chart.load_subcharts(depth)?;
        Ok(chart)
    }

    /// Every directory under `charts/` becomes a subchart, once per
    /// `dependencies` entry naming it (aliases give several copies)
    fn load_subcharts(&self, depth: usize) -> Result<Vec<LoadedChart>> {
        let dir = self.root.join(SUBCHARTS_DIR);
        let mut subcharts = Vec::new();

        if dir.is_dir() {
            let mut paths = Vec::new();
            let entries = std::fs::read_dir(&dir).map_err(|source| CoreError::SourceRead {
                path: dir.clone(),
                source,
            })?;
            for entry in entries {
                let path = entry
                    .map_err(|source| CoreError::SourceRead {
                        path: dir.clone(),
                        source,
                    })?
                    .path();
                if path.is_dir() {
                    paths.push(path);
                } else if is_archive(&path) {
                    warn!(
                        chart = %self.metadata.name,
                        archive = %path.display(),
                        "packaged subcharts are not supported, unpack them under charts/"
                    );
                }
            }
            paths.sort();

            for path in paths {
                let metadata = read_metadata(&path)?;
                let declared: Vec<&Dependency> = self
                    .metadata
                    .dependencies
                    .iter()
                    .filter(|dep| dep.name == metadata.name)
                    .collect();

                if declared.is_empty() {
                    let prefix = self.subchart_prefix(&metadata.name);
                    subcharts.push(Self::assemble(path, metadata, prefix, None, depth + 1)?);
                    continue;
                }

                for dep in declared {
                    let mut metadata = metadata.clone();
                    metadata.name = dep.effective_name().to_string();
                    let prefix = self.subchart_prefix(&metadata.name);
                    subcharts.push(Self::assemble(
                        path.clone(),
                        metadata,
                        prefix,
                        Some(dep.clone()),
                        depth + 1,
                    )?);
                }
            }
        }

        for dep in &self.metadata.dependencies {
            let found = subcharts
                .iter()
                .any(|sub| sub.dependency.as_ref() == Some(dep));
            if !found {
                return Err(CoreError::InvalidChart {
                    message: format!(
                        "dependency {:?} of {} is missing from {}/",
                        dep.name, self.metadata.name, SUBCHARTS_DIR
                    ),
                });
            }
        }

        Ok(subcharts)
    }

    fn subchart_prefix(&self, name: &str) -> String {
        format!("{}/{}/{}", self.document_prefix, SUBCHARTS_DIR, name)
    }

    /// Subcharts to render with this chart's `values`
    pub fn enabled_subcharts<'a>(
        &'a self,
        values: &'a ConfigTree,
    ) -> impl Iterator<Item = &'a LoadedChart> + 'a {
        self.subcharts.iter().filter(move |sub| {
            let enabled = sub
                .dependency
                .as_ref()
                .is_none_or(|dep| dep.is_enabled(values));
            if !enabled {
                debug!(subchart = %sub.name(), "subchart disabled by condition or tags");
            }
            enabled
        })
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// The chart's own `values.yaml`, or an empty tree when it has none
    pub fn default_values(&self) -> Result<ConfigTree> {
        if self.values_path.exists() {
            ConfigTree::from_file(&self.values_path)
        } else {
            Ok(ConfigTree::new())
        }
    }

    /// Template files under `templates/`, sorted by path
    pub fn template_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        if !self.templates_dir.exists() {
            return Ok(files);
        }

        for entry in walkdir::WalkDir::new(&self.templates_dir).follow_links(true) {
            let entry = entry.map_err(|e| CoreError::Io(e.into()))?;
            let path = entry.path();
            if path.is_file() {
                if let Some(ext) = path.extension() {
                    let ext = ext.to_string_lossy().to_lowercase();
                    if matches!(
                        ext.as_str(),
                        "yaml" | "yml" | "tpl" | "j2" | "jinja2" | "txt" | "json"
                    ) {
                        files.push(path.to_path_buf());
                    }
                }
            }
        }

        files.sort();
        Ok(files)
    }

    /// Document name of a template file: `<prefix>/templates/<relative path>`
    ///
    /// A trailing `.j2` or `.jinja2` is dropped so `deployment.yaml.j2`
    /// becomes `deployment.yaml`.
    pub fn document_name(&self, file: &Path) -> String {
        let relative = file.strip_prefix(&self.templates_dir).unwrap_or(file);
        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let relative = relative
            .strip_suffix(".j2")
            .or_else(|| relative.strip_suffix(".jinja2"))
            .unwrap_or(&relative);

        format!("{}/templates/{}", self.document_prefix, relative)
    }

    /// `<prefix>/templates`
    pub fn base_path(&self) -> String {
        format!("{}/templates", self.document_prefix)
    }
}

fn read_metadata(root: &Path) -> Result<ChartMetadata> {
    let chart_file = root.join(CHART_FILE);
    if !chart_file.exists() {
        return Err(CoreError::InvalidChart {
            message: format!("{} not found in {}", CHART_FILE, root.display()),
        });
    }

    let content = std::fs::read_to_string(&chart_file).map_err(|source| CoreError::SourceRead {
        path: chart_file.clone(),
        source,
    })?;
    let metadata: ChartMetadata = serde_yaml::from_str(&content).map_err(|e| {
        CoreError::InvalidChart {
            message: format!("{}: {}", chart_file.display(), e),
        }
    })?;

    if metadata.name.trim().is_empty() {
        return Err(CoreError::InvalidChart {
            message: format!("name must not be empty in {}", chart_file.display()),
        });
    }
    if metadata.name.contains('/') {
        return Err(CoreError::InvalidChart {
            message: format!("name {:?} must not contain '/'", metadata.name),
        });
    }

    Ok(metadata)
}

fn is_archive(path: &Path) -> bool {
    let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
    name.ends_with(".tgz") || name.ends_with(".tar.gz")
}

mod version_serde {
    use semver::Version;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(version: &Version, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&version.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Version, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Version::parse(&s).map_err(serde::de::Error::custom)
    }
}
