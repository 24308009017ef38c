//! Template command - render a chart into ordered manifests

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use chartwright_core::{
    Capabilities, Classifier, ConfigTree, HookEventTable, LoadedChart, NOTES_FILE, ReleaseInfo,
    SortOrder, TemplateContext, VersionSet, base_name, merge_sequence, parse_set_values,
};
use chartwright_engine::Engine;

use crate::display::{Output, pluralize};
use crate::error::{CliError, Result};

/// Options of `chartwright template`
#[derive(Debug, Default)]
pub struct TemplateOptions {
    pub chart: PathBuf,
    pub name: String,
    pub namespace: String,
    pub values_files: Vec<PathBuf>,
    pub set: Vec<String>,
    pub api_versions: Vec<String>,
    pub kube_version: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub show_only: Option<String>,
    pub notes: bool,
    pub hooks: bool,
    pub verbose: bool,
}

impl TemplateOptions {
    fn shown(&self, name: &str) -> bool {
        self.show_only
            .as_deref()
            .is_none_or(|filter| name.contains(filter))
    }
}

pub fn run(opts: &TemplateOptions) -> Result<()> {
    let chart = LoadedChart::load(&opts.chart)?;
    let values = merged_values(&chart, &opts.values_files, &opts.set)?;

    let mut versions = VersionSet::default();
    versions.extend(opts.api_versions.iter().cloned());

    let mut capabilities = Capabilities::new(&versions);
    if let Some(kube_version) = &opts.kube_version {
        capabilities = capabilities.with_kube_version(kube_version);
    }

    let release = ReleaseInfo::for_install(&opts.name, &opts.namespace);
    let context =
        TemplateContext::new(&values, release, &chart.metadata).with_capabilities(capabilities);

    let mut rendered = Engine::for_chart(&chart).render_chart(&chart, &context)?;
    let notes_name = format!("{}/{}", chart.base_path(), NOTES_FILE);
    let notes = rendered.take(&notes_name);
    rendered.documents.retain(|name, _| {
        let subchart_notes = base_name(name) == NOTES_FILE;
        if subchart_notes {
            debug!(document = %name, "dropping subchart notes");
        }
        !subchart_notes
    });

    let classifier = Classifier::new(versions, HookEventTable::default());
    let classified = classifier.sort_manifests(rendered.documents, &SortOrder::install())?;
    info!(
        manifests = %pluralize(classified.generic.len(), "manifest", "manifests"),
        hooks = %pluralize(classified.hooks.len(), "hook", "hooks"),
        "rendered chart {}",
        chart.name()
    );

    let mut out = Output::new();
    if opts.verbose {
        out.values(&values.to_yaml()?);
    }

    match &opts.output_dir {
        Some(dir) => {
            let mut files: Vec<(&str, &str)> = classified
                .generic
                .iter()
                .map(|m| (m.name.as_str(), m.content.as_str()))
                .collect();
            if opts.hooks {
                files.extend(
                    classified
                        .hooks
                        .iter()
                        .map(|h| (h.path.as_str(), h.manifest.as_str())),
                );
            }
            if opts.notes {
                if let Some(text) = &notes {
                    files.push((notes_name.as_str(), text.as_str()));
                }
            }

            for (name, content) in files.into_iter().filter(|(name, _)| opts.shown(name)) {
                let path = write_document(dir, name, content)?;
                out.wrote(&path);
            }
        }
        None => {
            for manifest in classified.generic.iter().filter(|m| opts.shown(&m.name)) {
                out.manifest(manifest);
            }
            if opts.hooks {
                for hook in classified.hooks.iter().filter(|h| opts.shown(&h.path)) {
                    out.hook(hook);
                }
            }
            if opts.notes {
                if let Some(text) = notes.as_deref().filter(|_| opts.shown(&notes_name)) {
                    out.document(&notes_name, text);
                }
            }
        }
    }

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(out.as_str().as_bytes())?;
    stdout.flush()?;
    Ok(())
}

/// Chart defaults, then each values file in order, then `--set` last
fn merged_values(chart: &LoadedChart, files: &[PathBuf], set: &[String]) -> Result<ConfigTree> {
    let base = chart.default_values()?;

    let mut overrides = Vec::with_capacity(files.len() + 1);
    for file in files {
        debug!(file = %file.display(), "loading values file");
        overrides.push(ConfigTree::from_file(file)?);
    }
    if !set.is_empty() {
        debug!(count = set.len(), "applying --set values");
        overrides.push(parse_set_values(set)?);
    }

    Ok(merge_sequence(base, overrides))
}

fn write_document(dir: &Path, name: &str, content: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| CliError::Io {
            message: format!("Failed to create {}: {}", parent.display(), e),
        })?;
    }
    fs::write(&path, content).map_err(|e| CliError::Io {
        message: format!("Failed to write {}: {}", path.display(), e),
    })?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn chart_dir(values: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Chart.yaml"), "name: web\nversion: 0.1.0\n").unwrap();
        fs::write(dir.path().join("values.yaml"), values).unwrap();
        dir
    }

    #[test]
    fn test_merged_values_precedence() {
        let dir = chart_dir("image:\n  repository: nginx\n  tag: stable\nreplicas: 1\n");
        let override_file = dir.path().join("prod.yaml");
        fs::write(&override_file, "image:\n  tag: \"1.25\"\nreplicas: 3\n").unwrap();

        let chart = LoadedChart::load(dir.path()).unwrap();
        let values =
            merged_values(&chart, &[override_file], &["replicas=5".to_string()]).unwrap();

        assert_eq!(values.get("image.repository").and_then(|v| v.as_str()), Some("nginx"));
        assert_eq!(values.get("image.tag").and_then(|v| v.as_str()), Some("1.25"));
        assert_eq!(values.get("replicas"), Some(&chartwright_core::Value::from(5i64)));
    }

    #[test]
    fn test_merged_values_missing_file() {
        let dir = chart_dir("");
        let chart = LoadedChart::load(dir.path()).unwrap();
        let err = merged_values(&chart, &[dir.path().join("missing.yaml")], &[]).unwrap_err();

        assert!(matches!(err, CliError::Io { .. }));
    }

    #[test]
    fn test_shown_filter() {
        let opts = TemplateOptions {
            show_only: Some("svc".into()),
            ..Default::default()
        };
        assert!(opts.shown("web/templates/svc.yaml"));
        assert!(!opts.shown("web/templates/deploy.yaml"));
        assert!(TemplateOptions::default().shown("anything"));
    }
}
