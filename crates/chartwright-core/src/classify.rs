//! Classification of rendered documents into hooks and generic manifests
//!
//! A document is a hook when its `metadata.annotations` carry
//! [`HOOK_ANNOTATION`] with at least one recognized event:
//!
//! ```yaml
//! apiVersion: batch/v1
//! kind: Job
//! metadata:
//!   name: migrate
//!   annotations:
//!     helm.sh/hook: pre-install,pre-upgrade
//! ```
//!
//! Everything else that parses is a generic manifest.

use tracing::debug;

use crate::error::{CoreError, Result};
use crate::head::ManifestHead;
use crate::hooks::{HOOK_ANNOTATION, Hook, HookEventTable};
use crate::kind_sort::{SortOrder, sort_by_kind};
use crate::versions::VersionSet;

/// A rendered document that is not a hook
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    /// Source document name
    pub name: String,
    pub content: String,
    pub head: ManifestHead,
}

/// Output of [`Classifier::classify`]
#[derive(Debug, Default)]
pub struct Classified {
    /// Hook documents, in no particular order
    pub hooks: Vec<Hook>,
    /// Generic documents, in input order
    pub generic: Vec<Manifest>,
}

/// What a single document turned into
#[derive(Debug)]
enum Outcome {
    Skipped,
    Dropped,
    Hook(Hook),
    Generic(Manifest),
}

/// Splits rendered documents into hooks and generic manifests
#[derive(Debug, Clone)]
pub struct Classifier {
    versions: VersionSet,
    events: HookEventTable,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(VersionSet::default(), HookEventTable::default())
    }
}

impl Classifier {
    pub fn new(versions: VersionSet, events: HookEventTable) -> Self {
        Self { versions, events }
    }

    pub fn versions(&self) -> &VersionSet {
        &self.versions
    }

    /// Classify documents given as `(name, content)` pairs
    ///
    /// The first parse or version error aborts the whole classification.
    pub fn classify<I>(&self, documents: I) -> Result<Classified>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut classified = Classified::default();

        for (name, content) in documents {
            match self.classify_one(name, content)? {
                Outcome::Hook(hook) => classified.hooks.push(hook),
                Outcome::Generic(manifest) => classified.generic.push(manifest),
                Outcome::Skipped | Outcome::Dropped => {}
            }
        }

        Ok(classified)
    }

    /// Classify, then sort the generic manifests by kind
    pub fn sort_manifests<I>(&self, documents: I, order: &SortOrder) -> Result<Classified>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let Classified { hooks, generic } = self.classify(documents)?;
        Ok(Classified {
            hooks,
            generic: sort_by_kind(generic, order),
        })
    }

    fn classify_one(&self, name: String, content: String) -> Result<Outcome> {
        if is_partial(&name) {
            debug!(document = %name, "skipping partial");
            return Ok(Outcome::Skipped);
        }
        if content.trim().is_empty() {
            debug!(document = %name, "skipping empty document");
            return Ok(Outcome::Skipped);
        }

        let head = ManifestHead::parse(&name, &content)?;

        if !head.api_version.is_empty() && !self.versions.has(&head.api_version) {
            return Err(CoreError::UnsupportedVersion {
                document: name,
                version: head.api_version,
            });
        }

        let hook_value = head
            .annotations()
            .filter(|annotations| !annotations.is_empty())
            .and_then(|annotations| annotations.get(HOOK_ANNOTATION));

        let Some(hook_value) = hook_value else {
            return Ok(Outcome::Generic(Manifest {
                name,
                content,
                head,
            }));
        };

        let events = self.events.parse_annotation(hook_value);
        if events.is_empty() {
            // Not a generic manifest either: the document is dropped entirely.
            debug!(
                document = %name,
                annotation = %hook_value,
                "hook annotation names no known event, dropping document"
            );
            return Ok(Outcome::Dropped);
        }

        Ok(Outcome::Hook(Hook {
            name: head.name().to_string(),
            kind: head.kind.clone(),
            path: name,
            manifest: content,
            events,
        }))
    }
}

/// Partials (`_helpers.tpl` and friends) are never standalone resources
pub fn is_partial(name: &str) -> bool {
    base_name(name).starts_with('_')
}

/// Final path segment of a document name
pub fn base_name(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::HookEvent;
    use std::collections::BTreeMap;

    fn docs(entries: &[(&str, &str)]) -> Vec<(String, String)> {
        entries
            .iter()
            .map(|(n, c)| (n.to_string(), c.to_string()))
            .collect()
    }

    fn hook_doc(kind: &str, name: &str, hook: &str) -> String {
        format!(
            "apiVersion: v1\nkind: {kind}\nmetadata:\n  name: {name}\n  annotations:\n    helm.sh/hook: \"{hook}\"\n"
        )
    }

    #[test]
    fn test_partials_and_empty_documents_are_skipped() {
        let classified = Classifier::default()
            .classify(docs(&[
                ("chart/templates/_helpers.tpl", "kind: Secret\napiVersion: v1\n"),
                ("chart/templates/blank.yaml", "  \n\t\n"),
                ("chart/templates/cm.yaml", "apiVersion: v1\nkind: ConfigMap\n"),
            ]))
            .unwrap();

        assert!(classified.hooks.is_empty());
        assert_eq!(classified.generic.len(), 1);
        assert_eq!(classified.generic[0].name, "chart/templates/cm.yaml");
    }

    #[test]
    fn test_partial_check_uses_base_name_only() {
        assert!(is_partial("templates/_helpers.tpl"));
        assert!(is_partial("_top.yaml"));
        assert!(!is_partial("_dir/templates/svc.yaml"));
        assert!(!is_partial("templates/svc_.yaml"));
    }

    #[test]
    fn test_multi_event_hook() {
        let content = hook_doc("Job", "setup", "pre-install,post-install");
        let classified = Classifier::default()
            .classify(vec![("chart/templates/job.yaml".to_string(), content.clone())])
            .unwrap();

        assert!(classified.generic.is_empty());
        assert_eq!(classified.hooks.len(), 1);

        let hook = &classified.hooks[0];
        assert_eq!(hook.name, "setup");
        assert_eq!(hook.kind, "Job");
        assert_eq!(hook.path, "chart/templates/job.yaml");
        assert_eq!(hook.manifest, content);
        assert_eq!(hook.events, vec![HookEvent::PreInstall, HookEvent::PostInstall]);
    }

    #[test]
    fn test_unrecognized_hook_is_dropped() {
        let classified = Classifier::default()
            .classify(vec![(
                "chart/templates/job.yaml".to_string(),
                hook_doc("Job", "x", "bogus"),
            )])
            .unwrap();

        assert!(classified.hooks.is_empty());
        assert!(classified.generic.is_empty());
    }

    #[test]
    fn test_partially_recognized_hook_keeps_known_events() {
        let classified = Classifier::default()
            .classify(vec![(
                "t/job.yaml".to_string(),
                hook_doc("Job", "x", "bogus, Post-Delete"),
            )])
            .unwrap();

        assert_eq!(classified.hooks[0].events, vec![HookEvent::PostDelete]);
    }

    #[test]
    fn test_annotations_without_hook_are_generic() {
        let content = "apiVersion: v1\nkind: Service\nmetadata:\n  name: web\n  annotations:\n    other: value\n";
        let classified = Classifier::default()
            .classify(docs(&[("t/svc.yaml", content)]))
            .unwrap();

        assert!(classified.hooks.is_empty());
        assert_eq!(classified.generic[0].head.kind, "Service");
    }

    #[test]
    fn test_empty_annotations_are_generic() {
        let content = "apiVersion: v1\nkind: Service\nmetadata:\n  name: web\n  annotations: {}\n";
        let classified = Classifier::default()
            .classify(docs(&[("t/svc.yaml", content)]))
            .unwrap();

        assert_eq!(classified.generic.len(), 1);
    }

    #[test]
    fn test_parse_error_aborts() {
        let err = Classifier::default()
            .classify(docs(&[
                ("t/good.yaml", "apiVersion: v1\nkind: Pod\n"),
                ("t/bad.yaml", "kind: [unclosed"),
            ]))
            .unwrap_err();

        match err {
            CoreError::Parse { source_name, .. } => assert_eq!(source_name, "t/bad.yaml"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unsupported_version() {
        let err = Classifier::default()
            .classify(docs(&[("t/cr.yaml", "apiVersion: example.com/v1\nkind: Widget\n")]))
            .unwrap_err();

        match err {
            CoreError::UnsupportedVersion { document, version } => {
                assert_eq!(document, "t/cr.yaml");
                assert_eq!(version, "example.com/v1");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_version_is_accepted() {
        let classified = Classifier::default()
            .classify(docs(&[("t/x.yaml", "kind: Widget\n")]))
            .unwrap();

        assert_eq!(classified.generic.len(), 1);
    }

    #[test]
    fn test_null_version_is_accepted() {
        let classified = Classifier::default()
            .classify(docs(&[
                ("c/templates/a.yaml", "apiVersion: null\nkind: ConfigMap\n"),
                ("c/templates/b.yaml", "apiVersion: ~\nkind: null\n"),
            ]))
            .unwrap();

        assert_eq!(classified.generic.len(), 2);
        assert_eq!(classified.generic[0].head.api_version, "");
        assert_eq!(classified.generic[0].head.kind, "ConfigMap");
        assert_eq!(classified.generic[1].head.kind, "");
    }

    #[test]
    fn test_custom_version_set() {
        let classifier = Classifier::new(
            VersionSet::new(["example.com/v1"]),
            HookEventTable::default(),
        );

        assert!(classifier
            .classify(docs(&[("t/cr.yaml", "apiVersion: example.com/v1\nkind: Widget\n")]))
            .is_ok());
        assert!(classifier
            .classify(docs(&[("t/cm.yaml", "apiVersion: v1\nkind: ConfigMap\n")]))
            .is_err());
    }

    #[test]
    fn test_generic_preserves_input_order() {
        let classified = Classifier::default()
            .classify(docs(&[
                ("t/b.yaml", "apiVersion: v1\nkind: Service\n"),
                ("t/a.yaml", "apiVersion: v1\nkind: Secret\n"),
            ]))
            .unwrap();

        let names: Vec<_> = classified.generic.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["t/b.yaml", "t/a.yaml"]);
    }

    #[test]
    fn test_sort_manifests_round_trip() {
        let mut documents = BTreeMap::new();
        documents.insert("c/templates/_helpers.tpl".to_string(), "{{/* */}}".to_string());
        documents.insert("c/templates/deploy.yaml".to_string(), "apiVersion: apps/v1\nkind: Deployment\n".to_string());
        documents.insert("c/templates/empty.yaml".to_string(), "\n".to_string());
        documents.insert("c/templates/hook.yaml".to_string(), hook_doc("Job", "j", "post-install"));
        documents.insert("c/templates/secret.yaml".to_string(), "apiVersion: v1\nkind: Secret\n".to_string());
        documents.insert("c/templates/widget.yaml".to_string(), "kind: Widget\n".to_string());

        let classified = Classifier::default()
            .sort_manifests(documents, &SortOrder::install())
            .unwrap();

        let names: Vec<_> = classified.generic.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "c/templates/secret.yaml",
                "c/templates/deploy.yaml",
                "c/templates/widget.yaml"
            ]
        );
        assert_eq!(classified.hooks.len(), 1);
        assert_eq!(classified.hooks[0].path, "c/templates/hook.yaml");
    }
}
