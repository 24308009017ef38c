//! Lifecycle hooks declared through the `helm.sh/hook` annotation

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Annotation carrying a comma-separated list of hook names
pub const HOOK_ANNOTATION: &str = "helm.sh/hook";

/// Lifecycle event a hook runs at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HookEvent {
    PreInstall,
    PostInstall,
    PreDelete,
    PostDelete,
    PreUpgrade,
    PostUpgrade,
    PreRollback,
    PostRollback,
    ReleaseTestSuccess,
    ReleaseTestFailure,
}

impl HookEvent {
    pub const ALL: [HookEvent; 10] = [
        HookEvent::PreInstall,
        HookEvent::PostInstall,
        HookEvent::PreDelete,
        HookEvent::PostDelete,
        HookEvent::PreUpgrade,
        HookEvent::PostUpgrade,
        HookEvent::PreRollback,
        HookEvent::PostRollback,
        HookEvent::ReleaseTestSuccess,
        HookEvent::ReleaseTestFailure,
    ];

    /// The annotation token for this event
    pub fn as_str(&self) -> &'static str {
        match self {
            HookEvent::PreInstall => "pre-install",
            HookEvent::PostInstall => "post-install",
            HookEvent::PreDelete => "pre-delete",
            HookEvent::PostDelete => "post-delete",
            HookEvent::PreUpgrade => "pre-upgrade",
            HookEvent::PostUpgrade => "post-upgrade",
            HookEvent::PreRollback => "pre-rollback",
            HookEvent::PostRollback => "post-rollback",
            HookEvent::ReleaseTestSuccess => "release-test-success",
            HookEvent::ReleaseTestFailure => "release-test-failure",
        }
    }
}

impl std::fmt::Display for HookEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lookup from hook-name token to event
///
/// Built once and owned by whoever classifies manifests; it is never mutated
/// after construction.
#[derive(Debug, Clone)]
pub struct HookEventTable {
    events: HashMap<&'static str, HookEvent>,
}

impl HookEventTable {
    /// Table recognizing exactly the given events
    pub fn new(events: impl IntoIterator<Item = HookEvent>) -> Self {
        Self {
            events: events.into_iter().map(|e| (e.as_str(), e)).collect(),
        }
    }

    /// Look up an already normalized token
    pub fn lookup(&self, token: &str) -> Option<HookEvent> {
        self.events.get(token).copied()
    }

    /// Parse an annotation value into its recognized events, in order
    ///
    /// Tokens are trimmed and lower-cased; unknown tokens are ignored.
    /// Duplicates are kept.
    pub fn parse_annotation(&self, value: &str) -> Vec<HookEvent> {
        value
            .split(',')
            .filter_map(|token| self.lookup(&token.trim().to_lowercase()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl Default for HookEventTable {
    fn default() -> Self {
        Self::new(HookEvent::ALL)
    }
}

/// A rendered document that runs at one or more lifecycle events
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hook {
    /// metadata.name of the resource
    pub name: String,
    pub kind: String,
    /// Source document name
    pub path: String,
    /// Raw rendered text
    pub manifest: String,
    pub events: Vec<HookEvent>,
}

impl Hook {
    pub fn runs_at(&self, event: HookEvent) -> bool {
        self.events.contains(&event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_annotation() {
        let table = HookEventTable::default();
        let events = table.parse_annotation("pre-install,post-install,pre-upgrade");
        assert_eq!(
            events,
            vec![
                HookEvent::PreInstall,
                HookEvent::PostInstall,
                HookEvent::PreUpgrade
            ]
        );
    }

    #[test]
    fn test_parse_annotation_normalizes_tokens() {
        let table = HookEventTable::default();
        let events = table.parse_annotation(" Pre-Install , POST-DELETE ");
        assert_eq!(events, vec![HookEvent::PreInstall, HookEvent::PostDelete]);
    }

    #[test]
    fn test_parse_annotation_ignores_unknown() {
        let table = HookEventTable::default();
        assert!(table.parse_annotation("bogus,also-bogus").is_empty());
        assert_eq!(
            table.parse_annotation("bogus,post-rollback"),
            vec![HookEvent::PostRollback]
        );
    }

    #[test]
    fn test_parse_annotation_keeps_duplicates() {
        let table = HookEventTable::default();
        assert_eq!(
            table.parse_annotation("pre-delete,pre-delete"),
            vec![HookEvent::PreDelete, HookEvent::PreDelete]
        );
    }

    #[test]
    fn test_default_table_covers_all_events() {
        let table = HookEventTable::default();
        assert_eq!(table.len(), HookEvent::ALL.len());
        for event in HookEvent::ALL {
            assert_eq!(table.lookup(&event.to_string()), Some(event));
        }
    }

    #[test]
    fn test_restricted_table() {
        let table = HookEventTable::new([HookEvent::ReleaseTestSuccess]);
        assert_eq!(
            table.lookup("release-test-success"),
            Some(HookEvent::ReleaseTestSuccess)
        );
        assert_eq!(table.lookup("pre-install"), None);
    }

    #[test]
    fn test_hook_runs_at() {
        let hook = Hook {
            name: "migrate".to_string(),
            kind: "Job".to_string(),
            path: "chart/templates/job.yaml".to_string(),
            manifest: String::new(),
            events: vec![HookEvent::PreInstall, HookEvent::PreUpgrade],
        };

        assert!(hook.runs_at(HookEvent::PreUpgrade));
        assert!(!hook.runs_at(HookEvent::PostInstall));
    }

    #[test]
    fn test_event_serializes_kebab_case() {
        let json = serde_json::to_string(&HookEvent::ReleaseTestFailure).unwrap();
        assert_eq!(json, "\"release-test-failure\"");
    }
}
