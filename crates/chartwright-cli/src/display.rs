//! Console formatting for rendered output
//!
//! Everything is formatted into a buffer first; nothing reaches stdout until
//! the whole pipeline has succeeded.

use chartwright_core::{Hook, Manifest};
use std::fmt::Write as _;

/// Buffered stdout content of a `template` run
#[derive(Debug, Default)]
pub struct Output {
    buf: String,
}

impl Output {
    pub fn new() -> Self {
        Self::default()
    }

    /// The merged values, as shown by `--verbose`
    pub fn values(&mut self, yaml: &str) {
        let _ = writeln!(self.buf, "---\n# merged values\n{}", yaml.trim_end());
    }

    pub fn manifest(&mut self, manifest: &Manifest) {
        self.document(&manifest.name, &manifest.content);
    }

    pub fn hook(&mut self, hook: &Hook) {
        let _ = writeln!(
            self.buf,
            "---\n# Source: {}\n# Hook: {}\n{}",
            hook.path,
            hook_events(hook),
            hook.manifest.trim_end()
        );
    }

    /// Any named document, e.g. the rendered notes
    pub fn document(&mut self, name: &str, content: &str) {
        let _ = writeln!(self.buf, "---\n# Source: {}\n{}", name, content.trim_end());
    }

    /// A line reporting a file written with `--output-dir`
    pub fn wrote(&mut self, path: &std::path::Path) {
        let _ = writeln!(
            self.buf,
            "{} {}",
            console::style("wrote").green(),
            path.display()
        );
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

/// Comma-separated event names of a hook
pub fn hook_events(hook: &Hook) -> String {
    hook.events
        .iter()
        .map(|e| e.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

/// Format count with proper pluralization
pub fn pluralize(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{} {}", count, singular)
    } else {
        format!("{} {}", count, plural)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chartwright_core::{HookEvent, ManifestHead};

    #[test]
    fn test_manifest_format() {
        let mut out = Output::new();
        out.manifest(&Manifest {
            name: "web/templates/svc.yaml".into(),
            content: "kind: Service\n\n".into(),
            head: ManifestHead::default(),
        });

        assert_eq!(
            out.as_str(),
            "---\n# Source: web/templates/svc.yaml\nkind: Service\n"
        );
    }

    #[test]
    fn test_hook_format() {
        let mut out = Output::new();
        out.hook(&Hook {
            name: "migrate".into(),
            kind: "Job".into(),
            path: "web/templates/job.yaml".into(),
            manifest: "kind: Job\n".into(),
            events: vec![HookEvent::PreInstall, HookEvent::PreUpgrade],
        });

        assert_eq!(
            out.as_str(),
            "---\n# Source: web/templates/job.yaml\n# Hook: pre-install,pre-upgrade\nkind: Job\n"
        );
    }

    #[test]
    fn test_values_format() {
        let mut out = Output::new();
        out.values("replicas: 2\n");
        assert_eq!(out.as_str(), "---\n# merged values\nreplicas: 2\n");
    }

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize(1, "manifest", "manifests"), "1 manifest");
        assert_eq!(pluralize(3, "manifest", "manifests"), "3 manifests");
    }
}
