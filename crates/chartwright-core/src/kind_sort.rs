//! Ordering of generic manifests by resource kind

use std::collections::HashMap;

use crate::classify::Manifest;

/// Kinds in install order; lower index installs first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortOrder(Vec<String>);

/// Default install order
pub const INSTALL_ORDER: &[&str] = &[
    "Project",
    "Secret",
    "ConfigMap",
    "PersistentVolume",
    "PersistentVolumeClaim",
    "ServiceAccount",
    "ClusterRole",
    "ClusterRoleBinding",
    "Role",
    "RoleBinding",
    "ImageStream",
    "Service",
    "BuildConfig",
    "Pod",
    "ReplicationController",
    "Deployment",
    "DeploymentConfig",
    "DaemonSet",
    "Ingress",
    "Job",
];

impl SortOrder {
    pub fn new<I, S>(kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(kinds.into_iter().map(Into::into).collect())
    }

    /// The default install order
    pub fn install() -> Self {
        Self::new(INSTALL_ORDER.iter().copied())
    }

    pub fn kinds(&self) -> &[String] {
        &self.0
    }

    /// Rank of each kind; a kind listed twice keeps its first position
    fn ranks(&self) -> HashMap<&str, usize> {
        let mut ranks = HashMap::with_capacity(self.0.len());
        for (rank, kind) in self.0.iter().enumerate() {
            ranks.entry(kind.as_str()).or_insert(rank);
        }
        ranks
    }
}

impl Default for SortOrder {
    fn default() -> Self {
        Self::install()
    }
}

/// Sort manifests by kind
///
/// Known kinds follow `order`; unknown kinds come after every known kind.
/// Manifests of the same rank keep their input order.
pub fn sort_by_kind(manifests: Vec<Manifest>, order: &SortOrder) -> Vec<Manifest> {
    let ranks = order.ranks();
    let unknown = order.kinds().len();

    let mut decorated: Vec<(usize, usize, Manifest)> = manifests
        .into_iter()
        .enumerate()
        .map(|(index, manifest)| {
            let rank = ranks
                .get(manifest.head.kind.as_str())
                .copied()
                .unwrap_or(unknown);
            (rank, index, manifest)
        })
        .collect();

    decorated.sort_unstable_by_key(|(rank, index, _)| (*rank, *index));
    decorated.into_iter().map(|(_, _, manifest)| manifest).collect()
}
