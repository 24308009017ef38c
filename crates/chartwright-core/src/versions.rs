//! Recognized API versions

use serde::Serialize;
use std::collections::BTreeSet;

/// API versions assumed available when no cluster is consulted
pub const DEFAULT_API_VERSIONS: &[&str] = &[
    "v1",
    "admissionregistration.k8s.io/v1",
    "apiextensions.k8s.io/v1",
    "apiextensions.k8s.io/v1beta1",
    "apiregistration.k8s.io/v1",
    "apps/v1",
    "apps/v1beta1",
    "apps/v1beta2",
    "autoscaling/v1",
    "autoscaling/v2",
    "autoscaling/v2beta1",
    "batch/v1",
    "batch/v1beta1",
    "batch/v2alpha1",
    "certificates.k8s.io/v1",
    "coordination.k8s.io/v1",
    "extensions/v1beta1",
    "networking.k8s.io/v1",
    "policy/v1",
    "policy/v1beta1",
    "rbac.authorization.k8s.io/v1",
    "rbac.authorization.k8s.io/v1beta1",
    "scheduling.k8s.io/v1",
    "storage.k8s.io/v1",
    "storage.k8s.io/v1beta1",
];

/// A set of API version strings such as `apps/v1`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct VersionSet(BTreeSet<String>);

impl VersionSet {
    pub fn new<I, S>(versions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(versions.into_iter().map(Into::into).collect())
    }

    pub fn has(&self, version: &str) -> bool {
        self.0.contains(version)
    }

    /// Add versions, e.g. CRD groups passed on the command line
    pub fn extend<I, S>(&mut self, versions: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0.extend(versions.into_iter().map(Into::into));
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

impl Default for VersionSet {
    fn default() -> Self {
        Self::new(DEFAULT_API_VERSIONS.iter().copied())
    }
}
