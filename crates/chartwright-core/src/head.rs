//! Minimal structural view of a rendered manifest

use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;

use crate::error::{CoreError, Result};
use crate::values::is_blank_yaml;

/// The leading fields of a Kubernetes-style manifest
///
/// Everything else in the document is ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestHead {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub api_version: String,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub kind: String,

    #[serde(default)]
    pub metadata: Option<HeadMetadata>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HeadMetadata {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,

    #[serde(default)]
    pub annotations: Option<BTreeMap<String, String>>,
}

/// `field: null` and `field: ~` read as an empty string
fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl ManifestHead {
    /// Parse the head of a document
    ///
    /// Only the first YAML document of `content` is considered. Documents with
    /// no content (comments, `null`) produce an empty head.
    pub fn parse(document: &str, content: &str) -> Result<Self> {
        if is_blank_yaml(content) {
            return Ok(Self::default());
        }

        let first = serde_yaml::Deserializer::from_str(content)
            .next()
            .ok_or_else(|| CoreError::parse(document, "no YAML document found"))?;

        let head: Option<ManifestHead> = Option::deserialize(first)
            .map_err(|e| CoreError::parse(document, format!("YAML parse error: {}", e)))?;
        Ok(head.unwrap_or_default())
    }

    /// Annotations, if any were declared
    pub fn annotations(&self) -> Option<&BTreeMap<String, String>> {
        self.metadata.as_ref()?.annotations.as_ref()
    }

    /// metadata.name, or an empty string
    pub fn name(&self) -> &str {
        self.metadata.as_ref().map(|m| m.name.as_str()).unwrap_or("")
    }
}
