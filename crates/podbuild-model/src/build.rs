//! Declarative build input.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::container::{Container, Volume};
use crate::meta::ObjectMeta;

/// A build resource: metadata plus the ordered steps to run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Build {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: BuildSpec,
}

/// What a build runs and where.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildSpec {
    /// Account whose secrets are offered to the credential initializer.
    /// `default` is used when empty.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service_account_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceSpec>,

    /// Steps in execution order.
    #[serde(default)]
    pub steps: Vec<Container>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<Volume>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub node_selector: BTreeMap<String, String>,

    /// Scheduling affinity, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affinity: Option<serde_json::Value>,
}

/// Where the build's sources come from. Only one kind is honoured, checked
/// in the order git, gcs, custom.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git: Option<GitSourceSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gcs: Option<GcsSourceSpec>,

    /// A user-supplied fetch container. Must not carry a name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<Container>,

    /// Directory inside the workspace volume to mount as `/workspace`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sub_path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitSourceSpec {
    #[serde(default)]
    pub url: String,
    /// Branch, tag, commit or ref to check out.
    #[serde(default)]
    pub revision: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GcsSourceSpec {
    #[serde(rename = "type", default)]
    pub source_type: GcsSourceType,
    #[serde(default)]
    pub location: String,
}

/// Layout of an object-store source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GcsSourceType {
    /// A single archive unpacked into the workspace.
    #[default]
    Archive,
    /// A manifest listing individual objects.
    Manifest,
}

impl GcsSourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GcsSourceType::Archive => "Archive",
            GcsSourceType::Manifest => "Manifest",
        }
    }
}

impl fmt::Display for GcsSourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
