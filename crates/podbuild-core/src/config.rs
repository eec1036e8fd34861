//! Images used for the synthesized units.

use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CREDS_IMAGE: &str = "override-with-creds:latest";
pub const DEFAULT_GIT_IMAGE: &str = "override-with-git:latest";
pub const DEFAULT_NOP_IMAGE: &str = "override-with-nop:latest";
pub const DEFAULT_GCS_FETCHER_IMAGE: &str = "gcr.io/cloud-builders/gcs-fetcher:latest";

/// Process-wide image references, resolved once at startup and passed
/// explicitly to [`crate::pod::from_build`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BuildConfig {
    /// Prepares credentials before the build runs.
    pub creds_image: String,
    /// Contains the git binary used for git sources.
    pub git_image: String,
    /// Runs after the last step to mark the build successful.
    pub nop_image: String,
    /// Fetches object-store sources.
    pub gcs_fetcher_image: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            creds_image: DEFAULT_CREDS_IMAGE.to_string(),
            git_image: DEFAULT_GIT_IMAGE.to_string(),
            nop_image: DEFAULT_NOP_IMAGE.to_string(),
            gcs_fetcher_image: DEFAULT_GCS_FETCHER_IMAGE.to_string(),
        }
    }
}

impl BuildConfig {
    /// Load from a JSON file; absent keys keep their defaults.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}
