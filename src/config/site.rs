//! `[site]` section configuration.
//!
//! Where the docs live, where the copied site goes, and how edit links
//! are built.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// `[site]` section in genfiles.toml.
///
/// # Example
/// ```toml
/// [site]
/// docs_dir = "docs"
/// site_dir = "site"
/// repo_url = "https://github.com/alice/project"
/// edit_uri = "edit/main/docs/"
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct SiteSection {
    /// Source directory scanned for the site's files.
    #[serde(default = "defaults::site::docs_dir")]
    #[educe(Default = defaults::site::docs_dir())]
    pub docs_dir: PathBuf,

    /// Output directory of `genfiles build`.
    #[serde(default = "defaults::site::site_dir")]
    #[educe(Default = defaults::site::site_dir())]
    pub site_dir: PathBuf,

    /// Repository URL, base of every edit link.
    #[serde(default)]
    pub repo_url: Option<String>,

    /// Path of the edit view relative to `repo_url`.
    #[serde(default)]
    pub edit_uri: Option<String>,
}

impl SiteSection {
    /// `repo_url` and `edit_uri`, when both are set and non-empty.
    pub fn edit_base(&self) -> Option<(&str, &str)> {
        let repo_url = self.repo_url.as_deref().filter(|s| !s.is_empty())?;
        let edit_uri = self.edit_uri.as_deref().filter(|s| !s.is_empty())?;
        Some((repo_url, edit_uri))
    }
}
