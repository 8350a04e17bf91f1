//! `[gen_files]` section configuration.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// `[gen_files]` section in genfiles.toml - which scripts to run and where
/// to stage their output.
///
/// # Example
/// ```toml
/// [gen_files]
/// scripts = ["gen/ref_pages.rhai", "gen/changelog.rhai"]
/// directory = "build/generated"
/// cleanup = true
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct GenFilesConfig {
    /// Scripts to run, in order.
    #[serde(default)]
    pub scripts: Vec<PathBuf>,

    /// Persistent staging directory. A temporary directory is used when unset.
    #[serde(default)]
    pub directory: Option<PathBuf>,

    /// Delete the temporary staging directory after the build.
    /// Has no effect when `directory` is set.
    #[serde(default = "defaults::r#true")]
    #[educe(Default = true)]
    pub cleanup: bool,
}

impl GenFilesConfig {
    /// Whether the staging directory is removed at the end of the build.
    pub const fn should_cleanup(&self) -> bool {
        self.directory.is_none() && self.cleanup
    }
}
