//! Project configuration management for `genfiles.toml`.
//!
//! # Sections
//!
//! | Section       | Purpose                                          |
//! |---------------|--------------------------------------------------|
//! | `[site]`      | Docs/site directories, repository and edit links |
//! | `[gen_files]` | Scripts to run and the staging directory         |
//!
//! # Example
//!
//! ```toml
//! [site]
//! docs_dir = "docs"
//! repo_url = "https://github.com/alice/project"
//! edit_uri = "edit/main/docs/"
//!
//! [gen_files]
//! scripts = ["gen/ref_pages.rhai"]
//! ```

pub mod defaults;
mod error;
mod gen_files;
mod site;

pub use error::ConfigError;
pub use gen_files::GenFilesConfig;
pub use site::SiteSection;

use crate::cli::Cli;
use anyhow::{Result, bail};
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Root configuration structure representing genfiles.toml
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    /// Absolute path to the config file (set after loading)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root, all relative paths are resolved against it
    #[serde(skip)]
    pub root: PathBuf,

    /// Site layout and edit links
    #[serde(default)]
    pub site: SiteSection,

    /// Script generation settings
    #[serde(default)]
    pub gen_files: GenFilesConfig,
}

impl SiteConfig {
    /// Parse configuration from TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        let config: SiteConfig = toml::from_str(content).map_err(ConfigError::from)?;
        Ok(config)
    }

    /// Load configuration from file path
    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        Self::from_str(&content)
    }

    /// Load the config named on the command line, applying CLI overrides.
    pub fn load(cli: &Cli) -> Result<Self> {
        let root = cli.root.as_deref().unwrap_or(Path::new("./"));
        let config_path = root.join(&cli.config);

        if !config_path.exists() {
            bail!("Config file not found: {}", config_path.display());
        }

        let mut config = Self::from_path(&config_path)?;
        config.update_with_cli(cli);
        config.validate()?;
        Ok(config)
    }

    /// Update configuration with CLI arguments
    pub fn update_with_cli(&mut self, cli: &Cli) {
        let gen_args = cli.gen_args();
        Self::update_option(&mut self.site.docs_dir, cli.docs.as_ref());
        Self::update_option(&mut self.site.site_dir, cli.site.as_ref());
        if let Some(directory) = &gen_args.directory {
            self.gen_files.directory = Some(directory.clone());
        }
        Self::update_option(&mut self.gen_files.cleanup, gen_args.cleanup.as_ref());

        let root = cli.root.as_deref().unwrap_or(Path::new("./"));
        self.config_path = Self::normalize_path(&root.join(&cli.config));
        self.update_path_with_root(root);
    }

    /// Update config option if CLI value is provided
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Resolve all paths relative to `root` and normalize them to absolute paths
    pub fn update_path_with_root(&mut self, root: &Path) {
        let root = Self::normalize_path(root);

        self.site.docs_dir = Self::normalize_path(&root.join(&self.site.docs_dir));
        self.site.site_dir = Self::normalize_path(&root.join(&self.site.site_dir));
        self.gen_files.scripts = self
            .gen_files
            .scripts
            .iter()
            .map(|script| Self::normalize_path(&root.join(script)))
            .collect();

        // Staging directory may use `~`
        if let Some(directory) = &self.gen_files.directory {
            let expanded = shellexpand::tilde(&directory.to_string_lossy()).into_owned();
            self.gen_files.directory = Some(Self::normalize_path(&root.join(expanded)));
        }

        self.root = root;
    }

    /// Normalize a path to absolute, using canonicalize if the path exists
    fn normalize_path(path: &Path) -> PathBuf {
        path.canonicalize().unwrap_or_else(|_| {
            // For non-existent paths, manually make them absolute
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                std::env::current_dir()
                    .map(|cwd| cwd.join(path))
                    .unwrap_or_else(|_| path.to_path_buf())
            }
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if let Some(repo_url) = &self.site.repo_url
            && !repo_url.is_empty()
            && !repo_url.starts_with("http")
        {
            bail!(ConfigError::Validation(
                "[site.repo_url] must start with http:// or https://".into()
            ));
        }

        for script in &self.gen_files.scripts {
            if !script.exists() {
                bail!(ConfigError::Validation(format!(
                    "[gen_files.scripts] `{}` not found",
                    script.display()
                )));
            }
            if !script.is_file() {
                bail!(ConfigError::Validation(format!(
                    "[gen_files.scripts] `{}` is not a file",
                    script.display()
                )));
            }
        }

        if let Some(directory) = &self.gen_files.directory
            && directory.is_file()
        {
            bail!(ConfigError::Validation(
                "[gen_files.directory] is a file".into()
            ));
        }

        Ok(())
    }
}
