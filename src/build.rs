//! Minimal host build.
//!
//! Drives [`GenFilesPlugin`] the way a site generator would, so scripts can
//! be run and checked without one.
//!
//! ```text
//! build_site()
//!     │
//!     ├── Files::scan(docs_dir)
//!     ├── plugin.on_files() ──► merged Files
//!     ├── copy every file ──► site_dir
//!     ├── plugin.on_page_content() for each page ──► genfiles.json
//!     └── plugin.on_post_build()
//! ```

use crate::{
    config::SiteConfig,
    edit::edit_url,
    files::{Files, SiteFile},
    log,
    plugin::{GenFilesPlugin, Page},
    script::ScriptRunner,
};
use anyhow::{Context, Result};
use serde::Serialize;
use std::{fs, path::Path};

/// Name of the page manifest written into the site directory.
pub const MANIFEST_NAME: &str = "genfiles.json";

/// One rendered page, as recorded in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageRecord {
    pub src_uri: String,
    pub generated: bool,
    pub edit_url: Option<String>,
}

/// Run the scripts and copy the merged docs into `site_dir`.
///
/// If `clean` is true, the site directory is removed first.
pub fn build_site(config: &SiteConfig, runner: Box<dyn ScriptRunner>, clean: bool) -> Result<Vec<PageRecord>> {
    let docs_dir = &config.site.docs_dir;
    let site_dir = &config.site.site_dir;

    let files = Files::scan(docs_dir)
        .with_context(|| format!("Failed to scan {}", docs_dir.display()))?;
    log!("build"; "found {} files in {}", files.len(), docs_dir.display());

    let mut plugin = GenFilesPlugin::new(runner);
    let files = plugin.on_files(files, config)?;

    if clean && site_dir.exists() {
        fs::remove_dir_all(site_dir)
            .with_context(|| format!("Failed to clean {}", site_dir.display()))?;
    }

    let mut pages = Vec::new();
    for file in &files {
        let dest = site_dir.join(&file.src_uri);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        if !file.is_documentation_page() {
            copy_file(&file.abs_src_path, &dest)?;
            continue;
        }

        let content = fs::read_to_string(&file.abs_src_path)
            .with_context(|| format!("Failed to read {}", file.abs_src_path.display()))?;
        let mut page = Page::new(file.clone(), default_edit_url(file, config));
        let content = plugin.on_page_content(content, &mut page, &config.site);
        fs::write(&dest, content).with_context(|| format!("Failed to write {}", dest.display()))?;

        pages.push(PageRecord {
            src_uri: page.file.src_uri,
            generated: page.file.generated,
            edit_url: page.edit_url,
        });
    }

    write_manifest(&site_dir.join(MANIFEST_NAME), &pages)?;
    plugin.on_post_build();

    log!("build"; "done: {} files, {} pages", files.len(), pages.len());
    Ok(pages)
}

/// Run the scripts and print the merged file list.
///
/// Generated entries are marked with `+`.
pub fn list_files(config: &SiteConfig, runner: Box<dyn ScriptRunner>) -> Result<Files> {
    let docs_dir = &config.site.docs_dir;
    let files = Files::scan(docs_dir)
        .with_context(|| format!("Failed to scan {}", docs_dir.display()))?;

    let mut plugin = GenFilesPlugin::new(runner);
    let files = plugin.on_files(files, config)?;

    for file in &files {
        let marker = if file.generated { '+' } else { ' ' };
        println!("{marker} {}", file.src_uri);
    }

    plugin.on_post_build();
    Ok(files)
}

/// Edit link the host gives a page before the plugin sees it.
///
/// Uses the file's `edit_uri` when set; generated files without one get
/// no link since they have no source in the repository.
fn default_edit_url(file: &SiteFile, config: &SiteConfig) -> Option<String> {
    let (repo_url, edit_uri) = config.site.edit_base()?;
    let path = match &file.edit_uri {
        Some(path) => path.as_str(),
        None if file.generated => return None,
        None => file.src_uri.as_str(),
    };
    edit_url(repo_url, edit_uri, path)
}

fn copy_file(src: &Path, dest: &Path) -> Result<()> {
    fs::copy(src, dest)
        .map(|_| ())
        .with_context(|| format!("Failed to copy {} to {}", src.display(), dest.display()))
}

fn write_manifest(path: &Path, pages: &[PageRecord]) -> Result<()> {
    let json = serde_json::to_string_pretty(pages).context("Failed to serialize manifest")?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}
