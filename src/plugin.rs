//! Build lifecycle glue.
//!
//! A host build calls into [`GenFilesPlugin`] at three points:
//!
//! ```text
//! on_files(files)          run scripts ──► merged Files
//!     │
//!     ├── on_page_content(page)   once per rendered page, sets edit_url
//!     │
//! on_post_build()          teardown staging, warn about unused edit paths
//! ```

use crate::{
    config::{SiteConfig, SiteSection},
    edit::{EditPathRegistry, edit_url},
    editor::FilesEditor,
    error::Result,
    files::{Files, SiteFile},
    log,
    overlay::OverlayDirectory,
    script::ScriptRunner,
};

/// A page as seen by the page-rendering phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub file: SiteFile,
    pub edit_url: Option<String>,
}

impl Page {
    pub const fn new(file: SiteFile, edit_url: Option<String>) -> Self {
        Self { file, edit_url }
    }
}

/// Runs the configured scripts during a build and keeps what the later
/// phases need: the staging directory and the edit paths.
pub struct GenFilesPlugin {
    runner: Box<dyn ScriptRunner>,
    overlay: Option<OverlayDirectory>,
    edit_paths: EditPathRegistry,
}

impl GenFilesPlugin {
    pub fn new(runner: Box<dyn ScriptRunner>) -> Self {
        Self {
            runner,
            overlay: None,
            edit_paths: EditPathRegistry::default(),
        }
    }

    /// Staging directory of the last run, until [`Self::on_post_build`].
    pub fn overlay(&self) -> Option<&OverlayDirectory> {
        self.overlay.as_ref()
    }

    pub fn edit_paths(&self) -> &EditPathRegistry {
        &self.edit_paths
    }

    /// Run every script over `files` and return the merged collection.
    ///
    /// Scripts run in configured order and the first failure stops the
    /// loop. Whatever was written before it is still merged and staged, but
    /// the failure is returned instead of the collection.
    pub fn on_files(&mut self, files: Files, config: &SiteConfig) -> Result<Files> {
        let gen_files = &config.gen_files;
        let overlay = match &gen_files.directory {
            Some(dir) => OverlayDirectory::persistent(dir)?,
            None => OverlayDirectory::temporary(gen_files.should_cleanup())?,
        };
        log!("gen_files"; "staging in {}", overlay.root().display());

        let mut editor = FilesEditor::enter(files, overlay)?;
        let runner = self.runner.as_ref();
        let result = gen_files
            .scripts
            .iter()
            .try_for_each(|script| editor.run_script(runner, script));

        let output = match editor.finish() {
            Ok(output) => output,
            Err(err) => return Err(result.err().unwrap_or(err)),
        };
        self.overlay = Some(output.overlay);
        self.edit_paths = output.edit_paths;
        result?;

        // Hosts that derive edit links from the file record pick up the
        // script's edit path as well.
        let mut files = output.files;
        for (path, edit_path) in self.edit_paths.iter() {
            if let Some(edit_path) = edit_path.filter(|p| !p.is_empty())
                && let Some(file) = files.get_mut(path.as_str())
            {
                file.edit_uri = Some(edit_path.to_owned());
            }
        }
        Ok(files)
    }

    /// Set the edit link of `page` from its registered edit path.
    ///
    /// The entry is consumed whether or not an edit link can be built. An
    /// empty edit path removes the link, like a null one.
    /// Without both `repo_url` and `edit_uri` configured the page is left
    /// alone. Content is returned unchanged.
    pub fn on_page_content(&mut self, html: String, page: &mut Page, site: &SiteSection) -> String {
        let Some(edit_path) = self.edit_paths.pop(&page.file.src_uri) else {
            return html;
        };
        let Some((repo_url, edit_uri)) = site.edit_base() else {
            return html;
        };

        page.edit_url = edit_path
            .filter(|path| !path.is_empty())
            .and_then(|path| edit_url(repo_url, edit_uri, &path));
        html
    }

    /// Remove the staging directory (if cleanup is on) and report edit
    /// paths that were never used by a rendered page.
    ///
    /// Returns the reported `(path, edit_path)` pairs.
    pub fn on_post_build(&mut self) -> Vec<(String, String)> {
        if let Some(mut overlay) = self.overlay.take() {
            overlay.teardown();
        }

        let edit_paths = std::mem::take(&mut self.edit_paths);
        let unused: Vec<_> = edit_paths
            .unused()
            .into_iter()
            .map(|(path, edit_path)| (path.to_string(), edit_path.to_owned()))
            .collect();

        if !unused.is_empty() {
            // multiline, so the logger does not truncate it
            let listed: String = unused
                .iter()
                .map(|(path, edit_path)| format!("\n  {path} -> {edit_path}"))
                .collect();
            log!("warn"; "these set_edit_path calls went unused (the files don't exist):{}", listed);
        }
        unused
    }
}
