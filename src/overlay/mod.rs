//! Staging directory for generated files.
//!
//! Scripts never write into the docs directory. Every file they open for
//! writing is staged under the overlay root at its logical path, and the
//! overlay remembers which logical paths were touched so they can be merged
//! into the site's file collection afterwards.
//!
//! ```text
//! script: open("ref/api.md", "w")
//!             │
//!             ▼
//! LogicalPath::parse ──► <overlay root>/ref/api.md   (staged bytes)
//!             │
//!             └────────► touched = [.., "ref/api.md"] (first-write order)
//! ```

mod file;
mod path;

pub use file::{Access, OpenMode, VirtualFile};
pub use path::LogicalPath;

use crate::{
    error::{GenFilesError, Result},
    files::Files,
    log,
};
use indexmap::IndexSet;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Logical paths written during a run, in first-write order.
pub type TouchedPaths = IndexSet<LogicalPath>;

/// Prefix of automatically created staging directories.
pub const TEMP_DIR_PREFIX: &str = "genfiles_";

/// A real directory used to stage generated files.
#[derive(Debug)]
pub struct OverlayDirectory {
    root: PathBuf,
    cleanup: bool,
    torn_down: bool,
    touched: TouchedPaths,
}

impl OverlayDirectory {
    /// Use a user-provided directory, created if missing and never removed.
    pub fn persistent(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir).map_err(|err| GenFilesError::io(dir, err))?;
        Ok(Self::with_root(dir.to_path_buf(), false))
    }

    /// Create a fresh, uniquely named temporary directory.
    ///
    /// When `cleanup` is false the directory is left behind after teardown.
    pub fn temporary(cleanup: bool) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(TEMP_DIR_PREFIX)
            .disable_cleanup(true)
            .tempdir()
            .map_err(|err| GenFilesError::io(std::env::temp_dir(), err))?;
        Ok(Self::with_root(dir.path().to_path_buf(), cleanup))
    }

    fn with_root(root: PathBuf, cleanup: bool) -> Self {
        Self {
            root,
            cleanup,
            torn_down: false,
            touched: TouchedPaths::default(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub const fn cleanup(&self) -> bool {
        self.cleanup
    }

    pub fn touched(&self) -> &TouchedPaths {
        &self.touched
    }

    pub fn is_touched(&self, path: &str) -> bool {
        self.touched.contains(path)
    }

    /// Open `path` through the overlay.
    ///
    /// Reads resolve to the staged copy when the path was written in this
    /// run, otherwise to the host's real file. Writes always go to staging;
    /// modes that keep existing content (`a`, `r+`) first copy the host's
    /// file into staging so the real source is never modified.
    pub fn open(&mut self, path: &str, mode: OpenMode, host: &Files) -> Result<VirtualFile> {
        let path = LogicalPath::parse(path)?;
        let staged = path.to_physical(&self.root);

        if !mode.is_write() {
            if self.touched.contains(&path) {
                return VirtualFile::open(path, staged, mode);
            }
            return match host.get(path.as_str()) {
                Some(file) => {
                    let physical = file.abs_src_path.clone();
                    VirtualFile::open(path, physical, mode)
                }
                None => Err(GenFilesError::NotFound(path.to_string())),
            };
        }

        if !self.touched.contains(&path) {
            self.prepare_staged(&path, &staged, mode, host)?;
        }

        let file = VirtualFile::open(path.clone(), staged, mode)?;
        self.touched.insert(path);
        Ok(file)
    }

    /// Seed or clear the staged copy before its first write in this run.
    fn prepare_staged(
        &self,
        path: &LogicalPath,
        staged: &Path,
        mode: OpenMode,
        host: &Files,
    ) -> Result<()> {
        if !mode.keeps_content() {
            return Ok(());
        }
        match host.get(path.as_str()) {
            Some(file) => {
                if let Some(parent) = staged.parent() {
                    fs::create_dir_all(parent).map_err(|err| GenFilesError::io(parent, err))?;
                }
                fs::copy(&file.abs_src_path, staged)
                    .map(|_| ())
                    .map_err(|err| GenFilesError::io(&file.abs_src_path, err))
            }
            // Leftover from an earlier build in a persistent directory.
            None if staged.exists() => {
                fs::remove_file(staged).map_err(|err| GenFilesError::io(staged, err))
            }
            None => Ok(()),
        }
    }

    /// Whether `path` is readable through the overlay.
    pub fn exists(&self, path: &str, host: &Files) -> Result<bool> {
        let path = LogicalPath::parse(path)?;
        Ok(self.touched.contains(&path) || host.get(path.as_str()).is_some())
    }

    /// Remove the staging directory if auto-cleanup is enabled.
    ///
    /// Best effort: failures are logged and never returned.
    pub fn teardown(&mut self) {
        if !self.cleanup || self.torn_down {
            return;
        }
        self.torn_down = true;
        if !self.root.exists() {
            return;
        }
        if let Err(err) = fs::remove_dir_all(&self.root) {
            log!("warn"; "failed to remove {}: {}", self.root.display(), err);
        }
    }
}

impl Drop for OverlayDirectory {
    fn drop(&mut self) {
        self.teardown();
    }
}
