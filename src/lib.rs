//! Generate documentation files from scripts during a static site build.
//!
//! Scripts write into a staging [`overlay`] instead of the docs directory.
//! After the run, everything they wrote is merged into the site's
//! [`files::Files`] collection, and pages can point their "edit this page"
//! link at whatever really produced them.
//!
//! ```text
//! docs/ ──► Files::scan ──┐
//!                         ▼
//! scripts ──► FilesEditor (ScriptContext) ──► OverlayDirectory
//!                         │
//!                         ▼
//!                  reconcile ──► merged Files + EditPathRegistry
//! ```

pub mod build;
pub mod cli;
pub mod config;
pub mod edit;
pub mod editor;
pub mod error;
pub mod files;
pub mod logger;
pub mod overlay;
pub mod plugin;
pub mod reconcile;
pub mod script;

pub use edit::{EditPathRegistry, edit_url};
pub use editor::{EditorOutput, FilesEditor, ScriptContext};
pub use error::{GenFilesError, Result};
pub use files::{Files, SiteFile};
pub use overlay::{LogicalPath, OpenMode, OverlayDirectory, VirtualFile};
pub use plugin::{GenFilesPlugin, Page};
pub use script::{ExitStatus, RhaiRunner, ScriptEnd, ScriptRunner};

#[cfg(test)]
pub(crate) mod test_support {
    use parking_lot::{Mutex, MutexGuard, const_mutex};

    static LOCK: Mutex<()> = const_mutex(());

    /// Serialize tests that start a generation run.
    pub fn serial() -> MutexGuard<'static, ()> {
        LOCK.lock()
    }
}
