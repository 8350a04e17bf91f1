//! Merge staged files into the site's file collection.

use crate::{
    files::{Files, SiteFile},
    overlay::OverlayDirectory,
};

/// Fold every touched path of `overlay` into `files`.
///
/// Touched paths already present in `files` are replaced in place, new ones
/// are appended in first-write order. Nothing else is changed, so a generated
/// file always wins over a real source file with the same path.
pub fn reconcile(mut files: Files, overlay: &OverlayDirectory) -> Files {
    for path in overlay.touched() {
        files.set(SiteFile::generated(path, overlay.root()));
    }
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::OpenMode;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn real(name: &str) -> SiteFile {
        SiteFile::new(name.to_owned(), PathBuf::from("/docs").join(name))
    }

    fn names(files: &Files) -> Vec<&str> {
        files.iter().map(|f| f.src_uri.as_str()).collect()
    }

    #[test]
    fn test_reconcile_replaces_and_appends() {
        let dir = TempDir::new().unwrap();
        let host: Files = [real("a.md"), real("b.md"), real("c.md")].into_iter().collect();
        let mut overlay = OverlayDirectory::persistent(dir.path()).unwrap();

        overlay.open("z.md", OpenMode::WRITE, &host).unwrap();
        overlay.open("b.md", OpenMode::WRITE, &host).unwrap();
        overlay.open("y/index.md", OpenMode::WRITE, &host).unwrap();
        overlay.open("z.md", OpenMode::WRITE, &host).unwrap();

        let merged = reconcile(host.clone(), &overlay);

        assert_eq!(names(&merged), ["a.md", "b.md", "c.md", "z.md", "y/index.md"]);
        assert_eq!(merged.get("a.md"), host.get("a.md"));
        assert_eq!(merged.get("c.md"), host.get("c.md"));

        let b = merged.get("b.md").unwrap();
        assert!(b.generated);
        assert_eq!(b.abs_src_path, dir.path().join("b.md"));
        assert_eq!(
            merged.get("y/index.md").unwrap().abs_src_path,
            dir.path().join("y").join("index.md")
        );
    }

    #[test]
    fn test_reconcile_without_writes_is_identity() {
        let dir = TempDir::new().unwrap();
        let host: Files = [real("a.md"), real("b.md")].into_iter().collect();
        let overlay = OverlayDirectory::persistent(dir.path()).unwrap();

        assert_eq!(reconcile(host.clone(), &overlay), host);
    }
}
