//! The site's ordered file collection.

use crate::{
    error::{GenFilesError, Result},
    overlay::LogicalPath,
};
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Files to ignore during directory traversal
pub const IGNORED_FILES: &[&str] = &[".DS_Store"];

/// Extensions treated as documentation pages.
const PAGE_EXTENSIONS: &[&str] = &["md", "markdown"];

/// One source file of the site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteFile {
    /// Site-relative path with forward slashes, e.g. `guide/intro.md`
    pub src_uri: String,
    /// Where the bytes are read from
    pub abs_src_path: PathBuf,
    /// Whether the file was produced by a script
    pub generated: bool,
    /// Path used instead of `src_uri` when building edit links
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edit_uri: Option<String>,
}

impl SiteFile {
    pub fn new(src_uri: String, abs_src_path: PathBuf) -> Self {
        Self {
            src_uri,
            abs_src_path,
            generated: false,
            edit_uri: None,
        }
    }

    /// Record for a file staged under `overlay_root`.
    pub fn generated(path: &LogicalPath, overlay_root: &Path) -> Self {
        Self {
            src_uri: path.to_string(),
            abs_src_path: path.to_physical(overlay_root),
            generated: true,
            edit_uri: None,
        }
    }

    pub fn is_documentation_page(&self) -> bool {
        Path::new(&self.src_uri)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| PAGE_EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e)))
    }
}

/// Ordered collection of site files, indexed by `src_uri`.
#[derive(Debug, Clone, Default)]
pub struct Files {
    entries: Vec<SiteFile>,
    index: FxHashMap<String, usize>,
}

impl Files {
    /// Collect every file below `docs_dir`, sorted by path.
    ///
    /// Dotfiles and dot-directories are skipped.
    pub fn scan(docs_dir: &Path) -> Result<Self> {
        let mut files = Self::default();
        let walker = WalkDir::new(docs_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name().to_str()));

        for entry in walker {
            let entry = entry.map_err(|err| {
                let path = err.path().unwrap_or(docs_dir).to_path_buf();
                GenFilesError::io(path, err.into())
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_str().unwrap_or_default();
            if IGNORED_FILES.contains(&name) {
                continue;
            }
            let relative = entry.path().strip_prefix(docs_dir).unwrap_or(entry.path());
            let src_uri = LogicalPath::from_relative(relative)?.to_string();
            files.set(SiteFile::new(src_uri, entry.into_path()));
        }
        Ok(files)
    }

    pub fn get(&self, src_uri: &str) -> Option<&SiteFile> {
        self.index.get(src_uri).map(|&i| &self.entries[i])
    }

    pub fn get_mut(&mut self, src_uri: &str) -> Option<&mut SiteFile> {
        self.index.get(src_uri).map(|&i| &mut self.entries[i])
    }

    /// Replace the entry with the same `src_uri` in place, or append.
    ///
    /// Returns the replaced entry.
    pub fn set(&mut self, file: SiteFile) -> Option<SiteFile> {
        match self.index.get(&file.src_uri) {
            Some(&i) => Some(std::mem::replace(&mut self.entries[i], file)),
            None => {
                self.index.insert(file.src_uri.clone(), self.entries.len());
                self.entries.push(file);
                None
            }
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SiteFile> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn documentation_pages(&self) -> impl Iterator<Item = &SiteFile> {
        self.entries.iter().filter(|f| f.is_documentation_page())
    }
}

fn is_hidden(name: Option<&str>) -> bool {
    name.is_some_and(|n| n.starts_with('.'))
}

impl FromIterator<SiteFile> for Files {
    fn from_iter<I: IntoIterator<Item = SiteFile>>(iter: I) -> Self {
        let mut files = Self::default();
        for file in iter {
            files.set(file);
        }
        files
    }
}

impl<'a> IntoIterator for &'a Files {
    type Item = &'a SiteFile;
    type IntoIter = std::slice::Iter<'a, SiteFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl PartialEq for Files {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for Files {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn file(name: &str) -> SiteFile {
        SiteFile::new(name.to_owned(), PathBuf::from("/docs").join(name))
    }

    #[test]
    fn test_set_replaces_in_place() {
        let mut files: Files = [file("a.md"), file("b.md"), file("c.md")].into_iter().collect();

        let mut replacement = file("b.md");
        replacement.generated = true;
        let old = files.set(replacement);

        assert!(old.is_some_and(|f| !f.generated));
        let names: Vec<_> = files.iter().map(|f| f.src_uri.as_str()).collect();
        assert_eq!(names, ["a.md", "b.md", "c.md"]);
        assert!(files.get("b.md").unwrap().generated);
    }

    #[test]
    fn test_set_appends_new() {
        let mut files: Files = [file("a.md")].into_iter().collect();
        assert!(files.set(file("z.md")).is_none());
        assert_eq!(files.len(), 2);
        assert_eq!(files.iter().last().unwrap().src_uri, "z.md");
    }

    #[test]
    fn test_is_documentation_page() {
        assert!(file("index.md").is_documentation_page());
        assert!(file("guide/Intro.MARKDOWN").is_documentation_page());
        assert!(!file("img/logo.png").is_documentation_page());
        assert!(!file("Makefile").is_documentation_page());
    }

    #[test]
    fn test_scan_sorted_and_filtered() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("guide")).unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::write(root.join("index.md"), "").unwrap();
        fs::write(root.join("guide/b.md"), "").unwrap();
        fs::write(root.join("guide/a.png"), "").unwrap();
        fs::write(root.join(".DS_Store"), "").unwrap();
        fs::write(root.join(".git/config"), "").unwrap();

        let files = Files::scan(root).unwrap();
        let names: Vec<_> = files.iter().map(|f| f.src_uri.as_str()).collect();
        assert_eq!(names, ["guide/a.png", "guide/b.md", "index.md"]);
        assert_eq!(files.get("guide/b.md").unwrap().abs_src_path, root.join("guide/b.md"));
        assert_eq!(files.documentation_pages().count(), 2);
    }

    #[test]
    fn test_scan_missing_dir_fails() {
        let dir = TempDir::new().unwrap();
        assert!(Files::scan(&dir.path().join("nope")).is_err());
    }
}
