//! Edit-path bookkeeping and "edit this page" links.

use crate::overlay::LogicalPath;
use indexmap::IndexMap;
use url::Url;

/// Edit paths registered by scripts, keyed by the generated file's path.
///
/// A `None` value means "no edit link for this page". Entries are popped
/// when their page is rendered, so whatever is left after the build was
/// registered for a page that never got rendered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditPathRegistry {
    entries: IndexMap<LogicalPath, Option<String>>,
}

impl EditPathRegistry {
    pub fn set(&mut self, path: LogicalPath, edit_path: Option<String>) {
        self.entries.insert(path, edit_path);
    }

    pub fn get(&self, path: &str) -> Option<Option<&str>> {
        self.entries.get(path).map(Option::as_deref)
    }

    /// Remove and return the entry for `path`, if any.
    pub fn pop(&mut self, path: &str) -> Option<Option<String>> {
        self.entries.shift_remove(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&LogicalPath, Option<&str>)> {
        self.entries.iter().map(|(k, v)| (k, v.as_deref()))
    }

    /// Remaining entries that carry an edit path, in registration order.
    pub fn unused(&self) -> Vec<(&LogicalPath, &str)> {
        self.entries
            .iter()
            .filter_map(|(k, v)| v.as_deref().filter(|v| !v.is_empty()).map(|v| (k, v)))
            .collect()
    }
}

/// Build the absolute edit URL for `path`.
///
/// Unless `edit_uri` is a query or fragment, `repo_url` gets exactly one
/// trailing slash so the edit URI is resolved below it rather than beside
/// its last segment. Returns `None` when `repo_url` is not a valid URL.
///
/// | repo_url | edit_uri | path | result |
/// |----------|----------|------|--------|
/// | `https://example.com/repo` | `edit/main/` | `docs/x.md` | `https://example.com/repo/edit/main/docs/x.md` |
/// | `https://example.com/repo/` | `?path=` | `x.md` | `https://example.com/repo/x.md` |
pub fn edit_url(repo_url: &str, edit_uri: &str, path: &str) -> Option<String> {
    let base = if edit_uri.starts_with(['?', '#']) {
        repo_url.to_owned()
    } else {
        format!("{}/", repo_url.trim_end_matches('/'))
    };

    let url = Url::parse(&base).ok()?.join(edit_uri).ok()?.join(path).ok()?;
    Some(url.into())
}
