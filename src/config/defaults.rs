//! Default values for configuration fields.
//!
//! These functions are used by serde for default deserialization.

pub fn r#true() -> bool {
    true
}

// ============================================================================
// [site] Section Defaults
// ============================================================================

pub mod site {
    use std::path::PathBuf;

    pub fn docs_dir() -> PathBuf {
        "docs".into()
    }

    pub fn site_dir() -> PathBuf {
        "site".into()
    }
}
