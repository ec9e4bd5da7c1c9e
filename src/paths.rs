//! Path helpers for matching archive member names.
//!
//! Archives built on Windows list members with backslashes, and the tools
//! match names case-sensitively on Linux. Lookups here ignore both.

use std::path::Path;

/// Normalize a member path for lookups and comparisons (lowercase, forward slashes, trimmed)
pub fn normalize_for_lookup(path: &str) -> String {
    path.to_lowercase()
        .replace('\\', "/")
        .trim_matches('/')
        .to_string()
}

/// Check if two member paths are equal (case-insensitive)
pub fn paths_equal(a: &str, b: &str) -> bool {
    normalize_for_lookup(a) == normalize_for_lookup(b)
}

/// Create parent directories for a path if they don't exist
pub fn ensure_parent_dirs(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize_for_lookup("Data\\Textures\\Armor.dds"), "data/textures/armor.dds");
        assert_eq!(normalize_for_lookup("/foo/bar/"), "foo/bar");
        assert_eq!(normalize_for_lookup("FOO\\BAR\\BAZ.TXT"), "foo/bar/baz.txt");
    }

    #[test]
    fn test_paths_equal() {
        assert!(paths_equal("Docs\\Readme.TXT", "docs/readme.txt"));
        assert!(!paths_equal("docs/readme.txt", "docs/license.txt"));
    }

    #[test]
    fn test_ensure_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a/b/c.txt");
        ensure_parent_dirs(&target).unwrap();
        assert!(dir.path().join("a/b").is_dir());
        // Bare file names have no parent to create
        ensure_parent_dirs(Path::new("c.txt")).unwrap();
    }
}
