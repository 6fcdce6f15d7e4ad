//! I/O boundary traits for testability
//!
//! These traits abstract external I/O operations, allowing services
//! to be tested with mock implementations.

use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

/// Filesystem abstraction for testability.
pub trait FileSystem: Send + Sync {
    /// Read file contents to string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Replace file contents so readers see either the old or the new file.
    fn write_atomic(&self, path: &Path, content: &str) -> io::Result<()>;
}

// ============================================================
// REAL IMPLEMENTATIONS
// ============================================================

/// Real filesystem implementation.
#[derive(Debug, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    /// Writes a temp file in the target's directory, then renames it over the target.
    fn write_atomic(&self, path: &Path, content: &str) -> io::Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn given_existing_file_when_writing_atomically_then_replaces_content() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("grades.tsv");
        std::fs::write(&path, "old").unwrap();

        let fs = RealFileSystem;
        fs.write_atomic(&path, "new\n").unwrap();

        assert_eq!(fs.read_to_string(&path).unwrap(), "new\n");
        assert!(path.is_file());
        let entries = std::fs::read_dir(temp.path()).unwrap().count();
        assert_eq!(entries, 1, "temp file must not be left behind");
    }

    #[test]
    fn given_missing_directory_when_writing_then_fails() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("missing").join("grades.tsv");
        assert!(RealFileSystem.write_atomic(&path, "x").is_err());
        assert!(!path.exists());
    }
}
