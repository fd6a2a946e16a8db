//! File access for template sources and destinations
//!
//! Every path is checked for absoluteness before any I/O happens.

use std::path::Path;

use crate::error::{CoreError, Result};

/// Fail with [`CoreError::NotAbsolute`] unless `path` is absolute
pub fn ensure_absolute(path: &Path) -> Result<()> {
    if path.is_absolute() {
        Ok(())
    } else {
        Err(CoreError::NotAbsolute {
            path: path.to_path_buf(),
        })
    }
}

/// Read a template source fully into memory
pub fn read_source(path: &Path) -> Result<String> {
    ensure_absolute(path)?;
    std::fs::read_to_string(path).map_err(|source| CoreError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Overwrite `path` with `contents`
///
/// The write is not atomic and keeps no backup of the previous content.
pub fn write_output(path: &Path, contents: &str) -> Result<()> {
    ensure_absolute(path)?;
    std::fs::write(path, contents).map_err(|source| CoreError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_relative_paths_are_rejected_before_io() {
        let err = read_source(Path::new("does/not/matter.tmpl")).unwrap_err();
        assert!(matches!(err, CoreError::NotAbsolute { .. }));

        let err = write_output(Path::new("./out.conf"), "x").unwrap_err();
        assert!(matches!(err, CoreError::NotAbsolute { .. }));
    }

    #[test]
    fn test_missing_source_is_read_error() {
        let err = read_source(Path::new("/xxx/yyy/foo/bar")).unwrap_err();
        assert!(matches!(err, CoreError::Read { .. }));
        assert!(err.to_string().contains("/xxx/yyy/foo/bar"));
    }

    #[test]
    fn test_write_overwrites_existing_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.conf");
        std::fs::write(&path, "old content that is longer").unwrap();

        write_output(&path, "new").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
    }
}
