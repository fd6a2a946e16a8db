//! Supplementary dotenv files
//!
//! Files are parsed in the order given; a later file overrides a variable
//! set by an earlier one. Variables that already exist in the process
//! environment always win over file contents.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::error::{CoreError, Result};

/// Variables merged from one or more env files, in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvFileSet {
    vars: IndexMap<String, String>,
    sources: Vec<PathBuf>,
}

impl EnvFileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `path` and merge its variables over the ones already loaded
    pub fn merge_file(&mut self, path: &Path) -> Result<()> {
        let env_error = |source: dotenvy::Error| CoreError::EnvFile {
            path: path.to_path_buf(),
            source,
        };

        let iter = dotenvy::from_path_iter(path).map_err(env_error)?;
        let mut count = 0usize;
        for item in iter {
            let (key, value) = item.map_err(env_error)?;
            self.vars.insert(key, value);
            count += 1;
        }

        tracing::debug!(path = %path.display(), count, "loaded env file");
        self.sources.push(path.to_path_buf());
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Variables that should be exported, given a predicate telling whether
    /// a name is already set in the environment
    pub fn pending<'a>(
        &'a self,
        is_set: impl Fn(&str) -> bool + 'a,
    ) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.iter().filter(move |(key, _)| !is_set(key))
    }
}

/// Load every file in `paths`, later files overriding earlier ones
pub fn load_env_files<P: AsRef<Path>>(paths: &[P]) -> Result<EnvFileSet> {
    let mut set = EnvFileSet::new();
    for path in paths {
        set.merge_file(path.as_ref())?;
    }
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_later_files_override_earlier() {
        let dir = TempDir::new().unwrap();
        let first = write(&dir, "first.env", "A=one\nB=two\n");
        let second = write(&dir, "second.env", "B=override\nC=three\n");

        let set = load_env_files(&[first, second]).unwrap();
        assert_eq!(set.get("A"), Some("one"));
        assert_eq!(set.get("B"), Some("override"));
        assert_eq!(set.get("C"), Some("three"));
        assert_eq!(set.sources().len(), 2);
    }

    #[test]
    fn test_quotes_and_comments() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "app.env",
            "# comment\nQUOTED=\"hello world\"\nSINGLE='x=y'\n",
        );

        let set = load_env_files(&[path]).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.get("QUOTED"), Some("hello world"));
        assert_eq!(set.get("SINGLE"), Some("x=y"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = load_env_files(&["/nonexistent/dir/file.env"]).unwrap_err();
        assert!(matches!(err, CoreError::EnvFile { .. }));
        assert!(err.is_io());
        assert!(err.to_string().contains("/nonexistent/dir/file.env"));
    }

    #[test]
    fn test_malformed_file_is_not_io() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "bad.env", "GOOD=1\nBAD KEY=value\n");

        let err = load_env_files(&[path]).unwrap_err();
        assert!(matches!(
            err,
            CoreError::EnvFile {
                source: dotenvy::Error::LineParse(..),
                ..
            }
        ));
        assert!(!err.is_io());
    }

    #[test]
    fn test_pending_skips_variables_already_set() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "app.env", "SET=file\nUNSET=file\n");
        let set = load_env_files(&[path]).unwrap();

        let pending: Vec<(&str, &str)> = set.pending(|name| name == "SET").collect();
        assert_eq!(pending, vec![("UNSET", "file")]);
    }
}
