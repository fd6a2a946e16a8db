//! Template jobs: one source rendered into one destination

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{CoreError, Result};
use crate::fs::ensure_absolute;

/// A validated (source, destination) pair
///
/// Both paths are guaranteed absolute. Jobs are immutable and consumed
/// once by the batch driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateJob {
    source: PathBuf,
    destination: PathBuf,
}

impl TemplateJob {
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Result<Self> {
        let source = source.into();
        let destination = destination.into();
        ensure_absolute(&source)?;
        ensure_absolute(&destination)?;
        Ok(Self {
            source,
            destination,
        })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Base name of the source file, used to label diagnostics
    pub fn template_name(&self) -> String {
        self.source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.source.to_string_lossy().into_owned())
    }
}

/// Parses `SOURCE:DESTINATION`, trimming whitespace around each side.
///
/// Exactly one `:` is allowed.
impl FromStr for TemplateJob {
    type Err = CoreError;

    fn from_str(value: &str) -> Result<Self> {
        let parts: Vec<&str> = value.split(':').collect();
        match parts.as_slice() {
            [source, destination] if !source.trim().is_empty() && !destination.trim().is_empty() => {
                Self::new(source.trim(), destination.trim())
            }
            _ => Err(CoreError::InvalidTemplatePair {
                value: value.to_string(),
            }),
        }
    }
}

impl fmt::Display for TemplateJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {}",
            self.source.display(),
            self.destination.display()
        )
    }
}
