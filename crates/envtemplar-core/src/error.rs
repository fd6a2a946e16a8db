//! Core error types

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Path '{}' is not absolute", path.display())]
    NotAbsolute { path: PathBuf },

    #[error("Invalid template option '{value}': expected SOURCE:DESTINATION")]
    InvalidTemplatePair { value: String },

    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to load env file {}: {source}", path.display())]
    EnvFile {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },
}

impl CoreError {
    /// Whether the filesystem failed, as opposed to the input being invalid
    ///
    /// An env file that was read but does not parse is invalid input.
    pub fn is_io(&self) -> bool {
        match self {
            CoreError::Read { .. } | CoreError::Write { .. } => true,
            CoreError::EnvFile { source, .. } => matches!(source, dotenvy::Error::Io(_)),
            CoreError::NotAbsolute { .. } | CoreError::InvalidTemplatePair { .. } => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
