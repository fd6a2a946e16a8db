//! CLI error types with exit code handling
//!
//! Every library failure is folded into a `CliError`, which knows the exit
//! code the process should terminate with.

use envtemplar_core::CoreError;
use envtemplar_engine::{EngineError, TemplateError};
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

/// A failure of one envtemplar invocation
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// Bad flag value, unknown engine or missing exec command
    #[error("Configuration error: {message}")]
    #[diagnostic(code(envtemplar::cli::config))]
    Config {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Template parsing or rendering failed
    #[error(transparent)]
    #[diagnostic(transparent)]
    Template(Box<TemplateError>),

    /// IO error (unreadable source, unwritable destination, bad env file)
    #[error("IO error: {message}")]
    #[diagnostic(code(envtemplar::cli::io))]
    Io { message: String },

    /// The command handed to `--exec` could not be resolved or started
    #[error("Failed to execute '{command}': {message}")]
    #[diagnostic(code(envtemplar::cli::exec))]
    Exec { command: String, message: String },

    /// Anything else (logging setup, unexpected failures)
    #[error("{message}")]
    #[diagnostic(code(envtemplar::cli::error))]
    Other { message: String },
}

impl CliError {
    /// Process exit status reported for this failure
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config { .. } => exit_codes::CONFIG_ERROR,
            CliError::Template(_) => exit_codes::TEMPLATE_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Exec { .. } => exit_codes::EXEC_ERROR,
            CliError::Other { .. } => exit_codes::ERROR,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: None,
        }
    }

    /// Configuration error with a `help:` line
    pub fn config_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    pub fn exec(command: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Exec {
            command: command.into(),
            message: err.to_string(),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        if err.is_io() {
            CliError::Io {
                message: err.to_string(),
            }
        } else {
            CliError::config(err.to_string())
        }
    }
}

impl From<EngineError> for CliError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Template(err) => CliError::Template(Box::new(err)),
            EngineError::Core(err) => err.into(),
            other => CliError::config(other.to_string()),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_exit_codes_by_kind() {
        let unknown: CliError = EngineError::UnknownEngine {
            name: "mustache".into(),
        }
        .into();
        assert_eq!(unknown.exit_code(), exit_codes::CONFIG_ERROR);

        let relative: CliError = CoreError::NotAbsolute {
            path: PathBuf::from("app.tmpl"),
        }
        .into();
        assert_eq!(relative.exit_code(), exit_codes::CONFIG_ERROR);

        let template: CliError = EngineError::Template(TemplateError::simple("boom")).into();
        assert_eq!(template.exit_code(), exit_codes::TEMPLATE_ERROR);
        assert_eq!(template.to_string(), "boom");

        let io: CliError = std::io::Error::other("disk full").into();
        assert_eq!(io.exit_code(), exit_codes::IO_ERROR);

        assert_eq!(CliError::exec("foo", "not found").exit_code(), exit_codes::EXEC_ERROR);
    }

    #[test]
    fn test_core_read_error_is_io() {
        let err: CliError = EngineError::Core(CoreError::Read {
            path: PathBuf::from("/missing.tmpl"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        })
        .into();
        assert_eq!(err.exit_code(), exit_codes::IO_ERROR);
        assert!(err.to_string().starts_with("IO error: Failed to read /missing.tmpl"));
    }
}
