//! Hand the process over to a downstream command once rendering succeeded

use std::convert::Infallible;
use std::path::PathBuf;
use std::process::Command;

use crate::error::{CliError, Result};

/// Resolve `program` through `PATH` the way a shell would
pub fn resolve(program: &str) -> Result<PathBuf> {
    which::which(program).map_err(|err| CliError::exec(program, err))
}

/// Replace the current process image with `command`
///
/// The child inherits the full environment, including variables loaded
/// from env files. Only returns on failure.
#[cfg(unix)]
pub fn replace_process(command: &[String]) -> Result<Infallible> {
    use std::os::unix::process::CommandExt;

    let (program, args) = program_and_args(command)?;
    let path = resolve(program)?;
    tracing::info!(command = %path.display(), args = args.len(), "executing");

    let err = Command::new(&path).arg0(program).args(args).exec();
    Err(CliError::exec(path.display().to_string(), err))
}

/// Run `command` to completion and exit with its status
#[cfg(not(unix))]
pub fn replace_process(command: &[String]) -> Result<Infallible> {
    let (program, args) = program_and_args(command)?;
    let path = resolve(program)?;
    tracing::info!(command = %path.display(), args = args.len(), "executing");

    let status = Command::new(&path)
        .args(args)
        .status()
        .map_err(|err| CliError::exec(path.display().to_string(), err))?;
    std::process::exit(status.code().unwrap_or(crate::exit_codes::ERROR))
}

/// Split `command` into the program and its arguments
///
/// An empty command is a configuration error.
pub fn program_and_args(command: &[String]) -> Result<(&String, &[String])> {
    command.split_first().ok_or_else(|| {
        CliError::config_with_help(
            "Missing command to execute!",
            "pass the command after the flags, e.g. `envtemplar -t /in:/out --exec -- nginx -g 'daemon off;'`",
        )
    })
}
