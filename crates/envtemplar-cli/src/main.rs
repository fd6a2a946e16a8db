//! envtemplar - render configuration templates from the environment, then exec

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser};
use console::style;
use envtemplar_core::{TemplateJob, load_env_files};
use envtemplar_engine::{BatchDriver, Delimiters, RenderOptions};
use tracing_subscriber::EnvFilter;

mod error;
mod exec;
mod exit_codes;

use error::{CliError, Result};

#[derive(Parser, Debug)]
#[command(name = "envtemplar")]
#[command(author = "envtemplar Contributors")]
#[command(version)]
#[command(
    about = "Render configuration templates from environment variables",
    long_about = "Render configuration templates from environment variables.\n\n\
                  Every --template SRC:DEST pair is rendered in order; the first \
                  failure stops the batch. With --exec, the remaining arguments \
                  replace this process once every template has been written."
)]
struct Cli {
    /// Template to render, as absolute SOURCE:DESTINATION (repeatable)
    #[arg(short = 't', long = "template", value_name = "SRC:DEST")]
    templates: Vec<TemplateJob>,

    /// Template engine: text/template or pongo
    #[arg(long, default_value = "text/template")]
    engine: String,

    /// Env file to load before rendering (repeatable, later files win)
    #[arg(long = "env-file", value_name = "PATH")]
    env_files: Vec<PathBuf>,

    /// Left action delimiter for text/template (empty means `{{`)
    #[arg(long, default_value = "", hide_default_value = true)]
    delim_left: String,

    /// Right action delimiter for text/template (empty means `}}`)
    #[arg(long, default_value = "", hide_default_value = true)]
    delim_right: String,

    /// Print every rendered template to stdout, followed by a NUL line
    #[arg(long)]
    debug_templates: bool,

    /// Replace this process with COMMAND after rendering
    #[arg(long)]
    exec: bool,

    /// Increase logging verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Command and arguments to execute with --exec
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "COMMAND")]
    command: Vec<String>,
}

fn main() -> ExitCode {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => exit_code(exit_codes::SUCCESS),
        Err(err) => {
            let code = err.exit_code();
            eprintln!("{:?}", miette::Report::new(err));
            eprintln!("{}", style(format!("envtemplar: exiting with status {code}")).red());
            exit_code(code)
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    init_tracing(cli.verbose)?;

    if cli.exec {
        exec::program_and_args(&cli.command)?;
    } else if !cli.command.is_empty() {
        tracing::warn!(args = ?cli.command, "ignoring trailing arguments without --exec");
    }

    if !cli.env_files.is_empty() {
        apply_env_files(&cli.env_files)?;
    }

    let options = RenderOptions {
        verbosity: cli.verbose,
        debug_templates: cli.debug_templates,
    };
    let delimiters = Delimiters::new(&cli.delim_left, &cli.delim_right);
    BatchDriver::new(&cli.engine, delimiters, options)?.render_all(&cli.templates)?;

    if cli.exec {
        match exec::replace_process(&cli.command)? {}
    }
    Ok(())
}

/// Export env-file variables that the process environment does not define yet
fn apply_env_files(paths: &[PathBuf]) -> Result<()> {
    let files = load_env_files(paths)?;
    let pending: Vec<(String, String)> = files
        .pending(|name| std::env::var_os(name).is_some())
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();

    tracing::info!(
        files = files.sources().len(),
        exported = pending.len(),
        "applying env files"
    );
    for (name, value) in pending {
        // SAFETY: called from main before any thread is spawned
        unsafe { std::env::set_var(name, value) };
    }
    Ok(())
}

fn init_tracing(verbose: u8) -> Result<()> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|err| CliError::Other {
            message: format!("Failed to initialise logging: {err}"),
        })
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
