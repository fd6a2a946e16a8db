//! envtemplar Core - data model shared by the engine and the CLI
//!
//! This crate provides the foundational types used throughout envtemplar:
//! - `RenderContext`: read-only snapshot of the process environment
//! - `TemplateJob`: one validated source/destination pair
//! - `envfile`: loading of supplementary dotenv files
//! - `fs`: absolute-path guarded file reads and writes

pub mod context;
pub mod envfile;
pub mod error;
pub mod fs;
pub mod job;

pub use context::RenderContext;
pub use envfile::{EnvFileSet, load_env_files};
pub use error::{CoreError, Result};
pub use job::TemplateJob;
