//! envtemplar Engine - environment-driven configuration templates
//!
//! This crate provides:
//! - A strict text-template dialect where `{{ .Field }}` is always an error
//!   and the environment is read through `env`, `envall` and `required`
//! - A permissive Jinja2-style dialect (MiniJinja) with environment
//!   variables as top-level names
//! - Capability sets of template functions with collision detection
//! - A sequential, fail-fast batch driver
//! - Source-annotated diagnostics with suggestions

pub mod batch;
pub mod builtins;
pub mod engine;
pub mod error;
pub mod functions;
pub mod stdlib;
pub mod suggestions;
pub mod text;
pub mod value;

pub use batch::BatchDriver;
pub use engine::{
    Delimiters, EngineConfig, EngineKind, PongoEngine, RenderOptions, TemplateEngine, TextEngine,
    render,
};
pub use error::{EngineError, ErrorKind, Result, TemplateError, TemplateErrorKind};
pub use functions::{Arity, CallContext, FuncError, FunctionSet};
pub use value::Value;
