//! Engine selection and the two rendering engines
//!
//! Both engines implement [`TemplateEngine`]: `configure` takes the template
//! text and parses it, `render` evaluates it against a [`RenderContext`].
//! [`EngineKind::from_name`] maps a configuration name to an engine and
//! rejects unknown names instead of falling back to a default.

use std::fmt;
use std::str::FromStr;

use envtemplar_core::RenderContext;
use minijinja::{AutoEscape, Environment, UndefinedBehavior};

use crate::error::{EngineError, Result, TemplateError};
use crate::functions::FunctionSet;
use crate::text::Template;

/// Action delimiters of the text-template dialect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delimiters {
    left: String,
    right: String,
}

impl Delimiters {
    pub const DEFAULT_LEFT: &'static str = "{{";
    pub const DEFAULT_RIGHT: &'static str = "}}";

    /// An empty delimiter selects the default for that side
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        let or_default = |value: String, default: &str| {
            if value.is_empty() {
                default.to_string()
            } else {
                value
            }
        };
        Self {
            left: or_default(left.into(), Self::DEFAULT_LEFT),
            right: or_default(right.into(), Self::DEFAULT_RIGHT),
        }
    }

    pub fn left(&self) -> &str {
        &self.left
    }

    pub fn right(&self) -> &str {
        &self.right
    }

    pub fn is_default(&self) -> bool {
        self.left == Self::DEFAULT_LEFT && self.right == Self::DEFAULT_RIGHT
    }
}

impl Default for Delimiters {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LEFT, Self::DEFAULT_RIGHT)
    }
}

/// What an engine needs to parse one template
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub template_source: String,
    /// Used in diagnostics only
    pub template_name: String,
    /// Ignored by the permissive engine
    pub delimiters: Delimiters,
}

impl EngineConfig {
    pub fn new(template_name: impl Into<String>, template_source: impl Into<String>) -> Self {
        Self {
            template_source: template_source.into(),
            template_name: template_name.into(),
            delimiters: Delimiters::default(),
        }
    }

    pub fn with_delimiters(mut self, delimiters: Delimiters) -> Self {
        self.delimiters = delimiters;
        self
    }
}

/// Per-run switches passed down from the command line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Number of `-v` flags
    pub verbosity: u8,
    /// Print every rendered template to stdout
    pub debug_templates: bool,
}

/// The two supported dialects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineKind {
    /// Strict text-template dialect
    #[default]
    Text,
    /// Jinja2-style dialect (MiniJinja) with environment variables as top-level names
    Pongo,
}

impl EngineKind {
    /// Accepted configuration names, in the order of the variants
    pub const NAMES: &'static [&'static str] = &["text/template", "pongo"];

    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "text/template" => Ok(EngineKind::Text),
            "pongo" => Ok(EngineKind::Pongo),
            _ => Err(EngineError::UnknownEngine {
                name: name.to_string(),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EngineKind::Text => Self::NAMES[0],
            EngineKind::Pongo => Self::NAMES[1],
        }
    }

    /// A fresh, unconfigured engine of this kind
    pub fn create(&self, options: RenderOptions) -> Result<Box<dyn TemplateEngine>> {
        Ok(match self {
            EngineKind::Text => Box::new(TextEngine::new(options)?),
            EngineKind::Pongo => Box::new(PongoEngine::new(options)),
        })
    }
}

impl FromStr for EngineKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s)
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A template dialect
pub trait TemplateEngine {
    /// Parse the template; syntax errors surface here, before any evaluation
    fn configure(&mut self, config: EngineConfig) -> Result<()>;

    /// Evaluate the configured template against `ctx`
    fn render(&self, ctx: &RenderContext) -> Result<String>;
}

/// Configure a fresh engine of `kind` and render once
pub fn render(
    kind: EngineKind,
    config: EngineConfig,
    ctx: &RenderContext,
    options: RenderOptions,
) -> Result<String> {
    let mut engine = kind.create(options)?;
    engine.configure(config)?;
    engine.render(ctx)
}

/// The strict text-template engine
pub struct TextEngine {
    funcs: FunctionSet,
    template: Option<Template>,
    options: RenderOptions,
}

impl TextEngine {
    /// Engine with the builtins, helper library and environment library
    pub fn new(options: RenderOptions) -> Result<Self> {
        Ok(Self::with_functions(FunctionSet::standard()?, options))
    }

    pub fn with_functions(funcs: FunctionSet, options: RenderOptions) -> Self {
        Self {
            funcs,
            template: None,
            options,
        }
    }
}

impl TemplateEngine for TextEngine {
    fn configure(&mut self, config: EngineConfig) -> Result<()> {
        let template = Template::parse(
            &config.template_name,
            &config.template_source,
            &config.delimiters,
            &self.funcs,
        )?;
        tracing::debug!(
            template = %config.template_name,
            left = config.delimiters.left(),
            right = config.delimiters.right(),
            "parsed template"
        );
        self.template = Some(template);
        Ok(())
    }

    fn render(&self, ctx: &RenderContext) -> Result<String> {
        let template = self.template.as_ref().ok_or(EngineError::NotConfigured)?;
        if self.options.verbosity >= 3 {
            tracing::trace!(template = template.name(), vars = ctx.len(), "rendering");
        }
        Ok(template.execute(&self.funcs, ctx)?)
    }
}

/// The permissive engine, backed by MiniJinja
pub struct PongoEngine {
    env: Environment<'static>,
    template: Option<(String, String)>,
    options: RenderOptions,
}

impl PongoEngine {
    pub fn new(options: RenderOptions) -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Lenient);
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.set_keep_trailing_newline(true);
        Self {
            env,
            template: None,
            options,
        }
    }
}

impl TemplateEngine for PongoEngine {
    fn configure(&mut self, config: EngineConfig) -> Result<()> {
        if !config.delimiters.is_default() {
            tracing::warn!(
                template = %config.template_name,
                "custom delimiters are not supported by the pongo engine; ignoring them"
            );
        }

        let EngineConfig {
            template_source,
            template_name,
            ..
        } = config;
        self.env
            .add_template_owned(template_name.clone(), template_source.clone())
            .map_err(|e| TemplateError::from_minijinja(e, &template_name, &template_source))?;
        self.template = Some((template_name, template_source));
        Ok(())
    }

    fn render(&self, ctx: &RenderContext) -> Result<String> {
        let (name, source) = self.template.as_ref().ok_or(EngineError::NotConfigured)?;
        if self.options.verbosity >= 3 {
            tracing::debug!(context = ?ctx.as_map(), "using context");
        }

        let tmpl = self
            .env
            .get_template(name)
            .map_err(|e| TemplateError::from_minijinja(e, name, source))?;
        Ok(tmpl
            .render(ctx)
            .map_err(|e| TemplateError::from_minijinja(e, name, source))?)
    }
}
