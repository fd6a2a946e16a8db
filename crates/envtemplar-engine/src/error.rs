//! Engine error types with source-annotated diagnostics

use std::fmt;

use envtemplar_core::CoreError;
use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use crate::suggestions::{extract_quoted_name, suggest_unknown_filter, suggest_unknown_function};

/// Everything that can stop an engine from producing output
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("Unknown template engine '{name}' (expected one of: {})", crate::engine::EngineKind::NAMES.join(", "))]
    UnknownEngine { name: String },

    #[error("Function `{name}` is provided by both the `{first}` and `{second}` libraries")]
    FunctionCollision {
        name: String,
        first: &'static str,
        second: &'static str,
    },

    #[error("Engine was used before a template was configured")]
    NotConfigured,

    #[error(transparent)]
    Core(#[from] CoreError),
}

/// The failure categories every engine error maps onto
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unknown engine name, malformed source/destination pair, function collision
    Configuration,
    /// A path handed to the engine is not absolute
    Path,
    /// Template text failed to parse
    TemplateSyntax,
    /// A field or variable reference has no bound value
    UndefinedReference,
    /// `require` or `required` received an empty or nil value
    RequiredValueMissing,
    /// A value has an unsupported shape for the operation
    TypeMismatch,
    /// Any other failure raised while evaluating (division by zero, bad regex, ...)
    Evaluation,
    /// Reading a source or writing a destination failed
    Io,
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Template(err) => err.kind.category(),
            EngineError::UnknownEngine { .. }
            | EngineError::FunctionCollision { .. }
            | EngineError::NotConfigured => ErrorKind::Configuration,
            EngineError::Core(err) if err.is_io() => ErrorKind::Io,
            EngineError::Core(CoreError::NotAbsolute { .. }) => ErrorKind::Path,
            EngineError::Core(_) => ErrorKind::Configuration,
        }
    }

    /// The template error, if this failure came from parsing or evaluation
    pub fn as_template(&self) -> Option<&TemplateError> {
        match self {
            EngineError::Template(err) => Some(err),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// What went wrong inside a template, before it is folded into an [`ErrorKind`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateErrorKind {
    SyntaxError,
    UnknownFunction,
    UndefinedVariable,
    RequiredValueMissing,
    TypeError,
    InvalidOperation,
    Other,
}

impl TemplateErrorKind {
    pub fn category(&self) -> ErrorKind {
        match self {
            Self::SyntaxError | Self::UnknownFunction => ErrorKind::TemplateSyntax,
            Self::UndefinedVariable => ErrorKind::UndefinedReference,
            Self::RequiredValueMissing => ErrorKind::RequiredValueMissing,
            Self::TypeError => ErrorKind::TypeMismatch,
            Self::InvalidOperation | Self::Other => ErrorKind::Evaluation,
        }
    }
}

/// A parse or evaluation failure located in a template source
///
/// `message` holds the bare failure text (for `required` this is exactly the
/// caller-supplied message); `Display` prefixes it with the template name,
/// position and the construct being executed.
#[derive(Debug, Diagnostic, Clone)]
#[diagnostic(code(envtemplar::template::render))]
pub struct TemplateError {
    pub message: String,

    pub kind: TemplateErrorKind,

    /// Name of the template (source file base name)
    pub template_name: String,

    /// 1-based line of the failure
    pub line: Option<usize>,

    /// 1-based column of the failure
    pub column: Option<usize>,

    #[source_code]
    pub src: NamedSource<String>,

    #[label("here")]
    pub span: Option<SourceSpan>,

    /// "Did you mean" or usage hint
    #[help]
    pub suggestion: Option<String>,

    /// Construct being executed, e.g. `executing "app.conf" at <.Port>`
    pub context: Option<String>,
}

impl std::error::Error for TemplateError {}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.line, self.column) {
            (Some(line), Some(column)) => {
                write!(f, "template: {}:{}:{}: ", self.template_name, line, column)?
            }
            (Some(line), None) => write!(f, "template: {}:{}: ", self.template_name, line)?,
            _ => {}
        }
        if let Some(context) = &self.context {
            write!(f, "{}: ", context)?;
        }
        f.write_str(&self.message)
    }
}

impl TemplateError {
    /// Create an error pointing at `offset..offset + len` in `template_source`
    pub fn at(
        kind: TemplateErrorKind,
        message: impl Into<String>,
        template_name: &str,
        template_source: &str,
        offset: usize,
        len: usize,
    ) -> Self {
        let offset = offset.min(template_source.len());
        let (line, column) = line_col(template_source, offset);
        let len = len.min(template_source.len() - offset);

        Self {
            message: message.into(),
            kind,
            template_name: template_name.to_string(),
            line: Some(line),
            column: Some(column),
            src: NamedSource::new(template_name, template_source.to_string()),
            span: Some((offset, len).into()),
            suggestion: None,
            context: None,
        }
    }

    /// Map a minijinja failure from the permissive engine
    pub fn from_minijinja(
        err: minijinja::Error,
        template_name: &str,
        template_source: &str,
    ) -> Self {
        let kind = minijinja_kind(&err);
        let line = err.line();

        let span = err
            .range()
            .map(|range| SourceSpan::from((range.start, range.len())))
            .or_else(|| line.and_then(|line| line_span(template_source, line)));

        let message = err
            .detail()
            .map(str::to_string)
            .unwrap_or_else(|| err.kind().to_string());
        let suggestion = generate_suggestion(&message, kind);

        Self {
            message,
            kind,
            template_name: template_name.to_string(),
            line,
            column: None,
            src: NamedSource::new(template_name, template_source.to_string()),
            span,
            suggestion,
            context: None,
        }
    }

    /// An error with no source attached
    pub fn simple(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: TemplateErrorKind::Other,
            template_name: "<unknown>".to_string(),
            line: None,
            column: None,
            src: NamedSource::new("<unknown>", String::new()),
            span: None,
            suggestion: None,
            context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn kind(&self) -> TemplateErrorKind {
        self.kind
    }
}

/// 1-based line and column (in characters) of a byte offset
pub(crate) fn line_col(source: &str, offset: usize) -> (usize, usize) {
    let before = &source[..offset.min(source.len())];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    let column = before[line_start..].chars().count() + 1;
    (line, column)
}

fn minijinja_kind(err: &minijinja::Error) -> TemplateErrorKind {
    match err.kind() {
        minijinja::ErrorKind::SyntaxError => TemplateErrorKind::SyntaxError,
        minijinja::ErrorKind::UnknownFilter
        | minijinja::ErrorKind::UnknownFunction
        | minijinja::ErrorKind::UnknownTest => TemplateErrorKind::UnknownFunction,
        minijinja::ErrorKind::UndefinedError => TemplateErrorKind::UndefinedVariable,
        minijinja::ErrorKind::NonPrimitive | minijinja::ErrorKind::NonKey => {
            TemplateErrorKind::TypeError
        }
        minijinja::ErrorKind::InvalidOperation => TemplateErrorKind::InvalidOperation,
        _ => TemplateErrorKind::Other,
    }
}

/// Span covering the 1-based `line` of `source`, without its newline
fn line_span(source: &str, line: usize) -> Option<SourceSpan> {
    let start: usize = source.split_inclusive('\n').take(line.checked_sub(1)?).map(str::len).sum();
    let text = source.split_inclusive('\n').nth(line - 1)?;
    Some((start, text.trim_end_matches(['\r', '\n']).len()).into())
}

fn generate_suggestion(message: &str, kind: TemplateErrorKind) -> Option<String> {
    if kind != TemplateErrorKind::UnknownFunction {
        return None;
    }
    let name = extract_quoted_name(message)?;
    if message.contains("filter") {
        suggest_unknown_filter(&name)
    } else {
        suggest_unknown_function(&name, crate::suggestions::JINJA_FUNCTIONS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_col() {
        let src = "first\nsecond {{ x }}\nthird";
        assert_eq!(line_col(src, 0), (1, 1));
        assert_eq!(line_col(src, 6), (2, 1));
        assert_eq!(line_col(src, 13), (2, 8));
    }

    #[test]
    fn test_display_includes_location_and_context() {
        let err = TemplateError::at(
            TemplateErrorKind::RequiredValueMissing,
            "message",
            "app.conf",
            "K={{ required \"message\" \"\" }}",
            5,
            8,
        )
        .with_context("executing \"app.conf\" at <required>: error calling required");

        assert_eq!(err.message, "message");
        assert_eq!(
            err.to_string(),
            "template: app.conf:1:6: executing \"app.conf\" at <required>: error calling required: message"
        );
    }

    #[test]
    fn test_span_is_clamped_to_source() {
        let err = TemplateError::at(TemplateErrorKind::SyntaxError, "x", "t", "abc", 10, 5);
        assert_eq!(err.span, Some(SourceSpan::from((3, 0))));
        assert_eq!(err.line, Some(1));
    }

    #[test]
    fn test_line_span() {
        let src = "a\nbcd\r\nef";
        assert_eq!(line_span(src, 2), Some(SourceSpan::from((2, 3))));
        assert_eq!(line_span(src, 3), Some(SourceSpan::from((7, 2))));
        assert_eq!(line_span(src, 0), None);
        assert_eq!(line_span(src, 4), None);
    }

    #[test]
    fn test_kind_categories() {
        assert_eq!(
            TemplateErrorKind::UnknownFunction.category(),
            ErrorKind::TemplateSyntax
        );
        assert_eq!(
            TemplateErrorKind::UndefinedVariable.category(),
            ErrorKind::UndefinedReference
        );

        let err = EngineError::from(CoreError::NotAbsolute {
            path: "rel".into(),
        });
        assert_eq!(err.kind(), ErrorKind::Path);

        let dir = tempfile::TempDir::new().unwrap();
        let malformed = dir.path().join("app.env");
        std::fs::write(&malformed, "BAD KEY=value\n").unwrap();
        let err = EngineError::from(envtemplar_core::load_env_files(&[&malformed]).unwrap_err());
        assert_eq!(err.kind(), ErrorKind::Configuration);

        let missing = dir.path().join("missing.env");
        let err = EngineError::from(envtemplar_core::load_env_files(&[&missing]).unwrap_err());
        assert_eq!(err.kind(), ErrorKind::Io);

        let err = EngineError::UnknownEngine {
            name: "jinja".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("text/template, pongo"));
    }
}
