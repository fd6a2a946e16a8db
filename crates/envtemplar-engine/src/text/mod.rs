//! Strict text-template dialect
//!
//! Actions are written between configurable delimiters (`{{` and `}}` by
//! default) and hold pipelines of commands: `{{ env "HOME" | upper }}`.
//! The data every template sees is an empty map, so a field reference such
//! as `{{ .HOME }}` always fails with an undefined-reference error; the
//! environment is read through `env`, `envall` and `required` only.
//!
//! Supported actions: text and comments (`{{/* */}}`), trim markers,
//! pipelines with parenthesized sub-pipelines, `$` variables (`:=` and `=`),
//! `if`/`else if`/`else`, `with`/`else with`, `range` (with `else`,
//! `break` and `continue`). Named templates (`define`, `template`,
//! `block`) are rejected at parse time.

mod ast;
mod exec;
mod lexer;
mod parser;

use envtemplar_core::RenderContext;

use crate::engine::Delimiters;
use crate::error::{TemplateError, TemplateErrorKind};
use crate::functions::FunctionSet;

/// A parsed template, ready to execute any number of times
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    source: String,
    delimiters: Delimiters,
    root: Vec<ast::Node>,
}

impl Template {
    /// Parse `source`, resolving function names against `funcs`
    pub fn parse(
        name: &str,
        source: &str,
        delimiters: &Delimiters,
        funcs: &FunctionSet,
    ) -> Result<Self, TemplateError> {
        let tokens = lexer::lex(source, delimiters.left(), delimiters.right()).map_err(|err| {
            TemplateError::at(TemplateErrorKind::SyntaxError, err.message, name, source, err.pos, 1)
        })?;
        let root = parser::Parser::new(name, source, tokens, funcs).parse()?;

        Ok(Self {
            name: name.to_string(),
            source: source.to_string(),
            delimiters: delimiters.clone(),
            root,
        })
    }

    /// Render against `env`, calling functions from `funcs`
    ///
    /// Nothing is returned on failure; partial output is discarded.
    pub fn execute(&self, funcs: &FunctionSet, env: &RenderContext) -> Result<String, TemplateError> {
        exec::State::new(self, funcs, env).run(&self.root)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn delimiters(&self) -> &Delimiters {
        &self.delimiters
    }
}
