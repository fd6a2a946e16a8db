//! Tree-walking evaluator for the text-template dialect

use std::fmt;

use envtemplar_core::RenderContext;

use crate::error::{TemplateError, TemplateErrorKind};
use crate::functions::{CallContext, FuncError, FunctionSet};
use crate::suggestions::suggest_env_access;
use crate::value::Value;

use super::Template;
use super::ast::{Branch, Command, Node, Operand, Pipeline};

type ExecResult<T> = Result<T, TemplateError>;

/// How a list of nodes finished
enum Flow {
    Next,
    Break,
    Continue,
}

/// Longest node text quoted in an error context
const MAX_CONTEXT_LEN: usize = 20;

pub struct State<'a> {
    tmpl: &'a Template,
    funcs: &'a FunctionSet,
    env: &'a RenderContext,
    /// Variable stack; `$` is always the first entry
    vars: Vec<(String, Value)>,
    out: String,
}

impl<'a> State<'a> {
    pub fn new(tmpl: &'a Template, funcs: &'a FunctionSet, env: &'a RenderContext) -> Self {
        Self {
            tmpl,
            funcs,
            env,
            vars: vec![("$".to_string(), Value::empty_map())],
            out: String::with_capacity(tmpl.source().len()),
        }
    }

    /// Walk the whole template with the empty map as data
    pub fn run(mut self, nodes: &[Node]) -> ExecResult<String> {
        let dot = Value::empty_map();
        self.walk_list(&dot, nodes)?;
        Ok(self.out)
    }

    fn context(&self, at: &dyn fmt::Display) -> String {
        let mut node = at.to_string();
        if node.chars().count() > MAX_CONTEXT_LEN {
            node = format!("{}...", node.chars().take(MAX_CONTEXT_LEN).collect::<String>());
        }
        format!("executing {:?} at <{}>", self.tmpl.name(), node)
    }

    fn error(
        &self,
        kind: TemplateErrorKind,
        at: &dyn fmt::Display,
        pos: usize,
        message: impl Into<String>,
    ) -> TemplateError {
        let len = at.to_string().len();
        TemplateError::at(kind, message, self.tmpl.name(), self.tmpl.source(), pos, len)
            .with_context(self.context(at))
    }

    fn walk_list(&mut self, dot: &Value, nodes: &[Node]) -> ExecResult<Flow> {
        for node in nodes {
            match self.walk(dot, node)? {
                Flow::Next => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Next)
    }

    fn walk(&mut self, dot: &Value, node: &Node) -> ExecResult<Flow> {
        match node {
            Node::Text(text) => {
                self.out.push_str(text);
                Ok(Flow::Next)
            }
            Node::Action(pipe) => {
                let value = self.eval_pipeline(dot, pipe)?;
                if pipe.decl.is_empty() {
                    self.print(&value);
                }
                Ok(Flow::Next)
            }
            Node::If(branch) => self.walk_if_or_with(dot, branch, false),
            Node::With(branch) => self.walk_if_or_with(dot, branch, true),
            Node::Range(branch) => self.walk_range(dot, branch),
            Node::Break => Ok(Flow::Break),
            Node::Continue => Ok(Flow::Continue),
        }
    }

    fn print(&mut self, value: &Value) {
        use std::fmt::Write;
        let _ = write!(self.out, "{}", value);
    }

    fn walk_if_or_with(&mut self, dot: &Value, branch: &Branch, rebind: bool) -> ExecResult<Flow> {
        let mark = self.vars.len();
        let value = self.eval_pipeline(dot, &branch.pipe)?;
        let flow = if value.is_truthy() {
            let inner = if rebind { &value } else { dot };
            self.walk_list(inner, &branch.list)
        } else if let Some(else_list) = &branch.else_list {
            self.walk_list(dot, else_list)
        } else {
            Ok(Flow::Next)
        };
        self.vars.truncate(mark);
        flow
    }

    fn walk_range(&mut self, dot: &Value, branch: &Branch) -> ExecResult<Flow> {
        let mark = self.vars.len();
        let value = self.eval_commands(dot, &branch.pipe)?;

        let items: Vec<(Value, Value)> = match value {
            Value::List(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| (Value::Int(i as i64), item))
                .collect(),
            Value::Map(map) => map.into_iter().map(|(k, v)| (Value::String(k), v)).collect(),
            Value::Int(n) => (0..n.max(0)).map(|i| (Value::Int(i), Value::Int(i))).collect(),
            Value::Nil => Vec::new(),
            other => {
                return Err(self.error(
                    TemplateErrorKind::TypeError,
                    &branch.pipe,
                    branch.pipe.pos,
                    format!("range can't iterate over {}", other),
                ));
            }
        };

        if items.is_empty() {
            let flow = match &branch.else_list {
                Some(else_list) => self.walk_list(dot, else_list)?,
                None => Flow::Next,
            };
            self.vars.truncate(mark);
            return Ok(flow);
        }

        for (key, elem) in items {
            let iteration = self.vars.len();
            let bindings: Vec<Value> = match branch.pipe.decl.len() {
                0 => Vec::new(),
                1 => vec![elem.clone()],
                _ => vec![key, elem.clone()],
            };
            for (name, value) in branch.pipe.decl.iter().zip(bindings) {
                if branch.pipe.is_assign {
                    self.set_var(name, value, &branch.pipe, branch.pipe.pos)?;
                } else {
                    self.vars.push((name.clone(), value));
                }
            }

            let flow = self.walk_list(&elem, &branch.list);
            self.vars.truncate(iteration);
            match flow? {
                Flow::Break => break,
                Flow::Next | Flow::Continue => {}
            }
        }

        self.vars.truncate(mark);
        Ok(Flow::Next)
    }

    /// Evaluate the commands, then bind declared variables
    fn eval_pipeline(&mut self, dot: &Value, pipe: &Pipeline) -> ExecResult<Value> {
        let value = self.eval_commands(dot, pipe)?;
        for name in &pipe.decl {
            if pipe.is_assign {
                self.set_var(name, value.clone(), pipe, pipe.pos)?;
            } else {
                self.vars.push((name.clone(), value.clone()));
            }
        }
        Ok(value)
    }

    /// Feed each command's result into the next one as its final argument
    fn eval_commands(&mut self, dot: &Value, pipe: &Pipeline) -> ExecResult<Value> {
        let mut value = None;
        for cmd in &pipe.cmds {
            value = Some(self.eval_command(dot, cmd, value)?);
        }
        Ok(value.unwrap_or_default())
    }

    fn eval_command(&mut self, dot: &Value, cmd: &Command, last: Option<Value>) -> ExecResult<Value> {
        let Some((first, rest)) = cmd.args.split_first() else {
            return Ok(Value::Nil);
        };
        let invoked = !rest.is_empty() || last.is_some();

        match first {
            Operand::Function { pos, name } => self.eval_function(dot, name, cmd, *pos, rest, last),
            Operand::Field { pos, chain } => {
                self.eval_field_chain(dot.clone(), chain, cmd, *pos, invoked)
            }
            Operand::Variable { pos, name, chain } => {
                let value = self.var(name, *pos, cmd)?;
                if chain.is_empty() {
                    self.not_a_function(first, cmd, invoked)?;
                    return Ok(value);
                }
                self.eval_field_chain(value, chain, cmd, *pos, invoked)
            }
            Operand::Chain { pos, node, fields } => {
                let value = self.eval_arg(dot, node)?;
                self.eval_field_chain(value, fields, cmd, *pos, invoked)
            }
            Operand::Pipe(pipe) => {
                self.not_a_function(first, cmd, invoked)?;
                self.eval_pipeline(dot, pipe)
            }
            Operand::Dot { .. } => {
                self.not_a_function(first, cmd, invoked)?;
                Ok(dot.clone())
            }
            Operand::Literal { value, .. } => {
                self.not_a_function(first, cmd, invoked)?;
                Ok(value.clone())
            }
        }
    }

    fn not_a_function(&self, operand: &Operand, cmd: &Command, invoked: bool) -> ExecResult<()> {
        if invoked {
            return Err(self.error(
                TemplateErrorKind::InvalidOperation,
                cmd,
                operand.pos(),
                format!("can't give argument to non-function {}", operand),
            ));
        }
        Ok(())
    }

    /// Evaluate an operand in argument position
    fn eval_arg(&mut self, dot: &Value, arg: &Operand) -> ExecResult<Value> {
        match arg {
            Operand::Dot { .. } => Ok(dot.clone()),
            Operand::Literal { value, .. } => Ok(value.clone()),
            Operand::Field { pos, chain } => self.eval_field_chain(dot.clone(), chain, arg, *pos, false),
            Operand::Variable { pos, name, chain } => {
                let value = self.var(name, *pos, arg)?;
                self.eval_field_chain(value, chain, arg, *pos, false)
            }
            Operand::Chain { pos, node, fields } => {
                let value = self.eval_arg(dot, node)?;
                self.eval_field_chain(value, fields, arg, *pos, false)
            }
            Operand::Pipe(pipe) => self.eval_pipeline(dot, pipe),
            // A bare function name in argument position is called without arguments
            Operand::Function { pos, name } => self.eval_function(dot, name, arg, *pos, &[], None),
        }
    }

    fn eval_function(
        &mut self,
        dot: &Value,
        name: &str,
        at: &dyn fmt::Display,
        pos: usize,
        args: &[Operand],
        last: Option<Value>,
    ) -> ExecResult<Value> {
        let funcs = self.funcs;
        let Some(func) = funcs.get(name) else {
            return Err(self.error(
                TemplateErrorKind::UnknownFunction,
                at,
                pos,
                format!("function {:?} not defined", name),
            ));
        };

        let mut argv = Vec::with_capacity(args.len() + 1);
        for arg in args {
            argv.push(self.eval_arg(dot, arg)?);
        }
        argv.extend(last);

        let ctx = CallContext {
            env: self.env,
            template: self.tmpl.name(),
        };
        func.call(&ctx, &argv).map_err(|err| {
            let kind = match &err {
                FuncError::RequiredValueMissing(_) => TemplateErrorKind::RequiredValueMissing,
                FuncError::TypeMismatch(_) => TemplateErrorKind::TypeError,
                FuncError::Invalid(_) => TemplateErrorKind::InvalidOperation,
            };
            let context = format!("{}: error calling {}", self.context(at), name);
            let len = at.to_string().len();
            TemplateError::at(kind, err.to_string(), self.tmpl.name(), self.tmpl.source(), pos, len)
                .with_context(context)
        })
    }

    /// Follow `.A.B` from `receiver`; only the last field may be invoked
    fn eval_field_chain(
        &self,
        receiver: Value,
        chain: &[String],
        at: &dyn fmt::Display,
        pos: usize,
        invoked: bool,
    ) -> ExecResult<Value> {
        let mut current = receiver;
        for (i, field) in chain.iter().enumerate() {
            if invoked && i + 1 == chain.len() {
                return Err(self.error(
                    TemplateErrorKind::InvalidOperation,
                    at,
                    pos,
                    format!("{} is not a method but has arguments", field),
                ));
            }
            current = self.eval_field(current, field, at, pos)?;
        }
        Ok(current)
    }

    fn eval_field(&self, receiver: Value, field: &str, at: &dyn fmt::Display, pos: usize) -> ExecResult<Value> {
        match receiver {
            Value::Map(mut map) => match map.remove(field) {
                Some(value) => Ok(value),
                None => Err(self
                    .error(
                        TemplateErrorKind::UndefinedVariable,
                        at,
                        pos,
                        format!("map has no entry for key {:?}", field),
                    )
                    .with_suggestion(self.env_hint(field))),
            },
            Value::Nil => Err(self
                .error(
                    TemplateErrorKind::UndefinedVariable,
                    at,
                    pos,
                    format!("nil data; no entry for key {:?}", field),
                )
                .with_suggestion(self.env_hint(field))),
            other => Err(self.error(
                TemplateErrorKind::TypeError,
                at,
                pos,
                format!("can't evaluate field {} in type {}", field, other.type_name()),
            )),
        }
    }

    fn env_hint(&self, field: &str) -> String {
        let delims = self.tmpl.delimiters();
        suggest_env_access(field, self.env, delims.left(), delims.right())
    }

    fn var(&self, name: &str, pos: usize, at: &dyn fmt::Display) -> ExecResult<Value> {
        self.vars
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value.clone())
            .ok_or_else(|| {
                self.error(
                    TemplateErrorKind::UndefinedVariable,
                    at,
                    pos,
                    format!("undefined variable: {}", name),
                )
            })
    }

    fn set_var(&mut self, name: &str, value: Value, at: &dyn fmt::Display, pos: usize) -> ExecResult<()> {
        if let Some(slot) = self.vars.iter_mut().rev().find(|(n, _)| n == name) {
            slot.1 = value;
            return Ok(());
        }
        Err(self.error(
            TemplateErrorKind::UndefinedVariable,
            at,
            pos,
            format!("undefined variable: {}", name),
        ))
    }
}
