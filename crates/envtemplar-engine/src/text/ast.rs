//! Parse tree of the text-template dialect

use std::fmt;

use crate::builtins::quote;
use crate::value::Value;

/// A node of a parsed template body
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal text copied to the output
    Text(String),
    /// `{{ pipeline }}`; prints its value unless it declares variables
    Action(Pipeline),
    If(Branch),
    With(Branch),
    Range(Branch),
    Break,
    Continue,
}

/// Shared shape of `if`, `with` and `range`
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub pipe: Pipeline,
    pub list: Vec<Node>,
    pub else_list: Option<Vec<Node>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    pub pos: usize,
    /// Declared or assigned variable names, `$` prefix included
    pub decl: Vec<String>,
    /// `=` rather than `:=`
    pub is_assign: bool,
    pub cmds: Vec<Command>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub pos: usize,
    pub args: Vec<Operand>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// `.`
    Dot { pos: usize },
    /// `.A.B`
    Field { pos: usize, chain: Vec<String> },
    /// `$x.A.B`
    Variable {
        pos: usize,
        name: String,
        chain: Vec<String>,
    },
    /// `(pipeline).A.B`
    Chain {
        pos: usize,
        node: Box<Operand>,
        fields: Vec<String>,
    },
    /// Parenthesized pipeline
    Pipe(Box<Pipeline>),
    /// Function name
    Function { pos: usize, name: String },
    /// String, number, boolean or `nil`
    Literal { pos: usize, value: Value },
}

impl Operand {
    pub fn pos(&self) -> usize {
        match self {
            Operand::Dot { pos }
            | Operand::Field { pos, .. }
            | Operand::Variable { pos, .. }
            | Operand::Chain { pos, .. }
            | Operand::Function { pos, .. }
            | Operand::Literal { pos, .. } => *pos,
            Operand::Pipe(pipe) => pipe.pos,
        }
    }

    /// Operands that can only produce a value, never be invoked
    pub fn is_constant(&self) -> bool {
        matches!(self, Operand::Dot { .. } | Operand::Literal { .. })
    }
}

fn write_chain(f: &mut fmt::Formatter<'_>, chain: &[String]) -> fmt::Result {
    for field in chain {
        write!(f, ".{}", field)?;
    }
    Ok(())
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Dot { .. } => f.write_str("."),
            Operand::Field { chain, .. } => write_chain(f, chain),
            Operand::Variable { name, chain, .. } => {
                f.write_str(name)?;
                write_chain(f, chain)
            }
            Operand::Chain { node, fields, .. } => {
                write!(f, "{}", node)?;
                write_chain(f, fields)
            }
            Operand::Pipe(pipe) => write!(f, "({})", pipe),
            Operand::Function { name, .. } => f.write_str(name),
            Operand::Literal { value, .. } => match value {
                Value::String(s) => f.write_str(&quote(s)),
                Value::Nil => f.write_str("nil"),
                other => write!(f, "{}", other),
            },
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", arg)?;
        }
        Ok(())
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.decl.is_empty() {
            f.write_str(&self.decl.join(", "))?;
            f.write_str(if self.is_assign { " = " } else { " := " })?;
        }
        for (i, cmd) in self.cmds.iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            write!(f, "{}", cmd)?;
        }
        Ok(())
    }
}
