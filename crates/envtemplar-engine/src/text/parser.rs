//! Recursive-descent parser for the text-template dialect
//!
//! Besides building the tree, the parser resolves every function name
//! against the [`FunctionSet`] and every `$variable` against the scopes
//! open at that point, so both mistakes surface before anything renders.

use crate::error::{TemplateError, TemplateErrorKind};
use crate::functions::FunctionSet;
use crate::suggestions::suggest_unknown_function;

use super::ast::{Branch, Command, Node, Operand, Pipeline};
use super::lexer::{Keyword, Token, TokenKind};

type ParseResult<T> = Result<T, TemplateError>;

/// How a list of nodes was closed
enum ListEnd {
    Eof,
    End,
    /// Positioned right after the `else` keyword
    Else { pos: usize },
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Control {
    If,
    With,
    Range,
}

impl Control {
    fn name(self) -> &'static str {
        match self {
            Control::If => "if",
            Control::With => "with",
            Control::Range => "range",
        }
    }
}

pub struct Parser<'a> {
    name: &'a str,
    source: &'a str,
    tokens: Vec<Token>,
    next: usize,
    last_end: usize,
    funcs: &'a FunctionSet,
    /// Declared variables, innermost last
    vars: Vec<String>,
    range_depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(name: &'a str, source: &'a str, tokens: Vec<Token>, funcs: &'a FunctionSet) -> Self {
        Self {
            name,
            source,
            tokens,
            next: 0,
            last_end: 0,
            funcs,
            vars: vec!["$".to_string()],
            range_depth: 0,
        }
    }

    /// Parse the whole token stream into the template body
    pub fn parse(mut self) -> ParseResult<Vec<Node>> {
        let (nodes, end) = self.parse_list()?;
        match end {
            ListEnd::Eof => Ok(nodes),
            ListEnd::End => Err(self.error_at(self.last_end, "unexpected {{end}}")),
            ListEnd::Else { pos } => Err(self.error_at(pos, "unexpected {{else}}")),
        }
    }

    fn error_at(&self, pos: usize, message: impl Into<String>) -> TemplateError {
        self.error_kind(TemplateErrorKind::SyntaxError, pos, 1, message)
    }

    fn error_kind(
        &self,
        kind: TemplateErrorKind,
        pos: usize,
        len: usize,
        message: impl Into<String>,
    ) -> TemplateError {
        TemplateError::at(kind, message, self.name, self.source, pos, len)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.next)
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.peek().map(|t| &t.kind)
    }

    fn peek_kind_at(&self, offset: usize) -> Option<&TokenKind> {
        self.tokens.get(self.next + offset).map(|t| &t.kind)
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.next).cloned()?;
        self.next += 1;
        self.last_end = token.end;
        Some(token)
    }

    /// Consume the next token, failing unless it is a right delimiter
    fn expect_right_delim(&mut self, context: &str) -> ParseResult<()> {
        match self.bump() {
            Some(Token {
                kind: TokenKind::RightDelim,
                ..
            }) => Ok(()),
            Some(token) => Err(self.error_at(
                token.pos,
                format!("unexpected {} in {}", token.kind, context),
            )),
            None => Err(self.error_at(self.source.len(), "unexpected EOF")),
        }
    }

    fn parse_list(&mut self) -> ParseResult<(Vec<Node>, ListEnd)> {
        let mut nodes = Vec::new();
        while let Some(token) = self.bump() {
            match token.kind {
                TokenKind::Text(text) => nodes.push(Node::Text(text)),
                TokenKind::LeftDelim => match self.peek_kind().cloned() {
                    Some(TokenKind::Keyword(keyword)) => {
                        let Some(kw) = self.bump() else {
                            break;
                        };
                        match keyword {
                            Keyword::End => {
                                self.expect_right_delim("end")?;
                                return Ok((nodes, ListEnd::End));
                            }
                            Keyword::Else => return Ok((nodes, ListEnd::Else { pos: kw.pos })),
                            Keyword::If => nodes.push(Node::If(self.parse_control(Control::If)?)),
                            Keyword::With => {
                                nodes.push(Node::With(self.parse_control(Control::With)?))
                            }
                            Keyword::Range => {
                                nodes.push(Node::Range(self.parse_control(Control::Range)?))
                            }
                            Keyword::Break | Keyword::Continue => {
                                if self.range_depth == 0 {
                                    return Err(self.error_at(
                                        kw.pos,
                                        format!("{{{{{}}}}} outside {{{{range}}}}", keyword.as_str()),
                                    ));
                                }
                                self.expect_right_delim(keyword.as_str())?;
                                nodes.push(if keyword == Keyword::Break {
                                    Node::Break
                                } else {
                                    Node::Continue
                                });
                            }
                            Keyword::Define | Keyword::Template | Keyword::Block => {
                                return Err(self.error_at(
                                    kw.pos,
                                    format!(
                                        "{{{{{}}}}} is not supported; each source file is a single template",
                                        keyword.as_str()
                                    ),
                                ));
                            }
                        }
                    }
                    _ => {
                        let pipe = self.parse_pipeline("command", &TokenKind::RightDelim)?;
                        nodes.push(Node::Action(pipe));
                    }
                },
                other => {
                    return Err(self.error_at(token.pos, format!("unexpected {}", other)));
                }
            }
        }
        Ok((nodes, ListEnd::Eof))
    }

    /// `if`, `with` or `range`, positioned after the keyword
    fn parse_control(&mut self, control: Control) -> ParseResult<Branch> {
        let scope = self.vars.len();
        let pipe = self.parse_pipeline(control.name(), &TokenKind::RightDelim)?;
        let body_scope = self.vars.len();

        if control == Control::Range {
            self.range_depth += 1;
        }
        let listed = self.parse_list();
        if control == Control::Range {
            self.range_depth -= 1;
        }
        let (list, end) = listed?;
        self.vars.truncate(body_scope);

        let else_list = match end {
            ListEnd::End => None,
            ListEnd::Eof => return Err(self.error_at(self.source.len(), "unexpected EOF")),
            ListEnd::Else { .. } => {
                let chained = match (control, self.peek_kind()) {
                    (Control::If, Some(TokenKind::Keyword(Keyword::If))) => Some(Control::If),
                    (Control::With, Some(TokenKind::Keyword(Keyword::With))) => Some(Control::With),
                    _ => None,
                };
                match chained {
                    // `{{else if ...}}` shares the closing `{{end}}`
                    Some(inner) => {
                        self.bump();
                        let branch = self.parse_control(inner)?;
                        Some(vec![match inner {
                            Control::If => Node::If(branch),
                            _ => Node::With(branch),
                        }])
                    }
                    None => {
                        self.expect_right_delim("else")?;
                        let (else_list, else_end) = self.parse_list()?;
                        match else_end {
                            ListEnd::End => {}
                            ListEnd::Else { pos } => {
                                return Err(self.error_at(pos, "expected end; found {{else}}"));
                            }
                            ListEnd::Eof => {
                                return Err(self.error_at(self.source.len(), "unexpected EOF"));
                            }
                        }
                        Some(else_list)
                    }
                }
            }
        };

        self.vars.truncate(scope);
        Ok(Branch {
            pipe,
            list,
            else_list,
        })
    }

    /// Parse commands up to and including `end`
    fn parse_pipeline(&mut self, context: &str, end: &TokenKind) -> ParseResult<Pipeline> {
        let pos = self.peek().map_or(self.last_end, |t| t.pos);
        let (decl, is_assign) = self.parse_declarations(context)?;

        let mut cmds: Vec<Command> = Vec::new();
        loop {
            match self.peek_kind() {
                None => return Err(self.error_at(self.source.len(), "unclosed action")),
                Some(kind) if kind == end => {
                    self.bump();
                    break;
                }
                // A command always stops at a pipe or at `end`
                Some(TokenKind::Pipe) if !cmds.is_empty() => {
                    self.bump();
                }
                _ => {}
            }
            let cmd = self.parse_command(end)?;
            if !cmds.is_empty() && cmd.args.first().is_some_and(Operand::is_constant) {
                return Err(self.error_at(
                    cmd.pos,
                    format!("non executable command in pipeline stage {}", cmds.len() + 1),
                ));
            }
            cmds.push(cmd);
        }

        if cmds.is_empty() {
            let what = if decl.is_empty() { context } else { "declaration" };
            return Err(self.error_at(pos, format!("missing value for {}", what)));
        }

        if !is_assign {
            self.vars.extend(decl.iter().cloned());
        }
        Ok(Pipeline {
            pos,
            decl,
            is_assign,
            cmds,
        })
    }

    /// `$x :=`, `$x =`, and for `range` also `$i, $e :=`
    fn parse_declarations(&mut self, context: &str) -> ParseResult<(Vec<String>, bool)> {
        let Some(TokenKind::Variable(first)) = self.peek_kind().cloned() else {
            return Ok((Vec::new(), false));
        };

        let (names, op_offset) = match (self.peek_kind_at(1), self.peek_kind_at(2)) {
            (Some(TokenKind::Declare | TokenKind::Assign), _) => (vec![first], 1),
            (Some(TokenKind::Comma), Some(TokenKind::Variable(second))) => {
                match self.peek_kind_at(3) {
                    Some(TokenKind::Declare | TokenKind::Assign) => (vec![first, second.clone()], 3),
                    _ => return Ok((Vec::new(), false)),
                }
            }
            _ => return Ok((Vec::new(), false)),
        };

        let is_assign = self.peek_kind_at(op_offset) == Some(&TokenKind::Assign);
        let pos = self.peek().map_or(self.last_end, |t| t.pos);
        if names.len() > 1 && context != "range" {
            return Err(self.error_at(pos, format!("too many declarations in {}", context)));
        }
        if is_assign {
            for name in &names {
                if !self.vars.contains(name) {
                    return Err(self.error_kind(
                        TemplateErrorKind::SyntaxError,
                        pos,
                        name.len(),
                        format!("undefined variable {:?}", name),
                    ));
                }
            }
        }
        for _ in 0..=op_offset {
            self.bump();
        }
        Ok((names, is_assign))
    }

    fn parse_command(&mut self, end: &TokenKind) -> ParseResult<Command> {
        let pos = self.peek().map_or(self.last_end, |t| t.pos);
        let mut args = Vec::new();
        loop {
            match self.peek_kind() {
                Some(TokenKind::Pipe) => break,
                Some(kind) if kind == end => break,
                Some(TokenKind::RightDelim | TokenKind::RightParen) => {
                    let token = self.bump();
                    let (pos, kind) = token.map_or((self.last_end, String::new()), |t| {
                        (t.pos, t.kind.to_string())
                    });
                    return Err(self.error_at(pos, format!("unexpected {} in operand", kind)));
                }
                None => return Err(self.error_at(self.source.len(), "unclosed action")),
                _ => args.push(self.parse_operand()?),
            }
        }
        if args.is_empty() {
            return Err(self.error_at(pos, "missing value for command"));
        }
        if let Some(Operand::Literal { value, pos }) = args.first() {
            if value.is_nil() {
                return Err(self.error_at(*pos, "nil is not a command"));
            }
        }
        Ok(Command {
            pos,
            args,
        })
    }

    fn parse_operand(&mut self) -> ParseResult<Operand> {
        let Some(token) = self.bump() else {
            return Err(self.error_at(self.source.len(), "unclosed action"));
        };
        let pos = token.pos;

        let term = match token.kind {
            TokenKind::Identifier(name) => {
                if !self.funcs.contains(&name) {
                    let names: Vec<&str> = self.funcs.names().collect();
                    let mut err = self.error_kind(
                        TemplateErrorKind::UnknownFunction,
                        pos,
                        name.len(),
                        format!("function {:?} not defined", name),
                    );
                    if let Some(hint) = suggest_unknown_function(&name, &names) {
                        err = err.with_suggestion(hint);
                    }
                    return Err(err);
                }
                Operand::Function { pos, name }
            }
            TokenKind::Dot => Operand::Dot { pos },
            TokenKind::Field(name) => Operand::Field {
                pos,
                chain: vec![name],
            },
            TokenKind::Variable(name) => {
                if !self.vars.contains(&name) {
                    return Err(self.error_kind(
                        TemplateErrorKind::SyntaxError,
                        pos,
                        name.len(),
                        format!("undefined variable {:?}", name),
                    ));
                }
                Operand::Variable {
                    pos,
                    name,
                    chain: Vec::new(),
                }
            }
            TokenKind::Str(s) => Operand::Literal {
                pos,
                value: s.into(),
            },
            TokenKind::Number(value) => Operand::Literal { pos, value },
            TokenKind::Bool(b) => Operand::Literal {
                pos,
                value: b.into(),
            },
            TokenKind::Nil => Operand::Literal {
                pos,
                value: crate::value::Value::Nil,
            },
            TokenKind::LeftParen => {
                let pipe = self.parse_pipeline("parenthesized pipeline", &TokenKind::RightParen)?;
                Operand::Pipe(Box::new(pipe))
            }
            other => {
                return Err(self.error_at(pos, format!("unexpected {} in operand", other)));
            }
        };

        self.parse_field_chain(term)
    }

    /// Attach `.Field` tokens written directly after a term
    fn parse_field_chain(&mut self, term: Operand) -> ParseResult<Operand> {
        let mut fields = Vec::new();
        while let Some(Token {
            kind: TokenKind::Field(name),
            pos,
            ..
        }) = self.peek()
        {
            if *pos != self.last_end {
                break;
            }
            fields.push(name.clone());
            self.bump();
        }
        if fields.is_empty() {
            return Ok(term);
        }

        match term {
            Operand::Field { pos, mut chain } => {
                chain.extend(fields);
                Ok(Operand::Field { pos, chain })
            }
            Operand::Variable {
                pos,
                name,
                mut chain,
            } => {
                chain.extend(fields);
                Ok(Operand::Variable { pos, name, chain })
            }
            Operand::Pipe(_) => Ok(Operand::Chain {
                pos: term.pos(),
                node: Box::new(term),
                fields,
            }),
            other => Err(self.error_at(
                other.pos(),
                format!("unexpected . after term {:?}", other.to_string()),
            )),
        }
    }
}
