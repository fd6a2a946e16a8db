//! Tokenizer for the text-template dialect
//!
//! Text outside delimiters becomes [`TokenKind::Text`]; everything between
//! a left and right delimiter is split into action tokens. Trim markers
//! (`{{- ` and ` -}}`) are applied here, so the parser never sees the
//! whitespace they remove. Comments (`{{/* ... */}}`) produce no tokens.

use std::fmt;

use crate::value::Value;

const LEFT_COMMENT: &str = "/*";
const RIGHT_COMMENT: &str = "*/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    If,
    Else,
    End,
    Range,
    With,
    Break,
    Continue,
    Define,
    Template,
    Block,
}

impl Keyword {
    fn from_ident(ident: &str) -> Option<Self> {
        Some(match ident {
            "if" => Keyword::If,
            "else" => Keyword::Else,
            "end" => Keyword::End,
            "range" => Keyword::Range,
            "with" => Keyword::With,
            "break" => Keyword::Break,
            "continue" => Keyword::Continue,
            "define" => Keyword::Define,
            "template" => Keyword::Template,
            "block" => Keyword::Block,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::If => "if",
            Keyword::Else => "else",
            Keyword::End => "end",
            Keyword::Range => "range",
            Keyword::With => "with",
            Keyword::Break => "break",
            Keyword::Continue => "continue",
            Keyword::Define => "define",
            Keyword::Template => "template",
            Keyword::Block => "block",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Text(String),
    LeftDelim,
    RightDelim,
    Keyword(Keyword),
    Identifier(String),
    /// `.Name`, without the dot
    Field(String),
    /// `$` or `$name`, with the dollar sign
    Variable(String),
    Dot,
    Str(String),
    Number(Value),
    Bool(bool),
    Nil,
    Pipe,
    LeftParen,
    RightParen,
    Comma,
    Declare,
    Assign,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Text(_) => f.write_str("text"),
            TokenKind::LeftDelim => f.write_str("<left delimiter>"),
            TokenKind::RightDelim => f.write_str("<right delimiter>"),
            TokenKind::Keyword(k) => write!(f, "<{}>", k.as_str()),
            TokenKind::Identifier(name) => write!(f, "<{}>", name),
            TokenKind::Field(name) => write!(f, "<.{}>", name),
            TokenKind::Variable(name) => write!(f, "<{}>", name),
            TokenKind::Dot => f.write_str("<.>"),
            TokenKind::Str(s) => write!(f, "{:?}", s),
            TokenKind::Number(n) => write!(f, "{}", n),
            TokenKind::Bool(b) => write!(f, "{}", b),
            TokenKind::Nil => f.write_str("nil"),
            TokenKind::Pipe => f.write_str("\"|\""),
            TokenKind::LeftParen => f.write_str("\"(\""),
            TokenKind::RightParen => f.write_str("\")\""),
            TokenKind::Comma => f.write_str("\",\""),
            TokenKind::Declare => f.write_str("\":=\""),
            TokenKind::Assign => f.write_str("\"=\""),
        }
    }
}

/// A token with its byte range in the source
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub pos: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub message: String,
    pub pos: usize,
}

type LexResult<T> = Result<T, LexError>;

/// Split `source` into tokens using the given delimiters
pub fn lex(source: &str, left: &str, right: &str) -> LexResult<Vec<Token>> {
    let mut lexer = Lexer {
        src: source,
        left,
        right,
        pos: 0,
        trim_next_text: false,
        paren_depth: 0,
        tokens: Vec::new(),
    };
    lexer.run()?;
    Ok(lexer.tokens)
}

fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

fn is_alphanumeric(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

/// `-` followed by a space character right after the left delimiter
fn has_left_trim_marker(rest: &str) -> bool {
    let mut chars = rest.chars();
    chars.next() == Some('-') && chars.next().is_some_and(is_space)
}

struct Lexer<'a> {
    src: &'a str,
    left: &'a str,
    right: &'a str,
    pos: usize,
    trim_next_text: bool,
    paren_depth: usize,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn run(&mut self) -> LexResult<()> {
        while self.pos < self.src.len() {
            let rest = &self.src[self.pos..];
            let Some(offset) = rest.find(self.left) else {
                self.emit_text(self.pos, rest);
                self.pos = self.src.len();
                break;
            };

            let delim_pos = self.pos + offset;
            let after_delim = delim_pos + self.left.len();
            let trim_left = has_left_trim_marker(&self.src[after_delim..]);

            let mut text = &rest[..offset];
            if trim_left {
                text = text.trim_end_matches(is_space);
            }
            self.emit_text(self.pos, text);

            // Marker is the dash plus one space character
            self.pos = if trim_left { after_delim + 2 } else { after_delim };
            self.lex_action(delim_pos)?;
        }
        Ok(())
    }

    fn emit_text(&mut self, pos: usize, text: &str) {
        let text = if std::mem::take(&mut self.trim_next_text) {
            text.trim_start_matches(is_space)
        } else {
            text
        };
        if !text.is_empty() {
            self.tokens.push(Token {
                kind: TokenKind::Text(text.to_string()),
                pos,
                end: pos + text.len(),
            });
        }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.rest().chars().nth(1)
    }

    fn push(&mut self, kind: TokenKind, pos: usize) {
        self.tokens.push(Token {
            kind,
            pos,
            end: self.pos,
        });
    }

    fn error<T>(&self, message: impl Into<String>, pos: usize) -> LexResult<T> {
        Err(LexError {
            message: message.into(),
            pos,
        })
    }

    /// Consume a right delimiter, with or without trim marker, if one is next
    fn at_right_delim(&mut self) -> bool {
        let rest = self.rest();
        if rest.starts_with(self.right) {
            self.pos += self.right.len();
            return true;
        }
        let trimmed = rest.trim_start_matches(is_space);
        if trimmed.len() < rest.len()
            && trimmed.starts_with('-')
            && trimmed[1..].starts_with(self.right)
        {
            self.pos += rest.len() - trimmed.len() + 1 + self.right.len();
            self.trim_next_text = true;
            return true;
        }
        false
    }

    fn lex_comment(&mut self, delim_pos: usize) -> LexResult<()> {
        let start = self.pos;
        let Some(close) = self.rest().find(RIGHT_COMMENT) else {
            return self.error("unclosed comment", delim_pos);
        };
        self.pos = start + close + RIGHT_COMMENT.len();
        if !self.at_right_delim() {
            return self.error("comment ends before closing delimiter", delim_pos);
        }
        Ok(())
    }

    fn lex_action(&mut self, delim_pos: usize) -> LexResult<()> {
        if self.rest().starts_with(LEFT_COMMENT) {
            return self.lex_comment(delim_pos);
        }
        self.tokens.push(Token {
            kind: TokenKind::LeftDelim,
            pos: delim_pos,
            end: self.pos,
        });

        loop {
            let start = self.pos;
            if self.at_right_delim() {
                if self.paren_depth > 0 {
                    return self.error("unclosed left paren", start);
                }
                self.push(TokenKind::RightDelim, start);
                return Ok(());
            }

            let Some(c) = self.peek() else {
                return self.error("unclosed action", delim_pos);
            };

            match c {
                c if is_space(c) => {
                    self.pos += self.rest().len() - self.rest().trim_start_matches(is_space).len();
                }
                '"' => self.lex_quote(start)?,
                '`' => self.lex_raw_quote(start)?,
                '\'' => self.lex_char(start)?,
                '$' => {
                    self.pos += 1;
                    self.take_while(is_alphanumeric);
                    let name = self.src[start..self.pos].to_string();
                    self.push(TokenKind::Variable(name), start);
                }
                '.' => match self.peek_second() {
                    Some(d) if d.is_ascii_digit() => self.lex_number(start)?,
                    Some(a) if is_alphanumeric(a) => {
                        self.pos += 1;
                        self.take_while(is_alphanumeric);
                        let name = self.src[start + 1..self.pos].to_string();
                        self.push(TokenKind::Field(name), start);
                    }
                    _ => {
                        self.pos += 1;
                        self.push(TokenKind::Dot, start);
                    }
                },
                '+' | '-' if self.peek_second().is_some_and(|d| d.is_ascii_digit() || d == '.') => {
                    self.lex_number(start)?
                }
                d if d.is_ascii_digit() => self.lex_number(start)?,
                a if is_alphanumeric(a) => {
                    self.take_while(is_alphanumeric);
                    let word = &self.src[start..self.pos];
                    let kind = match word {
                        "true" => TokenKind::Bool(true),
                        "false" => TokenKind::Bool(false),
                        "nil" => TokenKind::Nil,
                        _ => match Keyword::from_ident(word) {
                            Some(keyword) => TokenKind::Keyword(keyword),
                            None => TokenKind::Identifier(word.to_string()),
                        },
                    };
                    self.push(kind, start);
                }
                '|' => self.single(TokenKind::Pipe, start),
                ',' => self.single(TokenKind::Comma, start),
                '=' => self.single(TokenKind::Assign, start),
                ':' if self.peek_second() == Some('=') => {
                    self.pos += 2;
                    self.push(TokenKind::Declare, start);
                }
                '(' => {
                    self.paren_depth += 1;
                    self.single(TokenKind::LeftParen, start);
                }
                ')' => {
                    if self.paren_depth == 0 {
                        return self.error("unexpected right paren", start);
                    }
                    self.paren_depth -= 1;
                    self.single(TokenKind::RightParen, start);
                }
                other => {
                    return self.error(format!("unrecognized character in action: {:?}", other), start);
                }
            }
        }
    }

    fn single(&mut self, kind: TokenKind, start: usize) {
        self.pos += 1;
        self.push(kind, start);
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) {
        let rest = self.rest();
        let len = rest.find(|c: char| !pred(c)).unwrap_or(rest.len());
        self.pos += len;
    }

    fn lex_number(&mut self, start: usize) -> LexResult<()> {
        if matches!(self.peek(), Some('+' | '-')) {
            self.pos += 1;
        }
        self.take_while(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_');
        // Exponent sign
        while self.src[start..self.pos].ends_with(['e', 'E'])
            && matches!(self.peek(), Some('+' | '-'))
        {
            self.pos += 1;
            self.take_while(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_');
        }

        let text = &self.src[start..self.pos];
        match parse_number(text) {
            Some(value) => {
                self.push(TokenKind::Number(value), start);
                Ok(())
            }
            None => self.error(format!("bad number syntax: {:?}", text), start),
        }
    }

    fn lex_quote(&mut self, start: usize) -> LexResult<()> {
        self.pos += 1;
        let mut value = String::new();
        loop {
            let Some(c) = self.peek() else {
                return self.error("unterminated quoted string", start);
            };
            self.pos += c.len_utf8();
            match c {
                '"' => break,
                '\n' => return self.error("unterminated quoted string", start),
                '\\' => value.push(self.lex_escape(start, '"')?),
                c => value.push(c),
            }
        }
        self.push(TokenKind::Str(value), start);
        Ok(())
    }

    fn lex_raw_quote(&mut self, start: usize) -> LexResult<()> {
        let body_start = self.pos + 1;
        let Some(len) = self.src[body_start..].find('`') else {
            return self.error("unterminated raw quoted string", start);
        };
        let value = self.src[body_start..body_start + len].to_string();
        self.pos = body_start + len + 1;
        self.push(TokenKind::Str(value), start);
        Ok(())
    }

    /// Character constant, evaluated as its code point
    fn lex_char(&mut self, start: usize) -> LexResult<()> {
        self.pos += 1;
        let c = match self.peek() {
            Some('\\') => {
                self.pos += 1;
                self.lex_escape(start, '\'')?
            }
            Some(c) if c != '\'' && c != '\n' => {
                self.pos += c.len_utf8();
                c
            }
            _ => return self.error("malformed character constant", start),
        };
        if self.peek() != Some('\'') {
            return self.error("unterminated character constant", start);
        }
        self.pos += 1;
        self.push(TokenKind::Number(Value::Int(i64::from(u32::from(c)))), start);
        Ok(())
    }

    /// Escape sequence after a consumed backslash
    fn lex_escape(&mut self, start: usize, quote: char) -> LexResult<char> {
        let Some(c) = self.peek() else {
            return self.error("unterminated quoted string", start);
        };
        self.pos += c.len_utf8();
        let escaped = match c {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            'a' => '\u{7}',
            'b' => '\u{8}',
            'f' => '\u{c}',
            'v' => '\u{b}',
            '\\' => '\\',
            c if c == quote => c,
            'x' | 'u' | 'U' => {
                let digits = match c {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let hex = self.rest().get(..digits).unwrap_or_default();
                let decoded = u32::from_str_radix(hex, 16).ok().and_then(char::from_u32);
                match decoded {
                    Some(ch) if hex.len() == digits => {
                        self.pos += digits;
                        ch
                    }
                    _ => return self.error("invalid escape sequence in quoted string", start),
                }
            }
            _ => return self.error("invalid escape sequence in quoted string", start),
        };
        Ok(escaped)
    }
}

/// Integer (decimal, hex, octal, binary) or float literal
fn parse_number(text: &str) -> Option<Value> {
    let cleaned = text.replace('_', "");
    let (negative, digits) = match cleaned.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, cleaned.strip_prefix('+').unwrap_or(&cleaned)),
    };

    let radix = match digits.get(..2) {
        Some("0x" | "0X") => Some(16),
        Some("0o" | "0O") => Some(8),
        Some("0b" | "0B") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        let value = i64::from_str_radix(&digits[2..], radix).ok()?;
        return Some(Value::Int(if negative { -value } else { value }));
    }

    if let Ok(value) = digits.parse::<i64>() {
        return Some(Value::Int(if negative { -value } else { value }));
    }
    if digits.chars().all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-')) {
        let value = digits.parse::<f64>().ok()?;
        return Some(Value::Float(if negative { -value } else { value }));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        lex(src, "{{", "}}").unwrap().into_iter().map(|t| t.kind).collect()
    }

    fn text(s: &str) -> TokenKind {
        TokenKind::Text(s.to_string())
    }

    #[test]
    fn test_text_and_action() {
        assert_eq!(
            kinds(r#"a={{ env "A" }}!"#),
            vec![
                text("a="),
                TokenKind::LeftDelim,
                TokenKind::Identifier("env".to_string()),
                TokenKind::Str("A".to_string()),
                TokenKind::RightDelim,
                text("!"),
            ]
        );
    }

    #[test]
    fn test_trim_markers() {
        assert_eq!(
            kinds("a  {{- 1 -}}\n  b"),
            vec![
                text("a"),
                TokenKind::LeftDelim,
                TokenKind::Number(Value::Int(1)),
                TokenKind::RightDelim,
                text("b"),
            ]
        );
        // A dash without space is a negative number, not a marker
        assert_eq!(
            kinds("x {{-3}}"),
            vec![
                text("x "),
                TokenKind::LeftDelim,
                TokenKind::Number(Value::Int(-3)),
                TokenKind::RightDelim,
            ]
        );
    }

    #[test]
    fn test_comments_are_dropped() {
        assert_eq!(kinds("a {{/* note */}} b"), vec![text("a "), text(" b")]);
        assert_eq!(kinds("a {{- /* note */ -}} b"), vec![text("a"), text("b")]);
        assert!(lex("{{/* open", "{{", "}}").is_err());
    }

    #[test]
    fn test_fields_variables_and_declarations() {
        assert_eq!(
            kinds("{{ $v := .A.B }}"),
            vec![
                TokenKind::LeftDelim,
                TokenKind::Variable("$v".to_string()),
                TokenKind::Declare,
                TokenKind::Field("A".to_string()),
                TokenKind::Field("B".to_string()),
                TokenKind::RightDelim,
            ]
        );
        assert_eq!(
            kinds("{{ range $i, $e := . }}"),
            vec![
                TokenKind::LeftDelim,
                TokenKind::Keyword(Keyword::Range),
                TokenKind::Variable("$i".to_string()),
                TokenKind::Comma,
                TokenKind::Variable("$e".to_string()),
                TokenKind::Declare,
                TokenKind::Dot,
                TokenKind::RightDelim,
            ]
        );
    }

    #[test]
    fn test_literals() {
        assert_eq!(
            kinds(r#"{{ "a\tb" `raw\n` 'x' 0x1F 1.5 true nil }}"#),
            vec![
                TokenKind::LeftDelim,
                TokenKind::Str("a\tb".to_string()),
                TokenKind::Str("raw\\n".to_string()),
                TokenKind::Number(Value::Int(120)),
                TokenKind::Number(Value::Int(31)),
                TokenKind::Number(Value::Float(1.5)),
                TokenKind::Bool(true),
                TokenKind::Nil,
                TokenKind::RightDelim,
            ]
        );
    }

    #[test]
    fn test_custom_delimiters() {
        let tokens: Vec<TokenKind> = lex("{{ x }} [[ env \"A\" -]]  y", "[[", "]]")
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect();
        assert_eq!(
            tokens,
            vec![
                text("{{ x }} "),
                TokenKind::LeftDelim,
                TokenKind::Identifier("env".to_string()),
                TokenKind::Str("A".to_string()),
                TokenKind::RightDelim,
                text("y"),
            ]
        );
    }

    #[test]
    fn test_errors_carry_position() {
        let err = lex("ok {{ \"open }}", "{{", "}}").unwrap_err();
        assert_eq!(err.message, "unterminated quoted string");
        assert_eq!(err.pos, 6);

        let err = lex("{{ x ", "{{", "}}").unwrap_err();
        assert_eq!(err.message, "unclosed action");

        let err = lex("{{ (x }}", "{{", "}}").unwrap_err();
        assert_eq!(err.message, "unclosed left paren");
    }
}
