//! Builtin functions of the text-template dialect
//!
//! Logic (`and`, `or`, `not`), comparison (`eq`, `ne`, `lt`, `le`, `gt`,
//! `ge`), indexing (`len`, `index`) and printing (`print`, `printf`,
//! `println`, `html`, `urlquery`).

use std::cmp::Ordering;
use std::fmt::Write as _;

use crate::functions::{Arity, FuncError, FuncResult, FunctionSet, expect_str};
use crate::value::Value;

const BUILTINS: &str = "builtins";

pub fn library() -> FunctionSet {
    let mut set = FunctionSet::new();

    set.define_pure(BUILTINS, "and", Arity::AtLeast(1), |args| {
        let value = args
            .iter()
            .find(|v| !v.is_truthy())
            .unwrap_or(&args[args.len() - 1]);
        Ok(value.clone())
    });
    set.define_pure(BUILTINS, "or", Arity::AtLeast(1), |args| {
        let value = args
            .iter()
            .find(|v| v.is_truthy())
            .unwrap_or(&args[args.len() - 1]);
        Ok(value.clone())
    });
    set.define_pure(BUILTINS, "not", Arity::Exact(1), |args| {
        Ok(Value::Bool(!args[0].is_truthy()))
    });

    set.define_pure(BUILTINS, "len", Arity::Exact(1), |args| {
        args[0]
            .len()
            .map(|n| Value::Int(n as i64))
            .ok_or_else(|| FuncError::TypeMismatch(format!("len of type {}", args[0].type_name())))
    });
    set.define_pure(BUILTINS, "index", Arity::AtLeast(1), |args| index(&args[0], &args[1..]));

    set.define_pure(BUILTINS, "eq", Arity::AtLeast(2), |args| {
        for other in &args[1..] {
            if compare_eq(&args[0], other)? {
                return Ok(Value::Bool(true));
            }
        }
        Ok(Value::Bool(false))
    });
    set.define_pure(BUILTINS, "ne", Arity::Exact(2), |args| {
        Ok(Value::Bool(!compare_eq(&args[0], &args[1])?))
    });
    set.define_pure(BUILTINS, "lt", Arity::Exact(2), |args| {
        Ok(Value::Bool(compare_order(&args[0], &args[1])? == Ordering::Less))
    });
    set.define_pure(BUILTINS, "le", Arity::Exact(2), |args| {
        Ok(Value::Bool(compare_order(&args[0], &args[1])? != Ordering::Greater))
    });
    set.define_pure(BUILTINS, "gt", Arity::Exact(2), |args| {
        Ok(Value::Bool(compare_order(&args[0], &args[1])? == Ordering::Greater))
    });
    set.define_pure(BUILTINS, "ge", Arity::Exact(2), |args| {
        Ok(Value::Bool(compare_order(&args[0], &args[1])? != Ordering::Less))
    });

    set.define_pure(BUILTINS, "print", Arity::AtLeast(0), |args| {
        Ok(Value::String(sprint(args)))
    });
    set.define_pure(BUILTINS, "println", Arity::AtLeast(0), |args| {
        let mut out = args
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        out.push('\n');
        Ok(Value::String(out))
    });
    set.define_pure(BUILTINS, "printf", Arity::AtLeast(1), |args| {
        let format = expect_str("printf", args, 0)?;
        Ok(Value::String(sprintf(format, &args[1..])))
    });

    set.define_pure(BUILTINS, "html", Arity::AtLeast(0), |args| {
        Ok(Value::String(html_escape(&sprint(args))))
    });
    set.define_pure(BUILTINS, "urlquery", Arity::AtLeast(0), |args| {
        Ok(Value::String(query_escape(&sprint(args))))
    });

    set
}

fn index(item: &Value, indices: &[Value]) -> FuncResult {
    let mut current = item.clone();
    for idx in indices {
        current = match (&current, idx) {
            (Value::List(items), Value::Int(i)) => {
                let pos = usize::try_from(*i)
                    .ok()
                    .filter(|p| *p < items.len())
                    .ok_or_else(|| FuncError::Invalid(format!("index out of range: {}", i)))?;
                items[pos].clone()
            }
            (Value::String(s), Value::Int(i)) => {
                let pos = usize::try_from(*i)
                    .ok()
                    .filter(|p| *p < s.len())
                    .ok_or_else(|| FuncError::Invalid(format!("index out of range: {}", i)))?;
                Value::Int(i64::from(s.as_bytes()[pos]))
            }
            (Value::Map(map), Value::String(key)) => map.get(key).cloned().unwrap_or(Value::Nil),
            (Value::Nil, _) => {
                return Err(FuncError::Invalid("index of untyped nil".to_string()));
            }
            (Value::List(_) | Value::String(_), other) => {
                return Err(FuncError::TypeMismatch(format!(
                    "cannot index slice/array with type {}",
                    other.type_name()
                )));
            }
            (Value::Map(_), other) => {
                return Err(FuncError::TypeMismatch(format!(
                    "value has type {}; should be string",
                    other.type_name()
                )));
            }
            (other, _) => {
                return Err(FuncError::TypeMismatch(format!(
                    "can't index item of type {}",
                    other.type_name()
                )));
            }
        };
    }
    Ok(current)
}

fn compare_eq(a: &Value, b: &Value) -> Result<bool, FuncError> {
    match (a, b) {
        (Value::Nil, Value::Nil) => Ok(true),
        (Value::Nil, _) | (_, Value::Nil) => Ok(false),
        (Value::Bool(x), Value::Bool(y)) => Ok(x == y),
        (Value::Int(x), Value::Int(y)) => Ok(x == y),
        (Value::Float(x), Value::Float(y)) => Ok(x == y),
        (Value::String(x), Value::String(y)) => Ok(x == y),
        (Value::List(_) | Value::Map(_), _) | (_, Value::List(_) | Value::Map(_)) => Err(
            FuncError::TypeMismatch("non-comparable type".to_string()),
        ),
        _ => Err(FuncError::TypeMismatch(
            "incompatible types for comparison".to_string(),
        )),
    }
}

fn compare_order(a: &Value, b: &Value) -> Result<Ordering, FuncError> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Ok(x.cmp(y)),
        (Value::Float(x), Value::Float(y)) => x
            .partial_cmp(y)
            .ok_or_else(|| FuncError::Invalid("cannot order NaN".to_string())),
        (Value::String(x), Value::String(y)) => Ok(x.cmp(y)),
        (Value::Int(_), Value::Float(_) | Value::String(_))
        | (Value::Float(_), Value::Int(_) | Value::String(_))
        | (Value::String(_), Value::Int(_) | Value::Float(_)) => Err(FuncError::TypeMismatch(
            "incompatible types for comparison".to_string(),
        )),
        _ => Err(FuncError::TypeMismatch(
            "invalid type for comparison".to_string(),
        )),
    }
}

/// Operands joined with a space where neither side is a string
pub(crate) fn sprint(args: &[Value]) -> String {
    let mut out = String::new();
    for (i, arg) in args.iter().enumerate() {
        if i > 0 && !matches!(arg, Value::String(_)) && !matches!(args[i - 1], Value::String(_)) {
            out.push(' ');
        }
        let _ = write!(out, "{}", arg);
    }
    out
}

/// Minimal printf supporting `%v %s %d %q %f %t %x %X %%` with flags,
/// width and precision
pub(crate) fn sprintf(format: &str, args: &[Value]) -> String {
    let mut out = String::with_capacity(format.len());
    let mut chars = format.chars().peekable();
    let mut next_arg = 0usize;

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }

        let mut left_align = false;
        let mut zero_pad = false;
        while let Some(&flag) = chars.peek() {
            match flag {
                '-' => left_align = true,
                '0' => zero_pad = true,
                '+' | ' ' | '#' => {}
                _ => break,
            }
            chars.next();
        }

        let mut width = String::new();
        while let Some(&d) = chars.peek().filter(|d| d.is_ascii_digit()) {
            width.push(d);
            chars.next();
        }
        let mut precision: Option<usize> = None;
        if chars.peek() == Some(&'.') {
            chars.next();
            let mut digits = String::new();
            while let Some(&d) = chars.peek().filter(|d| d.is_ascii_digit()) {
                digits.push(d);
                chars.next();
            }
            precision = Some(digits.parse().unwrap_or(0));
        }

        let Some(verb) = chars.next() else {
            out.push_str("%!(NOVERB)");
            break;
        };
        if verb == '%' {
            out.push('%');
            continue;
        }

        let Some(arg) = args.get(next_arg) else {
            let _ = write!(out, "%!{}(MISSING)", verb);
            continue;
        };
        next_arg += 1;

        let formatted = match format_verb(verb, arg, precision) {
            Some(text) => text,
            None => format!("%!{}({}={})", verb, arg.type_name(), arg),
        };

        let width: usize = width.parse().unwrap_or(0);
        let pad = width.saturating_sub(formatted.chars().count());
        if pad == 0 {
            out.push_str(&formatted);
        } else if left_align {
            out.push_str(&formatted);
            out.extend(std::iter::repeat_n(' ', pad));
        } else if zero_pad && matches!(arg, Value::Int(_) | Value::Float(_)) {
            let (sign, digits) = match formatted.strip_prefix('-') {
                Some(rest) => ("-", rest),
                None => ("", formatted.as_str()),
            };
            out.push_str(sign);
            out.extend(std::iter::repeat_n('0', pad));
            out.push_str(digits);
        } else {
            out.extend(std::iter::repeat_n(' ', pad));
            out.push_str(&formatted);
        }
    }

    if next_arg < args.len() {
        let extra: Vec<String> = args[next_arg..]
            .iter()
            .map(|a| format!("{}={}", a.type_name(), a))
            .collect();
        let _ = write!(out, "%!(EXTRA {})", extra.join(", "));
    }
    out
}

fn format_verb(verb: char, arg: &Value, precision: Option<usize>) -> Option<String> {
    match (verb, arg) {
        ('v', Value::Float(f)) => Some(match precision {
            Some(p) => format!("{:.*}", p, f),
            None => f.to_string(),
        }),
        ('v', _) => Some(arg.to_string()),
        ('s', Value::String(s)) => Some(match precision {
            Some(p) => s.chars().take(p).collect(),
            None => s.clone(),
        }),
        ('s', _) => Some(arg.to_string()),
        ('d', Value::Int(i)) => Some(i.to_string()),
        ('f' | 'F', Value::Float(f)) => Some(format!("{:.*}", precision.unwrap_or(6), f)),
        ('q', Value::String(s)) => Some(quote(s)),
        ('t', Value::Bool(b)) => Some(b.to_string()),
        ('x', Value::Int(i)) => Some(format!("{:x}", i)),
        ('X', Value::Int(i)) => Some(format!("{:X}", i)),
        ('x', Value::String(s)) => Some(s.bytes().map(|b| format!("{:02x}", b)).collect()),
        ('X', Value::String(s)) => Some(s.bytes().map(|b| format!("{:02X}", b)).collect()),
        _ => None,
    }
}

/// Double-quoted string with backslash escapes
pub(crate) fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            '\0' => out.push('\u{FFFD}'),
            c => out.push(c),
        }
    }
    out
}

fn query_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            b' ' => out.push('+'),
            _ => {
                let _ = write!(out, "%{:02X}", b);
            }
        }
    }
    out
}
