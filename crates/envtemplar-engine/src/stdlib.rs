//! Helper function library for the text-template dialect
//!
//! Names and argument order follow the sprig conventions so the data
//! argument comes last and can be piped: `{{ "hi!" | upper | repeat 3 }}`.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use base64::Engine as _;
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

use crate::builtins::quote as double_quote;
use crate::functions::{Arity, FuncError, FunctionSet, expect_int, expect_str};
use crate::value::Value;

const STDLIB: &str = "stdlib";

/// Largest string `repeat`, `indent` and `nindent` may produce
const MAX_GENERATED_LEN: usize = 64 * 1024 * 1024;

pub fn library() -> FunctionSet {
    let mut set = FunctionSet::new();
    define_strings(&mut set);
    define_lists(&mut set);
    define_defaults(&mut set);
    define_math(&mut set);
    define_encoding(&mut set);
    set
}

fn define_strings(set: &mut FunctionSet) {
    set.define_pure(STDLIB, "upper", Arity::Exact(1), |args| {
        Ok(expect_str("upper", args, 0)?.to_uppercase().into())
    });
    set.define_pure(STDLIB, "lower", Arity::Exact(1), |args| {
        Ok(expect_str("lower", args, 0)?.to_lowercase().into())
    });
    set.define_pure(STDLIB, "title", Arity::Exact(1), |args| {
        Ok(title(expect_str("title", args, 0)?).into())
    });
    set.define_pure(STDLIB, "trim", Arity::Exact(1), |args| {
        Ok(expect_str("trim", args, 0)?.trim().into())
    });
    set.define_pure(STDLIB, "trimAll", Arity::Exact(2), |args| {
        let cutset: Vec<char> = expect_str("trimAll", args, 0)?.chars().collect();
        Ok(expect_str("trimAll", args, 1)?
            .trim_matches(cutset.as_slice())
            .into())
    });
    set.define_pure(STDLIB, "trimPrefix", Arity::Exact(2), |args| {
        let prefix = expect_str("trimPrefix", args, 0)?;
        let s = expect_str("trimPrefix", args, 1)?;
        Ok(s.strip_prefix(prefix).unwrap_or(s).into())
    });
    set.define_pure(STDLIB, "trimSuffix", Arity::Exact(2), |args| {
        let suffix = expect_str("trimSuffix", args, 0)?;
        let s = expect_str("trimSuffix", args, 1)?;
        Ok(s.strip_suffix(suffix).unwrap_or(s).into())
    });
    set.define_pure(STDLIB, "trunc", Arity::Exact(2), |args| {
        let length = expect_int("trunc", args, 0)?;
        Ok(trunc(expect_str("trunc", args, 1)?, length).into())
    });
    set.define_pure(STDLIB, "repeat", Arity::Exact(2), |args| {
        let count = expect_int("repeat", args, 0)?;
        let count = usize::try_from(count)
            .map_err(|_| FuncError::Invalid("repeat: negative repeat count".to_string()))?;
        let s = expect_str("repeat", args, 1)?;
        generated_len("repeat", s.len(), count, 0)?;
        Ok(s.repeat(count).into())
    });
    set.define_pure(STDLIB, "replace", Arity::Exact(3), |args| {
        let old = expect_str("replace", args, 0)?;
        let new = expect_str("replace", args, 1)?;
        Ok(expect_str("replace", args, 2)?.replace(old, new).into())
    });
    set.define_pure(STDLIB, "contains", Arity::Exact(2), |args| {
        let needle = expect_str("contains", args, 0)?;
        Ok(expect_str("contains", args, 1)?.contains(needle).into())
    });
    set.define_pure(STDLIB, "hasPrefix", Arity::Exact(2), |args| {
        let prefix = expect_str("hasPrefix", args, 0)?;
        Ok(expect_str("hasPrefix", args, 1)?.starts_with(prefix).into())
    });
    set.define_pure(STDLIB, "hasSuffix", Arity::Exact(2), |args| {
        let suffix = expect_str("hasSuffix", args, 0)?;
        Ok(expect_str("hasSuffix", args, 1)?.ends_with(suffix).into())
    });
    set.define_pure(STDLIB, "quote", Arity::AtLeast(0), |args| {
        Ok(join_present(args, |v| double_quote(&v.to_string())).into())
    });
    set.define_pure(STDLIB, "squote", Arity::AtLeast(0), |args| {
        Ok(join_present(args, |v| format!("'{}'", v)).into())
    });
    set.define_pure(STDLIB, "cat", Arity::AtLeast(0), |args| {
        Ok(join_present(args, ToString::to_string).into())
    });
    set.define_pure(STDLIB, "indent", Arity::Exact(2), |args| {
        let spaces = expect_int("indent", args, 0)?;
        Ok(indent("indent", expect_str("indent", args, 1)?, spaces)?.into())
    });
    set.define_pure(STDLIB, "nindent", Arity::Exact(2), |args| {
        let spaces = expect_int("nindent", args, 0)?;
        let indented = indent("nindent", expect_str("nindent", args, 1)?, spaces)?;
        Ok(format!("\n{}", indented).into())
    });
    set.define_pure(STDLIB, "nospace", Arity::Exact(1), |args| {
        let s = expect_str("nospace", args, 0)?;
        Ok(s.chars().filter(|c| !c.is_whitespace()).collect::<String>().into())
    });
    set.define_pure(STDLIB, "snakecase", Arity::Exact(1), |args| {
        Ok(snakecase(expect_str("snakecase", args, 0)?).into())
    });
    set.define_pure(STDLIB, "kebabcase", Arity::Exact(1), |args| {
        Ok(snakecase(expect_str("kebabcase", args, 0)?)
            .replace('_', "-")
            .into())
    });
    set.define_pure(STDLIB, "camelcase", Arity::Exact(1), |args| {
        Ok(camelcase(expect_str("camelcase", args, 0)?).into())
    });
    set.define_pure(STDLIB, "substr", Arity::Exact(3), |args| {
        let start = expect_int("substr", args, 0)?;
        let end = expect_int("substr", args, 1)?;
        Ok(substr(expect_str("substr", args, 2)?, start, end).into())
    });
    set.define_pure(STDLIB, "regexMatch", Arity::Exact(2), |args| {
        let re = compile("regexMatch", expect_str("regexMatch", args, 0)?)?;
        Ok(re.is_match(expect_str("regexMatch", args, 1)?).into())
    });
    set.define_pure(STDLIB, "regexFind", Arity::Exact(2), |args| {
        let re = compile("regexFind", expect_str("regexFind", args, 0)?)?;
        let s = expect_str("regexFind", args, 1)?;
        Ok(re.find(s).map(|m| m.as_str()).unwrap_or_default().into())
    });
    set.define_pure(STDLIB, "regexReplaceAll", Arity::Exact(3), |args| {
        let re = compile("regexReplaceAll", expect_str("regexReplaceAll", args, 0)?)?;
        let s = expect_str("regexReplaceAll", args, 1)?;
        let replacement = expect_str("regexReplaceAll", args, 2)?;
        Ok(re.replace_all(s, replacement).into_owned().into())
    });
}

fn define_lists(set: &mut FunctionSet) {
    set.define_pure(STDLIB, "split", Arity::Exact(2), |args| {
        let sep = expect_str("split", args, 0)?;
        let s = expect_str("split", args, 1)?;
        let parts: BTreeMap<String, Value> = s
            .split(sep)
            .enumerate()
            .map(|(i, part)| (format!("_{}", i), Value::from(part)))
            .collect();
        Ok(Value::Map(parts))
    });
    set.define_pure(STDLIB, "splitList", Arity::Exact(2), |args| {
        let sep = expect_str("splitList", args, 0)?;
        let s = expect_str("splitList", args, 1)?;
        Ok(Value::List(s.split(sep).map(Value::from).collect()))
    });
    set.define_pure(STDLIB, "join", Arity::Exact(2), |args| {
        let sep = expect_str("join", args, 0)?;
        let joined = match &args[1] {
            Value::List(items) => items
                .iter()
                .filter(|v| !v.is_nil())
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(sep),
            Value::Nil => String::new(),
            other => other.to_string(),
        };
        Ok(joined.into())
    });
    set.define_pure(STDLIB, "list", Arity::AtLeast(0), |args| {
        Ok(Value::List(args.to_vec()))
    });
    set.define_pure(STDLIB, "first", Arity::Exact(1), |args| match &args[0] {
        Value::List(items) => Ok(items.first().cloned().unwrap_or_default()),
        other => Err(FuncError::wrong_type("slice", other)),
    });
    set.define_pure(STDLIB, "last", Arity::Exact(1), |args| match &args[0] {
        Value::List(items) => Ok(items.last().cloned().unwrap_or_default()),
        other => Err(FuncError::wrong_type("slice", other)),
    });
    set.define_pure(STDLIB, "has", Arity::Exact(2), |args| match &args[1] {
        Value::List(items) => Ok(items.contains(&args[0]).into()),
        Value::Nil => Ok(false.into()),
        other => Err(FuncError::wrong_type("slice", other)),
    });
    set.define_pure(STDLIB, "dict", Arity::AtLeast(0), |args| {
        let mut map = BTreeMap::new();
        for pair in args.chunks(2) {
            let key = match &pair[0] {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            map.insert(key, pair.get(1).cloned().unwrap_or_default());
        }
        Ok(Value::Map(map))
    });
    set.define_pure(STDLIB, "keys", Arity::AtLeast(1), |args| {
        let mut keys = Vec::new();
        for arg in args {
            match arg {
                Value::Map(map) => keys.extend(map.keys().cloned().map(Value::String)),
                other => return Err(FuncError::wrong_type("map", other)),
            }
        }
        Ok(Value::List(keys))
    });
    set.define_pure(STDLIB, "hasKey", Arity::Exact(2), |args| {
        let key = expect_str("hasKey", args, 1)?;
        match &args[0] {
            Value::Map(map) => Ok(map.contains_key(key).into()),
            other => Err(FuncError::wrong_type("map", other)),
        }
    });
}

fn define_defaults(set: &mut FunctionSet) {
    // `default FALLBACK [GIVEN]`: GIVEN is usually piped in
    set.define_pure(STDLIB, "default", Arity::Between(1, 2), |args| {
        match args.get(1) {
            Some(given) if !given.is_empty() => Ok(given.clone()),
            _ => Ok(args[0].clone()),
        }
    });
    set.define_pure(STDLIB, "empty", Arity::Exact(1), |args| {
        Ok(args[0].is_empty().into())
    });
    set.define_pure(STDLIB, "coalesce", Arity::AtLeast(0), |args| {
        Ok(args
            .iter()
            .find(|v| !v.is_empty())
            .cloned()
            .unwrap_or_default())
    });
    set.define_pure(STDLIB, "ternary", Arity::Exact(3), |args| {
        Ok(if args[2].is_truthy() {
            args[0].clone()
        } else {
            args[1].clone()
        })
    });
    set.define_pure(STDLIB, "toString", Arity::Exact(1), |args| {
        Ok(match &args[0] {
            Value::Nil => String::new(),
            other => other.to_string(),
        }
        .into())
    });
}

fn define_math(set: &mut FunctionSet) {
    set.define_pure(STDLIB, "atoi", Arity::Exact(1), |args| {
        let s = expect_str("atoi", args, 0)?;
        Ok(Value::Int(s.trim().parse().unwrap_or(0)))
    });
    set.define_pure(STDLIB, "int", Arity::Exact(1), |args| Ok(Value::Int(to_i64(&args[0]))));
    set.define_pure(STDLIB, "float64", Arity::Exact(1), |args| {
        Ok(Value::Float(to_f64(&args[0])))
    });
    set.define_pure(STDLIB, "add", Arity::AtLeast(0), |args| {
        Ok(Value::Int(args.iter().map(to_i64).fold(0i64, i64::wrapping_add)))
    });
    set.define_pure(STDLIB, "add1", Arity::Exact(1), |args| {
        Ok(Value::Int(to_i64(&args[0]).wrapping_add(1)))
    });
    set.define_pure(STDLIB, "sub", Arity::Exact(2), |args| {
        Ok(Value::Int(to_i64(&args[0]).wrapping_sub(to_i64(&args[1]))))
    });
    set.define_pure(STDLIB, "mul", Arity::AtLeast(1), |args| {
        Ok(Value::Int(args.iter().map(to_i64).fold(1i64, i64::wrapping_mul)))
    });
    set.define_pure(STDLIB, "div", Arity::Exact(2), |args| {
        let (a, b) = (to_i64(&args[0]), to_i64(&args[1]));
        if b == 0 {
            return Err(FuncError::Invalid("div: integer divide by zero".to_string()));
        }
        Ok(Value::Int(a.wrapping_div(b)))
    });
    set.define_pure(STDLIB, "mod", Arity::Exact(2), |args| {
        let (a, b) = (to_i64(&args[0]), to_i64(&args[1]));
        if b == 0 {
            return Err(FuncError::Invalid("mod: integer divide by zero".to_string()));
        }
        Ok(Value::Int(a.wrapping_rem(b)))
    });
    set.define_pure(STDLIB, "max", Arity::AtLeast(1), |args| {
        Ok(Value::Int(args.iter().map(to_i64).max().unwrap_or_default()))
    });
    set.define_pure(STDLIB, "min", Arity::AtLeast(1), |args| {
        Ok(Value::Int(args.iter().map(to_i64).min().unwrap_or_default()))
    });
}

fn define_encoding(set: &mut FunctionSet) {
    set.define_pure(STDLIB, "b64enc", Arity::Exact(1), |args| {
        let s = expect_str("b64enc", args, 0)?;
        Ok(base64::engine::general_purpose::STANDARD
            .encode(s.as_bytes())
            .into())
    });
    set.define_pure(STDLIB, "b64dec", Arity::Exact(1), |args| {
        let s = expect_str("b64dec", args, 0)?;
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(s.as_bytes())
            .map_err(|e| FuncError::Invalid(format!("b64dec: base64 decode error: {}", e)))?;
        String::from_utf8(decoded)
            .map(Value::String)
            .map_err(|e| FuncError::Invalid(format!("b64dec: UTF-8 decode error: {}", e)))
    });
    set.define_pure(STDLIB, "sha256sum", Arity::Exact(1), |args| {
        let s = expect_str("sha256sum", args, 0)?;
        let mut hasher = Sha256::new();
        hasher.update(s.as_bytes());
        Ok(format!("{:x}", hasher.finalize()).into())
    });
    set.define_pure(STDLIB, "toJson", Arity::Exact(1), |args| {
        serde_json::to_string(&args[0])
            .map(Value::String)
            .map_err(|e| FuncError::Invalid(format!("toJson: {}", e)))
    });
    set.define_pure(STDLIB, "toPrettyJson", Arity::Exact(1), |args| {
        serde_json::to_string_pretty(&args[0])
            .map(Value::String)
            .map_err(|e| FuncError::Invalid(format!("toPrettyJson: {}", e)))
    });
}

/// Join the non-nil arguments with a space after mapping each one
fn join_present(args: &[Value], f: impl Fn(&Value) -> String) -> String {
    args.iter()
        .filter(|v| !v.is_nil())
        .map(f)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Compiled patterns, keyed by source text
static REGEX_CACHE: Lazy<Mutex<HashMap<String, Regex>>> = Lazy::new(|| Mutex::new(HashMap::new()));

fn compile(func: &str, pattern: &str) -> Result<Regex, FuncError> {
    if let Ok(cache) = REGEX_CACHE.lock() {
        if let Some(re) = cache.get(pattern) {
            return Ok(re.clone());
        }
    }
    let re = Regex::new(pattern).map_err(|e| FuncError::Invalid(format!("{}: {}", func, e)))?;
    if let Ok(mut cache) = REGEX_CACHE.lock() {
        cache.insert(pattern.to_string(), re.clone());
    }
    Ok(re)
}

/// Lenient integer conversion used by the math helpers
fn to_i64(value: &Value) -> i64 {
    match value {
        Value::Int(i) => *i,
        Value::Float(f) => *f as i64,
        Value::Bool(b) => i64::from(*b),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .or_else(|_| s.trim().parse::<f64>().map(|f| f as i64))
            .unwrap_or(0),
        _ => 0,
    }
}

fn to_f64(value: &Value) -> f64 {
    match value {
        Value::Int(i) => *i as f64,
        Value::Float(f) => *f,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn title(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if at_word_start && c.is_alphabetic() {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        at_word_start = c.is_whitespace() || c == '-' || c == '_';
    }
    out
}

/// Keep the first `length` characters, or the last `-length` when negative
fn trunc(s: &str, length: i64) -> String {
    let count = s.chars().count();
    let keep = length.unsigned_abs() as usize;
    if keep >= count {
        return s.to_string();
    }
    if length < 0 {
        s.chars().skip(count - keep).collect()
    } else {
        s.chars().take(keep).collect()
    }
}

fn indent(func: &str, s: &str, spaces: i64) -> Result<String, FuncError> {
    let width = usize::try_from(spaces).unwrap_or(0);
    let lines = s.matches('\n').count() + 1;
    generated_len(func, width, lines, s.len())?;
    let pad = " ".repeat(width);
    Ok(format!("{}{}", pad, s.replace('\n', &format!("\n{}", pad))))
}

/// `unit * count + extra`, rejected above [`MAX_GENERATED_LEN`]
fn generated_len(func: &str, unit: usize, count: usize, extra: usize) -> Result<usize, FuncError> {
    unit.checked_mul(count)
        .and_then(|len| len.checked_add(extra))
        .filter(|&len| len <= MAX_GENERATED_LEN)
        .ok_or_else(|| FuncError::Invalid(format!("{}: output length overflow", func)))
}

fn substr(s: &str, start: i64, end: i64) -> String {
    let chars: Vec<char> = s.chars().collect();
    let len = chars.len() as i64;
    let start = start.clamp(0, len);
    let end = if end < 0 || end > len { len } else { end };
    if start >= end {
        return String::new();
    }
    chars[start as usize..end as usize].iter().collect()
}

/// `FirstName` and `first-name` both become `first_name`
fn snakecase(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 4);
    let mut prev: Option<char> = None;
    for c in value.chars() {
        match c {
            '-' | ' ' => out.push('_'),
            c if c.is_uppercase() => {
                if prev.is_some_and(|p| p.is_lowercase() || p.is_ascii_digit()) {
                    out.push('_');
                }
                out.extend(c.to_lowercase());
            }
            c => out.push(c),
        }
        prev = Some(c);
    }
    out
}

/// Convert `http_server` or `http-server` to `HttpServer`
fn camelcase(value: &str) -> String {
    value
        .split(['_', '-', ' '])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::{CallContext, FuncResult};
    use envtemplar_core::RenderContext;

    fn call(name: &str, args: &[Value]) -> FuncResult {
        let env = RenderContext::default();
        let ctx = CallContext {
            env: &env,
            template: "test",
        };
        library().get(name).unwrap().call(&ctx, args)
    }

    fn s(v: &str) -> Value {
        Value::from(v)
    }

    #[test]
    fn test_upper_and_repeat() {
        assert_eq!(call("upper", &[s("hi!")]), Ok(s("HI!")));
        assert_eq!(call("repeat", &[Value::Int(3), s("HI!")]), Ok(s("HI!HI!HI!")));
        assert!(matches!(
            call("upper", &[Value::Int(3)]),
            Err(FuncError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_oversized_output_is_an_error() {
        assert_eq!(
            call("repeat", &[Value::Int(i64::MAX), s("x")]),
            Err(FuncError::Invalid("repeat: output length overflow".to_string()))
        );
        assert_eq!(
            call("indent", &[Value::Int(i64::MAX), s("a\nb")]),
            Err(FuncError::Invalid("indent: output length overflow".to_string()))
        );
        assert!(matches!(
            call("nindent", &[Value::Int(1 << 40), s("a")]),
            Err(FuncError::Invalid(_))
        ));
        assert_eq!(call("repeat", &[Value::Int(0), s("x")]), Ok(s("")));
        assert_eq!(call("nindent", &[Value::Int(2), s("a\nb")]), Ok(s("\n  a\n  b")));
    }

    #[test]
    fn test_div_and_mod_overflow_wraps() {
        assert_eq!(call("div", &[Value::Int(i64::MIN), Value::Int(-1)]), Ok(Value::Int(i64::MIN)));
        assert_eq!(call("mod", &[Value::Int(i64::MIN), Value::Int(-1)]), Ok(Value::Int(0)));
        assert_eq!(
            call("div", &[Value::Int(1), Value::Int(0)]),
            Err(FuncError::Invalid("div: integer divide by zero".to_string()))
        );
    }

    #[test]
    fn test_default_substitutes_zero_values() {
        assert_eq!(call("default", &[s("fallback"), s("")]), Ok(s("fallback")));
        assert_eq!(call("default", &[s("fallback"), Value::Nil]), Ok(s("fallback")));
        assert_eq!(call("default", &[s("fallback"), s("set")]), Ok(s("set")));
        assert_eq!(call("default", &[s("fallback")]), Ok(s("fallback")));
    }

    #[test]
    fn test_split_returns_indexed_map() {
        let parts = call("split", &[s("/"), s("foo/bar/baz")]).unwrap();
        let Value::Map(map) = parts else {
            panic!("expected map");
        };
        assert_eq!(map.get("_1"), Some(&s("bar")));
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn test_join_and_split_list() {
        let list = call("splitList", &[s(","), s("a,b,c")]).unwrap();
        assert_eq!(call("join", &[s("-"), list]), Ok(s("a-b-c")));
    }

    #[test]
    fn test_string_helpers() {
        assert_eq!(call("trunc", &[Value::Int(3), s("hello")]), Ok(s("hel")));
        assert_eq!(call("trunc", &[Value::Int(-3), s("hello")]), Ok(s("llo")));
        assert_eq!(call("trimPrefix", &[s("v"), s("v1.2")]), Ok(s("1.2")));
        assert_eq!(call("title", &[s("hello world")]), Ok(s("Hello World")));
        assert_eq!(call("snakecase", &[s("FirstName")]), Ok(s("first_name")));
        assert_eq!(call("kebabcase", &[s("camelCase")]), Ok(s("camel-case")));
        assert_eq!(call("camelcase", &[s("http_server")]), Ok(s("HttpServer")));
        assert_eq!(call("substr", &[Value::Int(1), Value::Int(3), s("hello")]), Ok(s("el")));
        assert_eq!(call("nindent", &[Value::Int(2), s("a\nb")]), Ok(s("\n  a\n  b")));
        assert_eq!(call("quote", &[s("a\"b"), Value::Int(1)]), Ok(s(r#""a\"b" "1""#)));
        assert_eq!(call("squote", &[s("x")]), Ok(s("'x'")));
    }

    #[test]
    fn test_math() {
        assert_eq!(call("add", &[Value::Int(1), s("2"), Value::Float(3.9)]), Ok(Value::Int(6)));
        assert_eq!(call("div", &[Value::Int(7), Value::Int(2)]), Ok(Value::Int(3)));
        assert!(matches!(
            call("div", &[Value::Int(7), Value::Int(0)]),
            Err(FuncError::Invalid(_))
        ));
        assert_eq!(call("max", &[Value::Int(1), Value::Int(9), Value::Int(4)]), Ok(Value::Int(9)));
    }

    #[test]
    fn test_encoding() {
        let encoded = call("b64enc", &[s("hello world")]).unwrap();
        assert_eq!(encoded, s("aGVsbG8gd29ybGQ="));
        assert_eq!(call("b64dec", &[encoded]), Ok(s("hello world")));
        assert_eq!(
            call("sha256sum", &[s("abc")]),
            Ok(s("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"))
        );
        let list = Value::List(vec![s("a"), Value::Int(1)]);
        assert_eq!(call("toJson", &[list]), Ok(s(r#"["a",1]"#)));
    }

    #[test]
    fn test_regex() {
        assert_eq!(call("regexMatch", &[s("^[a-z]+$"), s("abc")]), Ok(Value::Bool(true)));
        assert_eq!(
            call("regexReplaceAll", &[s("[0-9]+"), s("a1b22"), s("#")]),
            Ok(s("a#b#"))
        );
        assert!(matches!(
            call("regexFind", &[s("("), s("x")]),
            Err(FuncError::Invalid(_))
        ));
    }

    #[test]
    fn test_collections() {
        let dict = call("dict", &[s("b"), Value::Int(2), s("a"), Value::Int(1)]).unwrap();
        assert_eq!(dict.to_string(), "map[a:1 b:2]");
        assert_eq!(call("hasKey", &[dict.clone(), s("a")]), Ok(Value::Bool(true)));
        assert_eq!(
            call("keys", &[dict]),
            Ok(Value::List(vec![s("a"), s("b")]))
        );
        let list = call("list", &[s("x"), s("y")]).unwrap();
        assert_eq!(call("has", &[s("y"), list.clone()]), Ok(Value::Bool(true)));
        assert_eq!(call("last", &[list]), Ok(s("y")));
    }
}
