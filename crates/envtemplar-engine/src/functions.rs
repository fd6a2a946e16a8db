//! Template functions and the capability sets that hold them
//!
//! A [`FunctionSet`] maps names to typed callables with an explicit
//! [`Arity`]. Sets are built per library (builtins, helper library,
//! environment library) and merged before a template is parsed; a name
//! defined by two libraries is rejected instead of shadowed.
//!
//! The environment library is the only way templates read variables:
//!
//! - `env NAME` returns the bound value, or `""` when `NAME` is unset. It
//!   never fails.
//! - field access such as `.NAME` is never bound to the environment and
//!   always fails in the strict dialect.
//!
//! Keep that asymmetry when adding functions: lookups by name are lenient,
//! references to undefined fields or variables are errors.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use envtemplar_core::RenderContext;
use thiserror::Error;

use crate::error::EngineError;
use crate::value::Value;

/// Message of the error raised by `require`
pub const REQUIRE_MESSAGE: &str = "Required argument is missing or empty!";

/// Failure raised by a template function
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FuncError {
    #[error("{0}")]
    RequiredValueMissing(String),

    #[error("{0}")]
    TypeMismatch(String),

    #[error("{0}")]
    Invalid(String),
}

impl FuncError {
    /// `wrong type for value; expected string; got int`
    pub fn wrong_type(expected: &str, got: &Value) -> Self {
        FuncError::TypeMismatch(format!(
            "wrong type for value; expected {}; got {}",
            expected,
            got.type_name()
        ))
    }
}

pub type FuncResult = Result<Value, FuncError>;

/// State visible to functions during one render
#[derive(Debug, Clone, Copy)]
pub struct CallContext<'a> {
    /// Environment snapshot of the render
    pub env: &'a RenderContext,
    /// Name of the template being rendered
    pub template: &'a str,
}

/// Accepted argument counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
    Between(usize, usize),
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        match *self {
            Arity::Exact(n) => count == n,
            Arity::AtLeast(n) => count >= n,
            Arity::Between(lo, hi) => (lo..=hi).contains(&count),
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "{n}"),
            Arity::AtLeast(n) => write!(f, "at least {n}"),
            Arity::Between(lo, hi) => write!(f, "{lo} to {hi}"),
        }
    }
}

type Callable = Arc<dyn Fn(&CallContext<'_>, &[Value]) -> FuncResult + Send + Sync>;

/// A named, typed template function
#[derive(Clone)]
pub struct Function {
    name: String,
    library: &'static str,
    arity: Arity,
    call: Callable,
}

impl Function {
    pub fn new<F>(name: impl Into<String>, library: &'static str, arity: Arity, call: F) -> Self
    where
        F: Fn(&CallContext<'_>, &[Value]) -> FuncResult + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            library,
            arity,
            call: Arc::new(call),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn library(&self) -> &'static str {
        self.library
    }

    pub fn arity(&self) -> Arity {
        self.arity
    }

    /// Check the argument count, then invoke
    pub fn call(&self, ctx: &CallContext<'_>, args: &[Value]) -> FuncResult {
        if !self.arity.accepts(args.len()) {
            return Err(FuncError::Invalid(format!(
                "wrong number of args for {}: want {} got {}",
                self.name,
                self.arity,
                args.len()
            )));
        }
        (self.call)(ctx, args)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("library", &self.library)
            .field("arity", &self.arity)
            .finish()
    }
}

/// Capability set: function name to callable
#[derive(Debug, Clone, Default)]
pub struct FunctionSet {
    funcs: BTreeMap<String, Function>,
}

impl FunctionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a function of one library, replacing an earlier definition
    /// of the same name in that library
    pub fn define<F>(&mut self, library: &'static str, name: &str, arity: Arity, call: F)
    where
        F: Fn(&CallContext<'_>, &[Value]) -> FuncResult + Send + Sync + 'static,
    {
        self.funcs
            .insert(name.to_string(), Function::new(name, library, arity, call));
    }

    /// Like [`define`](Self::define) for functions that never read the render state
    pub fn define_pure<F>(&mut self, library: &'static str, name: &str, arity: Arity, call: F)
    where
        F: Fn(&[Value]) -> FuncResult + Send + Sync + 'static,
    {
        self.define(library, name, arity, move |_, args| call(args));
    }

    /// Merge `other` into this set
    ///
    /// Fails on the first name (in sorted order) present in both sets.
    pub fn merge(mut self, other: FunctionSet) -> Result<Self, EngineError> {
        if let Some((name, theirs)) = other
            .funcs
            .iter()
            .find(|(name, _)| self.funcs.contains_key(*name))
        {
            let first = self.funcs[name].library;
            return Err(EngineError::FunctionCollision {
                name: name.clone(),
                first,
                second: theirs.library,
            });
        }
        self.funcs.extend(other.funcs);
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&Function> {
        self.funcs.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.funcs.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.funcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.funcs.is_empty()
    }

    /// Function names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.funcs.keys().map(String::as_str)
    }

    /// The full set used by the strict engine: builtins, helper library
    /// and environment library
    pub fn standard() -> Result<Self, EngineError> {
        crate::builtins::library()
            .merge(crate::stdlib::library())?
            .merge(environment())
    }
}

/// Argument accepted by `require`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequireArg {
    Plain(String),
    Optional(Option<String>),
    Absent,
}

impl From<String> for RequireArg {
    fn from(s: String) -> Self {
        RequireArg::Plain(s)
    }
}

impl From<&str> for RequireArg {
    fn from(s: &str) -> Self {
        RequireArg::Plain(s.to_string())
    }
}

impl From<Option<String>> for RequireArg {
    fn from(opt: Option<String>) -> Self {
        RequireArg::Optional(opt)
    }
}

impl TryFrom<&Value> for RequireArg {
    type Error = FuncError;

    fn try_from(value: &Value) -> Result<Self, FuncError> {
        match value {
            Value::String(s) => Ok(RequireArg::Plain(s.clone())),
            Value::Nil => Ok(RequireArg::Absent),
            other => Err(FuncError::TypeMismatch(format!(
                "require: unsupported argument type {}",
                other.type_name()
            ))),
        }
    }
}

/// Return the string when non-empty, fail otherwise
pub fn require(arg: RequireArg) -> Result<String, FuncError> {
    match arg {
        RequireArg::Plain(s) | RequireArg::Optional(Some(s)) if !s.is_empty() => Ok(s),
        _ => Err(FuncError::RequiredValueMissing(REQUIRE_MESSAGE.to_string())),
    }
}

/// Pass `value` through unless it is nil or the empty string
pub fn required(message: &str, value: &Value) -> FuncResult {
    match value {
        Value::Nil => Err(FuncError::RequiredValueMissing(message.to_string())),
        Value::String(s) if s.is_empty() => {
            Err(FuncError::RequiredValueMissing(message.to_string()))
        }
        other => Ok(other.clone()),
    }
}

const ENVIRONMENT: &str = "environment";

/// `env`, `envall`, `require` and `required`
pub fn environment() -> FunctionSet {
    let mut set = FunctionSet::new();

    set.define(ENVIRONMENT, "env", Arity::Exact(1), |ctx, args| {
        let name = expect_str("env", args, 0)?;
        Ok(Value::from(ctx.env.lookup(name)))
    });

    set.define(ENVIRONMENT, "envall", Arity::Exact(0), |ctx, _| {
        Ok(Value::Map(
            ctx.env
                .iter()
                .map(|(k, v)| (k.to_string(), Value::from(v)))
                .collect(),
        ))
    });

    set.define(ENVIRONMENT, "require", Arity::Exact(1), |ctx, args| {
        tracing::warn!(
            template = ctx.template,
            "require is deprecated; use required instead"
        );
        let arg = RequireArg::try_from(&args[0])?;
        require(arg).map(Value::String)
    });

    set.define_pure(ENVIRONMENT, "required", Arity::Exact(2), |args| {
        let message = expect_str("required", args, 0)?;
        required(message, &args[1])
    });

    set
}

/// String argument at `index`, or a type mismatch naming the function
pub(crate) fn expect_str<'a>(func: &str, args: &'a [Value], index: usize) -> Result<&'a str, FuncError> {
    match args.get(index) {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(FuncError::TypeMismatch(format!(
            "{}: wrong type for value; expected string; got {}",
            func,
            other.type_name()
        ))),
        None => Err(FuncError::Invalid(format!("{}: missing argument {}", func, index + 1))),
    }
}

/// Integer argument at `index`; integral floats are accepted
pub(crate) fn expect_int(func: &str, args: &[Value], index: usize) -> Result<i64, FuncError> {
    match args.get(index) {
        Some(Value::Int(i)) => Ok(*i),
        Some(Value::Float(f)) if f.fract() == 0.0 => Ok(*f as i64),
        Some(other) => Err(FuncError::TypeMismatch(format!(
            "{}: wrong type for value; expected int; got {}",
            func,
            other.type_name()
        ))),
        None => Err(FuncError::Invalid(format!("{}: missing argument {}", func, index + 1))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn call(set: &FunctionSet, env: &RenderContext, name: &str, args: &[Value]) -> FuncResult {
        let ctx = CallContext {
            env,
            template: "test",
        };
        set.get(name).unwrap().call(&ctx, args)
    }

    #[test]
    fn test_env_returns_empty_for_unset() {
        let env: RenderContext = [("DEFINED", "foo")].into_iter().collect();
        let set = environment();

        assert_eq!(
            call(&set, &env, "env", &[Value::from("DEFINED")]),
            Ok(Value::from("foo"))
        );
        assert_eq!(
            call(&set, &env, "env", &[Value::from("NONEXISTING")]),
            Ok(Value::from(""))
        );
    }

    #[test]
    fn test_envall_returns_whole_context() {
        let env: RenderContext = [("A", "1"), ("B", "2")].into_iter().collect();
        let all = call(&environment(), &env, "envall", &[]).unwrap();
        assert_eq!(all.to_string(), "map[A:1 B:2]");
    }

    #[test]
    fn test_require_variants() {
        assert_eq!(require("foo".into()), Ok("foo".to_string()));
        assert_eq!(require(Some("bar".to_string()).into()), Ok("bar".to_string()));

        for arg in [
            RequireArg::from(""),
            RequireArg::Optional(None),
            RequireArg::Optional(Some(String::new())),
            RequireArg::Absent,
        ] {
            assert_eq!(
                require(arg),
                Err(FuncError::RequiredValueMissing(REQUIRE_MESSAGE.to_string()))
            );
        }
    }

    #[test]
    fn test_require_rejects_other_types() {
        let err = RequireArg::try_from(&Value::Int(3)).unwrap_err();
        assert_eq!(
            err,
            FuncError::TypeMismatch("require: unsupported argument type int".to_string())
        );
    }

    #[test]
    fn test_required_passes_non_empty_values_through() {
        assert_eq!(required("msg", &Value::from("foo")), Ok(Value::from("foo")));
        assert_eq!(required("msg", &Value::Int(0)), Ok(Value::Int(0)));
        assert_eq!(
            required("msg", &Value::from("")),
            Err(FuncError::RequiredValueMissing("msg".to_string()))
        );
        assert_eq!(
            required("msg", &Value::Nil),
            Err(FuncError::RequiredValueMissing("msg".to_string()))
        );
    }

    #[test]
    fn test_arity_is_checked() {
        let env = RenderContext::default();
        let err = call(&environment(), &env, "env", &[]).unwrap_err();
        assert_eq!(
            err,
            FuncError::Invalid("wrong number of args for env: want 1 got 0".to_string())
        );
    }

    #[test]
    fn test_merge_rejects_collisions() {
        let mut ours = FunctionSet::new();
        ours.define_pure("ours", "upper", Arity::Exact(1), |args| Ok(args[0].clone()));

        let err = ours.merge(crate::stdlib::library()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(
            err.to_string(),
            "Function `upper` is provided by both the `ours` and `stdlib` libraries"
        );
    }

    #[test]
    fn test_standard_set_has_no_collisions() {
        let set = FunctionSet::standard().unwrap();
        for name in ["env", "envall", "require", "required", "default", "upper", "printf", "eq"] {
            assert!(set.contains(name), "missing {name}");
        }
        assert_eq!(set.get("env").unwrap().library(), "environment");
    }
}
