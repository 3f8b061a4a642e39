//! Builtin functions
//!
//! Builtins live in a flat name -> implementation registry that is consulted
//! when a call target is not a user-defined routine. Every builtin declares its
//! formal parameters; argument count and types are checked before the body
//! runs, so bodies only deal with well-shaped input.
//!
//! Bodies come in two forms:
//! - `Sync`: a plain `fn(&[Val])`, used by the pure functions in this module
//! - `Async`: a `NativeFunction` trait object, used where the builtin talks
//!   to an outside collaborator (see `documents`)

pub mod collections;
pub mod documents;
pub mod math;
pub mod system;
pub mod text;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use super::errors::ExecError;
use super::types::{Parameter, TypeTag, Val};

/* ===================== Builtin Types ===================== */

pub type SyncBuiltinFn = fn(&[Val]) -> Result<Val, ExecError>;

/// Asynchronous builtin body
#[async_trait]
pub trait NativeFunction: Send + Sync {
    async fn call(&self, args: Vec<Val>) -> Result<Val, ExecError>;
}

#[derive(Clone)]
pub enum BuiltinBody {
    Sync(SyncBuiltinFn),
    Async(Arc<dyn NativeFunction>),
}

#[derive(Clone)]
pub struct Builtin {
    pub name: String,
    pub params: Vec<Parameter>,
    /// The last parameter may appear any number of times, including none
    pub variadic: bool,
    pub body: BuiltinBody,
}

impl std::fmt::Debug for Builtin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Builtin")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("variadic", &self.variadic)
            .finish()
    }
}

impl Builtin {
    pub fn sync(name: &str, params: &[(&str, TypeTag)], body: SyncBuiltinFn) -> Self {
        Self {
            name: name.to_string(),
            params: to_params(params),
            variadic: false,
            body: BuiltinBody::Sync(body),
        }
    }

    pub fn native(name: &str, params: &[(&str, TypeTag)], body: Arc<dyn NativeFunction>) -> Self {
        Self {
            name: name.to_string(),
            params: to_params(params),
            variadic: false,
            body: BuiltinBody::Async(body),
        }
    }

    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    /// Check argument count and types against the declared parameters
    pub fn validate(&self, args: &[Val]) -> Result<(), ExecError> {
        let (expected, arity_ok) = if self.variadic {
            let required = self.params.len().saturating_sub(1);
            (required, args.len() >= required)
        } else {
            (self.params.len(), args.len() == self.params.len())
        };
        if !arity_ok {
            return Err(ExecError::ArityMismatch {
                routine: self.name.clone(),
                expected,
                got: args.len(),
            });
        }

        for (idx, arg) in args.iter().enumerate() {
            let Some(param) = self.params.get(idx).or_else(|| self.params.last()) else {
                break;
            };
            if !param.ty.accepts(arg) {
                return Err(ExecError::ParamTypeMismatch {
                    routine: self.name.clone(),
                    param: param.name.clone(),
                    expected: param.ty,
                    got: arg.type_name(),
                });
            }
        }
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip_all, fields(builtin = %self.name, args = args.len()))]
    pub async fn call(&self, args: Vec<Val>) -> Result<Val, ExecError> {
        self.validate(&args)?;
        match &self.body {
            BuiltinBody::Sync(f) => f(&args),
            BuiltinBody::Async(native) => native.call(args).await,
        }
    }
}

fn to_params(params: &[(&str, TypeTag)]) -> Vec<Parameter> {
    params
        .iter()
        .map(|(name, ty)| Parameter::input(*name, *ty))
        .collect()
}

/* ===================== Registry ===================== */

#[derive(Debug, Clone, Default)]
pub struct BuiltinRegistry {
    functions: HashMap<String, Builtin>,
}

impl BuiltinRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every pure standard library function
    pub fn with_stdlib() -> Self {
        let mut registry = Self::new();
        math::register(&mut registry);
        text::register(&mut registry);
        collections::register(&mut registry);
        system::register(&mut registry);
        registry
    }

    /// Add a builtin, replacing any previous one with the same name
    pub fn register(&mut self, builtin: Builtin) {
        self.functions.insert(builtin.name.clone(), builtin);
    }

    pub fn get(&self, name: &str) -> Option<&Builtin> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/* ===================== Argument Helpers ===================== */

// Parameter types already accept NULL; these reject it with a readable message.

pub(crate) fn num_arg(name: &str, args: &[Val], idx: usize) -> Result<f64, ExecError> {
    match args.get(idx) {
        Some(Val::Num(n)) => Ok(*n),
        other => Err(bad_arg(name, idx, "NUMBER", other)),
    }
}

pub(crate) fn str_arg<'a>(name: &str, args: &'a [Val], idx: usize) -> Result<&'a str, ExecError> {
    match args.get(idx) {
        Some(Val::Str(s)) => Ok(s),
        other => Err(bad_arg(name, idx, "STRING", other)),
    }
}

pub(crate) fn array_arg<'a>(name: &str, args: &'a [Val], idx: usize) -> Result<&'a [Val], ExecError> {
    match args.get(idx) {
        Some(Val::Array(items)) => Ok(items),
        other => Err(bad_arg(name, idx, "ARRAY", other)),
    }
}

pub(crate) fn doc_arg<'a>(
    name: &str,
    args: &'a [Val],
    idx: usize,
) -> Result<&'a HashMap<String, Val>, ExecError> {
    match args.get(idx) {
        Some(Val::Doc(map)) => Ok(map),
        other => Err(bad_arg(name, idx, "DOCUMENT", other)),
    }
}

fn bad_arg(name: &str, idx: usize, expected: &str, got: Option<&Val>) -> ExecError {
    let got = got.map_or("nothing", Val::type_name);
    ExecError::builtin(
        name,
        format!("argument {} must be {}, got {}", idx + 1, expected, got),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first(args: &[Val]) -> Result<Val, ExecError> {
        Ok(args[0].clone())
    }

    #[tokio::test]
    async fn test_call_validates_arity_and_types() {
        let builtin = Builtin::sync("first", &[("value", TypeTag::Number)], first);

        assert_eq!(builtin.call(vec![Val::Num(1.0)]).await, Ok(Val::Num(1.0)));
        assert_eq!(
            builtin.call(vec![]).await,
            Err(ExecError::ArityMismatch {
                routine: "first".to_string(),
                expected: 1,
                got: 0
            })
        );
        let err = builtin.call(vec![Val::str("x")]).await.unwrap_err();
        assert_eq!(err.code(), crate::interpreter::errors::WRONG_ARG_TYPE);
    }

    #[tokio::test]
    async fn test_variadic_checks_extra_args_against_last_param() {
        let builtin = Builtin::sync(
            "first",
            &[("head", TypeTag::Number), ("rest", TypeTag::Number)],
            first,
        )
        .variadic();

        assert!(builtin.call(vec![Val::Num(1.0)]).await.is_ok());
        assert!(builtin.call(vec![Val::Num(1.0), Val::Num(2.0), Val::Num(3.0)]).await.is_ok());
        assert!(builtin.call(vec![Val::Num(1.0), Val::str("2")]).await.is_err());
        assert_eq!(
            builtin.call(vec![]).await,
            Err(ExecError::ArityMismatch {
                routine: "first".to_string(),
                expected: 1,
                got: 0
            })
        );
    }

    #[tokio::test]
    async fn test_variadic_accepts_no_arguments() {
        let registry = BuiltinRegistry::with_stdlib();

        let line = registry.get("print").unwrap().call(vec![]).await;

        assert_eq!(line, Ok(Val::str("")));
    }

    #[test]
    fn test_stdlib_registry_contents() {
        let registry = BuiltinRegistry::with_stdlib();

        for name in ["abs", "upper", "length", "print", "now"] {
            assert!(registry.contains(name), "missing builtin {}", name);
        }
        assert!(!registry.contains("doc_get"));
        assert!(!registry.contains("ABS"));
    }

    #[test]
    fn test_register_replaces_existing() {
        let mut registry = BuiltinRegistry::with_stdlib();
        registry.register(Builtin::sync("abs", &[], |_| Ok(Val::Null)));

        assert!(registry.get("abs").unwrap().params.is_empty());
    }
}
