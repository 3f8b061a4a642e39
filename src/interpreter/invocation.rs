//! Calls into functions, procedures and builtins
//!
//! A call target is resolved in this order:
//! 1. routines defined in the calling scope or any of its parents
//! 2. builtins
//! 3. the procedure store, if one is configured
//!
//! User routines run in a fresh child scope of the caller. IN arguments are
//! copied in and OUT parameters start unset. INOUT parameters are aliases of
//! the caller's variable. Both OUT and INOUT values are copied back to the
//! caller on every exit path; for INOUT the value is re-read through the alias.

use std::collections::HashSet;
use std::sync::Arc;

use super::errors::ExecError;
use super::scope::Scope;
use super::types::{Control, Expr, ParamMode, Routine, RoutineKind, Val};
use super::Interpreter;

/// Structural checks run when a routine is defined or fetched
pub fn validate_routine(routine: &Routine) -> Result<(), ExecError> {
    let invalid = |reason: &str| ExecError::InvalidDefinition {
        name: routine.name.clone(),
        reason: reason.to_string(),
    };

    if routine.name.is_empty() {
        return Err(invalid("name must not be empty"));
    }

    let mut seen = HashSet::new();
    for param in &routine.params {
        if !seen.insert(param.name.as_str()) {
            return Err(invalid(&format!("duplicate parameter '{}'", param.name)));
        }
    }

    match routine.kind {
        RoutineKind::Function => {
            if routine.body.is_empty() {
                return Err(invalid("function body is empty"));
            }
            if let Some(param) = routine.params.iter().find(|p| p.mode != ParamMode::In) {
                return Err(invalid(&format!(
                    "function parameter '{}' must be IN",
                    param.name
                )));
            }
        }
        RoutineKind::Procedure => {
            if routine.returns.is_some() {
                return Err(invalid("procedures cannot declare a return type"));
            }
        }
    }

    Ok(())
}

/// How one argument reaches the callee
enum BoundArg<'a> {
    In(Val),
    /// Caller variable that receives the final value
    Out(&'a str),
    /// Caller variable the parameter aliases
    InOut(&'a str),
}

impl Interpreter {
    /// Resolve `name` and call it with `args`
    ///
    /// Returns `None` for a procedure that finished without a value.
    pub(crate) async fn call_routine(
        &self,
        name: &str,
        args: &[Expr],
        scope: &Arc<Scope>,
    ) -> Result<Option<Val>, ExecError> {
        if let Some(routine) = scope.get_routine(name) {
            return self.invoke(&routine, args, scope).await;
        }

        if let Some(builtin) = self.builtins.get(name) {
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(self.eval(arg, scope).await?);
            }
            return builtin.call(values).await.map(Some);
        }

        if let Some(store) = &self.procedures {
            let fetched = store.fetch(name).await.map_err(ExecError::external)?;
            if let Some(definition) = fetched {
                tracing::debug!(name, "loaded procedure from store");
                let routine = definition.into_routine(name);
                validate_routine(&routine)?;
                return self.invoke(&routine, args, scope).await;
            }
        }

        Err(ExecError::UndefinedRoutine {
            name: name.to_string(),
        })
    }

    /// Run a user-defined routine in a child scope of `caller`
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(routine = %routine.name, depth = caller.depth() + 1)
    )]
    pub(crate) async fn invoke(
        &self,
        routine: &Routine,
        args: &[Expr],
        caller: &Arc<Scope>,
    ) -> Result<Option<Val>, ExecError> {
        if args.len() != routine.params.len() {
            return Err(ExecError::ArityMismatch {
                routine: routine.name.clone(),
                expected: routine.params.len(),
                got: args.len(),
            });
        }
        if caller.depth() + 1 > self.max_call_depth {
            return Err(ExecError::CallDepthExceeded {
                limit: self.max_call_depth,
            });
        }

        let bound = self.bind_arguments(routine, args, caller).await?;

        let scope = Scope::child(caller);
        let mut copy_back = Vec::new();
        for (param, arg) in routine.params.iter().zip(bound) {
            match arg {
                BoundArg::In(value) => {
                    scope.declare(&param.name, param.ty)?;
                    scope.set(&param.name, value)?;
                }
                BoundArg::Out(target) => {
                    scope.declare(&param.name, param.ty)?;
                    copy_back.push((param.name.as_str(), target));
                }
                BoundArg::InOut(target) => {
                    scope.alias(&param.name, target, param.ty)?;
                    copy_back.push((param.name.as_str(), target));
                }
            }
        }

        let control = self.run_block(&routine.body, &scope).await;

        // Copy-back runs on every exit path; the body's own error wins
        let copied = copy_out(&scope, caller, &copy_back);
        let result = finish(routine, control);
        match (result, copied) {
            (Err(err), _) => Err(err),
            (Ok(_), Err(err)) => Err(err),
            (Ok(value), Ok(())) => Ok(value),
        }
    }

    /// Evaluate and check arguments in the caller's scope, left to right
    async fn bind_arguments<'a>(
        &self,
        routine: &Routine,
        args: &'a [Expr],
        caller: &Arc<Scope>,
    ) -> Result<Vec<BoundArg<'a>>, ExecError> {
        let mut bound = Vec::with_capacity(args.len());

        for (param, arg) in routine.params.iter().zip(args) {
            let mismatch = |got: &'static str| ExecError::ParamTypeMismatch {
                routine: routine.name.clone(),
                param: param.name.clone(),
                expected: param.ty,
                got,
            };

            if param.mode == ParamMode::In {
                let value = self.eval(arg, caller).await?;
                if !param.ty.accepts(&value) {
                    return Err(mismatch(value.type_name()));
                }
                bound.push(BoundArg::In(value));
                continue;
            }

            let Expr::Ident { name: target } = arg else {
                return Err(ExecError::InvalidArgument {
                    routine: routine.name.clone(),
                    param: param.name.clone(),
                    reason: "OUT and INOUT arguments must be variable names".to_string(),
                });
            };
            if !caller.is_declared(target) {
                return Err(ExecError::Undeclared {
                    name: target.clone(),
                });
            }

            if param.mode == ParamMode::Out {
                bound.push(BoundArg::Out(target));
            } else {
                if let Some(current) = caller.get(target)? {
                    if !param.ty.accepts(&current) {
                        return Err(mismatch(current.type_name()));
                    }
                }
                bound.push(BoundArg::InOut(target));
            }
        }

        Ok(bound)
    }
}

/// Copy assigned OUT and INOUT parameters into their caller variables
///
/// Parameters the body never assigned leave the caller's variable untouched.
fn copy_out(scope: &Scope, caller: &Scope, params: &[(&str, &str)]) -> Result<(), ExecError> {
    for (param, target) in params {
        if let Some(value) = scope.get(param)? {
            caller.set(target, value)?;
        }
    }
    Ok(())
}

/// Turn the body's outcome into the call's result
fn finish(routine: &Routine, control: Control) -> Result<Option<Val>, ExecError> {
    match (routine.kind, control) {
        (_, Control::Throw(err)) => Err(err),
        (_, Control::Break) => Err(ExecError::BreakOutsideLoop),

        (RoutineKind::Function, Control::Normal) => Err(ExecError::MissingReturn {
            name: routine.name.clone(),
        }),
        (RoutineKind::Function, Control::Return(value)) => match routine.returns {
            Some(ty) if !ty.accepts(&value) => Err(ExecError::type_error(format!(
                "Function '{}' must return {}, got {}",
                routine.name,
                ty,
                value.type_name()
            ))),
            _ => Ok(Some(value)),
        },

        (RoutineKind::Procedure, Control::Normal) => Ok(None),
        (RoutineKind::Procedure, Control::Return(value)) => Ok(Some(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::types::{Parameter, Stmt, TypeTag};

    fn function(params: Vec<Parameter>, body: Vec<Stmt>) -> Routine {
        Routine {
            kind: RoutineKind::Function,
            name: "f".to_string(),
            params,
            returns: None,
            body,
        }
    }

    #[test]
    fn test_validate_function_rules() {
        let ok = function(
            vec![Parameter::input("a", TypeTag::Number)],
            vec![Stmt::ret(Expr::ident("a"))],
        );
        assert!(validate_routine(&ok).is_ok());

        let empty = function(vec![], vec![]);
        assert!(validate_routine(&empty).is_err());

        let out_param = function(
            vec![Parameter::new("a", TypeTag::Number, ParamMode::Out)],
            vec![Stmt::ret(Expr::num(1.0))],
        );
        assert!(validate_routine(&out_param).is_err());
    }

    #[test]
    fn test_validate_rejects_duplicate_params() {
        let mut routine = function(
            vec![
                Parameter::input("a", TypeTag::Number),
                Parameter::input("a", TypeTag::String),
            ],
            vec![Stmt::ret(Expr::num(1.0))],
        );
        routine.kind = RoutineKind::Procedure;

        let err = validate_routine(&routine).unwrap_err();
        assert_eq!(err.code(), crate::interpreter::errors::INVALID_DEFINITION);
    }

    #[test]
    fn test_finish_function_outcomes() {
        let mut routine = function(vec![], vec![Stmt::Break]);

        assert_eq!(
            finish(&routine, Control::Normal),
            Err(ExecError::MissingReturn {
                name: "f".to_string()
            })
        );
        assert_eq!(
            finish(&routine, Control::Break),
            Err(ExecError::BreakOutsideLoop)
        );

        routine.returns = Some(TypeTag::Number);
        assert!(finish(&routine, Control::Return(Val::str("x"))).is_err());
        assert_eq!(
            finish(&routine, Control::Return(Val::Num(1.0))),
            Ok(Some(Val::Num(1.0)))
        );
    }

    #[test]
    fn test_finish_procedure_without_value() {
        let mut routine = function(vec![], vec![Stmt::Break]);
        routine.kind = RoutineKind::Procedure;

        assert_eq!(finish(&routine, Control::Normal), Ok(None));
    }
}
