//! Statement execution
//!
//! `run_block` is the sequencer: statements run strictly in order and the
//! first non-`Normal` outcome stops the block and is handed to its caller
//! unchanged. `exec_stmt` dispatches a single statement to its handler.

use std::sync::Arc;

use super::errors::ExecError;
use super::invocation::validate_routine;
use super::scope::Scope;
use super::stack;
use super::types::control::try_or_throw;
use super::types::{Control, Expr, Stmt, TypeTag, Val};
use super::{BoxFuture, Interpreter};

impl Interpreter {
    /// Run a statement list in `scope`
    pub fn run_block<'a>(&'a self, stmts: &'a [Stmt], scope: &'a Arc<Scope>) -> BoxFuture<'a, Control> {
        stack::grow(Box::pin(async move {
            for stmt in stmts {
                let control = self.exec_stmt(stmt, scope).await;
                if !control.is_normal() {
                    return control;
                }
            }
            Control::Normal
        }))
    }

    /// Execute one statement
    pub async fn exec_stmt(&self, stmt: &Stmt, scope: &Arc<Scope>) -> Control {
        tracing::debug!(stmt = stmt.kind_name(), depth = scope.depth(), "execute statement");

        match stmt {
            Stmt::Declare { name, ty, init } => self.exec_declare(name, *ty, init.as_ref(), scope).await,

            Stmt::Set { name, path, value } => self.exec_set(name, path, value, scope).await,

            Stmt::If {
                test,
                then_body,
                elseifs,
                else_body,
            } => {
                self.exec_if(test, then_body, elseifs, else_body.as_deref(), scope)
                    .await
            }

            Stmt::While { test, body } => self.exec_while(test, body, scope).await,

            Stmt::ForRange {
                var,
                start,
                end,
                body,
            } => self.exec_for_range(var, start, end, body, scope).await,

            Stmt::ForEach { var, source, body } => self.exec_for_each(var, source, body, scope).await,

            Stmt::Try { body } => self.exec_try(body, scope).await,

            Stmt::Catch { .. } => Control::Throw(ExecError::MisplacedClause {
                clause: "CATCH",
                reason: "found outside of a TRY body".to_string(),
            }),

            Stmt::Finally => Control::Throw(ExecError::MisplacedClause {
                clause: "FINALLY",
                reason: "found outside of a TRY body".to_string(),
            }),

            Stmt::Throw { value } => self.exec_throw(value, scope).await,

            Stmt::Return { value } => self.exec_return(value.as_ref(), scope).await,

            Stmt::Break => Control::Break,

            Stmt::Call { name, args } => {
                try_or_throw!(self.call_routine(name, args, scope).await);
                Control::Normal
            }

            Stmt::Expr { expr } => {
                try_or_throw!(self.eval(expr, scope).await);
                Control::Normal
            }

            Stmt::DefineRoutine { routine } => {
                try_or_throw!(validate_routine(routine));
                try_or_throw!(scope.define_routine(routine.clone()));
                Control::Normal
            }
        }
    }

    /// `DECLARE name TYPE [= init]`
    ///
    /// The initializer is evaluated before the name exists, so it cannot refer
    /// to the variable being declared.
    async fn exec_declare(
        &self,
        name: &str,
        ty: TypeTag,
        init: Option<&Expr>,
        scope: &Arc<Scope>,
    ) -> Control {
        let value = match init {
            Some(expr) => Some(try_or_throw!(self.eval(expr, scope).await)),
            None => None,
        };

        try_or_throw!(scope.declare(name, ty));
        if let Some(value) = value {
            try_or_throw!(scope.set(name, value));
        }
        Control::Normal
    }

    /// `SET name = value` or `SET name[k1][k2] = value`
    async fn exec_set(&self, name: &str, path: &[Expr], value: &Expr, scope: &Arc<Scope>) -> Control {
        let value = try_or_throw!(self.eval(value, scope).await);

        if path.is_empty() {
            try_or_throw!(scope.set(name, value));
            return Control::Normal;
        }

        let mut keys = Vec::with_capacity(path.len());
        for key in path {
            match try_or_throw!(self.eval(key, scope).await) {
                Val::Str(key) => keys.push(key),
                other => {
                    return Control::Throw(ExecError::type_error(format!(
                        "Index key must be STRING, got {}",
                        other.type_name()
                    )))
                }
            }
        }

        let current = try_or_throw!(super::expressions::lookup_variable(scope, name));
        let updated = try_or_throw!(assign_path(current, &keys, value));
        try_or_throw!(scope.set(name, updated));
        Control::Normal
    }
}

/// Replace the value found by following `keys` through nested documents
///
/// The last key may be new; every key before it must exist.
fn assign_path(target: Val, keys: &[String], value: Val) -> Result<Val, ExecError> {
    let Some((key, rest)) = keys.split_first() else {
        return Ok(value);
    };

    match target {
        Val::Doc(mut map) => {
            let child = if rest.is_empty() {
                Val::Null
            } else {
                map.remove(key).ok_or_else(|| ExecError::PropertyNotFound { key: key.clone() })?
            };
            let updated = assign_path(child, rest, value)?;
            map.insert(key.clone(), updated);
            Ok(Val::Doc(map))
        }
        other => Err(ExecError::type_error(format!(
            "Cannot index {} value with key '{}'",
            other.type_name(),
            key
        ))),
    }
}
