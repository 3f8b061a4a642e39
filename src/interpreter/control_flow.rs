//! Control flow handlers
//!
//! Each construct consumes the outcomes of its nested blocks:
//! - loops turn `Break` into `Normal` and pass `Return` / `Throw` on
//! - try/catch/finally absorbs `Throw` when a CATCH section exists
//! - everything else is propagated unchanged

use std::sync::Arc;

use super::errors::ExecError;
use super::scope::Scope;
use super::types::control::try_or_throw;
use super::types::{Control, ElseIf, Expr, Stmt, TypeTag, Val};
use super::Interpreter;

/// What a loop does after one run of its body
enum LoopStep {
    Next,
    Exit(Control),
}

fn after_iteration(control: Control) -> LoopStep {
    match control {
        Control::Normal => LoopStep::Next,
        Control::Break => LoopStep::Exit(Control::Normal),
        other => LoopStep::Exit(other),
    }
}

impl Interpreter {
    /// Evaluate a branch or loop condition, which must be BOOLEAN
    async fn eval_condition(
        &self,
        test: &Expr,
        construct: &str,
        scope: &Arc<Scope>,
    ) -> Result<bool, ExecError> {
        match self.eval(test, scope).await? {
            Val::Bool(b) => Ok(b),
            other => Err(ExecError::type_error(format!(
                "{} condition must be BOOLEAN, got {}",
                construct,
                other.type_name()
            ))),
        }
    }

    /* ===================== Branches ===================== */

    pub(crate) async fn exec_if(
        &self,
        test: &Expr,
        then_body: &[Stmt],
        elseifs: &[ElseIf],
        else_body: Option<&[Stmt]>,
        scope: &Arc<Scope>,
    ) -> Control {
        if try_or_throw!(self.eval_condition(test, "IF", scope).await) {
            return self.run_block(then_body, scope).await;
        }

        for arm in elseifs {
            if try_or_throw!(self.eval_condition(&arm.test, "ELSEIF", scope).await) {
                return self.run_block(&arm.body, scope).await;
            }
        }

        match else_body {
            Some(body) => self.run_block(body, scope).await,
            None => Control::Normal,
        }
    }

    /* ===================== Loops ===================== */

    pub(crate) async fn exec_while(&self, test: &Expr, body: &[Stmt], scope: &Arc<Scope>) -> Control {
        loop {
            if !try_or_throw!(self.eval_condition(test, "WHILE", scope).await) {
                return Control::Normal;
            }
            if let LoopStep::Exit(control) = after_iteration(self.run_block(body, scope).await) {
                return control;
            }
        }
    }

    /// Inclusive numeric range, counting down when `start > end`
    pub(crate) async fn exec_for_range(
        &self,
        var: &str,
        start: &Expr,
        end: &Expr,
        body: &[Stmt],
        scope: &Arc<Scope>,
    ) -> Control {
        let start = try_or_throw!(self.eval(start, scope).await.and_then(|v| range_bound("start", v)));
        let end = try_or_throw!(self.eval(end, scope).await.and_then(|v| range_bound("end", v)));
        try_or_throw!(bind_loop_variable(scope, var, TypeTag::Number));

        let step = if start <= end { 1.0 } else { -1.0 };
        let mut current = start;
        while (step > 0.0 && current <= end) || (step < 0.0 && current >= end) {
            try_or_throw!(scope.set(var, Val::Num(current)));
            if let LoopStep::Exit(control) = after_iteration(self.run_block(body, scope).await) {
                return control;
            }
            current += step;
        }
        Control::Normal
    }

    pub(crate) async fn exec_for_each(
        &self,
        var: &str,
        source: &Expr,
        body: &[Stmt],
        scope: &Arc<Scope>,
    ) -> Control {
        let items = match try_or_throw!(self.eval(source, scope).await) {
            Val::Array(items) => items,
            other => {
                return Control::Throw(ExecError::type_error(format!(
                    "FOR loop source must be ARRAY, got {}",
                    other.type_name()
                )))
            }
        };
        if items.is_empty() {
            return Control::Normal;
        }
        try_or_throw!(bind_loop_variable(scope, var, TypeTag::Any));

        for item in items {
            try_or_throw!(scope.set(var, item));
            if let LoopStep::Exit(control) = after_iteration(self.run_block(body, scope).await) {
                return control;
            }
        }
        Control::Normal
    }

    /* ===================== Exceptions ===================== */

    /// TRY body [CATCH [var] ...] [FINALLY ...]
    ///
    /// CATCH statements replace a `Throw` from the body with their own outcome.
    /// FINALLY statements always run; if they end with anything but `Normal`,
    /// that outcome replaces whatever came before, including a `Return`.
    pub(crate) async fn exec_try(&self, stmts: &[Stmt], scope: &Arc<Scope>) -> Control {
        let sections = try_or_throw!(partition_try(stmts));

        let mut outcome = self.run_block(sections.body, scope).await;

        let caught = match &outcome {
            Control::Throw(err) => Some(err.clone()),
            _ => None,
        };
        if let (Some(err), Some(catch)) = (caught, &sections.catch) {
            tracing::debug!(code = err.code(), error = %err, "caught error");
            outcome = match bind_caught(scope, catch.var, &err) {
                Ok(()) => self.run_block(catch.body, scope).await,
                Err(bind_err) => Control::Throw(bind_err),
            };
        }

        if let Some(finally) = sections.finally {
            let cleanup = self.run_block(finally, scope).await;
            if !cleanup.is_normal() {
                outcome = cleanup;
            }
        }

        outcome
    }

    pub(crate) async fn exec_throw(&self, value: &Expr, scope: &Arc<Scope>) -> Control {
        let value = try_or_throw!(self.eval(value, scope).await);
        Control::Throw(ExecError::Thrown(value))
    }

    pub(crate) async fn exec_return(&self, value: Option<&Expr>, scope: &Arc<Scope>) -> Control {
        match value {
            Some(expr) => Control::Return(try_or_throw!(self.eval(expr, scope).await)),
            None => Control::Return(Val::Null),
        }
    }
}

fn range_bound(which: &str, value: Val) -> Result<f64, ExecError> {
    match value {
        Val::Num(n) => Ok(n),
        other => Err(ExecError::type_error(format!(
            "FOR range {} must be NUMBER, got {}",
            which,
            other.type_name()
        ))),
    }
}

/// Loop variables are declared in the current scope unless already visible
fn bind_loop_variable(scope: &Scope, var: &str, ty: TypeTag) -> Result<(), ExecError> {
    if scope.is_declared(var) {
        Ok(())
    } else {
        scope.declare(var, ty)
    }
}

fn bind_caught(scope: &Scope, var: Option<&String>, err: &ExecError) -> Result<(), ExecError> {
    let Some(var) = var else {
        return Ok(());
    };
    if !scope.is_declared(var) {
        scope.declare(var, TypeTag::Any)?;
    }
    scope.set(var, err.to_val())
}

/* ===================== Try Sections ===================== */

struct CatchSection<'a> {
    var: Option<&'a String>,
    body: &'a [Stmt],
}

struct TrySections<'a> {
    body: &'a [Stmt],
    catch: Option<CatchSection<'a>>,
    finally: Option<&'a [Stmt]>,
}

/// Split a TRY statement list at its CATCH and FINALLY markers
fn partition_try(stmts: &[Stmt]) -> Result<TrySections<'_>, ExecError> {
    let mut catch_at: Option<usize> = None;
    let mut finally_at: Option<usize> = None;

    for (idx, stmt) in stmts.iter().enumerate() {
        match stmt {
            Stmt::Catch { .. } => {
                if catch_at.is_some() {
                    return Err(misplaced("CATCH", "more than one CATCH in TRY"));
                }
                if finally_at.is_some() {
                    return Err(misplaced("CATCH", "CATCH must come before FINALLY"));
                }
                catch_at = Some(idx);
            }
            Stmt::Finally => {
                if finally_at.is_some() {
                    return Err(misplaced("FINALLY", "more than one FINALLY in TRY"));
                }
                finally_at = Some(idx);
            }
            _ => {}
        }
    }

    let body_end = catch_at.or(finally_at).unwrap_or(stmts.len());
    let catch = catch_at.map(|idx| {
        let var = match &stmts[idx] {
            Stmt::Catch { var } => var.as_ref(),
            _ => None,
        };
        CatchSection {
            var,
            body: &stmts[idx + 1..finally_at.unwrap_or(stmts.len())],
        }
    });
    let finally = finally_at.map(|idx| &stmts[idx + 1..]);

    Ok(TrySections {
        body: &stmts[..body_end],
        catch,
        finally,
    })
}

fn misplaced(clause: &'static str, reason: &str) -> ExecError {
    ExecError::MisplacedClause {
        clause,
        reason: reason.to_string(),
    }
}
