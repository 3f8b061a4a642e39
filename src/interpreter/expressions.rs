//! Expression evaluation
//!
//! Operands are evaluated strictly left to right. `AND` / `OR` only evaluate
//! their right operand when the left one does not decide the result.

use std::sync::Arc;

use super::errors::ExecError;
use super::scope::Scope;
use super::stack;
use super::types::{BinOp, Expr, UnaryOp, Val};
use super::{BoxFuture, Interpreter};

impl Interpreter {
    /// Evaluate an expression to a value
    pub fn eval<'a>(
        &'a self,
        expr: &'a Expr,
        scope: &'a Arc<Scope>,
    ) -> BoxFuture<'a, Result<Val, ExecError>> {
        stack::grow(Box::pin(async move {
            match expr {
                Expr::LitNull => Ok(Val::Null),

                Expr::LitBool { v } => Ok(Val::Bool(*v)),

                Expr::LitNum { v } => Ok(Val::Num(*v)),

                Expr::LitStr { v } => Ok(Val::Str(v.clone())),

                Expr::Array { items } => {
                    let mut values = Vec::with_capacity(items.len());
                    for item in items {
                        values.push(self.eval(item, scope).await?);
                    }
                    Ok(Val::Array(values))
                }

                Expr::Ident { name } => lookup_variable(scope, name),

                Expr::Index { target, keys } => {
                    let mut current = self.eval(target, scope).await?;
                    for key in keys {
                        let key = self.eval(key, scope).await?;
                        current = index_value(current, key)?;
                    }
                    Ok(current)
                }

                Expr::Unary { op, operand } => {
                    let value = self.eval(operand, scope).await?;
                    apply_unary(*op, value)
                }

                Expr::Binary { op, left, right } => self.eval_binary(*op, left, right, scope).await,

                Expr::Call { name, args } => {
                    let result = self.call_routine(name, args, scope).await?;
                    Ok(result.unwrap_or(Val::Null))
                }
            }
        }))
    }

    async fn eval_binary(
        &self,
        op: BinOp,
        left: &Expr,
        right: &Expr,
        scope: &Arc<Scope>,
    ) -> Result<Val, ExecError> {
        match op {
            BinOp::Or | BinOp::And => {
                let lhs = expect_bool(op, self.eval(left, scope).await?)?;
                // OR is decided by true, AND by false
                if lhs == (op == BinOp::Or) {
                    return Ok(Val::Bool(lhs));
                }
                let rhs = expect_bool(op, self.eval(right, scope).await?)?;
                Ok(Val::Bool(rhs))
            }
            _ => {
                let lhs = self.eval(left, scope).await?;
                let rhs = self.eval(right, scope).await?;
                apply_binary(op, lhs, rhs)
            }
        }
    }
}

/// Read a variable; undeclared and unset variables are both errors
pub fn lookup_variable(scope: &Scope, name: &str) -> Result<Val, ExecError> {
    scope.get(name)?.ok_or_else(|| ExecError::Unset {
        name: name.to_string(),
    })
}

/// Apply one bracket index to a document
pub fn index_value(target: Val, key: Val) -> Result<Val, ExecError> {
    let key = match key {
        Val::Str(key) => key,
        other => {
            return Err(ExecError::type_error(format!(
                "Index key must be STRING, got {}",
                other.type_name()
            )))
        }
    };

    match target {
        Val::Doc(mut map) => map
            .remove(&key)
            .ok_or(ExecError::PropertyNotFound { key }),
        other => Err(ExecError::type_error(format!(
            "Cannot index {} value with key '{}'",
            other.type_name(),
            key
        ))),
    }
}

pub fn apply_unary(op: UnaryOp, value: Val) -> Result<Val, ExecError> {
    match (op, value) {
        (UnaryOp::Neg, Val::Num(n)) => Ok(Val::Num(-n)),
        (UnaryOp::Not, Val::Bool(b)) => Ok(Val::Bool(!b)),
        (UnaryOp::Neg, other) => Err(ExecError::type_error(format!(
            "Unary '-' expects NUMBER, got {}",
            other.type_name()
        ))),
        (UnaryOp::Not, other) => Err(ExecError::type_error(format!(
            "NOT expects BOOLEAN, got {}",
            other.type_name()
        ))),
    }
}

/// Apply a non-short-circuit binary operator to evaluated operands
pub fn apply_binary(op: BinOp, lhs: Val, rhs: Val) -> Result<Val, ExecError> {
    match op {
        BinOp::Eq => values_equal(op, &lhs, &rhs).map(Val::Bool),
        BinOp::Ne => values_equal(op, &lhs, &rhs).map(|eq| Val::Bool(!eq)),

        BinOp::Add => match (lhs, rhs) {
            (Val::Num(l), Val::Num(r)) => Ok(Val::Num(l + r)),
            (l @ Val::Str(_), r) | (l, r @ Val::Str(_)) => Ok(Val::Str(format!("{}{}", l, r))),
            (l, r) => Err(operand_error(op, &l, &r)),
        },

        BinOp::Or | BinOp::And => {
            let l = expect_bool(op, lhs)?;
            let r = expect_bool(op, rhs)?;
            Ok(Val::Bool(if op == BinOp::Or { l || r } else { l && r }))
        }

        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
            let (l, r) = numeric_operands(op, lhs, rhs)?;
            let result = match op {
                BinOp::Lt => l < r,
                BinOp::Le => l <= r,
                BinOp::Gt => l > r,
                _ => l >= r,
            };
            Ok(Val::Bool(result))
        }

        BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod => {
            let (l, r) = numeric_operands(op, lhs, rhs)?;
            let result = match op {
                BinOp::Sub => l - r,
                BinOp::Mul => l * r,
                BinOp::Div if r == 0.0 => return Err(ExecError::DivisionByZero),
                BinOp::Div => l / r,
                BinOp::Mod if r == 0.0 => return Err(ExecError::DivisionByZero),
                _ => l % r,
            };
            Ok(Val::Num(result))
        }
    }
}

/// Equality is only defined between values of the same type, or against NULL
fn values_equal(op: BinOp, lhs: &Val, rhs: &Val) -> Result<bool, ExecError> {
    match (lhs, rhs) {
        (Val::Null, other) | (other, Val::Null) => Ok(other.is_null()),
        (l, r) if std::mem::discriminant(l) == std::mem::discriminant(r) => Ok(l == r),
        (l, r) => Err(operand_error(op, l, r)),
    }
}

fn numeric_operands(op: BinOp, lhs: Val, rhs: Val) -> Result<(f64, f64), ExecError> {
    match (lhs, rhs) {
        (Val::Num(l), Val::Num(r)) => Ok((l, r)),
        (l, r) => Err(operand_error(op, &l, &r)),
    }
}

fn expect_bool(op: BinOp, value: Val) -> Result<bool, ExecError> {
    match value {
        Val::Bool(b) => Ok(b),
        other => Err(ExecError::type_error(format!(
            "'{}' expects BOOLEAN operands, got {}",
            op.symbol(),
            other.type_name()
        ))),
    }
}

fn operand_error(op: BinOp, lhs: &Val, rhs: &Val) -> ExecError {
    ExecError::type_error(format!(
        "Operator '{}' cannot be applied to {} and {}",
        op.symbol(),
        lhs.type_name(),
        rhs.type_name()
    ))
}
