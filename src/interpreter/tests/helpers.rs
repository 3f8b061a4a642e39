//! Test helpers for interpreter tests
//!
//! Short constructors for trees, plus runners that expose the final scope.

use std::sync::Arc;

use crate::interpreter::types::{BinOp, Expr, ParamMode, Parameter, Routine, RoutineKind, Stmt};
use crate::interpreter::{Control, Interpreter, Scope, TypeTag, Val};

/// Run statements in a fresh root scope and return the outcome with the scope
pub async fn run_stmts(stmts: Vec<Stmt>) -> (Control, Arc<Scope>) {
    run_stmts_with(&Interpreter::builder().build(), stmts).await
}

pub async fn run_stmts_with(interpreter: &Interpreter, stmts: Vec<Stmt>) -> (Control, Arc<Scope>) {
    let scope = Scope::root();
    let control = interpreter.run_block(&stmts, &scope).await;
    (control, scope)
}

/// Parse a JSON statement list and run it
pub async fn run_json(json: &str) -> (Control, Arc<Scope>) {
    let stmts: Vec<Stmt> = serde_json::from_str(json).expect("Invalid statement JSON");
    run_stmts(stmts).await
}

/// Read a variable that must be set
pub fn var(scope: &Scope, name: &str) -> Val {
    scope
        .get(name)
        .expect("variable lookup failed")
        .unwrap_or_else(|| panic!("variable '{}' is unset", name))
}

/// The error carried by a `Throw` outcome
pub fn thrown(control: Control) -> crate::interpreter::ExecError {
    match control {
        Control::Throw(err) => err,
        other => panic!("Expected Control::Throw, got {:?}", other),
    }
}

pub fn num(v: f64) -> Expr {
    Expr::num(v)
}

pub fn id(name: &str) -> Expr {
    Expr::ident(name)
}

pub fn bin(op: BinOp, left: Expr, right: Expr) -> Expr {
    Expr::binary(op, left, right)
}

/// `DECLARE name NUMBER = v`
pub fn declare_num(name: &str, v: f64) -> Stmt {
    Stmt::declare_init(name, TypeTag::Number, num(v))
}

/// `SET name = name + delta`
pub fn incr(name: &str, delta: Expr) -> Stmt {
    Stmt::set(name, bin(BinOp::Add, id(name), delta))
}

pub fn param(name: &str, ty: TypeTag, mode: ParamMode) -> Parameter {
    Parameter::new(name, ty, mode)
}

pub fn procedure(name: &str, params: Vec<Parameter>, body: Vec<Stmt>) -> Stmt {
    Stmt::DefineRoutine {
        routine: Routine {
            kind: RoutineKind::Procedure,
            name: name.to_string(),
            params,
            returns: None,
            body,
        },
    }
}

pub fn function(name: &str, params: Vec<Parameter>, returns: Option<TypeTag>, body: Vec<Stmt>) -> Stmt {
    Stmt::DefineRoutine {
        routine: Routine {
            kind: RoutineKind::Function,
            name: name.to_string(),
            params,
            returns,
            body,
        },
    }
}
