//! Type definitions for the interpreter
//!
//! - AST nodes (Stmt, Expr, Routine)
//! - Runtime values (Val, TypeTag)
//! - Control flow (Control)

pub mod ast;
pub mod control;
pub mod values;

pub use ast::{
    BinOp, ElseIf, Expr, ParamMode, Parameter, ProcedureDefinition, Program, Routine,
    RoutineKind, Stmt, UnaryOp,
};
pub use control::Control;
pub use values::{TypeTag, Val};
