//! Execution errors
//!
//! Every failure inside the interpreter is an `ExecError`. Errors travel as
//! `Control::Throw` through blocks, loops and calls until a try/catch absorbs
//! them or they reach the entry point.

use super::types::{TypeTag, Val};
use thiserror::Error;

/* ===================== Error Codes ===================== */

pub const ALREADY_DECLARED: &str = "ALREADY_DECLARED";
pub const ALREADY_DEFINED: &str = "ALREADY_DEFINED";
pub const INVALID_DEFINITION: &str = "INVALID_DEFINITION";
pub const WRONG_ARG_COUNT: &str = "WRONG_ARG_COUNT";
pub const WRONG_ARG_TYPE: &str = "WRONG_ARG_TYPE";
pub const INVALID_ARGUMENT: &str = "INVALID_ARGUMENT";
pub const MISPLACED_CLAUSE: &str = "MISPLACED_CLAUSE";
pub const TYPE_ERROR: &str = "TYPE_ERROR";
pub const DIVISION_BY_ZERO: &str = "DIVISION_BY_ZERO";
pub const UNDECLARED_VARIABLE: &str = "UNDECLARED_VARIABLE";
pub const UNSET_VARIABLE: &str = "UNSET_VARIABLE";
pub const UNDEFINED_ROUTINE: &str = "UNDEFINED_ROUTINE";
pub const PROPERTY_NOT_FOUND: &str = "PROPERTY_NOT_FOUND";
pub const MISSING_RETURN: &str = "MISSING_RETURN";
pub const CALL_DEPTH_EXCEEDED: &str = "CALL_DEPTH_EXCEEDED";
pub const BREAK_OUTSIDE_LOOP: &str = "BREAK_OUTSIDE_LOOP";
pub const BUILTIN_ERROR: &str = "BUILTIN_ERROR";
pub const EXTERNAL_ERROR: &str = "EXTERNAL_ERROR";
pub const USER_ERROR: &str = "USER_ERROR";

/// Broad category of an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed definitions and call shapes
    Definition,
    /// Operand or value of the wrong type
    Type,
    /// Failures that depend on runtime state
    Runtime,
    /// Raised by an explicit `THROW`
    User,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecError {
    #[error("Variable '{name}' is already declared in this scope")]
    AlreadyDeclared { name: String },

    #[error("Routine '{name}' is already defined in this scope")]
    AlreadyDefined { name: String },

    #[error("Invalid definition of '{name}': {reason}")]
    InvalidDefinition { name: String, reason: String },

    #[error("'{routine}' expects {expected} argument(s), got {got}")]
    ArityMismatch {
        routine: String,
        expected: usize,
        got: usize,
    },

    #[error("Parameter '{param}' of '{routine}' expects {expected}, got {got}")]
    ParamTypeMismatch {
        routine: String,
        param: String,
        expected: TypeTag,
        got: &'static str,
    },

    #[error("Invalid argument for parameter '{param}' of '{routine}': {reason}")]
    InvalidArgument {
        routine: String,
        param: String,
        reason: String,
    },

    #[error("{clause} is only allowed directly inside TRY: {reason}")]
    MisplacedClause {
        clause: &'static str,
        reason: String,
    },

    #[error("Type error: {0}")]
    Type(String),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Variable '{name}' is not declared")]
    Undeclared { name: String },

    #[error("Variable '{name}' is used before it is assigned")]
    Unset { name: String },

    #[error("Function or procedure '{name}' is not defined")]
    UndefinedRoutine { name: String },

    #[error("Property '{key}' not found")]
    PropertyNotFound { key: String },

    #[error("Function '{name}' finished without returning a value")]
    MissingReturn { name: String },

    #[error("Call depth limit of {limit} exceeded")]
    CallDepthExceeded { limit: usize },

    #[error("BREAK used outside of a loop")]
    BreakOutsideLoop,

    #[error("{name}(): {message}")]
    Builtin { name: String, message: String },

    #[error("External operation failed: {0}")]
    External(String),

    /// Raised by `THROW`; carries the thrown value
    #[error("{0}")]
    Thrown(Val),
}

impl ExecError {
    pub fn type_error(message: impl Into<String>) -> Self {
        ExecError::Type(message.into())
    }

    pub fn builtin(name: impl Into<String>, message: impl Into<String>) -> Self {
        ExecError::Builtin {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Convert a failure from an outer collaborator, keeping its context chain
    pub fn external(err: anyhow::Error) -> Self {
        ExecError::External(format!("{:#}", err))
    }

    pub fn code(&self) -> &'static str {
        match self {
            ExecError::AlreadyDeclared { .. } => ALREADY_DECLARED,
            ExecError::AlreadyDefined { .. } => ALREADY_DEFINED,
            ExecError::InvalidDefinition { .. } => INVALID_DEFINITION,
            ExecError::ArityMismatch { .. } => WRONG_ARG_COUNT,
            ExecError::ParamTypeMismatch { .. } => WRONG_ARG_TYPE,
            ExecError::InvalidArgument { .. } => INVALID_ARGUMENT,
            ExecError::MisplacedClause { .. } => MISPLACED_CLAUSE,
            ExecError::Type(_) => TYPE_ERROR,
            ExecError::DivisionByZero => DIVISION_BY_ZERO,
            ExecError::Undeclared { .. } => UNDECLARED_VARIABLE,
            ExecError::Unset { .. } => UNSET_VARIABLE,
            ExecError::UndefinedRoutine { .. } => UNDEFINED_ROUTINE,
            ExecError::PropertyNotFound { .. } => PROPERTY_NOT_FOUND,
            ExecError::MissingReturn { .. } => MISSING_RETURN,
            ExecError::CallDepthExceeded { .. } => CALL_DEPTH_EXCEEDED,
            ExecError::BreakOutsideLoop => BREAK_OUTSIDE_LOOP,
            ExecError::Builtin { .. } => BUILTIN_ERROR,
            ExecError::External(_) => EXTERNAL_ERROR,
            ExecError::Thrown(_) => USER_ERROR,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ExecError::AlreadyDeclared { .. }
            | ExecError::AlreadyDefined { .. }
            | ExecError::InvalidDefinition { .. }
            | ExecError::ArityMismatch { .. }
            | ExecError::InvalidArgument { .. }
            | ExecError::MisplacedClause { .. } => ErrorKind::Definition,
            ExecError::ParamTypeMismatch { .. } | ExecError::Type(_) => ErrorKind::Type,
            ExecError::DivisionByZero
            | ExecError::Undeclared { .. }
            | ExecError::Unset { .. }
            | ExecError::UndefinedRoutine { .. }
            | ExecError::PropertyNotFound { .. }
            | ExecError::MissingReturn { .. }
            | ExecError::CallDepthExceeded { .. }
            | ExecError::BreakOutsideLoop
            | ExecError::Builtin { .. }
            | ExecError::External(_) => ErrorKind::Runtime,
            ExecError::Thrown(_) => ErrorKind::User,
        }
    }

    /// Value bound to a CATCH variable
    ///
    /// A thrown value is handed over as-is; system errors become their message.
    pub fn to_val(&self) -> Val {
        match self {
            ExecError::Thrown(val) => val.clone(),
            other => Val::Str(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thrown_message_is_raw_value() {
        let err = ExecError::Thrown(Val::str("boom"));
        assert_eq!(err.to_string(), "boom");
        assert_eq!(err.kind(), ErrorKind::User);
        assert_eq!(err.to_val(), Val::str("boom"));
    }

    #[test]
    fn test_codes_and_kinds() {
        let err = ExecError::Undeclared {
            name: "x".to_string(),
        };
        assert_eq!(err.code(), UNDECLARED_VARIABLE);
        assert_eq!(err.kind(), ErrorKind::Runtime);
        assert_eq!(err.to_val(), Val::str("Variable 'x' is not declared"));

        assert_eq!(ExecError::type_error("x").kind(), ErrorKind::Type);
        assert_eq!(
            ExecError::ArityMismatch {
                routine: "f".to_string(),
                expected: 1,
                got: 2
            }
            .kind(),
            ErrorKind::Definition
        );
    }

    #[test]
    fn test_external_keeps_context_chain() {
        let err = anyhow::anyhow!("connection refused").context("Failed to fetch procedure");
        let exec = ExecError::external(err);
        assert_eq!(
            exec.to_string(),
            "External operation failed: Failed to fetch procedure: connection refused"
        );
    }
}
