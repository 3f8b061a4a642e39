//! # Interpreter
//!
//! Executes an already-parsed program tree.
//!
//! ## Layout
//!
//! - `types`: AST, runtime values, the `Control` outcome
//! - `scope`: variable and routine bindings with parent fallback
//! - `expressions`: async expression evaluation
//! - `statements`: the block sequencer and statement dispatch
//! - `control_flow`: if / while / for / try / throw / return handlers
//! - `invocation`: argument binding and calls into functions and procedures
//! - `stdlib`: the builtin registry
//!
//! Evaluation is recursive and asynchronous. Recursion goes through boxed
//! futures (`BoxFuture`) so statement, expression and call futures can nest to
//! any depth. Those futures are polled on a stack that grows on demand
//! (`stack`), and the invocation depth is capped by `max_call_depth`.

pub mod control_flow;
pub mod errors;
pub mod expressions;
pub mod invocation;
pub mod scope;
mod stack;
pub mod statements;
pub mod stdlib;
pub mod types;

#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::store::{DocumentStore, ProcedureStore};

pub use errors::{ErrorKind, ExecError};
pub use scope::Scope;
pub use stdlib::{Builtin, BuiltinRegistry, NativeFunction};
pub use types::{Control, Expr, ParamMode, Parameter, Program, Routine, Stmt, TypeTag, Val};

/// Boxed future used wherever evaluation recurses
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub const DEFAULT_MAX_CALL_DEPTH: usize = 128;

/// Largest accepted `max_call_depth`; each level costs heap-allocated stack
pub const MAX_CALL_DEPTH_CEILING: usize = 10_000;

/// Result of running a program
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    /// Value of the top-level RETURN, or `Null`
    pub value: Val,
    /// Final values of the program's OUT and INOUT parameters
    pub outputs: HashMap<String, Val>,
}

/// The interpreter: builtins, the procedure store and execution limits
///
/// An `Interpreter` holds no per-run state and can run any number of programs
/// concurrently; each run gets its own root scope.
pub struct Interpreter {
    builtins: Arc<BuiltinRegistry>,
    procedures: Option<Arc<dyn ProcedureStore>>,
    max_call_depth: usize,
}

impl Interpreter {
    pub fn builder() -> InterpreterBuilder {
        InterpreterBuilder::new()
    }

    pub fn builtins(&self) -> &BuiltinRegistry {
        &self.builtins
    }

    pub fn max_call_depth(&self) -> usize {
        self.max_call_depth
    }

    /* ===================== Entry Points ===================== */

    /// Run a program and return its value
    pub async fn run(&self, program: &Program, args: HashMap<String, Val>) -> Result<Val, ExecError> {
        self.execute(program, args).await.map(|outcome| outcome.value)
    }

    /// Run a program and return its value along with its output parameters
    #[tracing::instrument(
        level = "info",
        skip_all,
        fields(run_id = %uuid::Uuid::new_v4(), statements = program.body.len()),
        err
    )]
    pub async fn execute(
        &self,
        program: &Program,
        args: HashMap<String, Val>,
    ) -> Result<RunOutcome, ExecError> {
        let scope = Scope::root();
        bind_program_args(program, args, &scope)?;

        let value = match self.run_block(&program.body, &scope).await {
            Control::Normal => Val::Null,
            Control::Return(value) => value,
            Control::Break => return Err(ExecError::BreakOutsideLoop),
            Control::Throw(err) => return Err(err),
        };

        let mut outputs = HashMap::new();
        for param in &program.params {
            if param.mode == ParamMode::In {
                continue;
            }
            if let Some(value) = scope.get(&param.name)? {
                outputs.insert(param.name.clone(), value);
            }
        }

        tracing::debug!(outputs = outputs.len(), "program finished");
        Ok(RunOutcome { value, outputs })
    }
}

/// Declare the program's parameters in the root scope and bind the arguments
fn bind_program_args(
    program: &Program,
    mut args: HashMap<String, Val>,
    scope: &Arc<Scope>,
) -> Result<(), ExecError> {
    const PROGRAM: &str = "<program>";

    for param in &program.params {
        scope.declare(&param.name, param.ty)?;
        let supplied = args.remove(&param.name);

        match (param.mode, supplied) {
            (ParamMode::Out, _) => {}
            (_, Some(value)) => {
                if !param.ty.accepts(&value) {
                    return Err(ExecError::ParamTypeMismatch {
                        routine: PROGRAM.to_string(),
                        param: param.name.clone(),
                        expected: param.ty,
                        got: value.type_name(),
                    });
                }
                scope.set(&param.name, value)?;
            }
            (_, None) => {
                return Err(ExecError::InvalidArgument {
                    routine: PROGRAM.to_string(),
                    param: param.name.clone(),
                    reason: "no value supplied".to_string(),
                });
            }
        }
    }

    if let Some(name) = args.into_keys().next() {
        return Err(ExecError::InvalidArgument {
            routine: PROGRAM.to_string(),
            param: name,
            reason: "no such parameter".to_string(),
        });
    }

    Ok(())
}

/* ===================== Builder ===================== */

/// Builder for constructing an `Interpreter`
pub struct InterpreterBuilder {
    builtins: BuiltinRegistry,
    procedures: Option<Arc<dyn ProcedureStore>>,
    documents: Option<Arc<dyn DocumentStore>>,
    max_call_depth: usize,
}

impl InterpreterBuilder {
    /// Start from the standard library and no external stores
    pub fn new() -> Self {
        Self {
            builtins: BuiltinRegistry::with_stdlib(),
            procedures: None,
            documents: None,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }

    /// Resolve unknown call targets through a procedure store
    pub fn procedures(mut self, store: Arc<dyn ProcedureStore>) -> Self {
        self.procedures = Some(store);
        self
    }

    /// Register the `doc_*` builtins against a document store
    pub fn documents(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.documents = Some(store);
        self
    }

    pub fn max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    /// Add or replace a builtin
    pub fn builtin(mut self, builtin: Builtin) -> Self {
        self.builtins.register(builtin);
        self
    }

    pub fn build(self) -> Interpreter {
        let mut builtins = self.builtins;
        if let Some(documents) = self.documents {
            stdlib::documents::register(&mut builtins, documents);
        }

        Interpreter {
            builtins: Arc::new(builtins),
            procedures: self.procedures,
            max_call_depth: self.max_call_depth,
        }
    }
}

impl Default for InterpreterBuilder {
    fn default() -> Self {
        Self::new()
    }
}
