//! Control flow outcome of executing a statement or block

use super::super::errors::ExecError;
use super::values::Val;

/* ===================== Control Flow ===================== */

/// Outcome of executing a statement or a block
///
/// Exactly one variant is produced per statement. Anything other than
/// `Normal` stops the enclosing block and travels outward until a handler
/// consumes it: loops consume `Break`, invocations consume `Return`,
/// try/catch consumes `Throw`.
#[derive(Debug, Clone, PartialEq)]
pub enum Control {
    Normal,
    Return(Val),
    Break,
    Throw(ExecError),
}

impl Control {
    pub fn is_normal(&self) -> bool {
        matches!(self, Control::Normal)
    }
}

impl From<ExecError> for Control {
    fn from(err: ExecError) -> Self {
        Control::Throw(err)
    }
}

/// Unwrap a `Result`, turning an error into `Control::Throw` and returning it
/// from the enclosing function.
macro_rules! try_or_throw {
    ($e:expr) => {
        match $e {
            Ok(v) => v,
            Err(err) => return $crate::interpreter::types::Control::Throw(err),
        }
    };
}

pub(crate) use try_or_throw;
