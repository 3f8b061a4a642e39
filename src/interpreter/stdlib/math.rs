//! Math functions

use super::{num_arg, Builtin, BuiltinRegistry};
use crate::interpreter::errors::ExecError;
use crate::interpreter::types::{TypeTag, Val};

pub fn register(registry: &mut BuiltinRegistry) {
    let x = [("x", TypeTag::Number)];
    registry.register(Builtin::sync("abs", &x, abs));
    registry.register(Builtin::sync("floor", &x, floor));
    registry.register(Builtin::sync("ceil", &x, ceil));
    registry.register(Builtin::sync("round", &x, round));
    registry.register(Builtin::sync("sqrt", &x, sqrt));
    let values = [("first", TypeTag::Number), ("rest", TypeTag::Number)];
    registry.register(Builtin::sync("min", &values, min).variadic());
    registry.register(Builtin::sync("max", &values, max).variadic());
}

pub fn abs(args: &[Val]) -> Result<Val, ExecError> {
    Ok(Val::Num(num_arg("abs", args, 0)?.abs()))
}

pub fn floor(args: &[Val]) -> Result<Val, ExecError> {
    Ok(Val::Num(num_arg("floor", args, 0)?.floor()))
}

pub fn ceil(args: &[Val]) -> Result<Val, ExecError> {
    Ok(Val::Num(num_arg("ceil", args, 0)?.ceil()))
}

/// Rounds half away from zero
pub fn round(args: &[Val]) -> Result<Val, ExecError> {
    Ok(Val::Num(num_arg("round", args, 0)?.round()))
}

pub fn sqrt(args: &[Val]) -> Result<Val, ExecError> {
    let x = num_arg("sqrt", args, 0)?;
    if x < 0.0 {
        return Err(ExecError::builtin("sqrt", "argument must not be negative"));
    }
    Ok(Val::Num(x.sqrt()))
}

pub fn min(args: &[Val]) -> Result<Val, ExecError> {
    fold("min", args, f64::min)
}

pub fn max(args: &[Val]) -> Result<Val, ExecError> {
    fold("max", args, f64::max)
}

fn fold(name: &str, args: &[Val], f: fn(f64, f64) -> f64) -> Result<Val, ExecError> {
    let mut acc = num_arg(name, args, 0)?;
    for idx in 1..args.len() {
        acc = f(acc, num_arg(name, args, idx)?);
    }
    Ok(Val::Num(acc))
}
