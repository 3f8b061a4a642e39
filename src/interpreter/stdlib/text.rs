//! String functions

use super::{num_arg, str_arg, Builtin, BuiltinRegistry};
use crate::interpreter::errors::ExecError;
use crate::interpreter::types::{TypeTag, Val};

pub fn register(registry: &mut BuiltinRegistry) {
    let s = [("s", TypeTag::String)];
    registry.register(Builtin::sync("upper", &s, upper));
    registry.register(Builtin::sync("lower", &s, lower));
    registry.register(Builtin::sync("trim", &s, trim));
    registry.register(Builtin::sync(
        "substr",
        &[
            ("s", TypeTag::String),
            ("start", TypeTag::Number),
            ("len", TypeTag::Number),
        ],
        substr,
    ));
    registry.register(Builtin::sync("to_string", &[("value", TypeTag::Any)], to_string));
    registry.register(Builtin::sync("to_number", &s, to_number));
}

pub fn upper(args: &[Val]) -> Result<Val, ExecError> {
    Ok(Val::str(str_arg("upper", args, 0)?.to_uppercase()))
}

pub fn lower(args: &[Val]) -> Result<Val, ExecError> {
    Ok(Val::str(str_arg("lower", args, 0)?.to_lowercase()))
}

pub fn trim(args: &[Val]) -> Result<Val, ExecError> {
    Ok(Val::str(str_arg("trim", args, 0)?.trim()))
}

/// `substr(s, start, len)` counted in characters, zero-based
///
/// Ranges running past the end are clipped.
pub fn substr(args: &[Val]) -> Result<Val, ExecError> {
    let s = str_arg("substr", args, 0)?;
    let start = num_arg("substr", args, 1)?;
    let len = num_arg("substr", args, 2)?;
    if start < 0.0 || len < 0.0 || start.fract() != 0.0 || len.fract() != 0.0 {
        return Err(ExecError::builtin(
            "substr",
            "start and len must be non-negative integers",
        ));
    }

    let out: String = s.chars().skip(start as usize).take(len as usize).collect();
    Ok(Val::Str(out))
}

pub fn to_string(args: &[Val]) -> Result<Val, ExecError> {
    match args.first() {
        Some(Val::Null) | None => Ok(Val::str("null")),
        Some(value) => Ok(Val::Str(value.to_string())),
    }
}

pub fn to_number(args: &[Val]) -> Result<Val, ExecError> {
    let s = str_arg("to_number", args, 0)?;
    s.trim()
        .parse::<f64>()
        .map(Val::Num)
        .map_err(|_| ExecError::builtin("to_number", format!("'{}' is not a number", s)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_and_trim() {
        assert_eq!(upper(&[Val::str("abc")]), Ok(Val::str("ABC")));
        assert_eq!(lower(&[Val::str("AbC")]), Ok(Val::str("abc")));
        assert_eq!(trim(&[Val::str("  x ")]), Ok(Val::str("x")));
    }

    #[test]
    fn test_substr_clips() {
        let args = [Val::str("héllo"), Val::Num(1.0), Val::Num(3.0)];
        assert_eq!(substr(&args), Ok(Val::str("éll")));

        let args = [Val::str("abc"), Val::Num(2.0), Val::Num(10.0)];
        assert_eq!(substr(&args), Ok(Val::str("c")));

        let args = [Val::str("abc"), Val::Num(-1.0), Val::Num(1.0)];
        assert!(substr(&args).is_err());
    }

    #[test]
    fn test_conversions() {
        assert_eq!(to_string(&[Val::Num(3.0)]), Ok(Val::str("3")));
        assert_eq!(to_string(&[Val::Null]), Ok(Val::str("null")));
        assert_eq!(to_number(&[Val::str(" 2.5 ")]), Ok(Val::Num(2.5)));
        assert!(to_number(&[Val::str("two")]).is_err());
    }
}
