//! `print` and `now`

use super::{Builtin, BuiltinRegistry};
use crate::interpreter::errors::ExecError;
use crate::interpreter::types::{TypeTag, Val};

pub fn register(registry: &mut BuiltinRegistry) {
    registry.register(Builtin::sync("print", &[("values", TypeTag::Any)], print).variadic());
    registry.register(Builtin::sync("now", &[], now));
}

/// Log the arguments, space separated, and return the logged line
pub fn print(args: &[Val]) -> Result<Val, ExecError> {
    let line = args
        .iter()
        .map(Val::to_string)
        .collect::<Vec<_>>()
        .join(" ");
    tracing::info!(target: "sproc::print", "{}", line);
    Ok(Val::Str(line))
}

/// Current UTC time as an RFC 3339 string
pub fn now(_args: &[Val]) -> Result<Val, ExecError> {
    Ok(Val::Str(chrono::Utc::now().to_rfc3339()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_print_joins_values() {
        let out = print(&[Val::str("n ="), Val::Num(2.0), Val::Null]).unwrap();
        assert_eq!(out, Val::str("n = 2 null"));
    }

    #[test]
    fn test_now_is_rfc3339() {
        let Val::Str(ts) = now(&[]).unwrap() else {
            panic!("now() must return a string");
        };
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
    }
}
