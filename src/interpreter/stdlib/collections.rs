//! Array and document functions, plus type inspection

use super::{array_arg, doc_arg, str_arg, Builtin, BuiltinRegistry};
use crate::interpreter::errors::ExecError;
use crate::interpreter::types::{TypeTag, Val};

pub fn register(registry: &mut BuiltinRegistry) {
    registry.register(Builtin::sync("length", &[("value", TypeTag::Any)], length));
    registry.register(Builtin::sync(
        "append",
        &[("items", TypeTag::Array), ("value", TypeTag::Any)],
        append,
    ));
    registry.register(Builtin::sync("keys", &[("doc", TypeTag::Document)], keys));
    registry.register(Builtin::sync(
        "has_key",
        &[("doc", TypeTag::Document), ("key", TypeTag::String)],
        has_key,
    ));
    registry.register(Builtin::sync(
        "contains",
        &[("items", TypeTag::Array), ("value", TypeTag::Any)],
        contains,
    ));
    registry.register(Builtin::sync("type_of", &[("value", TypeTag::Any)], type_of));
    registry.register(Builtin::sync("is_null", &[("value", TypeTag::Any)], is_null));
}

/// Element count of an array, key count of a document, character count of a string
pub fn length(args: &[Val]) -> Result<Val, ExecError> {
    let n = match args.first() {
        Some(Val::Array(items)) => items.len(),
        Some(Val::Doc(map)) => map.len(),
        Some(Val::Str(s)) => s.chars().count(),
        other => {
            return Err(ExecError::builtin(
                "length",
                format!(
                    "expects ARRAY, DOCUMENT or STRING, got {}",
                    other.map_or("nothing", Val::type_name)
                ),
            ))
        }
    };
    Ok(Val::Num(n as f64))
}

/// Returns a new array; the argument is not modified
pub fn append(args: &[Val]) -> Result<Val, ExecError> {
    let mut items = array_arg("append", args, 0)?.to_vec();
    items.push(args.get(1).cloned().unwrap_or(Val::Null));
    Ok(Val::Array(items))
}

/// Sorted key list
pub fn keys(args: &[Val]) -> Result<Val, ExecError> {
    let mut keys: Vec<&String> = doc_arg("keys", args, 0)?.keys().collect();
    keys.sort();
    Ok(Val::Array(keys.into_iter().map(|k| Val::Str(k.clone())).collect()))
}

pub fn has_key(args: &[Val]) -> Result<Val, ExecError> {
    let doc = doc_arg("has_key", args, 0)?;
    let key = str_arg("has_key", args, 1)?;
    Ok(Val::Bool(doc.contains_key(key)))
}

/// Structural equality, so `contains([1, 'a'], '1')` is false
pub fn contains(args: &[Val]) -> Result<Val, ExecError> {
    let items = array_arg("contains", args, 0)?;
    let needle = args.get(1).unwrap_or(&Val::Null);
    Ok(Val::Bool(items.contains(needle)))
}

pub fn type_of(args: &[Val]) -> Result<Val, ExecError> {
    Ok(Val::str(args.first().map_or("NULL", Val::type_name)))
}

pub fn is_null(args: &[Val]) -> Result<Val, ExecError> {
    Ok(Val::Bool(args.first().map_or(true, Val::is_null)))
}
