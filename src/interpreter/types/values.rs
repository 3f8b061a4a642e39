//! Runtime value types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value as JsonValue};
use std::collections::HashMap;
use std::fmt;

/// Runtime value type
///
/// The set of variants is closed: every operator and builtin matches on it
/// exhaustively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "v")]
pub enum Val {
    Null,
    Bool(bool),
    Num(f64),
    Str(String),
    Array(Vec<Val>),
    Doc(HashMap<String, Val>),
}

impl Val {
    pub fn str(s: impl Into<String>) -> Self {
        Val::Str(s.into())
    }

    /// Name of the value's type as it appears in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Val::Null => "NULL",
            Val::Bool(_) => "BOOLEAN",
            Val::Num(_) => "NUMBER",
            Val::Str(_) => "STRING",
            Val::Array(_) => "ARRAY",
            Val::Doc(_) => "DOCUMENT",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Val::Null)
    }

    /// Convert a JSON value into a runtime value
    ///
    /// Every JSON number becomes a `Num`; integers beyond 2^53 lose precision.
    pub fn from_json(json: &JsonValue) -> Self {
        match json {
            JsonValue::Null => Val::Null,
            JsonValue::Bool(b) => Val::Bool(*b),
            JsonValue::Number(n) => Val::Num(n.as_f64().unwrap_or(f64::NAN)),
            JsonValue::String(s) => Val::Str(s.clone()),
            JsonValue::Array(items) => Val::Array(items.iter().map(Val::from_json).collect()),
            JsonValue::Object(map) => Val::Doc(
                map.iter()
                    .map(|(k, v)| (k.clone(), Val::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Convert a runtime value into JSON
    ///
    /// Integral numbers are emitted as JSON integers. Non-finite numbers have no
    /// JSON representation and become `null`.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Val::Null => JsonValue::Null,
            Val::Bool(b) => JsonValue::Bool(*b),
            Val::Num(n) => num_to_json(*n),
            Val::Str(s) => JsonValue::String(s.clone()),
            Val::Array(items) => JsonValue::Array(items.iter().map(Val::to_json).collect()),
            Val::Doc(map) => {
                let mut out = Map::new();
                for (k, v) in map {
                    out.insert(k.clone(), v.to_json());
                }
                JsonValue::Object(out)
            }
        }
    }
}

fn num_to_json(n: f64) -> JsonValue {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 9.007_199_254_740_992e15 {
        JsonValue::Number(Number::from(n as i64))
    } else {
        Number::from_f64(n)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null)
    }
}

impl fmt::Display for Val {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Val::Null => write!(f, "null"),
            Val::Bool(b) => write!(f, "{}", b),
            Val::Num(n) => write!(f, "{}", n),
            Val::Str(s) => write!(f, "{}", s),
            Val::Array(_) | Val::Doc(_) => write!(f, "{}", self.to_json()),
        }
    }
}

impl From<f64> for Val {
    fn from(n: f64) -> Self {
        Val::Num(n)
    }
}

impl From<bool> for Val {
    fn from(b: bool) -> Self {
        Val::Bool(b)
    }
}

impl From<&str> for Val {
    fn from(s: &str) -> Self {
        Val::Str(s.to_string())
    }
}

impl From<String> for Val {
    fn from(s: String) -> Self {
        Val::Str(s)
    }
}

/// Declared type of a variable or parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TypeTag {
    Number,
    String,
    Boolean,
    Array,
    Document,
    Any,
}

impl TypeTag {
    /// Whether a value may be stored in a binding of this type
    ///
    /// `Null` is accepted by every declared type.
    pub fn accepts(&self, val: &Val) -> bool {
        match (self, val) {
            (TypeTag::Any, _) | (_, Val::Null) => true,
            (TypeTag::Number, Val::Num(_)) => true,
            (TypeTag::String, Val::Str(_)) => true,
            (TypeTag::Boolean, Val::Bool(_)) => true,
            (TypeTag::Array, Val::Array(_)) => true,
            (TypeTag::Document, Val::Doc(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeTag::Number => "NUMBER",
            TypeTag::String => "STRING",
            TypeTag::Boolean => "BOOLEAN",
            TypeTag::Array => "ARRAY",
            TypeTag::Document => "DOCUMENT",
            TypeTag::Any => "ANY",
        };
        write!(f, "{}", name)
    }
}
