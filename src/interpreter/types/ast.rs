//! Abstract Syntax Tree node types
//!
//! The interpreter starts from an already-parsed tree. Trees are serde
//! serializable with an internal `"t"` tag, which is also the format stored
//! procedures are persisted in.

use super::values::TypeTag;
use serde::{Deserialize, Serialize};

/// Statement AST node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum Stmt {
    /// `DECLARE name TYPE [= init]`
    Declare {
        name: String,
        ty: TypeTag,
        #[serde(default)]
        init: Option<Expr>,
    },
    /// `SET name[path...] = value`
    Set {
        name: String,
        #[serde(default)]
        path: Vec<Expr>,
        value: Expr,
    },
    If {
        test: Expr,
        then_body: Vec<Stmt>,
        #[serde(default)]
        elseifs: Vec<ElseIf>,
        #[serde(default)]
        else_body: Option<Vec<Stmt>>,
    },
    While {
        test: Expr,
        body: Vec<Stmt>,
    },
    /// `FOR var IN start..end LOOP body END LOOP`
    ForRange {
        var: String,
        start: Expr,
        end: Expr,
        body: Vec<Stmt>,
    },
    /// `FOR var IN source LOOP body END LOOP`
    ForEach {
        var: String,
        source: Expr,
        body: Vec<Stmt>,
    },
    /// Flat statement list; `Catch` and `Finally` markers split it into sections.
    Try {
        body: Vec<Stmt>,
    },
    Catch {
        #[serde(default)]
        var: Option<String>,
    },
    Finally,
    Throw {
        value: Expr,
    },
    Return {
        #[serde(default)]
        value: Option<Expr>,
    },
    Break,
    /// `CALL name(args)`
    Call {
        name: String,
        args: Vec<Expr>,
    },
    Expr {
        expr: Expr,
    },
    DefineRoutine {
        routine: Routine,
    },
}

/// One `ELSEIF test THEN body` arm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElseIf {
    pub test: Expr,
    pub body: Vec<Stmt>,
}

/// Expression AST node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum Expr {
    LitNull,
    LitBool { v: bool },
    LitNum { v: f64 },
    LitStr { v: String },
    Array { items: Vec<Expr> },
    Ident { name: String },
    /// `target[k1][k2]...`, applied left to right
    Index { target: Box<Expr>, keys: Vec<Expr> },
    Unary { op: UnaryOp, operand: Box<Expr> },
    Binary { op: BinOp, left: Box<Expr>, right: Box<Expr> },
    Call { name: String, args: Vec<Expr> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    #[serde(rename = "-")]
    Neg,
    #[serde(rename = "NOT")]
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    #[serde(rename = "OR")]
    Or,
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
    #[serde(rename = "*")]
    Mul,
    #[serde(rename = "/")]
    Div,
    #[serde(rename = "%")]
    Mod,
}

impl BinOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinOp::Or => "OR",
            BinOp::And => "AND",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
        }
    }
}

/* ===================== Routines ===================== */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RoutineKind {
    Function,
    Procedure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ParamMode {
    #[default]
    In,
    Out,
    InOut,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub ty: TypeTag,
    #[serde(default)]
    pub mode: ParamMode,
}

impl Parameter {
    pub fn new(name: impl Into<String>, ty: TypeTag, mode: ParamMode) -> Self {
        Self {
            name: name.into(),
            ty,
            mode,
        }
    }

    pub fn input(name: impl Into<String>, ty: TypeTag) -> Self {
        Self::new(name, ty, ParamMode::In)
    }
}

/// A user-defined function or procedure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Routine {
    pub kind: RoutineKind,
    pub name: String,
    pub params: Vec<Parameter>,
    /// Declared return type (functions only)
    #[serde(default)]
    pub returns: Option<TypeTag>,
    pub body: Vec<Stmt>,
}

/// Stored form of a procedure: the name is the storage key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcedureDefinition {
    pub params: Vec<Parameter>,
    pub body: Vec<Stmt>,
}

impl ProcedureDefinition {
    pub fn into_routine(self, name: impl Into<String>) -> Routine {
        Routine {
            kind: RoutineKind::Procedure,
            name: name.into(),
            params: self.params,
            returns: None,
            body: self.body,
        }
    }
}

/// Top-level program: parameters bound from the caller's arguments, then a body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    #[serde(default)]
    pub params: Vec<Parameter>,
    pub body: Vec<Stmt>,
}

impl Program {
    pub fn new(body: Vec<Stmt>) -> Self {
        Self {
            params: Vec::new(),
            body,
        }
    }
}

/* ===================== Builders ===================== */

impl Expr {
    pub fn null() -> Self {
        Expr::LitNull
    }

    pub fn bool(v: bool) -> Self {
        Expr::LitBool { v }
    }

    pub fn num(v: f64) -> Self {
        Expr::LitNum { v }
    }

    pub fn str(v: impl Into<String>) -> Self {
        Expr::LitStr { v: v.into() }
    }

    pub fn ident(name: impl Into<String>) -> Self {
        Expr::Ident { name: name.into() }
    }

    pub fn array(items: Vec<Expr>) -> Self {
        Expr::Array { items }
    }

    pub fn index(target: Expr, keys: Vec<Expr>) -> Self {
        Expr::Index {
            target: Box::new(target),
            keys,
        }
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Expr::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn binary(op: BinOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn call(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Call {
            name: name.into(),
            args,
        }
    }
}

impl Stmt {
    pub fn declare(name: impl Into<String>, ty: TypeTag) -> Self {
        Stmt::Declare {
            name: name.into(),
            ty,
            init: None,
        }
    }

    pub fn declare_init(name: impl Into<String>, ty: TypeTag, init: Expr) -> Self {
        Stmt::Declare {
            name: name.into(),
            ty,
            init: Some(init),
        }
    }

    pub fn set(name: impl Into<String>, value: Expr) -> Self {
        Stmt::Set {
            name: name.into(),
            path: Vec::new(),
            value,
        }
    }

    pub fn ret(value: Expr) -> Self {
        Stmt::Return { value: Some(value) }
    }

    pub fn throw(value: Expr) -> Self {
        Stmt::Throw { value }
    }

    pub fn call(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Stmt::Call {
            name: name.into(),
            args,
        }
    }

    /// Short name used in trace output
    pub fn kind_name(&self) -> &'static str {
        match self {
            Stmt::Declare { .. } => "declare",
            Stmt::Set { .. } => "set",
            Stmt::If { .. } => "if",
            Stmt::While { .. } => "while",
            Stmt::ForRange { .. } => "for_range",
            Stmt::ForEach { .. } => "for_each",
            Stmt::Try { .. } => "try",
            Stmt::Catch { .. } => "catch",
            Stmt::Finally => "finally",
            Stmt::Throw { .. } => "throw",
            Stmt::Return { .. } => "return",
            Stmt::Break => "break",
            Stmt::Call { .. } => "call",
            Stmt::Expr { .. } => "expr",
            Stmt::DefineRoutine { .. } => "define_routine",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statement_json_shape() {
        let json = r#"{
            "t": "If",
            "test": {"t": "Binary", "op": "<", "left": {"t": "Ident", "name": "x"}, "right": {"t": "LitNum", "v": 3}},
            "then_body": [{"t": "Break"}]
        }"#;

        let stmt: Stmt = serde_json::from_str(json).unwrap();

        let Stmt::If { test, then_body, elseifs, else_body } = stmt else {
            unreachable!("Expected If statement");
        };
        assert_eq!(
            test,
            Expr::binary(BinOp::Lt, Expr::ident("x"), Expr::num(3.0))
        );
        assert_eq!(then_body, vec![Stmt::Break]);
        assert!(elseifs.is_empty());
        assert!(else_body.is_none());
    }

    #[test]
    fn test_parameter_mode_defaults_to_in() {
        let param: Parameter = serde_json::from_str(r#"{"name": "a", "ty": "NUMBER"}"#).unwrap();
        assert_eq!(param.mode, ParamMode::In);

        let param: Parameter =
            serde_json::from_str(r#"{"name": "b", "ty": "STRING", "mode": "INOUT"}"#).unwrap();
        assert_eq!(param.mode, ParamMode::InOut);
    }

    #[test]
    fn test_procedure_definition_into_routine() {
        let def = ProcedureDefinition {
            params: vec![Parameter::input("n", TypeTag::Number)],
            body: vec![Stmt::Break],
        };

        let routine = def.into_routine("p");

        assert_eq!(routine.kind, RoutineKind::Procedure);
        assert_eq!(routine.name, "p");
        assert_eq!(routine.params.len(), 1);
    }
}
