//! Tests for running whole programs with parameters

use std::collections::HashMap;

use maplit::hashmap;

use super::helpers::*;
use crate::interpreter::errors;
use crate::interpreter::types::{BinOp, Expr, ParamMode, Stmt};
use crate::interpreter::{ExecError, Interpreter, Program, TypeTag, Val};

fn program(params: Vec<crate::interpreter::Parameter>, body: Vec<Stmt>) -> Program {
    Program { params, body }
}

#[tokio::test]
async fn test_run_returns_value() {
    let interpreter = Interpreter::builder().build();
    let program = program(
        vec![
            param("a", TypeTag::Number, ParamMode::In),
            param("b", TypeTag::Number, ParamMode::In),
        ],
        vec![Stmt::ret(bin(BinOp::Mul, id("a"), id("b")))],
    );

    let value = interpreter
        .run(&program, hashmap! {
            "a".to_string() => Val::Num(6.0),
            "b".to_string() => Val::Num(7.0),
        })
        .await
        .unwrap();

    assert_eq!(value, Val::Num(42.0));
}

#[tokio::test]
async fn test_program_without_return_yields_null() {
    let interpreter = Interpreter::builder().build();
    let program = Program::new(vec![declare_num("x", 1.0)]);

    let value = interpreter.run(&program, HashMap::new()).await.unwrap();

    assert_eq!(value, Val::Null);
}

#[tokio::test]
async fn test_execute_collects_outputs() {
    let interpreter = Interpreter::builder().build();
    let program = program(
        vec![
            param("n", TypeTag::Number, ParamMode::In),
            param("doubled", TypeTag::Number, ParamMode::Out),
            param("counter", TypeTag::Number, ParamMode::InOut),
            param("untouched", TypeTag::String, ParamMode::Out),
        ],
        vec![
            Stmt::set("doubled", bin(BinOp::Mul, id("n"), num(2.0))),
            incr("counter", num(1.0)),
            Stmt::ret(Expr::str("ok")),
        ],
    );

    let outcome = interpreter
        .execute(&program, hashmap! {
            "n".to_string() => Val::Num(5.0),
            "counter".to_string() => Val::Num(9.0),
        })
        .await
        .unwrap();

    assert_eq!(outcome.value, Val::str("ok"));
    assert_eq!(
        outcome.outputs,
        hashmap! {
            "doubled".to_string() => Val::Num(10.0),
            "counter".to_string() => Val::Num(10.0),
        }
    );
}

#[tokio::test]
async fn test_out_parameter_ignores_supplied_value() {
    let interpreter = Interpreter::builder().build();
    let program = program(
        vec![param("result", TypeTag::Number, ParamMode::Out)],
        vec![Stmt::ret(Expr::call("is_null", vec![id("result")]))],
    );

    let err = interpreter
        .run(&program, hashmap! { "result".to_string() => Val::Num(1.0) })
        .await
        .unwrap_err();

    // OUT parameters start unset, so reading one is an error
    assert_eq!(err.code(), errors::UNSET_VARIABLE);
}

#[tokio::test]
async fn test_argument_errors() {
    let interpreter = Interpreter::builder().build();
    let program = program(vec![param("a", TypeTag::Number, ParamMode::In)], vec![]);

    let err = interpreter.run(&program, HashMap::new()).await.unwrap_err();
    assert_eq!(err.code(), errors::INVALID_ARGUMENT);
    assert!(err.to_string().contains("no value supplied"));

    let err = interpreter
        .run(&program, hashmap! {
            "a".to_string() => Val::Num(1.0),
            "b".to_string() => Val::Num(2.0),
        })
        .await
        .unwrap_err();
    assert_eq!(err.code(), errors::INVALID_ARGUMENT);
    assert!(err.to_string().contains("no such parameter"));

    let err = interpreter
        .run(&program, hashmap! { "a".to_string() => Val::str("1") })
        .await
        .unwrap_err();
    assert_eq!(err.code(), errors::WRONG_ARG_TYPE);
}

#[tokio::test]
async fn test_top_level_signals_become_errors() {
    let interpreter = Interpreter::builder().build();

    let err = interpreter
        .run(&Program::new(vec![Stmt::Break]), HashMap::new())
        .await
        .unwrap_err();
    assert_eq!(err, ExecError::BreakOutsideLoop);

    let err = interpreter
        .run(&Program::new(vec![Stmt::throw(num(3.0))]), HashMap::new())
        .await
        .unwrap_err();
    assert_eq!(err, ExecError::Thrown(Val::Num(3.0)));
}

#[tokio::test]
async fn test_program_from_json() {
    let program: Program = serde_json::from_str(
        r#"{
            "params": [{"name": "names", "ty": "ARRAY"}],
            "body": [
                {"t": "Declare", "name": "greeting", "ty": "STRING", "init": {"t": "LitStr", "v": "hi"}},
                {"t": "ForEach", "var": "name", "source": {"t": "Ident", "name": "names"}, "body": [
                    {"t": "Set", "name": "greeting", "value": {
                        "t": "Binary", "op": "+",
                        "left": {"t": "Ident", "name": "greeting"},
                        "right": {"t": "Binary", "op": "+",
                            "left": {"t": "LitStr", "v": " "},
                            "right": {"t": "Ident", "name": "name"}}
                    }}
                ]},
                {"t": "Return", "value": {"t": "Ident", "name": "greeting"}}
            ]
        }"#,
    )
    .unwrap();

    let value = Interpreter::builder()
        .build()
        .run(&program, hashmap! {
            "names".to_string() => Val::Array(vec![Val::str("ada"), Val::str("grace")]),
        })
        .await
        .unwrap();

    assert_eq!(value, Val::str("hi ada grace"));
}

#[tokio::test]
async fn test_concurrent_runs_are_isolated() {
    let interpreter = std::sync::Arc::new(Interpreter::builder().build());
    let program = std::sync::Arc::new(program(
        vec![param("n", TypeTag::Number, ParamMode::In)],
        vec![
            declare_num("total", 0.0),
            Stmt::ForRange {
                var: "i".to_string(),
                start: num(1.0),
                end: id("n"),
                body: vec![incr("total", id("i"))],
            },
            Stmt::ret(id("total")),
        ],
    ));

    let handles: Vec<_> = (1..=8)
        .map(|n| {
            let interpreter = interpreter.clone();
            let program = program.clone();
            tokio::spawn(async move {
                interpreter
                    .run(&program, hashmap! { "n".to_string() => Val::Num(n as f64) })
                    .await
            })
        })
        .collect();

    for (n, handle) in (1..=8).zip(handles) {
        let value = handle.await.unwrap().unwrap();
        assert_eq!(value, Val::Num((n * (n + 1) / 2) as f64));
    }
}
