//! Tests for IF / ELSEIF / ELSE

use super::helpers::*;
use crate::interpreter::errors;
use crate::interpreter::types::{BinOp, ElseIf, Expr, Stmt};
use crate::interpreter::{Control, TypeTag, Val};

/// IF x < 0 THEN 'neg' ELSEIF x == 0 THEN 'zero' ELSE 'pos'
fn classify(x: f64) -> Vec<Stmt> {
    vec![
        declare_num("x", x),
        Stmt::declare("label", TypeTag::String),
        Stmt::If {
            test: bin(BinOp::Lt, id("x"), num(0.0)),
            then_body: vec![Stmt::set("label", Expr::str("neg"))],
            elseifs: vec![ElseIf {
                test: bin(BinOp::Eq, id("x"), num(0.0)),
                body: vec![Stmt::set("label", Expr::str("zero"))],
            }],
            else_body: Some(vec![Stmt::set("label", Expr::str("pos"))]),
        },
    ]
}

#[tokio::test]
async fn test_if_branches() {
    for (x, expected) in [(-1.0, "neg"), (0.0, "zero"), (5.0, "pos")] {
        let (control, scope) = run_stmts(classify(x)).await;

        assert_eq!(control, Control::Normal);
        assert_eq!(var(&scope, "label"), Val::str(expected), "x = {}", x);
    }
}

#[tokio::test]
async fn test_if_without_else_falls_through() {
    let (control, scope) = run_stmts(vec![
        declare_num("x", 1.0),
        Stmt::If {
            test: Expr::bool(false),
            then_body: vec![Stmt::set("x", num(2.0))],
            elseifs: vec![],
            else_body: None,
        },
    ])
    .await;

    assert_eq!(control, Control::Normal);
    assert_eq!(var(&scope, "x"), Val::Num(1.0));
}

#[tokio::test]
async fn test_first_matching_elseif_wins() {
    let (control, scope) = run_stmts(vec![
        declare_num("x", 0.0),
        Stmt::If {
            test: Expr::bool(false),
            then_body: vec![],
            elseifs: vec![
                ElseIf {
                    test: Expr::bool(true),
                    body: vec![Stmt::set("x", num(1.0))],
                },
                ElseIf {
                    test: Expr::bool(true),
                    body: vec![Stmt::set("x", num(2.0))],
                },
            ],
            else_body: None,
        },
    ])
    .await;

    assert_eq!(control, Control::Normal);
    assert_eq!(var(&scope, "x"), Val::Num(1.0));
}

#[tokio::test]
async fn test_return_inside_branch_propagates() {
    let (control, _) = run_stmts(vec![Stmt::If {
        test: Expr::bool(true),
        then_body: vec![Stmt::ret(num(7.0)), Stmt::throw(Expr::str("unreachable"))],
        elseifs: vec![],
        else_body: None,
    }])
    .await;

    assert_eq!(control, Control::Return(Val::Num(7.0)));
}

#[tokio::test]
async fn test_non_boolean_condition_fails() {
    let (control, _) = run_stmts(vec![Stmt::If {
        test: num(1.0),
        then_body: vec![],
        elseifs: vec![],
        else_body: None,
    }])
    .await;

    let err = thrown(control);
    assert_eq!(err.code(), errors::TYPE_ERROR);
    assert!(err.to_string().contains("IF condition must be BOOLEAN"));
}
