// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn field(resource: &str, name: &str, start: usize, end: usize) -> Expr {
    Expr::Field { resource: resource.into(), field: name.into(), span: Span::new(start, end) }
}

fn s(text: &str) -> Expr {
    Expr::Literal(Literal::Str(text.into()))
}

#[test]
fn simple_equality() {
    let expr = Parser::parse("package.name == 'fwts'").unwrap();
    assert_eq!(
        expr,
        Expr::Compare { first: Box::new(field("package", "name", 0, 12)), rest: vec![(CmpOp::Eq, s("fwts"))] }
    );
}

#[test]
fn and_binds_tighter_than_or() {
    let expr = Parser::parse("a.x == '1' or a.y == '2' and a.z == '3'").unwrap();
    let Expr::Or(items) = expr else { panic!("expected or, got {expr:?}") };
    assert_eq!(items.len(), 2);
    assert!(matches!(items[1], Expr::And(ref inner) if inner.len() == 2));
}

#[test]
fn not_in_is_one_operator() {
    let expr = Parser::parse("'x' not in a.flags").unwrap();
    let Expr::Compare { rest, .. } = expr else { panic!("expected compare") };
    assert_eq!(rest[0].0, CmpOp::NotIn);
}

#[test]
fn not_applies_to_whole_comparison() {
    let expr = Parser::parse("not a.x == 'y'").unwrap();
    assert!(matches!(expr, Expr::Not(ref inner) if matches!(**inner, Expr::Compare { .. })));
}

#[test]
fn chained_comparison_keeps_all_pairs() {
    let expr = Parser::parse("1 < int(a.n) <= 10").unwrap();
    let Expr::Compare { rest, .. } = expr else { panic!("expected compare") };
    let ops: Vec<_> = rest.iter().map(|(op, _)| *op).collect();
    assert_eq!(ops, vec![CmpOp::Lt, CmpOp::Le]);
}

#[test]
fn list_literal_with_trailing_comma() {
    let expr = Parser::parse("a.x in ['b', 'c',]").unwrap();
    let Expr::Compare { rest, .. } = expr else { panic!("expected compare") };
    assert_eq!(rest[0].1, Expr::List(vec![s("b"), s("c")]));
}

#[test]
fn empty_list() {
    let expr = Parser::parse("a.x in []").unwrap();
    let Expr::Compare { rest, .. } = expr else { panic!("expected compare") };
    assert_eq!(rest[0].1, Expr::List(vec![]));
}

#[test]
fn parenthesized_grouping() {
    let expr = Parser::parse("(a.x == '1' or a.x == '2') and a.y == '3'").unwrap();
    assert!(matches!(expr, Expr::And(ref items) if matches!(items[0], Expr::Or(_))));
}

#[yare::parameterized(
    len   = { "len(a.x) > 0",       Func::Len },
    int   = { "int(a.x) > 0",       Func::Int },
    float = { "float(a.x) > 0.5",   Func::Float },
    bool  = { "bool(a.x)",          Func::Bool },
)]
fn allowed_calls(input: &str, func: Func) {
    let mut found = None;
    let expr = Parser::parse(input).unwrap();
    match expr {
        Expr::Call { func: f, .. } => found = Some(f),
        Expr::Compare { first, .. } => {
            if let Expr::Call { func: f, .. } = *first {
                found = Some(f);
            }
        }
        _ => {}
    }
    assert_eq!(found, Some(func));
}

#[yare::parameterized(
    dangling_operator = { "a.x ==" },
    missing_rparen    = { "(a.x == '1'" },
    trailing_token    = { "a.x == '1' '2'" },
    unclosed_list     = { "a.x in ['b'" },
    field_not_name    = { "a.'x' == 1" },
    empty             = { "" },
)]
fn syntax_errors(input: &str) {
    assert!(Parser::parse(input).is_err(), "expected error for {input:?}");
}

#[test]
fn bare_name_is_rejected() {
    assert!(matches!(Parser::parse("fwts == 'x'"), Err(ParseError::BareName { ref name, .. }) if name == "fwts"));
}

#[test]
fn unknown_function_is_rejected() {
    assert!(matches!(
        Parser::parse("__import__(a.x)"),
        Err(ParseError::UnknownFunction { ref name, .. }) if name == "__import__"
    ));
}

#[test]
fn for_each_field_visits_in_order() {
    let expr = Parser::parse("a.x == '1' and (b.y in ['z'] or not len(c.w))").unwrap();
    let mut seen = Vec::new();
    expr.for_each_field(&mut |r, f, _| seen.push(format!("{r}.{f}")));
    assert_eq!(seen, vec!["a.x", "b.y", "c.w"]);
}

proptest::proptest! {
    #[test]
    fn arbitrary_input_never_panics(input in "[ -~]{0,48}") {
        let _ = Parser::parse(&input);
    }

    #[test]
    fn quoted_literal_round_trips(value in "[a-z0-9 _-]{0,16}") {
        let expr = Parser::parse(&format!("r.f == '{value}'")).unwrap();
        let Expr::Compare { rest, .. } = expr else { panic!("expected compare") };
        proptest::prop_assert_eq!(&rest[0].1, &s(&value));
    }
}
