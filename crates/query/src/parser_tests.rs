// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde_json::json;

use super::*;
use crate::model::{CompareOp, Direction, Limit, Navigation, Sort, SortOrder, Term};

fn parse(input: &str) -> Query {
    parse_query(input).unwrap()
}

#[test]
fn parse_empty_input_is_all() {
    assert_eq!(parse("").term, Term::All);
    assert_eq!(parse("   ").term, Term::All);
}

#[test]
fn parse_simple_predicate() {
    let query = parse("some_int==0");
    assert_eq!(
        query.term,
        Term::Predicate { name: "some_int".to_string(), op: CompareOp::Eq, value: json!(0) }
    );
}

#[yare::parameterized(
    eq       = { "a==1",        CompareOp::Eq },
    ne       = { "a != 1",      CompareOp::Ne },
    lt       = { "a<1",         CompareOp::Lt },
    gt       = { "a > 1",       CompareOp::Gt },
    le       = { "a<=1",        CompareOp::Le },
    ge       = { "a>=1",        CompareOp::Ge },
    like     = { "a=~1",        CompareOp::Like },
    not_like = { "a!~1",        CompareOp::NotLike },
)]
fn parse_compare_ops(input: &str, expected: CompareOp) {
    match parse(input).term {
        Term::Predicate { op, .. } => assert_eq!(op, expected),
        term => panic!("expected predicate, got {term:?}"),
    }
}

#[test]
fn parse_in_operator() {
    let query = parse("g in [1, 2]");
    assert_eq!(
        query.term,
        Term::Predicate { name: "g".to_string(), op: CompareOp::In, value: json!([1, 2]) }
    );
    let query = parse("g not in [1, 2]");
    match query.term {
        Term::Predicate { op, .. } => assert_eq!(op, CompareOp::NotIn),
        term => panic!("expected predicate, got {term:?}"),
    }
}

#[yare::parameterized(
    quoted_string = { r#"name=="foo""#,    json!("foo") },
    single_quoted = { "name=='foo'",       json!("foo") },
    bare_string   = { "name==foo",         json!("foo") },
    boolean       = { "name==true",        json!(true) },
    null          = { "name==null",        json!(null) },
    float         = { "name==1.23",        json!(1.23) },
    negative      = { "name==-4",          json!(-4) },
)]
fn parse_values(input: &str, expected: serde_json::Value) {
    match parse(input).term {
        Term::Predicate { value, .. } => assert_eq!(value, expected),
        term => panic!("expected predicate, got {term:?}"),
    }
}

#[test]
fn parse_is_kind() {
    assert_eq!(parse("is(volume)").term, Term::IsKind("volume".to_string()));
    assert_eq!(parse(r#"is("volume")"#).term, Term::IsKind("volume".to_string()));
}

#[test]
fn parse_array_path_predicate() {
    let query = parse("g[*]==2");
    assert_eq!(
        query.term,
        Term::Predicate { name: "g[*]".to_string(), op: CompareOp::Eq, value: json!(2) }
    );
}

#[test]
fn parse_dotted_path() {
    let query = parse("bla.test==\"foo\"");
    match query.term {
        Term::Predicate { name, .. } => assert_eq!(name, "bla.test"),
        term => panic!("expected predicate, got {term:?}"),
    }
}

#[test]
fn parse_boolean_combination() {
    let query = parse("is(foo) and bla.test==\"foo\"");
    assert_eq!(query.term.to_string(), "(is(\"foo\") and bla.test == \"foo\")");

    let query = parse("a==1 or b==2 and c==3");
    // `and` binds tighter than `or`.
    assert_eq!(query.term.to_string(), "(a == 1 or (b == 2 and c == 3))");
}

#[test]
fn parse_not_term() {
    let query = parse("not a==1");
    assert_eq!(query.term.to_string(), "not a == 1");
}

#[test]
fn parse_parenthesized_term() {
    let query = parse("(a==1 or b==2) and c==3");
    assert_eq!(query.term.to_string(), "((a == 1 or b == 2) and c == 3)");
}

#[yare::parameterized(
    out_single = { "all -default->",     Direction::Out, 1, 1 },
    in_single  = { "all <-default-",     Direction::In,  1, 1 },
    out_open   = { "all -default[1:]->", Direction::Out, 1, Navigation::MAX },
    in_exact   = { "all <-delete[2]-",   Direction::In,  2, 2 },
    out_range  = { "all -default[1:3]->", Direction::Out, 1, 3 },
)]
fn parse_navigation(input: &str, direction: Direction, start: u32, until: u32) {
    let query = parse(input);
    assert_eq!(query.navigation.len(), 1);
    let nav = &query.navigation[0];
    assert_eq!(nav.direction, direction);
    assert_eq!(nav.start, start);
    assert_eq!(nav.until, until);
}

#[test]
fn parse_navigation_chain_with_all_separator() {
    let query = parse("is(volume) -default-> all <-delete-");
    assert_eq!(query.navigation.len(), 2);
}

#[test]
fn parse_sort_clause() {
    let query = parse("is(volume) sort name");
    assert_eq!(query.sort, vec![Sort::asc("name")]);

    let query = parse("is(volume) sort name desc, age asc");
    assert_eq!(
        query.sort,
        vec![Sort::desc("name"), Sort { name: "age".to_string(), order: SortOrder::Asc }]
    );
}

#[test]
fn parse_limit_clause() {
    assert_eq!(parse("all limit 10").limit, Some(Limit::new(0, 10)));
    assert_eq!(parse("all limit 5, 3").limit, Some(Limit::new(5, 3)));
}

#[test]
fn parse_reversed_marker() {
    assert!(parse("all sort name desc limit 10 reversed").reversed);
}

#[test]
fn parse_full_round_trip() {
    let text = "is(\"volume\") sort reported.name desc limit 5, 5 reversed";
    let query = parse(text);
    assert_eq!(query.to_string(), text);
}

#[test]
fn parse_error_carries_offset() {
    match parse_query("a >>>> 12") {
        Err(QueryParseError::Expected { offset, .. }) => assert!(offset > 0),
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn parse_error_on_trailing_garbage() {
    assert!(matches!(parse_query("a==1 ???"), Err(QueryParseError::Trailing { .. })));
}

// ── Aggregate arguments ──────────────────────────────────────────────────

#[test]
fn aggregate_args_with_group_vars() {
    let (vars, funcs) = parse_aggregate_args("foo, bla as bla: sum(bar)").unwrap();
    assert_eq!(vars.len(), 2);
    assert_eq!(vars[0].name, "foo");
    assert_eq!(vars[1].as_name.as_deref(), Some("bla"));
    assert_eq!(funcs.len(), 1);
    assert_eq!(funcs[0].to_string(), "sum(bar)");
}

#[test]
fn aggregate_args_without_group_vars() {
    let (vars, funcs) = parse_aggregate_args("sum(1) as count").unwrap();
    assert!(vars.is_empty());
    assert_eq!(funcs[0].to_string(), "sum(1) as count");
}

#[test]
fn aggregate_args_multiple_functions() {
    let (_, funcs) = parse_aggregate_args("kind: sum(1) as count, max(age) as oldest").unwrap();
    assert_eq!(funcs.len(), 2);
    assert_eq!(funcs[1].to_string(), "max(age) as oldest");
}

#[test]
fn aggregate_args_reject_garbage() {
    assert!(parse_aggregate_args("kind: sum(").is_err());
}
