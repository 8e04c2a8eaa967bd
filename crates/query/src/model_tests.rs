// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use proptest::prelude::*;
use serde_json::json;

use super::*;

fn pred(name: &str, op: CompareOp, value: serde_json::Value) -> Term {
    Term::Predicate { name: name.to_string(), op, value }
}

#[test]
fn term_display() {
    assert_eq!(pred("some_int", CompareOp::Eq, json!(0)).to_string(), "some_int == 0");
    assert_eq!(pred("identifier", CompareOp::Like, json!("9_")).to_string(), "identifier =~ \"9_\"");
    assert_eq!(Term::IsKind("volume".to_string()).to_string(), "is(\"volume\")");
    let combined = pred("a", CompareOp::Gt, json!(12)).and_term(pred("b", CompareOp::Lt, json!(100)));
    assert_eq!(combined.to_string(), "(a > 12 and b < 100)");
}

#[test]
fn all_is_neutral_for_and() {
    let p = pred("a", CompareOp::Eq, json!(1));
    assert_eq!(Term::All.and_term(p.clone()), p);
    assert_eq!(p.clone().and_term(Term::All), p);
}

#[yare::parameterized(
    single_out   = { Direction::Out, 1, 1,               "-default->" },
    single_in    = { Direction::In,  1, 1,               "<-default-" },
    exact_out    = { Direction::Out, 3, 3,               "-default[3]->" },
    exact_in     = { Direction::In,  2, 2,               "<-default[2]-" },
    open_out     = { Direction::Out, 1, Navigation::MAX, "-default[1:]->" },
    open_in      = { Direction::In,  2, Navigation::MAX, "<-default[2:]-" },
    bounded_out  = { Direction::Out, 1, 3,               "-default[1:3]->" },
)]
fn navigation_display(direction: Direction, start: u32, until: u32, expected: &str) {
    assert_eq!(Navigation::new(direction, start, until, DEFAULT_EDGE).to_string(), expected);
}

#[yare::parameterized(
    no_offset   = { 0, 10, "limit 10" },
    with_offset = { 5, 3,  "limit 5, 3" },
)]
fn limit_display(offset: u64, length: u64, expected: &str) {
    assert_eq!(Limit::new(offset, length).to_string(), expected);
}

#[test]
fn combine_concatenates_navigation_and_ands_terms() {
    let left = Query::by(pred("a", CompareOp::Eq, json!(1))).traverse_out(1, 1, DEFAULT_EDGE);
    let right = Query::by(pred("b", CompareOp::Eq, json!(2))).traverse_in(1, 1, DEFAULT_EDGE);
    let combined = left.combine(right).unwrap();
    assert_eq!(combined.term.to_string(), "(a == 1 and b == 2)");
    assert_eq!(combined.navigation.len(), 2);
}

#[test]
fn combine_rejects_two_aggregations() {
    let agg = Aggregate::new(vec![], vec![AggregateFunction::new("sum", AggregateValue::Int(1))]);
    let mut left = Query::by(Term::All);
    left.aggregate = Some(agg.clone());
    let mut right = Query::by(Term::All);
    right.aggregate = Some(agg);
    assert_eq!(left.combine(right), Err(QueryError::CombineAggregate));
}

#[test]
fn combine_right_side_wins_sort_and_limit() {
    let mut left = Query::by(Term::All);
    left.sort = vec![Sort::asc("a")];
    left.limit = Some(Limit::new(0, 10));
    let mut right = Query::by(Term::All);
    right.sort = vec![Sort::desc("b")];
    right.limit = Some(Limit::new(2, 5));
    let combined = left.combine(right).unwrap();
    assert_eq!(combined.sort, vec![Sort::desc("b")]);
    assert_eq!(combined.limit, Some(Limit::new(2, 5)));
}

#[test]
fn on_section_prefixes_bare_paths() {
    let query = Query::by(pred("some_int", CompareOp::Eq, json!(0))).on_section("reported");
    assert_eq!(query.term.to_string(), "reported.some_int == 0");
}

#[yare::parameterized(
    already_scoped = { "reported.name", "reported.name" },
    other_section  = { "desired.clean", "desired.clean" },
    internal       = { "_key",          "_key" },
    bare           = { "name",          "reported.name" },
)]
fn on_section_sort_fields(field: &str, expected: &str) {
    let mut query = Query::by(Term::All);
    query.sort = vec![Sort::asc(field)];
    let scoped = query.on_section("reported");
    assert_eq!(scoped.sort[0].name, expected);
}

#[test]
fn on_section_skips_aggregate_output_names_in_sort() {
    let mut query = Query::by(Term::All);
    query.aggregate = Some(Aggregate::new(
        vec![],
        vec![AggregateFunction::with_as("sum", AggregateValue::Int(1), "count")],
    ));
    query.sort = vec![Sort::asc("count")];
    let scoped = query.on_section("reported");
    assert_eq!(scoped.sort[0].name, "count");
}

#[test]
fn on_section_rewrites_aggregate_paths() {
    let mut query = Query::by(Term::All);
    query.aggregate = Some(Aggregate::new(
        vec![AggregateVariable::new("foo"), AggregateVariable::with_as("bla", "bla")],
        vec![AggregateFunction::new("sum", AggregateValue::Path("bar".to_string()))],
    ));
    let scoped = query.on_section("reported");
    assert_eq!(
        scoped.aggregate.unwrap().to_string(),
        "aggregate(reported.foo, reported.bla as bla: sum(reported.bar))"
    );
}

#[test]
fn on_section_is_idempotent() {
    let query = Query::by(pred("some_int", CompareOp::Eq, json!(0)));
    let once = query.clone().on_section("reported");
    let twice = once.clone().on_section("reported");
    assert_eq!(once, twice);
}

#[test]
fn simplify_folds_all_terms() {
    let term = Term::All.and_term(pred("a", CompareOp::Eq, json!(1)));
    // and_term already folds; build the combined form explicitly.
    let combined = Term::Combined {
        op: BoolOp::And,
        left: Box::new(Term::All),
        right: Box::new(pred("a", CompareOp::Eq, json!(1))),
    };
    let query = Query::by(combined).simplify();
    assert_eq!(query.term, term);
}

#[yare::parameterized(
    two_single = { 1, 1, 1, 1, 2, 2 },
    open_open  = { 1, Navigation::MAX, 1, Navigation::MAX, 2, Navigation::MAX },
    single_open = { 1, 1, 1, Navigation::MAX, 2, Navigation::MAX },
)]
fn simplify_merges_adjacent_navigation(
    a_start: u32,
    a_until: u32,
    b_start: u32,
    b_until: u32,
    start: u32,
    until: u32,
) {
    let query = Query::by(Term::All)
        .traverse_in(a_start, a_until, DEFAULT_EDGE)
        .traverse_in(b_start, b_until, DEFAULT_EDGE)
        .simplify();
    assert_eq!(query.navigation, vec![Navigation::new(Direction::In, start, until, DEFAULT_EDGE)]);
}

#[test]
fn simplify_keeps_distinct_navigation_apart() {
    let query = Query::by(Term::All)
        .traverse_out(1, 1, DEFAULT_EDGE)
        .traverse_in(1, 1, DEFAULT_EDGE)
        .simplify();
    assert_eq!(query.navigation.len(), 2);
}

#[test]
fn simplify_materializes_default_sort() {
    let query = Query::by(Term::All).simplify();
    assert_eq!(query.sort, Sort::default_sort());
}

#[test]
fn display_repeats_sort_per_part() {
    let query = Query::by(Term::IsKind("volume".to_string()))
        .traverse_out(1, Navigation::MAX, DEFAULT_EDGE)
        .on_section("reported")
        .simplify();
    let sort = "sort kind asc, name asc, id asc";
    assert_eq!(query.to_string(), format!("is(\"volume\") {sort} -default[1:]-> all {sort}"));
}

#[test]
fn display_appends_limit_and_reversed() {
    let mut query = Query::by(Term::IsKind("volume".to_string()));
    query.sort = vec![Sort::desc("reported.name")];
    query.limit = Some(Limit::new(5, 5));
    query.reversed = true;
    assert_eq!(
        query.to_string(),
        "is(\"volume\") sort reported.name desc limit 5, 5 reversed"
    );
}

#[test]
fn display_aggregate_prefix() {
    let mut query = Query::by(pred("some_int", CompareOp::Eq, json!(0)));
    query.aggregate = Some(Aggregate::new(
        vec![AggregateVariable::new("foo")],
        vec![AggregateFunction::new("sum", AggregateValue::Path("bar".to_string()))],
    ));
    let rendered = query.simplify().on_section("reported").to_string();
    assert_eq!(
        rendered,
        "aggregate(reported.foo: sum(reported.bar)):reported.some_int == 0 \
         sort reported.kind asc, reported.name asc, reported.id asc"
    );
}

#[test]
fn display_preamble_prefix() {
    let mut query = Query::by(Term::All);
    query.preamble.insert("merge_with_ancestors".to_string(), "account".to_string());
    assert!(query.to_string().starts_with("(merge_with_ancestors=\"account\"):all"));
}

// ── Properties ───────────────────────────────────────────────────────────

fn arb_term() -> impl Strategy<Value = Term> {
    let leaf = prop_oneof![
        Just(Term::All),
        "[a-z]{1,8}".prop_map(|k| Term::IsKind(k)),
        ("[a-z_]{1,8}", -100i64..100).prop_map(|(name, num)| Term::Predicate {
            name,
            op: CompareOp::Eq,
            value: serde_json::json!(num),
        }),
    ];
    leaf.prop_recursive(3, 16, 2, |inner| {
        (inner.clone(), inner, prop_oneof![Just(BoolOp::And), Just(BoolOp::Or)]).prop_map(
            |(left, right, op)| Term::Combined { op, left: Box::new(left), right: Box::new(right) },
        )
    })
}

fn arb_navigation() -> impl Strategy<Value = Navigation> {
    (
        prop_oneof![Just(Direction::In), Just(Direction::Out)],
        1u32..3,
        prop_oneof![Just(3u32), Just(Navigation::MAX)],
        prop_oneof![Just("default"), Just("delete")],
    )
        .prop_map(|(direction, start, until, edge)| Navigation::new(direction, start, until, edge))
}

fn arb_query() -> impl Strategy<Value = Query> {
    (arb_term(), proptest::collection::vec(arb_navigation(), 0..4), proptest::option::of(0u64..10))
        .prop_map(|(term, navigation, limit)| {
            let mut query = Query::by(term);
            query.navigation = navigation;
            query.limit = limit.map(|l| Limit::new(0, l + 1));
            query
        })
}

proptest! {
    /// Invariant: simplify is idempotent.
    #[test]
    fn simplify_idempotent(query in arb_query()) {
        let once = query.simplify();
        let twice = once.clone().simplify();
        prop_assert_eq!(once, twice);
    }

    /// Invariant: the canonical form is stable under simplify.
    #[test]
    fn display_stable_under_simplify(query in arb_query()) {
        let once = query.simplify();
        prop_assert_eq!(once.to_string(), once.clone().simplify().to_string());
    }
}
