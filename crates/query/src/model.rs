// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Query AST: terms, traversals, aggregation, sorting and windows.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use thiserror::Error;

/// Edge type used when a traversal does not name one.
pub const DEFAULT_EDGE: &str = "default";

/// Document sections a bare property path may be rewritten into.
const SECTIONS: [&str; 3] = ["reported", "desired", "metadata"];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// Both sides of a combined query define an aggregation.
    #[error("only one side of a combined query may define an aggregation")]
    CombineAggregate,
}

// ── Terms ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoolOp {
    And,
    Or,
}

impl fmt::Display for BoolOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoolOp::And => write!(f, "and"),
            BoolOp::Or => write!(f, "or"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    /// Regex match, `=~`.
    Like,
    /// Negated regex match, `!~`.
    NotLike,
    In,
    NotIn,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Gt => ">",
            CompareOp::Le => "<=",
            CompareOp::Ge => ">=",
            CompareOp::Like => "=~",
            CompareOp::NotLike => "!~",
            CompareOp::In => "in",
            CompareOp::NotIn => "not in",
        };
        write!(f, "{op}")
    }
}

/// Boolean filter expression over document properties.
///
/// `All` is the neutral element: combining any term with `All` yields the
/// other term unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Term {
    All,
    /// `path op value`, e.g. `reported.some_int == 0`.
    Predicate { name: String, op: CompareOp, value: Json },
    /// Kind check, rendered `is("kind")`.
    IsKind(String),
    Combined { op: BoolOp, left: Box<Term>, right: Box<Term> },
    Not(Box<Term>),
}

impl Term {
    /// Conjunction of two terms with `All` as the neutral element.
    pub fn and_term(self, other: Term) -> Term {
        match (self, other) {
            (Term::All, t) | (t, Term::All) => t,
            (left, right) => {
                Term::Combined { op: BoolOp::And, left: Box::new(left), right: Box::new(right) }
            }
        }
    }

    fn simplify(self) -> Term {
        match self {
            Term::Combined { op, left, right } => {
                let left = left.simplify();
                let right = right.simplify();
                match (op, left, right) {
                    (BoolOp::And, Term::All, t) | (BoolOp::And, t, Term::All) => t,
                    (BoolOp::Or, Term::All, _) | (BoolOp::Or, _, Term::All) => Term::All,
                    (op, left, right) => {
                        Term::Combined { op, left: Box::new(left), right: Box::new(right) }
                    }
                }
            }
            Term::Not(inner) => Term::Not(Box::new(inner.simplify())),
            term => term,
        }
    }

    fn on_section(self, section: &str) -> Term {
        match self {
            Term::Predicate { name, op, value } => {
                Term::Predicate { name: section_path(section, name), op, value }
            }
            Term::Combined { op, left, right } => Term::Combined {
                op,
                left: Box::new(left.on_section(section)),
                right: Box::new(right.on_section(section)),
            },
            Term::Not(inner) => Term::Not(Box::new(inner.on_section(section))),
            term => term,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::All => write!(f, "all"),
            Term::Predicate { name, op, value } => write!(f, "{name} {op} {value}"),
            Term::IsKind(kind) => write!(f, "is(\"{kind}\")"),
            Term::Combined { op, left, right } => write!(f, "({left} {op} {right})"),
            Term::Not(inner) => write!(f, "not {inner}"),
        }
    }
}

/// Prefix a bare property path with a section.
///
/// Paths already under a section and internal paths (`_key`) stay as-is.
fn section_path(section: &str, path: String) -> String {
    if path.starts_with('_') || SECTIONS.iter().any(|s| path.starts_with(&format!("{s}."))) {
        path
    } else {
        format!("{section}.{path}")
    }
}

// ── Navigation ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    In,
    Out,
}

/// One graph traversal step with inclusive depth bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Navigation {
    pub start: u32,
    /// Inclusive upper bound; [`Navigation::MAX`] means unbounded.
    pub until: u32,
    pub edge_type: String,
    pub direction: Direction,
}

impl Navigation {
    /// Sentinel for an unbounded traversal depth.
    pub const MAX: u32 = u32::MAX;

    pub fn new(direction: Direction, start: u32, until: u32, edge_type: impl Into<String>) -> Self {
        Self { start, until, edge_type: edge_type.into(), direction }
    }

    /// True if `other` continues this traversal over the same edges.
    fn joins(&self, other: &Navigation) -> bool {
        self.direction == other.direction && self.edge_type == other.edge_type
    }

    /// Combine two adjacent same-direction traversals by summing bounds.
    fn merge(&self, other: &Navigation) -> Navigation {
        Navigation {
            start: self.start.saturating_add(other.start),
            until: self.until.saturating_add(other.until),
            edge_type: self.edge_type.clone(),
            direction: self.direction,
        }
    }

    fn depth(&self) -> String {
        match (self.start, self.until) {
            (1, 1) => String::new(),
            (start, until) if start == until => format!("[{start}]"),
            (start, Navigation::MAX) => format!("[{start}:]"),
            (start, until) => format!("[{start}:{until}]"),
        }
    }
}

impl fmt::Display for Navigation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            Direction::Out => write!(f, "-{}{}->", self.edge_type, self.depth()),
            Direction::In => write!(f, "<-{}{}-", self.edge_type, self.depth()),
        }
    }
}

// ── Sort & limit ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn reversed(self) -> SortOrder {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Asc => write!(f, "asc"),
            SortOrder::Desc => write!(f, "desc"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    pub name: String,
    pub order: SortOrder,
}

impl Sort {
    pub fn asc(name: impl Into<String>) -> Self {
        Self { name: name.into(), order: SortOrder::Asc }
    }

    pub fn desc(name: impl Into<String>) -> Self {
        Self { name: name.into(), order: SortOrder::Desc }
    }

    /// Deterministic ordering applied to any query without an explicit sort.
    pub fn default_sort() -> Vec<Sort> {
        vec![Sort::asc("kind"), Sort::asc("name"), Sort::asc("id")]
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.order)
    }
}

/// Result window: skip `offset` documents, emit at most `length`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limit {
    pub offset: u64,
    pub length: u64,
}

impl Limit {
    pub fn new(offset: u64, length: u64) -> Self {
        Self { offset, length }
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.offset == 0 {
            write!(f, "limit {}", self.length)
        } else {
            write!(f, "limit {}, {}", self.offset, self.length)
        }
    }
}

// ── Aggregation ──────────────────────────────────────────────────────────

/// Grouping variable, e.g. `reported.bla as bla`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateVariable {
    pub name: String,
    pub as_name: Option<String>,
}

impl AggregateVariable {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), as_name: None }
    }

    pub fn with_as(name: impl Into<String>, as_name: impl Into<String>) -> Self {
        Self { name: name.into(), as_name: Some(as_name.into()) }
    }
}

impl fmt::Display for AggregateVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.as_name {
            Some(as_name) => write!(f, "{} as {as_name}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Argument of an aggregate function: a property path or a constant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregateValue {
    Path(String),
    Int(i64),
}

impl fmt::Display for AggregateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregateValue::Path(path) => write!(f, "{path}"),
            AggregateValue::Int(num) => write!(f, "{num}"),
        }
    }
}

/// Aggregate function application, e.g. `sum(reported.bar)` or `sum(1) as count`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateFunction {
    pub function: String,
    pub arg: AggregateValue,
    pub as_name: Option<String>,
}

impl AggregateFunction {
    pub fn new(function: impl Into<String>, arg: AggregateValue) -> Self {
        Self { function: function.into(), arg, as_name: None }
    }

    pub fn with_as(
        function: impl Into<String>,
        arg: AggregateValue,
        as_name: impl Into<String>,
    ) -> Self {
        Self { function: function.into(), arg, as_name: Some(as_name.into()) }
    }
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.function, self.arg)?;
        if let Some(as_name) = &self.as_name {
            write!(f, " as {as_name}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregate {
    pub group_by: Vec<AggregateVariable>,
    pub group_func: Vec<AggregateFunction>,
}

impl Aggregate {
    pub fn new(group_by: Vec<AggregateVariable>, group_func: Vec<AggregateFunction>) -> Self {
        Self { group_by, group_func }
    }

    /// Names under which aggregate results appear in the output documents.
    fn output_names(&self) -> impl Iterator<Item = &str> {
        self.group_by
            .iter()
            .filter_map(|v| v.as_name.as_deref())
            .chain(self.group_func.iter().filter_map(|f| f.as_name.as_deref()))
    }

    fn on_section(self, section: &str) -> Aggregate {
        let group_by = self
            .group_by
            .into_iter()
            .map(|v| AggregateVariable { name: section_path(section, v.name), as_name: v.as_name })
            .collect();
        let group_func = self
            .group_func
            .into_iter()
            .map(|f| {
                let arg = match f.arg {
                    AggregateValue::Path(path) => AggregateValue::Path(section_path(section, path)),
                    arg => arg,
                };
                AggregateFunction { function: f.function, arg, as_name: f.as_name }
            })
            .collect();
        Aggregate { group_by, group_func }
    }
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let funcs = join(&self.group_func, ", ");
        if self.group_by.is_empty() {
            write!(f, "aggregate({funcs})")
        } else {
            write!(f, "aggregate({}: {funcs})", join(&self.group_by, ", "))
        }
    }
}

// ── Query ────────────────────────────────────────────────────────────────

/// A complete graph query.
///
/// The textual form produced by [`fmt::Display`] is the canonical input of
/// the query executor. A query without an explicit sort is rendered with
/// [`Sort::default_sort`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub preamble: BTreeMap<String, String>,
    pub term: Term,
    pub navigation: Vec<Navigation>,
    pub aggregate: Option<Aggregate>,
    pub sort: Vec<Sort>,
    pub limit: Option<Limit>,
    /// Emit results in reverse order. Set when a `tail` window flipped the
    /// sort; the executor restores the requested orientation.
    pub reversed: bool,
}

impl Query {
    pub fn by(term: Term) -> Self {
        Self {
            preamble: BTreeMap::new(),
            term,
            navigation: Vec::new(),
            aggregate: None,
            sort: Vec::new(),
            limit: None,
            reversed: false,
        }
    }

    /// Conjunctive combination of two queries.
    ///
    /// Terms are and-combined, traversals concatenate, sort/limit/preamble
    /// are merged with the right-hand side winning on conflicts. At most one
    /// side may carry an aggregation.
    pub fn combine(self, other: Query) -> Result<Query, QueryError> {
        let aggregate = match (self.aggregate, other.aggregate) {
            (Some(_), Some(_)) => return Err(QueryError::CombineAggregate),
            (left, right) => left.or(right),
        };
        let mut navigation = self.navigation;
        navigation.extend(other.navigation);
        let mut preamble = self.preamble;
        preamble.extend(other.preamble);
        Ok(Query {
            preamble,
            term: self.term.and_term(other.term),
            navigation,
            aggregate,
            sort: if other.sort.is_empty() { self.sort } else { other.sort },
            limit: other.limit.or(self.limit),
            reversed: self.reversed || other.reversed,
        })
    }

    /// Append an inbound traversal.
    pub fn traverse_in(mut self, start: u32, until: u32, edge_type: impl Into<String>) -> Query {
        self.navigation.push(Navigation::new(Direction::In, start, until, edge_type));
        self
    }

    /// Append an outbound traversal.
    pub fn traverse_out(mut self, start: u32, until: u32, edge_type: impl Into<String>) -> Query {
        self.navigation.push(Navigation::new(Direction::Out, start, until, edge_type));
        self
    }

    /// Rewrite bare property paths to live under `section`.
    ///
    /// Applies to term predicates, sort fields and aggregate paths. Sort
    /// fields naming an aggregate output (e.g. `count`) are not rewritten.
    /// Idempotent.
    pub fn on_section(self, section: &str) -> Query {
        let output_names: Vec<String> = self
            .aggregate
            .as_ref()
            .map(|a| a.output_names().map(str::to_owned).collect())
            .unwrap_or_default();
        let Query { preamble, term, navigation, aggregate, sort, limit, reversed } = self;
        let sort = sort
            .into_iter()
            .map(|s| {
                if output_names.iter().any(|n| n == &s.name) {
                    s
                } else {
                    Sort { name: section_path(section, s.name), order: s.order }
                }
            })
            .collect();
        Query {
            preamble,
            term: term.on_section(section),
            navigation,
            aggregate: aggregate.map(|a| a.on_section(section)),
            sort,
            limit,
            reversed,
        }
    }

    /// Rewrite into canonical form.
    ///
    /// Folds `all` out of combined terms, merges adjacent same-direction
    /// same-edge traversals by summing their bounds, and materializes the
    /// default sort when none is set. Idempotent.
    pub fn simplify(mut self) -> Query {
        self.term = self.term.simplify();
        self.navigation = merge_navigation(self.navigation);
        if self.sort.is_empty() {
            self.sort = Sort::default_sort();
        }
        self
    }
}

fn merge_navigation(navigation: Vec<Navigation>) -> Vec<Navigation> {
    let mut merged: Vec<Navigation> = Vec::with_capacity(navigation.len());
    for nav in navigation {
        match merged.last_mut() {
            Some(last) if last.joins(&nav) => *last = last.merge(&nav),
            _ => merged.push(nav),
        }
    }
    merged
}

fn join<T: fmt::Display>(items: &[T], sep: &str) -> String {
    items.iter().map(T::to_string).collect::<Vec<_>>().join(sep)
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(aggregate) = &self.aggregate {
            write!(f, "{aggregate}")?;
        }
        if !self.preamble.is_empty() {
            let entries: Vec<String> =
                self.preamble.iter().map(|(k, v)| format!("{k}=\"{v}\"")).collect();
            write!(f, "({})", entries.join(", "))?;
        }
        if self.aggregate.is_some() || !self.preamble.is_empty() {
            write!(f, ":")?;
        }

        let sort = if self.sort.is_empty() { Sort::default_sort() } else { self.sort.clone() };
        let sort = format!("sort {}", join(&sort, ", "));

        write!(f, "{} {sort}", self.term)?;
        for nav in &self.navigation {
            write!(f, " {nav} all {sort}")?;
        }
        if let Some(limit) = &self.limit {
            write!(f, " {limit}")?;
        }
        if self.reversed {
            write!(f, " reversed")?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "model_tests.rs"]
mod tests;
