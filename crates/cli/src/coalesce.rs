// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Query coalescing: fold a run of query commands into one query.
//!
//! A contiguous prefix of query-part commands (`search`, `descendants`,
//! `count`, `head`, ...) is folded left to right into a single [`Query`],
//! which is rendered to its canonical string and handed to the synthetic
//! `execute_query` source. Some parts additionally append synthetic
//! transforms (`count` appends `aggregate_to_count`).

use sk_query::{
    parse_aggregate_args, parse_query, Aggregate, AggregateFunction, AggregateValue,
    AggregateVariable, Limit, Query, Sort, Term, DEFAULT_EDGE,
};

use crate::command::{Env, QueryRole};
use crate::error::{BindError, CliError};
use crate::stream::Json;

/// The section bare paths are scoped to when the env does not name one.
const DEFAULT_SECTION: &str = "reported";

/// Result of folding a query prefix: the canonical query string for
/// `execute_query`, plus synthetic trailing transforms by name.
#[derive(Debug)]
pub struct CoalescedQuery {
    pub query_string: String,
    pub additional: Vec<(&'static str, Option<String>)>,
}

/// Fold `(role, raw_args)` pairs into one consolidated query.
///
/// The caller passes the contiguous query-part prefix of a pipeline; the
/// `name` of each pair is only used for error messages.
pub fn coalesce_query(
    parts: &[(QueryRole, &str, Option<&str>)],
    env: &Env,
) -> Result<CoalescedQuery, CliError> {
    let mut query = Query::by(Term::All);
    let mut additional: Vec<(&'static str, Option<String>)> = Vec::new();

    for (role, name, raw) in parts.iter().copied() {
        let arg = raw.unwrap_or("");
        match role {
            QueryRole::All => query = query.combine(parse_query(arg)?)?,
            QueryRole::Reported => {
                query = query.combine(parse_query(arg)?.on_section("reported"))?;
            }
            QueryRole::Desired => {
                query = query.combine(parse_query(arg)?.on_section("desired"))?;
            }
            QueryRole::Metadata => {
                query = query.combine(parse_query(arg)?.on_section("metadata"))?;
            }
            QueryRole::Predecessor => query = query.traverse_in(1, 1, edge_type(arg)),
            QueryRole::Successor => query = query.traverse_out(1, 1, edge_type(arg)),
            QueryRole::Ancestor => {
                query = query.traverse_in(1, sk_query::Navigation::MAX, edge_type(arg));
            }
            QueryRole::Descendant => {
                query = query.traverse_out(1, sk_query::Navigation::MAX, edge_type(arg));
            }
            QueryRole::Aggregate => {
                if query.aggregate.is_some() {
                    return Err(sk_query::QueryError::CombineAggregate.into());
                }
                let (group_by, group_func) = parse_aggregate_args(arg)?;
                query.aggregate = Some(Aggregate::new(group_by, group_func));
            }
            QueryRole::MergeAncestors => {
                query.preamble.insert("merge_with_ancestors".to_string(), arg.to_string());
            }
            QueryRole::Count => {
                if query.aggregate.is_some() {
                    return Err(CliError::AggregateAndCount);
                }
                let group_by = if arg.is_empty() {
                    Vec::new()
                } else {
                    vec![AggregateVariable::with_as(arg, "name")]
                };
                let group_func =
                    vec![AggregateFunction::with_as("sum", AggregateValue::Int(1), "count")];
                query.aggregate = Some(Aggregate::new(group_by, group_func));
                query.sort = vec![Sort::asc("count")];
                additional.push(("aggregate_to_count", raw.map(str::to_string)));
            }
            QueryRole::Head => {
                let size = parse_size(name, raw)?;
                apply_head(&mut query, size);
            }
            QueryRole::Tail => {
                let size = parse_size(name, raw)?;
                apply_tail(&mut query, size);
            }
        }
    }

    let section = env.get("section").and_then(Json::as_str).unwrap_or(DEFAULT_SECTION);
    let query = query.simplify().on_section(section);
    Ok(CoalescedQuery { query_string: query.to_string(), additional })
}

/// Window size of `head`/`tail`. A leading `-` is legacy syntax and has no
/// meaning; missing sizes default to 100.
fn parse_size(name: &str, raw: Option<&str>) -> Result<u64, CliError> {
    let Some(raw) = raw else {
        return Ok(100);
    };
    let text = raw.trim();
    match text.strip_prefix('-').unwrap_or(text).parse::<u64>() {
        Ok(size) if size > 0 => Ok(size),
        _ => Err(CliError::arg_parse(
            name,
            Some(raw),
            &BindError::InvalidArgument(format!("not a window size: {raw}")),
        )),
    }
}

fn edge_type(arg: &str) -> String {
    if arg.trim().is_empty() { DEFAULT_EDGE.to_string() } else { arg.trim().to_string() }
}

/// Narrow an existing window to its first `n` elements.
fn narrow_head(limit: Limit, n: u64) -> Limit {
    Limit::new(limit.offset, limit.length.min(n))
}

/// Narrow an existing window to its last `n` elements.
fn narrow_tail(limit: Limit, n: u64) -> Limit {
    Limit::new(limit.offset + limit.length.saturating_sub(n), limit.length.min(n))
}

fn apply_head(query: &mut Query, n: u64) {
    query.limit = Some(match (query.limit, query.reversed) {
        (None, _) => Limit::new(0, n),
        (Some(limit), false) => narrow_head(limit, n),
        // On a reversed query, "first" means last of the underlying order.
        (Some(limit), true) => narrow_tail(limit, n),
    });
}

fn apply_tail(query: &mut Query, n: u64) {
    match (query.limit, query.reversed) {
        (Some(limit), false) => query.limit = Some(narrow_tail(limit, n)),
        (Some(limit), true) => query.limit = Some(narrow_head(limit, n)),
        (None, true) => query.limit = Some(Limit::new(0, n)),
        // The first tail flips the query: sort descending, emit reversed.
        (None, false) => {
            query.reversed = true;
            if query.sort.is_empty() {
                query.sort = vec![Sort::desc("_key")];
            } else {
                for sort in &mut query.sort {
                    sort.order = sort.order.reversed();
                }
            }
            query.limit = Some(Limit::new(0, n));
        }
    }
}

#[cfg(test)]
#[path = "coalesce_tests.rs"]
mod tests;
