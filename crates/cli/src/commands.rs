// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Built-in command descriptors.
//!
//! Sources start a stream, transforms rewrite one, and query parts never
//! execute on their own: the evaluator folds them into a single
//! `execute_query` source before binding.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use futures::future;
use futures::stream::{self, StreamExt, TryChunksError, TryStreamExt};
use serde_json::Value;

use crate::command::{
    Binding, CliCommand, Dependencies, Env, JobScheduler, QueryExecutor, QueryRole, Role,
};
use crate::error::{BindError, FlowError};
use crate::placeholder;
use crate::stream::{iterate, just, Json, JsonStream};

/// The default chunk size when `chunk` is given no argument.
const DEFAULT_CHUNK_SIZE: usize = 100;

/// All built-in commands wired to their collaborators.
///
/// The `help` command is added separately by the evaluator, which knows the
/// full command set.
pub fn all_commands(deps: &Dependencies) -> Vec<Arc<dyn CliCommand>> {
    let mut commands: Vec<Arc<dyn CliCommand>> = vec![
        Arc::new(EchoCommand),
        Arc::new(EnvCommand),
        Arc::new(AddJobCommand { scheduler: deps.job_scheduler.clone() }),
        Arc::new(ExecuteQueryCommand { executor: deps.query_executor.clone() }),
        Arc::new(ChunkCommand),
        Arc::new(FlattenCommand),
        Arc::new(UniqCommand),
        Arc::new(AggregateToCountCommand),
    ];
    commands.extend(query_parts());
    commands
}

/// The default alias table.
pub fn aliases() -> Vec<(String, String)> {
    [("query", "search"), ("match", "search")]
        .into_iter()
        .map(|(a, c)| (a.to_string(), c.to_string()))
        .collect()
}

// ── Sources ──────────────────────────────────────────────────────────────

/// `echo <json-or-text>`: emit the argument. Arrays emit element-wise.
struct EchoCommand;

#[async_trait]
impl CliCommand for EchoCommand {
    fn name(&self) -> &str {
        "echo"
    }

    fn role(&self) -> Role {
        Role::Source
    }

    fn info(&self) -> &str {
        "Send the provided message to downstream."
    }

    fn help(&self) -> String {
        "Usage: echo <message>\n\n\
         The given message is parsed as JSON if possible; a JSON array is\n\
         sent element by element. Anything else is sent as a string.\n\n\
         Example: echo [{\"num\": 1}, {\"num\": 2}] | chunk 1"
            .to_string()
    }

    async fn parse_args(&self, arg: Option<&str>, _env: &Env) -> Result<Binding, BindError> {
        let stream = match arg {
            None => just(Json::String(String::new())),
            Some(raw) => match serde_json::from_str::<Json>(raw.trim()) {
                Ok(Json::Array(values)) => iterate(values),
                Ok(value) => just(value),
                Err(_) => just(Json::String(strip_quotes(raw).to_string())),
            },
        };
        Ok(Binding::Source(stream))
    }
}

/// `env`: emit the resolved evaluation environment as one JSON object.
struct EnvCommand;

#[async_trait]
impl CliCommand for EnvCommand {
    fn name(&self) -> &str {
        "env"
    }

    fn role(&self) -> Role {
        Role::Source
    }

    fn info(&self) -> &str {
        "Retrieve the environment and pass it to downstream."
    }

    fn help(&self) -> String {
        "Usage: env\n\n\
         Emits the resolved environment of this command line: the CLI base\n\
         environment merged with the caller's and any k=v prefix."
            .to_string()
    }

    async fn parse_args(&self, _arg: Option<&str>, env: &Env) -> Result<Binding, BindError> {
        let object: serde_json::Map<String, Value> =
            env.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        Ok(Binding::Source(just(Json::Object(object))))
    }
}

/// `add_job <line>`: hand a job definition to the scheduler.
///
/// The evaluator re-parses the original, unsubstituted input when this is
/// the first command, so placeholders resolve at job run time.
struct AddJobCommand {
    scheduler: Arc<dyn JobScheduler>,
}

#[async_trait]
impl CliCommand for AddJobCommand {
    fn name(&self) -> &str {
        "add_job"
    }

    fn role(&self) -> Role {
        Role::Source
    }

    fn info(&self) -> &str {
        "Register a command line to be run as a job."
    }

    fn help(&self) -> String {
        "Usage: add_job <command line>\n\n\
         Registers the given command line with the job scheduler.\n\
         Placeholders in the job are resolved when the job runs, not when\n\
         it is defined."
            .to_string()
    }

    async fn parse_args(&self, arg: Option<&str>, _env: &Env) -> Result<Binding, BindError> {
        let line = arg.ok_or(BindError::MissingArgument)?;
        let ack = self.scheduler.add_job(line).await?;
        Ok(Binding::Source(just(Json::String(ack))))
    }
}

/// `execute_query <query>`: run a consolidated query against the store.
///
/// Internal: produced by query coalescing, not typed by users.
struct ExecuteQueryCommand {
    executor: Arc<dyn QueryExecutor>,
}

#[async_trait]
impl CliCommand for ExecuteQueryCommand {
    fn name(&self) -> &str {
        "execute_query"
    }

    fn role(&self) -> Role {
        Role::Source
    }

    fn info(&self) -> &str {
        "Execute a consolidated query against the graph store."
    }

    fn help(&self) -> String {
        "Usage: execute_query <query>\n\n\
         Runs the canonical query string produced by query coalescing."
            .to_string()
    }

    fn is_internal(&self) -> bool {
        true
    }

    async fn parse_args(&self, arg: Option<&str>, env: &Env) -> Result<Binding, BindError> {
        let query = arg.ok_or(BindError::MissingArgument)?;
        tracing::debug!(query = %query, "executing consolidated query");
        let stream = self.executor.execute(query, env).await?;
        Ok(Binding::Source(stream))
    }
}

// ── Transforms ───────────────────────────────────────────────────────────

/// `chunk [size]`: group elements into arrays of at most `size`.
struct ChunkCommand;

#[async_trait]
impl CliCommand for ChunkCommand {
    fn name(&self) -> &str {
        "chunk"
    }

    fn role(&self) -> Role {
        Role::Transform
    }

    fn info(&self) -> &str {
        "Chunk incoming elements in batches."
    }

    fn help(&self) -> String {
        format!(
            "Usage: chunk [num]\n\n\
             Parameter:\n    num [optional, default {DEFAULT_CHUNK_SIZE}]: batch size\n\n\
             Buffers at most num elements and emits them as one array."
        )
    }

    async fn parse_args(&self, arg: Option<&str>, _env: &Env) -> Result<Binding, BindError> {
        let size = match arg {
            None => DEFAULT_CHUNK_SIZE,
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|s| *s > 0)
                .ok_or_else(|| BindError::InvalidArgument(format!("not a chunk size: {raw}")))?,
        };
        Ok(Binding::Transform(Box::new(move |input: JsonStream| {
            input
                .try_chunks(size)
                .map(|chunk| match chunk {
                    Ok(values) => Ok(Json::Array(values)),
                    Err(TryChunksError(_, err)) => Err(err),
                })
                .boxed()
        })))
    }
}

/// `flatten`: emit array elements one by one, pass anything else through.
struct FlattenCommand;

#[async_trait]
impl CliCommand for FlattenCommand {
    fn name(&self) -> &str {
        "flatten"
    }

    fn role(&self) -> Role {
        Role::Transform
    }

    fn info(&self) -> &str {
        "Take incoming batches of elements and flatten them."
    }

    fn help(&self) -> String {
        "Usage: flatten\n\nElements of incoming arrays are emitted one by one.".to_string()
    }

    async fn parse_args(&self, _arg: Option<&str>, _env: &Env) -> Result<Binding, BindError> {
        Ok(Binding::Transform(Box::new(|input: JsonStream| {
            input
                .flat_map(|item| match item {
                    Ok(Json::Array(values)) => {
                        stream::iter(values.into_iter().map(Ok)).left_stream()
                    }
                    other => stream::once(future::ready(other)).right_stream(),
                })
                .boxed()
        })))
    }
}

/// `uniq`: drop elements that were already seen.
struct UniqCommand;

#[async_trait]
impl CliCommand for UniqCommand {
    fn name(&self) -> &str {
        "uniq"
    }

    fn role(&self) -> Role {
        Role::Transform
    }

    fn info(&self) -> &str {
        "Remove all duplicated elements from the stream."
    }

    fn help(&self) -> String {
        "Usage: uniq\n\n\
         Keeps the first occurrence of every element and drops repeats.\n\
         Elements are compared by their serialized form."
            .to_string()
    }

    async fn parse_args(&self, _arg: Option<&str>, _env: &Env) -> Result<Binding, BindError> {
        Ok(Binding::Transform(Box::new(|input: JsonStream| {
            input
                .scan(HashSet::new(), |seen, item| {
                    let emit = match &item {
                        Ok(value) => seen.insert(value.to_string()),
                        Err(_) => true,
                    };
                    future::ready(Some(emit.then_some(item)))
                })
                .filter_map(future::ready)
                .boxed()
        })))
    }
}

/// `aggregate_to_count`: rewrite aggregate rows into count lines.
///
/// Internal companion of `count`, appended by query coalescing. Incoming
/// rows look like `{"group": {"name": <label>}, "count": <n>}`.
struct AggregateToCountCommand;

#[async_trait]
impl CliCommand for AggregateToCountCommand {
    fn name(&self) -> &str {
        "aggregate_to_count"
    }

    fn role(&self) -> Role {
        Role::Transform
    }

    fn info(&self) -> &str {
        "Convert the output of an aggregate query to count lines."
    }

    fn help(&self) -> String {
        "Usage: aggregate_to_count\n\n\
         Emits one `label: n` line per aggregate row, followed by a\n\
         `total matched` summary line."
            .to_string()
    }

    fn is_internal(&self) -> bool {
        true
    }

    async fn parse_args(&self, _arg: Option<&str>, _env: &Env) -> Result<Binding, BindError> {
        Ok(Binding::Transform(Box::new(|input: JsonStream| {
            stream::unfold((input, 0u64, false), |(mut input, total, done)| async move {
                if done {
                    return None;
                }
                match input.next().await {
                    Some(Ok(row)) => Some(match count_line(&row) {
                        Some((label, count)) => (
                            Ok(Json::String(format!("{label}: {count}"))),
                            (input, total + count, false),
                        ),
                        None => (
                            Err(FlowError::command(
                                "aggregate_to_count",
                                format!("unexpected aggregate row: {row}"),
                            )),
                            (input, total, false),
                        ),
                    }),
                    Some(Err(err)) => Some((Err(err), (input, total, false))),
                    None => Some((
                        Ok(Json::String(format!("total matched: {total}"))),
                        (input, total, true),
                    )),
                }
            })
            .boxed()
        })))
    }
}

fn count_line(row: &Json) -> Option<(String, u64)> {
    let count = row.get("count")?.as_u64()?;
    let label = match row.get("group").and_then(|g| g.get("name")) {
        Some(Json::String(name)) => name.clone(),
        Some(Json::Null) | None => "total".to_string(),
        Some(other) => other.to_string(),
    };
    Some((label, count))
}

// ── Query parts ──────────────────────────────────────────────────────────

/// Descriptor for a command that only exists inside a query prefix.
struct QueryPartCommand {
    name: &'static str,
    role: QueryRole,
    info: &'static str,
    help: &'static str,
}

#[async_trait]
impl CliCommand for QueryPartCommand {
    fn name(&self) -> &str {
        self.name
    }

    fn role(&self) -> Role {
        Role::Query(self.role)
    }

    fn info(&self) -> &str {
        self.info
    }

    fn help(&self) -> String {
        self.help.to_string()
    }

    async fn parse_args(&self, _arg: Option<&str>, _env: &Env) -> Result<Binding, BindError> {
        // Query parts are folded into execute_query before binding.
        Err(BindError::InvalidArgument(format!(
            "{} is part of a query and can not be executed directly",
            self.name
        )))
    }
}

fn query_parts() -> Vec<Arc<dyn CliCommand>> {
    let part = |name, role, info, help| -> Arc<dyn CliCommand> {
        Arc::new(QueryPartCommand { name, role, info, help })
    };
    vec![
        part(
            "search",
            QueryRole::All,
            "Search the graph with a filter term.",
            "Usage: search <term>\n\n\
             Filter terms support comparisons (==, !=, <, >, <=, >=),\n\
             regex matches (=~, !~), kind checks is(kind), boolean\n\
             combinators (and, or, not), sort and limit clauses.\n\n\
             Example: search is(volume) and some_int == 0 sort name",
        ),
        part(
            "reported",
            QueryRole::Reported,
            "Search the reported section of the graph.",
            "Usage: reported <term>\n\nLike search, scoped to the reported section.",
        ),
        part(
            "desired",
            QueryRole::Desired,
            "Search the desired section of the graph.",
            "Usage: desired <term>\n\nLike search, scoped to the desired section.",
        ),
        part(
            "metadata",
            QueryRole::Metadata,
            "Search the metadata section of the graph.",
            "Usage: metadata <term>\n\nLike search, scoped to the metadata section.",
        ),
        part(
            "predecessors",
            QueryRole::Predecessor,
            "Select all predecessors of the matched nodes.",
            "Usage: predecessors [edge_type]\n\n\
             One step against edge direction. The optional edge type\n\
             defaults to `default`.",
        ),
        part(
            "successors",
            QueryRole::Successor,
            "Select all successors of the matched nodes.",
            "Usage: successors [edge_type]\n\n\
             One step along edge direction. The optional edge type\n\
             defaults to `default`.",
        ),
        part(
            "ancestors",
            QueryRole::Ancestor,
            "Select all ancestors of the matched nodes.",
            "Usage: ancestors [edge_type]\n\nUnbounded traversal against edge direction.",
        ),
        part(
            "descendants",
            QueryRole::Descendant,
            "Select all descendants of the matched nodes.",
            "Usage: descendants [edge_type]\n\nUnbounded traversal along edge direction.",
        ),
        part(
            "aggregate",
            QueryRole::Aggregate,
            "Aggregate the matched nodes by the given variables and functions.",
            "Usage: aggregate [group vars]: <group functions>\n\n\
             Example: aggregate kind, cloud as c: sum(1) as nodes",
        ),
        part(
            "merge_ancestors",
            QueryRole::MergeAncestors,
            "Merge the matched nodes with their ancestors of the given kinds.",
            "Usage: merge_ancestors <kind[,kind]>\n\n\
             The matched nodes are enriched with the properties of their\n\
             ancestors of the listed kinds.",
        ),
        part(
            "count",
            QueryRole::Count,
            "Count the matched nodes, optionally grouped by a property.",
            "Usage: count [property]\n\n\
             Without a property, emits the total number of matched nodes.\n\
             With one, emits one count per distinct value.\n\n\
             Example: search is(volume) | count kind",
        ),
        part(
            "head",
            QueryRole::Head,
            "Keep only the first n matched nodes.",
            "Usage: head [-]n\n\n\
             The sign is accepted for compatibility and has no meaning:\n\
             head -10 and head 10 are the same.",
        ),
        part(
            "tail",
            QueryRole::Tail,
            "Keep only the last n matched nodes.",
            "Usage: tail [-]n\n\n\
             The sign is accepted for compatibility and has no meaning:\n\
             tail -10 and tail 10 are the same.",
        ),
    ]
}

// ── Help ─────────────────────────────────────────────────────────────────

/// `help [command]`: render help from the registered command set.
pub struct HelpCommand {
    parts: Vec<Arc<dyn CliCommand>>,
    aliases: BTreeMap<String, String>,
}

impl HelpCommand {
    /// Build from the full command set (without help itself) and the raw
    /// alias table. Invalid and shadowed aliases are dropped.
    pub fn new(parts: &[Arc<dyn CliCommand>], aliases: &[(String, String)]) -> Self {
        let names: HashSet<&str> = parts.iter().map(|p| p.name()).chain(["help"]).collect();
        let aliases = aliases
            .iter()
            .filter(|(alias, target)| {
                names.contains(target.as_str()) && !names.contains(alias.as_str())
            })
            .cloned()
            .collect();
        Self { parts: parts.to_vec(), aliases }
    }

    fn part(&self, name: &str) -> Option<&Arc<dyn CliCommand>> {
        self.parts.iter().find(|p| p.name() == name)
    }

    fn show(&self, command: &dyn CliCommand) -> String {
        format!("{} - {}\n\n{}", command.name(), command.info(), command.help())
    }

    fn render(&self, arg: Option<&str>, env: &Env) -> String {
        match arg {
            None => self.render_listing(env),
            Some("help") => self.show(self),
            Some(name) => {
                if let Some(part) = self.part(name) {
                    self.show(part.as_ref())
                } else if let Some(target) = self.aliases.get(name) {
                    let explain = format!("{name} is an alias for {target}\n\n");
                    match self.part(target) {
                        Some(part) => format!("{explain}{}", self.show(part.as_ref())),
                        None => explain,
                    }
                } else {
                    format!("No command found with this name: {name}")
                }
            }
        }
    }

    fn render_listing(&self, env: &Env) -> String {
        // Only sources and transforms are listed: query parts never run on
        // their own and internal commands stay hidden.
        let mut visible: Vec<&dyn CliCommand> = self
            .parts
            .iter()
            .map(|p| p.as_ref())
            .filter(|p| !p.is_internal() && matches!(p.role(), Role::Source | Role::Transform))
            .chain([self as &dyn CliCommand])
            .collect();
        visible.sort_by_key(|p| p.name());

        let available: Vec<String> =
            visible.iter().map(|p| format!("   {} - {}", p.name(), p.info())).collect();
        let aliases: Vec<String> = self
            .aliases
            .iter()
            .map(|(alias, target)| {
                let info = self.part(target).map(|p| p.info()).unwrap_or_default();
                format!("   {alias} ({target}) - {info}")
            })
            .collect();
        let placeholders: Vec<String> = placeholder::replacements(env)
            .into_iter()
            .map(|(name, value)| format!("   @{name}@ -> {value}"))
            .collect();

        format!(
            "\nskein CLI\n\n\n\
             Valid placeholder string:\n{}\n\n\
             Available Commands:\n{}\n\n\
             Available Aliases:\n{}\n\n\
             Note that you can pipe commands using the pipe character (|)\n\
             and chain multiple commands using the semicolon (;).",
            placeholders.join("\n"),
            available.join("\n"),
            aliases.join("\n"),
        )
    }
}

#[async_trait]
impl CliCommand for HelpCommand {
    fn name(&self) -> &str {
        "help"
    }

    fn role(&self) -> Role {
        Role::Source
    }

    fn info(&self) -> &str {
        "Shows available commands, as well as help for any specific command."
    }

    fn help(&self) -> String {
        "Usage: help [command]\n\n\
         Parameter:\n    command [optional]: if given shows the help for a specific command\n\n\
         Show help text for a command or general help information."
            .to_string()
    }

    async fn parse_args(&self, arg: Option<&str>, env: &Env) -> Result<Binding, BindError> {
        Ok(Binding::Source(just(Json::String(self.render(arg, env)))))
    }
}

/// Strip one level of matching outer quotes.
fn strip_quotes(text: &str) -> &str {
    let trimmed = text.trim();
    for quote in ['"', '\''] {
        if trimmed.len() >= 2 && trimmed.starts_with(quote) && trimmed.ends_with(quote) {
            return &trimmed[1..trimmed.len() - 1];
        }
    }
    trimmed
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
