// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command-line evaluation: resolve, coalesce, validate, bind, compose.

use std::future::Future;
use std::sync::Arc;

use crate::coalesce::coalesce_query;
use crate::command::{Binding, CliCommand, Env, QueryRole, Role, MEDIA_TYPE_JSON};
use crate::commands::HelpCommand;
use crate::error::{CliError, FlowError, PositionDetail};
use crate::line::{parse_command_lines, ParsedStatement};
use crate::placeholder;
use crate::registry::Registry;
use crate::stream::JsonStream;

/// A resolved pipeline element: descriptor plus its raw argument tail.
pub struct BoundCommand {
    pub command: Arc<dyn CliCommand>,
    pub arg: Option<String>,
}

/// One evaluated statement, ready to execute.
///
/// Holds the resolved environment, the parsed statement it came from, the
/// bound pipeline and the composed stream. The stream is one-shot: it can
/// be drained at most once.
pub struct ParsedCommandLine {
    pub env: Env,
    pub statement: ParsedStatement,
    pub commands: Vec<BoundCommand>,
    pub stream: JsonStream,
}

impl std::fmt::Debug for ParsedCommandLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParsedCommandLine")
            .field("env", &self.env)
            .field("statement", &self.statement)
            .field("commands", &self.commands.iter().map(|c| c.command.name()).collect::<Vec<_>>())
            .finish()
    }
}

impl ParsedCommandLine {
    /// Media type of the produced elements, taken from the last command.
    pub fn produces(&self) -> &str {
        self.commands.last().map(|c| c.command.produces()).unwrap_or(MEDIA_TYPE_JSON)
    }

    pub fn produces_json(&self) -> bool {
        self.produces() == MEDIA_TYPE_JSON
    }

    pub fn produces_binary(&self) -> bool {
        self.produces() == "application/octet-stream"
    }

    /// Drain the composed stream into the given sink.
    pub async fn to_sink<F, Fut, T>(self, sink: F) -> T
    where
        F: FnOnce(JsonStream) -> Fut,
        Fut: Future<Output = T>,
    {
        sink(self.stream).await
    }
}

/// The evaluator: a registry of commands plus a base environment.
///
/// A string is parsed into command lines that can be executed against the
/// registered command set. The registry is immutable after construction.
pub struct Cli {
    registry: Registry,
    env: Env,
}

impl Cli {
    /// Build the evaluator. A `help` command over the given command set is
    /// registered automatically.
    pub fn new(commands: Vec<Arc<dyn CliCommand>>, env: Env, aliases: Vec<(String, String)>) -> Self {
        let help = Arc::new(HelpCommand::new(&commands, &aliases));
        let mut commands = commands;
        commands.push(help);
        Self { registry: Registry::new(commands, aliases), env }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Parse and bind the input without draining any stream.
    ///
    /// Produces one [`ParsedCommandLine`] per non-empty `;`-separated
    /// statement. When `substitute` is set, `@NAME@` placeholders are
    /// resolved first, unless the first command is `add_job`, whose
    /// argument must keep its placeholders for job run time.
    pub async fn evaluate(
        &self,
        input: &str,
        substitute: bool,
        env: &Env,
    ) -> Result<Vec<ParsedCommandLine>, CliError> {
        let statements = if substitute {
            let replaced = placeholder::substitute(input, env);
            let provisional = parse_command_lines(&replaced)?;
            let defines_job = provisional
                .first()
                .and_then(|s| s.commands.first())
                .is_some_and(|c| c.name == "add_job");
            if defines_job { parse_command_lines(input)? } else { provisional }
        } else {
            parse_command_lines(input)?
        };
        tracing::debug!(statements = statements.len(), "evaluating command line");

        let mut lines = Vec::with_capacity(statements.len());
        for statement in statements {
            lines.push(self.parse_line(statement, env).await?);
        }
        Ok(lines)
    }

    /// Evaluate the input and drain every resulting stream into the sink.
    pub async fn execute<F, Fut, T>(
        &self,
        input: &str,
        sink: F,
        env: &Env,
    ) -> Result<Vec<T>, CliError>
    where
        F: Fn(JsonStream) -> Fut,
        Fut: Future<Output = Result<T, FlowError>>,
    {
        let lines = self.evaluate(input, true, env).await?;
        let mut results = Vec::with_capacity(lines.len());
        for line in lines {
            results.push(line.to_sink(&sink).await?);
        }
        Ok(results)
    }

    async fn parse_line(
        &self,
        statement: ParsedStatement,
        env: &Env,
    ) -> Result<ParsedCommandLine, CliError> {
        let mut resolved_env = self.env.clone();
        resolved_env.extend(env.iter().map(|(k, v)| (k.clone(), v.clone())));
        resolved_env.extend(statement.env.iter().map(|(k, v)| (k.clone(), v.clone())));

        let mut resolved: Vec<(Arc<dyn CliCommand>, Option<String>)> =
            Vec::with_capacity(statement.commands.len());
        for command in &statement.commands {
            let descriptor = self
                .registry
                .get(&command.name)
                .ok_or_else(|| CliError::UnknownCommand(command.name.clone()))?;
            resolved.push((descriptor.clone(), command.args.clone()));
        }

        let pipeline = self.coalesce(resolved, &resolved_env)?;
        validate(&pipeline)?;

        let mut stream = crate::stream::empty();
        let mut bound = Vec::with_capacity(pipeline.len());
        for (index, (command, arg)) in pipeline.into_iter().enumerate() {
            let binding = command
                .parse_args(arg.as_deref(), &resolved_env)
                .await
                .map_err(|e| CliError::arg_parse(command.name(), arg.as_deref(), &e))?;
            stream = match binding {
                Binding::Source(source) if index == 0 => source,
                Binding::Transform(flow) if index > 0 => flow(stream),
                _ => unreachable!("pipeline positions are validated before binding"),
            };
            bound.push(BoundCommand { command, arg });
        }

        Ok(ParsedCommandLine { env: resolved_env, statement, commands: bound, stream })
    }

    /// Replace a leading run of query parts with a synthetic `execute_query`
    /// source plus any synthetic companion transforms.
    fn coalesce(
        &self,
        resolved: Vec<(Arc<dyn CliCommand>, Option<String>)>,
        env: &Env,
    ) -> Result<Vec<(Arc<dyn CliCommand>, Option<String>)>, CliError> {
        let prefix_len =
            resolved.iter().take_while(|(command, _)| command.role().is_query_part()).count();
        if prefix_len == 0 {
            return Ok(resolved);
        }

        let parts: Vec<(QueryRole, &str, Option<&str>)> = resolved[..prefix_len]
            .iter()
            .filter_map(|(command, arg)| match command.role() {
                Role::Query(role) => Some((role, command.name(), arg.as_deref())),
                _ => None,
            })
            .collect();
        let coalesced = coalesce_query(&parts, env)?;

        let mut pipeline = Vec::with_capacity(resolved.len());
        pipeline.push((self.synthetic("execute_query")?, Some(coalesced.query_string)));
        for (name, arg) in coalesced.additional {
            pipeline.push((self.synthetic(name)?, arg));
        }
        pipeline.extend(resolved.into_iter().skip(prefix_len));
        Ok(pipeline)
    }

    fn synthetic(&self, name: &str) -> Result<Arc<dyn CliCommand>, CliError> {
        self.registry.get(name).cloned().ok_or_else(|| CliError::UnknownCommand(name.to_string()))
    }
}

/// Enforce the position contract: a source first, transforms after.
fn validate(pipeline: &[(Arc<dyn CliCommand>, Option<String>)]) -> Result<(), CliError> {
    for (index, (command, _)) in pipeline.iter().enumerate() {
        let valid = match command.role() {
            Role::Source => index == 0,
            Role::Transform => index > 0,
            Role::Query(_) => false,
        };
        if !valid {
            let detail =
                if index == 0 { PositionDetail::NoSource } else { PositionDetail::MustBeFirst };
            return Err(CliError::WrongPosition { name: command.name().to_string(), detail });
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
