// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outer command-line grammar: statements, pipes and environment prefixes.
//!
//! ```text
//! input      := statement (";" statement)*
//! statement  := (key "=" scalar)* command ("|" command)*
//! command    := name (ws args_tail)?
//! ```
//!
//! The argument tail is kept verbatim (quotes included) so that each command
//! can run its own sub-parser over it. Quoted spans hide `|` and `;` from
//! the splitter; a backslash outside quotes escapes the next character,
//! which is then taken literally.

use std::collections::HashMap;

use serde_json::{Number, Value as Json};

use crate::command::Env;
use crate::error::ParseError;

/// A single named command with its raw argument tail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub name: String,
    pub args: Option<String>,
}

impl ParsedCommand {
    pub fn new(name: impl Into<String>, args: Option<&str>) -> Self {
        Self { name: name.into(), args: args.map(str::to_string) }
    }
}

/// One `;`-delimited statement: a pipeline of commands plus its env prefix.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedStatement {
    pub commands: Vec<ParsedCommand>,
    pub env: Env,
}

/// Parse a full input line into statements.
///
/// Whitespace-only statements (e.g. a trailing `;`) are skipped; every
/// returned statement has at least one command.
pub fn parse_command_lines(input: &str) -> Result<Vec<ParsedStatement>, ParseError> {
    let mut statements = Vec::new();
    for chunks in split_pipelines(input)? {
        if chunks.iter().all(|c| c.text.trim().is_empty()) {
            continue;
        }
        statements.push(parse_statement(&chunks)?);
    }
    Ok(statements)
}

/// A piece of processed input together with its offset in the original line.
struct Chunk {
    text: String,
    offset: usize,
}

/// One scan over the input, splitting statements at `;` and commands at `|`.
///
/// Backslash escapes are resolved here (the backslash is dropped, the
/// escaped character kept literally); quoted spans are preserved verbatim
/// including their quotes and hide both separators.
fn split_pipelines(input: &str) -> Result<Vec<Vec<Chunk>>, ParseError> {
    let mut statements = Vec::new();
    let mut commands = Vec::new();
    let mut current = String::new();
    let mut start = 0;
    let mut chars = input.char_indices();

    while let Some((pos, ch)) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some((_, escaped)) => current.push(escaped),
                // Trailing backslash is taken literally.
                None => current.push('\\'),
            },
            '\'' | '"' => {
                current.push(ch);
                let mut closed = false;
                for (_, inner) in chars.by_ref() {
                    current.push(inner);
                    if inner == ch {
                        closed = true;
                        break;
                    }
                }
                if !closed {
                    return Err(ParseError::UnterminatedQuote { offset: pos });
                }
            }
            '|' => {
                commands.push(Chunk { text: std::mem::take(&mut current), offset: start });
                start = pos + 1;
            }
            ';' => {
                commands.push(Chunk { text: std::mem::take(&mut current), offset: start });
                statements.push(std::mem::take(&mut commands));
                start = pos + 1;
            }
            _ => current.push(ch),
        }
    }
    commands.push(Chunk { text: current, offset: start });
    statements.push(commands);
    Ok(statements)
}

fn parse_statement(chunks: &[Chunk]) -> Result<ParsedStatement, ParseError> {
    let mut commands = Vec::new();
    let mut env = HashMap::new();

    for (index, chunk) in chunks.iter().enumerate() {
        let mut text = chunk.text.as_str();
        if index == 0 {
            let (parsed_env, rest) = parse_env_prefix(text);
            env = parsed_env;
            text = rest;
        }
        commands.push(parse_command(text, chunk.offset)?);
    }
    Ok(ParsedStatement { commands, env })
}

fn parse_command(text: &str, offset: usize) -> Result<ParsedCommand, ParseError> {
    let trimmed = text.trim();
    let mut parts = trimmed.splitn(2, char::is_whitespace);
    let name = parts.next().unwrap_or("");
    if name.is_empty() {
        return Err(ParseError::Expected {
            expected: "command name".to_string(),
            offset,
            fragment: text.chars().take(40).collect(),
        });
    }
    let args = parts.next().map(str::trim).filter(|a| !a.is_empty()).map(str::to_string);
    Ok(ParsedCommand { name: name.to_string(), args })
}

/// Consume leading `key=value` tokens, returning the env and the remainder.
///
/// A token that does not look like an assignment ends the prefix and starts
/// the command.
fn parse_env_prefix(text: &str) -> (Env, &str) {
    let mut env = HashMap::new();
    let mut rest = text;
    loop {
        let trimmed = rest.trim_start();
        let Some((token, after)) = next_token(trimmed) else {
            return (env, rest);
        };
        let Some((key, value)) = as_assignment(token) else {
            return (env, trimmed);
        };
        env.insert(key.to_string(), parse_scalar(value));
        rest = after;
    }
}

/// Read one whitespace-delimited token, honoring quoted spans.
fn next_token(text: &str) -> Option<(&str, &str)> {
    if text.is_empty() {
        return None;
    }
    let mut quote: Option<char> = None;
    let mut end = text.len();
    for (pos, ch) in text.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(ch),
            (None, c) if c.is_whitespace() => {
                end = pos;
                break;
            }
            _ => {}
        }
    }
    Some((&text[..end], &text[end..]))
}

/// `key=value` with an identifier key; anything else is not an assignment.
fn as_assignment(token: &str) -> Option<(&str, &str)> {
    let eq = token.find('=')?;
    let key = &token[..eq];
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return None,
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    Some((key, &token[eq + 1..]))
}

/// Env values parse as bool, number, quoted string or bare string.
fn parse_scalar(raw: &str) -> Json {
    if raw.len() >= 2 {
        for quote in ['"', '\''] {
            if raw.starts_with(quote) && raw.ends_with(quote) {
                return Json::String(raw[1..raw.len() - 1].to_string());
            }
        }
    }
    match raw {
        "true" => return Json::Bool(true),
        "false" => return Json::Bool(false),
        _ => {}
    }
    if let Ok(int) = raw.parse::<i64>() {
        return Json::from(int);
    }
    if let Ok(float) = raw.parse::<f64>() {
        if let Some(num) = Number::from_f64(float) {
            return Json::Number(num);
        }
    }
    Json::String(raw.to_string())
}

#[cfg(test)]
#[path = "line_tests.rs"]
mod tests;
