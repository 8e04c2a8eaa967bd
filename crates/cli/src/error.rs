// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types surfaced by command-line evaluation.

use std::fmt;

use thiserror::Error;

pub use sk_query::QueryParseError;

/// Lexer/grammar failure in the outer command line.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("expected {expected} at offset {offset}: >{fragment}<")]
    Expected { expected: String, offset: usize, fragment: String },

    #[error("unterminated quote starting at offset {offset}")]
    UnterminatedQuote { offset: usize },
}

impl ParseError {
    pub fn offset(&self) -> usize {
        match self {
            ParseError::Expected { offset, .. } => *offset,
            ParseError::UnterminatedQuote { offset } => *offset,
        }
    }
}

/// Why a command is not allowed at its pipeline position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionDetail {
    /// A transform in the leading position.
    NoSource,
    /// A source after the leading position.
    MustBeFirst,
}

impl fmt::Display for PositionDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionDetail::NoSource => write!(f, "no source data given"),
            PositionDetail::MustBeFirst => write!(f, "must be the first command"),
        }
    }
}

/// Failure reported by a command's argument parser.
///
/// The evaluator wraps this into [`CliError::ArgParse`] together with the
/// offending command name and raw argument string.
#[derive(Debug, Error)]
pub enum BindError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("argument required")]
    MissingArgument,

    #[error(transparent)]
    QueryParse(#[from] QueryParseError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Failure of an external collaborator (query executor, job scheduler).
    #[error("{0}")]
    Collaborator(String),
}

impl BindError {
    /// Short kind tag used in the user-facing error text.
    pub fn kind(&self) -> &'static str {
        match self {
            BindError::InvalidArgument(_) => "InvalidArgument",
            BindError::MissingArgument => "MissingArgument",
            BindError::QueryParse(_) => "QueryParseError",
            BindError::Json(_) => "JsonError",
            BindError::Collaborator(_) => "CollaboratorError",
        }
    }
}

/// Failure while draining a composed stream.
///
/// Descriptor implementations never get swallowed: their errors travel as
/// stream items and surface out of the sink.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FlowError {
    #[error("{command}: {message}")]
    Command { command: String, message: String },
}

impl FlowError {
    pub fn command(command: impl Into<String>, message: impl Into<String>) -> Self {
        FlowError::Command { command: command.into(), message: message.into() }
    }
}

/// All evaluation failures surfaced to the caller.
///
/// The rendered messages are stable and safe to display to end users.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    QueryParse(#[from] QueryParseError),

    #[error(transparent)]
    Query(#[from] sk_query::QueryError),

    #[error("Command >{0}< is not known. typo?")]
    UnknownCommand(String),

    #[error("Command >{name}< can not be used in this position: {detail}")]
    WrongPosition { name: String, detail: PositionDetail },

    #[error("Can not combine aggregate and count!")]
    AggregateAndCount,

    #[error("{command}: can not parse: {args}: {kind}: {message}")]
    ArgParse { command: String, args: String, kind: String, message: String },

    #[error(transparent)]
    Flow(#[from] FlowError),
}

impl CliError {
    pub(crate) fn arg_parse(command: &str, args: Option<&str>, cause: &BindError) -> Self {
        CliError::ArgParse {
            command: command.to_string(),
            // A missing argument tail renders as the literal `None`.
            args: args.map_or_else(|| "None".to_string(), str::to_string),
            kind: cause.kind().to_string(),
            message: cause.to_string(),
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
