// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command-line evaluation core of the graph server.
//!
//! A free-form input line is parsed into statements of pipe-separated
//! commands, a leading run of query commands is folded into one consolidated
//! graph query, the pipeline is validated position by position, and the
//! result is an executable async stream flowing from a source command
//! through transforming commands into a caller-provided sink.

mod cli;
mod coalesce;
mod command;
mod commands;
mod error;
mod line;
mod placeholder;
mod registry;
mod stream;

pub use cli::{BoundCommand, Cli, ParsedCommandLine};
pub use command::{
    Binding, CliCommand, Dependencies, Env, JobScheduler, QueryExecutor, QueryRole, Role,
};
pub use commands::{aliases, all_commands};
pub use error::{BindError, CliError, FlowError, ParseError, PositionDetail};
pub use line::{parse_command_lines, ParsedCommand, ParsedStatement};
pub use placeholder::{replacements, substitute};
pub use registry::Registry;
pub use stream::{collect, FlowFn, Json, JsonStream};
