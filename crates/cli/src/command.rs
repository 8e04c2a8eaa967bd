// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The command contract: roles, argument binding and collaborator seams.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::BindError;
use crate::stream::{FlowFn, Json, JsonStream};

/// Environment passed to argument parsers: `k=v` prefixes merged over the
/// caller's and the CLI's base environment.
pub type Env = HashMap<String, Json>;

/// Media type of JSON-producing commands.
pub const MEDIA_TYPE_JSON: &str = "application/json";

/// Query-coalescing roles. Commands with these roles never execute on their
/// own; a contiguous prefix of them folds into one `execute_query` source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryRole {
    /// Unscoped filter term.
    All,
    /// Filter term scoped to the `reported` section.
    Reported,
    /// Filter term scoped to the `desired` section.
    Desired,
    /// Filter term scoped to the `metadata` section.
    Metadata,
    /// One step against edge direction.
    Predecessor,
    /// One step along edge direction.
    Successor,
    /// Unbounded traversal against edge direction.
    Ancestor,
    /// Unbounded traversal along edge direction.
    Descendant,
    Aggregate,
    MergeAncestors,
    Count,
    Head,
    Tail,
}

/// Pipeline position contract of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Produces the initial stream; only valid in the leading position.
    Source,
    /// Rewrites a stream; only valid after a source.
    Transform,
    /// Participates in query coalescing.
    Query(QueryRole),
}

impl Role {
    pub fn is_query_part(&self) -> bool {
        matches!(self, Role::Query(_))
    }
}

/// What binding an argument parser produced.
pub enum Binding {
    Source(JsonStream),
    Transform(FlowFn),
}

/// The registered contract of a command.
///
/// Descriptors are constructed once at startup and shared; `parse_args`
/// must be reentrant so concurrent evaluations can bind the same command.
#[async_trait]
pub trait CliCommand: Send + Sync {
    fn name(&self) -> &str;

    fn role(&self) -> Role;

    /// One-line description shown in listings.
    fn info(&self) -> &str;

    /// Full help text.
    fn help(&self) -> String;

    /// Media type of the produced elements.
    fn produces(&self) -> &str {
        MEDIA_TYPE_JSON
    }

    /// Internal commands are addressable by name but hidden from help.
    fn is_internal(&self) -> bool {
        false
    }

    /// Parse the raw argument tail into a stream or a stream rewriter.
    async fn parse_args(&self, arg: Option<&str>, env: &Env) -> Result<Binding, BindError>;
}

/// Executes a consolidated query string against the graph store.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(&self, query: &str, env: &Env) -> Result<JsonStream, BindError>;
}

/// Accepts job definitions for later execution.
#[async_trait]
pub trait JobScheduler: Send + Sync {
    /// Register the raw job line, returning a human-readable acknowledgement.
    async fn add_job(&self, line: &str) -> Result<String, BindError>;
}

/// External collaborators handed to command constructors.
pub struct Dependencies {
    pub query_executor: Arc<dyn QueryExecutor>,
    pub job_scheduler: Arc<dyn JobScheduler>,
}

impl Dependencies {
    pub fn new(query_executor: Arc<dyn QueryExecutor>, job_scheduler: Arc<dyn JobScheduler>) -> Self {
        Self { query_executor, job_scheduler }
    }
}
