// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stream aliases and helpers for command pipelines.

use futures::future;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};

use crate::error::FlowError;

/// The element type flowing through every pipeline.
pub type Json = serde_json::Value;

/// A one-shot async sequence of JSON values.
///
/// Sources may be cold or hot, finite or infinite; dropping the stream
/// cancels the whole pipeline.
pub type JsonStream = BoxStream<'static, Result<Json, FlowError>>;

/// A stream-to-stream rewriter contributed by a transform command.
pub type FlowFn = Box<dyn FnOnce(JsonStream) -> JsonStream + Send>;

/// A stream producing exactly one value.
pub fn just(value: Json) -> JsonStream {
    stream::once(future::ready(Ok(value))).boxed()
}

/// A stream over an in-memory sequence of values.
pub fn iterate<I>(values: I) -> JsonStream
where
    I: IntoIterator<Item = Json>,
    I::IntoIter: Send + 'static,
{
    stream::iter(values.into_iter().map(Ok)).boxed()
}

/// An empty stream.
pub fn empty() -> JsonStream {
    stream::empty().boxed()
}

/// Sink draining a stream into a vector, stopping at the first error.
pub async fn collect(stream: JsonStream) -> Result<Vec<Json>, FlowError> {
    stream.try_collect().await
}

#[cfg(test)]
#[path = "stream_tests.rs"]
mod tests;
