// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use futures::stream::{self, StreamExt};
use serde_json::json;

use super::*;
use crate::error::FlowError;

#[tokio::test]
async fn just_emits_one_value() {
    let values = collect(just(json!(1))).await.unwrap();
    assert_eq!(values, vec![json!(1)]);
}

#[tokio::test]
async fn iterate_emits_in_order() {
    let values = collect(iterate(vec![json!(1), json!(2), json!(3)])).await.unwrap();
    assert_eq!(values, vec![json!(1), json!(2), json!(3)]);
}

#[tokio::test]
async fn empty_emits_nothing() {
    assert!(collect(empty()).await.unwrap().is_empty());
}

#[tokio::test]
async fn collect_stops_at_first_error() {
    let err = FlowError::command("test", "boom");
    let stream: JsonStream =
        stream::iter(vec![Ok(json!(1)), Err(err.clone()), Ok(json!(2))]).boxed();
    assert_eq!(collect(stream).await, Err(err));
}
