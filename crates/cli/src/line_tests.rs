// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde_json::json;

use super::*;

fn parse(input: &str) -> Vec<ParsedStatement> {
    parse_command_lines(input).unwrap()
}

/// Render a statement back to `name args` strings for compact assertions.
fn rendered(input: &str) -> Vec<Vec<String>> {
    parse(input)
        .iter()
        .map(|statement| {
            statement
                .commands
                .iter()
                .map(|c| match &c.args {
                    Some(args) => format!("{} {args}", c.name),
                    None => c.name.clone(),
                })
                .collect()
        })
        .collect()
}

#[test]
fn single_command() {
    assert_eq!(rendered("test"), vec![vec!["test".to_string()]]);
}

#[test]
fn pipes_with_extra_whitespace() {
    assert_eq!(rendered("test | bla |  bar"), vec![vec!["test", "bla", "bar"]
        .into_iter()
        .map(String::from)
        .collect::<Vec<_>>()]);
}

#[test]
fn args_tail_is_preserved_verbatim() {
    assert_eq!(
        rendered("search is(foo) and bla.test==\"foo\""),
        vec![vec!["search is(foo) and bla.test==\"foo\"".to_string()]]
    );
    assert_eq!(
        rendered("a 1 | b \"s\" | c 1.23 | d"),
        vec![vec!["a 1".to_string(), "b \"s\"".to_string(), "c 1.23".to_string(), "d".to_string()]]
    );
}

#[test]
fn quoted_pipe_is_not_a_separator() {
    assert_eq!(
        rendered("jq \". | {a:.foo, b: .bla}\" "),
        vec![vec!["jq \". | {a:.foo, b: .bla}\"".to_string()]]
    );
}

#[test]
fn statements_and_pipes() {
    assert_eq!(
        rendered("a|b|c;d|e|f;g|e|h"),
        vec![
            vec!["a".to_string(), "b".to_string(), "c".to_string()],
            vec!["d".to_string(), "e".to_string(), "f".to_string()],
            vec!["g".to_string(), "e".to_string(), "h".to_string()],
        ]
    );
}

#[test]
fn single_quotes_hide_pipes_and_double_quotes() {
    assert_eq!(
        rendered("add_job 'what \" test | foo | bla'"),
        vec![vec!["add_job 'what \" test | foo | bla'".to_string()]]
    );
}

#[test]
fn backslash_escapes_separators() {
    assert_eq!(
        rendered("add_job what \\\" test \\| foo \\| bla"),
        vec![vec!["add_job what \" test | foo | bla".to_string()]]
    );
}

#[test]
fn trailing_semicolon_is_skipped() {
    assert_eq!(rendered("test;").len(), 1);
    assert_eq!(rendered(";;").len(), 0);
}

#[test]
fn empty_command_between_pipes_is_an_error() {
    assert!(matches!(
        parse_command_lines("a | | b"),
        Err(ParseError::Expected { .. })
    ));
}

#[test]
fn unterminated_quote_is_an_error() {
    assert!(matches!(
        parse_command_lines("echo 'unclosed"),
        Err(ParseError::UnterminatedQuote { .. })
    ));
}

#[test]
fn env_prefix_scalars() {
    let statements = parse("test=foo bla=\"bar\"   d=true env");
    assert_eq!(statements.len(), 1);
    let statement = &statements[0];
    assert_eq!(statement.commands, vec![ParsedCommand::new("env", None)]);
    assert_eq!(statement.env.get("test"), Some(&json!("foo")));
    assert_eq!(statement.env.get("bla"), Some(&json!("bar")));
    assert_eq!(statement.env.get("d"), Some(&json!(true)));
}

#[yare::parameterized(
    integer   = { "n=42",      json!(42) },
    float     = { "n=1.5",     json!(1.5) },
    negative  = { "n=-3",      json!(-3) },
    boolean   = { "n=false",   json!(false) },
    bare      = { "n=foo",     json!("foo") },
    quoted    = { "n='a b'",   json!("a b") },
)]
fn env_scalar_forms(prefix: &str, expected: serde_json::Value) {
    let statements = parse(&format!("{prefix} env"));
    assert_eq!(statements[0].env.get("n"), Some(&expected));
}

#[test]
fn env_applies_to_first_statement_only() {
    let statements = parse("a=1 env; env");
    assert_eq!(statements[0].env.get("a"), Some(&json!(1)));
    assert!(statements[1].env.is_empty());
}

#[test]
fn env_prefix_stops_at_first_non_assignment() {
    let statements = parse("a=1 echo b=2");
    assert_eq!(statements[0].env.len(), 1);
    let command = &statements[0].commands[0];
    assert_eq!(command.name, "echo");
    assert_eq!(command.args.as_deref(), Some("b=2"));
}

#[test]
fn args_of_later_commands_keep_assignments() {
    let statements = parse("echo x | foo k=v");
    let command = &statements[0].commands[1];
    assert_eq!(command.name, "foo");
    assert_eq!(command.args.as_deref(), Some("k=v"));
}
