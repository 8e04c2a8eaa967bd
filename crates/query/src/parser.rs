// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recursive-descent parser for the query sub-language.
//!
//! Accepts boolean term expressions over property paths, `is(kind)` checks,
//! traversal arrows, `sort` clauses and `limit` windows:
//!
//! ```text
//! is(volume) and reported.age > 3 -default[1:]-> all sort name desc limit 10
//! ```

use serde_json::{Number, Value as Json};
use thiserror::Error;

use crate::model::{
    AggregateFunction, AggregateValue, AggregateVariable, BoolOp, CompareOp, Direction, Limit,
    Navigation, Query, Sort, SortOrder, Term,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryParseError {
    #[error("expected {expected} at offset {offset}: >{fragment}<")]
    Expected { expected: String, offset: usize, fragment: String },

    #[error("unparsed trailing input at offset {offset}: >{fragment}<")]
    Trailing { offset: usize, fragment: String },
}

/// Parse the textual query form into a [`Query`].
///
/// An empty input yields the match-everything query.
pub fn parse_query(input: &str) -> Result<Query, QueryParseError> {
    let mut cursor = Cursor::new(input);
    cursor.skip_ws();

    let term = if cursor.at_end() || cursor.at_clause() { Term::All } else { cursor.term()? };
    let mut query = Query::by(term);

    cursor.skip_ws();
    while let Some(nav) = cursor.navigation()? {
        query.navigation.push(nav);
        cursor.skip_ws();
        // Optional `all` part separator between traversals.
        cursor.eat_keyword("all");
        cursor.skip_ws();
    }

    if cursor.eat_keyword("sort") {
        query.sort = cursor.sort_clause()?;
        cursor.skip_ws();
    }
    if cursor.eat_keyword("limit") {
        query.limit = Some(cursor.limit_clause()?);
        cursor.skip_ws();
    }
    if cursor.eat_keyword("reversed") {
        query.reversed = true;
        cursor.skip_ws();
    }

    if !cursor.at_end() {
        return Err(QueryParseError::Trailing { offset: cursor.pos, fragment: cursor.fragment() });
    }
    Ok(query)
}

/// Parse the argument of the `aggregate` command:
/// `var [as name], ... : fn(arg) [as name], ...` (the variable list is
/// optional).
pub fn parse_aggregate_args(
    input: &str,
) -> Result<(Vec<AggregateVariable>, Vec<AggregateFunction>), QueryParseError> {
    let (vars_text, funcs_text) = match split_top_level_colon(input) {
        Some((vars, funcs)) => (Some(vars), funcs),
        None => (None, input),
    };

    let group_by = match vars_text {
        Some(text) => {
            let mut cursor = Cursor::new(text);
            let vars = cursor.aggregate_variables()?;
            cursor.skip_ws();
            if !cursor.at_end() {
                return Err(QueryParseError::Trailing {
                    offset: cursor.pos,
                    fragment: cursor.fragment(),
                });
            }
            vars
        }
        None => Vec::new(),
    };

    let mut cursor = Cursor::new(funcs_text);
    let group_func = cursor.aggregate_functions()?;
    cursor.skip_ws();
    if !cursor.at_end() {
        return Err(QueryParseError::Trailing { offset: cursor.pos, fragment: cursor.fragment() });
    }
    Ok((group_by, group_func))
}

/// Find a `:` outside of quotes, parentheses and brackets.
fn split_top_level_colon(input: &str) -> Option<(&str, &str)> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (idx, ch) in input.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '(' | '[') => depth += 1,
            (None, ')' | ']') => depth = depth.saturating_sub(1),
            (None, ':') if depth == 0 => return Some((&input[..idx], &input[idx + 1..])),
            _ => {}
        }
    }
    None
}

// ── Cursor ───────────────────────────────────────────────────────────────

struct Cursor<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn fragment(&self) -> String {
        self.rest().chars().take(40).collect()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    fn error(&self, expected: &str) -> QueryParseError {
        QueryParseError::Expected {
            expected: expected.to_string(),
            offset: self.pos,
            fragment: self.fragment(),
        }
    }

    fn eat(&mut self, text: &str) -> bool {
        if self.rest().starts_with(text) {
            self.pos += text.len();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, text: &str) -> Result<(), QueryParseError> {
        if self.eat(text) {
            Ok(())
        } else {
            Err(self.error(&format!("'{text}'")))
        }
    }

    /// Peek the identifier word at the cursor, if any.
    fn peek_word(&self) -> Option<&'a str> {
        let rest = self.rest();
        let mut len = 0;
        for ch in rest.chars() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                len += ch.len_utf8();
            } else {
                break;
            }
        }
        if len == 0 {
            None
        } else {
            Some(&rest[..len])
        }
    }

    /// Consume `word` only when it stands alone (not a path prefix).
    fn eat_keyword(&mut self, word: &str) -> bool {
        if self.peek_word() == Some(word)
            && !matches!(self.rest()[word.len()..].chars().next(), Some('.' | '[' | '('))
        {
            self.pos += word.len();
            true
        } else {
            false
        }
    }

    /// True when the cursor sits on a trailing clause keyword.
    fn at_clause(&self) -> bool {
        matches!(self.peek_word(), Some("sort" | "limit" | "reversed"))
    }

    fn ident(&mut self) -> Result<&'a str, QueryParseError> {
        match self.peek_word() {
            Some(word) => {
                self.pos += word.len();
                Ok(word)
            }
            None => Err(self.error("identifier")),
        }
    }

    /// Dotted property path with optional array accessors: `a.b[*].c`.
    fn path(&mut self) -> Result<String, QueryParseError> {
        let start = self.pos;
        loop {
            self.ident()?;
            while self.rest().starts_with('[') {
                let close = self.rest().find(']').ok_or_else(|| self.error("']'"))?;
                self.pos += close + 1;
            }
            if self.rest().starts_with('.') {
                self.pos += 1;
            } else {
                break;
            }
        }
        Ok(self.input[start..self.pos].to_string())
    }

    fn number(&mut self) -> Result<Json, QueryParseError> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E'))
        {
            self.bump();
        }
        let text = &self.input[start..self.pos];
        if let Ok(int) = text.parse::<i64>() {
            return Ok(Json::from(int));
        }
        let float = text.parse::<f64>().map_err(|_| self.error("number"))?;
        match Number::from_f64(float) {
            Some(num) => Ok(Json::Number(num)),
            None => Err(self.error("finite number")),
        }
    }

    fn quoted(&mut self, quote: char) -> Result<String, QueryParseError> {
        self.bump(); // opening quote
        let mut out = String::new();
        loop {
            match self.bump() {
                Some('\\') => match self.bump() {
                    Some(next) => out.push(next),
                    None => return Err(self.error("escaped character")),
                },
                Some(ch) if ch == quote => return Ok(out),
                Some(ch) => out.push(ch),
                None => return Err(self.error("closing quote")),
            }
        }
    }

    fn value(&mut self) -> Result<Json, QueryParseError> {
        self.skip_ws();
        match self.peek() {
            Some('"') => Ok(Json::String(self.quoted('"')?)),
            Some('\'') => Ok(Json::String(self.quoted('\'')?)),
            Some('[') => {
                self.bump();
                let mut items = Vec::new();
                self.skip_ws();
                if !self.eat("]") {
                    loop {
                        items.push(self.value()?);
                        self.skip_ws();
                        if self.eat(",") {
                            continue;
                        }
                        self.expect("]")?;
                        break;
                    }
                }
                Ok(Json::Array(items))
            }
            Some(c) if c.is_ascii_digit() || c == '-' || c == '+' => self.number(),
            Some(_) => {
                if self.eat_keyword("true") {
                    return Ok(Json::Bool(true));
                }
                if self.eat_keyword("false") {
                    return Ok(Json::Bool(false));
                }
                if self.eat_keyword("null") {
                    return Ok(Json::Null);
                }
                // Bare token, taken as a string.
                if !matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '/')) {
                    return Err(self.error("value"));
                }
                let start = self.pos;
                while matches!(self.peek(), Some(c) if !c.is_whitespace() && !matches!(c, ')' | ']' | ','))
                {
                    self.bump();
                }
                Ok(Json::String(self.input[start..self.pos].to_string()))
            }
            None => Err(self.error("value")),
        }
    }

    fn compare_op(&mut self) -> Result<CompareOp, QueryParseError> {
        self.skip_ws();
        for (text, op) in [
            ("==", CompareOp::Eq),
            ("!=", CompareOp::Ne),
            ("<=", CompareOp::Le),
            (">=", CompareOp::Ge),
            ("=~", CompareOp::Like),
            ("!~", CompareOp::NotLike),
            ("<", CompareOp::Lt),
            (">", CompareOp::Gt),
        ] {
            if self.eat(text) {
                return Ok(op);
            }
        }
        if self.eat_keyword("not") {
            self.skip_ws();
            self.expect("in")?;
            return Ok(CompareOp::NotIn);
        }
        if self.eat_keyword("in") {
            return Ok(CompareOp::In);
        }
        Err(self.error("comparison operator"))
    }

    // ── Terms ────────────────────────────────────────────────────────────

    fn term(&mut self) -> Result<Term, QueryParseError> {
        self.or_term()
    }

    fn or_term(&mut self) -> Result<Term, QueryParseError> {
        let mut left = self.and_term()?;
        loop {
            self.skip_ws();
            if !self.eat_keyword("or") {
                return Ok(left);
            }
            let right = self.and_term()?;
            left = Term::Combined { op: BoolOp::Or, left: Box::new(left), right: Box::new(right) };
        }
    }

    fn and_term(&mut self) -> Result<Term, QueryParseError> {
        let mut left = self.unary_term()?;
        loop {
            self.skip_ws();
            if !self.eat_keyword("and") {
                return Ok(left);
            }
            let right = self.unary_term()?;
            left = Term::Combined { op: BoolOp::And, left: Box::new(left), right: Box::new(right) };
        }
    }

    fn unary_term(&mut self) -> Result<Term, QueryParseError> {
        self.skip_ws();
        if self.eat_keyword("not") {
            let inner = self.unary_term()?;
            return Ok(Term::Not(Box::new(inner)));
        }
        self.primary_term()
    }

    fn primary_term(&mut self) -> Result<Term, QueryParseError> {
        self.skip_ws();
        if self.eat("(") {
            let term = self.or_term()?;
            self.skip_ws();
            self.expect(")")?;
            return Ok(term);
        }
        if self.peek_word() == Some("is") && self.rest()[2..].starts_with('(') {
            self.pos += 3; // is(
            self.skip_ws();
            let kind = match self.peek() {
                Some('"') => self.quoted('"')?,
                Some('\'') => self.quoted('\'')?,
                _ => self.ident()?.to_string(),
            };
            self.skip_ws();
            self.expect(")")?;
            return Ok(Term::IsKind(kind));
        }

        let name = self.path()?;
        self.skip_ws();
        if name == "all" && !self.op_follows() {
            return Ok(Term::All);
        }
        let op = self.compare_op()?;
        let value = self.value()?;
        Ok(Term::Predicate { name, op, value })
    }

    fn op_follows(&self) -> bool {
        let rest = self.rest().trim_start();
        if rest.starts_with("<-") {
            // Traversal arrow, not a comparison.
            return false;
        }
        ["==", "!=", "<", ">", "=~", "!~", "in ", "not "].iter().any(|op| rest.starts_with(op))
    }

    // ── Navigation ───────────────────────────────────────────────────────

    fn navigation(&mut self) -> Result<Option<Navigation>, QueryParseError> {
        if self.eat("<-") {
            let (edge_type, start, until) = self.navigation_body()?;
            self.expect("-")?;
            return Ok(Some(Navigation::new(Direction::In, start, until, edge_type)));
        }
        if self.rest().starts_with('-') {
            self.pos += 1;
            let (edge_type, start, until) = self.navigation_body()?;
            self.expect("->")?;
            return Ok(Some(Navigation::new(Direction::Out, start, until, edge_type)));
        }
        Ok(None)
    }

    /// Edge name plus optional depth bounds: `default`, `delete[2]`, `default[1:]`.
    fn navigation_body(&mut self) -> Result<(String, u32, u32), QueryParseError> {
        let edge_type = self.ident()?.to_string();
        if !self.eat("[") {
            return Ok((edge_type, 1, 1));
        }
        let start = self.int()? as u32;
        if !self.eat(":") {
            self.expect("]")?;
            return Ok((edge_type, start, start));
        }
        if self.eat("]") {
            return Ok((edge_type, start, Navigation::MAX));
        }
        let until = self.int()? as u32;
        self.expect("]")?;
        Ok((edge_type, start, until))
    }

    fn int(&mut self) -> Result<u64, QueryParseError> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.bump();
        }
        self.input[start..self.pos].parse().map_err(|_| self.error("integer"))
    }

    // ── Trailing clauses ─────────────────────────────────────────────────

    fn sort_clause(&mut self) -> Result<Vec<Sort>, QueryParseError> {
        let mut sorts = Vec::new();
        loop {
            self.skip_ws();
            let name = self.path()?;
            self.skip_ws();
            let order = if self.eat_keyword("desc") {
                SortOrder::Desc
            } else {
                self.eat_keyword("asc");
                SortOrder::Asc
            };
            sorts.push(Sort { name, order });
            self.skip_ws();
            if !self.eat(",") {
                return Ok(sorts);
            }
        }
    }

    fn limit_clause(&mut self) -> Result<Limit, QueryParseError> {
        self.skip_ws();
        let first = self.int()?;
        self.skip_ws();
        if self.eat(",") {
            self.skip_ws();
            let length = self.int()?;
            Ok(Limit::new(first, length))
        } else {
            Ok(Limit::new(0, first))
        }
    }

    // ── Aggregate arguments ──────────────────────────────────────────────

    fn aggregate_variables(&mut self) -> Result<Vec<AggregateVariable>, QueryParseError> {
        let mut vars = Vec::new();
        loop {
            self.skip_ws();
            let name = self.path()?;
            self.skip_ws();
            let as_name = if self.eat_keyword("as") {
                self.skip_ws();
                Some(self.ident()?.to_string())
            } else {
                None
            };
            vars.push(AggregateVariable { name, as_name });
            self.skip_ws();
            if !self.eat(",") {
                return Ok(vars);
            }
        }
    }

    fn aggregate_functions(&mut self) -> Result<Vec<AggregateFunction>, QueryParseError> {
        let mut funcs = Vec::new();
        loop {
            self.skip_ws();
            let function = self.ident()?.to_string();
            self.expect("(")?;
            self.skip_ws();
            let arg = if matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == '-') {
                let negative = self.eat("-");
                let num = self.int()? as i64;
                AggregateValue::Int(if negative { -num } else { num })
            } else {
                AggregateValue::Path(self.path()?)
            };
            self.skip_ws();
            self.expect(")")?;
            self.skip_ws();
            let as_name = if self.eat_keyword("as") {
                self.skip_ws();
                Some(self.ident()?.to_string())
            } else {
                None
            };
            funcs.push(AggregateFunction { function, arg, as_name });
            self.skip_ws();
            if !self.eat(",") {
                return Ok(funcs);
            }
        }
    }
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
