//! Expression evaluator for predicates and dynamic field values.
//!
//! A small, explicitly scoped expression language executed by a dedicated
//! interpreter — never host-language eval. The grammar covers exactly what
//! matrix documents need:
//!
//! ```text
//! expr       := or
//! or         := and ("||" and)*
//! and        := unary ("&&" unary)*
//! unary      := "!" unary | comparison
//! comparison := primary (("==" | "!=") primary)?
//! primary    := "(" expr ")" | literal | path
//! literal    := 'string' | "string" | number | true | false | null
//! path       := ident ("." ident)*
//! ```
//!
//! Paths rooted at `config` walk the external config value; a missing
//! member yields null (the config is opaque and sparse by design). Paths
//! rooted at `this`, and bare identifiers, resolve record fields through
//! the [`Env`] seam — referencing a field the record does not carry is a
//! hard error, never a silent false.

use serde_json::Value;

use crate::error::{ExprError, ExprResult};

// =============================================================================
// Binding context
// =============================================================================

/// The binding context an expression evaluates against: the owning
/// record's fields plus the opaque external config.
///
/// `field` takes `&mut self` so implementations may resolve lazily
/// (memoizing dynamic fields on first read).
pub trait Env {
    /// Resolve a record field by name. `Ok(None)` means the record
    /// carries no such field.
    fn field(&mut self, name: &str) -> ExprResult<Option<Value>>;

    /// The external config value, bound as `config`.
    fn config(&self) -> &Value;
}

// =============================================================================
// AST
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    /// Dotted path; the first segment decides the binding root.
    Path(Vec<String>),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Eq(Box<Expr>, Box<Expr>),
    Ne(Box<Expr>, Box<Expr>),
}

// =============================================================================
// Lexer
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Ident(String),
    Str(String),
    Num(f64),
    EqEq,
    NotEq,
    AndAnd,
    OrOr,
    Not,
    Dot,
    LParen,
    RParen,
}

fn parse_error(src: &str, message: impl Into<String>, offset: usize) -> ExprError {
    ExprError::Parse {
        expr: src.to_string(),
        message: message.into(),
        offset,
    }
}

fn lex(src: &str) -> ExprResult<Vec<(Tok, usize)>> {
    let mut tokens = Vec::new();
    let mut chars = src.char_indices().peekable();

    while let Some(&(pos, ch)) = chars.peek() {
        match ch {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push((Tok::LParen, pos));
            }
            ')' => {
                chars.next();
                tokens.push((Tok::RParen, pos));
            }
            '.' => {
                chars.next();
                tokens.push((Tok::Dot, pos));
            }
            '=' => {
                chars.next();
                match chars.peek() {
                    Some(&(_, '=')) => {
                        chars.next();
                        tokens.push((Tok::EqEq, pos));
                    }
                    _ => return Err(parse_error(src, "expected '=='", pos)),
                }
            }
            '!' => {
                chars.next();
                match chars.peek() {
                    Some(&(_, '=')) => {
                        chars.next();
                        tokens.push((Tok::NotEq, pos));
                    }
                    _ => tokens.push((Tok::Not, pos)),
                }
            }
            '&' => {
                chars.next();
                match chars.peek() {
                    Some(&(_, '&')) => {
                        chars.next();
                        tokens.push((Tok::AndAnd, pos));
                    }
                    _ => return Err(parse_error(src, "expected '&&'", pos)),
                }
            }
            '|' => {
                chars.next();
                match chars.peek() {
                    Some(&(_, '|')) => {
                        chars.next();
                        tokens.push((Tok::OrOr, pos));
                    }
                    _ => return Err(parse_error(src, "expected '||'", pos)),
                }
            }
            quote @ ('\'' | '"') => {
                chars.next();
                let mut text = String::new();
                loop {
                    match chars.next() {
                        Some((_, c)) if c == quote => break,
                        Some((_, '\\')) => match chars.next() {
                            Some((_, 'n')) => text.push('\n'),
                            Some((_, 't')) => text.push('\t'),
                            Some((_, c)) => text.push(c),
                            None => {
                                return Err(parse_error(src, "unterminated string literal", pos))
                            }
                        },
                        Some((_, c)) => text.push(c),
                        None => return Err(parse_error(src, "unterminated string literal", pos)),
                    }
                }
                tokens.push((Tok::Str(text), pos));
            }
            c if c.is_ascii_digit() => {
                let mut text = String::new();
                let mut seen_dot = false;
                while let Some(&(_, c)) = chars.peek() {
                    if c.is_ascii_digit() {
                        text.push(c);
                        chars.next();
                    } else if c == '.' && !seen_dot {
                        // Lookahead: only consume the dot as a decimal point
                        // when a digit follows, so `1.x` stays an error.
                        let mut ahead = chars.clone();
                        ahead.next();
                        match ahead.peek() {
                            Some(&(_, d)) if d.is_ascii_digit() => {
                                seen_dot = true;
                                text.push(c);
                                chars.next();
                            }
                            _ => break,
                        }
                    } else {
                        break;
                    }
                }
                let number: f64 = text
                    .parse()
                    .map_err(|_| parse_error(src, format!("invalid number '{}'", text), pos))?;
                tokens.push((Tok::Num(number), pos));
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut name = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' || c == '-' {
                        name.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push((Tok::Ident(name), pos));
            }
            other => {
                return Err(parse_error(
                    src,
                    format!("unexpected character '{}'", other),
                    pos,
                ))
            }
        }
    }

    Ok(tokens)
}

// =============================================================================
// Parser
// =============================================================================

struct Parser<'a> {
    src: &'a str,
    tokens: Vec<(Tok, usize)>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|(_, o)| *o)
            .unwrap_or(self.src.len())
    }

    fn next(&mut self) -> Option<Tok> {
        let tok = self.tokens.get(self.pos).map(|(t, _)| t.clone());
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, expected: &Tok) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse_or(&mut self) -> ExprResult<Expr> {
        let mut lhs = self.parse_and()?;
        while self.eat(&Tok::OrOr) {
            let rhs = self.parse_and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> ExprResult<Expr> {
        let mut lhs = self.parse_unary()?;
        while self.eat(&Tok::AndAnd) {
            let rhs = self.parse_unary()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> ExprResult<Expr> {
        if self.eat(&Tok::Not) {
            let inner = self.parse_unary()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> ExprResult<Expr> {
        let lhs = self.parse_primary()?;
        if self.eat(&Tok::EqEq) {
            let rhs = self.parse_primary()?;
            return Ok(Expr::Eq(Box::new(lhs), Box::new(rhs)));
        }
        if self.eat(&Tok::NotEq) {
            let rhs = self.parse_primary()?;
            return Ok(Expr::Ne(Box::new(lhs), Box::new(rhs)));
        }
        Ok(lhs)
    }

    fn parse_primary(&mut self) -> ExprResult<Expr> {
        let offset = self.offset();
        match self.next() {
            Some(Tok::LParen) => {
                let inner = self.parse_or()?;
                if !self.eat(&Tok::RParen) {
                    return Err(parse_error(self.src, "expected ')'", self.offset()));
                }
                Ok(inner)
            }
            Some(Tok::Str(s)) => Ok(Expr::Literal(Value::String(s))),
            Some(Tok::Num(n)) => {
                let number = serde_json::Number::from_f64(n)
                    .ok_or_else(|| parse_error(self.src, "invalid number", offset))?;
                Ok(Expr::Literal(Value::Number(number)))
            }
            Some(Tok::Ident(name)) => self.parse_path(name, offset),
            Some(other) => Err(parse_error(
                self.src,
                format!("unexpected token {:?}", other),
                offset,
            )),
            None => Err(parse_error(self.src, "unexpected end of expression", offset)),
        }
    }

    fn parse_path(&mut self, first: String, offset: usize) -> ExprResult<Expr> {
        let mut segments = vec![first];
        while self.eat(&Tok::Dot) {
            match self.next() {
                Some(Tok::Ident(name)) => segments.push(name),
                _ => {
                    return Err(parse_error(
                        self.src,
                        "expected member name after '.'",
                        self.offset(),
                    ))
                }
            }
        }
        if segments.len() == 1 {
            match segments[0].as_str() {
                "true" => return Ok(Expr::Literal(Value::Bool(true))),
                "false" => return Ok(Expr::Literal(Value::Bool(false))),
                "null" => return Ok(Expr::Literal(Value::Null)),
                "this" => {
                    return Err(parse_error(
                        self.src,
                        "expected member access after 'this'",
                        offset,
                    ))
                }
                _ => {}
            }
        }
        Ok(Expr::Path(segments))
    }
}

/// Parse an expression string into its AST.
///
/// Empty or whitespace-only text is rejected as an invalid predicate.
pub fn parse(source: &str) -> ExprResult<Expr> {
    if source.trim().is_empty() {
        return Err(ExprError::EmptyPredicate);
    }
    let tokens = lex(source)?;
    let mut parser = Parser {
        src: source,
        tokens,
        pos: 0,
    };
    let expr = parser.parse_or()?;
    if parser.peek().is_some() {
        return Err(parse_error(source, "unexpected trailing input", parser.offset()));
    }
    Ok(expr)
}

// =============================================================================
// Evaluator
// =============================================================================

/// Parse and evaluate an expression against a binding context.
pub fn evaluate(source: &str, env: &mut dyn Env) -> ExprResult<Value> {
    let expr = parse(source)?;
    eval(&expr, source, env)
}

fn eval(expr: &Expr, source: &str, env: &mut dyn Env) -> ExprResult<Value> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Path(segments) => eval_path(segments, source, env),
        Expr::Not(inner) => {
            let value = eval(inner, source, env)?;
            Ok(Value::Bool(!truthy(&value)))
        }
        // `&&` and `||` short-circuit and yield the deciding operand, so
        // `config.channel || 'stable'` works as a dynamic default.
        Expr::And(lhs, rhs) => {
            let left = eval(lhs, source, env)?;
            if !truthy(&left) {
                Ok(left)
            } else {
                eval(rhs, source, env)
            }
        }
        Expr::Or(lhs, rhs) => {
            let left = eval(lhs, source, env)?;
            if truthy(&left) {
                Ok(left)
            } else {
                eval(rhs, source, env)
            }
        }
        Expr::Eq(lhs, rhs) => {
            let left = eval(lhs, source, env)?;
            let right = eval(rhs, source, env)?;
            Ok(Value::Bool(values_equal(&left, &right)))
        }
        Expr::Ne(lhs, rhs) => {
            let left = eval(lhs, source, env)?;
            let right = eval(rhs, source, env)?;
            Ok(Value::Bool(!values_equal(&left, &right)))
        }
    }
}

fn eval_path(segments: &[String], source: &str, env: &mut dyn Env) -> ExprResult<Value> {
    match segments[0].as_str() {
        "config" => Ok(walk(env.config().clone(), &segments[1..])),
        "this" => {
            // The parser guarantees at least one member segment.
            let name = &segments[1];
            let base = env
                .field(name)?
                .ok_or_else(|| ExprError::UnknownField {
                    name: name.clone(),
                    expr: source.to_string(),
                })?;
            Ok(walk(base, &segments[2..]))
        }
        name => {
            let base = env
                .field(name)?
                .ok_or_else(|| ExprError::UnknownField {
                    name: name.to_string(),
                    expr: source.to_string(),
                })?;
            Ok(walk(base, &segments[1..]))
        }
    }
}

/// Member access is absent-propagating: a missing member, or access on a
/// non-object, yields null rather than an error.
fn walk(mut value: Value, segments: &[String]) -> Value {
    for segment in segments {
        value = match value {
            Value::Object(mut map) => map.remove(segment.as_str()).unwrap_or(Value::Null),
            _ => Value::Null,
        };
    }
    value
}

/// Truthiness: `false`, null, `""` and `0` are falsy; everything else is
/// truthy.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Same-type value equality; numbers compare by value, cross-type
/// comparisons are unequal.
pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => left == right,
    }
}
