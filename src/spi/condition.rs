//! A small expression language for `condition` activations.
//!
//! ```text
//! ${env.CI} == "true" && inrange(${java.version}, "[17,)")
//! exists("${project.basedir}/src/main/native") || !${skip.native}
//! ```
//!
//! Operands are `${name}` references, string and number literals and `true` /
//! `false`. Ordering comparisons use version ordering, so `"1.10" > "1.9"` holds.
//! `&&` and `||` short-circuit; a lookup that is never reached is never recorded.

use std::cmp::Ordering;
use std::path::Path;

use super::ConditionEvaluator;
use super::interpolation::expand_placeholders;
use crate::activation::ActivationContext;
use crate::core::PomrError;
use crate::version::{Version, VersionRange};

/// Default [`ConditionEvaluator`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicConditionEvaluator;

impl ConditionEvaluator for BasicConditionEvaluator {
    fn evaluate(&self, condition: &str, ctx: &mut ActivationContext) -> Result<bool, PomrError> {
        let invalid = |reason: String| PomrError::InvalidCondition {
            condition: condition.to_string(),
            reason,
        };
        let tokens = tokenize(condition).map_err(invalid)?;
        let mut parser = Parser {
            tokens,
            pos: 0,
        };
        let expr = parser.parse_or().map_err(invalid)?;
        if let Some(token) = parser.peek() {
            return Err(invalid(format!("unexpected {token:?}")));
        }
        Ok(eval(&expr, ctx).map_err(invalid)?.truthy())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Property(String),
    Str(String),
    Number(String),
    Ident(String),
    Op(&'static str),
    Not,
    And,
    Or,
    LParen,
    RParen,
    Comma,
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        match c {
            c if c.is_whitespace() => i += 1,
            '$' if next == Some('{') => {
                let start = i + 2;
                let end = (start..chars.len())
                    .find(|&j| chars[j] == '}')
                    .ok_or_else(|| "unterminated property reference".to_string())?;
                tokens.push(Token::Property(chars[start..end].iter().collect::<String>().trim().to_string()));
                i = end + 1;
            }
            '"' | '\'' => {
                let start = i + 1;
                let end = (start..chars.len())
                    .find(|&j| chars[j] == c)
                    .ok_or_else(|| "unterminated string literal".to_string())?;
                tokens.push(Token::Str(chars[start..end].iter().collect()));
                i = end + 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '&' if next == Some('&') => {
                tokens.push(Token::And);
                i += 2;
            }
            '|' if next == Some('|') => {
                tokens.push(Token::Or);
                i += 2;
            }
            '=' if next == Some('=') => {
                tokens.push(Token::Op("=="));
                i += 2;
            }
            '!' if next == Some('=') => {
                tokens.push(Token::Op("!="));
                i += 2;
            }
            '<' | '>' => {
                let op = match (c, next) {
                    ('<', Some('=')) => "<=",
                    ('>', Some('=')) => ">=",
                    ('<', _) => "<",
                    _ => ">",
                };
                tokens.push(Token::Op(op));
                i += op.len();
            }
            '!' => {
                tokens.push(Token::Not);
                i += 1;
            }
            c if c.is_ascii_digit() => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || matches!(chars[i], '.' | '-')) {
                    i += 1;
                }
                tokens.push(Token::Number(chars[start..i].iter().collect()));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => return Err(format!("unexpected character '{other}'")),
        }
    }
    Ok(tokens)
}

#[derive(Debug)]
enum Expr {
    Literal(Value),
    Text(String),
    Property(String),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Compare(&'static str, Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn expect(&mut self, expected: &Token) -> Result<(), String> {
        match self.next() {
            Some(token) if &token == expected => Ok(()),
            Some(token) => Err(format!("expected {expected:?}, found {token:?}")),
            None => Err(format!("expected {expected:?} at end of condition")),
        }
    }

    fn parse_or(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            left = Expr::Or(Box::new(left), Box::new(self.parse_and()?));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_unary()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            left = Expr::And(Box::new(left), Box::new(self.parse_unary()?));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, String> {
        if self.peek() == Some(&Token::Not) {
            self.pos += 1;
            return Ok(Expr::Not(Box::new(self.parse_unary()?)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, String> {
        let left = self.parse_primary()?;
        if let Some(Token::Op(op)) = self.peek() {
            let op = *op;
            self.pos += 1;
            let right = self.parse_primary()?;
            return Ok(Expr::Compare(op, Box::new(left), Box::new(right)));
        }
        Ok(left)
    }

    fn parse_primary(&mut self) -> Result<Expr, String> {
        match self.next() {
            Some(Token::Property(name)) => Ok(Expr::Property(name)),
            Some(Token::Str(text)) => Ok(Expr::Text(text)),
            Some(Token::Number(number)) => Ok(Expr::Literal(Value::Str(number))),
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Ident(ident)) => match ident.as_str() {
                "true" => Ok(Expr::Literal(Value::Bool(true))),
                "false" => Ok(Expr::Literal(Value::Bool(false))),
                _ => {
                    self.expect(&Token::LParen)?;
                    let mut args = Vec::new();
                    if self.peek() != Some(&Token::RParen) {
                        args.push(self.parse_or()?);
                        while self.peek() == Some(&Token::Comma) {
                            self.pos += 1;
                            args.push(self.parse_or()?);
                        }
                    }
                    self.expect(&Token::RParen)?;
                    Ok(Expr::Call(ident, args))
                }
            },
            Some(token) => Err(format!("unexpected {token:?}")),
            None => Err("unexpected end of condition".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Value {
    Null,
    Bool(bool),
    Str(String),
}

impl Value {
    fn truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Str(s) => !s.is_empty() && s != "false",
        }
    }

    fn text(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Bool(b) => Some(b.to_string()),
            Value::Str(s) => Some(s.clone()),
        }
    }
}

fn is_model_field(name: &str) -> bool {
    matches!(name, "basedir" | "packaging") || name.starts_with("project.")
}

fn resolve(name: &str, ctx: &mut ActivationContext) -> Option<String> {
    if is_model_field(name) {
        ctx.model_field(name)
    } else {
        ctx.property(name)
    }
}

fn resolve_path(path: &str, ctx: &mut ActivationContext) -> String {
    if Path::new(path).is_absolute() {
        return path.to_string();
    }
    match ctx.model_field("project.basedir") {
        Some(basedir) => Path::new(&basedir).join(path).to_string_lossy().into_owned(),
        None => path.to_string(),
    }
}

fn single_arg<'a>(name: &str, args: &'a [Expr]) -> Result<&'a Expr, String> {
    match args {
        [arg] => Ok(arg),
        _ => Err(format!("{name}() takes exactly one argument, got {}", args.len())),
    }
}

fn eval(expr: &Expr, ctx: &mut ActivationContext) -> Result<Value, String> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Text(text) => Ok(Value::Str(expand_placeholders(text, &mut |name| resolve(name, ctx)))),
        Expr::Property(name) => Ok(resolve(name, ctx).map_or(Value::Null, Value::Str)),
        Expr::Not(inner) => Ok(Value::Bool(!eval(inner, ctx)?.truthy())),
        Expr::And(left, right) => {
            if !eval(left, ctx)?.truthy() {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(eval(right, ctx)?.truthy()))
        }
        Expr::Or(left, right) => {
            if eval(left, ctx)?.truthy() {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(eval(right, ctx)?.truthy()))
        }
        Expr::Compare(op, left, right) => {
            let left = eval(left, ctx)?.text();
            let right = eval(right, ctx)?.text();
            let result = match (*op, left, right) {
                ("==", l, r) => l == r,
                ("!=", l, r) => l != r,
                (op, Some(l), Some(r)) => {
                    let ordering = Version::parse(&l).cmp(&Version::parse(&r));
                    match op {
                        "<" => ordering == Ordering::Less,
                        "<=" => ordering != Ordering::Greater,
                        ">" => ordering == Ordering::Greater,
                        _ => ordering != Ordering::Less,
                    }
                }
                _ => false,
            };
            Ok(Value::Bool(result))
        }
        Expr::Call(name, args) => match name.as_str() {
            "not" => Ok(Value::Bool(!eval(single_arg(name, args)?, ctx)?.truthy())),
            "exists" | "missing" => {
                let Some(path) = eval(single_arg(name, args)?, ctx)?.text() else {
                    return Err(format!("{name}() requires a path"));
                };
                let path = resolve_path(&path, ctx);
                let exists = ctx.exists(&path);
                Ok(Value::Bool(if name == "exists" { exists } else { !exists }))
            }
            "inrange" => {
                let [version, range] = args.as_slice() else {
                    return Err(format!("inrange() takes two arguments, got {}", args.len()));
                };
                let Some(version) = eval(version, ctx)?.text() else {
                    return Ok(Value::Bool(false));
                };
                let Some(range) = eval(range, ctx)?.text() else {
                    return Err("inrange() requires a range".to_string());
                };
                let range = VersionRange::parse(&range).map_err(|e| e.to_string())?;
                Ok(Value::Bool(range.contains(&Version::parse(&version))))
            }
            other => Err(format!("unknown function '{other}'")),
        },
    }
}
