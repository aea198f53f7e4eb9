//! Scenario markers and `-m` selection expressions.
//!
//! Grammar, loosest binding first:
//!
//! ```text
//! expr    := and ("or" and)*
//! and     := unary ("and" unary)*
//! unary   := "not" unary | primary
//! primary := MARKER | "(" expr ")"
//! ```

use crate::result::{KinoError, KinoResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Tag attached to a scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Marker {
    /// HTTP API checks
    Api,
    /// Browser checks
    Ui,
    /// Fast, run on every build
    Smoke,
    /// Full regression pass
    Regression,
}

impl Marker {
    /// Every marker
    pub const ALL: [Self; 4] = [Self::Api, Self::Ui, Self::Smoke, Self::Regression];

    /// Name used on the command line
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Api => "api",
            Self::Ui => "ui",
            Self::Smoke => "smoke",
            Self::Regression => "regression",
        }
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Marker {
    type Err = KinoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| {
                KinoError::precondition(format!(
                    "unknown marker '{s}' (expected one of: api, ui, smoke, regression)"
                ))
            })
    }
}

/// Parsed selection expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerExpr {
    /// Scenario carries this marker
    Has(Marker),
    /// Negation
    Not(Box<MarkerExpr>),
    /// Both sides hold
    And(Box<MarkerExpr>, Box<MarkerExpr>),
    /// Either side holds
    Or(Box<MarkerExpr>, Box<MarkerExpr>),
}

impl MarkerExpr {
    /// Parse an expression such as `api and not regression`
    pub fn parse(input: &str) -> KinoResult<Self> {
        let tokens = tokenize(input)?;
        if tokens.is_empty() {
            return Err(KinoError::precondition("empty marker expression"));
        }
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.or()?;
        if let Some(token) = parser.peek() {
            return Err(KinoError::precondition(format!(
                "unexpected '{token}' in marker expression"
            )));
        }
        Ok(expr)
    }

    /// Evaluate against a scenario's markers
    #[must_use]
    pub fn matches(&self, markers: &[Marker]) -> bool {
        match self {
            Self::Has(marker) => markers.contains(marker),
            Self::Not(inner) => !inner.matches(markers),
            Self::And(lhs, rhs) => lhs.matches(markers) && rhs.matches(markers),
            Self::Or(lhs, rhs) => lhs.matches(markers) || rhs.matches(markers),
        }
    }
}

impl FromStr for MarkerExpr {
    type Err = KinoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for MarkerExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Has(marker) => write!(f, "{marker}"),
            Self::Not(inner) => write!(f, "not {inner}"),
            Self::And(lhs, rhs) => write!(f, "({lhs} and {rhs})"),
            Self::Or(lhs, rhs) => write!(f, "({lhs} or {rhs})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Marker(Marker),
    Not,
    And,
    Or,
    Open,
    Close,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Marker(m) => write!(f, "{m}"),
            Self::Not => f.write_str("not"),
            Self::And => f.write_str("and"),
            Self::Or => f.write_str("or"),
            Self::Open => f.write_str("("),
            Self::Close => f.write_str(")"),
        }
    }
}

fn tokenize(input: &str) -> KinoResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::Open);
            }
            ')' => {
                chars.next();
                tokens.push(Token::Close);
            }
            _ => {
                let mut word = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() || c == '(' || c == ')' {
                        break;
                    }
                    word.push(c);
                    chars.next();
                }
                tokens.push(match word.as_str() {
                    "not" => Token::Not,
                    "and" => Token::And,
                    "or" => Token::Or,
                    other => Token::Marker(other.parse()?),
                });
            }
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn or(&mut self) -> KinoResult<MarkerExpr> {
        let mut lhs = self.and()?;
        while self.eat(&Token::Or) {
            lhs = MarkerExpr::Or(Box::new(lhs), Box::new(self.and()?));
        }
        Ok(lhs)
    }

    fn and(&mut self) -> KinoResult<MarkerExpr> {
        let mut lhs = self.unary()?;
        while self.eat(&Token::And) {
            lhs = MarkerExpr::And(Box::new(lhs), Box::new(self.unary()?));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> KinoResult<MarkerExpr> {
        if self.eat(&Token::Not) {
            return Ok(MarkerExpr::Not(Box::new(self.unary()?)));
        }
        self.primary()
    }

    fn primary(&mut self) -> KinoResult<MarkerExpr> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        match token {
            Some(Token::Marker(marker)) => Ok(MarkerExpr::Has(marker)),
            Some(Token::Open) => {
                let inner = self.or()?;
                if self.eat(&Token::Close) {
                    Ok(inner)
                } else {
                    Err(KinoError::precondition("unclosed '(' in marker expression"))
                }
            }
            Some(other) => Err(KinoError::precondition(format!(
                "unexpected '{other}' in marker expression"
            ))),
            None => Err(KinoError::precondition(
                "marker expression ends unexpectedly",
            )),
        }
    }
}
