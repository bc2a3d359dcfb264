//! Attribute filter expressions
//!
//! A restricted WHERE dialect for in-memory layers: comparisons between
//! fields and literals, `AND`/`OR`/`NOT`, parentheses, and the special
//! field `OGR_GEOM_AREA` which evaluates to the feature's polygonal
//! area. Parse failures are fatal; a filter that does not parse never
//! silently matches everything.

use crate::error::{Error, Result};
use crate::vector::{polygonal_area, AttributeValue, Feature};

/// One term of a comparison: a field reference or a literal.
#[derive(Debug, Clone, PartialEq)]
enum Operand {
    Field(String),
    GeomArea,
    Number(f64),
    Str(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Cmp(Operand, CmpOp, Operand),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
}

/// A parsed, reusable attribute filter.
#[derive(Debug, Clone)]
pub struct CompiledFilter {
    expr: Expr,
    source: String,
}

impl CompiledFilter {
    /// Parse a filter expression.
    pub fn parse(input: &str) -> Result<Self> {
        let tokens = tokenize(input).map_err(|reason| Error::InvalidFilter {
            expression: input.to_string(),
            reason,
        })?;
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.or_expr().map_err(|reason| Error::InvalidFilter {
            expression: input.to_string(),
            reason,
        })?;
        if parser.pos != parser.tokens.len() {
            return Err(Error::InvalidFilter {
                expression: input.to_string(),
                reason: format!("unexpected trailing input at token {}", parser.pos + 1),
            });
        }
        Ok(Self {
            expr,
            source: input.to_string(),
        })
    }

    /// The original expression text.
    pub fn expression(&self) -> &str {
        &self.source
    }

    /// Evaluate the filter against a feature.
    pub fn matches(&self, feature: &Feature) -> bool {
        eval(&self.expr, feature)
    }
}

// ── Lexer ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    QuotedIdent(String),
    Number(f64),
    Str(String),
    Op(CmpOp),
    LParen,
    RParen,
    And,
    Or,
    Not,
}

fn tokenize(input: &str) -> std::result::Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let bytes = input.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i] as char;
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '<' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push(Token::Op(CmpOp::Le));
                    i += 2;
                } else if bytes.get(i + 1) == Some(&b'>') {
                    tokens.push(Token::Op(CmpOp::Ne));
                    i += 2;
                } else {
                    tokens.push(Token::Op(CmpOp::Lt));
                    i += 1;
                }
            }
            '>' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push(Token::Op(CmpOp::Ge));
                    i += 2;
                } else {
                    tokens.push(Token::Op(CmpOp::Gt));
                    i += 1;
                }
            }
            '=' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    i += 2;
                } else {
                    i += 1;
                }
                tokens.push(Token::Op(CmpOp::Eq));
            }
            '!' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push(Token::Op(CmpOp::Ne));
                    i += 2;
                } else {
                    return Err("'!' must be followed by '='".to_string());
                }
            }
            '\'' => {
                // Single-quoted string literal with '' as escape
                let mut buf: Vec<u8> = Vec::new();
                i += 1;
                loop {
                    match bytes.get(i) {
                        None => return Err("unterminated string literal".to_string()),
                        Some(&b'\'') => {
                            if bytes.get(i + 1) == Some(&b'\'') {
                                buf.push(b'\'');
                                i += 2;
                            } else {
                                i += 1;
                                break;
                            }
                        }
                        Some(&b) => {
                            buf.push(b);
                            i += 1;
                        }
                    }
                }
                let s = String::from_utf8(buf)
                    .map_err(|_| "invalid UTF-8 in string literal".to_string())?;
                tokens.push(Token::Str(s));
            }
            '"' => {
                let start = i + 1;
                let mut j = start;
                while j < bytes.len() && bytes[j] != b'"' {
                    j += 1;
                }
                if j == bytes.len() {
                    return Err("unterminated quoted identifier".to_string());
                }
                tokens.push(Token::QuotedIdent(input[start..j].to_string()));
                i = j + 1;
            }
            '0'..='9' | '.' => {
                let start = i;
                while i < bytes.len()
                    && (bytes[i].is_ascii_digit()
                        || bytes[i] == b'.'
                        || bytes[i] == b'e'
                        || bytes[i] == b'E'
                        || ((bytes[i] == b'+' || bytes[i] == b'-')
                            && i > start
                            && (bytes[i - 1] == b'e' || bytes[i - 1] == b'E')))
                {
                    i += 1;
                }
                let text = &input[start..i];
                let value: f64 = text
                    .parse()
                    .map_err(|_| format!("invalid number literal '{}'", text))?;
                tokens.push(Token::Number(value));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < bytes.len()
                    && ((bytes[i] as char).is_ascii_alphanumeric() || bytes[i] == b'_')
                {
                    i += 1;
                }
                let word = &input[start..i];
                match word.to_ascii_uppercase().as_str() {
                    "AND" => tokens.push(Token::And),
                    "OR" => tokens.push(Token::Or),
                    "NOT" => tokens.push(Token::Not),
                    _ => tokens.push(Token::Ident(word.to_string())),
                }
            }
            other => return Err(format!("unexpected character '{}'", other)),
        }
    }

    Ok(tokens)
}

// ── Parser ──────────────────────────────────────────────────────────────

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn or_expr(&mut self) -> std::result::Result<Expr, String> {
        let mut left = self.and_expr()?;
        while matches!(self.peek(), Some(Token::Or)) {
            self.next();
            let right = self.and_expr()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> std::result::Result<Expr, String> {
        let mut left = self.not_expr()?;
        while matches!(self.peek(), Some(Token::And)) {
            self.next();
            let right = self.not_expr()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn not_expr(&mut self) -> std::result::Result<Expr, String> {
        if matches!(self.peek(), Some(Token::Not)) {
            self.next();
            let inner = self.not_expr()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.primary()
    }

    fn primary(&mut self) -> std::result::Result<Expr, String> {
        if matches!(self.peek(), Some(Token::LParen)) {
            self.next();
            let inner = self.or_expr()?;
            match self.next() {
                Some(Token::RParen) => Ok(inner),
                _ => Err("expected ')'".to_string()),
            }
        } else {
            self.comparison()
        }
    }

    fn comparison(&mut self) -> std::result::Result<Expr, String> {
        let left = self.operand()?;
        let op = match self.next() {
            Some(Token::Op(op)) => op,
            other => return Err(format!("expected comparison operator, found {:?}", other)),
        };
        let right = self.operand()?;
        Ok(Expr::Cmp(left, op, right))
    }

    fn operand(&mut self) -> std::result::Result<Operand, String> {
        match self.next() {
            Some(Token::Ident(name)) => {
                if name == "OGR_GEOM_AREA" {
                    Ok(Operand::GeomArea)
                } else {
                    Ok(Operand::Field(name))
                }
            }
            Some(Token::QuotedIdent(name)) => Ok(Operand::Field(name)),
            Some(Token::Number(n)) => Ok(Operand::Number(n)),
            Some(Token::Str(s)) => Ok(Operand::Str(s)),
            other => Err(format!("expected field or literal, found {:?}", other)),
        }
    }
}

// ── Evaluation ──────────────────────────────────────────────────────────

enum Value<'a> {
    Null,
    Num(f64),
    Str(&'a str),
}

fn operand_value<'a>(op: &'a Operand, feature: &'a Feature) -> Value<'a> {
    match op {
        Operand::Number(n) => Value::Num(*n),
        Operand::Str(s) => Value::Str(s),
        Operand::GeomArea => Value::Num(
            feature
                .geometry
                .as_ref()
                .map(polygonal_area)
                .unwrap_or(0.0),
        ),
        Operand::Field(name) => match feature.get_property(name) {
            None | Some(AttributeValue::Null) => Value::Null,
            Some(AttributeValue::Bool(b)) => Value::Num(if *b { 1.0 } else { 0.0 }),
            Some(AttributeValue::Int(i)) => Value::Num(*i as f64),
            Some(AttributeValue::Float(f)) => Value::Num(*f),
            Some(AttributeValue::String(s)) => Value::Str(s),
        },
    }
}

fn compare(left: &Value<'_>, op: CmpOp, right: &Value<'_>) -> bool {
    let ordering = match (left, right) {
        (Value::Num(a), Value::Num(b)) => match a.partial_cmp(b) {
            Some(o) => o,
            None => return false,
        },
        (Value::Str(a), Value::Str(b)) => a.cmp(b),
        // NULL or type-mismatched comparisons never match
        _ => return false,
    };
    match op {
        CmpOp::Eq => ordering.is_eq(),
        CmpOp::Ne => !ordering.is_eq(),
        CmpOp::Lt => ordering.is_lt(),
        CmpOp::Le => ordering.is_le(),
        CmpOp::Gt => ordering.is_gt(),
        CmpOp::Ge => ordering.is_ge(),
    }
}

fn eval(expr: &Expr, feature: &Feature) -> bool {
    match expr {
        Expr::Cmp(left, op, right) => compare(
            &operand_value(left, feature),
            *op,
            &operand_value(right, feature),
        ),
        Expr::And(a, b) => eval(a, feature) && eval(b, feature),
        Expr::Or(a, b) => eval(a, feature) || eval(b, feature),
        Expr::Not(inner) => !eval(inner, feature),
    }
}

// ── Driver dialect rewriting ────────────────────────────────────────────

/// Drivers whose attribute filter is handed to an SQL engine that does
/// not know the `OGR_GEOM_AREA` special field.
const SQL_BACKED_DRIVERS: &[&str] = &["SQLite", "GPKG"];

/// Rewrite the `OGR_GEOM_AREA` token to `ST_Area("<geometry column>")`
/// for SQL-backed drivers. The substitution is textual but bounded to
/// the exact token: identifier characters on either side, or a position
/// inside a string literal, suppress it. Other drivers get the
/// expression back unchanged.
pub fn rewrite_geom_area(expression: &str, driver: &str, geometry_column: &str) -> String {
    const TOKEN: &str = "OGR_GEOM_AREA";

    if !SQL_BACKED_DRIVERS.contains(&driver) {
        return expression.to_string();
    }

    let mut out = String::with_capacity(expression.len());
    let mut rest = expression;
    let mut in_string = false;
    let mut prev: Option<char> = None;

    while let Some(c) = rest.chars().next() {
        if c == '\'' {
            in_string = !in_string;
        } else if !in_string && rest.starts_with(TOKEN) {
            let before_ok = prev.map_or(true, |p| !(p.is_ascii_alphanumeric() || p == '_'));
            let after = &rest[TOKEN.len()..];
            let after_ok = after
                .chars()
                .next()
                .map_or(true, |n| !(n.is_ascii_alphanumeric() || n == '_'));
            if before_ok && after_ok {
                out.push_str(&format!("ST_Area(\"{}\")", geometry_column));
                prev = Some(')');
                rest = after;
                continue;
            }
        }
        out.push(c);
        prev = Some(c);
        rest = &rest[c.len_utf8()..];
    }

    out
}
