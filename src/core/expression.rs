//! Arithmetic expressions over named bands
//!
//! Formulas such as `"(NIR - Red) / (NIR + Red)"` are parsed into an
//! operator tree and evaluated elementwise over band arrays. Only `+ - * /`,
//! unary sign, parentheses, numeric literals and band symbols are accepted.

use crate::types::{BandImage, SdrlError, SdrlResult, Window};
use regex::Regex;
use std::collections::{BTreeSet, HashMap};
use std::sync::OnceLock;

/// Default stabilizer added to every band value before evaluation
pub const DEFAULT_EPSILON: f32 = 1e-12;

/// Numeric literals and band symbols, with the tokenizer's grammar
fn lexeme_pattern() -> &'static Regex {
    static LEXEME: OnceLock<Regex> = OnceLock::new();
    LEXEME.get_or_init(|| {
        Regex::new(r"(?:[0-9]+\.?[0-9]*|\.[0-9]+)(?:[eE][+-]?[0-9]+)?|[\p{Alphabetic}_][\p{Alphabetic}\p{N}_]*")
            .expect("valid lexeme pattern")
    })
}

/// Band symbols referenced by `expression`, numeric literals excluded
pub fn required_symbols(expression: &str) -> BTreeSet<String> {
    lexeme_pattern()
        .find_iter(expression)
        .map(|m| m.as_str())
        .filter(|token| !token.starts_with(|c: char| c.is_ascii_digit() || c == '.'))
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Symbol(String),
    Op(char),
    LParen,
    RParen,
}

fn tokenize(expression: &str) -> SdrlResult<Vec<Token>> {
    let chars: Vec<char> = expression.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            c if c.is_whitespace() => i += 1,
            '+' | '-' | '*' | '/' => {
                tokens.push(Token::Op(chars[i]));
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                // exponent: e or E, optional sign, at least one digit
                if i < chars.len() && matches!(chars[i], 'e' | 'E') {
                    let mut j = i + 1;
                    if j < chars.len() && matches!(chars[j], '+' | '-') {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].is_ascii_digit() {
                        while j < chars.len() && chars[j].is_ascii_digit() {
                            j += 1;
                        }
                        i = j;
                    }
                }
                let literal: String = chars[start..i].iter().collect();
                let number = literal.parse::<f64>().map_err(|_| {
                    SdrlError::InvalidExpression(format!("invalid number '{}'", literal))
                })?;
                tokens.push(Token::Number(number));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Symbol(chars[start..i].iter().collect()));
            }
            c => {
                return Err(SdrlError::InvalidExpression(format!(
                    "unexpected character '{}' in '{}'",
                    c, expression
                )));
            }
        }
    }

    Ok(tokens)
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Number(f64),
    Symbol(String),
    Neg(Box<Node>),
    Binary {
        op: char,
        left: Box<Node>,
        right: Box<Node>,
    },
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// expr = term (('+' | '-') term)*
    fn parse_expr(&mut self) -> SdrlResult<Node> {
        let mut left = self.parse_term()?;
        while let Some(Token::Op(op @ ('+' | '-'))) = self.peek() {
            let op = *op;
            self.advance();
            let right = self.parse_term()?;
            left = Node::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    /// term = factor (('*' | '/') factor)*
    fn parse_term(&mut self) -> SdrlResult<Node> {
        let mut left = self.parse_factor()?;
        while let Some(Token::Op(op @ ('*' | '/'))) = self.peek() {
            let op = *op;
            self.advance();
            let right = self.parse_factor()?;
            left = Node::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    /// factor = number | symbol | '(' expr ')' | ('-' | '+') factor
    fn parse_factor(&mut self) -> SdrlResult<Node> {
        match self.advance() {
            Some(Token::Number(n)) => Ok(Node::Number(n)),
            Some(Token::Symbol(name)) => Ok(Node::Symbol(name)),
            Some(Token::LParen) => {
                let inner = self.parse_expr()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(SdrlError::InvalidExpression(
                        "expected closing parenthesis".to_string(),
                    )),
                }
            }
            Some(Token::Op('-')) => Ok(Node::Neg(Box::new(self.parse_factor()?))),
            Some(Token::Op('+')) => self.parse_factor(),
            Some(other) => Err(SdrlError::InvalidExpression(format!(
                "unexpected token {:?}",
                other
            ))),
            None => Err(SdrlError::InvalidExpression(
                "unexpected end of expression".to_string(),
            )),
        }
    }
}

/// Operand during evaluation: a literal or a band-shaped array
enum Value {
    Scalar(f32),
    Array(BandImage),
}

impl Value {
    fn apply(self, op: char, rhs: Value) -> SdrlResult<Value> {
        let f = binary_fn(op);
        Ok(match (self, rhs) {
            (Value::Scalar(a), Value::Scalar(b)) => Value::Scalar(f(a, b)),
            (Value::Array(a), Value::Scalar(b)) => Value::Array(a.mapv_into(|x| f(x, b))),
            (Value::Scalar(a), Value::Array(b)) => Value::Array(b.mapv_into(|x| f(a, x))),
            (Value::Array(mut a), Value::Array(b)) => {
                if a.dim() != b.dim() {
                    return Err(SdrlError::Processing(format!(
                        "operand shapes differ: {:?} vs {:?}",
                        a.dim(),
                        b.dim()
                    )));
                }
                a.zip_mut_with(&b, |x, &y| *x = f(*x, y));
                Value::Array(a)
            }
        })
    }
}

fn binary_fn(op: char) -> fn(f32, f32) -> f32 {
    match op {
        '+' => |a, b| a + b,
        '-' => |a, b| a - b,
        '*' => |a, b| a * b,
        _ => |a, b| a / b,
    }
}

/// A parsed index formula
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    root: Node,
}

impl Expression {
    pub fn parse(source: &str) -> SdrlResult<Self> {
        let tokens = tokenize(source)?;
        if tokens.is_empty() {
            return Err(SdrlError::InvalidExpression("empty expression".to_string()));
        }
        let mut parser = Parser { tokens, pos: 0 };
        let root = parser.parse_expr()?;
        if let Some(token) = parser.peek() {
            return Err(SdrlError::InvalidExpression(format!(
                "trailing token {:?} in '{}'",
                token, source
            )));
        }
        Ok(Self {
            source: source.to_string(),
            root,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Band symbols in this expression
    pub fn symbols(&self) -> BTreeSet<String> {
        let mut symbols = BTreeSet::new();
        collect_symbols(&self.root, &mut symbols);
        symbols
    }

    /// Evaluate with every symbol bound to an array of the same shape
    pub fn eval(&self, bindings: &HashMap<String, BandImage>) -> SdrlResult<BandImage> {
        match eval_node(&self.root, bindings)? {
            Value::Array(result) => Ok(result),
            Value::Scalar(_) => Err(SdrlError::InvalidExpression(format!(
                "'{}' references no band",
                self.source
            ))),
        }
    }
}

fn collect_symbols(node: &Node, symbols: &mut BTreeSet<String>) {
    match node {
        Node::Number(_) => {}
        Node::Symbol(name) => {
            symbols.insert(name.clone());
        }
        Node::Neg(inner) => collect_symbols(inner, symbols),
        Node::Binary { left, right, .. } => {
            collect_symbols(left, symbols);
            collect_symbols(right, symbols);
        }
    }
}

fn eval_node(node: &Node, bindings: &HashMap<String, BandImage>) -> SdrlResult<Value> {
    match node {
        Node::Number(n) => Ok(Value::Scalar(*n as f32)),
        Node::Symbol(name) => bindings
            .get(name)
            .map(|array| Value::Array(array.clone()))
            .ok_or_else(|| SdrlError::InvalidExpression(format!("unbound symbol '{}'", name))),
        Node::Neg(inner) => Ok(match eval_node(inner, bindings)? {
            Value::Scalar(v) => Value::Scalar(-v),
            Value::Array(a) => Value::Array(a.mapv_into(|x| -x)),
        }),
        Node::Binary { op, left, right } => {
            let lhs = eval_node(left, bindings)?;
            let rhs = eval_node(right, bindings)?;
            lhs.apply(*op, rhs)
        }
    }
}

/// Resolves band symbols to arrays and evaluates index formulas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpressionEvaluator {
    epsilon: f32,
}

impl Default for ExpressionEvaluator {
    fn default() -> Self {
        Self::new(DEFAULT_EPSILON)
    }
}

impl ExpressionEvaluator {
    pub fn new(epsilon: f32) -> Self {
        Self { epsilon }
    }

    pub fn epsilon(&self) -> f32 {
        self.epsilon
    }

    /// Evaluate `expression`, fetching each band symbol through `resolver`.
    ///
    /// Epsilon is added to every element of every symbol array, numerators
    /// included, so all-zero inputs give 0 for normalized differences.
    pub fn evaluate<F>(
        &self,
        expression: &str,
        mut resolver: F,
        window: Option<Window>,
    ) -> SdrlResult<BandImage>
    where
        F: FnMut(&str, Option<Window>) -> SdrlResult<BandImage>,
    {
        let parsed = Expression::parse(expression)?;
        let symbols = parsed.symbols();
        if symbols.is_empty() {
            return Err(SdrlError::InvalidExpression(format!(
                "'{}' references no band",
                expression
            )));
        }

        let mut bindings = HashMap::with_capacity(symbols.len());
        for symbol in symbols {
            let array = resolver(&symbol, window)?;
            log::debug!("Bound {} to {:?} array", symbol, array.dim());
            bindings.insert(symbol, array + self.epsilon);
        }

        parsed.eval(&bindings)
    }
}
