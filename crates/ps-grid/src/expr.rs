//! Small arithmetic language for derived quantities, e.g. `mode * 100` or
//! `x / (1 + x)`.
//!
//! Numbers, variable names, `+ - * /`, powers written `^` or `**`, unary
//! minus and parentheses. Powers bind right to left and tighter than unary
//! minus, so `-x^2` is `-(x^2)`.

use std::collections::BTreeMap;

use ps_core::Real;

use crate::error::{GridError, GridResult};

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Num(Real),
    Name(String),
    Op(char),
    Pow,
    Open,
    Close,
}

/// Parsed expression, reusable across many variable sets.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Num(Real),
    Var(String),
    Neg(Box<Expr>),
    Bin(char, Box<Expr>, Box<Expr>),
}

fn tokenize(src: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' => i += 1,
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                // exponent part
                if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                    let mut j = i + 1;
                    if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].is_ascii_digit() {
                        i = j;
                        while i < chars.len() && chars[i].is_ascii_digit() {
                            i += 1;
                        }
                    }
                }
                let text: String = chars[start..i].iter().collect();
                let value = text
                    .parse::<Real>()
                    .map_err(|_| format!("bad number '{text}'"))?;
                tokens.push(Token::Num(value));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Name(chars[start..i].iter().collect()));
            }
            '*' if chars.get(i + 1) == Some(&'*') => {
                tokens.push(Token::Pow);
                i += 2;
            }
            '^' => {
                tokens.push(Token::Pow);
                i += 1;
            }
            '+' | '-' | '*' | '/' => {
                tokens.push(Token::Op(c));
                i += 1;
            }
            '(' => {
                tokens.push(Token::Open);
                i += 1;
            }
            ')' => {
                tokens.push(Token::Close);
                i += 1;
            }
            other => return Err(format!("unexpected character '{other}'")),
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

    fn next(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        t
    }

    fn sum(&mut self) -> Result<Expr, String> {
        let mut lhs = self.product()?;
        while let Some(Token::Op(op @ ('+' | '-'))) = self.peek().cloned() {
            self.pos += 1;
            let rhs = self.product()?;
            lhs = Expr::Bin(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn product(&mut self) -> Result<Expr, String> {
        let mut lhs = self.unary()?;
        while let Some(Token::Op(op @ ('*' | '/'))) = self.peek().cloned() {
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = Expr::Bin(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, String> {
        match self.peek() {
            Some(Token::Op('-')) => {
                self.pos += 1;
                Ok(Expr::Neg(Box::new(self.unary()?)))
            }
            Some(Token::Op('+')) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<Expr, String> {
        let base = self.atom()?;
        if self.peek() == Some(&Token::Pow) {
            self.pos += 1;
            let exp = self.unary()?;
            return Ok(Expr::Bin('^', Box::new(base), Box::new(exp)));
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<Expr, String> {
        match self.next() {
            Some(Token::Num(v)) => Ok(Expr::Num(v)),
            Some(Token::Name(n)) => Ok(Expr::Var(n)),
            Some(Token::Open) => {
                let inner = self.sum()?;
                match self.next() {
                    Some(Token::Close) => Ok(inner),
                    _ => Err("missing ')'".to_string()),
                }
            }
            Some(t) => Err(format!("unexpected token {t:?}")),
            None => Err("unexpected end of expression".to_string()),
        }
    }
}

impl Expr {
    pub fn parse(src: &str) -> GridResult<Expr> {
        let err = |what: String| GridError::Expr {
            expr: src.to_string(),
            what,
        };
        let tokens = tokenize(src).map_err(err)?;
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.sum().map_err(err)?;
        if parser.pos != parser.tokens.len() {
            return Err(err("trailing input".to_string()));
        }
        Ok(expr)
    }

    /// Evaluate with the given variables. Unknown names are an error;
    /// division by zero follows IEEE rules.
    pub fn eval(&self, vars: &BTreeMap<String, Real>) -> Result<Real, String> {
        Ok(match self {
            Expr::Num(v) => *v,
            Expr::Var(name) => *vars
                .get(name)
                .ok_or_else(|| format!("unknown variable '{name}'"))?,
            Expr::Neg(e) => -e.eval(vars)?,
            Expr::Bin(op, a, b) => {
                let (a, b) = (a.eval(vars)?, b.eval(vars)?);
                match op {
                    '+' => a + b,
                    '-' => a - b,
                    '*' => a * b,
                    '/' => a / b,
                    _ => a.powf(b),
                }
            }
        })
    }

    /// Variable names used by the expression.
    pub fn variables(&self) -> Vec<&str> {
        match self {
            Expr::Num(_) => Vec::new(),
            Expr::Var(name) => vec![name.as_str()],
            Expr::Neg(e) => e.variables(),
            Expr::Bin(_, a, b) => {
                let mut v = a.variables();
                v.extend(b.variables());
                v
            }
        }
    }
}

/// Parse and evaluate `expr` in one go.
pub fn eval_expr(expr: &str, vars: &BTreeMap<String, Real>) -> GridResult<Real> {
    Expr::parse(expr)?
        .eval(vars)
        .map_err(|what| GridError::Expr {
            expr: expr.to_string(),
            what,
        })
}
