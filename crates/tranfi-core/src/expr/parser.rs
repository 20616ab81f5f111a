//! Recursive-descent parser.
//!
//! Precedence, lowest first: `or`, `and`, `not`, comparison, `+ -`,
//! `* / %`, unary `-`, atom.

use crate::error::{Error, Result};
use crate::value::Value;

use super::ast::{BinaryOp, Expr, UnaryOp};
use super::functions::Func;
use super::lexer::{tokenize, Token};

pub fn parse(src: &str) -> Result<Expr> {
    let tokens = tokenize(src)?;
    if tokens.is_empty() {
        return Err(Error::Expr("empty expression".into()));
    }
    let mut p = Parser { tokens, pos: 0 };
    let expr = p.or()?;
    if let Some(tok) = p.peek() {
        return Err(Error::Expr(format!("unexpected token {tok:?} in '{src}'")));
    }
    Ok(expr)
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

    fn eat_op(&mut self, op: &str) -> bool {
        if matches!(self.peek(), Some(Token::Op(o)) if *o == op) {
            self.pos += 1;
            return true;
        }
        false
    }

    fn eat_keyword(&mut self, kw: &str) -> bool {
        if matches!(self.peek(), Some(Token::Ident(w)) if w.eq_ignore_ascii_case(kw)) {
            self.pos += 1;
            return true;
        }
        false
    }

    fn expect(&mut self, want: Token) -> Result<()> {
        match self.next() {
            Some(t) if t == want => Ok(()),
            Some(t) => Err(Error::Expr(format!("expected {want:?}, found {t:?}"))),
            None => Err(Error::Expr(format!("expected {want:?}, found end of input"))),
        }
    }

    fn or(&mut self) -> Result<Expr> {
        let mut lhs = self.and()?;
        while self.eat_keyword("or") || self.eat_op("or") {
            let rhs = self.and()?;
            lhs = Expr::Binary(BinaryOp::Or, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn and(&mut self) -> Result<Expr> {
        let mut lhs = self.not()?;
        while self.eat_keyword("and") || self.eat_op("and") {
            let rhs = self.not()?;
            lhs = Expr::Binary(BinaryOp::And, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn not(&mut self) -> Result<Expr> {
        if self.eat_keyword("not") || self.eat_op("not") {
            let inner = self.not()?;
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(inner)));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr> {
        let lhs = self.additive()?;
        let op = match self.peek() {
            Some(Token::Op("==")) => BinaryOp::Eq,
            Some(Token::Op("!=")) => BinaryOp::Ne,
            Some(Token::Op("<")) => BinaryOp::Lt,
            Some(Token::Op("<=")) => BinaryOp::Le,
            Some(Token::Op(">")) => BinaryOp::Gt,
            Some(Token::Op(">=")) => BinaryOp::Ge,
            _ => return Ok(lhs),
        };
        self.pos += 1;
        let rhs = self.additive()?;
        Ok(Expr::Binary(op, Box::new(lhs), Box::new(rhs)))
    }

    fn additive(&mut self) -> Result<Expr> {
        let mut lhs = self.multiplicative()?;
        loop {
            let op = if self.eat_op("+") {
                BinaryOp::Add
            } else if self.eat_op("-") {
                BinaryOp::Sub
            } else {
                return Ok(lhs);
            };
            let rhs = self.multiplicative()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn multiplicative(&mut self) -> Result<Expr> {
        let mut lhs = self.unary()?;
        loop {
            let op = if self.eat_op("*") {
                BinaryOp::Mul
            } else if self.eat_op("/") {
                BinaryOp::Div
            } else if self.eat_op("%") {
                BinaryOp::Mod
            } else {
                return Ok(lhs);
            };
            let rhs = self.unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn unary(&mut self) -> Result<Expr> {
        if self.eat_op("-") {
            let inner = self.unary()?;
            // fold negative literals so `-5` stays a literal
            return Ok(match inner {
                Expr::Literal(Value::Int(i)) => match i.checked_neg() {
                    Some(n) => Expr::Literal(Value::Int(n)),
                    None => Expr::Unary(UnaryOp::Neg, Box::new(Expr::Literal(Value::Int(i)))),
                },
                Expr::Literal(Value::Float(f)) => Expr::Literal(Value::Float(-f)),
                other => Expr::Unary(UnaryOp::Neg, Box::new(other)),
            });
        }
        if self.eat_op("+") {
            return self.unary();
        }
        self.atom()
    }

    fn atom(&mut self) -> Result<Expr> {
        match self.next() {
            Some(Token::Int(i)) => Ok(Expr::Literal(Value::Int(i))),
            Some(Token::Float(f)) => Ok(Expr::Literal(Value::Float(f))),
            Some(Token::Str(s)) => Ok(Expr::Literal(Value::Str(s))),
            Some(Token::LParen) => {
                let e = self.or()?;
                self.expect(Token::RParen)?;
                Ok(e)
            }
            Some(Token::Ident(name)) => {
                if matches!(self.peek(), Some(Token::LParen)) {
                    self.pos += 1;
                    return self.call(&name);
                }
                match name.to_ascii_lowercase().as_str() {
                    "true" => Ok(Expr::Literal(Value::Bool(true))),
                    "false" => Ok(Expr::Literal(Value::Bool(false))),
                    "null" => Ok(Expr::Literal(Value::Null)),
                    _ => Ok(Expr::Column(name)),
                }
            }
            Some(t) => Err(Error::Expr(format!("unexpected token {t:?}"))),
            None => Err(Error::Expr("unexpected end of expression".into())),
        }
    }

    /// After `name(`.
    fn call(&mut self, name: &str) -> Result<Expr> {
        if name.eq_ignore_ascii_case("col") {
            let column = match self.next() {
                Some(Token::Str(s)) | Some(Token::Ident(s)) => s,
                other => {
                    return Err(Error::Expr(format!(
                        "col() expects a column name, found {other:?}"
                    )))
                }
            };
            self.expect(Token::RParen)?;
            return Ok(Expr::Column(column));
        }

        let func = Func::from_name(name)
            .ok_or_else(|| Error::Expr(format!("unknown function '{name}'")))?;
        let mut args = Vec::new();
        if !matches!(self.peek(), Some(Token::RParen)) {
            loop {
                args.push(self.or()?);
                if matches!(self.peek(), Some(Token::Comma)) {
                    self.pos += 1;
                    continue;
                }
                break;
            }
        }
        self.expect(Token::RParen)?;

        let (min, max) = func.arity();
        if args.len() < min || max.is_some_and(|m| args.len() > m) {
            return Err(Error::Expr(format!(
                "{}() takes {} argument(s), got {}",
                func.name(),
                match max {
                    Some(m) if m == min => min.to_string(),
                    Some(m) => format!("{min}..{m}"),
                    None => format!("at least {min}"),
                },
                args.len()
            )));
        }
        Ok(Expr::Call(func, args))
    }
}
