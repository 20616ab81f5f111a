//! Expression language used by `filter`, `derive`, and `validate`.
//!
//! An `Expression` keeps the source text next to the parsed AST. It serializes
//! as the source string, so plans round-trip losslessly, and it is parsed
//! exactly once when the plan is built.

pub mod ast;
pub mod eval;
pub mod functions;
pub mod lexer;
pub mod parser;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::row::Row;
use crate::value::Value;

pub use ast::{BinaryOp, Expr, UnaryOp};
pub use eval::truthy;
pub use functions::Func;
pub use parser::parse;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Expression {
    source: String,
    ast: Expr,
}

impl Expression {
    pub fn parse(source: &str) -> Result<Self, Error> {
        let ast = parser::parse(source)
            .map_err(|e| Error::Expr(format!("cannot parse '{source}': {e}")))?;
        Ok(Self {
            source: source.to_string(),
            ast,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn ast(&self) -> &Expr {
        &self.ast
    }

    pub fn eval(&self, row: &Row) -> Value {
        eval::eval(&self.ast, row)
    }

    /// Evaluate and apply filter truthiness.
    pub fn matches(&self, row: &Row) -> bool {
        truthy(&self.eval(row))
    }
}

impl TryFrom<String> for Expression {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Expression::parse(&s)
    }
}

impl From<Expression> for String {
    fn from(e: Expression) -> Self {
        e.source
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_source() {
        let e = Expression::parse("age > 1").expect("parse");
        assert_eq!(serde_json::to_string(&e).expect("ser"), "\"age > 1\"");
        let back: Expression = serde_json::from_str("\"age > 1\"").expect("de");
        assert_eq!(back, e);
    }

    #[test]
    fn bad_source_fails_deserialization() {
        assert!(serde_json::from_str::<Expression>("\"age >\"").is_err());
    }
}
