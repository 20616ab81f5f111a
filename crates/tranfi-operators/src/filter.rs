//! Row predicates: `filter`, `validate`, `grep`.

use regex::Regex;
use tranfi_core::dag::GrepArgs;
use tranfi_core::error::RowError;
use tranfi_core::expr::Expression;
use tranfi_core::row::Row;
use tranfi_core::value::Value;

use crate::error::{OpError, Result};
use crate::operator::Transform;

pub struct Filter {
    expr: Expression,
}

impl Filter {
    pub fn new(expr: Expression) -> Self {
        Self { expr }
    }
}

impl Transform for Filter {
    fn process(&mut self, rows: Vec<Row>, out: &mut Vec<Row>, _errors: &mut Vec<RowError>) -> Result<()> {
        out.extend(rows.into_iter().filter(|r| self.expr.matches(r)));
        Ok(())
    }
}

/// Appends `_valid`; never drops a row.
pub struct Validate {
    expr: Expression,
}

impl Validate {
    pub fn new(expr: Expression) -> Self {
        Self { expr }
    }
}

impl Transform for Validate {
    fn process(&mut self, rows: Vec<Row>, out: &mut Vec<Row>, _errors: &mut Vec<RowError>) -> Result<()> {
        for mut row in rows {
            let ok = self.expr.matches(&row);
            row.set("_valid", Value::Bool(ok));
            out.push(row);
        }
        Ok(())
    }
}

enum Matcher {
    Substring(String),
    Regex(Regex),
}

impl Matcher {
    fn is_match(&self, text: &str) -> bool {
        match self {
            Matcher::Substring(p) => text.contains(p.as_str()),
            Matcher::Regex(re) => re.is_match(text),
        }
    }
}

pub struct Grep {
    column: String,
    matcher: Matcher,
    invert: bool,
}

impl Grep {
    pub fn new(args: &GrepArgs) -> Result<Self> {
        let matcher = if args.regex {
            Matcher::Regex(Regex::new(&args.pattern).map_err(|e| OpError::Build {
                op: "grep",
                message: format!("invalid regex '{}': {e}", args.pattern),
            })?)
        } else {
            Matcher::Substring(args.pattern.clone())
        };
        Ok(Self {
            column: args.column.clone(),
            matcher,
            invert: args.invert,
        })
    }
}

impl Transform for Grep {
    fn process(&mut self, rows: Vec<Row>, out: &mut Vec<Row>, _errors: &mut Vec<RowError>) -> Result<()> {
        for row in rows {
            let hit = match row.get(&self.column) {
                Some(v) if !v.is_null() => self.matcher.is_match(&v.to_text()),
                _ => false,
            };
            if hit != self.invert {
                out.push(row);
            }
        }
        Ok(())
    }
}
