//! Cell-level cleanup: `clip`, `replace`, `trim`, `fill-null`, `fill-down`,
//! `cast`.

use std::collections::{BTreeMap, HashMap};

use regex::Regex;
use tranfi_core::dag::{CastType, ClipArgs, ReplaceArgs};
use tranfi_core::error::RowError;
use tranfi_core::row::Row;
use tranfi_core::value::{parse_date, Value};

use crate::error::{OpError, Result};
use crate::operator::Transform;

pub struct Clip {
    args: ClipArgs,
}

impl Clip {
    pub fn new(args: ClipArgs) -> Self {
        Self { args }
    }

    fn clamp(&self, v: &Value) -> Option<Value> {
        let x = v.as_f64()?;
        let bound = match (self.args.min, self.args.max) {
            (Some(lo), _) if x < lo => lo,
            (_, Some(hi)) if x > hi => hi,
            _ => return None,
        };
        Some(match v {
            Value::Int(_) if bound.fract() == 0.0 && bound.abs() < i64::MAX as f64 => {
                Value::Int(bound as i64)
            }
            _ => Value::Float(bound),
        })
    }
}

impl Transform for Clip {
    fn process(&mut self, rows: Vec<Row>, out: &mut Vec<Row>, _errors: &mut Vec<RowError>) -> Result<()> {
        for mut row in rows {
            if let Some(clamped) = row.get(&self.args.column).and_then(|v| self.clamp(v)) {
                row.set(self.args.column.as_str(), clamped);
            }
            out.push(row);
        }
        Ok(())
    }
}

enum Replacer {
    Literal { pattern: String, with: String },
    Regex { re: Regex, with: String },
}

/// Replace every match in one string column. In regex mode `&` and `$0`
/// both stand for the whole match.
pub struct Replace {
    column: String,
    replacer: Replacer,
}

impl Replace {
    pub fn new(args: &ReplaceArgs) -> Result<Self> {
        let replacer = if args.regex {
            let re = Regex::new(&args.pattern).map_err(|e| OpError::Build {
                op: "replace",
                message: format!("invalid regex '{}': {e}", args.pattern),
            })?;
            Replacer::Regex {
                re,
                with: expand_ampersand(&args.replacement),
            }
        } else {
            Replacer::Literal {
                pattern: args.pattern.clone(),
                with: args.replacement.clone(),
            }
        };
        Ok(Self {
            column: args.column.clone(),
            replacer,
        })
    }

    fn apply(&self, s: &str) -> String {
        match &self.replacer {
            Replacer::Literal { pattern, .. } if pattern.is_empty() => s.to_string(),
            Replacer::Literal { pattern, with } => s.replace(pattern.as_str(), with),
            Replacer::Regex { re, with } => re.replace_all(s, with.as_str()).into_owned(),
        }
    }
}

/// `&` → `${0}`; `\&` stays a literal ampersand.
fn expand_ampersand(rep: &str) -> String {
    let mut out = String::with_capacity(rep.len() + 4);
    let mut chars = rep.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'&') => {
                chars.next();
                out.push('&');
            }
            '&' => out.push_str("${0}"),
            _ => out.push(c),
        }
    }
    out
}

impl Transform for Replace {
    fn process(&mut self, rows: Vec<Row>, out: &mut Vec<Row>, _errors: &mut Vec<RowError>) -> Result<()> {
        for mut row in rows {
            if let Some(Value::Str(s)) = row.get_mut(&self.column) {
                *s = self.apply(s);
            }
            out.push(row);
        }
        Ok(())
    }
}

/// Strip surrounding whitespace from string cells, in every column or only
/// the listed ones.
pub struct Trim {
    columns: Vec<String>,
}

impl Trim {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }
}

fn trim_in_place(v: &mut Value) {
    if let Value::Str(s) = v {
        let t = s.trim();
        if t.len() != s.len() {
            *s = t.to_string();
        }
    }
}

impl Transform for Trim {
    fn process(&mut self, rows: Vec<Row>, out: &mut Vec<Row>, _errors: &mut Vec<RowError>) -> Result<()> {
        for mut row in rows {
            if self.columns.is_empty() {
                for (_, v) in row.iter_mut() {
                    trim_in_place(v);
                }
            } else {
                for name in &self.columns {
                    if let Some(v) = row.get_mut(name) {
                        trim_in_place(v);
                    }
                }
            }
            out.push(row);
        }
        Ok(())
    }
}

pub struct FillNull {
    fills: Vec<(String, Value)>,
}

impl FillNull {
    pub fn new(mapping: &BTreeMap<String, serde_json::Value>) -> Self {
        Self {
            fills: mapping
                .iter()
                .map(|(k, v)| (k.clone(), Value::from_json_literal(v)))
                .collect(),
        }
    }
}

impl Transform for FillNull {
    fn process(&mut self, rows: Vec<Row>, out: &mut Vec<Row>, _errors: &mut Vec<RowError>) -> Result<()> {
        for mut row in rows {
            for (name, fill) in &self.fills {
                if row.value(name).is_null() {
                    row.set(name.as_str(), fill.clone());
                }
            }
            out.push(row);
        }
        Ok(())
    }
}

/// Carry the last non-null value of each column forward.
pub struct FillDown {
    columns: Vec<String>,
    last: HashMap<String, Value>,
}

impl FillDown {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            last: HashMap::new(),
        }
    }

    fn fill(last: &mut HashMap<String, Value>, name: &str, v: &mut Value) {
        if v.is_null() {
            if let Some(prev) = last.get(name) {
                *v = prev.clone();
            }
        } else {
            last.insert(name.to_string(), v.clone());
        }
    }
}

impl Transform for FillDown {
    fn process(&mut self, rows: Vec<Row>, out: &mut Vec<Row>, _errors: &mut Vec<RowError>) -> Result<()> {
        for mut row in rows {
            if self.columns.is_empty() {
                for (name, v) in row.iter_mut() {
                    Self::fill(&mut self.last, name, v);
                }
            } else {
                for name in &self.columns {
                    if let Some(v) = row.get_mut(name) {
                        Self::fill(&mut self.last, name, v);
                    }
                }
            }
            out.push(row);
        }
        Ok(())
    }
}

/// Type conversion. A value that cannot be converted becomes Null and is
/// reported; the row is kept.
pub struct Cast {
    mapping: BTreeMap<String, CastType>,
    rows_seen: u64,
}

impl Cast {
    pub fn new(mapping: BTreeMap<String, CastType>) -> Self {
        Self {
            mapping,
            rows_seen: 0,
        }
    }
}

fn type_label(t: CastType) -> &'static str {
    match t {
        CastType::Int => "int",
        CastType::Float => "float",
        CastType::String => "string",
        CastType::Bool => "bool",
        CastType::Date => "date",
    }
}

/// `None` means the conversion failed.
pub fn cast_value(v: &Value, to: CastType) -> Option<Value> {
    if v.is_null() {
        return Some(Value::Null);
    }
    match to {
        CastType::String => Some(Value::Str(v.to_text())),
        CastType::Int => match v {
            Value::Int(i) => Some(Value::Int(*i)),
            Value::Float(f) => float_to_i64(*f).map(Value::Int),
            Value::Bool(b) => Some(Value::Int(i64::from(*b))),
            Value::Str(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().and_then(float_to_i64))
                    .map(Value::Int)
            }
            _ => None,
        },
        CastType::Float => match v {
            Value::Int(i) => Some(Value::Float(*i as f64)),
            Value::Float(f) => Some(Value::Float(*f)),
            Value::Bool(b) => Some(Value::Float(if *b { 1.0 } else { 0.0 })),
            Value::Str(s) => s.trim().parse::<f64>().ok().map(Value::Float),
            _ => None,
        },
        CastType::Bool => match v {
            Value::Bool(b) => Some(Value::Bool(*b)),
            Value::Int(i) => Some(Value::Bool(*i != 0)),
            Value::Float(f) => Some(Value::Bool(*f != 0.0)),
            Value::Str(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "t" | "yes" | "y" | "1" => Some(Value::Bool(true)),
                "false" | "f" | "no" | "n" | "0" => Some(Value::Bool(false)),
                _ => None,
            },
            _ => None,
        },
        CastType::Date => match v {
            Value::Date(d) => Some(Value::Date(*d)),
            Value::Str(s) => {
                let s = s.trim();
                parse_date(s)
                    .or_else(|| s.get(..10).and_then(parse_date))
                    .map(Value::Date)
            }
            _ => None,
        },
    }
}

fn float_to_i64(f: f64) -> Option<i64> {
    (f.is_finite() && f.abs() < 9.2e18).then(|| f.trunc() as i64)
}

impl Transform for Cast {
    fn process(&mut self, rows: Vec<Row>, out: &mut Vec<Row>, errors: &mut Vec<RowError>) -> Result<()> {
        for mut row in rows {
            self.rows_seen += 1;
            for (name, to) in &self.mapping {
                let Some(v) = row.get_mut(name) else {
                    continue;
                };
                match cast_value(v, *to) {
                    Some(converted) => *v = converted,
                    None => {
                        errors.push(
                            RowError::new(
                                "cast",
                                format!(
                                    "cannot cast {} '{}' in column '{name}' to {}",
                                    v.type_name(),
                                    v.to_text(),
                                    type_label(*to)
                                ),
                            )
                            .at_row(self.rows_seen),
                        );
                        *v = Value::Null;
                    }
                }
            }
            out.push(row);
        }
        Ok(())
    }
}
