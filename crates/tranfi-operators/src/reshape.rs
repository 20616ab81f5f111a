//! Shape-changing streaming operators: `explode`, `split`, `unpivot`.

use tranfi_core::dag::{ExplodeArgs, SplitArgs};
use tranfi_core::error::RowError;
use tranfi_core::row::Row;
use tranfi_core::value::Value;

use crate::error::Result;
use crate::operator::Transform;

/// One output row per delimited token. Non-string cells pass through.
pub struct Explode {
    args: ExplodeArgs,
}

impl Explode {
    pub fn new(args: ExplodeArgs) -> Self {
        Self { args }
    }
}

impl Transform for Explode {
    fn process(&mut self, rows: Vec<Row>, out: &mut Vec<Row>, _errors: &mut Vec<RowError>) -> Result<()> {
        for row in rows {
            let Some(text) = row.value(&self.args.column).as_str().map(str::to_owned) else {
                out.push(row);
                continue;
            };
            if self.args.delimiter.is_empty() {
                out.push(row);
                continue;
            }
            for token in text.split(self.args.delimiter.as_str()) {
                let mut copy = row.clone();
                copy.set(self.args.column.as_str(), Value::from(token));
                out.push(copy);
            }
        }
        Ok(())
    }
}

/// Splits a string column into named columns at the source position.
pub struct Split {
    args: SplitArgs,
}

impl Split {
    pub fn new(args: SplitArgs) -> Self {
        Self { args }
    }

    fn parts(&self, v: &Value) -> Vec<Value> {
        let n = self.args.names.len();
        let mut parts: Vec<Value> = match v.as_str() {
            Some(s) if !self.args.delimiter.is_empty() => s
                .splitn(n, self.args.delimiter.as_str())
                .map(Value::from)
                .collect(),
            Some(s) => vec![Value::from(s)],
            None => Vec::new(),
        };
        parts.resize(n, Value::Null);
        parts
    }
}

impl Transform for Split {
    fn process(&mut self, rows: Vec<Row>, out: &mut Vec<Row>, _errors: &mut Vec<RowError>) -> Result<()> {
        for mut row in rows {
            let parts = self.parts(row.value(&self.args.column));
            let at = row.position(&self.args.column);
            row.remove(&self.args.column);
            let mut at = at.unwrap_or(row.len());
            for (name, v) in self.args.names.iter().zip(parts) {
                if row.contains(name) {
                    row.set(name.as_str(), v);
                } else {
                    row.insert(at, name.as_str(), v);
                    at += 1;
                }
            }
            out.push(row);
        }
        Ok(())
    }
}

/// Wide to long: id columns + `variable` + `value` per listed column.
pub struct Unpivot {
    columns: Vec<String>,
}

impl Unpivot {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }
}

impl Transform for Unpivot {
    fn process(&mut self, rows: Vec<Row>, out: &mut Vec<Row>, _errors: &mut Vec<RowError>) -> Result<()> {
        for row in rows {
            let ids: Row = row
                .iter()
                .filter(|(c, _)| !self.columns.iter().any(|u| u.as_str() == *c))
                .map(|(c, v)| (c, v.clone()))
                .collect();
            for col in &self.columns {
                let Some(v) = row.get(col) else {
                    continue;
                };
                let mut long = ids.clone();
                long.push("variable", Value::from(col.as_str()));
                long.push("value", v.clone());
                out.push(long);
            }
        }
        Ok(())
    }
}
