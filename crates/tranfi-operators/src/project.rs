//! Column projection: `select`, `rename`, `derive`, `flatten`.

use std::collections::{BTreeMap, HashSet};

use tranfi_core::dag::DeriveColumn;
use tranfi_core::error::RowError;
use tranfi_core::row::Row;

use crate::error::Result;
use crate::operator::Transform;

/// Project and reorder. A listed column that a row lacks is reported once and
/// left out of the output.
pub struct Select {
    columns: Vec<String>,
    reported: HashSet<String>,
}

impl Select {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            reported: HashSet::new(),
        }
    }
}

impl Transform for Select {
    fn process(&mut self, rows: Vec<Row>, out: &mut Vec<Row>, errors: &mut Vec<RowError>) -> Result<()> {
        for mut row in rows {
            let mut projected = Row::with_capacity(self.columns.len());
            for name in &self.columns {
                match row.remove(name) {
                    Some(v) => projected.push(name.clone(), v),
                    None => {
                        if self.reported.insert(name.clone()) {
                            errors.push(RowError::new(
                                "select",
                                format!("column '{name}' not found"),
                            ));
                        }
                    }
                }
            }
            out.push(projected);
        }
        Ok(())
    }
}

pub struct Rename {
    mapping: BTreeMap<String, String>,
}

impl Rename {
    pub fn new(mapping: BTreeMap<String, String>) -> Self {
        Self { mapping }
    }
}

impl Transform for Rename {
    fn process(&mut self, rows: Vec<Row>, out: &mut Vec<Row>, _errors: &mut Vec<RowError>) -> Result<()> {
        for mut row in rows {
            for (old, new) in &self.mapping {
                row.rename(old, new.as_str());
            }
            out.push(row);
        }
        Ok(())
    }
}

/// Later columns see the values derived before them in the same row.
pub struct Derive {
    columns: Vec<DeriveColumn>,
}

impl Derive {
    pub fn new(columns: Vec<DeriveColumn>) -> Self {
        Self { columns }
    }
}

impl Transform for Derive {
    fn process(&mut self, rows: Vec<Row>, out: &mut Vec<Row>, _errors: &mut Vec<RowError>) -> Result<()> {
        for mut row in rows {
            for col in &self.columns {
                let v = col.expr.eval(&row);
                row.set(col.name.as_str(), v);
            }
            out.push(row);
        }
        Ok(())
    }
}

/// Rows are already flat; kept so plans that name it still run.
pub struct Flatten;

impl Transform for Flatten {
    fn process(&mut self, rows: Vec<Row>, out: &mut Vec<Row>, _errors: &mut Vec<RowError>) -> Result<()> {
        out.extend(rows);
        Ok(())
    }
}
