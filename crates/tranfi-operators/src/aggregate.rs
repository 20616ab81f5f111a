//! Keyed aggregation: `group-agg`, `frequency`, `pivot`.
//!
//! Groups live in a `HashMap` from key tuple to an index into a `Vec`, so
//! output is always in first-seen order.

use std::collections::HashMap;

use tranfi_core::dag::{AggFunc, AggSpec, GroupAggArgs, PivotAgg, PivotArgs};
use tranfi_core::error::RowError;
use tranfi_core::row::Row;
use tranfi_core::value::{Value, ValueKey};

use crate::error::Result;
use crate::operator::Transform;

/// Running numeric summary of one cell stream.
#[derive(Debug, Clone, Default)]
struct Accumulator {
    rows: u64,
    n: u64,
    sum: f64,
    min: Option<f64>,
    max: Option<f64>,
    first: Option<Value>,
}

impl Accumulator {
    fn add(&mut self, v: &Value) {
        self.rows += 1;
        if self.first.is_none() && !v.is_null() {
            self.first = Some(v.clone());
        }
        if let Some(x) = v.as_f64() {
            self.n += 1;
            self.sum += x;
            self.min = Some(self.min.map_or(x, |m| m.min(x)));
            self.max = Some(self.max.map_or(x, |m| m.max(x)));
        }
    }

    fn avg(&self) -> Option<f64> {
        (self.n > 0).then(|| self.sum / self.n as f64)
    }
}

fn float(x: Option<f64>) -> Value {
    x.map_or(Value::Null, Value::Float)
}

struct Group {
    key_values: Vec<Value>,
    accs: Vec<Accumulator>,
}

pub struct GroupAgg {
    group_by: Vec<String>,
    aggs: Vec<AggSpec>,
    names: Vec<String>,
    index: HashMap<Vec<ValueKey>, usize>,
    groups: Vec<Group>,
}

impl GroupAgg {
    pub fn new(args: GroupAggArgs) -> Self {
        Self {
            names: args.aggs.iter().map(AggSpec::output_name).collect(),
            group_by: args.group_by,
            aggs: args.aggs,
            index: HashMap::new(),
            groups: Vec::new(),
        }
    }
}

impl Transform for GroupAgg {
    fn process(&mut self, rows: Vec<Row>, _out: &mut Vec<Row>, _errors: &mut Vec<RowError>) -> Result<()> {
        for row in rows {
            let key: Vec<ValueKey> = self
                .group_by
                .iter()
                .map(|c| ValueKey::from(row.value(c)))
                .collect();
            let gi = match self.index.get(&key) {
                Some(&gi) => gi,
                None => {
                    self.groups.push(Group {
                        key_values: self.group_by.iter().map(|c| row.value(c).clone()).collect(),
                        accs: vec![Accumulator::default(); self.aggs.len()],
                    });
                    self.index.insert(key, self.groups.len() - 1);
                    self.groups.len() - 1
                }
            };
            let group = &mut self.groups[gi];
            for (acc, spec) in group.accs.iter_mut().zip(&self.aggs) {
                acc.add(row.value(&spec.column));
            }
        }
        Ok(())
    }

    fn flush(&mut self, out: &mut Vec<Row>, _errors: &mut Vec<RowError>) -> Result<()> {
        self.index.clear();
        for group in self.groups.drain(..) {
            let mut row = Row::with_capacity(self.group_by.len() + self.aggs.len());
            for (name, v) in self.group_by.iter().zip(group.key_values) {
                row.push(name.as_str(), v);
            }
            for ((spec, name), acc) in self.aggs.iter().zip(&self.names).zip(&group.accs) {
                let v = match spec.func {
                    AggFunc::Count => Value::Int(acc.rows as i64),
                    AggFunc::Sum => Value::Float(acc.sum),
                    AggFunc::Avg => float(acc.avg()),
                    AggFunc::Min => float(acc.min),
                    AggFunc::Max => float(acc.max),
                };
                row.set(name.as_str(), v);
            }
            out.push(row);
        }
        Ok(())
    }
}

/// Exact value counts over a key tuple.
pub struct Frequency {
    columns: Vec<String>,
    index: HashMap<Vec<ValueKey>, usize>,
    counts: Vec<(Value, u64)>,
}

impl Frequency {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            index: HashMap::new(),
            counts: Vec::new(),
        }
    }

    fn key(&self, row: &Row) -> Vec<Value> {
        if self.columns.is_empty() {
            row.values().cloned().collect()
        } else {
            self.columns.iter().map(|c| row.value(c).clone()).collect()
        }
    }
}

fn display_key(mut parts: Vec<Value>) -> Value {
    if parts.len() == 1 {
        return parts.remove(0);
    }
    let text: Vec<String> = parts.iter().map(Value::to_text).collect();
    Value::Str(text.join(","))
}

impl Transform for Frequency {
    fn process(&mut self, rows: Vec<Row>, _out: &mut Vec<Row>, _errors: &mut Vec<RowError>) -> Result<()> {
        for row in rows {
            let parts = self.key(&row);
            let key: Vec<ValueKey> = parts.iter().map(ValueKey::from).collect();
            match self.index.get(&key) {
                Some(&i) => self.counts[i].1 += 1,
                None => {
                    self.index.insert(key, self.counts.len());
                    self.counts.push((display_key(parts), 1));
                }
            }
        }
        Ok(())
    }

    fn flush(&mut self, out: &mut Vec<Row>, _errors: &mut Vec<RowError>) -> Result<()> {
        self.index.clear();
        // Stable, so ties keep first-seen order.
        self.counts.sort_by(|a, b| b.1.cmp(&a.1));
        for (value, count) in self.counts.drain(..) {
            let mut row = Row::with_capacity(2);
            row.push("value", value);
            row.push("count", Value::Int(count as i64));
            out.push(row);
        }
        Ok(())
    }
}

struct PivotGroup {
    ids: Vec<(String, Value)>,
    cells: HashMap<usize, Accumulator>,
}

/// Long to wide. Every column other than the name and value columns
/// identifies the output row.
pub struct Pivot {
    args: PivotArgs,
    names: Vec<String>,
    name_index: HashMap<String, usize>,
    index: HashMap<Vec<(String, ValueKey)>, usize>,
    groups: Vec<PivotGroup>,
}

impl Pivot {
    pub fn new(args: PivotArgs) -> Self {
        Self {
            args,
            names: Vec::new(),
            name_index: HashMap::new(),
            index: HashMap::new(),
            groups: Vec::new(),
        }
    }

    fn name_slot(&mut self, name: String) -> usize {
        if let Some(&i) = self.name_index.get(&name) {
            return i;
        }
        self.name_index.insert(name.clone(), self.names.len());
        self.names.push(name);
        self.names.len() - 1
    }

    fn report(&self, acc: &Accumulator) -> Value {
        match self.args.agg {
            PivotAgg::First => acc.first.clone().unwrap_or(Value::Null),
            PivotAgg::Count => Value::Int(acc.rows as i64),
            PivotAgg::Sum => Value::Float(acc.sum),
            PivotAgg::Avg => float(acc.avg()),
            PivotAgg::Min => float(acc.min),
            PivotAgg::Max => float(acc.max),
        }
    }
}

impl Transform for Pivot {
    fn process(&mut self, rows: Vec<Row>, _out: &mut Vec<Row>, _errors: &mut Vec<RowError>) -> Result<()> {
        for row in rows {
            let ids: Vec<(String, Value)> = row
                .iter()
                .filter(|(c, _)| *c != self.args.name_column && *c != self.args.value_column)
                .map(|(c, v)| (c.to_string(), v.clone()))
                .collect();
            let key: Vec<(String, ValueKey)> =
                ids.iter().map(|(c, v)| (c.clone(), ValueKey::from(v))).collect();
            let gi = match self.index.get(&key) {
                Some(&gi) => gi,
                None => {
                    self.groups.push(PivotGroup {
                        ids,
                        cells: HashMap::new(),
                    });
                    self.index.insert(key, self.groups.len() - 1);
                    self.groups.len() - 1
                }
            };

            let name = row.value(&self.args.name_column);
            if name.is_null() {
                continue;
            }
            let slot = self.name_slot(name.to_text());
            self.groups[gi]
                .cells
                .entry(slot)
                .or_default()
                .add(row.value(&self.args.value_column));
        }
        Ok(())
    }

    fn flush(&mut self, out: &mut Vec<Row>, _errors: &mut Vec<RowError>) -> Result<()> {
        self.index.clear();
        let groups = std::mem::take(&mut self.groups);
        for group in groups {
            let mut row = Row::with_capacity(group.ids.len() + self.names.len());
            for (c, v) in group.ids {
                row.push(c, v);
            }
            for (i, name) in self.names.iter().enumerate() {
                let v = group
                    .cells
                    .get(&i)
                    .map_or(Value::Null, |acc| self.report(acc));
                row.set(name.as_str(), v);
            }
            out.push(row);
        }
        Ok(())
    }
}
