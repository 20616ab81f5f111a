//! The `stats` operator and the streaming estimators behind it.
//!
//! Every estimator is single-pass with bounded memory. Each input column gets
//! one accumulator, created the first time the column is seen.

pub mod histogram;
pub mod hll;
pub mod p2;
pub mod reservoir;
pub mod welford;

use std::collections::HashMap;

use tranfi_core::dag::StatKind;
use tranfi_core::error::RowError;
use tranfi_core::row::Row;
use tranfi_core::value::Value;

use crate::error::Result;
use crate::operator::Transform;

use histogram::Histogram;
use hll::Hll;
use p2::P2;
use reservoir::TextReservoir;
use welford::Moments;

/// Per-column accumulator. Estimators that cost memory are only built when
/// their stat was requested.
struct ColumnStats {
    count: u64,
    sum: f64,
    min: Option<f64>,
    max: Option<f64>,
    moments: Moments,
    quantiles: Option<[P2; 3]>,
    distinct: Option<Hll>,
    hist: Option<Histogram>,
    sample: Option<TextReservoir>,
}

impl ColumnStats {
    fn new(wants: &[StatKind]) -> Self {
        let any = |ks: &[StatKind]| ks.iter().any(|k| wants.contains(k));
        Self {
            count: 0,
            sum: 0.0,
            min: None,
            max: None,
            moments: Moments::default(),
            quantiles: any(&[StatKind::Median, StatKind::P25, StatKind::P75])
                .then(|| [P2::new(0.5), P2::new(0.25), P2::new(0.75)]),
            distinct: any(&[StatKind::Distinct]).then(Hll::default),
            hist: any(&[StatKind::Hist]).then(Histogram::default),
            sample: any(&[StatKind::Sample]).then(TextReservoir::default),
        }
    }

    fn observe(&mut self, v: &Value) {
        if v.is_null() {
            return;
        }
        self.count += 1;

        if self.distinct.is_some() || self.sample.is_some() {
            let text = v.to_text();
            if let Some(h) = &mut self.distinct {
                h.insert(text.as_bytes());
            }
            if let Some(r) = &mut self.sample {
                r.push(text);
            }
        }

        let Some(x) = v.as_f64() else {
            return;
        };
        self.sum += x;
        self.min = Some(self.min.map_or(x, |m| m.min(x)));
        self.max = Some(self.max.map_or(x, |m| m.max(x)));
        self.moments.push(x);
        if let Some(qs) = &mut self.quantiles {
            qs.iter_mut().for_each(|q| q.push(x));
        }
        if let Some(h) = &mut self.hist {
            h.push(x);
        }
    }

    fn report(&self, kind: StatKind) -> Value {
        let numeric = self.moments.count() > 0;
        let float = |x: Option<f64>| x.map_or(Value::Null, Value::Float);
        let quantile = |i: usize| float(self.quantiles.as_ref().and_then(|q| q[i].estimate()));
        match kind {
            StatKind::Count => Value::Int(self.count as i64),
            StatKind::Sum => float(numeric.then_some(self.sum)),
            StatKind::Avg => float(self.moments.mean()),
            StatKind::Min => float(self.min),
            StatKind::Max => float(self.max),
            StatKind::Var => float(self.moments.variance()),
            StatKind::Stddev => float(self.moments.stddev()),
            StatKind::Median => quantile(0),
            StatKind::P25 => quantile(1),
            StatKind::P75 => quantile(2),
            StatKind::Skewness => float(self.moments.skewness()),
            StatKind::Kurtosis => float(self.moments.kurtosis()),
            StatKind::Distinct => self
                .distinct
                .as_ref()
                .map_or(Value::Null, |h| Value::Int(h.estimate() as i64)),
            StatKind::Hist => self
                .hist
                .as_ref()
                .and_then(Histogram::encode)
                .map_or(Value::Null, Value::Str),
            StatKind::Sample => self
                .sample
                .as_ref()
                .filter(|r| !r.is_empty())
                .map_or(Value::Null, |r| Value::Str(r.joined())),
        }
    }
}

/// Column profile in long format: one output row per input column.
pub struct Stats {
    kinds: Vec<StatKind>,
    order: Vec<String>,
    columns: HashMap<String, ColumnStats>,
}

impl Stats {
    pub fn new(kinds: Vec<StatKind>) -> Self {
        // Output follows the canonical order regardless of how they were listed.
        let kinds = StatKind::ALL
            .iter()
            .copied()
            .filter(|k| kinds.contains(k))
            .collect();
        Self {
            kinds,
            order: Vec::new(),
            columns: HashMap::new(),
        }
    }
}

impl Transform for Stats {
    fn process(&mut self, rows: Vec<Row>, _out: &mut Vec<Row>, _errors: &mut Vec<RowError>) -> Result<()> {
        for row in &rows {
            for (name, v) in row.iter() {
                if !self.columns.contains_key(name) {
                    self.order.push(name.to_string());
                    self.columns
                        .insert(name.to_string(), ColumnStats::new(&self.kinds));
                }
                if let Some(acc) = self.columns.get_mut(name) {
                    acc.observe(v);
                }
            }
        }
        Ok(())
    }

    fn flush(&mut self, out: &mut Vec<Row>, _errors: &mut Vec<RowError>) -> Result<()> {
        for name in self.order.drain(..) {
            let Some(acc) = self.columns.remove(&name) else {
                continue;
            };
            let mut row = Row::with_capacity(self.kinds.len() + 1);
            row.push("column", Value::Str(name));
            for kind in &self.kinds {
                row.push(kind.name(), acc.report(*kind));
            }
            out.push(row);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{mk_row, run};

    fn people() -> Vec<Row> {
        [("Alice", 30), ("Bob", 25), ("Charlie", 35)]
            .iter()
            .map(|(n, a)| mk_row(&[("name", Value::from(*n)), ("age", Value::Int(*a))]))
            .collect()
    }

    #[test]
    fn default_stats_in_long_format() {
        let (out, _) = run(&mut Stats::new(StatKind::defaults()), people());
        assert_eq!(out.len(), 2);
        assert_eq!(
            out[0].columns().collect::<Vec<_>>(),
            vec!["column", "count", "sum", "avg", "min", "max", "var", "stddev", "median"]
        );

        let name = &out[0];
        assert_eq!(name.value("column"), &Value::from("name"));
        assert_eq!(name.value("count"), &Value::Int(3));
        assert!(name.value("avg").is_null());

        let age = &out[1];
        assert_eq!(age.value("sum"), &Value::Float(90.0));
        assert_eq!(age.value("avg"), &Value::Float(30.0));
        assert_eq!(age.value("min"), &Value::Float(25.0));
        assert_eq!(age.value("max"), &Value::Float(35.0));
        assert_eq!(age.value("var"), &Value::Float(25.0));
        assert_eq!(age.value("median"), &Value::Float(30.0));
    }

    #[test]
    fn requested_order_is_canonical() {
        let (out, _) = run(
            &mut Stats::new(vec![StatKind::Sample, StatKind::Distinct, StatKind::Count]),
            people(),
        );
        assert_eq!(
            out[0].columns().collect::<Vec<_>>(),
            vec!["column", "count", "distinct", "sample"]
        );
        assert_eq!(out[0].value("distinct"), &Value::Int(3));
        assert_eq!(out[0].value("sample"), &Value::from("Alice;Bob;Charlie"));
    }

    #[test]
    fn nulls_are_not_counted() {
        let rows = vec![
            mk_row(&[("x", Value::Int(1))]),
            mk_row(&[("x", Value::Null)]),
            mk_row(&[("x", Value::Int(3))]),
        ];
        let (out, _) = run(&mut Stats::new(vec![StatKind::Count, StatKind::Avg]), rows);
        assert_eq!(out[0].value("count"), &Value::Int(2));
        assert_eq!(out[0].value("avg"), &Value::Float(2.0));
    }
}
