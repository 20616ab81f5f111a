//! Whole-column numeric operators: `normalize` and `acf`. Both need every
//! value before emitting, so both are blocking.

use tranfi_core::dag::{AcfArgs, NormMethod, NormalizeArgs};
use tranfi_core::error::RowError;
use tranfi_core::row::Row;
use tranfi_core::value::Value;

use crate::error::Result;
use crate::operator::Transform;
use crate::stats::welford::Moments;

#[derive(Default)]
struct Range {
    min: Option<f64>,
    max: Option<f64>,
    moments: Moments,
}

impl Range {
    fn push(&mut self, x: f64) {
        self.min = Some(self.min.map_or(x, |m| m.min(x)));
        self.max = Some(self.max.map_or(x, |m| m.max(x)));
        self.moments.push(x);
    }

    fn scale(&self, method: NormMethod, x: f64) -> f64 {
        match method {
            NormMethod::Minmax => match (self.min, self.max) {
                (Some(lo), Some(hi)) if hi > lo => (x - lo) / (hi - lo),
                _ => 0.0,
            },
            NormMethod::Zscore => {
                let mean = self.moments.mean().unwrap_or(x);
                match self.moments.stddev() {
                    Some(sd) if sd > 0.0 => (x - mean) / sd,
                    _ => 0.0,
                }
            }
        }
    }
}

/// Rescales numeric columns in place. Non-numeric cells are left alone.
pub struct Normalize {
    method: NormMethod,
    columns: Vec<String>,
    ranges: Vec<Range>,
    rows: Vec<Row>,
}

impl Normalize {
    pub fn new(args: NormalizeArgs) -> Self {
        Self {
            method: args.method,
            ranges: args.columns.iter().map(|_| Range::default()).collect(),
            columns: args.columns,
            rows: Vec::new(),
        }
    }
}

impl Transform for Normalize {
    fn process(&mut self, rows: Vec<Row>, _out: &mut Vec<Row>, _errors: &mut Vec<RowError>) -> Result<()> {
        for row in rows {
            for (col, range) in self.columns.iter().zip(&mut self.ranges) {
                if let Some(x) = row.value(col).as_f64() {
                    range.push(x);
                }
            }
            self.rows.push(row);
        }
        Ok(())
    }

    fn flush(&mut self, out: &mut Vec<Row>, _errors: &mut Vec<RowError>) -> Result<()> {
        for mut row in self.rows.drain(..) {
            for (col, range) in self.columns.iter().zip(&self.ranges) {
                if let Some(cell) = row.get_mut(col) {
                    if let Some(x) = cell.as_f64() {
                        *cell = Value::Float(range.scale(self.method, x));
                    }
                }
            }
            out.push(row);
        }
        Ok(())
    }
}

/// Sample autocorrelation of one column for lags `0..=lags`.
pub struct Acf {
    column: String,
    lags: usize,
    values: Vec<f64>,
}

impl Acf {
    pub fn new(args: AcfArgs) -> Self {
        Self {
            column: args.column,
            lags: args.lags,
            values: Vec::new(),
        }
    }
}

/// `None` when the series is empty or constant.
pub fn autocorrelation(xs: &[f64], max_lag: usize) -> Option<Vec<f64>> {
    let n = xs.len();
    if n == 0 {
        return None;
    }
    let mean = xs.iter().sum::<f64>() / n as f64;
    let dev: Vec<f64> = xs.iter().map(|x| x - mean).collect();
    let var: f64 = dev.iter().map(|d| d * d).sum();
    if var == 0.0 {
        return None;
    }
    let max_lag = max_lag.min(n - 1);
    Some(
        (0..=max_lag)
            .map(|k| dev.iter().zip(&dev[k..]).map(|(a, b)| a * b).sum::<f64>() / var)
            .collect(),
    )
}

impl Transform for Acf {
    fn process(&mut self, rows: Vec<Row>, _out: &mut Vec<Row>, _errors: &mut Vec<RowError>) -> Result<()> {
        self.values
            .extend(rows.iter().filter_map(|r| r.value(&self.column).as_f64()));
        Ok(())
    }

    fn flush(&mut self, out: &mut Vec<Row>, _errors: &mut Vec<RowError>) -> Result<()> {
        let values = std::mem::take(&mut self.values);
        let Some(acf) = autocorrelation(&values, self.lags) else {
            return Ok(());
        };
        for (lag, r) in acf.into_iter().enumerate() {
            let mut row = Row::with_capacity(2);
            row.push("lag", Value::Int(lag as i64));
            row.push("acf", Value::Float(r));
            out.push(row);
        }
        Ok(())
    }
}
