//! Order-dependent column operators: running aggregates, windows, offsets
//! and gap filling. All of them stream; `lead` and `interpolate` hold back a
//! bounded number of rows.

use std::collections::VecDeque;

use tranfi_core::dag::{
    AnomalyArgs, DiffArgs, EwmaArgs, InterpMethod, InterpolateArgs, LeadArgs, StepArgs, StepFunc,
    WindowArgs, WindowFunc,
};
use tranfi_core::error::RowError;
use tranfi_core::row::Row;
use tranfi_core::value::Value;

use crate::error::Result;
use crate::operator::Transform;

fn float(x: Option<f64>) -> Value {
    x.map_or(Value::Null, Value::Float)
}

/// Running aggregate over all prior non-null values of a column.
pub struct Step {
    column: String,
    result: String,
    func: StepFunc,
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
    prev: Option<f64>,
}

impl Step {
    pub fn new(args: &StepArgs) -> Self {
        Self {
            column: args.column.clone(),
            result: args.result_name(),
            func: args.func,
            count: 0,
            sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            prev: None,
        }
    }

    fn next(&mut self, x: f64) -> Option<f64> {
        self.count += 1;
        self.sum += x;
        self.min = self.min.min(x);
        self.max = self.max.max(x);
        let prev = self.prev.replace(x);
        match self.func {
            StepFunc::RunningSum => Some(self.sum),
            StepFunc::RunningAvg => Some(self.sum / self.count as f64),
            StepFunc::RunningMin => Some(self.min),
            StepFunc::RunningMax => Some(self.max),
            StepFunc::RunningCount => Some(self.count as f64),
            StepFunc::Delta => prev.map(|p| x - p),
            StepFunc::Lag => prev,
            StepFunc::Ratio => prev.filter(|p| *p != 0.0).map(|p| x / p),
        }
    }
}

impl Transform for Step {
    fn process(&mut self, rows: Vec<Row>, out: &mut Vec<Row>, _errors: &mut Vec<RowError>) -> Result<()> {
        for mut row in rows {
            let v = match row.value(&self.column).as_f64() {
                Some(x) => float(self.next(x)),
                None => Value::Null,
            };
            row.set(self.result.as_str(), v);
            out.push(row);
        }
        Ok(())
    }
}

/// Aggregate over the last `size` non-null values.
pub struct Window {
    column: String,
    result: String,
    size: usize,
    func: WindowFunc,
    ring: VecDeque<f64>,
}

impl Window {
    pub fn new(args: &WindowArgs) -> Self {
        Self {
            column: args.column.clone(),
            result: args.result_name(),
            size: args.size,
            func: args.func,
            ring: VecDeque::with_capacity(args.size.min(4096)),
        }
    }

    fn current(&self) -> Option<f64> {
        if self.size == 0 || self.ring.len() < self.size {
            return None;
        }
        let it = self.ring.iter().copied();
        Some(match self.func {
            WindowFunc::Sum => it.sum(),
            WindowFunc::Avg => it.sum::<f64>() / self.size as f64,
            WindowFunc::Min => it.fold(f64::INFINITY, f64::min),
            WindowFunc::Max => it.fold(f64::NEG_INFINITY, f64::max),
            WindowFunc::Count => self.size as f64,
        })
    }
}

impl Transform for Window {
    fn process(&mut self, rows: Vec<Row>, out: &mut Vec<Row>, _errors: &mut Vec<RowError>) -> Result<()> {
        for mut row in rows {
            if let Some(x) = row.value(&self.column).as_f64() {
                if self.ring.len() == self.size {
                    self.ring.pop_front();
                }
                self.ring.push_back(x);
            }
            row.set(self.result.as_str(), float(self.current()));
            out.push(row);
        }
        Ok(())
    }
}

/// Appends the value `offset` rows ahead. Holds back exactly `offset` rows.
pub struct Lead {
    column: String,
    result: String,
    offset: usize,
    pending: VecDeque<Row>,
}

impl Lead {
    pub fn new(args: &LeadArgs) -> Self {
        Self {
            column: args.column.clone(),
            result: args.result_name(),
            offset: args.offset,
            pending: VecDeque::with_capacity(args.offset.min(4096) + 1),
        }
    }
}

impl Transform for Lead {
    fn process(&mut self, rows: Vec<Row>, out: &mut Vec<Row>, _errors: &mut Vec<RowError>) -> Result<()> {
        for row in rows {
            let ahead = row.value(&self.column).clone();
            self.pending.push_back(row);
            if self.pending.len() > self.offset {
                if let Some(mut front) = self.pending.pop_front() {
                    front.set(self.result.as_str(), ahead);
                    out.push(front);
                }
            }
        }
        Ok(())
    }

    fn flush(&mut self, out: &mut Vec<Row>, _errors: &mut Vec<RowError>) -> Result<()> {
        for mut row in self.pending.drain(..) {
            row.set(self.result.as_str(), Value::Null);
            out.push(row);
        }
        Ok(())
    }
}

/// Exponentially weighted moving average, seeded by the first value.
pub struct Ewma {
    column: String,
    result: String,
    alpha: f64,
    state: Option<f64>,
}

impl Ewma {
    pub fn new(args: &EwmaArgs) -> Self {
        Self {
            column: args.column.clone(),
            result: args
                .result
                .clone()
                .unwrap_or_else(|| format!("{}_ewma", args.column)),
            alpha: args.alpha,
            state: None,
        }
    }
}

impl Transform for Ewma {
    fn process(&mut self, rows: Vec<Row>, out: &mut Vec<Row>, _errors: &mut Vec<RowError>) -> Result<()> {
        for mut row in rows {
            let v = match row.value(&self.column).as_f64() {
                Some(x) => {
                    let next = match self.state {
                        Some(s) => self.alpha * x + (1.0 - self.alpha) * s,
                        None => x,
                    };
                    self.state = Some(next);
                    Value::Float(next)
                }
                None => Value::Null,
            };
            row.set(self.result.as_str(), v);
            out.push(row);
        }
        Ok(())
    }
}

/// k-th order difference via binomial weights over the last k values.
pub struct Diff {
    column: String,
    result: String,
    order: usize,
    /// Most recent first.
    history: VecDeque<f64>,
}

impl Diff {
    pub fn new(args: &DiffArgs) -> Self {
        Self {
            column: args.column.clone(),
            result: args
                .result
                .clone()
                .unwrap_or_else(|| format!("{}_diff", args.column)),
            order: args.order,
            history: VecDeque::with_capacity(args.order + 1),
        }
    }

    fn next(&mut self, x: f64) -> Option<f64> {
        let out = (self.history.len() >= self.order).then(|| {
            let mut acc = x;
            let mut binom = 1.0;
            let mut sign = 1.0;
            for (k, prev) in self.history.iter().take(self.order).enumerate() {
                let k = (k + 1) as f64;
                binom = binom * (self.order as f64 - k + 1.0) / k;
                sign = -sign;
                acc += sign * binom * prev;
            }
            acc
        });
        self.history.push_front(x);
        self.history.truncate(self.order);
        out
    }
}

impl Transform for Diff {
    fn process(&mut self, rows: Vec<Row>, out: &mut Vec<Row>, _errors: &mut Vec<RowError>) -> Result<()> {
        for mut row in rows {
            let v = match row.value(&self.column).as_f64() {
                Some(x) => float(self.next(x)),
                None => Value::Null,
            };
            row.set(self.result.as_str(), v);
            out.push(row);
        }
        Ok(())
    }
}

/// Flags values whose running z-score exceeds the threshold.
pub struct Anomaly {
    column: String,
    result: String,
    threshold: f64,
    n: u64,
    mean: f64,
    m2: f64,
}

impl Anomaly {
    pub fn new(args: &AnomalyArgs) -> Self {
        Self {
            column: args.column.clone(),
            result: args
                .result
                .clone()
                .unwrap_or_else(|| format!("{}_anomaly", args.column)),
            threshold: args.threshold,
            n: 0,
            mean: 0.0,
            m2: 0.0,
        }
    }

    fn observe(&mut self, x: f64) -> bool {
        self.n += 1;
        let delta = x - self.mean;
        self.mean += delta / self.n as f64;
        self.m2 += delta * (x - self.mean);
        if self.n < 2 {
            return false;
        }
        let sd = (self.m2 / (self.n - 1) as f64).sqrt();
        sd > 0.0 && ((x - self.mean) / sd).abs() > self.threshold
    }
}

impl Transform for Anomaly {
    fn process(&mut self, rows: Vec<Row>, out: &mut Vec<Row>, _errors: &mut Vec<RowError>) -> Result<()> {
        for mut row in rows {
            let v = match row.value(&self.column).as_f64() {
                Some(x) => Value::Int(i64::from(self.observe(x))),
                None => Value::Null,
            };
            row.set(self.result.as_str(), v);
            out.push(row);
        }
        Ok(())
    }
}

/// Fills Nulls in one column. Rows inside an open gap wait for the next
/// non-null value when the method needs it.
pub struct Interpolate {
    column: String,
    method: InterpMethod,
    last: Option<(u64, Value)>,
    index: u64,
    gap: Vec<(u64, Row)>,
}

impl Interpolate {
    pub fn new(args: InterpolateArgs) -> Self {
        Self {
            column: args.column,
            method: args.method,
            last: None,
            index: 0,
            gap: Vec::new(),
        }
    }

    fn close_gap(&mut self, next: Option<(u64, &Value)>, out: &mut Vec<Row>) {
        for (idx, mut row) in self.gap.drain(..) {
            let fill = match (self.method, &self.last, next) {
                (InterpMethod::Backward, _, Some((_, v))) => v.clone(),
                (InterpMethod::Linear, Some((i0, a)), Some((i1, b))) => {
                    match (a.as_f64(), b.as_f64()) {
                        (Some(a), Some(b)) => {
                            let t = (idx - i0) as f64 / (i1 - i0) as f64;
                            Value::Float(a + (b - a) * t)
                        }
                        _ => Value::Null,
                    }
                }
                _ => Value::Null,
            };
            row.set(self.column.as_str(), fill);
            out.push(row);
        }
    }
}

impl Transform for Interpolate {
    fn process(&mut self, rows: Vec<Row>, out: &mut Vec<Row>, _errors: &mut Vec<RowError>) -> Result<()> {
        for mut row in rows {
            let idx = self.index;
            self.index += 1;
            let v = row.value(&self.column).clone();

            if !v.is_null() {
                self.close_gap(Some((idx, &v)), out);
                self.last = Some((idx, v));
                out.push(row);
                continue;
            }
            match self.method {
                InterpMethod::Forward => {
                    if let Some((_, last)) = &self.last {
                        row.set(self.column.as_str(), last.clone());
                    }
                    out.push(row);
                }
                InterpMethod::Backward | InterpMethod::Linear => self.gap.push((idx, row)),
            }
        }
        Ok(())
    }

    fn flush(&mut self, out: &mut Vec<Row>, _errors: &mut Vec<RowError>) -> Result<()> {
        self.close_gap(None, out);
        Ok(())
    }
}
