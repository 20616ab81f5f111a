//! Streaming equal-width histogram.
//!
//! Values are buffered until `BUFFER_LIMIT`, so small inputs get exact bins
//! over their true range. After that the bins are fixed and the range grows by
//! merging adjacent bin pairs (doubling the width) whenever a value falls
//! outside it.

use tranfi_core::value::Value;

pub const BINS: usize = 32;
const BUFFER_LIMIT: usize = 4096;

#[derive(Debug, Clone, Default)]
pub struct Histogram {
    buffer: Vec<f64>,
    bins: Option<Bins>,
}

#[derive(Debug, Clone)]
struct Bins {
    lo: f64,
    width: f64,
    counts: [u64; BINS],
}

impl Bins {
    fn over(values: &[f64]) -> Option<Self> {
        let (lo, hi) = min_max(values)?;
        let span = hi - lo;
        let width = if span > 0.0 { span / BINS as f64 } else { 1.0 / BINS as f64 };
        let mut bins = Self {
            lo,
            width,
            counts: [0; BINS],
        };
        for &x in values {
            bins.place(x);
        }
        Some(bins)
    }

    fn hi(&self) -> f64 {
        self.lo + self.width * BINS as f64
    }

    fn add(&mut self, x: f64) {
        while x < self.lo {
            self.grow_down();
        }
        // The top edge is inclusive for the value that set it.
        while x > self.hi() {
            self.grow_up();
        }
        self.place(x);
    }

    fn place(&mut self, x: f64) {
        let idx = ((x - self.lo) / self.width) as usize;
        self.counts[idx.min(BINS - 1)] += 1;
    }

    fn merged(&self) -> [u64; BINS / 2] {
        let mut half = [0; BINS / 2];
        for (i, slot) in half.iter_mut().enumerate() {
            *slot = self.counts[2 * i] + self.counts[2 * i + 1];
        }
        half
    }

    fn grow_up(&mut self) {
        let half = self.merged();
        self.counts = [0; BINS];
        self.counts[..BINS / 2].copy_from_slice(&half);
        self.width *= 2.0;
    }

    fn grow_down(&mut self) {
        let half = self.merged();
        let span = self.width * BINS as f64;
        self.counts = [0; BINS];
        self.counts[BINS / 2..].copy_from_slice(&half);
        self.lo -= span;
        self.width *= 2.0;
    }
}

fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    values.iter().fold(None, |acc, &x| match acc {
        None => Some((x, x)),
        Some((lo, hi)) => Some((lo.min(x), hi.max(x))),
    })
}

impl Histogram {
    pub fn push(&mut self, x: f64) {
        if !x.is_finite() {
            return;
        }
        if let Some(bins) = &mut self.bins {
            bins.add(x);
            return;
        }
        self.buffer.push(x);
        if self.buffer.len() >= BUFFER_LIMIT {
            self.bins = Bins::over(&self.buffer);
            self.buffer = Vec::new();
        }
    }

    /// `lo:hi:c1;c2;...;c32`, or `None` when nothing numeric was seen.
    pub fn encode(&self) -> Option<String> {
        let (lo, hi, counts) = match &self.bins {
            Some(b) => (b.lo, b.hi(), b.counts),
            None => {
                let (lo, hi) = min_max(&self.buffer)?;
                (lo, hi, Bins::over(&self.buffer)?.counts)
            }
        };
        let counts: Vec<String> = counts.iter().map(u64::to_string).collect();
        Some(format!(
            "{}:{}:{}",
            Value::Float(lo).to_text(),
            Value::Float(hi).to_text(),
            counts.join(";")
        ))
    }
}
