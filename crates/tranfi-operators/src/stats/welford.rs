//! Running mean, variance and higher central moments in one pass.

/// Invariant: after `n` pushes, `mean` is the mean of those values and
/// `m2`, `m3`, `m4` are the sums of the 2nd..4th powers of deviations from it.
#[derive(Debug, Clone, Default)]
pub struct Moments {
    n: u64,
    mean: f64,
    m2: f64,
    m3: f64,
    m4: f64,
}

impl Moments {
    pub fn push(&mut self, x: f64) {
        let n1 = self.n as f64;
        self.n += 1;
        let n = self.n as f64;
        let delta = x - self.mean;
        let delta_n = delta / n;
        let delta_n2 = delta_n * delta_n;
        let term1 = delta * delta_n * n1;

        self.mean += delta_n;
        self.m4 += term1 * delta_n2 * (n * n - 3.0 * n + 3.0) + 6.0 * delta_n2 * self.m2
            - 4.0 * delta_n * self.m3;
        self.m3 += term1 * delta_n * (n - 2.0) - 3.0 * delta_n * self.m2;
        self.m2 += term1;
    }

    pub fn count(&self) -> u64 {
        self.n
    }

    pub fn mean(&self) -> Option<f64> {
        (self.n > 0).then_some(self.mean)
    }

    /// Sample variance (n - 1 denominator).
    pub fn variance(&self) -> Option<f64> {
        (self.n > 1).then(|| self.m2 / (self.n - 1) as f64)
    }

    pub fn stddev(&self) -> Option<f64> {
        self.variance().map(f64::sqrt)
    }

    fn flat(&self) -> bool {
        self.m2 / self.n as f64 <= 1e-15
    }

    /// Population skewness; 0 for constant input.
    pub fn skewness(&self) -> Option<f64> {
        if self.n < 3 {
            return None;
        }
        if self.flat() {
            return Some(0.0);
        }
        let n = self.n as f64;
        Some(n.sqrt() * self.m3 / self.m2.powf(1.5))
    }

    /// Excess kurtosis; 0 for constant input.
    pub fn kurtosis(&self) -> Option<f64> {
        if self.n < 4 {
            return None;
        }
        if self.flat() {
            return Some(0.0);
        }
        let n = self.n as f64;
        Some(n * self.m4 / (self.m2 * self.m2) - 3.0)
    }
}
