//! HyperLogLog distinct-count sketch with 2^10 registers.

use tranfi_core::hash::fnv1a_mix;

const P: u32 = 10;
const M: usize = 1 << P;

#[derive(Debug, Clone)]
pub struct Hll {
    registers: Box<[u8; M]>,
}

impl Default for Hll {
    fn default() -> Self {
        Self {
            registers: Box::new([0; M]),
        }
    }
}

impl Hll {
    pub fn insert(&mut self, bytes: &[u8]) {
        let h = fnv1a_mix(bytes);
        let idx = (h >> (64 - P)) as usize;
        let rest = h << P;
        let rank = (rest.leading_zeros() + 1).min(64 - P + 1) as u8;
        if let Some(r) = self.registers.get_mut(idx) {
            *r = (*r).max(rank);
        }
    }

    pub fn estimate(&self) -> u64 {
        let m = M as f64;
        let alpha = 0.7213 / (1.0 + 1.079 / m);
        let mut sum = 0.0;
        let mut zeros = 0usize;
        for &r in self.registers.iter() {
            sum += 2f64.powi(-i32::from(r));
            if r == 0 {
                zeros += 1;
            }
        }
        let raw = alpha * m * m / sum;
        let est = if raw <= 2.5 * m && zeros > 0 {
            m * (m / zeros as f64).ln()
        } else {
            raw
        };
        est.round() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_small() {
        let mut h = Hll::default();
        assert_eq!(h.estimate(), 0);
        for s in ["a", "b", "c", "a", "b"] {
            h.insert(s.as_bytes());
        }
        assert_eq!(h.estimate(), 3);
    }

    #[test]
    fn within_error_bound() {
        let mut h = Hll::default();
        for i in 0..20_000 {
            h.insert(i.to_string().as_bytes());
        }
        let est = h.estimate() as f64;
        // Standard error at p=10 is about 3.3%.
        assert!((est - 20_000.0).abs() / 20_000.0 < 0.12, "estimate {est}");
    }
}
