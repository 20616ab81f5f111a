//! Uniform row sampling (reservoir, Algorithm R).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tranfi_core::error::RowError;
use tranfi_core::row::Row;

use crate::error::Result;
use crate::operator::Transform;

/// Keeps `min(n, input)` rows chosen uniformly; emits them in input order.
/// Unseeded samplers draw from OS entropy.
pub struct Sample {
    n: usize,
    rng: StdRng,
    seen: u64,
    reservoir: Vec<(u64, Row)>,
}

impl Sample {
    pub fn new(n: usize, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Self {
            n,
            rng,
            seen: 0,
            reservoir: Vec::with_capacity(n.min(4096)),
        }
    }
}

impl Transform for Sample {
    fn process(&mut self, rows: Vec<Row>, _out: &mut Vec<Row>, _errors: &mut Vec<RowError>) -> Result<()> {
        if self.n == 0 {
            return Ok(());
        }
        for row in rows {
            let idx = self.seen;
            self.seen += 1;
            if self.reservoir.len() < self.n {
                self.reservoir.push((idx, row));
                continue;
            }
            let j = self.rng.gen_range(0..self.seen);
            if let Some(slot) = usize::try_from(j).ok().and_then(|j| self.reservoir.get_mut(j)) {
                *slot = (idx, row);
            }
        }
        Ok(())
    }

    fn flush(&mut self, out: &mut Vec<Row>, _errors: &mut Vec<RowError>) -> Result<()> {
        self.reservoir.sort_by_key(|(idx, _)| *idx);
        out.extend(self.reservoir.drain(..).map(|(_, row)| row));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{column, ints, run};
    use tranfi_core::value::Value;

    #[test]
    fn sample_size_and_membership() {
        let input: Vec<i64> = (0..100).collect();
        let (out, _) = run(&mut Sample::new(10, Some(1)), ints("x", &input));
        assert_eq!(out.len(), 10);
        let xs: Vec<i64> = column(&out, "x")
            .iter()
            .filter_map(Value::as_i64)
            .collect();
        assert!(xs.windows(2).all(|w| w[0] < w[1]), "input order: {xs:?}");
        assert!(xs.iter().all(|x| (0..100).contains(x)));
    }

    #[test]
    fn seeded_is_reproducible_and_small_inputs_pass_through() {
        let input: Vec<i64> = (0..50).collect();
        let (a, _) = run(&mut Sample::new(5, Some(9)), ints("x", &input));
        let (b, _) = run(&mut Sample::new(5, Some(9)), ints("x", &input));
        assert_eq!(column(&a, "x"), column(&b, "x"));

        let (all, _) = run(&mut Sample::new(10, None), ints("x", &[1, 2, 3]));
        assert_eq!(all.len(), 3);
    }
}
