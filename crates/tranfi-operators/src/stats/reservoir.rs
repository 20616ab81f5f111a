use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Fixed-size uniform sample of text values (Algorithm R). The generator has
/// a fixed seed, so the same column always yields the same sample.
#[derive(Debug, Clone)]
pub struct TextReservoir {
    items: Vec<String>,
    seen: u64,
    rng: StdRng,
}

pub const RESERVOIR_SIZE: usize = 10;
const SEED: u64 = 0x1234_5678_dead_beef;

impl Default for TextReservoir {
    fn default() -> Self {
        Self {
            items: Vec::with_capacity(RESERVOIR_SIZE),
            seen: 0,
            rng: StdRng::seed_from_u64(SEED),
        }
    }
}

impl TextReservoir {
    pub fn push(&mut self, text: String) {
        self.seen += 1;
        if self.items.len() < RESERVOIR_SIZE {
            self.items.push(text);
            return;
        }
        let j = self.rng.gen_range(0..self.seen);
        if let Some(slot) = usize::try_from(j).ok().and_then(|j| self.items.get_mut(j)) {
            *slot = text;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn joined(&self) -> String {
        self.items.join(";")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_everything_when_small() {
        let mut r = TextReservoir::default();
        assert!(r.is_empty());
        r.push("a".into());
        r.push("b".into());
        assert_eq!(r.joined(), "a;b");
    }

    #[test]
    fn bounded_and_reproducible() {
        let fill = || {
            let mut r = TextReservoir::default();
            (0..1000).for_each(|i| r.push(i.to_string()));
            r.joined()
        };
        let a = fill();
        assert_eq!(a.split(';').count(), RESERVOIR_SIZE);
        assert_eq!(a, fill());
        // Later values do get in.
        assert!(a.split(';').any(|v| v.parse::<u32>().is_ok_and(|n| n >= 10)), "{a}");
    }
}
