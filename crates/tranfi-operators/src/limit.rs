use std::collections::VecDeque;

use tranfi_core::error::RowError;
use tranfi_core::row::Row;

use crate::error::Result;
use crate::operator::Transform;

/// First `n` rows. Once it has them it reports done so the pipeline can stop
/// decoding.
pub struct Head {
    remaining: usize,
}

impl Head {
    pub fn new(n: usize) -> Self {
        Self { remaining: n }
    }

    pub fn is_done(&self) -> bool {
        self.remaining == 0
    }
}

impl Transform for Head {
    fn process(&mut self, rows: Vec<Row>, out: &mut Vec<Row>, _errors: &mut Vec<RowError>) -> Result<()> {
        let take = rows.len().min(self.remaining);
        self.remaining -= take;
        out.extend(rows.into_iter().take(take));
        Ok(())
    }
}

pub struct Skip {
    remaining: usize,
}

impl Skip {
    pub fn new(n: usize) -> Self {
        Self { remaining: n }
    }
}

impl Transform for Skip {
    fn process(&mut self, rows: Vec<Row>, out: &mut Vec<Row>, _errors: &mut Vec<RowError>) -> Result<()> {
        let drop = rows.len().min(self.remaining);
        self.remaining -= drop;
        out.extend(rows.into_iter().skip(drop));
        Ok(())
    }
}

/// Last `n` rows, held in a ring.
pub struct Tail {
    n: usize,
    ring: VecDeque<Row>,
}

impl Tail {
    pub fn new(n: usize) -> Self {
        Self {
            n,
            ring: VecDeque::with_capacity(n.min(4096)),
        }
    }
}

impl Transform for Tail {
    fn process(&mut self, rows: Vec<Row>, _out: &mut Vec<Row>, _errors: &mut Vec<RowError>) -> Result<()> {
        if self.n == 0 {
            return Ok(());
        }
        for row in rows {
            if self.ring.len() == self.n {
                self.ring.pop_front();
            }
            self.ring.push_back(row);
        }
        Ok(())
    }

    fn flush(&mut self, out: &mut Vec<Row>, _errors: &mut Vec<RowError>) -> Result<()> {
        out.extend(self.ring.drain(..));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{column, ints, mk_row, run};
    use tranfi_core::value::Value;

    #[test]
    fn head_stops_and_reports_done() {
        let mut h = Head::new(2);
        let mut out = Vec::new();
        let mut errs = Vec::new();
        h.process(ints("x", &[1, 2, 3]), &mut out, &mut errs).expect("process");
        assert!(h.is_done());
        h.process(ints("x", &[4]), &mut out, &mut errs).expect("process");
        assert_eq!(column(&out, "x"), vec![Value::Int(1), Value::Int(2)]);
        assert!(Head::new(0).is_done());
    }

    #[test]
    fn skip_across_batches() {
        let (out, _) = run(&mut Skip::new(2), ints("x", &[1, 2, 3, 4]));
        assert_eq!(column(&out, "x"), vec![Value::Int(3), Value::Int(4)]);
    }

    #[test]
    fn tail_keeps_last_rows() {
        let rows = ["Alice", "Bob", "Charlie"]
            .iter()
            .map(|n| mk_row(&[("name", Value::from(*n))]))
            .collect();
        let (out, _) = run(&mut Tail::new(2), rows);
        assert_eq!(
            column(&out, "name"),
            vec![Value::from("Bob"), Value::from("Charlie")]
        );
    }
}
