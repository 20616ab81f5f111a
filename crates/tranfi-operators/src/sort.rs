//! Ordering operators: `sort`, `unique`, `top`.
//!
//! All three compare with `Value::sort_cmp`, a total order in which Null ranks
//! after every other value. Descending keys reverse it, so Null comes first.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

use tranfi_core::dag::{SortKey, TopArgs};
use tranfi_core::error::RowError;
use tranfi_core::row::Row;
use tranfi_core::value::{Value, ValueKey};

use crate::error::Result;
use crate::operator::Transform;

pub struct Sort {
    keys: Vec<SortKey>,
    rows: Vec<(Vec<Value>, Row)>,
}

impl Sort {
    pub fn new(keys: Vec<SortKey>) -> Self {
        Self {
            keys,
            rows: Vec::new(),
        }
    }
}

fn compare_keys(keys: &[SortKey], a: &[Value], b: &[Value]) -> Ordering {
    for (k, (x, y)) in keys.iter().zip(a.iter().zip(b)) {
        let ord = x.sort_cmp(y);
        let ord = if k.desc { ord.reverse() } else { ord };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

impl Transform for Sort {
    fn process(&mut self, rows: Vec<Row>, _out: &mut Vec<Row>, _errors: &mut Vec<RowError>) -> Result<()> {
        for row in rows {
            let key = self.keys.iter().map(|k| row.value(&k.name).clone()).collect();
            self.rows.push((key, row));
        }
        Ok(())
    }

    fn flush(&mut self, out: &mut Vec<Row>, _errors: &mut Vec<RowError>) -> Result<()> {
        let keys = &self.keys;
        // `sort_by` is stable: equal keys keep input order.
        self.rows.sort_by(|(a, _), (b, _)| compare_keys(keys, a, b));
        out.extend(self.rows.drain(..).map(|(_, row)| row));
        Ok(())
    }
}

/// First occurrence of each key tuple (or of each whole row).
pub struct Unique {
    columns: Vec<String>,
    seen: HashSet<Vec<ValueKey>>,
    kept: Vec<Row>,
}

impl Unique {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            seen: HashSet::new(),
            kept: Vec::new(),
        }
    }

    fn key(&self, row: &Row) -> Vec<ValueKey> {
        if self.columns.is_empty() {
            row.iter()
                .flat_map(|(name, v)| [ValueKey::Str(name.to_string()), ValueKey::from(v)])
                .collect()
        } else {
            self.columns
                .iter()
                .map(|c| ValueKey::from(row.value(c)))
                .collect()
        }
    }
}

impl Transform for Unique {
    fn process(&mut self, rows: Vec<Row>, _out: &mut Vec<Row>, _errors: &mut Vec<RowError>) -> Result<()> {
        for row in rows {
            let key = self.key(&row);
            if self.seen.insert(key) {
                self.kept.push(row);
            }
        }
        Ok(())
    }

    fn flush(&mut self, out: &mut Vec<Row>, _errors: &mut Vec<RowError>) -> Result<()> {
        out.append(&mut self.kept);
        self.seen.clear();
        Ok(())
    }
}

/// A candidate for `top`. Ordered so that the heap's maximum is the entry
/// that should be evicted first.
struct Ranked {
    key: Value,
    seq: u64,
    desc: bool,
    row: Row,
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        let by_key = if self.desc {
            other.key.sort_cmp(&self.key)
        } else {
            self.key.sort_cmp(&other.key)
        };
        by_key.then(self.seq.cmp(&other.seq))
    }
}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

/// The `n` rows with the greatest (or least) key. Memory is bounded by `n`.
pub struct Top {
    args: TopArgs,
    heap: BinaryHeap<Ranked>,
    seq: u64,
}

impl Top {
    pub fn new(args: TopArgs) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(args.n.min(4096) + 1),
            args,
            seq: 0,
        }
    }
}

impl Transform for Top {
    fn process(&mut self, rows: Vec<Row>, _out: &mut Vec<Row>, _errors: &mut Vec<RowError>) -> Result<()> {
        if self.args.n == 0 {
            return Ok(());
        }
        for row in rows {
            let key = row.value(&self.args.column).clone();
            self.seq += 1;
            if key.is_null() {
                continue;
            }
            self.heap.push(Ranked {
                key,
                seq: self.seq,
                desc: self.args.desc,
                row,
            });
            if self.heap.len() > self.args.n {
                self.heap.pop();
            }
        }
        Ok(())
    }

    fn flush(&mut self, out: &mut Vec<Row>, _errors: &mut Vec<RowError>) -> Result<()> {
        let heap = std::mem::take(&mut self.heap);
        out.extend(heap.into_sorted_vec().into_iter().map(|r| r.row));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{column, mk_row, run};

    fn key(name: &str, desc: bool) -> SortKey {
        SortKey {
            name: name.into(),
            desc,
        }
    }

    fn rows() -> Vec<Row> {
        vec![
            mk_row(&[("id", Value::Int(1)), ("p", Value::Int(5)), ("g", Value::from("b"))]),
            mk_row(&[("id", Value::Int(2)), ("p", Value::Null), ("g", Value::from("a"))]),
            mk_row(&[("id", Value::Int(3)), ("p", Value::Int(9)), ("g", Value::from("b"))]),
            mk_row(&[("id", Value::Int(4)), ("p", Value::Int(5)), ("g", Value::from("a"))]),
        ]
    }

    fn ids(out: &[Row]) -> Vec<Value> {
        column(out, "id")
    }

    #[test]
    fn sort_is_stable_with_nulls_last() {
        let (out, _) = run(&mut Sort::new(vec![key("p", false)]), rows());
        assert_eq!(ids(&out), vec![Value::Int(1), Value::Int(4), Value::Int(3), Value::Int(2)]);

        let (out, _) = run(&mut Sort::new(vec![key("p", true)]), rows());
        assert_eq!(ids(&out), vec![Value::Int(2), Value::Int(3), Value::Int(1), Value::Int(4)]);

        let (out, _) = run(&mut Sort::new(vec![key("g", false), key("p", true)]), rows());
        assert_eq!(ids(&out), vec![Value::Int(2), Value::Int(4), Value::Int(3), Value::Int(1)]);
    }

    #[test]
    fn unique_keeps_first_occurrence() {
        let (out, _) = run(&mut Unique::new(vec!["g".into()]), rows());
        assert_eq!(ids(&out), vec![Value::Int(1), Value::Int(2)]);

        let dup = vec![
            mk_row(&[("a", Value::Int(1))]),
            mk_row(&[("a", Value::Float(1.0))]),
            mk_row(&[("b", Value::Int(1))]),
        ];
        let (out, _) = run(&mut Unique::new(vec![]), dup);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn top_excludes_nulls_and_keeps_tie_order() {
        let args = |n, desc| TopArgs {
            n,
            column: "p".into(),
            desc,
        };
        let (out, _) = run(&mut Top::new(args(2, true)), rows());
        assert_eq!(ids(&out), vec![Value::Int(3), Value::Int(1)]);

        let (out, _) = run(&mut Top::new(args(2, false)), rows());
        assert_eq!(ids(&out), vec![Value::Int(1), Value::Int(4)]);

        let (out, _) = run(&mut Top::new(args(10, true)), rows());
        assert_eq!(out.len(), 3);
    }
}
