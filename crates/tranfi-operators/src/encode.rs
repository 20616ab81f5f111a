//! Derived label and code columns: `bin`, `hash`, `onehot`, `label-encode`,
//! `split-data`.

use std::collections::HashMap;

use tranfi_core::dag::{BinArgs, LabelEncodeArgs, OnehotArgs, SplitDataArgs};
use tranfi_core::error::RowError;
use tranfi_core::hash::Djb2;
use tranfi_core::row::Row;
use tranfi_core::value::{Value, ValueKey};

use crate::error::Result;
use crate::operator::Transform;

/// Appends `<col>_bin`: `<b0`, `bi-bj`, or `bn+`.
pub struct Bin {
    column: String,
    result: String,
    boundaries: Vec<f64>,
}

impl Bin {
    pub fn new(args: BinArgs) -> Self {
        Self {
            result: format!("{}_bin", args.column),
            column: args.column,
            boundaries: args.boundaries,
        }
    }

    fn label(&self, x: f64) -> String {
        let fmt = |b: f64| Value::Float(b).to_text();
        let Some(first) = self.boundaries.first() else {
            return fmt(x);
        };
        if x < *first {
            return format!("<{}", fmt(*first));
        }
        match self.boundaries.windows(2).find(|w| x < w[1]) {
            Some(w) => format!("{}-{}", fmt(w[0]), fmt(w[1])),
            None => format!("{}+", fmt(self.boundaries[self.boundaries.len() - 1])),
        }
    }
}

impl Transform for Bin {
    fn process(&mut self, rows: Vec<Row>, out: &mut Vec<Row>, _errors: &mut Vec<RowError>) -> Result<()> {
        for mut row in rows {
            let label = match row.value(&self.column).as_f64() {
                Some(x) => Value::Str(self.label(x)),
                None => Value::Null,
            };
            row.set(self.result.as_str(), label);
            out.push(row);
        }
        Ok(())
    }
}

/// Appends `_hash`, a DJB2 digest of the text form of the listed (or all)
/// columns. Nulls contribute nothing.
pub struct Hash {
    columns: Vec<String>,
}

impl Hash {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }

    fn digest(&self, row: &Row) -> u32 {
        let mut h = Djb2::default();
        let mut feed = |v: &Value| {
            if !v.is_null() {
                h.update(v.to_text().as_bytes());
            }
        };
        if self.columns.is_empty() {
            row.values().for_each(&mut feed);
        } else {
            self.columns.iter().for_each(|c| feed(row.value(c)));
        }
        h.finish()
    }
}

impl Transform for Hash {
    fn process(&mut self, rows: Vec<Row>, out: &mut Vec<Row>, _errors: &mut Vec<RowError>) -> Result<()> {
        for mut row in rows {
            let h = self.digest(&row);
            row.set("_hash", Value::Int(i64::from(h)));
            out.push(row);
        }
        Ok(())
    }
}

/// One Int 0/1 column per distinct value. Blocking, since the full category
/// set decides every row's shape.
pub struct Onehot {
    args: OnehotArgs,
    rows: Vec<Row>,
    categories: Vec<String>,
    seen: HashMap<String, usize>,
}

impl Onehot {
    pub fn new(args: OnehotArgs) -> Self {
        Self {
            args,
            rows: Vec::new(),
            categories: Vec::new(),
            seen: HashMap::new(),
        }
    }
}

impl Transform for Onehot {
    fn process(&mut self, rows: Vec<Row>, _out: &mut Vec<Row>, _errors: &mut Vec<RowError>) -> Result<()> {
        for row in rows {
            let v = row.value(&self.args.column);
            if !v.is_null() {
                let text = v.to_text();
                if !self.seen.contains_key(&text) {
                    self.seen.insert(text.clone(), self.categories.len());
                    self.categories.push(text);
                }
            }
            self.rows.push(row);
        }
        Ok(())
    }

    fn flush(&mut self, out: &mut Vec<Row>, _errors: &mut Vec<RowError>) -> Result<()> {
        let names: Vec<String> = self
            .categories
            .iter()
            .map(|c| format!("{}_{}", self.args.column, c))
            .collect();
        for mut row in self.rows.drain(..) {
            let v = row.value(&self.args.column);
            let hit = if v.is_null() {
                None
            } else {
                self.seen.get(&v.to_text()).copied()
            };
            if self.args.drop {
                row.remove(&self.args.column);
            }
            for (i, name) in names.iter().enumerate() {
                row.set(name.as_str(), Value::Int(i64::from(hit == Some(i))));
            }
            out.push(row);
        }
        Ok(())
    }
}

/// `<col>_encoded`: 0-based index of the value in first-seen order.
pub struct LabelEncode {
    column: String,
    result: String,
    codes: HashMap<ValueKey, i64>,
}

impl LabelEncode {
    pub fn new(args: &LabelEncodeArgs) -> Self {
        Self {
            column: args.column.clone(),
            result: args
                .result
                .clone()
                .unwrap_or_else(|| format!("{}_encoded", args.column)),
            codes: HashMap::new(),
        }
    }
}

impl Transform for LabelEncode {
    fn process(&mut self, rows: Vec<Row>, out: &mut Vec<Row>, _errors: &mut Vec<RowError>) -> Result<()> {
        for mut row in rows {
            let v = row.value(&self.column);
            let code = if v.is_null() {
                Value::Null
            } else {
                let next = self.codes.len() as i64;
                Value::Int(*self.codes.entry(ValueKey::from(v)).or_insert(next))
            };
            row.set(self.result.as_str(), code);
            out.push(row);
        }
        Ok(())
    }
}

/// Deterministic train/test labelling from (seed, row index).
pub struct SplitData {
    args: SplitDataArgs,
    index: u64,
}

const LCG_MUL: u64 = 6364136223846793005;
const LCG_INC: u64 = 1442695040888963407;

/// Uniform in [0, 1) for a given seed and row index.
pub fn split_draw(seed: u64, index: u64) -> f64 {
    let mut x = seed ^ index.wrapping_mul(LCG_MUL).wrapping_add(LCG_INC);
    x = x.wrapping_mul(LCG_MUL).wrapping_add(LCG_INC);
    x = x.wrapping_mul(LCG_MUL).wrapping_add(LCG_INC);
    (x >> 33) as f64 / (1u64 << 31) as f64
}

impl SplitData {
    pub fn new(args: SplitDataArgs) -> Self {
        Self { args, index: 0 }
    }
}

impl Transform for SplitData {
    fn process(&mut self, rows: Vec<Row>, out: &mut Vec<Row>, _errors: &mut Vec<RowError>) -> Result<()> {
        for mut row in rows {
            let label = if split_draw(self.args.seed, self.index) < self.args.ratio {
                "train"
            } else {
                "test"
            };
            self.index += 1;
            row.set(self.args.result.as_str(), Value::from(label));
            out.push(row);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{column, ints, mk_row, run};

    #[test]
    fn bin_labels() {
        let mut b = Bin::new(BinArgs {
            column: "age".into(),
            boundaries: vec![18.0, 30.0, 50.0],
        });
        let (out, _) = run(&mut b, ints("age", &[5, 18, 45, 80]));
        assert_eq!(
            column(&out, "age_bin"),
            vec![
                Value::from("<18"),
                Value::from("18-30"),
                Value::from("30-50"),
                Value::from("50+")
            ]
        );
    }

    #[test]
    fn hash_skips_nulls_and_is_stable() {
        let mut h = Hash::new(vec![]);
        let rows = vec![
            mk_row(&[("a", Value::from("x")), ("b", Value::Null)]),
            mk_row(&[("a", Value::from("x"))]),
        ];
        let (out, _) = run(&mut h, rows);
        let mut expect = Djb2::default();
        expect.update(b"x");
        assert_eq!(out[0].value("_hash"), &Value::Int(i64::from(expect.finish())));
        assert_eq!(out[0].value("_hash"), out[1].value("_hash"));
    }

    #[test]
    fn onehot_first_seen_columns() {
        let rows = ["red", "blue", "red"]
            .iter()
            .map(|c| mk_row(&[("color", Value::from(*c))]))
            .collect();
        let mut o = Onehot::new(OnehotArgs {
            column: "color".into(),
            drop: true,
        });
        let (out, _) = run(&mut o, rows);
        assert_eq!(out[1].columns().collect::<Vec<_>>(), vec!["color_red", "color_blue"]);
        assert_eq!(column(&out, "color_blue"), vec![Value::Int(0), Value::Int(1), Value::Int(0)]);
    }

    #[test]
    fn label_encode_codes() {
        let rows = vec![
            mk_row(&[("c", Value::from("b"))]),
            mk_row(&[("c", Value::from("a"))]),
            mk_row(&[("c", Value::Null)]),
            mk_row(&[("c", Value::from("b"))]),
        ];
        let mut l = LabelEncode::new(&LabelEncodeArgs {
            column: "c".into(),
            result: None,
        });
        let (out, _) = run(&mut l, rows);
        assert_eq!(
            column(&out, "c_encoded"),
            vec![Value::Int(0), Value::Int(1), Value::Null, Value::Int(0)]
        );
    }

    #[test]
    fn split_data_is_deterministic() {
        let args = SplitDataArgs {
            ratio: 0.5,
            seed: 7,
            result: "_split".into(),
        };
        let rows: Vec<i64> = (0..200).collect();
        let (a, _) = run(&mut SplitData::new(args.clone()), ints("x", &rows));
        let (b, _) = run(&mut SplitData::new(args), ints("x", &rows));
        assert_eq!(column(&a, "_split"), column(&b, "_split"));
        let train = a.iter().filter(|r| r.value("_split") == &Value::from("train")).count();
        assert!(train > 50 && train < 150, "train = {train}");
    }
}
