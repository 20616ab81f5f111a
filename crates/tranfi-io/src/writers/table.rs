//! Markdown table encoder.
//!
//! ```text
//! | name  | age |
//! | ----- | --- |
//! | Alice |  30 |
//! ```
//!
//! Everything is buffered until `finish`, since widths depend on every row.

use tranfi_core::dag::TableEncodeArgs;
use tranfi_core::row::Row;

use crate::codec::Encoder;
use crate::error::Result;

struct Cell {
    text: String,
    numeric: bool,
}

pub struct TableEncoder {
    args: TableEncodeArgs,
    columns: Option<Vec<String>>,
    rows: Vec<Vec<Cell>>,
}

impl TableEncoder {
    pub fn new(args: TableEncodeArgs) -> Self {
        Self {
            args,
            columns: None,
            rows: Vec::new(),
        }
    }

    fn full(&self) -> bool {
        self.args.max_rows > 0 && self.rows.len() >= self.args.max_rows
    }
}

fn truncate(s: &str, width: usize) -> &str {
    match s.char_indices().nth(width) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn write_cell(out: &mut String, text: &str, width: usize, right: bool) {
    let text = truncate(text, width);
    let pad = width - text.chars().count();
    if right {
        out.extend(std::iter::repeat(' ').take(pad));
        out.push_str(text);
    } else {
        out.push_str(text);
        out.extend(std::iter::repeat(' ').take(pad));
    }
}

impl Encoder for TableEncoder {
    fn name(&self) -> &'static str {
        "codec.table.encode"
    }

    fn write_rows(&mut self, rows: &[Row], _out: &mut Vec<u8>) -> Result<()> {
        for row in rows {
            if self.full() {
                break;
            }
            let columns = self
                .columns
                .get_or_insert_with(|| row.columns().map(str::to_string).collect());
            let cells = columns
                .iter()
                .map(|name| {
                    let v = row.value(name);
                    Cell {
                        text: v.to_text(),
                        numeric: v.is_numeric(),
                    }
                })
                .collect();
            self.rows.push(cells);
        }
        Ok(())
    }

    fn finish(&mut self, out: &mut Vec<u8>) -> Result<()> {
        let Some(columns) = self.columns.take() else {
            return Ok(());
        };

        let mut widths: Vec<usize> = columns.iter().map(|c| c.chars().count()).collect();
        for row in &self.rows {
            for (w, cell) in widths.iter_mut().zip(row) {
                *w = (*w).max(cell.text.chars().count());
            }
        }
        if self.args.max_width > 0 {
            for w in &mut widths {
                *w = (*w).min(self.args.max_width);
            }
        }

        let mut text = String::new();
        let mut line = |cells: &mut dyn Iterator<Item = (&str, usize, bool)>| {
            text.push('|');
            for (cell, width, right) in cells {
                text.push(' ');
                write_cell(&mut text, cell, width, right);
                text.push_str(" |");
            }
            text.push('\n');
        };

        line(&mut columns.iter().zip(&widths).map(|(c, w)| (c.as_str(), *w, false)));
        let dashes: Vec<String> = widths.iter().map(|w| "-".repeat((*w).max(1))).collect();
        line(&mut dashes.iter().zip(&widths).map(|(d, w)| (d.as_str(), (*w).max(1), false)));
        for row in &self.rows {
            line(
                &mut row
                    .iter()
                    .zip(&widths)
                    .map(|(c, w)| (c.text.as_str(), *w, c.numeric)),
            );
        }

        out.extend_from_slice(text.as_bytes());
        self.rows.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tranfi_core::value::Value;

    fn encode(args: TableEncodeArgs, rows: &[Row]) -> String {
        let mut enc = TableEncoder::new(args);
        let mut out = Vec::new();
        enc.write_rows(rows, &mut out).expect("write");
        assert!(out.is_empty());
        enc.finish(&mut out).expect("finish");
        String::from_utf8(out).expect("utf8")
    }

    fn people() -> Vec<Row> {
        vec![
            Row::from_iter([("name", Value::from("Alice")), ("age", Value::Int(30))]),
            Row::from_iter([("name", Value::from("Bo")), ("age", Value::Int(5))]),
        ]
    }

    #[test]
    fn aligned_markdown() {
        let got = encode(
            TableEncodeArgs {
                max_width: 40,
                max_rows: 0,
            },
            &people(),
        );
        assert_eq!(
            got,
            "| name  | age |\n| ----- | --- |\n| Alice |  30 |\n| Bo    |   5 |\n"
        );
    }

    #[test]
    fn width_cap_and_row_limit() {
        let got = encode(
            TableEncodeArgs {
                max_width: 3,
                max_rows: 1,
            },
            &people(),
        );
        assert_eq!(got, "| nam | age |\n| --- | --- |\n| Ali |  30 |\n");
    }
}
