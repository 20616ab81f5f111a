//! JSON Lines decoder. Key order of each object becomes column order.

use std::fmt;

use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use tranfi_core::error::RowError;
use tranfi_core::row::Row;
use tranfi_core::value::Value;

use crate::codec::{Decoder, LineSplitter};
use crate::error::Result;

const OP: &str = "codec.jsonl.decode";

pub struct JsonlDecoder {
    lines: LineSplitter,
    batch_size: Option<usize>,
    line_no: u64,
}

impl JsonlDecoder {
    pub fn new(batch_size: Option<usize>) -> Self {
        Self {
            lines: LineSplitter::default(),
            batch_size,
            line_no: 0,
        }
    }
}

fn decode_line(line: &[u8], line_no: u64, out: &mut Vec<Row>, errors: &mut Vec<RowError>) {
    if line.iter().all(u8::is_ascii_whitespace) {
        return;
    }
    match serde_json::from_slice::<Object>(line) {
        Ok(obj) => out.push(obj.0),
        Err(e) => errors.push(RowError::new(OP, format!("invalid JSON line: {e}")).at_row(line_no)),
    }
}

impl Decoder for JsonlDecoder {
    fn name(&self) -> &'static str {
        OP
    }

    fn push(&mut self, bytes: &[u8], out: &mut Vec<Row>, errors: &mut Vec<RowError>) -> Result<()> {
        let line_no = &mut self.line_no;
        self.lines.push(bytes, |line| {
            *line_no += 1;
            decode_line(line, *line_no, out, errors);
        });
        Ok(())
    }

    fn flush(&mut self, out: &mut Vec<Row>, errors: &mut Vec<RowError>) -> Result<()> {
        let line_no = &mut self.line_no;
        self.lines.flush(|line| {
            *line_no += 1;
            decode_line(line, *line_no, out, errors);
        });
        Ok(())
    }

    fn batch_size(&self) -> Option<usize> {
        self.batch_size
    }
}

/// A top-level JSON object read straight into a `Row`, in document order.
struct Object(Row);

impl<'de> Deserialize<'de> for Object {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        d.deserialize_map(ObjectVisitor)
    }
}

struct ObjectVisitor;

impl<'de> Visitor<'de> for ObjectVisitor {
    type Value = Object;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Object, A::Error> {
        let mut row = Row::with_capacity(map.size_hint().unwrap_or(8));
        while let Some((key, value)) = map.next_entry::<String, serde_json::Value>()? {
            row.set(key, Value::from_json(&value));
        }
        Ok(Object(row))
    }
}
