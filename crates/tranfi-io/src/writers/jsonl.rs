use tranfi_core::row::Row;

use crate::codec::Encoder;
use crate::error::Result;

/// One JSON object per row, keys in row order.
#[derive(Debug, Default)]
pub struct JsonlEncoder;

impl JsonlEncoder {
    pub fn new() -> Self {
        Self
    }
}

/// Append `row` as a single JSON object line. Non-finite floats are `null`.
pub fn row_to_json_line(row: &Row, out: &mut Vec<u8>) -> Result<()> {
    out.push(b'{');
    for (i, (name, value)) in row.iter().enumerate() {
        if i > 0 {
            out.push(b',');
        }
        serde_json::to_writer(&mut *out, name)?;
        out.push(b':');
        serde_json::to_writer(&mut *out, &value.to_json())?;
    }
    out.extend_from_slice(b"}\n");
    Ok(())
}

impl Encoder for JsonlEncoder {
    fn name(&self) -> &'static str {
        "codec.jsonl.encode"
    }

    fn write_rows(&mut self, rows: &[Row], out: &mut Vec<u8>) -> Result<()> {
        for row in rows {
            row_to_json_line(row, out)?;
        }
        Ok(())
    }

    fn finish(&mut self, _out: &mut Vec<u8>) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tranfi_core::value::Value;

    #[test]
    fn encodes_in_row_order() {
        let row = Row::from_iter([
            ("z", Value::Int(1)),
            ("a", Value::Float(f64::NAN)),
            ("s", Value::from("q\"x")),
            ("d", Value::infer("2024-03-01")),
            ("n", Value::Null),
        ]);
        let mut out = Vec::new();
        JsonlEncoder::new().write_rows(&[row], &mut out).expect("write");
        assert_eq!(
            String::from_utf8(out).expect("utf8"),
            "{\"z\":1,\"a\":null,\"s\":\"q\\\"x\",\"d\":\"2024-03-01\",\"n\":null}\n"
        );
    }
}
