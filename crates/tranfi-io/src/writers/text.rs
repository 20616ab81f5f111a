use tranfi_core::row::Row;

use crate::codec::Encoder;
use crate::error::Result;
use crate::readers::LINE_COLUMN;

/// Writes `_line` when the row has it, otherwise the cells joined by TAB.
#[derive(Debug, Default)]
pub struct TextEncoder;

impl TextEncoder {
    pub fn new() -> Self {
        Self
    }
}

impl Encoder for TextEncoder {
    fn name(&self) -> &'static str {
        "codec.text.encode"
    }

    fn write_rows(&mut self, rows: &[Row], out: &mut Vec<u8>) -> Result<()> {
        for row in rows {
            match row.get(LINE_COLUMN) {
                Some(line) => out.extend_from_slice(line.to_text().as_bytes()),
                None => {
                    for (i, v) in row.values().enumerate() {
                        if i > 0 {
                            out.push(b'\t');
                        }
                        out.extend_from_slice(v.to_text().as_bytes());
                    }
                }
            }
            out.push(b'\n');
        }
        Ok(())
    }

    fn finish(&mut self, _out: &mut Vec<u8>) -> Result<()> {
        Ok(())
    }
}
