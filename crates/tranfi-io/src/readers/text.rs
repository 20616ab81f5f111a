use tranfi_core::error::RowError;
use tranfi_core::row::Row;
use tranfi_core::value::Value;

use crate::codec::{Decoder, LineSplitter};
use crate::error::Result;

/// Column holding the raw line for text decode, `grep` and text encode.
pub const LINE_COLUMN: &str = "_line";

/// One `_line` Str row per input line. Lines are never inferred.
pub struct TextDecoder {
    lines: LineSplitter,
    batch_size: Option<usize>,
}

impl TextDecoder {
    pub fn new(batch_size: Option<usize>) -> Self {
        Self {
            lines: LineSplitter::default(),
            batch_size,
        }
    }
}

fn line_row(line: &[u8]) -> Row {
    let mut row = Row::with_capacity(1);
    row.push(
        LINE_COLUMN,
        Value::Str(String::from_utf8_lossy(line).into_owned()),
    );
    row
}

impl Decoder for TextDecoder {
    fn name(&self) -> &'static str {
        "codec.text.decode"
    }

    fn push(&mut self, bytes: &[u8], out: &mut Vec<Row>, _errors: &mut Vec<RowError>) -> Result<()> {
        self.lines.push(bytes, |line| out.push(line_row(line)));
        Ok(())
    }

    fn flush(&mut self, out: &mut Vec<Row>, _errors: &mut Vec<RowError>) -> Result<()> {
        self.lines.flush(|line| out.push(line_row(line)));
        Ok(())
    }

    fn batch_size(&self) -> Option<usize> {
        self.batch_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_row_per_line() {
        let mut d = TextDecoder::new(None);
        let mut rows = Vec::new();
        let mut errs = Vec::new();
        d.push(b"alpha\r\n42\nlast", &mut rows, &mut errs).expect("push");
        assert_eq!(rows.len(), 2);
        d.flush(&mut rows, &mut errs).expect("flush");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].value(LINE_COLUMN), &Value::from("alpha"));
        assert_eq!(rows[1].value(LINE_COLUMN), &Value::from("42"));
    }
}
