//! Codec traits and construction from plan steps.

use tranfi_core::dag::OpSpec;
use tranfi_core::error::RowError;
use tranfi_core::row::Row;

use crate::error::Result;
use crate::readers::{CsvDecoder, JsonlDecoder, TextDecoder};
use crate::writers::{CsvEncoder, JsonlEncoder, TableEncoder, TextEncoder};

/// Push-based record decoder.
///
/// Invariants:
/// - `push` may be called with any split of the input; the rows produced
///   across all `push` calls plus `flush` are the same for every split.
/// - Rows that cannot be decoded become `RowError`s, never `Err`.
pub trait Decoder: Send {
    fn name(&self) -> &'static str;

    fn push(&mut self, bytes: &[u8], out: &mut Vec<Row>, errors: &mut Vec<RowError>) -> Result<()>;

    /// End of input: decode whatever is still buffered.
    fn flush(&mut self, out: &mut Vec<Row>, errors: &mut Vec<RowError>) -> Result<()>;

    /// Preferred batch size, if the step set one.
    fn batch_size(&self) -> Option<usize> {
        None
    }
}

/// Appends encoded bytes to a caller-owned buffer.
pub trait Encoder: Send {
    fn name(&self) -> &'static str;

    fn write_rows(&mut self, rows: &[Row], out: &mut Vec<u8>) -> Result<()>;

    /// End of input. Buffering encoders (table) emit everything here.
    fn finish(&mut self, out: &mut Vec<u8>) -> Result<()>;
}

/// `None` if `spec` is not a decoder step.
pub fn decoder_for(spec: &OpSpec) -> Option<Box<dyn Decoder>> {
    match spec {
        OpSpec::CsvDecode(args) => Some(Box::new(CsvDecoder::new(args.clone()))),
        OpSpec::JsonlDecode(args) => Some(Box::new(JsonlDecoder::new(args.batch_size))),
        OpSpec::TextDecode(args) => Some(Box::new(TextDecoder::new(args.batch_size))),
        _ => None,
    }
}

/// `None` if `spec` is not an encoder step.
pub fn encoder_for(spec: &OpSpec) -> Option<Box<dyn Encoder>> {
    match spec {
        OpSpec::CsvEncode(args) => Some(Box::new(CsvEncoder::new(args.clone()))),
        OpSpec::JsonlEncode => Some(Box::new(JsonlEncoder::new())),
        OpSpec::TextEncode => Some(Box::new(TextEncoder::new())),
        OpSpec::TableEncode(args) => Some(Box::new(TableEncoder::new(args.clone()))),
        _ => None,
    }
}

/// Splits a byte stream into complete `\n`-terminated lines, keeping the
/// unterminated tail between pushes.
#[derive(Debug, Default)]
pub(crate) struct LineSplitter {
    pending: Vec<u8>,
}

impl LineSplitter {
    pub(crate) fn push(&mut self, bytes: &[u8], mut each: impl FnMut(&[u8])) {
        self.pending.extend_from_slice(bytes);
        let Some(last_nl) = self.pending.iter().rposition(|b| *b == b'\n') else {
            return;
        };
        for line in self.pending[..last_nl].split(|b| *b == b'\n') {
            each(strip_cr(line));
        }
        self.pending.drain(..=last_nl);
    }

    pub(crate) fn flush(&mut self, mut each: impl FnMut(&[u8])) {
        if !self.pending.is_empty() {
            each(strip_cr(&self.pending));
            self.pending.clear();
        }
    }
}

fn strip_cr(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines_of(chunks: &[&[u8]]) -> Vec<String> {
        let mut s = LineSplitter::default();
        let mut out = Vec::new();
        for c in chunks {
            s.push(c, |l| out.push(String::from_utf8_lossy(l).into_owned()));
        }
        s.flush(|l| out.push(String::from_utf8_lossy(l).into_owned()));
        out
    }

    #[test]
    fn splits_across_chunks() {
        assert_eq!(lines_of(&[b"ab", b"c\r\nd", b"e\n"]), vec!["abc", "de"]);
        assert_eq!(lines_of(&[b"x\ny"]), vec!["x", "y"]);
    }
}
