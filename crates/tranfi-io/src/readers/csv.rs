//! Streaming CSV decoder.
//!
//! Bytes are buffered until the last newline that sits outside a quoted field;
//! everything before it is a run of complete records and is handed to the
//! `csv` crate in one go. The boundary scan follows the same field states as
//! the `csv` parser: a `"` opens a quoted field only at the start of a field,
//! and is a literal character anywhere else in an unquoted one. Scan state is
//! carried across pushes so a record split over many chunks is scanned once.

use csv::{ByteRecord, ReaderBuilder};
use tranfi_core::dag::CsvDecodeArgs;
use tranfi_core::error::RowError;
use tranfi_core::row::Row;
use tranfi_core::value::Value;

use crate::codec::Decoder;
use crate::error::Result;

const OP: &str = "codec.csv.decode";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scan {
    FieldStart,
    Unquoted,
    Quoted,
    /// A `"` inside a quoted field: either an escaped quote or the closing one.
    QuoteInQuoted,
}

pub struct CsvDecoder {
    args: CsvDecodeArgs,
    pending: Vec<u8>,
    scanned: usize,
    scan: Scan,
    header: Option<Vec<String>>,
    records: u64,
    at_start: bool,
}

impl CsvDecoder {
    pub fn new(args: CsvDecodeArgs) -> Self {
        Self {
            args,
            pending: Vec::new(),
            scanned: 0,
            scan: Scan::FieldStart,
            header: None,
            records: 0,
            at_start: true,
        }
    }

    /// Length of the prefix of `pending` made of complete records.
    fn complete_prefix(&mut self) -> usize {
        let delimiter = self.args.delimiter as u8;
        let mut cut = 0;
        let mut scan = self.scan;
        for (i, &b) in self.pending.iter().enumerate().skip(self.scanned) {
            scan = match (scan, b) {
                (Scan::Quoted, b'"') => Scan::QuoteInQuoted,
                (Scan::Quoted, _) => Scan::Quoted,
                (Scan::QuoteInQuoted, b'"') => Scan::Quoted,
                (Scan::FieldStart, b'"') => Scan::Quoted,
                (_, b'\n') => {
                    cut = i + 1;
                    Scan::FieldStart
                }
                (_, b'\r') => Scan::FieldStart,
                (_, b) if b == delimiter => Scan::FieldStart,
                _ => Scan::Unquoted,
            };
        }
        self.scan = scan;
        self.scanned = self.pending.len();
        cut
    }

    fn decode(&mut self, bytes: &[u8], out: &mut Vec<Row>, errors: &mut Vec<RowError>) -> Result<()> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(self.args.delimiter as u8)
            .from_reader(bytes);
        let mut record = ByteRecord::new();
        while reader.read_byte_record(&mut record)? {
            if is_blank(&record) {
                continue;
            }
            let fields: Vec<String> = record
                .iter()
                .map(|f| String::from_utf8_lossy(f).into_owned())
                .collect();

            if self.header.is_none() {
                if self.args.header {
                    self.header = Some(fields);
                    continue;
                }
                self.header = Some((1..=fields.len()).map(|i| format!("col{i}")).collect());
            }
            self.emit(fields, out, errors);
        }
        Ok(())
    }

    fn emit(&mut self, mut fields: Vec<String>, out: &mut Vec<Row>, errors: &mut Vec<RowError>) {
        self.records += 1;
        let Some(header) = self.header.as_ref() else {
            return;
        };
        let width = header.len();
        if fields.len() != width {
            if !self.args.repair {
                errors.push(
                    RowError::new(
                        OP,
                        format!("expected {} fields, got {}", width, fields.len()),
                    )
                    .at_row(self.records),
                );
                return;
            }
            #[cfg(feature = "tracing")]
            tracing::trace!(row = self.records, got = fields.len(), width, "repaired csv row");
            fields.resize(width, String::new());
        }
        let mut row = Row::with_capacity(width);
        for (name, field) in header.iter().zip(fields) {
            row.push(name.clone(), Value::infer(&field));
        }
        out.push(row);
    }
}

fn is_blank(record: &ByteRecord) -> bool {
    record.len() == 0 || (record.len() == 1 && record[0].is_empty())
}

impl Decoder for CsvDecoder {
    fn name(&self) -> &'static str {
        OP
    }

    fn push(&mut self, bytes: &[u8], out: &mut Vec<Row>, errors: &mut Vec<RowError>) -> Result<()> {
        let mut bytes = bytes;
        if self.at_start && !bytes.is_empty() {
            self.at_start = false;
            bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
        }
        self.pending.extend_from_slice(bytes);
        let cut = self.complete_prefix();
        if cut == 0 {
            return Ok(());
        }
        let chunk: Vec<u8> = self.pending.drain(..cut).collect();
        self.scanned -= cut;
        self.decode(&chunk, out, errors)
    }

    fn flush(&mut self, out: &mut Vec<Row>, errors: &mut Vec<RowError>) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let chunk = std::mem::take(&mut self.pending);
        self.scanned = 0;
        self.scan = Scan::FieldStart;
        self.decode(&chunk, out, errors)
    }

    fn batch_size(&self) -> Option<usize> {
        self.args.batch_size
    }
}
