//! CSV encoder. The header is fixed by the first row seen; later rows are
//! projected onto it.

use csv::WriterBuilder;
use tranfi_core::dag::CsvEncodeArgs;
use tranfi_core::row::Row;

use crate::codec::Encoder;
use crate::error::Result;

pub struct CsvEncoder {
    args: CsvEncodeArgs,
    header: Option<Vec<String>>,
}

impl CsvEncoder {
    pub fn new(args: CsvEncodeArgs) -> Self {
        Self { args, header: None }
    }
}

impl Encoder for CsvEncoder {
    fn name(&self) -> &'static str {
        "codec.csv.encode"
    }

    fn write_rows(&mut self, rows: &[Row], out: &mut Vec<u8>) -> Result<()> {
        let Some(first) = rows.first() else {
            return Ok(());
        };
        let mut writer = WriterBuilder::new()
            .delimiter(self.args.delimiter as u8)
            .has_headers(false)
            .from_writer(&mut *out);

        let header = match self.header.take() {
            Some(h) => h,
            None => {
                let h: Vec<String> = first.columns().map(str::to_string).collect();
                if self.args.header {
                    writer.write_record(&h)?;
                }
                h
            }
        };

        let mut record: Vec<String> = Vec::with_capacity(header.len());
        for row in rows {
            record.clear();
            record.extend(header.iter().map(|name| row.value(name).to_text()));
            writer.write_record(&record)?;
        }
        writer.flush()?;
        self.header = Some(header);
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

    fn args() -> CsvEncodeArgs {
        CsvEncodeArgs {
            delimiter: ',',
            header: true,
        }
    }

    #[test]
    fn header_from_first_row_and_quoting() {
        let mut enc = CsvEncoder::new(args());
        let mut out = Vec::new();
        let a = Row::from_iter([("name", Value::from("Smith, J")), ("age", Value::Int(30))]);
        let b = Row::from_iter([("age", Value::Float(2.0)), ("extra", Value::Int(1))]);
        enc.write_rows(&[a], &mut out).expect("write");
        enc.write_rows(&[b], &mut out).expect("write");
        enc.finish(&mut out).expect("finish");
        assert_eq!(
            String::from_utf8(out).expect("utf8"),
            "name,age\n\"Smith, J\",30\n,2\n"
        );
    }

    #[test]
    fn tab_delimiter_without_header() {
        let mut enc = CsvEncoder::new(CsvEncodeArgs {
            delimiter: '\t',
            header: false,
        });
        let mut out = Vec::new();
        let r = Row::from_iter([("a", Value::Int(1)), ("b", Value::Null)]);
        enc.write_rows(&[r], &mut out).expect("write");
        assert_eq!(out, b"1\t\n");
    }
}
