//! Whole-file table loading for `join` and `stack`.

use std::path::Path;

use tranfi_core::dag::{CsvDecodeArgs, LineDecodeArgs, OpSpec};
use tranfi_core::error::RowError;
use tranfi_core::row::Row;

use crate::buf::bounded_from_path;
use crate::codec::{decoder_for, Decoder};
use crate::error::{Error, Result};

const READ_CHUNK: usize = 64 * 1024;

/// Decode every row of `path`.
///
/// `.jsonl`/`.ndjson` files are read as JSON Lines, `.tsv` as tab-separated,
/// anything else as comma-separated CSV with a header.
pub fn read_table<P: AsRef<Path>>(path: P) -> Result<(Vec<Row>, Vec<RowError>)> {
    let path = path.as_ref();
    let mut decoder = decoder_for_path(path)?;

    let mut reader = bounded_from_path(path, READ_CHUNK)
        .map_err(|e| Error::Codec(format!("cannot open '{}': {e}", path.display())))?;
    let mut rows = Vec::new();
    let mut errors = Vec::new();
    reader.for_each_chunk(|chunk| decoder.push(chunk, &mut rows, &mut errors))?;
    decoder.flush(&mut rows, &mut errors)?;

    #[cfg(feature = "tracing")]
    tracing::debug!(path = %path.display(), rows = rows.len(), "loaded lookup table");

    Ok((rows, errors))
}

fn decoder_for_path(path: &Path) -> Result<Box<dyn Decoder>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    let spec = match ext.as_deref() {
        Some("jsonl" | "ndjson") => OpSpec::JsonlDecode(LineDecodeArgs::default()),
        Some("tsv") => OpSpec::CsvDecode(CsvDecodeArgs {
            delimiter: '\t',
            ..csv_args()
        }),
        _ => OpSpec::CsvDecode(csv_args()),
    };
    decoder_for(&spec).ok_or_else(|| Error::Codec(format!("no decoder for '{}'", path.display())))
}

fn csv_args() -> CsvDecodeArgs {
    CsvDecodeArgs {
        delimiter: ',',
        header: true,
        batch_size: None,
        repair: true,
    }
}
