pub mod csv;
pub mod jsonl;
pub mod text;

pub use self::csv::CsvDecoder;
pub use self::jsonl::JsonlDecoder;
pub use self::text::{TextDecoder, LINE_COLUMN};
