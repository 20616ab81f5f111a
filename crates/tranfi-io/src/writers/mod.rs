pub mod csv;
pub mod jsonl;
pub mod table;
pub mod text;

pub use self::csv::CsvEncoder;
pub use self::jsonl::{row_to_json_line, JsonlEncoder};
pub use self::table::TableEncoder;
pub use self::text::TextEncoder;
