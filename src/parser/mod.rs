pub mod fields;
pub mod table;
pub mod types;

pub use fields::{interpret_fields, trimmed_unquoted};
pub use table::{parse_table_file, TableLine};
pub use types::{RecordKind, RecordOutcome, StatusCode, TestRecord};
