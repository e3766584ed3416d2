pub mod driver;
pub mod error;
pub mod parser;
pub mod report;
pub mod runner;
pub mod utils;

// Re-export common items
pub use error::{is_shutdown_signal, RecordError};
pub use parser::{RecordKind, RecordOutcome, StatusCode, TestRecord};
pub use report::generate_report;
pub use runner::{check_tables, run_tables, CommandPipeline, TableRunner};
