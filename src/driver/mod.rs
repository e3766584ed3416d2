pub mod log_sink;
pub mod process;
pub mod traits;

pub use log_sink::{EventLogSink, MemoryLogSink};
pub use process::{ProcessProbe, ProcessScriptHost, UnavailableProbe};
