// monitoring/mod.rs
pub mod event_log;

pub use event_log::{read_records, CsvEventLog, EventSink, LogSink, Tee};
