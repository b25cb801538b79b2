use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::Path;

use crate::error::EventLogError;
use crate::shared_data::{current_timestamp, EventRecord, TimedEvent};

/// Destination for the arbiter's event stream.
pub trait EventSink {
    fn record(&mut self, events: &[TimedEvent]) -> Result<(), EventLogError>;
}

/// Keeps everything in memory.
impl EventSink for Vec<TimedEvent> {
    fn record(&mut self, events: &[TimedEvent]) -> Result<(), EventLogError> {
        self.extend_from_slice(events);
        Ok(())
    }
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn record(&mut self, events: &[TimedEvent]) -> Result<(), EventLogError> {
        (**self).record(events)
    }
}

/// Mirrors events to the `log` facade at info level.
#[derive(Debug, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn record(&mut self, events: &[TimedEvent]) -> Result<(), EventLogError> {
        for timed in events {
            log::info!("[{:>9.3}s] {}", timed.at.as_secs_f64(), timed.event);
        }
        Ok(())
    }
}

/// Fans one batch out to two sinks.
pub struct Tee<A, B>(pub A, pub B);

impl<A: EventSink, B: EventSink> EventSink for Tee<A, B> {
    fn record(&mut self, events: &[TimedEvent]) -> Result<(), EventLogError> {
        self.0.record(events)?;
        self.1.record(events)
    }
}

/// Appends one CSV row per event.
pub struct CsvEventLog<W: Write> {
    writer: csv::Writer<W>,
}

impl CsvEventLog<File> {
    /// Opens `path` for appending. Headers are only written to a new file.
    pub fn append_to(path: impl AsRef<Path>) -> Result<Self, EventLogError> {
        let path = path.as_ref();
        let file_exists = path.exists();
        let file = OpenOptions::new().append(true).create(true).open(path)?;
        let writer = csv::WriterBuilder::new()
            .has_headers(!file_exists)
            .from_writer(file);
        Ok(Self { writer })
    }
}

impl<W: Write> CsvEventLog<W> {
    pub fn from_writer(writer: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(writer),
        }
    }

    pub fn into_inner(self) -> Result<W, EventLogError> {
        self.writer
            .into_inner()
            .map_err(|err| EventLogError::Io(err.into_error()))
    }
}

impl<W: Write> EventSink for CsvEventLog<W> {
    fn record(&mut self, events: &[TimedEvent]) -> Result<(), EventLogError> {
        let timestamp = current_timestamp();
        for timed in events {
            self.writer
                .serialize(EventRecord::from_event(timed, timestamp))?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

/// Reads back a log written by [`CsvEventLog`].
pub fn read_records<R: Read>(reader: R) -> Result<Vec<EventRecord>, EventLogError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut records = Vec::new();
    for result in rdr.deserialize() {
        let record: EventRecord = result?;
        records.push(record);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared_data::{ArbiterEvent, JunctionId, Phase};
    use std::time::Duration;

    fn sample() -> Vec<TimedEvent> {
        vec![
            TimedEvent {
                at: Duration::ZERO,
                event: ArbiterEvent::Started,
            },
            TimedEvent {
                at: Duration::from_millis(2100),
                event: ArbiterEvent::PhaseGreen(Phase::Junction(JunctionId::Two)),
            },
        ]
    }

    #[test]
    fn csv_log_writes_one_row_per_event() {
        let mut log = CsvEventLog::from_writer(Vec::new());
        log.record(&sample()).unwrap();
        log.record(&[]).unwrap();
        let bytes = log.into_inner().unwrap();

        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.starts_with("timestamp,elapsed_ms,kind,detail"));

        let records = read_records(bytes.as_slice()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].kind, "started");
        assert_eq!(records[1].elapsed_ms, 2100);
        assert_eq!(records[1].detail, "J2 green");
    }

    #[test]
    fn tee_feeds_both_sinks() {
        let mut tee = Tee(Vec::new(), LogSink);
        tee.record(&sample()).unwrap();
        assert_eq!(tee.0.len(), 2);
    }
}
