//! Writes delivered records in the session's output format.

use std::collections::HashSet;
use std::io::{self, Write};

use parking_lot::Mutex;
use sensekit_core::{OutputFormat, Record, SensorKind, SensorRecord, Subscriber};

struct PrinterState<W> {
    out: W,
    headers_written: HashSet<SensorKind>,
}

/// A subscriber that writes one record per line.
///
/// In CSV mode the header for a kind is written before its first record.
/// A scan batch spans one line per peer and writes nothing when empty.
pub struct RecordPrinter<W> {
    format: OutputFormat,
    state: Mutex<PrinterState<W>>,
}

impl RecordPrinter<io::Stdout> {
    /// A printer writing to stdout.
    #[must_use]
    pub fn stdout(format: OutputFormat) -> Self {
        Self::new(format, io::stdout())
    }
}

impl<W: Write + Send> RecordPrinter<W> {
    /// A printer writing to `out`.
    pub fn new(format: OutputFormat, out: W) -> Self {
        Self {
            format,
            state: Mutex::new(PrinterState {
                out,
                headers_written: HashSet::new(),
            }),
        }
    }

    /// Give back the writer.
    pub fn into_writer(self) -> W {
        self.state.into_inner().out
    }

    fn write(&self, record: &Record) -> anyhow::Result<()> {
        let mut state = self.state.lock();
        match self.format {
            OutputFormat::Csv => {
                if state.headers_written.insert(record.kind()) {
                    writeln!(state.out, "{}", record.csv_header())?;
                }
                let text = record.to_csv();
                if !text.is_empty() {
                    writeln!(state.out, "{text}")?;
                }
            }
            OutputFormat::Json => writeln!(state.out, "{}", record.to_json())?,
            OutputFormat::Map => {
                writeln!(state.out, "{}", serde_json::to_string(&record.to_map())?)?;
            }
        }
        state.out.flush()?;
        Ok(())
    }
}

impl<W: Write + Send> Subscriber for RecordPrinter<W> {
    fn on_record(&self, record: &Record) -> anyhow::Result<()> {
        self.write(record)
    }

    fn name(&self) -> &str {
        "printer"
    }
}
