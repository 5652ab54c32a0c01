//! Output records and their tabular text form.

use std::time::Duration;

use crate::process::{IoReading, LabelMode, Measurement, ProcessHandle};

/// Bytes in one megabyte as reported in the output (1 MiB).
pub const BYTES_PER_MB: u64 = 1_048_576;

/// Value written to every I/O column when the counters cannot be read.
pub const IO_UNAVAILABLE: &str = "-1";

const LEADING_COLUMNS: [&str; 5] = ["Time", "CPU%", "Threads", "RSS", "VMS"];
const IO_COLUMNS: [&str; 4] = ["IO reads", "IO writes", "IO read MB", "IO written MB"];
const TRAILING_COLUMNS: [&str; 2] = ["PID", "Process"];

/// Converts a byte count to whole megabytes, rounding down.
pub fn bytes_to_mb(bytes: u64) -> u64 {
    bytes / BYTES_PER_MB
}

/// Formats a tick label in seconds without trailing zeros: `0`, `0.5`, `1`, `1.25`.
pub fn format_seconds(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let nanos = elapsed.subsec_nanos();
    if nanos == 0 {
        return secs.to_string();
    }
    let fraction = format!("{:09}", nanos);
    format!("{}.{}", secs, fraction.trim_end_matches('0'))
}

/// One output row: a process at a tick, measured or not.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Logical time of the tick (`index * interval`).
    pub tick: Duration,
    pub pid: u32,
    pub label: String,
    /// `None` when the process was gone by the time it was measured.
    pub measurement: Option<Measurement>,
}

impl Record {
    pub fn new(
        tick: Duration,
        handle: &ProcessHandle,
        mode: LabelMode,
        measurement: Option<Measurement>,
    ) -> Self {
        Self {
            tick,
            pid: handle.pid(),
            label: handle.label(mode).to_string(),
            measurement,
        }
    }
}

/// Column layout and separator of the output table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowFormat {
    separator: String,
    with_io: bool,
}

impl RowFormat {
    pub fn new(separator: impl Into<String>, with_io: bool) -> Self {
        Self {
            separator: separator.into(),
            with_io,
        }
    }

    pub fn columns(&self) -> Vec<&'static str> {
        let mut columns = LEADING_COLUMNS.to_vec();
        if self.with_io {
            columns.extend(IO_COLUMNS);
        }
        columns.extend(TRAILING_COLUMNS);
        columns
    }

    /// The header line, without line terminator.
    pub fn header(&self) -> String {
        self.columns().join(&self.separator)
    }

    /// Every field of `record`, in column order.
    ///
    /// An unmeasured record keeps the full field count with the measurement
    /// columns left empty.
    pub fn fields(&self, record: &Record) -> Vec<String> {
        let io_columns = if self.with_io { IO_COLUMNS.len() } else { 0 };
        let measured_columns = LEADING_COLUMNS.len() - 1 + io_columns;
        let mut fields = Vec::with_capacity(measured_columns + 3);

        fields.push(format_seconds(record.tick));

        match &record.measurement {
            Some(m) => {
                fields.push(format!("{:.1}", m.cpu_percent));
                fields.push(m.threads.to_string());
                fields.push(bytes_to_mb(m.rss_bytes).to_string());
                fields.push(bytes_to_mb(m.vms_bytes).to_string());
                if self.with_io {
                    match m.io {
                        Some(IoReading::Counters(io)) => {
                            fields.push(io.reads.to_string());
                            fields.push(io.writes.to_string());
                            fields.push(bytes_to_mb(io.read_bytes).to_string());
                            fields.push(bytes_to_mb(io.written_bytes).to_string());
                        }
                        Some(IoReading::Unavailable) | None => {
                            fields.extend(IO_COLUMNS.iter().map(|_| IO_UNAVAILABLE.to_string()));
                        }
                    }
                }
            }
            None => fields.extend((0..measured_columns).map(|_| String::new())),
        }

        fields.push(record.pid.to_string());
        fields.push(record.label.clone());
        fields
    }

    /// One data line, without line terminator.
    pub fn row(&self, record: &Record) -> String {
        self.fields(record).join(&self.separator)
    }
}
