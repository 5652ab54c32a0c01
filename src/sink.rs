//! Output destination for the record table.

use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::str::FromStr;

use log::debug;

use crate::error::{PtmonError, Result};
use crate::record::{Record, RowFormat};
use crate::sampler::Tick;

/// Records written between flushes unless configured otherwise.
pub const DEFAULT_FLUSH_EVERY: usize = 100;

/// Where the table goes: standard output or a file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OutputTarget {
    #[default]
    Stdout,
    File(PathBuf),
}

impl OutputTarget {
    /// Opens the destination for writing, truncating an existing file.
    pub fn open(&self) -> Result<Box<dyn Write>> {
        match self {
            OutputTarget::Stdout => Ok(Box::new(io::stdout())),
            OutputTarget::File(path) => {
                let file = File::create(path).map_err(|source| PtmonError::OutputOpen {
                    path: path.clone(),
                    source,
                })?;
                Ok(Box::new(file))
            }
        }
    }
}

impl FromStr for OutputTarget {
    type Err = std::convert::Infallible;

    /// `-` means standard output; anything else is a file path.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s {
            "-" => OutputTarget::Stdout,
            path => OutputTarget::File(PathBuf::from(path)),
        })
    }
}

impl fmt::Display for OutputTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputTarget::Stdout => f.write_str("-"),
            OutputTarget::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Buffered writer of the record table.
///
/// Flushes every `flush_every` records so that an abnormal end of the
/// monitor loses at most that many rows. Any write failure, including a
/// closed pipe, is returned as [`PtmonError::Output`].
pub struct RecordWriter<W: Write> {
    out: BufWriter<W>,
    format: RowFormat,
    flush_every: usize,
    pending: usize,
    written: u64,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(out: W, format: RowFormat, flush_every: usize) -> Self {
        Self {
            out: BufWriter::new(out),
            format,
            flush_every: flush_every.max(1),
            pending: 0,
            written: 0,
        }
    }

    /// Number of records written so far, header excluded.
    pub fn records_written(&self) -> u64 {
        self.written
    }

    pub fn write_header(&mut self) -> Result<()> {
        let header = self.format.header();
        self.write_line(&header)?;
        self.flush()
    }

    pub fn write_record(&mut self, record: &Record) -> Result<()> {
        let row = self.format.row(record);
        self.write_line(&row)?;
        self.written += 1;
        self.pending += 1;
        if self.pending >= self.flush_every {
            self.flush()?;
        }
        Ok(())
    }

    pub fn write_tick(&mut self, tick: &Tick) -> Result<()> {
        tick.records.iter().try_for_each(|r| self.write_record(r))
    }

    pub fn flush(&mut self) -> Result<()> {
        self.out.flush().map_err(PtmonError::Output)?;
        self.pending = 0;
        Ok(())
    }

    /// Flushes everything and hands back the underlying writer.
    pub fn finish(mut self) -> Result<W> {
        self.flush()?;
        debug!("wrote {} records", self.written);
        self.out
            .into_inner()
            .map_err(|e| PtmonError::Output(e.into_error()))
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        self.out
            .write_all(line.as_bytes())
            .and_then(|()| self.out.write_all(b"\n"))
            .map_err(PtmonError::Output)
    }
}
