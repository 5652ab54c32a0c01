//! Per-process counters that `sysinfo` does not report.
//!
//! `sysinfo` gives I/O in bytes only and has no read/write call counts, so
//! these come from `/proc` through the `procfs` crate. Other platforms report
//! the counters as unavailable.

#[cfg(target_os = "linux")]
use procfs::process::Process;
#[cfg(target_os = "linux")]
use procfs::ProcError;

/// Cumulative I/O counters of one process since it started.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IoCounters {
    /// Number of read syscalls.
    pub reads: u64,
    /// Number of write syscalls.
    pub writes: u64,
    /// Bytes fetched from the storage layer.
    pub read_bytes: u64,
    /// Bytes sent to the storage layer.
    pub written_bytes: u64,
}

/// Outcome of an I/O counter read for a process that is still running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoReading {
    Counters(IoCounters),
    /// The counters exist but may not be read (typically another user's
    /// process), or the platform does not expose them.
    Unavailable,
}

/// Why a counter could not be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CounterError {
    /// The process is gone.
    Vanished,
    /// The process exists but this counter cannot be read for it.
    Unavailable(String),
}

impl CounterError {
    /// The I/O reading to record after a failed read, or `None` when the
    /// process has to be reported as unmeasured.
    pub fn io_reading(&self) -> Option<IoReading> {
        match self {
            CounterError::Vanished => None,
            CounterError::Unavailable(_) => Some(IoReading::Unavailable),
        }
    }
}

/// Maps a `procfs` failure onto what it says about the process.
#[cfg(target_os = "linux")]
pub fn classify_proc_error(err: ProcError) -> CounterError {
    match err {
        ProcError::NotFound(_) => CounterError::Vanished,
        ProcError::Io(ref e, _) if e.kind() == std::io::ErrorKind::NotFound => {
            CounterError::Vanished
        }
        other => CounterError::Unavailable(other.to_string()),
    }
}

#[cfg(target_os = "linux")]
fn open(pid: u32) -> Result<Process, CounterError> {
    // No pid above i32::MAX can exist.
    let pid = i32::try_from(pid).map_err(|_| CounterError::Vanished)?;
    Process::new(pid).map_err(classify_proc_error)
}

/// Reads the I/O counters of `pid`.
#[cfg(target_os = "linux")]
pub fn read_io_counters(pid: u32) -> Result<IoCounters, CounterError> {
    let io = open(pid)?.io().map_err(classify_proc_error)?;
    Ok(IoCounters {
        reads: io.syscr,
        writes: io.syscw,
        read_bytes: io.read_bytes,
        written_bytes: io.write_bytes,
    })
}

#[cfg(not(target_os = "linux"))]
pub fn read_io_counters(_pid: u32) -> Result<IoCounters, CounterError> {
    Err(CounterError::Unavailable(
        "per-process I/O counters are only available on Linux".to_string(),
    ))
}

/// Reads the number of threads of `pid`.
#[cfg(target_os = "linux")]
pub fn read_thread_count(pid: u32) -> Result<u32, CounterError> {
    let stat = open(pid)?.stat().map_err(classify_proc_error)?;
    u32::try_from(stat.num_threads)
        .map_err(|_| CounterError::Unavailable(format!("bad thread count {}", stat.num_threads)))
}

#[cfg(not(target_os = "linux"))]
pub fn read_thread_count(_pid: u32) -> Result<u32, CounterError> {
    Err(CounterError::Unavailable(
        "per-process thread counts are only available on Linux".to_string(),
    ))
}
