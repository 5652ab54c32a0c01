//! Resource measurement of the processes in one tick.
//!
//! A [`Probe`] measures a whole process set in one pass. CPU usage comes
//! from `sysinfo`, which reports the usage accrued since the previous refresh
//! of that same process, without waiting internally; the sampling loop's own
//! sleep provides the window.

use log::{debug, trace};
use sysinfo::{Pid, ProcessRefreshKind, ProcessStatus, ProcessesToUpdate, System};

use super::counters::{read_io_counters, read_thread_count, CounterError, IoCounters, IoReading};
use super::handle::ProcessHandle;

/// Point-in-time resource usage of one process.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    /// CPU usage since the previous measurement of this process.
    /// Can exceed 100% on multi-core machines; 0.0 on first observation.
    pub cpu_percent: f32,
    pub threads: u32,
    /// Resident set size in bytes.
    pub rss_bytes: u64,
    /// Virtual memory size in bytes.
    pub vms_bytes: u64,
    /// `None` unless I/O collection is enabled.
    pub io: Option<IoReading>,
}

impl Measurement {
    pub fn new(cpu_percent: f32, threads: u32, rss_bytes: u64, vms_bytes: u64) -> Self {
        Self {
            cpu_percent,
            threads,
            rss_bytes,
            vms_bytes,
            io: None,
        }
    }

    pub fn with_io(mut self, io: IoReading) -> Self {
        self.io = Some(io);
        self
    }
}

/// Captures measurements for a process set.
pub trait Probe {
    /// Measures every process in `processes`, preserving order.
    ///
    /// A process that is no longer running yields `None` in its slot.
    /// Implementations must issue all measurements before returning and must
    /// not do any formatting or output in between.
    fn measure_all(&mut self, processes: &[ProcessHandle]) -> Vec<Option<Measurement>>;
}

/// [`Probe`] backed by `sysinfo` plus `/proc` counters.
///
/// Keeps its own `System` so CPU baselines persist from tick to tick for
/// every process that stays in the tree.
pub struct SystemProbe {
    system: System,
    collect_io: bool,
}

impl SystemProbe {
    pub fn new(collect_io: bool) -> Self {
        Self {
            system: System::new(),
            collect_io,
        }
    }

    pub fn collects_io(&self) -> bool {
        self.collect_io
    }

    fn measure_one(&self, handle: &ProcessHandle) -> Option<Measurement> {
        let pid = handle.pid();
        let process = match self.system.process(Pid::from_u32(pid)) {
            Some(p) if p.status() != ProcessStatus::Zombie => p,
            _ => {
                debug!("process {} ({}) vanished before measurement", pid, handle.name());
                return None;
            }
        };

        let Some(threads) = thread_count(read_thread_count(pid)) else {
            debug!("process {} ({}) vanished during measurement", pid, handle.name());
            return None;
        };

        let mut measurement = Measurement::new(
            process.cpu_usage(),
            threads,
            process.memory(),
            process.virtual_memory(),
        );

        if self.collect_io {
            let result = read_io_counters(pid);
            if let Err(CounterError::Unavailable(reason)) = &result {
                trace!("I/O counters unavailable for process {}: {}", pid, reason);
            }
            let Some(reading) = io_reading(result) else {
                debug!("process {} ({}) vanished during measurement", pid, handle.name());
                return None;
            };
            measurement = measurement.with_io(reading);
        }

        Some(measurement)
    }
}

/// Thread count to record, or `None` when the process is gone.
///
/// A count that cannot be read for a live process is recorded as 0.
fn thread_count(result: Result<u32, CounterError>) -> Option<u32> {
    match result {
        Ok(threads) => Some(threads),
        Err(CounterError::Vanished) => None,
        Err(CounterError::Unavailable(_)) => Some(0),
    }
}

/// I/O reading to record, or `None` when the process is gone.
fn io_reading(result: Result<IoCounters, CounterError>) -> Option<IoReading> {
    match result {
        Ok(counters) => Some(IoReading::Counters(counters)),
        Err(e) => e.io_reading(),
    }
}

impl Probe for SystemProbe {
    fn measure_all(&mut self, processes: &[ProcessHandle]) -> Vec<Option<Measurement>> {
        let pids: Vec<Pid> = processes.iter().map(|p| Pid::from_u32(p.pid())).collect();

        // One refresh for the whole set keeps the snapshot as narrow as possible.
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&pids),
            true,
            ProcessRefreshKind::nothing().with_cpu().with_memory(),
        );

        processes.iter().map(|h| self.measure_one(h)).collect()
    }
}
