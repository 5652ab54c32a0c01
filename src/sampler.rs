//! The sampling loop.
//!
//! [`Sampler`] drives the polling protocol for one launched target and hands
//! out one [`Tick`] of records per iteration. Each tick:
//!
//! 1. checks the target is still running, stopping if it is not,
//! 2. takes the current process set from the [`Tracker`],
//! 3. measures every process in that set in a single pass,
//! 4. only then turns the measurements into [`Record`]s.
//!
//! Measuring everything before any formatting or output keeps the snapshot
//! as close to simultaneous as possible; interleaving the two lets processes
//! exit between their discovery and their measurement.
//!
//! Between ticks the sampler sleeps for exactly the configured interval. Tick
//! labels are logical (`0, interval, 2 * interval, ...`) and do not include
//! the time spent measuring or writing.

use std::thread;
use std::time::Duration;

use log::{debug, warn};

use crate::error::Result;
use crate::process::{LabelMode, Probe, Target, Tracker};
use crate::record::{format_seconds, Record};

/// The records produced by one iteration of the sampling loop.
#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    /// Zero-based tick number.
    pub index: u64,
    /// Logical time of the tick.
    pub elapsed: Duration,
    /// Root first, then descendants in discovery order.
    pub records: Vec<Record>,
}

/// Lifecycle of a sampler.
///
/// A sampler only exists once its target has been launched, so it starts out
/// `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Running { next_index: u64, next_tick: Duration },
    Terminated { exit_code: i32 },
    /// The target's status could not be determined; no further ticks.
    Failed,
}

/// Samples a target process tree until the target exits.
///
/// `Sampler` is an [`Iterator`] of ticks, so records are produced lazily as
/// the consumer asks for them. Once the iterator is exhausted,
/// [`exit_code`](Sampler::exit_code) holds the target's exit code.
pub struct Sampler<T, K, P> {
    target: T,
    tracker: K,
    probe: P,
    interval: Duration,
    label: LabelMode,
    phase: Phase,
    sleep: fn(Duration),
}

impl<T: Target, K: Tracker, P: Probe> Sampler<T, K, P> {
    pub fn new(target: T, tracker: K, probe: P, interval: Duration, label: LabelMode) -> Self {
        Self {
            target,
            tracker,
            probe,
            interval,
            label,
            phase: Phase::Running {
                next_index: 0,
                next_tick: Duration::ZERO,
            },
            sleep: thread::sleep,
        }
    }

    /// Replaces the function used to wait between ticks.
    pub fn with_sleep(mut self, sleep: fn(Duration)) -> Self {
        self.sleep = sleep;
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The target's exit code, once the loop has observed its termination.
    pub fn exit_code(&self) -> Option<i32> {
        match self.phase {
            Phase::Terminated { exit_code } => Some(exit_code),
            _ => None,
        }
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    fn sample(&mut self, index: u64, elapsed: Duration) -> Tick {
        let mut processes = self.tracker.process_set(self.target.pid());
        if processes.is_empty() {
            // The root left the process table after passing the liveness
            // check. Report it unmeasured rather than emitting an empty tick.
            debug!("root pid {} missing from process table", self.target.pid());
            processes.push(self.target.handle());
        }

        let measurements = self.probe.measure_all(&processes);

        let records: Vec<Record> = processes
            .iter()
            .zip(measurements)
            .map(|(handle, measurement)| Record::new(elapsed, handle, self.label, measurement))
            .collect();

        debug!(
            "tick {} at {}s: {} processes",
            index,
            format_seconds(elapsed),
            records.len()
        );

        Tick {
            index,
            elapsed,
            records,
        }
    }
}

impl<T: Target, K: Tracker, P: Probe> Iterator for Sampler<T, K, P> {
    type Item = Result<Tick>;

    fn next(&mut self) -> Option<Self::Item> {
        let Phase::Running {
            next_index,
            next_tick,
        } = self.phase
        else {
            return None;
        };

        if next_index > 0 {
            (self.sleep)(self.interval);
        }

        match self.target.poll() {
            Ok(Some(exit_code)) => {
                debug!("target exited after {} ticks", next_index);
                self.phase = Phase::Terminated { exit_code };
                return None;
            }
            Ok(None) => {}
            Err(e) => {
                warn!("giving up on target pid {}: {}", self.target.pid(), e);
                self.phase = Phase::Failed;
                return Some(Err(e));
            }
        }

        let tick = self.sample(next_index, next_tick);
        self.phase = Phase::Running {
            next_index: next_index + 1,
            next_tick: next_tick + self.interval,
        };
        Some(Ok(tick))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PtmonError;
    use crate::process::{Measurement, ProcessHandle};
    use crate::test_utils::{no_sleep, ScriptedProbe, ScriptedTarget, ScriptedTracker};

    const MB: u64 = 1_048_576;

    fn handle(pid: u32, name: &str) -> ProcessHandle {
        ProcessHandle::new(pid, name, format!("{} --run", name))
    }

    fn sampler(
        target: ScriptedTarget,
        tracker: ScriptedTracker,
        probe: ScriptedProbe,
        interval: Duration,
    ) -> Sampler<ScriptedTarget, ScriptedTracker, ScriptedProbe> {
        Sampler::new(target, tracker, probe, interval, LabelMode::Pname).with_sleep(no_sleep)
    }

    #[test]
    fn test_tick_labels_are_multiples_of_interval() {
        let root = handle(100, "sleep");
        let target = ScriptedTarget::new(root.clone(), 5, 0);
        let tracker = ScriptedTracker::repeating(vec![root]);
        let probe = ScriptedProbe::always(Measurement::new(0.0, 1, MB, MB));

        let ticks: Vec<Tick> = sampler(target, tracker, probe, Duration::from_millis(100))
            .map(|t| t.unwrap())
            .collect();

        let labels: Vec<String> = ticks.iter().map(|t| format_seconds(t.elapsed)).collect();
        assert_eq!(labels, vec!["0", "0.1", "0.2", "0.3", "0.4"]);
        let indices: Vec<u64> = ticks.iter().map(|t| t.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_stops_without_sampling_once_target_exits() {
        let root = handle(100, "true");
        let target = ScriptedTarget::new(root.clone(), 0, 0);
        let tracker = ScriptedTracker::repeating(vec![root]);
        let probe = ScriptedProbe::always(Measurement::new(0.0, 1, 0, 0));

        let mut s = sampler(target, tracker, probe, Duration::from_secs(1));

        assert!(s.next().is_none());
        assert_eq!(s.exit_code(), Some(0));
        assert!(s.next().is_none());
    }

    #[test]
    fn test_propagates_target_exit_code() {
        let root = handle(100, "false");
        let target = ScriptedTarget::new(root.clone(), 2, 7);
        let tracker = ScriptedTracker::repeating(vec![root]);
        let probe = ScriptedProbe::always(Measurement::new(0.0, 1, 0, 0));

        let mut s = sampler(target, tracker, probe, Duration::from_secs(1));
        assert_eq!(s.exit_code(), None);

        assert_eq!(s.by_ref().count(), 2);
        assert_eq!(s.exit_code(), Some(7));
        assert_eq!(s.phase(), Phase::Terminated { exit_code: 7 });
    }

    #[test]
    fn test_records_follow_process_set_order() {
        let root = handle(100, "sh");
        let a = handle(105, "worker");
        let b = handle(101, "helper");
        let target = ScriptedTarget::new(root.clone(), 1, 0);
        let tracker = ScriptedTracker::repeating(vec![root, a, b]);
        let probe = ScriptedProbe::always(Measurement::new(0.0, 1, 0, 0));

        let tick = sampler(target, tracker, probe, Duration::from_secs(1))
            .next()
            .unwrap()
            .unwrap();

        let pids: Vec<u32> = tick.records.iter().map(|r| r.pid).collect();
        assert_eq!(pids, vec![100, 105, 101]);
    }

    #[test]
    fn test_child_disappearing_is_not_an_error() {
        let parent = handle(100, "parent");
        let child = handle(101, "child");
        let target = ScriptedTarget::new(parent.clone(), 3, 0);
        let tracker = ScriptedTracker::scripted(vec![
            vec![parent.clone(), child.clone()],
            vec![parent.clone(), child],
            vec![parent],
        ]);
        let probe = ScriptedProbe::always(Measurement::new(0.0, 1, 0, 0));

        let counts: Vec<usize> = sampler(target, tracker, probe, Duration::from_secs(1))
            .map(|t| t.unwrap().records.len())
            .collect();

        assert_eq!(counts, vec![2, 2, 1]);
    }

    #[test]
    fn test_vanished_process_is_recorded_unmeasured() {
        let root = handle(100, "sh");
        let gone = handle(101, "gone");
        let target = ScriptedTarget::new(root.clone(), 1, 0);
        let tracker = ScriptedTracker::repeating(vec![root, gone]);
        let probe = ScriptedProbe::scripted(vec![vec![
            Some(Measurement::new(1.0, 1, 0, 0)),
            None,
        ]]);

        let tick = sampler(target, tracker, probe, Duration::from_secs(1))
            .next()
            .unwrap()
            .unwrap();

        assert!(tick.records[0].measurement.is_some());
        assert!(tick.records[1].measurement.is_none());
        assert_eq!(tick.records[1].label, "gone");
    }

    #[test]
    fn test_missing_root_still_reports_root_record() {
        let root = handle(100, "sh");
        let target = ScriptedTarget::new(root, 1, 0);
        let tracker = ScriptedTracker::repeating(Vec::new());
        let probe = ScriptedProbe::scripted(vec![vec![None]]);

        let tick = sampler(target, tracker, probe, Duration::from_secs(1))
            .next()
            .unwrap()
            .unwrap();

        assert_eq!(tick.records.len(), 1);
        assert_eq!(tick.records[0].pid, 100);
        assert!(tick.records[0].measurement.is_none());
    }

    #[test]
    fn test_measures_whole_set_in_one_pass_per_tick() {
        let root = handle(100, "sh");
        let child = handle(101, "child");
        let target = ScriptedTarget::new(root.clone(), 3, 0);
        let tracker = ScriptedTracker::repeating(vec![root, child]);
        let probe = ScriptedProbe::always(Measurement::new(0.0, 1, 0, 0));
        let calls = probe.calls();

        let ticks = sampler(target, tracker, probe, Duration::from_secs(1)).count();

        assert_eq!(ticks, 3);
        assert_eq!(*calls.borrow(), vec![2, 2, 2]);
    }

    #[test]
    fn test_cmdline_label_mode() {
        let root = handle(100, "python3");
        let target = ScriptedTarget::new(root.clone(), 1, 0);
        let tracker = ScriptedTracker::repeating(vec![root]);
        let probe = ScriptedProbe::always(Measurement::new(0.0, 1, 0, 0));

        let tick = Sampler::new(
            target,
            tracker,
            probe,
            Duration::from_secs(1),
            LabelMode::Cmdline,
        )
        .with_sleep(no_sleep)
        .next()
        .unwrap()
        .unwrap();

        assert_eq!(tick.records[0].label, "python3 --run");
    }

    #[test]
    fn test_poll_failure_ends_iteration_with_error() {
        let root = handle(100, "sh");
        let target = ScriptedTarget::failing(root.clone(), 1);
        let tracker = ScriptedTracker::repeating(vec![root]);
        let probe = ScriptedProbe::always(Measurement::new(0.0, 1, 0, 0));

        let mut s = sampler(target, tracker, probe, Duration::from_secs(1));

        assert!(s.next().unwrap().is_ok());
        assert!(matches!(s.next(), Some(Err(PtmonError::Poll(_)))));
        assert!(s.next().is_none());
        assert_eq!(s.phase(), Phase::Failed);
        assert_eq!(s.exit_code(), None);
    }
}
