//! Test utilities shared across modules.
//!
//! Scripted stand-ins for the OS-facing pieces of the sampling loop, so the
//! loop can be driven tick by tick without real processes or real sleeps.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::rc::Rc;
use std::time::Duration;

use crate::error::{PtmonError, Result};
use crate::process::{Measurement, Probe, ProcessHandle, Target, Tracker};

/// Sleep replacement that returns immediately.
pub fn no_sleep(_: Duration) {}

/// A target that stays running for a fixed number of polls, then exits.
pub struct ScriptedTarget {
    handle: ProcessHandle,
    running_polls: u64,
    polls: u64,
    outcome: Option<i32>,
}

impl ScriptedTarget {
    /// Runs for `running_polls` liveness checks, then exits with `exit_code`.
    pub fn new(handle: ProcessHandle, running_polls: u64, exit_code: i32) -> Self {
        Self {
            handle,
            running_polls,
            polls: 0,
            outcome: Some(exit_code),
        }
    }

    /// Runs for `running_polls` liveness checks, then fails to be polled.
    pub fn failing(handle: ProcessHandle, running_polls: u64) -> Self {
        Self {
            handle,
            running_polls,
            polls: 0,
            outcome: None,
        }
    }
}

impl Target for ScriptedTarget {
    fn pid(&self) -> u32 {
        self.handle.pid()
    }

    fn handle(&self) -> ProcessHandle {
        self.handle.clone()
    }

    fn poll(&mut self) -> Result<Option<i32>> {
        if self.polls < self.running_polls {
            self.polls += 1;
            return Ok(None);
        }
        match self.outcome {
            Some(code) => Ok(Some(code)),
            None => Err(PtmonError::Poll(io::Error::new(
                io::ErrorKind::Other,
                "scripted poll failure",
            ))),
        }
    }
}

/// A tracker that replays one process set per tick.
pub struct ScriptedTracker {
    sets: VecDeque<Vec<ProcessHandle>>,
    fallback: Vec<ProcessHandle>,
}

impl ScriptedTracker {
    /// Returns `sets` in order, then the last one forever.
    pub fn scripted(sets: Vec<Vec<ProcessHandle>>) -> Self {
        let fallback = sets.last().cloned().unwrap_or_default();
        Self {
            sets: sets.into(),
            fallback,
        }
    }

    /// Returns `set` on every tick.
    pub fn repeating(set: Vec<ProcessHandle>) -> Self {
        Self::scripted(vec![set])
    }
}

impl Tracker for ScriptedTracker {
    fn process_set(&mut self, _root: u32) -> Vec<ProcessHandle> {
        self.sets.pop_front().unwrap_or_else(|| self.fallback.clone())
    }
}

/// A probe that replays canned measurements and records batch sizes.
pub struct ScriptedProbe {
    batches: VecDeque<Vec<Option<Measurement>>>,
    default: Option<Measurement>,
    calls: Rc<RefCell<Vec<usize>>>,
}

impl ScriptedProbe {
    /// Returns one batch per tick; processes beyond a batch are unmeasured.
    pub fn scripted(batches: Vec<Vec<Option<Measurement>>>) -> Self {
        Self {
            batches: batches.into(),
            default: None,
            calls: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Measures every process as `measurement`.
    pub fn always(measurement: Measurement) -> Self {
        Self {
            batches: VecDeque::new(),
            default: Some(measurement),
            calls: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Sizes of the process sets passed to each `measure_all` call.
    pub fn calls(&self) -> Rc<RefCell<Vec<usize>>> {
        Rc::clone(&self.calls)
    }
}

impl Probe for ScriptedProbe {
    fn measure_all(&mut self, processes: &[ProcessHandle]) -> Vec<Option<Measurement>> {
        self.calls.borrow_mut().push(processes.len());

        match self.batches.pop_front() {
            Some(mut batch) => {
                batch.resize(processes.len(), None);
                batch
            }
            None => vec![self.default.clone(); processes.len()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> ProcessHandle {
        ProcessHandle::new(1, "root", "root")
    }

    #[test]
    fn test_scripted_target_runs_then_exits() {
        let mut target = ScriptedTarget::new(root(), 2, 5);

        assert_eq!(target.poll().unwrap(), None);
        assert_eq!(target.poll().unwrap(), None);
        assert_eq!(target.poll().unwrap(), Some(5));
        assert_eq!(target.poll().unwrap(), Some(5));
    }

    #[test]
    fn test_scripted_tracker_repeats_last_set() {
        let mut tracker = ScriptedTracker::scripted(vec![vec![root(), root()], vec![root()]]);

        assert_eq!(tracker.process_set(1).len(), 2);
        assert_eq!(tracker.process_set(1).len(), 1);
        assert_eq!(tracker.process_set(1).len(), 1);
    }

    #[test]
    fn test_scripted_probe_pads_short_batches() {
        let mut probe = ScriptedProbe::scripted(vec![vec![Some(Measurement::new(0.0, 1, 0, 0))]]);

        let batch = probe.measure_all(&[root(), root()]);

        assert!(batch[0].is_some());
        assert!(batch[1].is_none());
        assert_eq!(*probe.calls().borrow(), vec![2]);
    }
}
