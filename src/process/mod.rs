//! Process tree tracking and measurement.
//!
//! This module launches the monitored command, enumerates its live
//! descendants each tick, and measures CPU, memory, thread and I/O usage
//! of every process in the tree.

mod counters;
mod handle;
mod probe;
mod target;
mod tree;

pub use counters::{CounterError, IoCounters, IoReading};
pub use handle::{LabelMode, ProcessHandle};
pub use probe::{Measurement, Probe, SystemProbe};
pub use target::{exit_code, split_command, LaunchedProcess, Target};
pub use tree::{walk_tree, ProcessEntry, SystemTracker, Tracker};
