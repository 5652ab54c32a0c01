//! Discovery of the monitored process tree.
//!
//! Every call re-enumerates the OS process table. Nothing is carried over
//! between ticks: the tree may have forked or lost members arbitrarily since
//! the last call.

use std::collections::{HashMap, HashSet, VecDeque};

use log::trace;
use sysinfo::{Pid, ProcessRefreshKind, ProcessStatus, ProcessesToUpdate, System, UpdateKind};

use super::handle::ProcessHandle;

/// Source of the per-tick process set.
pub trait Tracker {
    /// Returns `root` followed by all of its live descendants, breadth-first.
    ///
    /// Returns an empty set when `root` is no longer in the process table.
    fn process_set(&mut self, root: u32) -> Vec<ProcessHandle>;
}

/// One row of a process table listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEntry {
    pub pid: u32,
    pub parent: Option<u32>,
    pub name: String,
    pub command_line: String,
}

/// Walks `entries` breadth-first from `root`.
///
/// Siblings are visited in ascending PID order so that repeated walks over the
/// same table produce the same sequence.
pub fn walk_tree(root: u32, entries: &[ProcessEntry]) -> Vec<ProcessHandle> {
    let by_pid: HashMap<u32, &ProcessEntry> = entries.iter().map(|e| (e.pid, e)).collect();
    let Some(root_entry) = by_pid.get(&root) else {
        return Vec::new();
    };

    let mut children: HashMap<u32, Vec<u32>> = HashMap::new();
    for entry in entries {
        if let Some(parent) = entry.parent {
            if parent != entry.pid {
                children.entry(parent).or_default().push(entry.pid);
            }
        }
    }
    for kids in children.values_mut() {
        kids.sort_unstable();
    }

    let mut ordered = vec![handle_from(root_entry)];
    let mut seen = HashSet::from([root]);
    let mut queue = VecDeque::from([root]);

    while let Some(pid) = queue.pop_front() {
        let Some(kids) = children.get(&pid) else {
            continue;
        };
        for kid in kids {
            // PID reuse can in principle produce a loop in a racy listing.
            if !seen.insert(*kid) {
                continue;
            }
            if let Some(entry) = by_pid.get(kid) {
                ordered.push(handle_from(entry));
                queue.push_back(*kid);
            }
        }
    }

    ordered
}

fn handle_from(entry: &ProcessEntry) -> ProcessHandle {
    ProcessHandle::new(entry.pid, entry.name.clone(), entry.command_line.clone())
}

/// [`Tracker`] backed by the `sysinfo` process table.
///
/// Each call reads a fresh table. A reused `System` keeps the name and
/// command line a process had when first seen, which goes stale after `exec`.
#[derive(Debug, Default)]
pub struct SystemTracker;

impl SystemTracker {
    pub fn new() -> Self {
        Self
    }

    fn snapshot(&self) -> Vec<ProcessEntry> {
        // Identity only: CPU accounting lives in the probe's own `System`.
        let mut system = System::new();
        system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing().with_cmd(UpdateKind::Always),
        );

        system
            .processes()
            .iter()
            .filter(|(_, process)| process.thread_kind().is_none())
            .filter(|(_, process)| process.status() != ProcessStatus::Zombie)
            .map(|(pid, process)| ProcessEntry {
                pid: pid.as_u32(),
                parent: process.parent().map(Pid::as_u32),
                name: process.name().to_string_lossy().into_owned(),
                command_line: process
                    .cmd()
                    .iter()
                    .map(|arg| arg.to_string_lossy())
                    .collect::<Vec<_>>()
                    .join(" "),
            })
            .collect()
    }
}

impl Tracker for SystemTracker {
    fn process_set(&mut self, root: u32) -> Vec<ProcessHandle> {
        let entries = self.snapshot();
        let set = walk_tree(root, &entries);
        trace!(
            "enumerated {} processes, {} in tree of {}",
            entries.len(),
            set.len(),
            root
        );
        set
    }
}
