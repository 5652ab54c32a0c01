//! Identity of a process discovered in the monitored tree.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a process is labelled in the `Process` column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelMode {
    /// Short executable name (e.g. `sleep`).
    #[default]
    Pname,
    /// Full command line, arguments joined with single spaces.
    Cmdline,
}

impl LabelMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LabelMode::Pname => "pname",
            LabelMode::Cmdline => "cmdline",
        }
    }
}

impl fmt::Display for LabelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LabelMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pname" => Ok(LabelMode::Pname),
            "cmdline" => Ok(LabelMode::Cmdline),
            other => Err(format!(
                "unknown process label mode '{}' (expected 'pname' or 'cmdline')",
                other
            )),
        }
    }
}

/// A process that was part of the tree when it was last enumerated.
///
/// The handle only carries identity captured at discovery time. Whether the
/// process is still alive is never cached here: a [`Probe`](super::Probe)
/// answers that at measurement time, and a vanished process simply measures
/// as `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessHandle {
    pid: u32,
    name: String,
    command_line: String,
}

impl ProcessHandle {
    pub fn new(pid: u32, name: impl Into<String>, command_line: impl Into<String>) -> Self {
        Self {
            pid,
            name: name.into(),
            command_line: command_line.into(),
        }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn command_line(&self) -> &str {
        &self.command_line
    }

    /// Returns the text shown in the `Process` column.
    ///
    /// Kernel threads and processes we may not inspect report an empty
    /// command line, so `Cmdline` falls back to the short name.
    pub fn label(&self, mode: LabelMode) -> &str {
        match mode {
            LabelMode::Cmdline if !self.command_line.is_empty() => &self.command_line,
            _ => &self.name,
        }
    }
}
