//! The root process launched for monitoring.

use std::path::Path;
use std::process::{Child, Command, ExitStatus};

use log::{debug, info};

use super::handle::ProcessHandle;
use crate::error::{PtmonError, Result};

/// The process whose tree is being sampled.
pub trait Target {
    fn pid(&self) -> u32;

    /// Identity recorded at launch, used when the OS can no longer describe
    /// the process.
    fn handle(&self) -> ProcessHandle;

    /// Non-blocking liveness check.
    ///
    /// Returns `Ok(None)` while the process runs and `Ok(Some(code))` once it
    /// has exited, reaping it. Further calls keep returning the same code.
    fn poll(&mut self) -> Result<Option<i32>>;
}

/// Splits the command to monitor into argv.
///
/// A single argument is treated as a shell-style command string and split on
/// whitespace (`'sleep 2'`). Several arguments are already an argv and are
/// used verbatim, so `-- sh -c 'sleep 1; ls'` keeps its quoting.
pub fn split_command(words: &[String]) -> Result<Vec<String>> {
    let argv: Vec<String> = match words {
        [single] => single.split_whitespace().map(str::to_string).collect(),
        many => many.to_vec(),
    };

    if argv.first().map_or(true, |program| program.is_empty()) {
        return Err(PtmonError::EmptyCommand);
    }

    Ok(argv)
}

/// Converts an exit status into the code this program should exit with.
///
/// A process killed by signal `N` has no exit code; shells report it as
/// `128 + N`, and so do we.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    1
}

/// A child process spawned from an argv.
#[derive(Debug)]
pub struct LaunchedProcess {
    child: Child,
    argv: Vec<String>,
    exit_code: Option<i32>,
}

impl LaunchedProcess {
    /// Spawns `argv[0]` with the remaining arguments.
    ///
    /// The child inherits this process's standard streams.
    ///
    /// # Errors
    ///
    /// Returns [`PtmonError::EmptyCommand`] for an empty argv and
    /// [`PtmonError::Launch`] if the program cannot be started.
    pub fn launch(argv: &[String]) -> Result<Self> {
        let (program, args) = argv.split_first().ok_or(PtmonError::EmptyCommand)?;

        let child = Command::new(program)
            .args(args)
            .spawn()
            .map_err(|source| PtmonError::Launch {
                program: program.clone(),
                source,
            })?;

        info!("launched {:?} as pid {}", argv, child.id());

        Ok(Self {
            child,
            argv: argv.to_vec(),
            exit_code: None,
        })
    }

    /// Kills the process and waits for it, for use when monitoring has to be
    /// abandoned after a successful launch.
    pub fn terminate(&mut self) -> Result<i32> {
        if let Some(code) = self.exit_code {
            return Ok(code);
        }
        // The process may have exited on its own already; wait() settles it.
        if let Err(e) = self.child.kill() {
            debug!("kill of pid {} failed: {}", self.child.id(), e);
        }
        let status = self.child.wait().map_err(PtmonError::Poll)?;
        let code = exit_code(status);
        self.exit_code = Some(code);
        Ok(code)
    }
}

impl Target for LaunchedProcess {
    fn pid(&self) -> u32 {
        self.child.id()
    }

    fn handle(&self) -> ProcessHandle {
        let program = &self.argv[0];
        let name = Path::new(program)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| program.clone());
        ProcessHandle::new(self.pid(), name, self.argv.join(" "))
    }

    fn poll(&mut self) -> Result<Option<i32>> {
        if self.exit_code.is_some() {
            return Ok(self.exit_code);
        }
        let status = self.child.try_wait().map_err(PtmonError::Poll)?;
        if let Some(status) = status {
            let code = exit_code(status);
            info!("pid {} exited with code {}", self.child.id(), code);
            self.exit_code = Some(code);
        }
        Ok(self.exit_code)
    }
}
