//! End-to-end monitoring run.
//!
//! Launches the command, opens the output, writes the header, and drains the
//! [`Sampler`] into a [`RecordWriter`] until the command exits. Nothing is
//! written if the command cannot be launched.

use std::io::{self, Write};

use log::{info, warn};

use crate::config::{validate_config, Config};
use crate::error::{PtmonError, Result};
use crate::process::{LaunchedProcess, Probe, SystemProbe, SystemTracker, Target, Tracker};
use crate::record::RowFormat;
use crate::sampler::Sampler;
use crate::signal::SignalHandler;
use crate::sink::{OutputTarget, RecordWriter};

/// Monitors `argv` until it exits and returns its exit code.
///
/// # Errors
///
/// - [`PtmonError::InvalidInterval`] or [`PtmonError::Config`] for an invalid config,
///   before anything is launched
/// - [`PtmonError::Launch`] if the command cannot be started; no output is produced
/// - [`PtmonError::OutputOpen`] if the output file cannot be created; the
///   command is killed
/// - [`PtmonError::Output`] if writing fails part-way
/// - [`PtmonError::Poll`] if the command's status cannot be queried
pub fn run(
    argv: &[String],
    config: &Config,
    output: &OutputTarget,
    signals: &SignalHandler,
) -> Result<i32> {
    validate_config(config)?;

    let mut target = LaunchedProcess::launch(argv)?;

    let out = match output.open() {
        Ok(out) => out,
        Err(e) => {
            match target.terminate() {
                Ok(code) => info!("killed pid {} (exit code {})", target.pid(), code),
                Err(kill_err) => warn!("could not stop pid {}: {}", target.pid(), kill_err),
            }
            return Err(e);
        }
    };

    let sampler = Sampler::new(
        target,
        SystemTracker::new(),
        SystemProbe::new(config.io),
        config.interval(),
        config.label,
    );
    let writer = RecordWriter::new(
        out,
        RowFormat::new(config.separator.clone(), config.io),
        config.flush_every,
    );

    drive(sampler, writer, signals)
}

/// Writes the header and every tick of `sampler` to `writer`.
///
/// Returns the target's exit code once the sampler is exhausted.
pub fn drive<T, K, P, W>(
    mut sampler: Sampler<T, K, P>,
    mut writer: RecordWriter<W>,
    signals: &SignalHandler,
) -> Result<i32>
where
    T: Target,
    K: Tracker,
    P: Probe,
    W: Write,
{
    writer.write_header()?;

    let pid = sampler.target().pid();
    let mut ticks = 0u64;
    let mut interrupt_noted = false;

    for tick in sampler.by_ref() {
        let tick = tick?;
        writer.write_tick(&tick)?;
        ticks += 1;

        if signals.is_interrupted() && !interrupt_noted {
            warn!("interrupt received; sampling until pid {} exits", pid);
            interrupt_noted = true;
        }
    }

    let records = writer.records_written();
    writer.finish()?;

    let exit_code = sampler.exit_code().ok_or_else(|| {
        PtmonError::Poll(io::Error::new(
            io::ErrorKind::Other,
            "sampling stopped before the target exited",
        ))
    })?;

    info!(
        "target exited with code {} after {} ticks ({} records)",
        exit_code, ticks, records
    );

    Ok(exit_code)
}
