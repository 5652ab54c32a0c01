//! SIGINT handling for the monitor process.
//!
//! The monitored command shares the terminal's process group, so a Ctrl+C
//! reaches it directly. Without a handler the monitor would die at the same
//! moment and lose any buffered rows. With one installed, the monitor keeps
//! sampling until the command actually exits, then flushes and reports the
//! command's status.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{PtmonError, Result};

/// Records whether SIGINT has been received.
///
/// `SignalHandler` is cheap to clone; clones share the same flag.
///
/// # Example
///
/// ```ignore
/// let handler = SignalHandler::new()?;
///
/// for tick in sampler {
///     if handler.is_interrupted() {
///         // The target got the same signal; keep going until it exits.
///     }
/// }
/// ```
#[derive(Clone, Default)]
pub struct SignalHandler {
    interrupted: Arc<AtomicBool>,
}

impl SignalHandler {
    /// Creates a new `SignalHandler` and registers it for SIGINT.
    ///
    /// # Errors
    ///
    /// Returns an error if the handler cannot be registered. `ctrlc` allows
    /// one registration per process.
    pub fn new() -> Result<Self> {
        let handler = Self::detached();
        let flag = Arc::clone(&handler.interrupted);

        ctrlc::set_handler(move || {
            flag.store(true, Ordering::SeqCst);
        })
        .map_err(|e| PtmonError::SignalHandler(e.to_string()))?;

        Ok(handler)
    }

    /// Creates a handler that is not registered with the OS.
    ///
    /// Used where no signal should be intercepted, such as library callers
    /// and tests.
    pub fn detached() -> Self {
        Self::default()
    }

    /// Checks if SIGINT has been received (non-blocking).
    pub fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }

    /// Marks the handler as interrupted, as the OS handler would.
    pub fn trigger(&self) {
        self.interrupted.store(true, Ordering::SeqCst);
    }
}
