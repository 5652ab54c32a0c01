pub mod config;
pub mod error;
pub mod monitor;
pub mod output;
pub mod process;
pub mod record;
pub mod sampler;
pub mod signal;
pub mod sink;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::Config;
pub use error::{PtmonError, Result};
pub use monitor::run;
pub use process::{LabelMode, Measurement, ProcessHandle};
pub use record::{Record, RowFormat};
pub use sampler::{Phase, Sampler, Tick};
pub use signal::SignalHandler;
pub use sink::{OutputTarget, RecordWriter};
