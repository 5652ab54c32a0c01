use crate::error::{PtmonError, Result};
use crate::process::LabelMode;
use crate::sink::DEFAULT_FLUSH_EVERY;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The base config directory name under ~/.config/
const CONFIG_DIR_NAME: &str = "ptmon";

/// The filename of the user configuration file.
const CONFIG_FILENAME: &str = "config.toml";

// ============================================================================
// Sampling Configuration
// ============================================================================

/// Settings that control how the monitored process tree is sampled and how
/// the resulting table is written.
///
/// Values come from three layers, highest precedence first: command-line
/// flags, the config file, and the defaults below.
///
/// # Example
///
/// ```toml
/// # Seconds between samples
/// interval = 0.5
///
/// # Column separator
/// separator = "\t"
///
/// # Process label: "pname" or "cmdline"
/// label = "pname"
///
/// # Collect per-process I/O counters
/// io = false
///
/// # Records written between flushes
/// flush_every = 100
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Seconds between two ticks. Must be finite and greater than zero.
    #[serde(default = "default_interval")]
    pub interval: f64,

    /// String placed between columns.
    #[serde(default = "default_separator")]
    pub separator: String,

    /// How processes are labelled in the `Process` column.
    #[serde(default)]
    pub label: LabelMode,

    /// Whether to add the four I/O counter columns.
    #[serde(default)]
    pub io: bool,

    /// Number of records written between two flushes of the output.
    #[serde(default = "default_flush_every")]
    pub flush_every: usize,
}

fn default_interval() -> f64 {
    0.5
}

fn default_separator() -> String {
    "\t".to_string()
}

fn default_flush_every() -> usize {
    DEFAULT_FLUSH_EVERY
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            separator: default_separator(),
            label: LabelMode::default(),
            io: false,
            flush_every: default_flush_every(),
        }
    }
}

impl Config {
    /// The sampling interval as a `Duration`.
    ///
    /// Only meaningful for a validated config.
    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(self.interval)
    }

    /// Layers command-line values over this config.
    pub fn apply(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(interval) = overrides.interval {
            self.interval = interval;
        }
        if let Some(separator) = overrides.separator {
            self.separator = unescape_separator(&separator);
        }
        if let Some(label) = overrides.label {
            self.label = label;
        }
        if overrides.io {
            self.io = true;
        }
        self
    }
}

/// Values given on the command line. `None` leaves the config value alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub interval: Option<f64>,
    pub separator: Option<String>,
    pub label: Option<LabelMode>,
    /// `--io` can only switch collection on.
    pub io: bool,
}

/// Expands `\t`, `\n` and `\\` in a separator given as text.
///
/// Shells make a literal tab awkward to type, so `-s '\t'` means a tab.
/// Any other backslash sequence is kept as written.
pub fn unescape_separator(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('t') => {
                out.push('\t');
                chars.next();
            }
            Some('n') => {
                out.push('\n');
                chars.next();
            }
            Some('\\') => {
                out.push('\\');
                chars.next();
            }
            _ => out.push('\\'),
        }
    }
    out
}

// ============================================================================
// Config Validation
// ============================================================================

/// Validate a configuration before sampling starts.
///
/// # Validation Rules
///
/// - `interval` must be finite and greater than zero
/// - `separator` must not be empty
/// - `flush_every` must be at least 1
///
/// # Example
///
/// ```
/// use ptmon::config::{validate_config, Config};
///
/// assert!(validate_config(&Config::default()).is_ok());
///
/// let stalled = Config {
///     interval: 0.0,
///     ..Default::default()
/// };
/// assert!(validate_config(&stalled).is_err());
/// ```
pub fn validate_config(config: &Config) -> Result<()> {
    if !config.interval.is_finite() || config.interval <= 0.0 {
        return Err(PtmonError::InvalidInterval(config.interval));
    }
    // Duration::from_secs_f64 panics past the upper bound; below a nanosecond
    // every tick would carry the same label.
    if config.interval > u64::MAX as f64 || config.interval().is_zero() {
        return Err(PtmonError::InvalidInterval(config.interval));
    }
    if config.separator.is_empty() {
        return Err(PtmonError::Config("Column separator must not be empty".to_string()));
    }
    if config.flush_every == 0 {
        return Err(PtmonError::Config("`flush_every` must be at least 1".to_string()));
    }
    Ok(())
}

// ============================================================================
// Config File Management
// ============================================================================

/// Get the ptmon config directory path (~/.config/ptmon/).
///
/// Returns the path to the config directory. Does not create the directory.
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| PtmonError::Config("Could not determine home directory".to_string()))?;
    Ok(home.join(".config").join(CONFIG_DIR_NAME))
}

/// Get the path to the default config file (~/.config/ptmon/config.toml).
pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILENAME))
}

/// Load the configuration.
///
/// With an explicit `path`, that file must exist. Without one, the default
/// config file is read if present; otherwise the built-in defaults apply.
///
/// # Errors
///
/// Returns an error if:
/// - An explicit config file does not exist
/// - The home directory cannot be determined (default location only)
/// - The file cannot be read or contains invalid TOML or unknown keys
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => {
            if !path.exists() {
                return Err(PtmonError::ConfigNotFound(path.to_path_buf()));
            }
            load_config_from(path)
        }
        None => {
            let default_path = config_path()?;
            if default_path.exists() {
                load_config_from(&default_path)
            } else {
                Ok(Config::default())
            }
        }
    }
}

/// Read and parse a config file.
pub fn load_config_from(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)?;
    let mut config: Config = toml::from_str(&content).map_err(|e| {
        PtmonError::Config(format!("Failed to parse config file at {:?}: {}", path, e))
    })?;
    config.separator = unescape_separator(&config.separator);
    Ok(config)
}

/// Generate config file content with explanatory comments.
///
/// The output parses back into an identical [`Config`].
pub fn generate_config_with_comments(config: &Config) -> String {
    let separator = toml::Value::String(config.separator.clone());
    format!(
        r#"# ptmon configuration
# Command-line flags take precedence over the values in this file.

# Seconds between samples (greater than zero)
interval = {interval:?}

# String placed between output columns
separator = {separator}

# Process label in the Process column
# - "pname": short process name
# - "cmdline": full command line
label = "{label}"

# Add IO reads, IO writes, IO read MB and IO written MB columns
# Counters that cannot be read are written as -1
io = {io}

# Records written between flushes of the output
flush_every = {flush_every}
"#,
        interval = config.interval,
        separator = separator,
        label = config.label,
        io = config.io,
        flush_every = config.flush_every,
    )
}
