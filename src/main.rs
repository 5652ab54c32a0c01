//! ptmon CLI entry point.
//!
//! Parses command-line arguments, resolves the configuration, and runs the
//! monitor. Exits with the monitored command's own exit code.

use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use ptmon::config::{
    generate_config_with_comments, load_config, validate_config, ConfigOverrides,
};
use ptmon::output::{print_error, print_info, print_warning};
use ptmon::process::split_command;
use ptmon::{LabelMode, OutputTarget, Result, SignalHandler};
use std::io;
use std::path::PathBuf;

/// Intervals below this are dominated by the cost of a measurement pass.
const SHORT_INTERVAL_SECS: f64 = 0.01;

#[derive(Parser)]
#[command(name = "ptmon")]
#[command(
    version,
    about = "Record CPU, memory, thread and I/O usage of a command and all of its child processes",
    after_help = "EXAMPLES:
    # Sample every half second, tab-separated, to stdout
    ptmon 'sleep 2'

    # Sample every 0.1s with full command lines, written to a file
    ptmon -i 0.1 -p cmdline -o usage.tsv 'make -j8'

    # Include I/O counters; pass arguments verbatim after --
    ptmon --io -s ',' -- sh -c 'tar czf out.tgz src'

OUTPUT:
    One header line, then one line per process per tick:
        Time  CPU%  Threads  RSS  VMS  [IO reads  IO writes  IO read MB  IO written MB]  PID  Process
    Time is the tick number times the interval. RSS, VMS and I/O sizes are in
    whole megabytes. A process that exits while being measured gets empty
    measurement fields; I/O counters that cannot be read are -1.

CONFIG FILE:
    ~/.config/ptmon/config.toml (or --config <PATH>) may set interval,
    separator, label, io and flush_every. Command-line flags take precedence.
    Use --print-config to see the effective configuration.

EXIT STATUS:
    The exit code of the monitored command, or 1 if monitoring failed."
)]
struct Cli {
    /// Command to monitor: one quoted string split on whitespace, or the
    /// arguments after `--` taken verbatim. Options must come before it.
    #[arg(
        value_name = "CMD",
        trailing_var_arg = true,
        required_unless_present_any = ["print_config", "completions"]
    )]
    command: Vec<String>,

    /// Seconds between measurements [default: 0.5]
    #[arg(short, long, value_name = "INTERVAL")]
    interval: Option<f64>,

    /// String separating output columns; `\t` means tab [default: \t]
    #[arg(short = 's', long = "sep", value_name = "SEP")]
    separator: Option<String>,

    /// Process label: just the process name (`pname`) or the full command
    /// line (`cmdline`) [default: pname]
    #[arg(short = 'p', long = "proctype", value_name = "PROCTYPE")]
    label: Option<LabelMode>,

    /// File to write the data to, or `-` for stdout
    #[arg(short, long, value_name = "OUTPUT", default_value = "-")]
    output: OutputTarget,

    /// Also record I/O counters (reads, writes, MB read, MB written)
    #[arg(long)]
    io: bool,

    /// Read settings from this TOML file instead of ~/.config/ptmon/config.toml
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log sampling progress to stderr
    #[arg(short, long)]
    verbose: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,

    /// Output shell completion script to stdout (hidden utility flag)
    #[arg(long, value_name = "SHELL", hide = true)]
    completions: Option<Shell>,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Some(shell) = cli.completions {
        clap_complete::generate(shell, &mut Cli::command(), "ptmon", &mut io::stdout());
        return;
    }

    let code = match run_cli(cli) {
        Ok(code) => code,
        Err(e) => {
            print_error(&e.to_string());
            1
        }
    };

    std::process::exit(code);
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}

fn run_cli(cli: Cli) -> Result<i32> {
    let config = load_config(cli.config.as_deref())?.apply(ConfigOverrides {
        interval: cli.interval,
        separator: cli.separator,
        label: cli.label,
        io: cli.io,
    });

    if cli.print_config {
        validate_config(&config)?;
        print!("{}", generate_config_with_comments(&config));
        return Ok(0);
    }

    let argv = split_command(&cli.command)?;

    if config.interval < SHORT_INTERVAL_SECS {
        print_warning(&format!(
            "an interval of {}s is shorter than a measurement pass may take; \
            ticks will drift from wall-clock time",
            config.interval
        ));
    }
    if cli.verbose {
        print_info(&format!(
            "monitoring {:?} every {}s, writing to {}",
            argv, config.interval, cli.output
        ));
    }

    let signals = SignalHandler::new().unwrap_or_else(|e| {
        print_warning(&format!("{}; Ctrl+C will stop ptmon immediately", e));
        SignalHandler::detached()
    });
    ptmon::run(&argv, &config, &cli.output, &signals)
}
