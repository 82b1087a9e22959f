//! CLI argument definitions for the grid scenario runner.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "gridsync",
    version,
    about = "Replay grid scenarios against a headless grid engine",
    long_about = "Replay grid scenarios against a headless grid engine.\n\n\
                  A scenario declares columns, configuration and a list of steps: data\n\
                  loads, sorts, grouping, selection and simulated user gestures. The\n\
                  final declarative and engine state is printed when the replay settles."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Replay a scenario file and print the settled grid state.
    Replay(ReplayArgs),

    /// Check a scenario file without replaying it.
    Check(CheckArgs),
}

#[derive(Parser)]
pub struct ReplayArgs {
    /// Scenario file (JSON).
    #[arg(value_name = "SCENARIO")]
    pub scenario: PathBuf,

    /// How to print the result.
    #[arg(long = "output", value_enum, default_value = "table")]
    pub output: OutputArg,

    /// Also print engine API call counts.
    #[arg(long = "calls")]
    pub calls: bool,
}

#[derive(Parser)]
pub struct CheckArgs {
    /// Scenario file (JSON).
    #[arg(value_name = "SCENARIO")]
    pub scenario: PathBuf,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputArg {
    Table,
    Json,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
