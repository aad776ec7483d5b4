//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Fan-in - deadline-bounded racing-replica search dispatcher
#[derive(Parser, Debug)]
#[command(
    name = "fanin",
    author,
    version,
    about = "Deadline-bounded racing-replica fan-in dispatcher",
    long_about = "Sends one query to every category of redundant replicas.\n\n\
                  Within a category the first replica to answer wins; across \n\
                  categories results are collected in arrival order until the \n\
                  deadline fires."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "FANIN_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "compact",
        global = true,
        env = "FANIN_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Aggregate one query across every configured category
    Run(RunArgs),

    /// Race the replicas of a single category
    Race(RaceArgs),

    /// Run a streaming replica, read until it goes quiet, then shut it down
    Stream(StreamArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "configs/search.toml",
        env = "FANIN_CONFIG"
    )]
    pub config: PathBuf,

    /// Override the query from configuration
    #[arg(long, env = "FANIN_QUERY")]
    pub query: Option<String>,

    /// Override the deadline from configuration (milliseconds)
    #[arg(long, env = "FANIN_DEADLINE_MS")]
    pub deadline_ms: Option<u64>,

    /// Override the straggler policy from configuration
    #[arg(long, value_enum)]
    pub straggler_policy: Option<PolicyArg>,

    /// Number of aggregations to run (> 1 prints a statistics summary)
    #[arg(long, default_value = "1", value_parser = clap::value_parser!(u32).range(1..))]
    pub repeat: u32,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,

    /// Validate configuration and exit without running
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "FANIN_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `race` command
#[derive(Parser, Debug, Clone)]
pub struct RaceArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "configs/search.toml",
        env = "FANIN_CONFIG"
    )]
    pub config: PathBuf,

    /// Category to race
    #[arg(long)]
    pub category: String,

    /// Override the query from configuration
    #[arg(long)]
    pub query: Option<String>,

    /// Output the outcome as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `stream` command
#[derive(Parser, Debug, Clone)]
pub struct StreamArgs {
    /// Name of the streaming replica
    #[arg(long, default_value = "joe")]
    pub label: String,

    /// Query answered over and over
    #[arg(long, default_value = "boring")]
    pub query: String,

    /// Upper bound of the random pause between two results (milliseconds)
    #[arg(long, default_value = "1000")]
    pub interval_ms: u64,

    /// Give up once no result arrived for this long (milliseconds)
    #[arg(long, default_value = "800")]
    pub idle_timeout_ms: u64,

    /// Stop reading after this many results
    #[arg(long, default_value = "10")]
    pub max: usize,

    /// How far the replica may run ahead of the reader
    #[arg(long, default_value = "1")]
    pub buffer: usize,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "configs/search.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "configs/search.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show every replica with its delay profile
    #[arg(long)]
    pub replicas: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    Pretty,
    /// Compact single-line format
    #[default]
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}

/// Straggler policy as a command-line value
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum PolicyArg {
    /// Leave losing replicas running
    Detach,
    /// Cancel losing replicas and late categories
    Cancel,
}

impl From<PolicyArg> for contracts::StragglerPolicy {
    fn from(policy: PolicyArg) -> Self {
        match policy {
            PolicyArg::Detach => Self::Detach,
            PolicyArg::Cancel => Self::Cancel,
        }
    }
}
