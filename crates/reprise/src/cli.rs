//! CLI argument parsing with clap

use camino::Utf8PathBuf;
use clap::Parser;
use std::time::Duration;

use crate::duration::{
    parse_attempt_limit, parse_duration, parse_time_limit, AttemptLimit, TimeLimit,
};

/// Reprise - retry a command until it succeeds or a retry limit is reached
#[derive(Parser, Debug)]
#[command(name = "reprise")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only report errors
    #[arg(short, long)]
    pub quiet: bool,

    /// Path to a reprise.yaml config file
    #[arg(short, long)]
    pub config: Option<Utf8PathBuf>,

    /// Named operation whose settings to use from the config file
    #[arg(long, default_value = "default")]
    pub operation: String,

    /// Give up once this much time has passed (e.g. 30s, 500ms; -1 = unbounded)
    #[arg(short, long, allow_negative_numbers = true, value_parser = parse_time_limit)]
    pub timeout: Option<TimeLimit>,

    /// Give up after this many runs (-1 = unbounded)
    #[arg(
        short = 'n',
        long,
        allow_negative_numbers = true,
        value_parser = parse_attempt_limit
    )]
    pub max_attempts: Option<AttemptLimit>,

    /// Wait this long between runs (e.g. 100ms, 2s)
    #[arg(short, long, value_parser = parse_duration)]
    pub pause: Option<Duration>,

    /// Only retry these failure kinds: exit, signal, spawn or any
    #[arg(long, value_delimiter = ',')]
    pub catch_only: Vec<String>,

    /// Command to run, with its arguments
    #[arg(
        required = true,
        num_args = 1..,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub command: Vec<String>,
}
