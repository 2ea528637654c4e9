//! Running the retried command

use std::fmt;
use std::io;
use std::process::ExitStatus;
use std::str::FromStr;

use reprise_core::Classify;
use thiserror::Error;

/// Why a single run of the command failed
#[derive(Error, Debug)]
pub enum CommandFailure {
    #[error("command exited with status {0}")]
    Exit(i32),

    #[error("command was terminated by a signal")]
    Signal,

    #[error("command could not be started: {0}")]
    Spawn(#[source] io::Error),
}

impl CommandFailure {
    /// Exit code to report when this failure ends the run, within 1..=255
    pub fn exit_code(&self) -> u8 {
        match self {
            CommandFailure::Exit(code) => (*code).clamp(1, 255) as u8,
            _ => 1,
        }
    }

    fn from_status(status: ExitStatus) -> Option<Self> {
        if status.success() {
            return None;
        }
        Some(match status.code() {
            Some(code) => CommandFailure::Exit(code),
            None => CommandFailure::Signal,
        })
    }
}

/// Failure categories usable with `--catch-only`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandFailureKind {
    Exit,
    Signal,
    Spawn,
}

impl CommandFailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandFailureKind::Exit => "exit",
            CommandFailureKind::Signal => "signal",
            CommandFailureKind::Spawn => "spawn",
        }
    }
}

impl fmt::Display for CommandFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommandFailureKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "exit" => Ok(CommandFailureKind::Exit),
            "signal" => Ok(CommandFailureKind::Signal),
            "spawn" => Ok(CommandFailureKind::Spawn),
            _ => Err(format!("unknown failure kind: {}", s)),
        }
    }
}

impl Classify for CommandFailure {
    type Kind = CommandFailureKind;

    fn kind(&self) -> CommandFailureKind {
        match self {
            CommandFailure::Exit(_) => CommandFailureKind::Exit,
            CommandFailure::Signal => CommandFailureKind::Signal,
            CommandFailure::Spawn(_) => CommandFailureKind::Spawn,
        }
    }
}

/// Program and arguments to run, with inherited stdio
#[derive(Debug, Clone)]
pub struct ShellCommand {
    program: String,
    args: Vec<String>,
}

impl ShellCommand {
    /// Split `argv` into program and arguments; `None` when empty
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Run the command once and wait for it
    pub fn run(&self) -> Result<(), CommandFailure> {
        tracing::debug!(program = %self.program, args = ?self.args, "running command");

        let output = duct::cmd(&self.program, &self.args)
            .unchecked()
            .run()
            .map_err(CommandFailure::Spawn)?;

        match CommandFailure::from_status(output.status) {
            Some(failure) => Err(failure),
            None => Ok(()),
        }
    }
}
