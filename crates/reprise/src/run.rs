//! Resolve retry settings and run the command under them

use anyhow::{Context, Result};
use std::process::ExitCode;

use reprise_core::retry::{Hook, Retry, TracingObserver};
use reprise_core::types::RetrySettings;
use reprise_core::ConfigLoader;

use crate::cli::Cli;
use crate::command::{CommandFailure, ShellCommand};

/// Run the command from `cli` with retries
pub fn run(cli: Cli) -> Result<ExitCode> {
    let command =
        ShellCommand::from_argv(&cli.command).context("No command given to run")?;

    let settings = load_settings(&cli)?;
    let mut retry = build_retry(&command, &cli, &settings)?;

    match retry.run() {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(failure) => Ok(ExitCode::from(failure.exit_code())),
    }
}

/// Settings for the selected operation from config files and environment
fn load_settings(cli: &Cli) -> Result<RetrySettings> {
    let mut loader = ConfigLoader::new()?;
    if let Some(path) = &cli.config {
        loader = loader.with_file(path);
    }

    loader
        .load_operation(&cli.operation)
        .context("Failed to load retry configuration")
}

/// Build the retry from `settings`, with command-line flags taking precedence
fn build_retry<'a>(
    command: &'a ShellCommand,
    cli: &Cli,
    settings: &RetrySettings,
) -> Result<Retry<'a, (), CommandFailure, reprise_core::SystemClock, TracingObserver>> {
    let mut retry = Retry::new(move || command.run())
        .with_observer(TracingObserver::new(command.program()));

    settings
        .configure(&mut retry)
        .with_context(|| format!("Invalid settings for operation '{}'", cli.operation))?;

    if let Some(limit) = cli.timeout {
        retry.set_timeout(limit.0);
    }
    if let Some(limit) = cli.max_attempts {
        retry.set_count(limit.0)?;
    }
    if let Some(pause) = cli.pause {
        retry.set_pause(pause);
    }
    if !cli.catch_only.is_empty() {
        retry
            .set_failure_kind_names(&cli.catch_only)
            .context("Invalid --catch-only value")?;
    }

    let pause = retry.pause();
    retry.set_hook(Hook::BeforePause, move |failure: &CommandFailure| {
        tracing::info!(%failure, pause = ?pause, "pausing before next run");
    });

    Ok(retry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_flags_override_settings() {
        let settings = RetrySettings {
            timeout_us: 1_000_000,
            max_attempts: 5,
            pause_us: 10,
            catch_only: vec!["exit".to_string()],
        };
        let cli = parse(&["reprise", "-n", "2", "-p", "1ms", "--catch-only", "any", "true"]);
        let command = ShellCommand::from_argv(&cli.command).unwrap();

        let retry = build_retry(&command, &cli, &settings).unwrap();
        assert_eq!(retry.timeout(), Some(Duration::from_secs(1)));
        assert_eq!(retry.count(), Some(2));
        assert_eq!(retry.pause(), Duration::from_millis(1));
        assert!(retry.catches_all());
        assert!(retry.has_hook(Hook::BeforePause));
    }

    #[test]
    fn test_unknown_catch_only_kind() {
        let cli = parse(&["reprise", "--catch-only", "oom", "true"]);
        let command = ShellCommand::from_argv(&cli.command).unwrap();

        assert!(build_retry(&command, &cli, &RetrySettings::default()).is_err());
    }

    #[test]
    fn test_operation_settings_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("reprise.yaml");
        fs::write(
            &path,
            "default:\n  max-attempts: 9\noperations:\n  deploy:\n    max-attempts: 2\n",
        )
        .unwrap();
        let path = path.to_str().unwrap();

        let cli = parse(&["reprise", "-c", path, "--operation", "deploy", "true"]);
        let settings = load_settings(&cli).unwrap();
        assert_eq!(settings.max_attempts, 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_exit_code_of_final_failure() {
        let cli = parse(&["reprise", "-n", "2", "--", "sh", "-c", "exit 4"]);
        let command = ShellCommand::from_argv(&cli.command).unwrap();
        let mut retry = build_retry(&command, &cli, &RetrySettings::default()).unwrap();

        let failure = retry.run().unwrap_err();
        assert_eq!(failure.exit_code(), 4);
    }
}
