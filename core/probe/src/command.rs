//! Narrow command-execution interface for shell-based probes.

use std::process::Command;
use tracing::debug;

use adeprecheck_common::Result;

/// Captured result of one external command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutcome {
    /// Exit code; `-1` when the process was terminated by a signal.
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutcome {
    /// Outcome with the given exit code and no output.
    pub fn exit(status: i32) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    /// Exit code 0.
    pub fn success(&self) -> bool {
        self.status == 0
    }

    /// Trimmed stderr, or stdout when stderr is empty.
    pub fn diagnostic(&self) -> &str {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim()
        } else {
            stderr
        }
    }
}

/// Runs an external program to completion.
///
/// # Errors
/// Implementations return an error only when the program could not be run
/// at all; a non-zero exit is reported through [`CommandOutcome::status`].
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutcome>;
}

/// Runs commands with `std::process::Command`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutcome> {
        debug!(program, ?args, "running command");
        let output = Command::new(program).args(args).output()?;
        let outcome = CommandOutcome {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        debug!(program, status = outcome.status, "command finished");
        Ok(outcome)
    }
}
