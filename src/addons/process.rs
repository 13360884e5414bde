//! External process execution.
//!
//! Every git invocation goes through [`ProcessRunner`] so the pipeline can be
//! driven by a fake in tests.

use super::types::AddonError;
use std::path::Path;
use std::process::Command;
use tracing::debug;

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code (`-1` if terminated by a signal).
    pub code: i32,
    /// Captured stdout.
    pub stdout: String,
    /// Captured stderr.
    pub stderr: String,
}

impl ProcessOutput {
    /// Returns true if the process exited with status zero.
    #[must_use]
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// Returns stdout with surrounding whitespace removed.
    #[must_use]
    pub fn stdout_trimmed(&self) -> &str {
        self.stdout.trim()
    }
}

/// Runs external programs to completion.
pub trait ProcessRunner {
    /// Runs `program` with `args` in `cwd` and waits for it to exit.
    ///
    /// Returns an error only if the process could not be started; a non-zero
    /// exit is reported through [`ProcessOutput::code`].
    fn run(&self, program: &str, args: &[&str], cwd: &Path) -> Result<ProcessOutput, AddonError>;
}

/// Runs programs with `std::process::Command`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str], cwd: &Path) -> Result<ProcessOutput, AddonError> {
        debug!("[ADDON-PROC] {} {} (in {})", program, args.join(" "), cwd.display());

        let output = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .output()
            .map_err(|source| AddonError::Process {
                program: program.to_string(),
                source,
            })?;

        let result = ProcessOutput {
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };

        debug!("[ADDON-PROC] {} exited with {}", program, result.code);
        Ok(result)
    }
}
