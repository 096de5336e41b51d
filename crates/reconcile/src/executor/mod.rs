//! Command execution seam.
//!
//! Reconcilers never spawn processes or look at the filesystem themselves:
//! everything that touches the target host goes through [`CommandExecutor`].
//! [`SystemExecutor`] runs real commands; [`ScriptedExecutor`] replays
//! pre-seeded outputs for tests.
//!
//! ```
//! use reconcile::{CommandExecutor, CommandOutput, RunOptions, ScriptedExecutor};
//!
//! let exec = ScriptedExecutor::new().with_program("docker");
//! exec.push(CommandOutput::failed(1, "Error: No such object: web"));
//!
//! let out = exec
//!     .run(&reconcile::argv(["docker", "inspect", "web"]), RunOptions::INSPECT)
//!     .unwrap();
//! assert!(!out.success());
//! assert_eq!(exec.commands(), vec![vec!["docker", "inspect", "web"]]);
//! ```

pub mod scripted;
pub mod system;

pub use scripted::ScriptedExecutor;
pub use system::SystemExecutor;

use crate::error::{Error, Result};
use crate::types::{CommandOutput, RunOptions};
use std::path::{Path, PathBuf};

/// Transport that runs commands against a target host.
pub trait CommandExecutor: Send + Sync {
    /// Run an argument vector and capture its output.
    ///
    /// Only fails when the command cannot be run at all; the exit code is
    /// reported in the returned [`CommandOutput`]. `mutable` marks commands
    /// that change state on the target.
    fn execute(&self, argv: &[String], mutable: bool) -> Result<CommandOutput>;

    /// Resolve a program on the target's execution path.
    fn locate(&self, program: &str) -> Option<PathBuf>;

    /// Whether a path exists on the target.
    fn path_exists(&self, path: &Path) -> bool;

    /// Run a command, failing on non-zero exit when `opts.check` is set.
    fn run(&self, argv: &[String], opts: RunOptions) -> Result<CommandOutput> {
        log::debug!(
            "run{}: {}",
            if opts.mutable { "" } else { " (inspect)" },
            argv.join(" ")
        );
        let output = self.execute(argv, opts.mutable)?;

        if opts.check && !output.success() {
            return Err(Error::Execution {
                argv: argv.to_vec(),
                exit_code: output.exit_code,
                stdout: output.stdout_str(),
                stderr: output.stderr_str(),
            });
        }

        Ok(output)
    }

    /// Resolve a program or fail with [`Error::Precondition`].
    fn require(&self, program: &str) -> Result<PathBuf> {
        self.locate(program).ok_or_else(|| Error::Precondition {
            program: program.to_string(),
        })
    }
}

/// Build an owned argument vector from string-like parts
pub fn argv<I, S>(parts: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    parts.into_iter().map(Into::into).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_checked_failure_raises() {
        let exec = ScriptedExecutor::new();
        exec.push(CommandOutput::failed(125, "pull access denied"));

        let err = exec
            .run(&argv(["docker", "pull", "nope"]), RunOptions::MUTATE)
            .unwrap_err();
        match err {
            Error::Execution {
                argv, exit_code, stderr, ..
            } => {
                assert_eq!(argv, vec!["docker", "pull", "nope"]);
                assert_eq!(exit_code, 125);
                assert_eq!(stderr, "pull access denied");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_run_unchecked_failure_is_returned() {
        let exec = ScriptedExecutor::new();
        exec.push(CommandOutput::failed(1, ""));

        let out = exec
            .run(&argv(["docker", "inspect", "web"]), RunOptions::INSPECT)
            .unwrap();
        assert_eq!(out.exit_code, 1);
    }

    #[test]
    fn test_require_missing_program() {
        let exec = ScriptedExecutor::new().with_program("docker");
        assert!(exec.require("docker").is_ok());
        assert!(matches!(
            exec.require("certbot"),
            Err(Error::Precondition { program }) if program == "certbot"
        ));
    }
}
