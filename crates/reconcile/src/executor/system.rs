//! Executor that runs real commands on the local machine.

use crate::error::{Error, Result};
use crate::executor::CommandExecutor;
use crate::types::CommandOutput;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Runs commands with [`std::process::Command`].
///
/// In dry-run mode mutating commands are logged and skipped; inspection
/// commands still run so the reported outcome reflects real state.
#[derive(Debug, Clone, Default)]
pub struct SystemExecutor {
    dry_run: bool,
}

impl SystemExecutor {
    /// Executor that runs every command
    pub fn new() -> Self {
        Self::default()
    }

    /// Executor that skips mutating commands when `dry_run` is set
    pub fn dry_run(dry_run: bool) -> Self {
        Self { dry_run }
    }

    /// Whether mutating commands are skipped
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }
}

impl CommandExecutor for SystemExecutor {
    fn execute(&self, argv: &[String], mutable: bool) -> Result<CommandOutput> {
        let (program, args) = argv.split_first().ok_or_else(|| Error::Spawn {
            program: String::new(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "empty argument vector"),
        })?;

        if mutable && self.dry_run {
            log::info!("dry-run, skipping: {}", argv.join(" "));
            return Ok(CommandOutput::ok(""));
        }

        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|source| Error::Spawn {
                program: program.clone(),
                source,
            })?;

        Ok(output.into())
    }

    fn locate(&self, program: &str) -> Option<PathBuf> {
        which::which(program).ok()
    }

    fn path_exists(&self, path: &Path) -> bool {
        path.exists()
    }
}
