//! Scripted executor for testing without a container runtime or certbot.

use crate::error::{Error, Result};
use crate::executor::CommandExecutor;
use crate::types::CommandOutput;
use std::collections::{HashSet, VecDeque};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Executor that replays pre-seeded outputs in order.
///
/// Every argument vector it receives is recorded and can be read back with
/// [`commands`](Self::commands). Running past the end of the script is an
/// error, so an unexpected extra command fails the test that issued it.
#[derive(Debug, Clone, Default)]
pub struct ScriptedExecutor {
    script: Arc<Mutex<VecDeque<CommandOutput>>>,
    commands: Arc<Mutex<Vec<Vec<String>>>>,
    programs: HashSet<String>,
    paths: HashSet<PathBuf>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ScriptedExecutor {
    /// Create an executor with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `program` resolvable.
    pub fn with_program(mut self, program: &str) -> Self {
        self.programs.insert(program.to_string());
        self
    }

    /// Make `path` exist on the fake target.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.paths.insert(path.into());
        self
    }

    /// Append the output of the next command.
    pub fn push(&self, output: CommandOutput) {
        lock(&self.script).push_back(output);
    }

    /// Every argument vector executed so far, in order.
    pub fn commands(&self) -> Vec<Vec<String>> {
        lock(&self.commands).clone()
    }

    /// Number of scripted outputs not consumed yet.
    pub fn remaining(&self) -> usize {
        lock(&self.script).len()
    }
}

impl CommandExecutor for ScriptedExecutor {
    fn execute(&self, argv: &[String], _mutable: bool) -> Result<CommandOutput> {
        lock(&self.commands).push(argv.to_vec());
        lock(&self.script).pop_front().ok_or_else(|| Error::Spawn {
            program: argv.first().cloned().unwrap_or_default(),
            source: io::Error::other(format!("no scripted output for `{}`", argv.join(" "))),
        })
    }

    fn locate(&self, program: &str) -> Option<PathBuf> {
        self.programs
            .contains(program)
            .then(|| PathBuf::from("/usr/bin").join(program))
    }

    fn path_exists(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }
}
