//! Core types shared by every operation kind

use serde::{Deserialize, Serialize};
use std::fmt;
use std::process::Output;

/// The machine an operation is reconciled against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    /// Name used in outcomes and logs
    pub name: String,
}

impl Host {
    /// Create a host with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// The implicit host used when a plan doesn't name one
    pub fn local() -> Self {
        Self::new("local")
    }
}

impl Default for Host {
    fn default() -> Self {
        Self::local()
    }
}

/// Declared presence of a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DesiredState {
    /// The resource should exist
    #[default]
    Present,
    /// The resource should not exist
    Absent,
}

impl DesiredState {
    /// Parse the `state` key of a declarative spec
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "present" => Some(Self::Present),
            "absent" => Some(Self::Absent),
            _ => None,
        }
    }

    /// The spelling accepted by [`parse`](Self::parse)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Absent => "absent",
        }
    }
}

impl fmt::Display for DesiredState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a command should be run by a [`CommandExecutor`](crate::CommandExecutor)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Turn a non-zero exit into [`Error::Execution`](crate::Error::Execution)
    pub check: bool,
    /// The command changes state on the target (skipped in dry-run)
    pub mutable: bool,
}

impl RunOptions {
    /// A state-changing command whose failure is fatal
    pub const MUTATE: Self = Self {
        check: true,
        mutable: true,
    };

    /// A read-only check whose exit code the caller interprets itself
    pub const INSPECT: Self = Self {
        check: false,
        mutable: false,
    };
}

impl Default for RunOptions {
    fn default() -> Self {
        Self::MUTATE
    }
}

/// Captured result of one external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Process exit code, `-1` when killed by a signal
    pub exit_code: i32,
    /// Raw standard output
    pub stdout: Vec<u8>,
    /// Raw standard error
    pub stderr: Vec<u8>,
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        Self {
            // Killed by a signal: no code, report as a generic failure
            exit_code: output.status.code().unwrap_or(-1),
            stdout: output.stdout,
            stderr: output.stderr,
        }
    }
}

impl CommandOutput {
    /// Successful output with the given stdout
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into().into_bytes(),
            stderr: Vec::new(),
        }
    }

    /// Failed output with the given exit code and stderr
    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: Vec::new(),
            stderr: stderr.into().into_bytes(),
        }
    }

    /// Whether the command exited with 0
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Get stdout as a string
    pub fn stdout_str(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    /// Get stderr as a string
    pub fn stderr_str(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }
}

/// The single observable result of applying an operation
///
/// `detail` is a short classification tag (`created`, `noop`, `renewed`, ...)
/// optionally followed by space-separated `key=value` context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionOutcome {
    /// Name of the host the operation ran against
    pub host: String,
    /// Operation kind
    pub kind: String,
    /// Whether any state-changing command ran
    pub changed: bool,
    /// Classification tag with optional context
    pub detail: String,
}

impl ActionOutcome {
    /// Outcome of a run that changed the target
    pub fn changed(host: &Host, kind: &str, detail: impl Into<String>) -> Self {
        Self {
            host: host.name.clone(),
            kind: kind.to_string(),
            changed: true,
            detail: detail.into(),
        }
    }

    /// Outcome of a run that found the target converged
    pub fn unchanged(host: &Host, kind: &str, detail: impl Into<String>) -> Self {
        Self {
            host: host.name.clone(),
            kind: kind.to_string(),
            changed: false,
            detail: detail.into(),
        }
    }

    /// The classification tag without any `key=value` suffix
    pub fn tag(&self) -> &str {
        self.detail.split_whitespace().next().unwrap_or("")
    }
}

impl fmt::Display for ActionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.changed { "changed" } else { "ok" };
        write!(f, "[{}] {} {}: {}", self.host, self.kind, status, self.detail)
    }
}
