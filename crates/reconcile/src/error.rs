//! Error types for reconciliation.
//!
//! Fatal errors ([`Error`]) abort a single operation. Inspection failures
//! ([`InspectionError`]) are never fatal: the reconcilers collapse them into
//! the conservative "absent / unknown" observation.

use thiserror::Error;

/// Categories of reconciliation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The declarative spec is missing or contradicts required fields
    Validation,
    /// A required tool is not installed on the target
    Precondition,
    /// A state-changing command failed
    Execution,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Whether the error was raised before any command touched the target.
    pub fn is_side_effect_free(&self) -> bool {
        matches!(self, Self::Validation | Self::Precondition)
    }

    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Validation => "Invalid operation spec",
            Self::Precondition => "Required tool missing",
            Self::Execution => "Command failed",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Validation => "Fix the operation entry in the plan file",
            Self::Precondition => "Install the tool on the target host and make sure it is on PATH",
            Self::Execution => "Inspect the captured stderr; earlier steps are not rolled back",
            Self::Other => "Check the error details for more information",
        }
    }
}

/// Errors that abort an operation.
#[derive(Debug, Error)]
pub enum Error {
    /// Declarative input failed validation
    #[error("{kind}: {message}")]
    Validation {
        /// Operation kind whose spec was rejected
        kind: String,
        /// What is wrong with it
        message: String,
    },

    /// A required binary is not resolvable on the execution path
    #[error("{program} binary not found on PATH")]
    Precondition {
        /// Program that could not be resolved
        program: String,
    },

    /// A checked command exited non-zero
    #[error("command `{}` exited with {exit_code}: {}", .argv.join(" "), .stderr.trim())]
    Execution {
        /// Full argument vector of the failed command
        argv: Vec<String>,
        /// Exit code reported by the transport
        exit_code: i32,
        /// Captured standard output
        stdout: String,
        /// Captured standard error
        stderr: String,
    },

    /// The command could not be started at all
    #[error("failed to execute {program}: {source}")]
    Spawn {
        /// Program that failed to start
        program: String,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Create a validation error for the given operation kind
    pub fn validation(kind: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            kind: kind.to_string(),
            message: message.into(),
        }
    }

    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Validation { .. } => ErrorCategory::Validation,
            Error::Precondition { .. } => ErrorCategory::Precondition,
            Error::Execution { .. } => ErrorCategory::Execution,
            Error::Spawn { .. } => ErrorCategory::Other,
        }
    }
}

/// Result type for reconciliation operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Why an inspection produced no usable observation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InspectionError {
    /// The inspection command exited non-zero
    #[error("inspection exited with {exit_code}")]
    CommandFailed {
        /// Exit code of the inspection command
        exit_code: i32,
    },

    /// The command succeeded but its output could not be interpreted
    #[error("unparsable inspection output: {0}")]
    Unparsable(String),

    /// There is nothing to inspect (no container, no certificate file)
    #[error("nothing to inspect")]
    Missing,

    /// The inspection command could not be run at all
    #[error("inspection could not run: {0}")]
    Unavailable(String),
}

impl From<Error> for InspectionError {
    fn from(err: Error) -> Self {
        Self::Unavailable(err.to_string())
    }
}
