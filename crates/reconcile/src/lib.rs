//! # reconcile
//!
//! Idempotent reconciliation of infrastructure resources that are managed
//! through their own command-line tools.
//!
//! This crate provides:
//! - `docker_container`: create, start, recreate or remove a container
//! - `letsencrypt_cert`: request, renew or delete a certificate lineage
//! - A [`CommandExecutor`] seam every external command and path check goes through
//! - A [`Registry`] mapping operation kinds to their validating constructors
//!
//! Each operation observes the target, decides the minimal action, runs it,
//! and reports one [`ActionOutcome`]. Applying the same spec twice against
//! an unchanged target reports `changed == false` the second time.
//!
//! ## Example
//!
//! ```
//! use reconcile::{CommandOutput, Host, Registry, ScriptedExecutor};
//! use serde_json::json;
//!
//! let spec = json!({"name": "web", "image": "nginx:1.25", "pull": false});
//! let op = Registry::with_defaults()
//!     .build("docker_container", spec.as_object().unwrap())
//!     .unwrap();
//!
//! let exec = ScriptedExecutor::new().with_program("docker");
//! exec.push(CommandOutput::failed(1, "Error: No such object: web")); // docker inspect
//! exec.push(CommandOutput::ok("sha256:abc\n")); // docker image inspect
//! exec.push(CommandOutput::ok("0123abcd\n")); // docker run
//!
//! let outcome = op.apply(&Host::local(), &exec).unwrap();
//! assert!(outcome.changed);
//! assert_eq!(outcome.detail, "created");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod certificate;
pub mod container;
pub mod error;
pub mod executor;
pub mod normalize;
pub mod operation;
pub mod types;

pub use certificate::CertificateSpec;
pub use container::ContainerSpec;
pub use error::{Error, ErrorCategory, InspectionError, Result};
pub use executor::{CommandExecutor, ScriptedExecutor, SystemExecutor, argv};
pub use normalize::RawSpec;
pub use operation::{BoxedOperation, Operation, Registry};
pub use types::{ActionOutcome, CommandOutput, DesiredState, Host, RunOptions};
