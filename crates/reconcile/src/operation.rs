//! Operation trait and kind registry
//!
//! Every declarative entry becomes an [`Operation`]: a validated spec that
//! can observe its target through a [`CommandExecutor`] and converge it.
//! The [`Registry`] is the explicit table from a kind name to the
//! constructor validating raw input for that kind.

use crate::certificate::{self, CertificateSpec};
use crate::container::{self, ContainerSpec};
use crate::error::{Error, Result};
use crate::executor::CommandExecutor;
use crate::normalize::RawSpec;
use crate::types::{ActionOutcome, Host};
use std::collections::BTreeMap;
use std::fmt;

/// Core trait for all reconcilable operations
pub trait Operation: Send + Sync + fmt::Debug {
    /// Operation kind (e.g., "docker_container", "letsencrypt_cert")
    fn kind(&self) -> &'static str;

    /// Identifier of the managed object within its kind (container or lineage name)
    fn id(&self) -> String;

    /// Human-readable description
    fn description(&self) -> String;

    /// Observe the target and run the minimal commands to reach the
    /// declared state. Returns the single outcome of this run.
    fn apply(&self, host: &Host, exec: &dyn CommandExecutor) -> Result<ActionOutcome>;
}

/// A validated operation of any kind
pub type BoxedOperation = Box<dyn Operation>;

/// Constructor turning a raw spec into a validated operation
pub type Constructor = fn(&RawSpec) -> Result<BoxedOperation>;

fn build_container(raw: &RawSpec) -> Result<BoxedOperation> {
    Ok(Box::new(ContainerSpec::from_raw(raw)?))
}

fn build_certificate(raw: &RawSpec) -> Result<BoxedOperation> {
    Ok(Box::new(CertificateSpec::from_raw(raw)?))
}

/// Mapping from kind name to constructor
#[derive(Clone)]
pub struct Registry {
    constructors: BTreeMap<&'static str, Constructor>,
}

impl Registry {
    /// A registry with no kinds
    pub fn empty() -> Self {
        Self {
            constructors: BTreeMap::new(),
        }
    }

    /// A registry with every built-in kind
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(container::KIND, build_container);
        registry.register(certificate::KIND, build_certificate);
        registry
    }

    /// Register (or replace) the constructor for `kind`.
    pub fn register(&mut self, kind: &'static str, constructor: Constructor) {
        self.constructors.insert(kind, constructor);
    }

    /// Validate `raw` with the constructor registered for `kind`.
    pub fn build(&self, kind: &str, raw: &RawSpec) -> Result<BoxedOperation> {
        let constructor = self.constructors.get(kind).ok_or_else(|| {
            Error::validation(
                kind,
                format!(
                    "unknown operation kind (known kinds: {})",
                    self.kinds().collect::<Vec<_>>().join(", ")
                ),
            )
        })?;
        constructor(raw)
    }

    /// Registered kinds in sorted order
    pub fn kinds(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.constructors.keys().copied()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.kinds()).finish()
    }
}
