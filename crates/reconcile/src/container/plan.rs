//! Container reconciliation decisions.
//!
//! Pure functions from (declared spec, observation) to the minimal action.
//! Nothing here talks to the executor.

use super::inspect::ObservedContainer;
use std::fmt;

/// The single action chosen for a container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerAction {
    /// Run a new container
    Create,
    /// Force-remove the existing container, then run a new one
    Recreate,
    /// Start the stopped container
    Start,
    /// Force-remove the container
    Remove,
    /// Already converged
    Noop,
}

impl ContainerAction {
    /// Classification tag reported in the outcome
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Create => "created",
            Self::Recreate => "recreated",
            Self::Start => "started",
            Self::Remove => "removed",
            Self::Noop => "noop",
        }
    }

    /// Whether the action runs a state-changing command
    pub fn is_change(&self) -> bool {
        !matches!(self, Self::Noop)
    }
}

impl fmt::Display for ContainerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Container settings that influence the present-state decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecreatePolicy {
    /// Recreate unconditionally
    pub force: bool,
    /// Recreate when the image now resolves to a different digest
    pub on_image_change: bool,
}

/// Decide how to bring a container to `state=present`.
///
/// A digest mismatch only counts when both digests are known.
pub fn plan_present(
    observed: &ObservedContainer,
    target_digest: Option<&str>,
    policy: RecreatePolicy,
) -> ContainerAction {
    if !observed.exists {
        return ContainerAction::Create;
    }

    let image_changed = match (observed.image_digest.as_deref(), target_digest) {
        (Some(current), Some(target)) => current != target,
        _ => false,
    };

    if policy.force || (policy.on_image_change && image_changed) {
        ContainerAction::Recreate
    } else if !observed.running {
        ContainerAction::Start
    } else {
        ContainerAction::Noop
    }
}

/// Decide how to bring a container to `state=absent`.
pub fn plan_absent(observed: &ObservedContainer) -> ContainerAction {
    if observed.exists {
        ContainerAction::Remove
    } else {
        ContainerAction::Noop
    }
}
