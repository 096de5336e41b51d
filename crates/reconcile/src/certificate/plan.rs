//! Certificate reconciliation decisions.

use super::inspect::ObservedCertificate;
use chrono::{DateTime, Duration, Utc};

/// Default number of days before expiry at which a certificate is renewed
pub const DEFAULT_RENEW_BEFORE_DAYS: u32 = 30;

/// The single action chosen for a certificate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertificateAction {
    /// Current material is good; nothing to do
    Keep {
        /// Expiry of the kept certificate
        expiry: DateTime<Utc>,
    },
    /// Run the issuance tool; `renewal` when material already existed
    Issue { renewal: bool },
    /// Delete the lineage
    Delete,
    /// Already absent
    Noop,
}

impl CertificateAction {
    /// Whether the action runs a state-changing command
    pub fn is_change(&self) -> bool {
        matches!(self, Self::Issue { .. } | Self::Delete)
    }
}

/// When an existing certificate must be reissued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenewalPolicy {
    /// Reissue even when the current certificate is good
    pub force: bool,
    /// Renew once this many days or fewer remain
    pub renew_before_days: u32,
}

impl Default for RenewalPolicy {
    fn default() -> Self {
        Self {
            force: false,
            renew_before_days: DEFAULT_RENEW_BEFORE_DAYS,
        }
    }
}

/// Whether some declared domain is missing from a known set of covered names.
///
/// An empty covered set means "unknown" and never counts as a mismatch.
pub fn domain_mismatch(declared: &[String], observed: &ObservedCertificate) -> bool {
    !observed.covered_domains.is_empty()
        && !declared
            .iter()
            .all(|domain| observed.covered_domains.contains(&domain.to_lowercase()))
}

/// Decide how to bring a certificate to `state=present` at time `now`.
///
/// Reissuance is skipped only when the expiry is known, renewal is not
/// forced, every declared domain is covered, and more than
/// `renew_before_days` remain.
pub fn plan_present(
    declared: &[String],
    observed: &ObservedCertificate,
    policy: RenewalPolicy,
    now: DateTime<Utc>,
) -> CertificateAction {
    if let Some(expiry) = observed.expiry
        && !policy.force
        && !domain_mismatch(declared, observed)
        && expiry - now > Duration::days(i64::from(policy.renew_before_days))
    {
        return CertificateAction::Keep { expiry };
    }

    CertificateAction::Issue {
        renewal: observed.exists,
    }
}

/// Decide how to bring a certificate to `state=absent`.
pub fn plan_absent(exists: bool) -> CertificateAction {
    if exists {
        CertificateAction::Delete
    } else {
        CertificateAction::Noop
    }
}
