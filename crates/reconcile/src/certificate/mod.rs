//! `letsencrypt_cert` operation
//!
//! Issues, renews, or deletes a certificate lineage with certbot. Existing
//! material is only reissued when it is close to expiry, misses a declared
//! domain, has an unreadable expiry, or renewal is forced, so repeated runs
//! stay clear of the CA's rate limits.

pub mod inspect;
pub mod plan;

use crate::error::{Error, Result};
use crate::executor::{CommandExecutor, argv};
use crate::normalize::{Fields, ListShape, RawSpec};
use crate::operation::Operation;
use crate::types::{ActionOutcome, DesiredState, Host, RunOptions};
use chrono::Utc;
use std::fmt;
use std::path::{Path, PathBuf};

pub use inspect::ObservedCertificate;
pub use plan::{CertificateAction, DEFAULT_RENEW_BEFORE_DAYS, RenewalPolicy};

/// Operation kind handled by [`CertificateSpec`]
pub const KIND: &str = "letsencrypt_cert";

/// Directory certbot keeps current certificate material in
pub const DEFAULT_LIVE_DIR: &str = "/etc/letsencrypt/live";

const CERTBOT: &str = "certbot";

/// How domain control is proven during issuance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChallengeMode {
    /// certbot answers the challenge with its own listener
    Standalone,
    /// certbot drops challenge files into a served directory
    Webroot(PathBuf),
}

impl ChallengeMode {
    /// Name reported in the `mode=` outcome suffix
    pub fn name(&self) -> &'static str {
        match self {
            Self::Standalone => "standalone",
            Self::Webroot(_) => "webroot",
        }
    }
}

impl fmt::Display for ChallengeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Validated `letsencrypt_cert` spec
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateSpec {
    /// Lower-cased, in declaration order
    pub domains: Vec<String>,
    /// Registration and expiry-notice address
    pub email: String,
    /// How domain control is proven
    pub challenge: ChallengeMode,
    /// Lineage name; the first domain unless set
    pub cert_name: String,
    /// Declared presence of the lineage
    pub state: DesiredState,
    /// When existing material is reissued
    pub renewal: RenewalPolicy,
    /// Use the CA's staging environment
    pub staging: bool,
    /// Appended verbatim to `certbot certonly`
    pub extra_args: Vec<String>,
    /// Directory holding `<cert_name>/cert.pem`
    pub live_dir: PathBuf,
}

impl CertificateSpec {
    /// Validate a raw declarative spec.
    pub fn from_raw(raw: &RawSpec) -> Result<Self> {
        let fields = Fields::new(KIND, raw);

        let domains: Vec<String> = fields
            .list(&["domains", "domain"], ListShape::TextOrList)?
            .into_iter()
            .map(|d| d.trim().to_lowercase())
            .filter(|d| !d.is_empty())
            .collect();
        if domains.is_empty() {
            return Err(Error::validation(KIND, "requires at least one domain"));
        }

        let email = fields.required_string(&["email"], "requires an email for registration")?;

        let webroot = fields
            .string(&["webroot"])?
            .filter(|w| !w.is_empty())
            .map(PathBuf::from);
        // Without a webroot the only resolvable mode is standalone
        let challenge = match (fields.flag("standalone", false)?, webroot) {
            (false, Some(path)) => ChallengeMode::Webroot(path),
            _ => ChallengeMode::Standalone,
        };

        let cert_name = match fields.string(&["cert_name"])?.filter(|n| !n.is_empty()) {
            Some(name) => name,
            None => domains[0].clone(),
        };

        let state = fields.state()?;

        Ok(Self {
            domains,
            email,
            challenge,
            cert_name,
            state,
            renewal: RenewalPolicy {
                force: fields.flag("force_renew", false)?,
                renew_before_days: fields.count("renew_before_days", DEFAULT_RENEW_BEFORE_DAYS)?,
            },
            staging: fields.flag("staging", false)?,
            extra_args: fields.list(&["extra_args"], ListShape::ListOnly)?,
            live_dir: fields
                .string(&["live_dir"])?
                .filter(|d| !d.is_empty())
                .map_or_else(|| PathBuf::from(DEFAULT_LIVE_DIR), PathBuf::from),
        })
    }

    /// Path of the lineage's current certificate
    pub fn live_cert_path(&self) -> PathBuf {
        self.live_dir.join(&self.cert_name).join("cert.pem")
    }

    /// Full `certbot certonly` argument vector.
    pub fn issue_argv(&self) -> Vec<String> {
        let mut cmd = argv([
            CERTBOT,
            "certonly",
            "--non-interactive",
            "--agree-tos",
            "--keep-until-expiring",
            "--email",
            self.email.as_str(),
            "--cert-name",
            self.cert_name.as_str(),
        ]);
        match &self.challenge {
            ChallengeMode::Standalone => cmd.push("--standalone".to_string()),
            ChallengeMode::Webroot(path) => {
                cmd.extend(argv(["--webroot", "-w"]));
                cmd.push(path.to_string_lossy().into_owned());
            }
        }
        if self.renewal.force {
            cmd.push("--force-renewal".to_string());
        }
        if self.staging {
            cmd.push("--staging".to_string());
        }
        for domain in &self.domains {
            cmd.extend(argv(["-d", domain.as_str()]));
        }
        cmd.extend(self.extra_args.iter().cloned());
        cmd
    }

    /// `certbot delete` argument vector.
    pub fn delete_argv(&self) -> Vec<String> {
        argv([
            CERTBOT,
            "delete",
            "--non-interactive",
            "--cert-name",
            self.cert_name.as_str(),
        ])
    }

    /// Observe the lineage. Unreadable material means unknown expiry and
    /// no known domains, which pushes the decision towards reissuing.
    fn observe(&self, exec: &dyn CommandExecutor, cert: &Path) -> ObservedCertificate {
        if !exec.path_exists(cert) {
            return ObservedCertificate::default();
        }

        let expiry = inspect::inspect_expiry(exec, cert)
            .map_err(|err| log::debug!("expiry of {} unknown: {err}", cert.display()))
            .ok();
        let covered_domains = inspect::inspect_domains(exec, cert).unwrap_or_else(|err| {
            log::debug!("domains of {} unknown: {err}", cert.display());
            Default::default()
        });

        ObservedCertificate {
            exists: true,
            expiry,
            covered_domains,
        }
    }

    fn check_webroot(&self, exec: &dyn CommandExecutor) -> Result<()> {
        if let ChallengeMode::Webroot(path) = &self.challenge
            && !exec.path_exists(path)
        {
            return Err(Error::validation(
                KIND,
                format!("webroot path {} does not exist on target host", path.display()),
            ));
        }
        Ok(())
    }

    fn outcome(&self, host: &Host, action: CertificateAction) -> ActionOutcome {
        match action {
            CertificateAction::Keep { expiry } => ActionOutcome::unchanged(
                host,
                KIND,
                format!("valid-until={}", expiry.to_rfc3339()),
            ),
            CertificateAction::Issue { renewal } => ActionOutcome::changed(
                host,
                KIND,
                format!(
                    "{} mode={}",
                    if renewal { "renewed" } else { "requested" },
                    self.challenge
                ),
            ),
            CertificateAction::Delete => ActionOutcome::changed(host, KIND, "deleted"),
            CertificateAction::Noop => ActionOutcome::unchanged(host, KIND, "noop"),
        }
    }
}

impl Operation for CertificateSpec {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn id(&self) -> String {
        self.cert_name.clone()
    }

    fn description(&self) -> String {
        match self.state {
            DesiredState::Present => format!(
                "Ensure certificate {} covers {} ({})",
                self.cert_name,
                self.domains.join(", "),
                self.challenge
            ),
            DesiredState::Absent => format!("Ensure certificate {} is deleted", self.cert_name),
        }
    }

    fn apply(&self, host: &Host, exec: &dyn CommandExecutor) -> Result<ActionOutcome> {
        exec.require(CERTBOT)?;
        let cert = self.live_cert_path();

        let action = match self.state {
            DesiredState::Absent => plan::plan_absent(exec.path_exists(&cert)),
            DesiredState::Present => {
                self.check_webroot(exec)?;
                let observed = self.observe(exec, &cert);
                plan::plan_present(&self.domains, &observed, self.renewal, Utc::now())
            }
        };

        log::info!("{KIND} {}: {action:?}", self.cert_name);
        match action {
            CertificateAction::Issue { .. } => {
                exec.run(&self.issue_argv(), RunOptions::MUTATE)?;
            }
            CertificateAction::Delete => {
                exec.run(&self.delete_argv(), RunOptions::MUTATE)?;
            }
            CertificateAction::Keep { .. } | CertificateAction::Noop => {}
        }

        Ok(self.outcome(host, action))
    }
}
