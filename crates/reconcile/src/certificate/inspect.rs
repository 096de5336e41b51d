//! Reading expiry and covered names of certificate material with openssl

use crate::error::InspectionError;
use crate::executor::{CommandExecutor, argv};
use crate::types::RunOptions;
use chrono::{DateTime, NaiveDateTime, Utc};
use std::collections::BTreeSet;
use std::path::Path;

/// Observed state of a certificate lineage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservedCertificate {
    /// Certificate material exists at the live path
    pub exists: bool,
    /// `notAfter` of the current certificate, when readable
    pub expiry: Option<DateTime<Utc>>,
    /// Lower-cased names the certificate is valid for
    pub covered_domains: BTreeSet<String>,
}

/// Parse `notAfter=Mon DD HH:MM:SS YYYY TZ` as printed by `openssl x509 -enddate`.
///
/// The `notAfter=` prefix is optional and the timezone token is ignored;
/// openssl always prints GMT.
pub fn parse_not_after(text: &str) -> Result<DateTime<Utc>, InspectionError> {
    let line = text.trim();
    let value = line.strip_prefix("notAfter=").unwrap_or(line);

    // openssl pads single-digit days with a space: "Jan  5 ..."
    let tokens: Vec<&str> = value.split_whitespace().collect();
    if !(4..=5).contains(&tokens.len()) {
        return Err(InspectionError::Unparsable(format!("unexpected expiry `{line}`")));
    }

    NaiveDateTime::parse_from_str(&tokens[..4].join(" "), "%b %d %H:%M:%S %Y")
        .map(|naive| naive.and_utc())
        .map_err(|e| InspectionError::Unparsable(format!("expiry `{line}`: {e}")))
}

/// Names found in decoded certificate text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CertificateNames {
    /// `DNS:` entries of the SAN extension, as printed
    pub subject_alt_names: Vec<String>,
    /// `CN` of the subject
    pub common_name: Option<String>,
}

impl CertificateNames {
    /// SAN DNS entries when present, otherwise the subject CN; lower-cased
    pub fn covered(&self) -> BTreeSet<String> {
        if self.subject_alt_names.is_empty() {
            self.common_name.iter().map(|cn| cn.to_lowercase()).collect()
        } else {
            self.subject_alt_names.iter().map(|san| san.to_lowercase()).collect()
        }
    }
}

fn common_name(subject: &str) -> Option<String> {
    // `CN = a, O = b` (OpenSSL 1.1+) or `/C=US/CN=a` (older releases)
    subject
        .split([',', '/'])
        .filter_map(|part| part.split_once('='))
        .find(|(key, _)| key.trim() == "CN")
        .map(|(_, value)| value.trim().to_string())
        .filter(|cn| !cn.is_empty())
}

/// Parse the output of `openssl x509 -noout -subject -ext subjectAltName`.
pub fn parse_decoded_names(text: &str) -> CertificateNames {
    let mut names = CertificateNames::default();
    let mut in_san = false;

    for line in text.lines() {
        let line = line.trim();
        if let Some(subject) = line.strip_prefix("subject=") {
            names.common_name = common_name(subject);
            in_san = false;
        } else if line.contains("Subject Alternative Name") {
            in_san = true;
        } else if in_san {
            names.subject_alt_names.extend(
                line.split(',')
                    .filter_map(|entry| entry.trim().strip_prefix("DNS:"))
                    .map(|dns| dns.trim().to_string()),
            );
            in_san = false;
        }
    }

    names
}

/// Read the expiry of the certificate at `cert`.
pub fn inspect_expiry(
    exec: &dyn CommandExecutor,
    cert: &Path,
) -> Result<DateTime<Utc>, InspectionError> {
    let cert = cert.to_string_lossy();
    let output = exec.run(
        &argv(["openssl", "x509", "-enddate", "-noout", "-in", &*cert]),
        RunOptions::INSPECT,
    )?;
    if !output.success() {
        return Err(InspectionError::CommandFailed {
            exit_code: output.exit_code,
        });
    }

    let stdout = output.stdout_str();
    let text = if stdout.trim().is_empty() {
        output.stderr_str()
    } else {
        stdout
    };
    parse_not_after(&text)
}

/// Read the names covered by the certificate at `cert`.
pub fn inspect_domains(
    exec: &dyn CommandExecutor,
    cert: &Path,
) -> Result<BTreeSet<String>, InspectionError> {
    let cert = cert.to_string_lossy();
    let output = exec.run(
        &argv([
            "openssl",
            "x509",
            "-noout",
            "-subject",
            "-ext",
            "subjectAltName",
            "-in",
            &*cert,
        ]),
        RunOptions::INSPECT,
    )?;
    if !output.success() {
        return Err(InspectionError::CommandFailed {
            exit_code: output.exit_code,
        });
    }

    let covered = parse_decoded_names(&output.stdout_str()).covered();
    if covered.is_empty() {
        return Err(InspectionError::Unparsable(
            "no subject CN or DNS names".to_string(),
        ));
    }
    Ok(covered)
}
