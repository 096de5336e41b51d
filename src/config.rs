//! Plan file loading
//!
//! A plan names the target host and lists operations in apply order:
//!
//! ```toml
//! [host]
//! name = "web-1"
//!
//! [[operations]]
//! kind = "docker_container"
//! name = "web"
//! image = "nginx:latest"
//! ```
//!
//! Operation tables stay untyped here; the [`Registry`] validates them.

use anyhow::{Context, Result, bail};
use reconcile::{BoxedOperation, Error, Host, RawSpec, Registry};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize)]
pub struct HostConfig {
    #[serde(default)]
    pub name: Option<String>,
}

/// Parsed, not yet validated plan file
#[derive(Debug, Default, Deserialize)]
pub struct PlanFile {
    #[serde(default)]
    pub host: HostConfig,
    #[serde(default)]
    pub operations: Vec<RawSpec>,
}

/// File formats a plan can be written in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanFormat {
    Toml,
    Json,
}

impl PlanFormat {
    /// `.json` selects JSON; anything else is read as TOML
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Toml,
        }
    }
}

impl PlanFile {
    /// Load a plan file, picking the format from its extension.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        Self::parse(&content, PlanFormat::from_path(path))
            .with_context(|| format!("Invalid plan file {}", path.display()))
    }

    pub fn parse(content: &str, format: PlanFormat) -> Result<Self> {
        Ok(match format {
            PlanFormat::Toml => toml::from_str(content)?,
            PlanFormat::Json => serde_json::from_str(content)?,
        })
    }

    pub fn host(&self) -> Host {
        match self.host.name.as_deref() {
            Some(name) if !name.trim().is_empty() => Host::new(name.trim()),
            _ => Host::local(),
        }
    }
}

/// A validation failure for one plan entry
#[derive(Debug)]
pub struct EntryError {
    /// Zero-based position in `operations`
    pub index: usize,
    pub error: Error,
}

impl fmt::Display for EntryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "operations[{}]: {}", self.index, self.error)
    }
}

/// Split the `kind` key off a raw entry
fn split_kind(index: usize, raw: &RawSpec) -> Result<(String, RawSpec), EntryError> {
    let kind = match raw.get("kind") {
        Some(Value::String(kind)) if !kind.is_empty() => kind.clone(),
        _ => {
            return Err(EntryError {
                index,
                error: Error::validation("operation", "requires a string `kind`"),
            });
        }
    };
    let mut spec = raw.clone();
    spec.remove("kind");
    Ok((kind, spec))
}

/// Validated plan ready to apply
#[derive(Debug)]
pub struct Plan {
    pub source: PathBuf,
    pub host: Host,
    pub operations: Vec<BoxedOperation>,
}

impl Plan {
    /// Validate every entry of `file` up front.
    ///
    /// Returns all entry errors instead of stopping at the first one, so a
    /// broken plan is reported in full before any command runs.
    pub fn build(
        source: &Path,
        file: &PlanFile,
        registry: &Registry,
    ) -> std::result::Result<Self, Vec<EntryError>> {
        let mut operations = Vec::with_capacity(file.operations.len());
        let mut errors = Vec::new();

        for (index, raw) in file.operations.iter().enumerate() {
            let built = split_kind(index, raw).and_then(|(kind, spec)| {
                registry
                    .build(&kind, &spec)
                    .map_err(|error| EntryError { index, error })
            });
            match built {
                Ok(op) => operations.push(op),
                Err(err) => errors.push(err),
            }
        }

        if errors.is_empty() {
            Ok(Self {
                source: source.to_path_buf(),
                host: file.host(),
                operations,
            })
        } else {
            Err(errors)
        }
    }

    /// Load and validate a plan, reporting every invalid entry.
    pub fn load(path: &Path, registry: &Registry) -> Result<Self> {
        let file = PlanFile::load(path)?;
        match Self::build(path, &file, registry) {
            Ok(plan) => Ok(plan),
            Err(errors) => {
                for err in &errors {
                    crate::ui::error(&err.to_string());
                }
                bail!(
                    "{} invalid operation(s) in {}",
                    errors.len(),
                    path.display()
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TOML_PLAN: &str = r#"
[host]
name = "edge-1"

[[operations]]
kind = "docker_container"
name = "web"
image = "nginx:1.25"
env = { ZETA = "1", ALPHA = "2" }

[[operations]]
kind = "letsencrypt_cert"
domains = ["example.com", "www.example.com"]
email = "admin@example.com"
webroot = "/var/www/html"
"#;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(PlanFormat::from_path(Path::new("a.json")), PlanFormat::Json);
        assert_eq!(PlanFormat::from_path(Path::new("a.JSON")), PlanFormat::Json);
        assert_eq!(PlanFormat::from_path(Path::new("a.toml")), PlanFormat::Toml);
        assert_eq!(PlanFormat::from_path(Path::new("plan")), PlanFormat::Toml);
    }

    #[test]
    fn test_toml_plan_keeps_key_order() {
        let file = PlanFile::parse(TOML_PLAN, PlanFormat::Toml).unwrap();
        assert_eq!(file.host().name, "edge-1");
        assert_eq!(file.operations.len(), 2);

        let env = file.operations[0]["env"].as_object().unwrap();
        assert_eq!(env.keys().collect::<Vec<_>>(), vec!["ZETA", "ALPHA"]);
    }

    #[test]
    fn test_host_defaults_to_local() {
        let file = PlanFile::parse("operations = []", PlanFormat::Toml).unwrap();
        assert_eq!(file.host(), Host::local());
        assert!(file.operations.is_empty());
    }

    #[test]
    fn test_build_plan() {
        let file = PlanFile::parse(TOML_PLAN, PlanFormat::Toml).unwrap();
        let plan = Plan::build(Path::new("site.toml"), &file, &Registry::default()).unwrap();

        assert_eq!(plan.host.name, "edge-1");
        let ids: Vec<_> = plan
            .operations
            .iter()
            .map(|op| format!("{}:{}", op.kind(), op.id()))
            .collect();
        assert_eq!(ids, vec!["docker_container:web", "letsencrypt_cert:example.com"]);
    }

    #[test]
    fn test_build_reports_every_invalid_entry() {
        let json = r#"{
            "operations": [
                {"kind": "docker_container", "image": "nginx"},
                {"kind": "docker_container", "name": "ok", "image": "nginx"},
                {"kind": "apt_package", "name": "curl"},
                {"name": "no-kind"}
            ]
        }"#;
        let file = PlanFile::parse(json, PlanFormat::Json).unwrap();
        let errors = Plan::build(Path::new("p.json"), &file, &Registry::default()).unwrap_err();

        let indexes: Vec<_> = errors.iter().map(|e| e.index).collect();
        assert_eq!(indexes, vec![0, 2, 3]);
        assert_eq!(
            errors[0].to_string(),
            "operations[0]: docker_container: requires a name"
        );
        assert!(errors[1].to_string().contains("unknown operation kind"));
        assert!(errors[2].to_string().contains("kind"));
    }

    #[test]
    fn test_load_from_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("site.json");
        fs::write(
            &path,
            r#"{"operations": [{"kind": "letsencrypt_cert", "domain": "example.com", "email": "a@b.com"}]}"#,
        )
        .unwrap();

        let plan = Plan::load(&path, &Registry::default()).unwrap();
        assert_eq!(plan.host, Host::local());
        assert_eq!(plan.operations.len(), 1);
        assert_eq!(plan.source, path);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = PlanFile::load(&dir.path().join("nope.toml")).unwrap_err();
        assert!(err.to_string().contains("Could not read"));
    }

    #[test]
    fn test_load_malformed_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[[operations]\nkind = ").unwrap();
        let err = PlanFile::load(&path).unwrap_err();
        assert!(err.to_string().contains("Invalid plan file"));
    }
}
