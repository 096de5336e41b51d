//! Observing containers and images through the docker CLI

use crate::error::InspectionError;
use crate::executor::{CommandExecutor, argv};
use crate::types::RunOptions;
use serde::Deserialize;

/// Template printing an image's content-addressed id
pub const DIGEST_TEMPLATE: &str = "{{.Id}}";

/// Observed state of a named container
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservedContainer {
    /// `docker inspect` found the container
    pub exists: bool,
    /// The container's main process is running
    pub running: bool,
    /// Digest of the image the container was created from
    pub image_digest: Option<String>,
}

// Docker may print null for fields it has no value for
#[derive(Deserialize)]
struct InspectEntry {
    #[serde(rename = "State", default)]
    state: Option<InspectState>,
    #[serde(rename = "Image", default)]
    image: Option<String>,
}

#[derive(Deserialize)]
struct InspectState {
    #[serde(rename = "Running", default)]
    running: Option<bool>,
}

/// Parse `docker inspect` JSON output; the first array element is used.
pub fn parse_container_inspect(stdout: &str) -> Result<ObservedContainer, InspectionError> {
    let entries: Vec<InspectEntry> = serde_json::from_str(stdout)
        .map_err(|e| InspectionError::Unparsable(e.to_string()))?;
    let entry = entries.into_iter().next().ok_or(InspectionError::Missing)?;

    Ok(ObservedContainer {
        exists: true,
        running: entry.state.and_then(|state| state.running).unwrap_or(false),
        image_digest: entry.image.filter(|id| !id.is_empty()),
    })
}

/// Inspect a container by name.
pub fn inspect_container(
    exec: &dyn CommandExecutor,
    name: &str,
) -> Result<ObservedContainer, InspectionError> {
    let output = exec.run(&argv(["docker", "inspect", name]), RunOptions::INSPECT)?;
    if !output.success() {
        return Err(InspectionError::CommandFailed {
            exit_code: output.exit_code,
        });
    }
    parse_container_inspect(&output.stdout_str())
}

/// Resolve the content digest an image reference currently points to.
pub fn inspect_image_digest(
    exec: &dyn CommandExecutor,
    image: &str,
) -> Result<String, InspectionError> {
    let output = exec.run(
        &argv(["docker", "image", "inspect", image, "--format", DIGEST_TEMPLATE]),
        RunOptions::INSPECT,
    )?;
    if !output.success() {
        return Err(InspectionError::CommandFailed {
            exit_code: output.exit_code,
        });
    }

    let digest = output.stdout_str().trim().to_string();
    if digest.is_empty() {
        return Err(InspectionError::Unparsable("empty image id".to_string()));
    }
    Ok(digest)
}
