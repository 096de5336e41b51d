//! `docker_container` operation
//!
//! Ensures a named container exists and runs a given image, or is absent.
//! Recreation only happens when explicitly requested or when the image
//! reference now resolves to a different digest than the one the container
//! was created from.

pub mod inspect;
pub mod plan;

use crate::error::{Error, Result};
use crate::executor::{CommandExecutor, argv};
use crate::normalize::{Fields, ListShape, RawSpec, Shape, normalize_list};
use crate::operation::Operation;
use crate::types::{ActionOutcome, DesiredState, Host, RunOptions};

pub use inspect::ObservedContainer;
pub use plan::{ContainerAction, RecreatePolicy};

/// Operation kind handled by [`ContainerSpec`]
pub const KIND: &str = "docker_container";

const DOCKER: &str = "docker";

/// Command run inside the container
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerCommand {
    /// Appended verbatim as one argument
    Line(String),
    /// Appended token by token
    Args(Vec<String>),
}

impl ContainerCommand {
    fn parse(shape: Shape<'_>) -> Result<Option<Self>> {
        match shape {
            Shape::Missing => Ok(None),
            Shape::Text(line) if line.is_empty() => Ok(None),
            Shape::Text(line) => Ok(Some(Self::Line(line.to_string()))),
            Shape::List(_) => {
                let args = normalize_list(shape, ListShape::ListOnly)
                    .map_err(|reason| Error::validation(KIND, format!("command {reason}")))?;
                Ok((!args.is_empty()).then_some(Self::Args(args)))
            }
            _ => Err(Error::validation(KIND, "command must be a string or list")),
        }
    }
}

/// Validated `docker_container` spec
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    /// Container name
    pub name: String,
    /// Declared presence of the container
    pub state: DesiredState,
    /// Required when present
    pub image: Option<String>,
    /// Pull the image before inspecting
    pub pull: bool,
    /// Run with `-d`
    pub detach: bool,
    /// `--restart` value
    pub restart_policy: Option<String>,
    /// `--network` value
    pub network: Option<String>,
    /// `-w` value
    pub workdir: Option<String>,
    /// Command run inside the container
    pub command: Option<ContainerCommand>,
    /// When an existing container is replaced
    pub recreate: RecreatePolicy,
    /// `KEY=VALUE` pairs passed with `-e`
    pub env: Vec<String>,
    /// Port mappings passed with `-p`
    pub ports: Vec<String>,
    /// Volume mounts passed with `-v`
    pub volumes: Vec<String>,
    /// Appended verbatim before the image
    pub extra_args: Vec<String>,
}

impl ContainerSpec {
    /// Validate a raw declarative spec.
    pub fn from_raw(raw: &RawSpec) -> Result<Self> {
        let fields = Fields::new(KIND, raw);

        let name = fields.required_string(&["name", "container"], "requires a name")?;

        let state = fields.state()?;

        let image = fields.string(&["image"])?.filter(|i| !i.is_empty());
        if state == DesiredState::Present && image.is_none() {
            return Err(Error::validation(KIND, "requires an image when state=present"));
        }

        Ok(Self {
            name,
            state,
            image,
            pull: fields.flag("pull", true)?,
            detach: fields.flag("detach", true)?,
            restart_policy: fields.string(&["restart", "restart_policy"])?,
            network: fields.string(&["network"])?,
            workdir: fields.string(&["workdir"])?,
            command: ContainerCommand::parse(fields.shape("command"))?,
            recreate: RecreatePolicy {
                force: fields.flag("recreate", false)?,
                on_image_change: fields.flag("recreate_on_image_change", true)?,
            },
            env: fields.list(&["env"], ListShape::Assignments)?,
            ports: fields.list(&["ports"], ListShape::TextOrList)?,
            volumes: fields.list(&["volumes"], ListShape::TextOrList)?,
            extra_args: fields.list(&["extra_args"], ListShape::TextOrList)?,
        })
    }

    /// Full `docker run` argument vector.
    pub fn run_argv(&self) -> Result<Vec<String>> {
        let image = self
            .image
            .as_deref()
            .ok_or_else(|| Error::validation(KIND, "image is required to run a container"))?;

        let mut cmd = argv([DOCKER, "run"]);
        if self.detach {
            cmd.push("-d".to_string());
        }
        cmd.extend(argv(["--name", self.name.as_str()]));
        if let Some(policy) = &self.restart_policy {
            cmd.extend(argv(["--restart", policy.as_str()]));
        }
        if let Some(network) = &self.network {
            cmd.extend(argv(["--network", network.as_str()]));
        }
        if let Some(workdir) = &self.workdir {
            cmd.extend(argv(["-w", workdir.as_str()]));
        }
        for env in &self.env {
            cmd.extend(argv(["-e", env.as_str()]));
        }
        for port in &self.ports {
            cmd.extend(argv(["-p", port.as_str()]));
        }
        for volume in &self.volumes {
            cmd.extend(argv(["-v", volume.as_str()]));
        }
        cmd.extend(self.extra_args.iter().cloned());
        cmd.push(image.to_string());
        match &self.command {
            Some(ContainerCommand::Line(line)) => cmd.push(line.clone()),
            Some(ContainerCommand::Args(args)) => cmd.extend(args.iter().cloned()),
            None => {}
        }
        Ok(cmd)
    }

    /// Observe the container; any inspection failure means "does not exist".
    fn observe(&self, exec: &dyn CommandExecutor) -> ObservedContainer {
        inspect::inspect_container(exec, &self.name).unwrap_or_else(|err| {
            log::debug!("container {} treated as absent: {err}", self.name);
            ObservedContainer::default()
        })
    }

    /// Digest of the target image, when tracked and resolvable.
    fn target_digest(&self, exec: &dyn CommandExecutor) -> Option<String> {
        if !self.recreate.on_image_change {
            return None;
        }
        let image = self.image.as_deref()?;
        match inspect::inspect_image_digest(exec, image) {
            Ok(digest) => Some(digest),
            Err(err) => {
                log::debug!("digest of {image} unknown: {err}");
                None
            }
        }
    }

    fn remove(&self, exec: &dyn CommandExecutor) -> Result<()> {
        exec.run(&argv([DOCKER, "rm", "-f", self.name.as_str()]), RunOptions::MUTATE)?;
        Ok(())
    }

    fn run_container(&self, exec: &dyn CommandExecutor) -> Result<()> {
        exec.run(&self.run_argv()?, RunOptions::MUTATE)?;
        Ok(())
    }

    fn realize(&self, action: ContainerAction, exec: &dyn CommandExecutor) -> Result<()> {
        match action {
            ContainerAction::Create => self.run_container(exec),
            ContainerAction::Recreate => {
                self.remove(exec)?;
                self.run_container(exec)
            }
            ContainerAction::Start => {
                exec.run(&argv([DOCKER, "start", self.name.as_str()]), RunOptions::MUTATE)?;
                Ok(())
            }
            ContainerAction::Remove => self.remove(exec),
            ContainerAction::Noop => Ok(()),
        }
    }
}

impl Operation for ContainerSpec {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn id(&self) -> String {
        self.name.clone()
    }

    fn description(&self) -> String {
        match (self.state, &self.image) {
            (DesiredState::Present, Some(image)) => {
                format!("Ensure container {} runs {}", self.name, image)
            }
            _ => format!("Ensure container {} is absent", self.name),
        }
    }

    fn apply(&self, host: &Host, exec: &dyn CommandExecutor) -> Result<ActionOutcome> {
        exec.require(DOCKER)?;

        let action = match self.state {
            DesiredState::Absent => plan::plan_absent(&self.observe(exec)),
            DesiredState::Present => {
                // The pull refreshes the local tag; it is not itself a change
                if self.pull
                    && let Some(image) = &self.image
                {
                    exec.run(&argv([DOCKER, "pull", image.as_str()]), RunOptions::MUTATE)?;
                }
                let observed = self.observe(exec);
                let target = self.target_digest(exec);
                plan::plan_present(&observed, target.as_deref(), self.recreate)
            }
        };

        log::info!("{KIND} {}: {action}", self.name);
        self.realize(action, exec)?;

        Ok(if action.is_change() {
            ActionOutcome::changed(host, KIND, action.tag())
        } else {
            ActionOutcome::unchanged(host, KIND, action.tag())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ScriptedExecutor;
    use crate::types::CommandOutput;
    use serde_json::{Value, json};

    fn spec(value: Value) -> ContainerSpec {
        match value {
            Value::Object(map) => ContainerSpec::from_raw(&map).unwrap(),
            _ => panic!("test spec must be an object"),
        }
    }

    fn spec_err(value: Value) -> Error {
        match value {
            Value::Object(map) => ContainerSpec::from_raw(&map).unwrap_err(),
            _ => panic!("test spec must be an object"),
        }
    }

    fn docker() -> ScriptedExecutor {
        ScriptedExecutor::new().with_program("docker")
    }

    fn inspect_json(running: bool, image: &str) -> CommandOutput {
        CommandOutput::ok(json!([{"State": {"Running": running}, "Image": image}]).to_string())
    }

    fn is_run(cmd: &[String]) -> bool {
        cmd.len() >= 2 && cmd[0] == "docker" && cmd[1] == "run"
    }

    #[test]
    fn test_create_container_when_absent() {
        let exec = docker();
        exec.push(CommandOutput::ok(""));
        exec.push(CommandOutput::failed(1, "Error: No such object: web"));
        exec.push(CommandOutput::ok("sha256:new\n"));
        exec.push(CommandOutput::ok("c0ffee\n"));

        let op = spec(json!({"name": "web", "image": "nginx:latest"}));
        let outcome = op.apply(&Host::local(), &exec).unwrap();

        assert!(outcome.changed);
        assert_eq!(outcome.detail, "created");
        assert_eq!(outcome.kind, "docker_container");
        let commands = exec.commands();
        assert_eq!(commands[0], vec!["docker", "pull", "nginx:latest"]);
        let runs: Vec<_> = commands.iter().filter(|c| is_run(c)).collect();
        assert_eq!(runs.len(), 1);
        assert_eq!(
            *runs[0],
            vec!["docker", "run", "-d", "--name", "web", "nginx:latest"]
        );
        assert_eq!(exec.remaining(), 0);
    }

    #[test]
    fn test_recreate_when_image_changes() {
        let exec = docker();
        exec.push(CommandOutput::ok(""));
        exec.push(inspect_json(true, "sha256:old"));
        exec.push(CommandOutput::ok("sha256:new\n"));
        exec.push(CommandOutput::ok(""));
        exec.push(CommandOutput::ok(""));

        let op = spec(json!({"name": "app", "image": "app:1"}));
        let outcome = op.apply(&Host::local(), &exec).unwrap();

        assert!(outcome.changed);
        assert_eq!(outcome.detail, "recreated");
        let commands = exec.commands();
        assert_eq!(commands[3], vec!["docker", "rm", "-f", "app"]);
        assert!(is_run(&commands[4]));
        assert_eq!(commands.len(), 5);
    }

    #[test]
    fn test_absent_removes_existing_container() {
        let exec = docker();
        exec.push(inspect_json(false, "sha256:abc"));
        exec.push(CommandOutput::ok(""));

        let op = spec(json!({"name": "old", "state": "absent"}));
        let outcome = op.apply(&Host::local(), &exec).unwrap();

        assert!(outcome.changed);
        assert_eq!(outcome.detail, "removed");
        assert_eq!(
            exec.commands(),
            vec![
                vec!["docker", "inspect", "old"],
                vec!["docker", "rm", "-f", "old"]
            ]
        );
    }

    #[test]
    fn test_absent_and_missing_is_noop() {
        let exec = docker();
        exec.push(CommandOutput::failed(1, ""));

        let op = spec(json!({"container": "old", "state": "absent"}));
        let outcome = op.apply(&Host::new("db-1"), &exec).unwrap();

        assert!(!outcome.changed);
        assert_eq!(outcome.detail, "noop");
        assert_eq!(outcome.host, "db-1");
        assert_eq!(exec.commands().len(), 1);
    }

    #[test]
    fn test_starts_stopped_container() {
        let exec = docker();
        exec.push(inspect_json(false, "sha256:same"));
        exec.push(CommandOutput::ok("sha256:same"));
        exec.push(CommandOutput::ok(""));

        let op = spec(json!({"name": "web", "image": "nginx", "pull": false}));
        let outcome = op.apply(&Host::local(), &exec).unwrap();

        assert!(outcome.changed);
        assert_eq!(outcome.detail, "started");
        assert_eq!(exec.commands()[2], vec!["docker", "start", "web"]);
    }

    #[test]
    fn test_null_running_flag_starts_instead_of_running() {
        let exec = docker();
        exec.push(CommandOutput::ok(
            r#"[{"State": {"Running": null}, "Image": "sha256:same"}]"#,
        ));
        exec.push(CommandOutput::ok(""));

        let op = spec(json!({
            "name": "web",
            "image": "nginx",
            "pull": false,
            "recreate_on_image_change": false
        }));
        let outcome = op.apply(&Host::local(), &exec).unwrap();

        assert_eq!(outcome.detail, "started");
        assert!(!exec.commands().iter().any(|c| is_run(c)));
    }

    #[test]
    fn test_second_apply_is_idempotent() {
        let op = spec(json!({"name": "web", "image": "nginx:latest"}));

        let first = docker();
        first.push(CommandOutput::ok(""));
        first.push(CommandOutput::failed(1, ""));
        first.push(CommandOutput::ok("sha256:same"));
        first.push(CommandOutput::ok(""));
        assert!(op.apply(&Host::local(), &first).unwrap().changed);

        let second = docker();
        second.push(CommandOutput::ok(""));
        second.push(inspect_json(true, "sha256:same"));
        second.push(CommandOutput::ok("sha256:same"));
        let outcome = op.apply(&Host::local(), &second).unwrap();

        assert!(!outcome.changed);
        assert_eq!(outcome.detail, "noop");
        assert_eq!(second.remaining(), 0);
        assert!(!second.commands().iter().any(|c| is_run(c)));
    }

    #[test]
    fn test_unknown_digest_does_not_recreate() {
        let exec = docker();
        exec.push(CommandOutput::ok(""));
        exec.push(inspect_json(true, "sha256:old"));
        exec.push(CommandOutput::failed(1, "No such image"));

        let op = spec(json!({"name": "web", "image": "nginx"}));
        let outcome = op.apply(&Host::local(), &exec).unwrap();

        assert!(!outcome.changed);
        assert_eq!(outcome.detail, "noop");
    }

    #[test]
    fn test_image_tracking_disabled_skips_digest_lookup() {
        let exec = docker();
        exec.push(inspect_json(true, "sha256:old"));

        let op = spec(json!({
            "name": "web",
            "image": "nginx",
            "pull": false,
            "recreate_on_image_change": false
        }));
        let outcome = op.apply(&Host::local(), &exec).unwrap();

        assert_eq!(outcome.detail, "noop");
        assert_eq!(exec.commands(), vec![vec!["docker", "inspect", "web"]]);
    }

    #[test]
    fn test_explicit_recreate() {
        let exec = docker();
        exec.push(inspect_json(true, "sha256:same"));
        exec.push(CommandOutput::ok("sha256:same"));
        exec.push(CommandOutput::ok(""));
        exec.push(CommandOutput::ok(""));

        let op = spec(json!({"name": "web", "image": "nginx", "pull": false, "recreate": true}));
        let outcome = op.apply(&Host::local(), &exec).unwrap();

        assert_eq!(outcome.detail, "recreated");
        assert_eq!(exec.commands()[2], vec!["docker", "rm", "-f", "web"]);
    }

    #[test]
    fn test_unparsable_inspect_is_treated_as_absent() {
        let exec = docker();
        exec.push(CommandOutput::ok("not json"));
        exec.push(CommandOutput::ok(""));

        let op = spec(json!({
            "name": "web",
            "image": "nginx",
            "pull": false,
            "recreate_on_image_change": false
        }));
        let outcome = op.apply(&Host::local(), &exec).unwrap();

        assert_eq!(outcome.detail, "created");
    }

    #[test]
    fn test_missing_docker_fails_before_side_effects() {
        let exec = ScriptedExecutor::new();
        let op = spec(json!({"name": "web", "image": "nginx"}));

        let err = op.apply(&Host::local(), &exec).unwrap_err();
        assert!(matches!(err, Error::Precondition { program } if program == "docker"));
        assert!(exec.commands().is_empty());
    }

    #[test]
    fn test_failed_run_propagates() {
        let exec = docker();
        exec.push(CommandOutput::failed(1, ""));
        exec.push(CommandOutput::failed(125, "port is already allocated"));

        let op = spec(json!({
            "name": "web",
            "image": "nginx",
            "pull": false,
            "recreate_on_image_change": false
        }));
        let err = op.apply(&Host::local(), &exec).unwrap_err();

        match err {
            Error::Execution { exit_code, stderr, .. } => {
                assert_eq!(exit_code, 125);
                assert_eq!(stderr, "port is already allocated");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_failed_pull_propagates() {
        let exec = docker();
        exec.push(CommandOutput::failed(1, "manifest unknown"));

        let op = spec(json!({"name": "web", "image": "nginx:nope"}));
        assert!(matches!(
            op.apply(&Host::local(), &exec),
            Err(Error::Execution { .. })
        ));
        assert_eq!(exec.commands().len(), 1);
    }

    #[test]
    fn test_run_argv_full() {
        let op = spec(json!({
            "name": "api",
            "image": "ghcr.io/acme/api:2",
            "restart": "unless-stopped",
            "network": "backend",
            "workdir": "/srv",
            "env": {"RUST_LOG": "info", "PORT": 8080},
            "ports": ["8080:8080", "9090:9090"],
            "volumes": "/data:/data",
            "extra_args": ["--memory", "512m"],
            "command": ["serve", "--port", "8080"]
        }));

        assert_eq!(
            op.run_argv().unwrap(),
            vec![
                "docker", "run", "-d", "--name", "api",
                "--restart", "unless-stopped",
                "--network", "backend",
                "-w", "/srv",
                "-e", "RUST_LOG=info", "-e", "PORT=8080",
                "-p", "8080:8080", "-p", "9090:9090",
                "-v", "/data:/data",
                "--memory", "512m",
                "ghcr.io/acme/api:2",
                "serve", "--port", "8080",
            ]
        );
    }

    #[test]
    fn test_run_argv_string_command_is_one_token() {
        let op = spec(json!({
            "name": "job",
            "image": "alpine",
            "detach": false,
            "restart_policy": "no",
            "command": "sleep 3600"
        }));

        assert_eq!(
            op.run_argv().unwrap(),
            vec!["docker", "run", "--name", "job", "--restart", "no", "alpine", "sleep 3600"]
        );
    }

    #[test]
    fn test_validation_errors() {
        assert_eq!(
            spec_err(json!({"image": "nginx"})).to_string(),
            "docker_container: requires a name"
        );
        assert_eq!(
            spec_err(json!({"name": "web"})).to_string(),
            "docker_container: requires an image when state=present"
        );
        assert_eq!(
            spec_err(json!({"name": "web", "image": "nginx", "state": "running"})).to_string(),
            "docker_container: state must be 'present' or 'absent'"
        );
        assert_eq!(
            spec_err(json!({"name": "web", "image": "nginx", "state": null})).to_string(),
            "docker_container: state must be 'present' or 'absent'"
        );
        assert!(matches!(
            spec_err(json!({"name": "web", "image": "nginx", "env": 5})),
            Error::Validation { .. }
        ));
        assert!(matches!(
            spec_err(json!({"name": "web", "image": "nginx", "command": 5})),
            Error::Validation { .. }
        ));
    }

    #[test]
    fn test_defaults_and_unknown_keys() {
        let op = spec(json!({"name": "web", "image": "nginx", "labels": {"a": "b"}}));
        assert_eq!(op.state, DesiredState::Present);
        assert!(op.pull);
        assert!(op.detach);
        assert!(!op.recreate.force);
        assert!(op.recreate.on_image_change);
        assert!(op.env.is_empty());
        assert_eq!(op.command, None);
    }

    #[test]
    fn test_absent_without_image_is_valid() {
        let op = spec(json!({"name": "old", "state": "absent"}));
        assert_eq!(op.image, None);
        assert!(op.run_argv().is_err());
    }
}
