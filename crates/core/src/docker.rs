//! Docker and OCI container runtime integration
//!
//! [`CliRuntime`] drives the `docker` (or compatible `podman`) CLI to implement
//! [`ContainerRuntime`]. The [`mock`] module provides an in-memory runtime for
//! tests that need no daemon.

use crate::errors::{RuntimeError, RuntimeResult};
use crate::output::LineSink;
use crate::runtime::{ContainerRuntime, RuntimeKind};
use crate::spec::{ContainerSpec, FileSource};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::{ChildStdin, Command};
use tracing::{debug, instrument};

/// Detects if runtime stderr indicates the container does not exist
fn is_no_such_container(stderr: &str) -> bool {
    let lower = stderr.to_lowercase();
    lower.contains("no such container") || lower.contains("no container with name or id")
}

/// Build `create` arguments for a spec
///
/// Environment values are not placed on the command line; `--env KEY` makes the
/// CLI read each value from its own environment, which keeps credentials out of
/// the host process list.
pub fn create_args(spec: &ContainerSpec) -> Vec<String> {
    let mut args = vec!["create".to_string()];

    for (key, value) in &spec.labels {
        args.push("--label".to_string());
        args.push(format!("{}={}", key, value));
    }

    if let Some(ref user) = spec.user {
        args.push("--user".to_string());
        args.push(user.clone());
    }

    if let Some(ref network) = spec.network_mode {
        args.push("--network".to_string());
        args.push(network.clone());
    }

    for key in spec.env.keys() {
        args.push("--env".to_string());
        args.push(key.clone());
    }

    for mount in &spec.mounts {
        args.push("--volume".to_string());
        args.push(mount.to_volume_arg());
    }

    args.push(spec.image.clone());
    args.extend(spec.command.iter().cloned());
    args
}

/// Single-entry tar archive placing `file` at its destination relative to `/`
pub fn tar_archive(file: &FileSource) -> std::io::Result<Vec<u8>> {
    let relative = file.dest_path().trim_start_matches('/');
    let mut header = tar::Header::new_gnu();
    header.set_size(file.contents().len() as u64);
    header.set_mode(file.mode());
    header.set_mtime(0);

    let mut builder = tar::Builder::new(Vec::new());
    builder.append_data(&mut header, relative, file.contents().as_ref())?;
    builder.into_inner()
}

/// Write `input` to a child's stdin and close it
async fn feed_stdin(pipe: Option<ChildStdin>, input: Option<Vec<u8>>) -> std::io::Result<()> {
    match (pipe, input) {
        (Some(mut pipe), Some(input)) => {
            pipe.write_all(&input).await?;
            pipe.shutdown().await
        }
        _ => Ok(()),
    }
}

/// Forward every line read from `reader` to `sink`
async fn pump_lines<R: AsyncRead + Unpin>(reader: R, sink: LineSink) -> std::io::Result<()> {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            return Ok(());
        }
        sink.write_line(&String::from_utf8_lossy(&buf))?;
    }
}

/// Generic CLI-based container runtime implementation
///
/// Docker and Podman share a compatible CLI for everything a phase needs.
#[derive(Debug, Clone)]
pub struct CliRuntime {
    kind: RuntimeKind,
    /// Container runtime CLI binary path (e.g., "docker" or "podman")
    runtime_path: String,
}

impl CliRuntime {
    pub fn docker() -> Self {
        Self {
            kind: RuntimeKind::Docker,
            runtime_path: "docker".to_string(),
        }
    }

    pub fn podman() -> Self {
        Self {
            kind: RuntimeKind::Podman,
            runtime_path: "podman".to_string(),
        }
    }

    /// Runtime of `kind` using a custom binary path
    pub fn with_runtime_path(kind: RuntimeKind, runtime_path: String) -> Self {
        Self { kind, runtime_path }
    }

    pub fn runtime_path(&self) -> &str {
        &self.runtime_path
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.runtime_path);
        command.kill_on_drop(true);
        command
    }

    fn spawn_error(&self, e: std::io::Error) -> RuntimeError {
        if e.kind() == std::io::ErrorKind::NotFound {
            debug!("Container runtime binary not found: {}", self.runtime_path);
            RuntimeError::NotInstalled
        } else {
            RuntimeError::CLIError(format!("Failed to execute runtime command: {}", e))
        }
    }

    /// Run a runtime command to completion and return its trimmed stdout
    async fn run_cli(
        &self,
        args: &[String],
        env: &[(String, String)],
        stdin: Option<Vec<u8>>,
        container_id: Option<&str>,
    ) -> RuntimeResult<String> {
        debug!(
            "Executing runtime command: {} {}",
            self.runtime_path,
            args.join(" ")
        );

        let mut command = self.command();
        command
            .args(args)
            .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command.spawn().map_err(|e| self.spawn_error(e))?;

        // A runtime that fails early stops reading stdin; its exit status and
        // stderr take precedence over the resulting write error.
        let pipe = child.stdin.take();
        let (fed, output) = tokio::join!(feed_stdin(pipe, stdin), child.wait_with_output());
        let output = output?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if let Some(id) = container_id {
                if is_no_such_container(&stderr) {
                    return Err(RuntimeError::ContainerNotFound { id: id.to_string() });
                }
            }
            return Err(RuntimeError::CLIError(format!(
                "Runtime command '{}' failed: {}",
                args.first().map(String::as_str).unwrap_or_default(),
                stderr.trim()
            )));
        }

        fed?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl Default for CliRuntime {
    fn default() -> Self {
        Self::docker()
    }
}

#[async_trait]
impl ContainerRuntime for CliRuntime {
    fn runtime_name(&self) -> &'static str {
        self.kind.as_str()
    }

    #[instrument(skip(self, spec), fields(image = %spec.image))]
    async fn create_container(&self, spec: &ContainerSpec) -> RuntimeResult<String> {
        debug!("Creating container from spec: {:?}", spec);

        let args = create_args(spec);
        let env: Vec<(String, String)> = spec
            .env
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let container_id = self.run_cli(&args, &env, None, None).await?;
        if container_id.is_empty() {
            return Err(RuntimeError::CLIError(
                "Runtime create returned no container ID".to_string(),
            ));
        }

        debug!("Created container: {}", container_id);
        Ok(container_id)
    }

    #[instrument(skip(self, file), fields(dest = %file.dest_path()))]
    async fn copy_file_into(&self, container_id: &str, file: &FileSource) -> RuntimeResult<()> {
        let archive = tar_archive(file)?;
        let args = vec![
            "cp".to_string(),
            "-".to_string(),
            format!("{}:/", container_id),
        ];
        self.run_cli(&args, &[], Some(archive), Some(container_id))
            .await
            .map(|_| ())
    }

    #[instrument(skip(self, stdout, stderr))]
    async fn start_and_wait(
        &self,
        container_id: &str,
        stdout: LineSink,
        stderr: LineSink,
    ) -> RuntimeResult<i64> {
        debug!("Starting container: {}", container_id);

        let mut child = self
            .command()
            .args(["start", "--attach", container_id])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let out = child
            .stdout
            .take()
            .ok_or_else(|| RuntimeError::CLIError("stdout not captured".to_string()))?;
        let err = child
            .stderr
            .take()
            .ok_or_else(|| RuntimeError::CLIError("stderr not captured".to_string()))?;

        let (out_result, err_result, status) = tokio::join!(
            pump_lines(out, stdout),
            pump_lines(err, stderr),
            child.wait()
        );
        out_result?;
        err_result?;
        let status = status?;

        // `start --attach` exits with the container's exit code
        let code = status.code().ok_or_else(|| {
            RuntimeError::CLIError(format!(
                "Runtime attach for container {} was terminated by a signal",
                container_id
            ))
        })?;

        debug!("Container {} exited with code {}", container_id, code);
        Ok(i64::from(code))
    }

    #[instrument(skip(self))]
    async fn remove_container(&self, container_id: &str) -> RuntimeResult<()> {
        debug!("Removing container: {}", container_id);
        let args = vec![
            "rm".to_string(),
            "--force".to_string(),
            container_id.to_string(),
        ];
        self.run_cli(&args, &[], None, Some(container_id))
            .await
            .map(|_| ())
    }
}

pub mod mock {
    //! Mock container runtime for testing phase flows
    //!
    //! Records every call in order, echoes the container command the way a fake
    //! lifecycle binary would, and can be told to fail at any step.

    use crate::errors::{RuntimeError, RuntimeResult};
    use crate::output::LineSink;
    use crate::runtime::ContainerRuntime;
    use crate::spec::{ContainerSpec, FileSource};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::{Mutex, MutexGuard};
    use std::time::Duration;
    use tracing::debug;

    /// Scripted behavior of the mock runtime
    #[derive(Debug, Clone)]
    pub struct MockRuntimeConfig {
        /// Fail `create_container`
        pub fail_create: bool,
        /// Fail the copy with this zero-based index
        pub fail_copy_at: Option<usize>,
        /// Fail `start_and_wait` with a transport error
        pub fail_start: bool,
        /// Fail `remove_container` with a non-"not found" error
        pub fail_remove: bool,
        /// Exit code returned by `start_and_wait`
        pub exit_code: i64,
        /// Write `received args [<command>]` to stdout on start
        pub echo_args: bool,
        /// Extra stdout lines written on start
        pub stdout_lines: Vec<String>,
        /// Extra stderr lines written on start
        pub stderr_lines: Vec<String>,
        /// Keep `start_and_wait` blocked after writing output
        pub block_forever: bool,
        /// Delay before `start_and_wait` returns
        pub run_delay: Option<Duration>,
    }

    impl Default for MockRuntimeConfig {
        fn default() -> Self {
            Self {
                fail_create: false,
                fail_copy_at: None,
                fail_start: false,
                fail_remove: false,
                exit_code: 0,
                echo_args: true,
                stdout_lines: Vec::new(),
                stderr_lines: Vec::new(),
                block_forever: false,
                run_delay: None,
            }
        }
    }

    /// A call observed by the mock, in call order
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum MockEvent {
        Created { id: String, spec: ContainerSpec },
        Copied { id: String, file: FileSource },
        Started { id: String },
        Removed { id: String },
    }

    #[derive(Debug, Default)]
    struct MockState {
        containers: HashMap<String, ContainerSpec>,
        copies: usize,
        events: Vec<MockEvent>,
    }

    /// In-memory [`ContainerRuntime`]
    #[derive(Debug, Default)]
    pub struct MockRuntime {
        config: Mutex<MockRuntimeConfig>,
        state: Mutex<MockState>,
    }

    impl MockRuntime {
        pub fn new() -> Self {
            Self::with_config(MockRuntimeConfig::default())
        }

        pub fn with_config(config: MockRuntimeConfig) -> Self {
            Self {
                config: Mutex::new(config),
                state: Mutex::new(MockState::default()),
            }
        }

        /// Update mock configuration
        pub fn update_config<F>(&self, f: F)
        where
            F: FnOnce(&mut MockRuntimeConfig),
        {
            f(&mut self.config());
        }

        /// Every call made so far
        pub fn events(&self) -> Vec<MockEvent> {
            self.state().events.clone()
        }

        /// IDs of containers that exist and have not been removed
        pub fn live_containers(&self) -> Vec<String> {
            let mut ids: Vec<String> = self.state().containers.keys().cloned().collect();
            ids.sort();
            ids
        }

        /// Spec a live container was created from
        pub fn container_spec(&self, id: &str) -> Option<ContainerSpec> {
            self.state().containers.get(id).cloned()
        }

        /// Remove a container behind the phase's back
        pub fn forget_container(&self, id: &str) {
            self.state().containers.remove(id);
        }

        fn config(&self) -> MutexGuard<'_, MockRuntimeConfig> {
            self.config.lock().unwrap_or_else(|e| e.into_inner())
        }

        fn state(&self) -> MutexGuard<'_, MockState> {
            self.state.lock().unwrap_or_else(|e| e.into_inner())
        }
    }

    #[async_trait]
    impl ContainerRuntime for MockRuntime {
        fn runtime_name(&self) -> &'static str {
            "mock"
        }

        async fn create_container(&self, spec: &ContainerSpec) -> RuntimeResult<String> {
            if self.config().fail_create {
                return Err(RuntimeError::CLIError(format!(
                    "Unable to find image '{}' locally",
                    spec.image
                )));
            }

            let id = format!("mock-container-{:016x}", fastrand::u64(..));
            let mut state = self.state();
            state.containers.insert(id.clone(), spec.clone());
            state.events.push(MockEvent::Created {
                id: id.clone(),
                spec: spec.clone(),
            });
            debug!("MockRuntime created container: {}", id);
            Ok(id)
        }

        async fn copy_file_into(&self, container_id: &str, file: &FileSource) -> RuntimeResult<()> {
            let fail_at = self.config().fail_copy_at;
            let mut state = self.state();
            if !state.containers.contains_key(container_id) {
                return Err(RuntimeError::ContainerNotFound {
                    id: container_id.to_string(),
                });
            }

            let index = state.copies;
            state.copies += 1;
            if fail_at == Some(index) {
                return Err(RuntimeError::CLIError(format!(
                    "Error response from daemon: cannot copy {}",
                    file.dest_path()
                )));
            }

            state.events.push(MockEvent::Copied {
                id: container_id.to_string(),
                file: file.clone(),
            });
            Ok(())
        }

        async fn start_and_wait(
            &self,
            container_id: &str,
            stdout: LineSink,
            stderr: LineSink,
        ) -> RuntimeResult<i64> {
            let config = self.config().clone();
            let command = {
                let mut state = self.state();
                let spec = state.containers.get(container_id).cloned().ok_or_else(|| {
                    RuntimeError::ContainerNotFound {
                        id: container_id.to_string(),
                    }
                })?;
                state.events.push(MockEvent::Started {
                    id: container_id.to_string(),
                });
                spec.command
            };

            if config.fail_start {
                return Err(RuntimeError::CLIError(
                    "Error response from daemon: attach failed".to_string(),
                ));
            }

            stdout.write_line("running some-lifecycle-phase")?;
            if config.echo_args {
                stdout.write_line(&format!("received args [{}]", command.join(" ")))?;
            }
            for line in &config.stdout_lines {
                stdout.write_line(line)?;
            }
            for line in &config.stderr_lines {
                stderr.write_line(line)?;
            }

            if let Some(delay) = config.run_delay {
                tokio::time::sleep(delay).await;
            }
            if config.block_forever {
                std::future::pending::<()>().await;
            }

            Ok(config.exit_code)
        }

        async fn remove_container(&self, container_id: &str) -> RuntimeResult<()> {
            if self.config().fail_remove {
                return Err(RuntimeError::CLIError(
                    "Error response from daemon: removal already in progress".to_string(),
                ));
            }

            let mut state = self.state();
            if state.containers.remove(container_id).is_none() {
                return Err(RuntimeError::ContainerNotFound {
                    id: container_id.to_string(),
                });
            }
            state.events.push(MockEvent::Removed {
                id: container_id.to_string(),
            });
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{MountSpec, REGISTRY_AUTH_ENV};
    use std::io::Read;

    #[test]
    fn test_is_no_such_container() {
        assert!(is_no_such_container(
            "Error response from daemon: No such container: abc123"
        ));
        assert!(is_no_such_container(
            "Error: no container with name or ID \"abc\" found: no such container"
        ));
        assert!(!is_no_such_container("permission denied"));
    }

    #[test]
    fn test_create_args_order_and_env_by_name() {
        let mut spec = ContainerSpec {
            image: "builder:latest".to_string(),
            command: vec!["/lifecycle/detect".to_string(), "-app".to_string()],
            user: Some("root".to_string()),
            network_mode: Some("host".to_string()),
            mounts: vec![MountSpec::volume("ws", "/workspace")],
            ..Default::default()
        };
        spec.labels.insert("author".to_string(), "phaser".to_string());
        spec.env
            .insert(REGISTRY_AUTH_ENV.to_string(), "{\"secret\":1}".to_string());

        let args = create_args(&spec);
        assert_eq!(
            args,
            vec![
                "create",
                "--label",
                "author=phaser",
                "--user",
                "root",
                "--network",
                "host",
                "--env",
                REGISTRY_AUTH_ENV,
                "--volume",
                "ws:/workspace",
                "builder:latest",
                "/lifecycle/detect",
                "-app",
            ]
        );
        assert!(!args.iter().any(|a| a.contains("secret")));
    }

    #[test]
    fn test_tar_archive_places_file_relative_to_root() {
        let file = FileSource::new("/platform/env/HELLO", "world").with_mode(0o600);
        let archive = tar_archive(&file).unwrap();

        let mut archive = tar::Archive::new(archive.as_slice());
        let mut entries = archive.entries().unwrap();
        let mut entry = entries.next().unwrap().unwrap();
        assert_eq!(
            entry.path().unwrap().to_str().unwrap(),
            "platform/env/HELLO"
        );
        assert_eq!(entry.header().mode().unwrap(), 0o600);

        let mut contents = String::new();
        entry.read_to_string(&mut contents).unwrap();
        assert_eq!(contents, "world");
        assert!(entries.next().is_none());
    }

    #[tokio::test]
    #[serial_test::serial]
    async fn test_missing_runtime_binary_reports_not_installed() {
        let runtime = CliRuntime::with_runtime_path(
            RuntimeKind::Docker,
            "/nonexistent/phaser-test-docker".to_string(),
        );
        let err = runtime
            .create_container(&ContainerSpec::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeError::NotInstalled));
    }

    #[cfg(unix)]
    mod cli_runtime {
        use super::*;
        use crate::output::{PhaseLogger, SharedBuffer};
        use serial_test::serial;
        use std::os::unix::fs::PermissionsExt;
        use std::path::Path;
        use tempfile::TempDir;

        /// Shell script standing in for the docker CLI; records what it receives in `dir`
        fn fake_runtime(dir: &TempDir) -> CliRuntime {
            let state = dir.path().display();
            let script = format!(
                r#"#!/bin/sh
case "$1" in
  create)
    printf '%s\n' "$@" > "{state}/create-args"
    printf '%s' "$CNB_REGISTRY_AUTH" > "{state}/create-env"
    echo fake-container-1
    ;;
  cp)
    if [ "$3" = "gone:/" ]; then
      echo "Error response from daemon: No such container: gone" >&2
      exit 1
    fi
    cat > "{state}/archive.tar"
    ;;
  start)
    echo "out one"
    echo "err one" >&2
    echo "out two"
    exit 3
    ;;
  rm)
    if [ "$3" = "gone" ]; then
      echo "Error: No such container: gone" >&2
      exit 1
    fi
    ;;
esac
"#
            );
            let path = dir.path().join("docker");
            std::fs::write(&path, script).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            CliRuntime::with_runtime_path(RuntimeKind::Docker, path.display().to_string())
        }

        fn read(dir: &Path, name: &str) -> String {
            std::fs::read_to_string(dir.join(name)).unwrap()
        }

        #[tokio::test]
        #[serial]
        async fn test_create_passes_env_by_name() {
            let dir = TempDir::new().unwrap();
            let runtime = fake_runtime(&dir);

            let mut spec = ContainerSpec {
                image: "builder".to_string(),
                command: vec!["/lifecycle/export".to_string()],
                ..Default::default()
            };
            spec.env
                .insert(REGISTRY_AUTH_ENV.to_string(), "{\"ghcr.io\":\"Bearer t\"}".to_string());

            let id = runtime.create_container(&spec).await.unwrap();
            assert_eq!(id, "fake-container-1");

            let args = read(dir.path(), "create-args");
            assert!(args.lines().any(|l| l == REGISTRY_AUTH_ENV));
            assert!(!args.contains("Bearer"));
            assert_eq!(read(dir.path(), "create-env"), "{\"ghcr.io\":\"Bearer t\"}");
        }

        #[tokio::test]
        #[serial]
        async fn test_copy_feeds_tar_archive() {
            let dir = TempDir::new().unwrap();
            let runtime = fake_runtime(&dir);

            let file = FileSource::new("/platform/env/A", "value");
            runtime.copy_file_into("fake-container-1", &file).await.unwrap();

            let bytes = std::fs::read(dir.path().join("archive.tar")).unwrap();
            let mut archive = tar::Archive::new(bytes.as_slice());
            let mut entry = archive.entries().unwrap().next().unwrap().unwrap();
            assert_eq!(entry.path().unwrap().to_str().unwrap(), "platform/env/A");
            let mut contents = String::new();
            entry.read_to_string(&mut contents).unwrap();
            assert_eq!(contents, "value");
        }

        #[tokio::test]
        #[serial]
        async fn test_copy_into_missing_container_with_large_file() {
            let dir = TempDir::new().unwrap();
            let runtime = fake_runtime(&dir);

            let file = FileSource::new("/cnb/big.bin", vec![0u8; 4 * 1024 * 1024]);
            let err = runtime.copy_file_into("gone", &file).await.unwrap_err();
            assert!(
                matches!(err, RuntimeError::ContainerNotFound { ref id } if id == "gone"),
                "unexpected error: {:?}",
                err
            );
        }

        #[tokio::test]
        #[serial]
        async fn test_start_streams_prefixed_lines_and_returns_exit_code() {
            let dir = TempDir::new().unwrap();
            let runtime = fake_runtime(&dir);

            let out = SharedBuffer::new();
            let err = SharedBuffer::new();
            let (stdout, stderr) =
                PhaseLogger::new(LineSink::new(out.clone()), LineSink::new(err.clone()))
                    .for_phase("build");

            let code = runtime
                .start_and_wait("fake-container-1", stdout, stderr)
                .await
                .unwrap();

            assert_eq!(code, 3);
            assert_eq!(out.lines(), vec!["[build] out one", "[build] out two"]);
            assert_eq!(err.lines(), vec!["[build] err one"]);
        }

        #[tokio::test]
        #[serial]
        async fn test_remove_missing_container_is_not_found() {
            let dir = TempDir::new().unwrap();
            let runtime = fake_runtime(&dir);

            runtime.remove_container("fake-container-1").await.unwrap();
            let err = runtime.remove_container("gone").await.unwrap_err();
            assert!(matches!(err, RuntimeError::ContainerNotFound { ref id } if id == "gone"));
        }
    }

    mod mock_runtime {
        use super::super::mock::*;
        use crate::output::{LineSink, SharedBuffer};
        use crate::runtime::ContainerRuntime;
        use crate::spec::ContainerSpec;

        fn spec(command: &[&str]) -> ContainerSpec {
            ContainerSpec {
                image: "builder".to_string(),
                command: command.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            }
        }

        #[tokio::test]
        async fn test_mock_echoes_command() {
            let runtime = MockRuntime::new();
            let id = runtime
                .create_container(&spec(&["/lifecycle/detect", "a"]))
                .await
                .unwrap();

            let out = SharedBuffer::new();
            let code = runtime
                .start_and_wait(&id, LineSink::new(out.clone()), LineSink::discard())
                .await
                .unwrap();

            assert_eq!(code, 0);
            assert!(out
                .contents()
                .contains("received args [/lifecycle/detect a]"));
        }

        #[tokio::test]
        async fn test_mock_remove_twice_reports_not_found() {
            let runtime = MockRuntime::new();
            let id = runtime.create_container(&spec(&["x"])).await.unwrap();

            runtime.remove_container(&id).await.unwrap();
            let err = runtime.remove_container(&id).await.unwrap_err();
            assert!(matches!(
                err,
                crate::errors::RuntimeError::ContainerNotFound { .. }
            ));
            assert!(runtime.live_containers().is_empty());
        }
    }
}
