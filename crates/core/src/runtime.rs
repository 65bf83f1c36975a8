//! Container runtime abstraction for Docker/Podman/etc.
//!
//! Phases talk to the runtime only through [`ContainerRuntime`], so the
//! CLI-backed implementation can be swapped for a mock in tests or for another
//! engine without touching phase logic.

use crate::docker::CliRuntime;
use crate::errors::{ConfigError, RuntimeResult};
use crate::output::LineSink;
use crate::spec::{ContainerSpec, FileSource};
use async_trait::async_trait;
use serde::Deserialize;

/// Primitives a phase needs from a container engine
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Get the name/type of this runtime (e.g., "docker", "podman")
    fn runtime_name(&self) -> &'static str;

    /// Create (but do not start) a container, returning its ID
    async fn create_container(&self, spec: &ContainerSpec) -> RuntimeResult<String>;

    /// Place a file in a created container at its absolute destination path
    async fn copy_file_into(&self, container_id: &str, file: &FileSource) -> RuntimeResult<()>;

    /// Start the container, stream its output line by line, and return its exit code
    ///
    /// Dropping the returned future detaches from the container; it does not
    /// stop it.
    async fn start_and_wait(
        &self,
        container_id: &str,
        stdout: LineSink,
        stderr: LineSink,
    ) -> RuntimeResult<i64>;

    /// Forcibly remove a container, stopping it first if needed
    ///
    /// Returns [`crate::errors::RuntimeError::ContainerNotFound`] when the
    /// container does not exist.
    async fn remove_container(&self, container_id: &str) -> RuntimeResult<()>;
}

/// Runtime selection options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeKind {
    /// Docker runtime
    #[default]
    Docker,
    /// Podman runtime
    Podman,
}

impl RuntimeKind {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Docker => "docker",
            Self::Podman => "podman",
        }
    }
}

impl std::str::FromStr for RuntimeKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "docker" => Ok(Self::Docker),
            "podman" => Ok(Self::Podman),
            _ => Err(ConfigError::Validation {
                message: format!(
                    "Unknown runtime: {}. Supported runtimes: docker, podman",
                    s
                ),
            }),
        }
    }
}

impl std::fmt::Display for RuntimeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Runtime factory for creating container runtime instances
pub struct RuntimeFactory;

impl RuntimeFactory {
    /// Create a CLI-backed runtime, optionally overriding the binary path
    pub fn create_runtime(kind: RuntimeKind, runtime_path: Option<String>) -> CliRuntime {
        match (kind, runtime_path) {
            (_, Some(path)) => CliRuntime::with_runtime_path(kind, path),
            (RuntimeKind::Docker, None) => CliRuntime::docker(),
            (RuntimeKind::Podman, None) => CliRuntime::podman(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_kind_from_str() {
        assert_eq!("docker".parse::<RuntimeKind>().unwrap(), RuntimeKind::Docker);
        assert_eq!("Podman".parse::<RuntimeKind>().unwrap(), RuntimeKind::Podman);
        assert!("containerd".parse::<RuntimeKind>().is_err());
    }

    #[test]
    fn test_runtime_kind_display() {
        assert_eq!(RuntimeKind::Docker.to_string(), "docker");
        assert_eq!(RuntimeKind::Podman.to_string(), "podman");
    }

    #[test]
    fn test_create_runtime_names() {
        let runtime = RuntimeFactory::create_runtime(RuntimeKind::Podman, None);
        assert_eq!(runtime.runtime_name(), "podman");

        let runtime =
            RuntimeFactory::create_runtime(RuntimeKind::Docker, Some("/opt/bin/docker".into()));
        assert_eq!(runtime.runtime_name(), "docker");
        assert_eq!(runtime.runtime_path(), "/opt/bin/docker");
    }
}
