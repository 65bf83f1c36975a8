//! Container specification for a single phase
//!
//! A [`ContainerSpec`] is the draft configuration that options mutate before a
//! phase runs. It is runtime-agnostic; [`crate::docker::CliRuntime`] turns it into
//! `create` arguments.

use bytes::Bytes;
use indexmap::IndexMap;
use std::fmt;

/// Directory inside the builder image holding one binary per phase
pub const LIFECYCLE_DIR: &str = "/lifecycle";

/// Mount point of the shared workspace volume
pub const WORKSPACE_DIR: &str = "/workspace";

/// Provenance label key and value stamped on every phase container
pub const LABEL_AUTHOR: &str = "author";
pub const AUTHOR: &str = "phaser";

/// Control socket of the host container engine
pub const DAEMON_SOCKET: &str = "/var/run/docker.sock";

/// Environment variable carrying serialized registry credentials
pub const REGISTRY_AUTH_ENV: &str = "CNB_REGISTRY_AUTH";

/// Identity used when a phase needs daemon access
pub const ROOT_USER: &str = "root";

/// Network mode used when a phase needs registry access
pub const HOST_NETWORK: &str = "host";

const REDACTED: &str = "****";

/// In-image path of the binary for the named phase
pub fn phase_command(name: &str) -> String {
    format!("{}/{}", LIFECYCLE_DIR, name)
}

/// How a mount source is resolved by the runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountKind {
    /// Named runtime volume
    Volume,
    /// Host filesystem path
    Bind,
}

/// A single mount in a container spec
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountSpec {
    pub kind: MountKind,
    pub source: String,
    pub target: String,
    pub read_only: bool,
}

impl MountSpec {
    /// Read-write named volume
    pub fn volume(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            kind: MountKind::Volume,
            source: name.into(),
            target: target.into(),
            read_only: false,
        }
    }

    /// Read-write bind mount of a host path
    pub fn bind(host_path: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            kind: MountKind::Bind,
            source: host_path.into(),
            target: target.into(),
            read_only: false,
        }
    }

    /// Mark the mount read-only
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// `source:target[:ro]` form understood by `--volume`
    pub fn to_volume_arg(&self) -> String {
        if self.read_only {
            format!("{}:{}:ro", self.source, self.target)
        } else {
            format!("{}:{}", self.source, self.target)
        }
    }
}

/// Draft container configuration for one phase
#[derive(Clone, PartialEq, Eq, Default)]
pub struct ContainerSpec {
    /// Builder image to run
    pub image: String,
    /// Command, starting with the phase binary
    pub command: Vec<String>,
    /// Environment variables, in insertion order
    pub env: IndexMap<String, String>,
    /// Container labels
    pub labels: IndexMap<String, String>,
    /// Mounts, in insertion order
    pub mounts: Vec<MountSpec>,
    /// Process identity; image default when unset
    pub user: Option<String>,
    /// Network mode; runtime default when unset
    pub network_mode: Option<String>,
}

impl ContainerSpec {
    /// Find the mount bound at `target`
    pub fn mount_at(&self, target: &str) -> Option<&MountSpec> {
        self.mounts.iter().find(|m| m.target == target)
    }

    /// Environment with credential values masked, for diagnostics
    pub fn redacted_env(&self) -> IndexMap<String, String> {
        self.env
            .iter()
            .map(|(key, value)| {
                if key == REGISTRY_AUTH_ENV {
                    (key.clone(), REDACTED.to_string())
                } else {
                    (key.clone(), value.clone())
                }
            })
            .collect()
    }
}

impl fmt::Debug for ContainerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerSpec")
            .field("image", &self.image)
            .field("command", &self.command)
            .field("env", &self.redacted_env())
            .field("labels", &self.labels)
            .field("mounts", &self.mounts)
            .field("user", &self.user)
            .field("network_mode", &self.network_mode)
            .finish()
    }
}

/// A file to place in the container before the phase starts
#[derive(Clone, PartialEq, Eq)]
pub struct FileSource {
    dest_path: String,
    contents: Bytes,
    mode: u32,
}

impl FileSource {
    /// File at absolute `dest_path` with mode 0644
    pub fn new(dest_path: impl Into<String>, contents: impl Into<Bytes>) -> Self {
        Self {
            dest_path: dest_path.into(),
            contents: contents.into(),
            mode: 0o644,
        }
    }

    pub fn with_mode(mut self, mode: u32) -> Self {
        self.mode = mode;
        self
    }

    pub fn dest_path(&self) -> &str {
        &self.dest_path
    }

    pub fn contents(&self) -> &Bytes {
        &self.contents
    }

    pub fn mode(&self) -> u32 {
        self.mode
    }
}

impl fmt::Debug for FileSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileSource")
            .field("dest_path", &self.dest_path)
            .field("len", &self.contents.len())
            .field("mode", &format_args!("{:o}", self.mode))
            .finish()
    }
}
