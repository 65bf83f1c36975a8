//! Settings for building a lifecycle
//!
//! Settings come from an optional TOML file and are then overridden by
//! environment variables:
//!
//! | Variable | Field |
//! |---|---|
//! | `PHASER_BUILDER_IMAGE` | `builder_image` |
//! | `PHASER_WORKSPACE_VOLUME` | `workspace_volume` |
//! | `PHASER_RUNTIME` | `runtime` |
//! | `PHASER_RUNTIME_PATH` | `runtime_path` |
//! | `PHASER_DOCKER_SOCKET` | `daemon_socket` |

use crate::errors::ConfigError;
use crate::runtime::RuntimeKind;
use crate::spec::DAEMON_SOCKET;
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

/// Lifecycle settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Settings {
    /// Image containing `/lifecycle/<phase>` binaries
    pub builder_image: String,
    /// Volume shared by all phases at `/workspace`
    pub workspace_volume: String,
    pub runtime: RuntimeKind,
    /// Custom runtime binary path
    pub runtime_path: Option<String>,
    /// Host path of the engine control socket
    pub daemon_socket: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            builder_image: String::new(),
            workspace_volume: String::new(),
            runtime: RuntimeKind::Docker,
            runtime_path: None,
            daemon_socket: DAEMON_SOCKET.to_string(),
        }
    }
}

impl Settings {
    /// Parse settings from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parsing {
            message: e.to_string(),
        })
    }

    /// Load from `path` if given, apply env overrides, and validate
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut settings = match path {
            Some(path) => {
                debug!("Loading settings from {}", path.display());
                Self::from_toml_str(&std::fs::read_to_string(path)?)?
            }
            None => Self::default(),
        };
        settings.apply_env_overrides()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Override fields from `PHASER_*` environment variables
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(image) = std::env::var("PHASER_BUILDER_IMAGE") {
            self.builder_image = image;
        }
        if let Ok(volume) = std::env::var("PHASER_WORKSPACE_VOLUME") {
            self.workspace_volume = volume;
        }
        if let Ok(runtime) = std::env::var("PHASER_RUNTIME") {
            self.runtime = runtime.parse()?;
        }
        if let Ok(path) = std::env::var("PHASER_RUNTIME_PATH") {
            self.runtime_path = Some(path);
        }
        if let Ok(socket) = std::env::var("PHASER_DOCKER_SOCKET") {
            self.daemon_socket = socket;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("builder-image", &self.builder_image),
            ("workspace-volume", &self.workspace_volume),
            ("daemon-socket", &self.daemon_socket),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Validation {
                    message: format!("'{}' must be set", field),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_toml_str() {
        let settings = Settings::from_toml_str(
            r#"
            builder-image = "cnbs/sample-builder:bionic"
            workspace-volume = "pack-workspace-1"
            runtime = "podman"
            "#,
        )
        .unwrap();

        assert_eq!(settings.builder_image, "cnbs/sample-builder:bionic");
        assert_eq!(settings.workspace_volume, "pack-workspace-1");
        assert_eq!(settings.runtime, RuntimeKind::Podman);
        assert_eq!(settings.daemon_socket, DAEMON_SOCKET);
        assert!(settings.runtime_path.is_none());
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let err = Settings::from_toml_str("builder = \"x\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parsing { .. }));
    }

    #[test]
    fn test_validate_requires_image_and_volume() {
        let err = Settings::default().validate().unwrap_err();
        assert!(err.to_string().contains("builder-image"));

        let settings = Settings {
            builder_image: "builder".to_string(),
            ..Default::default()
        };
        assert!(settings.validate().unwrap_err().to_string().contains("workspace-volume"));
    }
}
