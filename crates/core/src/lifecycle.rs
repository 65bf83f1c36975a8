//! Lifecycle phase factory
//!
//! A [`Lifecycle`] holds what every phase of one build shares: the builder
//! image, the workspace volume, the runtime, credentials, output sinks and the
//! execution context. [`Lifecycle::new_phase`] turns a phase name plus options
//! into a configured [`Phase`].

use crate::auth::{CredentialResolver, Keychain};
use crate::config::Settings;
use crate::context::ExecutionContext;
use crate::errors::{ConfigError, ConstructionFailure, PhaseError, Result};
use crate::options::PhaseOption;
use crate::output::PhaseLogger;
use crate::phase::{Phase, PhaseDraft};
use crate::runtime::ContainerRuntime;
use crate::spec::{
    phase_command, ContainerSpec, MountSpec, AUTHOR, DAEMON_SOCKET, LABEL_AUTHOR, WORKSPACE_DIR,
};
use crate::workspace::WorkspaceLock;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Shared configuration from which phases are built
#[derive(Clone)]
pub struct Lifecycle {
    builder_image: String,
    workspace_volume: String,
    daemon_socket: String,
    context: ExecutionContext,
    runtime: Arc<dyn ContainerRuntime>,
    credentials: Arc<dyn CredentialResolver>,
    logger: PhaseLogger,
}

impl Lifecycle {
    /// Start building a lifecycle on top of `runtime`
    pub fn builder(runtime: Arc<dyn ContainerRuntime>) -> LifecycleBuilder {
        LifecycleBuilder::new(runtime)
    }

    pub fn builder_image(&self) -> &str {
        &self.builder_image
    }

    pub fn workspace_volume(&self) -> &str {
        &self.workspace_volume
    }

    /// Host path of the engine control socket mounted by daemon access
    pub fn daemon_socket(&self) -> &str {
        &self.daemon_socket
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    pub fn credentials(&self) -> &dyn CredentialResolver {
        self.credentials.as_ref()
    }

    /// Single-writer token for this lifecycle's workspace volume
    pub fn workspace_lock(&self) -> WorkspaceLock {
        WorkspaceLock::for_volume(&self.workspace_volume)
    }

    /// Spec every phase starts from before options apply
    pub fn default_spec(&self, name: &str) -> ContainerSpec {
        let mut spec = ContainerSpec {
            image: self.builder_image.clone(),
            command: vec![phase_command(name)],
            mounts: vec![MountSpec::volume(&self.workspace_volume, WORKSPACE_DIR)],
            ..Default::default()
        };
        spec.labels.insert(LABEL_AUTHOR.to_string(), AUTHOR.to_string());
        spec
    }

    /// Build a configured phase, applying `options` in order
    ///
    /// The first failing option aborts construction; no phase is returned and
    /// nothing has been allocated in the runtime.
    #[instrument(skip(self, options))]
    pub async fn new_phase<I>(&self, name: &str, options: I) -> Result<Phase>
    where
        I: IntoIterator<Item = PhaseOption>,
    {
        let options: Vec<PhaseOption> = options.into_iter().collect();
        let construction_error = |source: ConstructionFailure| PhaseError::Construction {
            phase: name.to_string(),
            source,
        };

        if !is_valid_phase_name(name) {
            return Err(construction_error(ConstructionFailure::InvalidName {
                name: name.to_string(),
            }));
        }

        let mut draft = PhaseDraft {
            spec: self.default_spec(name),
            files: Vec::new(),
        };
        for option in options {
            option
                .apply(&mut draft, self)
                .await
                .map_err(construction_error)?;
        }

        debug!("Configured phase {}: {:?}", name, draft.spec);
        Ok(Phase::new(
            name.to_string(),
            draft,
            Arc::clone(&self.runtime),
            self.context.clone(),
            self.logger.for_phase(name),
        ))
    }
}

/// Phase names become a path component under the lifecycle directory
fn is_valid_phase_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_.".contains(c))
}

impl fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifecycle")
            .field("builder_image", &self.builder_image)
            .field("workspace_volume", &self.workspace_volume)
            .field("daemon_socket", &self.daemon_socket)
            .field("runtime", &self.runtime.runtime_name())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Lifecycle`]
pub struct LifecycleBuilder {
    runtime: Arc<dyn ContainerRuntime>,
    builder_image: Option<String>,
    workspace_volume: Option<String>,
    daemon_socket: String,
    context: ExecutionContext,
    credentials: Option<Arc<dyn CredentialResolver>>,
    logger: PhaseLogger,
}

impl LifecycleBuilder {
    fn new(runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self {
            runtime,
            builder_image: None,
            workspace_volume: None,
            daemon_socket: DAEMON_SOCKET.to_string(),
            context: ExecutionContext::new(),
            credentials: None,
            logger: PhaseLogger::stdio(),
        }
    }

    /// Take image, volume and socket from loaded settings
    pub fn settings(mut self, settings: &Settings) -> Self {
        self.builder_image = Some(settings.builder_image.clone());
        self.workspace_volume = Some(settings.workspace_volume.clone());
        self.daemon_socket = settings.daemon_socket.clone();
        self
    }

    pub fn builder_image(mut self, image: impl Into<String>) -> Self {
        self.builder_image = Some(image.into());
        self
    }

    pub fn workspace_volume(mut self, volume: impl Into<String>) -> Self {
        self.workspace_volume = Some(volume.into());
        self
    }

    pub fn daemon_socket(mut self, socket: impl Into<String>) -> Self {
        self.daemon_socket = socket.into();
        self
    }

    pub fn context(mut self, context: ExecutionContext) -> Self {
        self.context = context;
        self
    }

    /// Credential resolver; defaults to an anonymous [`Keychain`]
    pub fn credentials(mut self, credentials: Arc<dyn CredentialResolver>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn logger(mut self, logger: PhaseLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn build(self) -> std::result::Result<Lifecycle, ConfigError> {
        let non_empty = |value: Option<String>, what: &str| match value {
            Some(v) if !v.trim().is_empty() => Ok(v),
            _ => Err(ConfigError::Validation {
                message: format!("{} must not be empty", what),
            }),
        };

        Ok(Lifecycle {
            builder_image: non_empty(self.builder_image, "builder image")?,
            workspace_volume: non_empty(self.workspace_volume, "workspace volume")?,
            daemon_socket: self.daemon_socket,
            context: self.context,
            runtime: self.runtime,
            credentials: self
                .credentials
                .unwrap_or_else(|| Arc::new(Keychain::new())),
            logger: self.logger,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docker::mock::MockRuntime;

    fn lifecycle() -> Lifecycle {
        Lifecycle::builder(Arc::new(MockRuntime::new()))
            .builder_image("some/builder")
            .workspace_volume("pack-workspace-abc")
            .logger(PhaseLogger::discard())
            .build()
            .unwrap()
    }

    #[test]
    fn test_default_spec() {
        let spec = lifecycle().default_spec("detect");
        assert_eq!(spec.image, "some/builder");
        assert_eq!(spec.command, vec!["/lifecycle/detect"]);
        assert_eq!(
            spec.mount_at(WORKSPACE_DIR),
            Some(&MountSpec::volume("pack-workspace-abc", WORKSPACE_DIR))
        );
        assert_eq!(spec.labels.get(LABEL_AUTHOR).map(String::as_str), Some(AUTHOR));
        assert!(spec.user.is_none());
        assert!(spec.network_mode.is_none());
        assert!(spec.env.is_empty());
    }

    #[test]
    fn test_build_requires_image_and_volume() {
        let err = Lifecycle::builder(Arc::new(MockRuntime::new()))
            .workspace_volume("vol")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("builder image"));

        let err = Lifecycle::builder(Arc::new(MockRuntime::new()))
            .builder_image("img")
            .workspace_volume("  ")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("workspace volume"));
    }

    #[test]
    fn test_valid_phase_names() {
        assert!(is_valid_phase_name("detect"));
        assert!(is_valid_phase_name("restore-cache"));
        assert!(!is_valid_phase_name(""));
        assert!(!is_valid_phase_name(".."));
        assert!(!is_valid_phase_name("../bin/sh"));
        assert!(!is_valid_phase_name("with space"));
    }

    #[tokio::test]
    async fn test_new_phase_rejects_invalid_name() {
        let err = lifecycle().new_phase("a/b", Vec::new()).await.unwrap_err();
        assert!(matches!(err, PhaseError::Construction { .. }));
        assert_eq!(err.phase_name(), "a/b");
    }
}
