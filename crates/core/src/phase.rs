//! Phase execution
//!
//! A [`Phase`] is single use: `run` creates one container, injects the queued
//! files, starts the phase binary and waits for it; `cleanup` removes the
//! container. States move strictly forward:
//!
//! ```text
//! Configured -> Running -> Succeeded | Failed -> Removed
//! ```
//!
//! A failure before the process starts moves straight to `Failed`. `cleanup`
//! moves every state, `Configured` included, to `Removed`.

use crate::context::ExecutionContext;
use crate::errors::{ExecutionFailure, PhaseError, Result, RuntimeError};
use crate::output::LineSink;
use crate::runtime::ContainerRuntime;
use crate::spec::{ContainerSpec, FileSource};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Where a phase is in its single-use lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseState {
    /// All options applied; nothing allocated yet
    Configured,
    /// Container created, files injected, process started
    Running,
    /// Process exited with code 0
    Succeeded,
    /// Creation, injection or execution failed
    Failed,
    /// Container removed; terminal
    Removed,
}

impl PhaseState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Configured => "configured",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Removed => "removed",
        }
    }
}

impl fmt::Display for PhaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mutable configuration options write into before a phase exists
#[derive(Debug, Clone)]
pub(crate) struct PhaseDraft {
    pub(crate) spec: ContainerSpec,
    pub(crate) files: Vec<FileSource>,
}

/// One lifecycle step bound to at most one container
pub struct Phase {
    name: String,
    spec: ContainerSpec,
    files: Vec<FileSource>,
    runtime: Arc<dyn ContainerRuntime>,
    context: ExecutionContext,
    stdout: LineSink,
    stderr: LineSink,
    container_id: Option<String>,
    state: PhaseState,
}

impl Phase {
    pub(crate) fn new(
        name: String,
        draft: PhaseDraft,
        runtime: Arc<dyn ContainerRuntime>,
        context: ExecutionContext,
        (stdout, stderr): (LineSink, LineSink),
    ) -> Self {
        Self {
            name,
            spec: draft.spec,
            files: draft.files,
            runtime,
            context,
            stdout,
            stderr,
            container_id: None,
            state: PhaseState::Configured,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fully configured container spec
    pub fn spec(&self) -> &ContainerSpec {
        &self.spec
    }

    /// Files that will be injected, in injection order
    pub fn files(&self) -> &[FileSource] {
        &self.files
    }

    pub fn state(&self) -> PhaseState {
        self.state
    }

    /// ID of the container created by `run`, until `cleanup` removes it
    pub fn container_id(&self) -> Option<&str> {
        self.container_id.as_deref()
    }

    fn invalid_state(&self, operation: &'static str) -> PhaseError {
        PhaseError::InvalidState {
            phase: self.name.clone(),
            state: self.state,
            operation,
        }
    }

    /// Create the container, inject files, run the phase and wait for it
    ///
    /// Returns `Ok(())` only if the process exited with code 0. After a
    /// [`PhaseError::Injection`] or [`PhaseError::Execution`] the container is
    /// left in place for inspection; call [`Phase::cleanup`] to remove it.
    #[instrument(skip(self), fields(phase = %self.name))]
    pub async fn run(&mut self) -> Result<()> {
        if self.state != PhaseState::Configured {
            return Err(self.invalid_state("run"));
        }

        if self.context.is_cancelled() {
            self.state = PhaseState::Failed;
            return Err(PhaseError::Execution {
                phase: self.name.clone(),
                source: ExecutionFailure::Cancelled,
            });
        }

        debug!("Creating container for phase {}: {:?}", self.name, self.spec);
        let container_id = match self.runtime.create_container(&self.spec).await {
            Ok(id) => id,
            Err(source) => {
                self.state = PhaseState::Failed;
                return Err(PhaseError::Creation {
                    phase: self.name.clone(),
                    source,
                });
            }
        };
        self.container_id = Some(container_id.clone());

        for (i, file) in self.files.iter().enumerate() {
            debug!(
                "Copying file {} of {} into {}: {}",
                i + 1,
                self.files.len(),
                container_id,
                file.dest_path()
            );
            if let Err(source) = self.runtime.copy_file_into(&container_id, file).await {
                self.state = PhaseState::Failed;
                return Err(PhaseError::Injection {
                    phase: self.name.clone(),
                    dest_path: file.dest_path().to_string(),
                    source,
                });
            }
        }

        self.state = PhaseState::Running;
        let outcome = tokio::select! {
            result = self.runtime.start_and_wait(
                &container_id,
                self.stdout.clone(),
                self.stderr.clone(),
            ) => match result {
                Ok(0) => Ok(()),
                Ok(code) => Err(ExecutionFailure::NonZeroExit { code }),
                Err(e) => Err(ExecutionFailure::Runtime(e)),
            },
            _ = self.context.cancelled() => Err(ExecutionFailure::Cancelled),
        };

        match outcome {
            Ok(()) => {
                info!("Phase {} completed", self.name);
                self.state = PhaseState::Succeeded;
                Ok(())
            }
            Err(source) => {
                self.state = PhaseState::Failed;
                Err(PhaseError::Execution {
                    phase: self.name.clone(),
                    source,
                })
            }
        }
    }

    /// Forcibly remove the phase container
    ///
    /// Safe in any state and idempotent. A container that is already gone counts
    /// as removed. The phase is `Removed` afterwards even if it never ran, so it
    /// can no longer be run. Never consults the execution context, so it still works
    /// after the run was cancelled.
    #[instrument(skip(self), fields(phase = %self.name))]
    pub async fn cleanup(&mut self) -> Result<()> {
        let Some(container_id) = self.container_id.clone() else {
            debug!("No container to remove for phase {}", self.name);
            self.state = PhaseState::Removed;
            return Ok(());
        };

        match self.runtime.remove_container(&container_id).await {
            Ok(()) | Err(RuntimeError::ContainerNotFound { .. }) => {
                debug!("Removed container {} for phase {}", container_id, self.name);
                self.container_id = None;
                self.state = PhaseState::Removed;
                Ok(())
            }
            Err(source) => {
                warn!(
                    "Failed to remove container {} for phase {}: {}",
                    container_id, self.name, source
                );
                Err(PhaseError::Cleanup {
                    phase: self.name.clone(),
                    container_id,
                    source,
                })
            }
        }
    }
}

impl fmt::Debug for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Phase")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("container_id", &self.container_id)
            .field("spec", &self.spec)
            .field("files", &self.files)
            .field("runtime", &self.runtime.runtime_name())
            .finish()
    }
}

impl Drop for Phase {
    fn drop(&mut self) {
        if let Some(ref id) = self.container_id {
            warn!(
                "Phase {} dropped without cleanup; container {} left behind",
                self.name, id
            );
        }
    }
}
