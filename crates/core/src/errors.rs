//! Error types and handling
//!
//! Each collaborator (container runtime, credential store, settings) has its own
//! domain error enum. [`PhaseError`] wraps them into the five categories a caller
//! of [`crate::phase::Phase`] has to tell apart, always tagged with the phase name.

use crate::phase::PhaseState;
use thiserror::Error;

/// Container runtime errors
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Runtime binary is not installed or not accessible
    #[error("Container runtime is not installed or not accessible")]
    NotInstalled,

    /// Runtime CLI command error
    #[error("Container runtime CLI error: {0}")]
    CLIError(String),

    /// Container does not exist (never created or already removed)
    #[error("Container not found: {id}")]
    ContainerNotFound { id: String },

    /// I/O failure while talking to the runtime process
    #[error("Container runtime I/O error")]
    Io(#[from] std::io::Error),
}

/// Registry credential resolution errors
#[derive(Error, Debug)]
pub enum AuthError {
    /// Repository reference cannot be parsed
    #[error("Invalid repository reference '{reference}': {reason}")]
    InvalidReference { reference: String, reason: String },

    /// Credential store exists but cannot be read
    #[error("Failed to read credential store {path}: {message}")]
    CredentialStore { path: String, message: String },

    /// Resolved credentials cannot be serialized
    #[error("Failed to encode registry credentials")]
    Encoding(#[from] serde_json::Error),
}

/// Settings errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Settings file parsing error
    #[error("Failed to parse settings file: {message}")]
    Parsing { message: String },

    /// Settings validation error
    #[error("Settings validation error: {message}")]
    Validation { message: String },

    /// Settings file I/O error
    #[error("Failed to read settings file")]
    Io(#[from] std::io::Error),
}

/// Why a phase could not be configured
#[derive(Error, Debug)]
pub enum ConstructionFailure {
    /// Phase name cannot be used as a lifecycle binary name
    #[error("invalid phase name '{name}'")]
    InvalidName { name: String },

    /// Registry credentials could not be resolved
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// A queued file has an unusable destination
    #[error("invalid file destination '{path}': {reason}")]
    InvalidFile { path: String, reason: String },
}

/// Why a started phase did not succeed
#[derive(Error, Debug)]
pub enum ExecutionFailure {
    /// The phase process ran and exited with a non-zero code
    #[error("process exited with code {code}")]
    NonZeroExit { code: i64 },

    /// The execution context was cancelled while waiting
    #[error("execution cancelled")]
    Cancelled,

    /// The runtime failed to start or attach to the container
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

/// Phase errors, one variant per point of failure
#[derive(Error, Debug)]
pub enum PhaseError {
    /// An option failed while building the phase; nothing was allocated
    #[error("failed to configure '{phase}' phase: {source}")]
    Construction {
        phase: String,
        #[source]
        source: ConstructionFailure,
    },

    /// Container creation failed; no container exists
    #[error("failed to create '{phase}' container: {source}")]
    Creation {
        phase: String,
        #[source]
        source: RuntimeError,
    },

    /// Copying a queued file failed; the container exists
    #[error("failed to copy {dest_path} to '{phase}' container: {source}")]
    Injection {
        phase: String,
        dest_path: String,
        #[source]
        source: RuntimeError,
    },

    /// The phase process failed; the container exists
    #[error("failed to run '{phase}' phase: {source}")]
    Execution {
        phase: String,
        #[source]
        source: ExecutionFailure,
    },

    /// Container removal failed for a reason other than "already gone"
    #[error("failed to remove '{phase}' container {container_id}: {source}")]
    Cleanup {
        phase: String,
        container_id: String,
        #[source]
        source: RuntimeError,
    },

    /// Operation is not allowed in the phase's current state
    #[error("cannot {operation} '{phase}' phase in state {state}")]
    InvalidState {
        phase: String,
        state: PhaseState,
        operation: &'static str,
    },
}

impl PhaseError {
    /// Name of the phase the error belongs to
    pub fn phase_name(&self) -> &str {
        match self {
            Self::Construction { phase, .. }
            | Self::Creation { phase, .. }
            | Self::Injection { phase, .. }
            | Self::Execution { phase, .. }
            | Self::Cleanup { phase, .. }
            | Self::InvalidState { phase, .. } => phase,
        }
    }

    /// Whether a container may have been left behind and `cleanup` must still be called
    pub fn requires_cleanup(&self) -> bool {
        matches!(self, Self::Injection { .. } | Self::Execution { .. })
    }

    /// Exit code of the phase process, when it ran to completion
    pub fn exit_code(&self) -> Option<i64> {
        match self {
            Self::Execution {
                source: ExecutionFailure::NonZeroExit { code },
                ..
            } => Some(*code),
            _ => None,
        }
    }
}

/// Convenience type alias for Results with PhaseError
pub type Result<T> = std::result::Result<T, PhaseError>;

/// Results returned by container runtime collaborators
pub type RuntimeResult<T> = std::result::Result<T, RuntimeError>;
