//! Phase options
//!
//! Each [`PhaseOption`] is a mutation of the draft container spec, applied in the
//! order the caller lists them. Options touching the same field are order
//! sensitive: the later one wins (e.g. network mode).

use crate::errors::ConstructionFailure;
use crate::lifecycle::Lifecycle;
use crate::phase::PhaseDraft;
use crate::spec::{
    FileSource, MountSpec, DAEMON_SOCKET, HOST_NETWORK, REGISTRY_AUTH_ENV, ROOT_USER,
};
use tracing::debug;

/// A configuration step applied to a draft phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhaseOption {
    /// Append tokens to the command
    Args(Vec<String>),
    /// Run as root with the host engine's control socket mounted
    DaemonAccess,
    /// Provide credentials for these repositories and use host networking
    RegistryAccess(Vec<String>),
    /// Copy files into the container before it starts
    Files(Vec<FileSource>),
}

/// Append `args` to the phase command, preserving order
pub fn with_args<I, S>(args: I) -> PhaseOption
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    PhaseOption::Args(args.into_iter().map(Into::into).collect())
}

/// Grant the phase control of the host container engine
pub fn with_daemon_access() -> PhaseOption {
    PhaseOption::DaemonAccess
}

/// Grant the phase authenticated access to the registries of `repos`
pub fn with_registry_access<I, S>(repos: I) -> PhaseOption
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    PhaseOption::RegistryAccess(repos.into_iter().map(Into::into).collect())
}

/// Queue files for injection, in order, before the phase starts
pub fn with_files<I>(files: I) -> PhaseOption
where
    I: IntoIterator<Item = FileSource>,
{
    PhaseOption::Files(files.into_iter().collect())
}

fn validate_file(file: &FileSource) -> Result<(), ConstructionFailure> {
    let path = file.dest_path();
    let invalid = |reason: &str| ConstructionFailure::InvalidFile {
        path: path.to_string(),
        reason: reason.to_string(),
    };

    if !path.starts_with('/') {
        return Err(invalid("destination must be an absolute path"));
    }
    if path.ends_with('/') {
        return Err(invalid("destination must name a file"));
    }
    if path.split('/').any(|component| component == "..") {
        return Err(invalid("destination must not contain '..'"));
    }
    Ok(())
}

impl PhaseOption {
    /// Apply this option to `draft`
    pub(crate) async fn apply(
        self,
        draft: &mut PhaseDraft,
        lifecycle: &Lifecycle,
    ) -> Result<(), ConstructionFailure> {
        match self {
            PhaseOption::Args(args) => {
                draft.spec.command.extend(args);
            }
            PhaseOption::DaemonAccess => {
                draft.spec.user = Some(ROOT_USER.to_string());
                draft
                    .spec
                    .mounts
                    .push(MountSpec::bind(lifecycle.daemon_socket(), DAEMON_SOCKET));
            }
            PhaseOption::RegistryAccess(repos) => {
                let auth = lifecycle
                    .credentials()
                    .resolve_registry_auth(&repos)
                    .await?;
                debug!(repos = ?repos, "Granting registry access");
                draft.spec.env.insert(REGISTRY_AUTH_ENV.to_string(), auth);
                draft.spec.network_mode = Some(HOST_NETWORK.to_string());
            }
            PhaseOption::Files(files) => {
                for file in &files {
                    validate_file(file)?;
                }
                draft.files.extend(files);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_args_preserves_order() {
        assert_eq!(
            with_args(["-app", "/workspace", "-group"]),
            PhaseOption::Args(vec![
                "-app".to_string(),
                "/workspace".to_string(),
                "-group".to_string()
            ])
        );
    }

    #[test]
    fn test_with_registry_access_collects_refs() {
        let option = with_registry_access(vec![String::from("ghcr.io/a/b")]);
        assert_eq!(
            option,
            PhaseOption::RegistryAccess(vec!["ghcr.io/a/b".to_string()])
        );
    }

    #[test]
    fn test_validate_file() {
        assert!(validate_file(&FileSource::new("/platform/env/A", "1")).is_ok());
        assert!(validate_file(&FileSource::new("relative/path", "1")).is_err());
        assert!(validate_file(&FileSource::new("/platform/", "1")).is_err());
        assert!(matches!(
            validate_file(&FileSource::new("/workspace/../etc/passwd", "1")),
            Err(ConstructionFailure::InvalidFile { .. })
        ));
    }
}
