//! Registry credential resolution
//!
//! A phase that talks to registries receives a single environment variable
//! holding a JSON object that maps each registry host to the `Authorization`
//! header value for it. [`Keychain`] builds that value from environment
//! variables and the Docker `config.json` credential store.

use crate::errors::AuthError;
use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Registry implied by references without an explicit host
pub const DEFAULT_REGISTRY: &str = "index.docker.io";

/// Key Docker uses for Docker Hub in `config.json`
const DOCKER_HUB_CONFIG_KEY: &str = "https://index.docker.io/v1/";

/// Resolves registry credentials for a set of repository references
#[async_trait]
pub trait CredentialResolver: Send + Sync {
    /// Serialized credentials for every registry the references point at
    async fn resolve_registry_auth(&self, repo_refs: &[String]) -> Result<String, AuthError>;
}

/// Authentication credentials for registry access
#[derive(Debug, Clone, PartialEq)]
pub enum RegistryCredentials {
    /// No authentication
    None,
    /// Basic authentication with username and password
    Basic { username: String, password: String },
    /// Bearer token authentication
    Bearer { token: String },
}

impl RegistryCredentials {
    /// Create an Authorization header value
    pub fn to_auth_header(&self) -> Option<String> {
        match self {
            RegistryCredentials::None => None,
            RegistryCredentials::Basic { username, password } => {
                let credentials = format!("{}:{}", username, password);
                let encoded = base64::engine::general_purpose::STANDARD.encode(credentials);
                Some(format!("Basic {}", encoded))
            }
            RegistryCredentials::Bearer { token } => Some(format!("Bearer {}", token)),
        }
    }
}

/// Registry host a repository reference points at
///
/// Follows Docker's rule: the first path component is a registry only if it
/// contains a `.` or `:` or is `localhost`; otherwise the reference lives on
/// Docker Hub.
pub fn registry_host(reference: &str) -> Result<String, AuthError> {
    let invalid = |reason: &str| AuthError::InvalidReference {
        reference: reference.to_string(),
        reason: reason.to_string(),
    };

    if reference.is_empty() {
        return Err(invalid("reference is empty"));
    }
    if reference.chars().any(char::is_whitespace) {
        return Err(invalid("reference contains whitespace"));
    }

    let (host, repository) = match reference.split_once('/') {
        Some((first, rest))
            if first.contains('.') || first.contains(':') || first == "localhost" =>
        {
            (first.to_string(), rest)
        }
        _ => (DEFAULT_REGISTRY.to_string(), reference),
    };

    // Strip digest, then tag (a ':' after the last '/')
    let repository = repository.split('@').next().unwrap_or_default();
    let repository = match repository.rfind(':') {
        Some(idx) if !repository[idx..].contains('/') => &repository[..idx],
        _ => repository,
    };

    if repository.is_empty() {
        return Err(invalid("repository name is empty"));
    }
    let valid_component = |c: &str| {
        !c.is_empty()
            && c.chars()
                .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || "._-".contains(ch))
    };
    if !repository.split('/').all(valid_component) {
        return Err(invalid(
            "repository must be lowercase alphanumerics separated by '.', '_', '-' or '/'",
        ));
    }

    Ok(host)
}

/// Normalize a `config.json` key (`https://ghcr.io/v1/`) to a bare host
fn normalize_registry_key(key: &str) -> String {
    let without_scheme = key
        .strip_prefix("https://")
        .or_else(|| key.strip_prefix("http://"))
        .unwrap_or(key);
    let host = without_scheme.split('/').next().unwrap_or_default();
    if key == DOCKER_HUB_CONFIG_KEY || host == "docker.io" || host == "registry-1.docker.io" {
        DEFAULT_REGISTRY.to_string()
    } else {
        host.to_string()
    }
}

/// Default credential store location, honoring `DOCKER_CONFIG`
pub fn docker_config_path() -> Option<PathBuf> {
    if let Ok(dir) = env::var("DOCKER_CONFIG") {
        return Some(PathBuf::from(dir).join("config.json"));
    }
    directories_next::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".docker").join("config.json"))
}

/// Credentials keyed by registry host, with an optional default
#[derive(Debug, Clone)]
pub struct Keychain {
    /// Default credentials to use for all registries
    pub default_credentials: RegistryCredentials,
    /// Registry-specific credentials
    pub registry_credentials: HashMap<String, RegistryCredentials>,
}

impl Keychain {
    /// Create an empty keychain (anonymous access everywhere)
    pub fn new() -> Self {
        Self {
            default_credentials: RegistryCredentials::None,
            registry_credentials: HashMap::new(),
        }
    }

    /// Keychain loaded from the Docker credential store, then environment variables
    pub fn from_environment() -> Result<Self, AuthError> {
        let mut keychain = Self::new();
        if let Some(path) = docker_config_path() {
            keychain.load_from_docker_config(&path)?;
        }
        keychain.load_from_env();
        Ok(keychain)
    }

    /// Get credentials for a specific registry
    pub fn get_credentials(&self, registry: &str) -> &RegistryCredentials {
        self.registry_credentials
            .get(registry)
            .unwrap_or(&self.default_credentials)
    }

    /// Set credentials for a specific registry
    pub fn set_credentials(&mut self, registry: impl Into<String>, credentials: RegistryCredentials) {
        self.registry_credentials
            .insert(normalize_registry_key(&registry.into()), credentials);
    }

    /// Set default credentials
    pub fn set_default_credentials(&mut self, credentials: RegistryCredentials) {
        self.default_credentials = credentials;
    }

    /// Load default credentials from environment variables
    ///
    /// Priority:
    /// 1. `PHASER_REGISTRY_TOKEN` - Bearer token authentication
    /// 2. `PHASER_REGISTRY_USER` + `PHASER_REGISTRY_PASS` - Basic authentication
    pub fn load_from_env(&mut self) {
        if let Ok(token) = env::var("PHASER_REGISTRY_TOKEN") {
            debug!("Found PHASER_REGISTRY_TOKEN environment variable");
            self.set_default_credentials(RegistryCredentials::Bearer { token });
            return;
        }

        if let (Ok(username), Ok(password)) = (
            env::var("PHASER_REGISTRY_USER"),
            env::var("PHASER_REGISTRY_PASS"),
        ) {
            debug!("Found PHASER_REGISTRY_USER and PHASER_REGISTRY_PASS environment variables");
            self.set_default_credentials(RegistryCredentials::Basic { username, password });
        }
    }

    /// Load registry credentials from a Docker `config.json`
    ///
    /// A missing file is not an error. Supports both encoded `auth` strings and
    /// separate username/password fields.
    pub fn load_from_docker_config(&mut self, path: &Path) -> Result<(), AuthError> {
        if !path.exists() {
            debug!("Docker config.json not found at: {}", path.display());
            return Ok(());
        }

        let store_error = |message: String| AuthError::CredentialStore {
            path: path.display().to_string(),
            message,
        };
        let content = fs::read_to_string(path).map_err(|e| store_error(e.to_string()))?;
        let docker_config: DockerConfig =
            serde_json::from_str(&content).map_err(|e| store_error(e.to_string()))?;

        for (registry, auth_config) in docker_config.auths.unwrap_or_default() {
            if let Some(auth_string) = auth_config.auth {
                let decoded = base64::engine::general_purpose::STANDARD
                    .decode(auth_string.trim())
                    .ok()
                    .and_then(|bytes| String::from_utf8(bytes).ok());
                match decoded.as_deref().and_then(|s| s.split_once(':')) {
                    Some((username, password)) => {
                        debug!("Loaded Docker config auth for registry: {}", registry);
                        self.set_credentials(
                            registry,
                            RegistryCredentials::Basic {
                                username: username.to_string(),
                                password: password.to_string(),
                            },
                        );
                    }
                    None => {
                        return Err(store_error(format!(
                            "malformed auth entry for registry {}",
                            registry
                        )))
                    }
                }
            } else if let Some(token) = auth_config.identitytoken {
                self.set_credentials(registry, RegistryCredentials::Bearer { token });
            } else if let (Some(username), Some(password)) =
                (auth_config.username, auth_config.password)
            {
                self.set_credentials(registry, RegistryCredentials::Basic { username, password });
            }
        }

        Ok(())
    }

    /// Map of registry host to `Authorization` header for the given references
    ///
    /// Registries without credentials are omitted.
    pub fn auth_headers(&self, repo_refs: &[String]) -> Result<BTreeMap<String, String>, AuthError> {
        let mut headers = BTreeMap::new();
        for reference in repo_refs {
            let host = registry_host(reference)?;
            if let Some(header) = self.get_credentials(&host).to_auth_header() {
                headers.insert(host, header);
            }
        }
        Ok(headers)
    }
}

impl Default for Keychain {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialResolver for Keychain {
    async fn resolve_registry_auth(&self, repo_refs: &[String]) -> Result<String, AuthError> {
        let headers = self.auth_headers(repo_refs)?;
        debug!(registries = ?headers.keys().collect::<Vec<_>>(), "Resolved registry auth");
        Ok(serde_json::to_string(&headers)?)
    }
}

/// Docker config.json authentication entry
#[derive(Debug, Deserialize)]
struct DockerConfigAuth {
    auth: Option<String>,
    username: Option<String>,
    password: Option<String>,
    identitytoken: Option<String>,
}

/// Docker config.json structure (simplified)
#[derive(Debug, Deserialize)]
struct DockerConfig {
    auths: Option<HashMap<String, DockerConfigAuth>>,
}
