use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use phaser_core::config::Settings;
use phaser_core::context::ExecutionContext;
use phaser_core::lifecycle::Lifecycle;
use phaser_core::options::{self, PhaseOption};
use phaser_core::runtime::{RuntimeFactory, RuntimeKind};
use phaser_core::spec::FileSource;
use phaser_core::workspace::run_phase;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

/// Runtime selection options
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum RuntimeOption {
    /// Docker runtime
    Docker,
    /// Podman runtime
    Podman,
}

impl From<RuntimeOption> for RuntimeKind {
    fn from(runtime: RuntimeOption) -> Self {
        match runtime {
            RuntimeOption::Docker => RuntimeKind::Docker,
            RuntimeOption::Podman => RuntimeKind::Podman,
        }
    }
}

/// Log format options
#[derive(Debug, Clone, ValueEnum)]
pub enum LogFormat {
    /// Human-readable text format
    Text,
    /// JSON structured format
    Json,
}

/// Log level options
#[derive(Debug, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Run container build lifecycle phases
#[derive(Debug, Parser)]
#[command(name = "phaser", version)]
pub struct Cli {
    /// Settings file (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Container runtime, overriding settings and PHASER_RUNTIME
    #[arg(long, global = true, value_enum)]
    pub runtime: Option<RuntimeOption>,

    /// Log format
    #[arg(long, global = true, value_enum)]
    pub log_format: Option<LogFormat>,

    /// Log level
    #[arg(long, global = true, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run one lifecycle phase in its own container, then remove the container
    Run {
        /// Phase name, resolved to /lifecycle/<NAME> inside the builder image
        name: String,

        /// Run as root with the host engine socket mounted
        #[arg(long)]
        daemon_access: bool,

        /// Repository the phase needs registry credentials for (can be repeated)
        #[arg(long = "registry", value_name = "REPO")]
        registries: Vec<String>,

        /// File to copy into the container before start (format: HOST_PATH:CONTAINER_PATH, can be repeated)
        #[arg(long = "file", value_name = "HOST_PATH:CONTAINER_PATH")]
        files: Vec<String>,

        /// Arguments appended to the phase command
        #[arg(last = true)]
        args: Vec<String>,
    },
}

/// Split `HOST_PATH:CONTAINER_PATH` on the last ':' before an absolute container path
pub fn parse_file_mapping(mapping: &str) -> Result<(PathBuf, String)> {
    match mapping.rfind(":/") {
        Some(idx) if idx > 0 => Ok((
            PathBuf::from(&mapping[..idx]),
            mapping[idx + 1..].to_string(),
        )),
        _ => bail!(
            "Invalid file mapping '{}': expected HOST_PATH:CONTAINER_PATH",
            mapping
        ),
    }
}

async fn read_files(mappings: &[String]) -> Result<Vec<FileSource>> {
    let mut files = Vec::with_capacity(mappings.len());
    for mapping in mappings {
        let (host_path, dest_path) = parse_file_mapping(mapping)?;
        let contents = tokio::fs::read(&host_path)
            .await
            .with_context(|| format!("Failed to read {}", host_path.display()))?;
        files.push(FileSource::new(dest_path, contents));
    }
    Ok(files)
}

impl Cli {
    pub async fn dispatch(self) -> Result<()> {
        let log_format = match self.log_format {
            Some(LogFormat::Text) => Some("text"),
            Some(LogFormat::Json) => Some("json"),
            None => None,
        };
        let log_level = match self.log_level {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        };
        if std::env::var_os("PHASER_LOG").is_none() && std::env::var_os("RUST_LOG").is_none() {
            std::env::set_var(
                "RUST_LOG",
                format!("phaser={},phaser_core={}", log_level, log_level),
            );
        }
        phaser_core::logging::init(log_format)?;
        debug!("CLI initialized with log level: {}", log_level);

        let settings = Settings::load(self.config.as_deref())?;
        let kind = self.runtime.map(RuntimeKind::from).unwrap_or(settings.runtime);
        let runtime = RuntimeFactory::create_runtime(kind, settings.runtime_path.clone());

        match self.command {
            Commands::Run {
                name,
                daemon_access,
                registries,
                files,
                args,
            } => {
                let mut phase_options: Vec<PhaseOption> = Vec::new();
                if !args.is_empty() {
                    phase_options.push(options::with_args(args));
                }
                if daemon_access {
                    phase_options.push(options::with_daemon_access());
                }
                if !registries.is_empty() {
                    phase_options.push(options::with_registry_access(registries));
                }
                if !files.is_empty() {
                    phase_options.push(options::with_files(read_files(&files).await?));
                }

                let context = ExecutionContext::new();
                let keychain = phaser_core::auth::Keychain::from_environment()?;
                let lifecycle = Lifecycle::builder(Arc::new(runtime))
                    .settings(&settings)
                    .context(context.clone())
                    .credentials(Arc::new(keychain))
                    .build()?;

                let mut phase = lifecycle.new_phase(&name, phase_options).await?;

                let interrupt = context.clone();
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        warn!("Interrupted; cancelling phase");
                        interrupt.cancel();
                    }
                });

                run_phase(&mut phase, &lifecycle.workspace_lock()).await?;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_file_mapping() {
        let (host, dest) = parse_file_mapping("./env/A:/platform/env/A").unwrap();
        assert_eq!(host, PathBuf::from("./env/A"));
        assert_eq!(dest, "/platform/env/A");

        let (host, dest) = parse_file_mapping("C:/order.toml:/cnb/order.toml").unwrap();
        assert_eq!(host, PathBuf::from("C:/order.toml"));
        assert_eq!(dest, "/cnb/order.toml");

        assert!(parse_file_mapping("no-destination").is_err());
        assert!(parse_file_mapping(":/dest").is_err());
    }

    #[test]
    fn test_run_args_after_separator() {
        let cli = Cli::parse_from([
            "phaser",
            "run",
            "detect",
            "--daemon-access",
            "--registry",
            "ghcr.io/org/app",
            "--",
            "-app",
            "/workspace",
        ]);
        match cli.command {
            Commands::Run {
                name,
                daemon_access,
                registries,
                args,
                ..
            } => {
                assert_eq!(name, "detect");
                assert!(daemon_access);
                assert_eq!(registries, vec!["ghcr.io/org/app"]);
                assert_eq!(args, vec!["-app", "/workspace"]);
            }
        }
    }
}
