//! Logging setup
//!
//! Structured logging through `tracing-subscriber`, either human-readable text
//! or JSON. All log output goes to stderr so stdout stays free for phase output.
//!
//! ## Environment Variables
//!
//! * `PHASER_LOG_FORMAT` - `json` for JSON output, anything else for text
//! * `PHASER_LOG` - filter directives, falling back to `RUST_LOG`, then `info`
//! * `PHASER_LOG_SPAN_EVENTS` - comma separated span events (`new`, `close`, `full`, ...)
//!
//! Registry credentials never reach the logs: container specs redact the
//! `CNB_REGISTRY_AUTH` value in their `Debug` output.

use anyhow::Result;
use once_cell::sync::OnceCell;
use std::io;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static INIT: OnceCell<()> = OnceCell::new();

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    /// `json` selects JSON; any other name falls back to text
    pub fn from_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Text
        }
    }

    /// Span events emitted when `PHASER_LOG_SPAN_EVENTS` is unset
    fn default_span_events(self) -> FmtSpan {
        match self {
            Self::Text => FmtSpan::NONE,
            Self::Json => FmtSpan::NEW | FmtSpan::CLOSE,
        }
    }
}

/// Initialize logging with an optional format (`"text"` or `"json"`)
///
/// Only the first successful call installs a subscriber; later calls are no-ops.
/// Fails if another global subscriber was installed first.
///
/// ```rust
/// phaser_core::logging::init(Some("json")).expect("logging");
/// ```
pub fn init(format: Option<&str>) -> Result<()> {
    INIT.get_or_try_init(|| install(format)).map(|_| ())
}

fn install(format: Option<&str>) -> Result<()> {
    let env_format = std::env::var("PHASER_LOG_FORMAT").ok();
    let format = LogFormat::from_name(format.or(env_format.as_deref()).unwrap_or("text"));
    let span_events = std::env::var("PHASER_LOG_SPAN_EVENTS")
        .map(|raw| parse_span_events(&raw))
        .unwrap_or_else(|_| format.default_span_events());

    let layer = fmt::layer()
        .with_target(true)
        .with_span_events(span_events)
        .with_writer(io::stderr);
    let layer = match format {
        LogFormat::Json => layer.json().boxed(),
        LogFormat::Text => layer.boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .with(env_filter())
        .try_init()?;

    tracing::debug!("Logging initialized with format: {:?}", format);
    Ok(())
}

/// `PHASER_LOG`, then `RUST_LOG`, then `info`
fn env_filter() -> EnvFilter {
    match std::env::var("PHASER_LOG") {
        Ok(spec) => EnvFilter::try_new(&spec).unwrap_or_else(|_| {
            eprintln!("Invalid PHASER_LOG directives '{}', using 'info'", spec);
            EnvFilter::new("info")
        }),
        Err(_) => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    }
}

/// Parse a comma or pipe separated list of span event names; unknown names are ignored
fn parse_span_events(raw: &str) -> FmtSpan {
    raw.split([',', '|'])
        .map(|token| match token.trim().to_ascii_lowercase().as_str() {
            "new" => FmtSpan::NEW,
            "close" => FmtSpan::CLOSE,
            "enter" => FmtSpan::ENTER,
            "exit" => FmtSpan::EXIT,
            "active" => FmtSpan::ACTIVE,
            "full" => FmtSpan::FULL,
            _ => FmtSpan::NONE,
        })
        .fold(FmtSpan::NONE, |acc, event| acc | event)
}

pub fn is_initialized() -> bool {
    INIT.get().is_some()
}
