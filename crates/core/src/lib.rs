//! Core library for phaser
//!
//! Runs the phases of a container build lifecycle (detect, restore, analyze,
//! build, export, ...) each in its own short-lived container created from a
//! builder image. A [`lifecycle::Lifecycle`] describes the shared environment,
//! produces [`phase::Phase`] handles configured through [`options::PhaseOption`]s,
//! and each phase is run once and then cleaned up.

pub mod auth;
pub mod config;
pub mod context;
pub mod docker;
pub mod errors;
pub mod lifecycle;
pub mod logging;
pub mod options;
pub mod output;
pub mod phase;
pub mod runtime;
pub mod spec;
pub mod workspace;

pub use indexmap::IndexMap;

/// Get the version of the core library
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
