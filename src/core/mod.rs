//! Ambient application plumbing: configuration, logging.

/// Store configuration.
pub mod config;
/// Tracing subscriber setup.
pub mod logging;

pub use config::Config;
