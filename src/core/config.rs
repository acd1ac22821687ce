//! Store configuration (spec AMBIENT STACK §A.2).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration for `open`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// If set, collections are persisted under this directory using the
    /// flat `<collection>.kv` layout from spec §6. If unset, the store is
    /// purely in-memory.
    pub data_dir: Option<PathBuf>,

    /// Initial chunk size for per-request bump arenas.
    pub arena_default_capacity: usize,

    /// Default durability policy for writes/commits that don't pass an
    /// explicit `FLUSH` option.
    pub flush_on_commit: bool,

    /// Fallback scan limit used only by convenience builders when a caller
    /// constructs a scan task without specifying one; never applied to a
    /// task that explicitly set `limit = 0`.
    pub scan_default_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            arena_default_capacity: 64 * 1024,
            flush_on_commit: false,
            scan_default_limit: 1024,
        }
    }
}

impl Config {
    /// Parse configuration from a TOML string.
    pub fn from_str(s: &str) -> crate::types::Result<Self> {
        toml::from_str(s).map_err(|e| crate::types::StoreError::ArgsWrong(format!("invalid config: {e}")))
    }

    /// Load configuration from a TOML file, falling back to defaults with a
    /// warning if the file can't be read or parsed.
    pub fn from_file_or_default(path: &std::path::Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(raw) => match Self::from_str(&raw) {
                Ok(cfg) => {
                    tracing::info!(path = %path.display(), "loaded configuration");
                    cfg
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to parse config, using defaults");
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to read config, using defaults");
                Self::default()
            }
        }
    }
}
