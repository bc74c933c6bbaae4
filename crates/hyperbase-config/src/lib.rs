//! Configuration management for Hyperbase.
//!
//! Provides hierarchical configuration loading from multiple sources, for
//! the three binaries the workspace ships: the coordinator host, the
//! daemon host, and a client library's connection defaults.
//!
//! 1. CLI arguments (highest precedence, applied by the binary itself)
//! 2. Environment variables (`HYPERBASE_*` prefix)
//! 3. `hyperbase.local.toml` (gitignored, local overrides)
//! 4. `hyperbase.toml` (git-tracked, project config)
//! 5. `~/.config/hyperbase/config.toml` (user defaults)
//! 6. Built-in defaults (lowest precedence)

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

mod error;
mod loader;
mod paths;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use paths::Paths;

/// Top-level configuration shared across coordinator, daemon and client
/// binaries. A single process only ever reads the sections it needs, but
/// they are loaded together so one `hyperbase.toml` can describe a whole
/// deployment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HyperbaseConfig {
    pub project: ProjectConfig,
    pub coordinator: CoordinatorConfig,
    pub daemon: DaemonConfig,
    pub client: ClientConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub name: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self { name: "hyperbase-cluster".to_string() }
    }
}

/// Settings for the process that hosts the coordinator state machine
/// inside the replicated-log service (§4.1). The log service itself is
/// out of scope; this only configures the coordinator's own knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    pub bind_address: String,
    /// Seconds between `alarm()` commands (§4.1 `checkpoint()`).
    pub alarm_interval_secs: u64,
    /// Spare pool quota `State::spare_quota` is seeded from.
    pub spare_quota: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self { bind_address: "127.0.0.1:1982".to_string(), alarm_interval_secs: 10, spare_quota: 2 }
    }
}

/// Settings for a storage daemon process: where it listens for client
/// traffic, and the backoff schedule its coordinator link uses (§4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub bind_address: String,
    pub data_dir: PathBuf,
    pub coordinator_address: String,
    /// `(initial, max)` backoff bounds for the coordinator link's
    /// exponential retry (§4.4: "0 -> 100ms -> 200ms -> ... -> 20s").
    pub link_backoff_initial_ms: u64,
    pub link_backoff_max_ms: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:2012".to_string(),
            data_dir: PathBuf::from(".hyperbase/data"),
            coordinator_address: "127.0.0.1:1982".to_string(),
            link_backoff_initial_ms: 100,
            link_backoff_max_ms: 20_000,
        }
    }
}

impl DaemonConfig {
    #[must_use]
    pub fn link_backoff_initial(&self) -> Duration {
        Duration::from_millis(self.link_backoff_initial_ms)
    }

    #[must_use]
    pub fn link_backoff_max(&self) -> Duration {
        Duration::from_millis(self.link_backoff_max_ms)
    }
}

/// Default client connection parameters (§5 Concurrency & Resource Model:
/// per-call timeout, retry backoff bounds). Individual calls may still
/// override the timeout through `Client::loop_once`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub coordinator_address: String,
    pub connect_timeout_ms: u64,
    pub default_loop_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            coordinator_address: "127.0.0.1:1982".to_string(),
            connect_timeout_ms: 5_000,
            default_loop_timeout_ms: 1_000,
        }
    }
}

impl ClientConfig {
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    #[must_use]
    pub fn default_loop_timeout(&self) -> Duration {
        Duration::from_millis(self.default_loop_timeout_ms)
    }
}

impl HyperbaseConfig {
    /// Load configuration from default locations.
    pub fn load() -> Result<Self> {
        ConfigLoader::new().load()
    }

    /// Load configuration from a specific project directory.
    pub fn load_from_dir(project_dir: impl AsRef<Path>) -> Result<Self> {
        ConfigLoader::new().with_project_dir(project_dir).load()
    }

    /// Resolves the daemon's relative data directory to an absolute path.
    pub fn resolve_paths(&mut self, base_dir: impl AsRef<Path>) {
        let base = base_dir.as_ref();
        if self.daemon.data_dir.is_relative() {
            self.daemon.data_dir = base.join(&self.daemon.data_dir);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HyperbaseConfig::default();
        assert_eq!(config.coordinator.bind_address, "127.0.0.1:1982");
        assert_eq!(config.daemon.link_backoff_max_ms, 20_000);
        assert_eq!(config.client.connect_timeout_ms, 5_000);
    }

    #[test]
    fn test_path_resolution() {
        let mut config = HyperbaseConfig::default();
        config.resolve_paths("/home/user/project");
        assert_eq!(config.daemon.data_dir, PathBuf::from("/home/user/project/.hyperbase/data"));
    }

    #[test]
    fn backoff_durations_match_millis() {
        let daemon = DaemonConfig::default();
        assert_eq!(daemon.link_backoff_initial(), Duration::from_millis(100));
        assert_eq!(daemon.link_backoff_max(), Duration::from_millis(20_000));
    }
}
