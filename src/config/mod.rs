pub mod server;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use server::{ConfigError, ConfigKey, ConfigStore, ServerConfig};

/// Watchdog 자체 설정 (watchdog.toml). 모든 필드는 기본값이 있으므로 파일이 없어도 동작한다.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct WatchdogSettings {
    /// Path of the JSON server configuration file.
    pub config_path: PathBuf,
    /// Executable names that count as "server is running".
    pub process_names: Vec<String>,
    /// Executable launched from `serverPath`.
    pub server_executable: String,
    /// Shell that receives the launch command on stdin.
    pub shell: String,
    /// Key files that survive key-directory cleaning.
    pub preserved_keys: Vec<String>,
    pub timings: Timings,
}

impl Default for WatchdogSettings {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from("config.json"),
            process_names: vec!["arma3server_x64".to_string(), "arma3server".to_string()],
            server_executable: "arma3server_x64.exe".to_string(),
            shell: "cmd.exe".to_string(),
            preserved_keys: vec!["a3.bikey".to_string()],
            timings: Timings::default(),
        }
    }
}

/// Supervision interval constants, in milliseconds.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct Timings {
    pub poll_interval_ms: u64,
    pub grace_delay_ms: u64,
    pub completion_poll_ms: u64,
    pub settle_delay_ms: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5000,
            grace_delay_ms: 15000,
            completion_poll_ms: 100,
            settle_delay_ms: 5000,
        }
    }
}

impl Timings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn grace_delay(&self) -> Duration {
        Duration::from_millis(self.grace_delay_ms)
    }

    pub fn completion_poll(&self) -> Duration {
        // 0이면 busy loop가 되므로 최소 1ms
        Duration::from_millis(self.completion_poll_ms.max(1))
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

impl WatchdogSettings {
    /// Load settings from a TOML file. A missing file yields the defaults; an
    /// unreadable one is reported and also falls back to the defaults.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            tracing::info!("No settings file at {}, using defaults", path.display());
            return Self::default();
        }

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("Failed to read {}: {}, using defaults", path.display(), e);
                return Self::default();
            }
        };

        match toml::from_str(&content) {
            Ok(settings) => {
                tracing::info!("Loaded watchdog settings from {}", path.display());
                settings
            }
            Err(e) => {
                tracing::warn!("Invalid settings file {}: {}, using defaults", path.display(), e);
                Self::default()
            }
        }
    }
}
