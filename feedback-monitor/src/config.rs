use std::path::{Path, PathBuf};

use feedback_port::{PortAddress, default_runtime_dir};
use serde::Deserialize;

use crate::permission::PermissionStatus;
use crate::scheduler::SchedulerConfig;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub port: PortConfig,
    pub scheduler: SchedulerConfig,
    pub settings: SettingsConfig,
    pub permissions: PermissionsConfig,
    pub sensors: SensorsConfig,
}

#[derive(Debug, Deserialize)]
pub struct PortConfig {
    /// Directory holding the port sockets of every application
    pub runtime_dir: PathBuf,
    /// Application id of this process
    pub app_id: String,
    /// Port this process listens on
    pub local_port: String,
    /// Application id of the watch face
    pub remote_app_id: String,
    /// Port the watch face listens on
    pub remote_port: String,
    pub trusted: bool,
}

impl PortConfig {
    pub fn local_address(&self) -> PortAddress {
        PortAddress::new(self.app_id.as_str(), self.local_port.as_str(), self.trusted)
    }

    pub fn remote_address(&self) -> PortAddress {
        PortAddress::new(
            self.remote_app_id.as_str(),
            self.remote_port.as_str(),
            self.trusted,
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SettingsConfig {
    Memory,
    Sqlite { path: PathBuf },
}

#[derive(Debug, Deserialize)]
pub struct PermissionsConfig {
    pub health: PermissionStatus,
    pub location: PermissionStatus,
}

#[derive(Debug, Deserialize)]
pub struct SensorsConfig {
    /// Interval in milliseconds between simulated readings
    pub sampling_interval_ms: u64,
    /// Kinds to treat as missing on this device
    #[serde(default)]
    pub unsupported: Vec<feedback_core::SensorKind>,
}

impl Config {
    pub fn load(path: &Path) -> color_eyre::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: PortConfig {
                runtime_dir: default_runtime_dir(),
                app_id: "de.ugoe.SensorFeedback".to_string(),
                local_port: "27071".to_string(),
                remote_app_id: "de.ugoe.SensorFeedbackWF".to_string(),
                remote_port: "27072".to_string(),
                trusted: true,
            },
            scheduler: SchedulerConfig::default(),
            settings: SettingsConfig::Memory,
            permissions: PermissionsConfig {
                health: PermissionStatus::Allow,
                location: PermissionStatus::Allow,
            },
            sensors: SensorsConfig {
                sampling_interval_ms: 1000,
                unsupported: Vec::new(),
            },
        }
    }
}
