use std::path::{Path, PathBuf};

use feedback_port::{PortAddress, default_runtime_dir};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub port: PortConfig,
    pub haptics: HapticsConfig,
}

#[derive(Debug, Deserialize)]
pub struct PortConfig {
    /// Directory holding the port sockets of every application
    pub runtime_dir: PathBuf,
    /// Application id of the watch face
    pub app_id: String,
    /// Port the watch face listens on
    pub local_port: String,
    pub trusted: bool,
}

impl PortConfig {
    pub fn local_address(&self) -> PortAddress {
        PortAddress::new(self.app_id.as_str(), self.local_port.as_str(), self.trusted)
    }
}

#[derive(Debug, Deserialize)]
pub struct HapticsConfig {
    pub enabled: bool,
    /// Platform pattern played for every feedback
    pub pattern: String,
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
                app_id: "de.ugoe.SensorFeedbackWF".to_string(),
                local_port: "27072".to_string(),
                trusted: true,
            },
            haptics: HapticsConfig {
                enabled: true,
                pattern: "SoftInputPanel".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_config() {
        let raw = r#"
            [port]
            runtime_dir = "/run/user/1000/sensor-feedback"
            app_id = "face"
            local_port = "27072"
            trusted = true

            [haptics]
            enabled = false
            pattern = "WakeUp"
        "#;

        let config: Config = toml::from_str(raw).unwrap();

        assert_eq!(
            config.port.local_address(),
            PortAddress::new("face", "27072", true)
        );
        assert!(!config.haptics.enabled);
        assert_eq!(config.haptics.pattern, "WakeUp");
    }

    #[test]
    fn missing_section_is_an_error() {
        assert!(toml::from_str::<Config>("[haptics]\nenabled = true\npattern = \"x\"").is_err());
    }

    #[test]
    fn bundled_config_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("feedback-face.toml");
        let config = Config::load(&path).unwrap();
        assert!(config.port.trusted);
    }
}
