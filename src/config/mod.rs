use anyhow::{bail, Context, Result};
use config::{Config, File};
use log::{debug, warn, LevelFilter};
use regex::Regex;
use serde::Deserialize;
use std::path::Path;

pub const DEFAULT_API_URL: &str = "https://data.uradmonitor.com/api/v1/devices";

fn default_temperature_leafoid() -> String {
    "temperature".to_string()
}

fn default_humidity_leafoid() -> String {
    "humidity".to_string()
}

fn default_sensor_poll_interval() -> u64 {
    5
}

fn default_uradmon_poll_interval() -> u64 {
    25
}

fn default_uradmon_timeout() -> u64 {
    5
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_enabled() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct SensorConfig {
    /// Index of the sensor to poll, as discovered under `dev.gpioths`.
    #[serde(default)]
    pub index: u32,
    #[serde(default = "default_temperature_leafoid")]
    pub temperature_leafoid: String,
    #[serde(default = "default_humidity_leafoid")]
    pub humidity_leafoid: String,
    /// Seconds between local sensor polls.
    #[serde(default = "default_sensor_poll_interval")]
    pub poll_interval: u64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            index: 0,
            temperature_leafoid: default_temperature_leafoid(),
            humidity_leafoid: default_humidity_leafoid(),
            poll_interval: default_sensor_poll_interval(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct UradmonConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub device_id: Option<String>,
    pub user_id: Option<String>,
    pub user_key: Option<String>,
    #[serde(default = "default_api_url")]
    pub api: String,
    /// Seconds between remote polls. The remote fetch is rate limited and
    /// slow, so it runs less often than the local sensor.
    #[serde(default = "default_uradmon_poll_interval")]
    pub poll_interval: u64,
    /// Request timeout in seconds.
    #[serde(default = "default_uradmon_timeout")]
    pub timeout: u64,
}

impl Default for UradmonConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            device_id: None,
            user_id: None,
            user_key: None,
            api: default_api_url(),
            poll_interval: default_uradmon_poll_interval(),
            timeout: default_uradmon_timeout(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(rename = "SENSOR", default)]
    pub sensor: SensorConfig,
    #[serde(rename = "URADMON", default)]
    pub uradmon: UradmonConfig,
    #[serde(rename = "LOGGING", default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn new() -> Result<Self> {
        Self::from_file("config.ini")
    }

    pub fn get_log_level(&self) -> LevelFilter {
        match self.logging.level.to_lowercase().as_str() {
            "trace" => LevelFilter::Trace,
            "debug" => LevelFilter::Debug,
            "info" => LevelFilter::Info,
            "warn" => LevelFilter::Warn,
            "error" => LevelFilter::Error,
            "off" => LevelFilter::Off,
            _ => LevelFilter::Info, // Default to Info if invalid
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config_path = path.as_ref();
        debug!("Loading configuration from {}", config_path.display());

        let config = Config::builder()
            .add_source(
                File::with_name(config_path.to_str().unwrap_or(""))
                    .format(config::FileFormat::Ini),
            )
            .build()
            .context(format!(
                "Failed to load config from {}",
                config_path.display()
            ))?;

        let app_config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize config")?;

        Ok(app_config)
    }

    /// Validate the merged configuration and downgrade an incomplete
    /// uRadMonitor section to "disabled" rather than failing. Format
    /// violations are fatal.
    pub fn check(&mut self) -> Result<()> {
        if self.sensor.poll_interval == 0 {
            bail!("Sensor poll interval must be at least 1 second");
        }
        if self.uradmon.poll_interval == 0 {
            bail!("uRadMonitor poll interval must be at least 1 second");
        }

        if self.uradmon.enabled
            && (self.uradmon.device_id.is_none()
                || self.uradmon.user_id.is_none()
                || self.uradmon.user_key.is_none())
        {
            warn!("uRadMonitor parameters are not specified, disabling uRadMonitor.");
            self.uradmon.enabled = false;
        }

        if self.uradmon.enabled {
            let credential = Regex::new(r"^[0-9a-zA-Z_-]+$").expect("credential pattern is valid");
            for (name, value) in [
                ("uRadMon Device ID", &self.uradmon.device_id),
                ("uRadMon User ID", &self.uradmon.user_id),
                ("uRadMon User Key", &self.uradmon.user_key),
            ] {
                if let Some(value) = value {
                    if !credential.is_match(value) {
                        bail!("Invalid {name} specified.");
                    }
                }
            }

            let url = reqwest::Url::parse(&self.uradmon.api)
                .map_err(|e| anyhow::anyhow!("Invalid uRadMon API endpoint specified: {e}"))?;
            if url.host_str().is_none() {
                bail!("Invalid uRadMon API endpoint specified: no host");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.sensor.index, 0);
        assert_eq!(config.sensor.temperature_leafoid, "temperature");
        assert_eq!(config.sensor.humidity_leafoid, "humidity");
        assert_eq!(config.sensor.poll_interval, 5);
        assert!(config.uradmon.enabled);
        assert_eq!(config.uradmon.api, DEFAULT_API_URL);
        assert_eq!(config.uradmon.poll_interval, 25);
        assert_eq!(config.uradmon.timeout, 5);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        let config_content = "[SENSOR]\nindex = 1\ntemperature_leafoid = \"temp\"\npoll_interval = 10\n\n\
                              [URADMON]\ndevice_id = \"82000123\"\nuser_id = \"user1\"\nuser_key = \"abc123\"\npoll_interval = 60\n\n\
                              [LOGGING]\nlevel = \"debug\"\n";

        temp_file.write_all(config_content.as_bytes()).unwrap();
        let config = AppConfig::from_file(temp_file.path()).unwrap();

        assert_eq!(config.sensor.index, 1);
        assert_eq!(config.sensor.temperature_leafoid, "temp");
        assert_eq!(config.sensor.humidity_leafoid, "humidity");
        assert_eq!(config.sensor.poll_interval, 10);
        assert_eq!(config.uradmon.device_id.as_deref(), Some("82000123"));
        assert_eq!(config.uradmon.poll_interval, 60);
        assert_eq!(config.get_log_level(), LevelFilter::Debug);
    }

    #[test]
    fn test_check_downgrades_incomplete_uradmon() {
        let mut config = AppConfig::default();
        config.uradmon.user_id = Some("user1".to_string());

        config.check().unwrap();
        assert!(!config.uradmon.enabled);
    }

    #[test]
    fn test_check_rejects_bad_credential() {
        let mut config = AppConfig::default();
        config.uradmon.device_id = Some("82000123".to_string());
        config.uradmon.user_id = Some("user 1".to_string());
        config.uradmon.user_key = Some("abc123".to_string());

        assert!(config.check().is_err());
    }

    #[test]
    fn test_check_rejects_bad_api_url() {
        let mut config = AppConfig::default();
        config.uradmon.device_id = Some("82000123".to_string());
        config.uradmon.user_id = Some("user1".to_string());
        config.uradmon.user_key = Some("abc123".to_string());
        config.uradmon.api = "data.uradmonitor.com/api/v1/devices".to_string();

        assert!(config.check().is_err());
    }

    #[test]
    fn test_check_accepts_complete_uradmon() {
        let mut config = AppConfig::default();
        config.uradmon.device_id = Some("82000123".to_string());
        config.uradmon.user_id = Some("user-1".to_string());
        config.uradmon.user_key = Some("abc_123".to_string());

        config.check().unwrap();
        assert!(config.uradmon.enabled);
    }

    #[test]
    fn test_check_rejects_zero_interval() {
        let mut config = AppConfig::default();
        config.sensor.poll_interval = 0;
        assert!(config.check().is_err());
    }
}
