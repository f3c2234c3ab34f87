use crate::config::AppConfig;
use clap::Parser;
use std::path::PathBuf;

/// Display home network sensors: a DHT-class temperature/humidity sensor
/// attached via GPIO and a uRadMonitor radiation monitor.
#[derive(Debug, Parser)]
#[command(name = "homesens", version)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// List sensors detected and exit
    #[arg(short = 'l', long = "list-sensors", visible_alias = "list")]
    pub list_sensors: bool,

    /// Use sensor number "n" (default: 0)
    #[arg(short = 's', long = "sensor", value_name = "N")]
    pub sensor: Option<u32>,

    /// Use leafoid for temperature reading (default: temperature)
    #[arg(short = 'T', value_name = "LEAFOID")]
    pub temperature_leafoid: Option<String>,

    /// Use leafoid for humidity reading (default: humidity)
    #[arg(short = 'H', value_name = "LEAFOID")]
    pub humidity_leafoid: Option<String>,

    /// Do not query and display uRadMonitor data
    #[arg(short = 'U', long = "no-uradmon")]
    pub no_uradmon: bool,

    /// uRadMon Device ID
    #[arg(long = "uradmon-id", value_name = "ID")]
    pub uradmon_id: Option<String>,

    /// uRadMon User ID
    #[arg(long = "uradmon-userid", value_name = "USERID")]
    pub uradmon_userid: Option<String>,

    /// uRadMon User Auth Key
    #[arg(long = "uradmon-userkey", value_name = "USERKEY")]
    pub uradmon_userkey: Option<String>,

    /// uRadMon API URL
    #[arg(long = "uradmon-api", value_name = "URL")]
    pub uradmon_api: Option<String>,
}

impl Cli {
    /// Overlay command-line arguments on top of the loaded configuration.
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(sensor) = self.sensor {
            config.sensor.index = sensor;
        }
        if let Some(leafoid) = &self.temperature_leafoid {
            config.sensor.temperature_leafoid = leafoid.clone();
        }
        if let Some(leafoid) = &self.humidity_leafoid {
            config.sensor.humidity_leafoid = leafoid.clone();
        }
        if self.no_uradmon {
            config.uradmon.enabled = false;
        }
        if let Some(id) = &self.uradmon_id {
            config.uradmon.device_id = Some(id.clone());
        }
        if let Some(user_id) = &self.uradmon_userid {
            config.uradmon.user_id = Some(user_id.clone());
        }
        if let Some(user_key) = &self.uradmon_userkey {
            config.uradmon.user_key = Some(user_key.clone());
        }
        if let Some(api) = &self.uradmon_api {
            config.uradmon.api = api.clone();
        }
    }
}
