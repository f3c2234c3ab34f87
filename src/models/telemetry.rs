use serde::{Deserialize, Deserializer};

/// One device entry from the uRadMonitor `/devices` response.
///
/// Constructed fresh on every fetch and discarded after reconciliation.
/// The API serialises `avg_cpm` either as a number or as a numeric string
/// depending on device firmware, so it gets its own deserializer. Fields
/// other than `id` and `status` may be missing on foreign device records,
/// hence the defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryRecord {
    pub id: String,
    pub status: String,
    #[serde(default, deserialize_with = "deserialize_number_or_string")]
    pub avg_cpm: Option<f64>,
    #[serde(default)]
    pub factor: f64,
    #[serde(default)]
    pub avg_voltage: f64,
    /// Duty cycle in tenths of a percent.
    #[serde(default)]
    pub avg_duty: f64,
}

fn deserialize_number_or_string<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(f64),
        Text(String),
    }

    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrString::Number(n)) => Ok(Some(n)),
        Some(NumberOrString::Text(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
