use crate::config::UradmonConfig;
use crate::models::telemetry::TelemetryRecord;
use crate::store::ReadingStore;
use anyhow::Context;
use log::{debug, error, warn};
use reqwest::Client;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Status value a device record must carry to be trusted.
const ACTIVE_STATUS: &str = "1";

/// Failures of one remote polling cycle. Transport and data-validity
/// problems flag the same slots; they are separated here so the log can
/// tell a dead network from a misbehaving device record.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Error fetching data from {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Device {0} not present in response")]
    UnknownDevice(String),
    #[error("Device {device} has inactive status {status:?}")]
    Inactive { device: String, status: String },
    #[error("Device {0} reported no count rate")]
    MissingCountRate(String),
}

impl TelemetryError {
    fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

/// Polls the uRadMonitor devices endpoint and reconciles the matching
/// record into the store.
#[derive(Debug)]
pub struct UradmonPoller {
    client: Client,
    api: String,
    device_id: String,
    user_id: String,
    user_key: String,
}

impl UradmonPoller {
    /// Build a poller from configuration, or `None` when the fetcher is
    /// disabled or missing its credentials.
    pub fn from_config(cfg: &UradmonConfig) -> anyhow::Result<Option<Self>> {
        if !cfg.enabled {
            return Ok(None);
        }
        let (Some(device_id), Some(user_id), Some(user_key)) =
            (&cfg.device_id, &cfg.user_id, &cfg.user_key)
        else {
            return Ok(None);
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Some(Self {
            client,
            api: cfg.api.clone(),
            device_id: device_id.clone(),
            user_id: user_id.clone(),
            user_key: user_key.clone(),
        }))
    }

    /// Unauthenticated startup probe: is anything answering at the API URL?
    pub async fn probe(&self) -> bool {
        match self.client.get(&self.api).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("Probe of {} failed: {}", self.api, e);
                false
            }
        }
    }

    fn transport(&self, source: reqwest::Error) -> TelemetryError {
        TelemetryError::Transport {
            url: self.api.clone(),
            source,
        }
    }

    async fn fetch(&self) -> Result<Vec<TelemetryRecord>, TelemetryError> {
        let response = self
            .client
            .get(&self.api)
            .header("X-User-Id", self.user_id.as_str())
            .header("X-User-Hash", self.user_key.as_str())
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|source| self.transport(source))?;
        response
            .json()
            .await
            .map_err(|source| self.transport(source))
    }

    /// One remote polling cycle. Every failure path flags both remote
    /// slots and leaves their stored values untouched; the next tick
    /// retries from scratch.
    pub async fn poll(&self, store: &mut ReadingStore) {
        let start = Instant::now();
        let outcome = match self.fetch().await {
            Ok(records) => reconcile(&records, &self.device_id, store),
            Err(e) => Err(e),
        };
        if let Err(e) = outcome {
            if e.is_transport() {
                error!("{e}");
            } else {
                warn!("{e}");
            }
            mark_failed(store);
        }
        debug!("uradmon poll took: {} ms", start.elapsed().as_millis());
    }
}

/// Reconcile a fetched device array against the store.
///
/// The array is scanned for `device_id` and the last matching record wins.
/// A match with the active status and a count rate clears both remote
/// error flags; the count-rate slot is mutated only when the truncated
/// value differs, and the dose rate is recomputed alongside every
/// count-rate change. The supply/duty line is rebuilt on every successful
/// cycle regardless of change.
pub fn reconcile(
    records: &[TelemetryRecord],
    device_id: &str,
    store: &mut ReadingStore,
) -> Result<(), TelemetryError> {
    let mut matched: Option<&TelemetryRecord> = None;
    for record in records {
        if record.id == device_id {
            matched = Some(record);
        }
    }

    let record = matched.ok_or_else(|| TelemetryError::UnknownDevice(device_id.to_string()))?;
    if record.status != ACTIVE_STATUS {
        return Err(TelemetryError::Inactive {
            device: device_id.to_string(),
            status: record.status.clone(),
        });
    }
    let cpm = record
        .avg_cpm
        .ok_or_else(|| TelemetryError::MissingCountRate(device_id.to_string()))?;

    store.count_rate.set_error(false);
    store.dose_rate.set_error(false);

    let count = cpm as u64;
    if store.count_rate.value() != Some(count) {
        store.count_rate.set(count);
        store.dose_rate.set(count as f64 * record.factor);
    }

    store.set_supply_display(format!(
        "Ugmt: {:.2}V, Duty: {:.2}%",
        record.avg_voltage,
        record.avg_duty / 10.0
    ));

    Ok(())
}

/// Flag both remote slots after a failed cycle, values untouched.
pub fn mark_failed(store: &mut ReadingStore) {
    store.count_rate.set_error(true);
    store.dose_rate.set_error(true);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, status: &str, cpm: Option<f64>, factor: f64) -> TelemetryRecord {
        TelemetryRecord {
            id: id.to_string(),
            status: status.to_string(),
            avg_cpm: cpm,
            factor,
            avg_voltage: 3.95,
            avg_duty: 123.0,
        }
    }

    #[test]
    fn test_reconcile_matching_active_record() {
        let records = vec![
            record("A", "0", Some(99.0), 0.1),
            record("B", "1", Some(12.0), 0.01),
        ];
        let mut store = ReadingStore::default();

        reconcile(&records, "B", &mut store).unwrap();

        assert_eq!(store.count_rate.value(), Some(12));
        assert_eq!(store.dose_rate.value(), Some(0.12));
        assert!(!store.count_rate.has_error());
        assert!(!store.dose_rate.has_error());
        assert_eq!(
            store.supply_display(),
            Some("Ugmt: 3.95V, Duty: 12.30%")
        );
    }

    #[test]
    fn test_reconcile_no_matching_device() {
        let records = vec![record("A", "1", Some(5.0), 0.01)];
        let mut store = ReadingStore::default();
        store.count_rate.set(12);
        store.dose_rate.set(0.12);

        let err = reconcile(&records, "Z", &mut store).unwrap_err();
        mark_failed(&mut store);

        assert!(matches!(err, TelemetryError::UnknownDevice(_)));
        assert_eq!(store.count_rate.value(), Some(12));
        assert_eq!(store.dose_rate.value(), Some(0.12));
        assert!(store.count_rate.has_error());
        assert!(store.dose_rate.has_error());
    }

    #[test]
    fn test_reconcile_inactive_status() {
        let records = vec![record("B", "0", Some(12.0), 0.01)];
        let mut store = ReadingStore::default();

        let err = reconcile(&records, "B", &mut store).unwrap_err();
        assert!(matches!(err, TelemetryError::Inactive { .. }));
        assert_eq!(store.count_rate.value(), None);
    }

    #[test]
    fn test_reconcile_missing_count_rate() {
        let records = vec![record("B", "1", None, 0.01)];
        let mut store = ReadingStore::default();

        let err = reconcile(&records, "B", &mut store).unwrap_err();
        assert!(matches!(err, TelemetryError::MissingCountRate(_)));
    }

    #[test]
    fn test_reconcile_last_match_wins() {
        let records = vec![
            record("B", "1", Some(7.0), 0.01),
            record("B", "1", Some(21.0), 0.01),
        ];
        let mut store = ReadingStore::default();

        reconcile(&records, "B", &mut store).unwrap();
        assert_eq!(store.count_rate.value(), Some(21));
    }

    #[test]
    fn test_reconcile_unchanged_count_rate_is_idempotent() {
        let records = vec![record("B", "1", Some(12.0), 0.01)];
        let mut store = ReadingStore::default();

        reconcile(&records, "B", &mut store).unwrap();
        reconcile(&records, "B", &mut store).unwrap();

        assert_eq!(store.count_rate.updates(), 1);
        assert_eq!(store.dose_rate.updates(), 1);
    }

    #[test]
    fn test_reconcile_truncates_fractional_count_rate() {
        let records = vec![record("B", "1", Some(17.5), 0.01)];
        let mut store = ReadingStore::default();

        reconcile(&records, "B", &mut store).unwrap();
        assert_eq!(store.count_rate.value(), Some(17));
    }

    #[test]
    fn test_successful_cycle_clears_flags_without_value_change() {
        let records = vec![record("B", "1", Some(12.0), 0.01)];
        let mut store = ReadingStore::default();

        reconcile(&records, "B", &mut store).unwrap();
        mark_failed(&mut store);
        assert!(store.count_rate.has_error());

        reconcile(&records, "B", &mut store).unwrap();
        assert!(!store.count_rate.has_error());
        assert!(!store.dose_rate.has_error());
        assert_eq!(store.count_rate.updates(), 1);
    }

    #[test]
    fn test_supply_display_refreshes_without_count_change() {
        let mut store = ReadingStore::default();
        reconcile(
            &[record("B", "1", Some(12.0), 0.01)],
            "B",
            &mut store,
        )
        .unwrap();

        let mut changed = record("B", "1", Some(12.0), 0.01);
        changed.avg_voltage = 3.80;
        changed.avg_duty = 250.0;
        reconcile(&[changed], "B", &mut store).unwrap();

        assert_eq!(
            store.supply_display(),
            Some("Ugmt: 3.80V, Duty: 25.00%")
        );
        assert_eq!(store.count_rate.updates(), 1);
    }
}
