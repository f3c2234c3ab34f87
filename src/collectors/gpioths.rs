use crate::models::sensor::SensorDescriptor;
use crate::store::ReadingStore;
use crate::sysctl::SensorTree;
use anyhow::{bail, Result};
use indexmap::IndexMap;
use log::{debug, warn};
use regex::Regex;
use std::time::Instant;

/// Sysctl namespace the DHT-class GPIO sensor drivers publish under.
pub const SENSOR_ROOT: &str = "dev.gpioths";

/// 0 ℃ in decikelvins.
const FREEZING_POINT_DECIKELVIN: i64 = 2731;

pub type SensorTable = IndexMap<u32, SensorDescriptor>;

/// One-shot discovery scan over the sensor namespace.
///
/// Every leaf named `dev.gpioths.<index>.<property>` lands in the table;
/// the `%driver` and `%desc` metadata leaves additionally fill the
/// descriptor's driver and description fields. An empty or absent
/// namespace is fatal for the whole application.
pub async fn discover(tree: &impl SensorTree) -> Result<SensorTable> {
    let start = Instant::now();
    let leaves = tree.enumerate(SENSOR_ROOT).await?;

    let leaf_re = Regex::new(&format!(
        r"^{}\.([0-9]+)\.(%?)(\S+)$",
        regex::escape(SENSOR_ROOT)
    ))
    .expect("leaf pattern is valid");

    let mut sensors = SensorTable::new();
    for leaf in &leaves {
        let Some(caps) = leaf_re.captures(&leaf.name) else {
            continue;
        };
        let Ok(index) = caps[1].parse::<u32>() else {
            continue;
        };
        let property = caps[3].to_string();

        let descriptor = sensors
            .entry(index)
            .or_insert_with(|| SensorDescriptor::new(index));
        if &caps[2] == "%" {
            match property.as_str() {
                "driver" => descriptor.driver = leaf.value.clone(),
                "desc" => descriptor.desc = leaf.value.clone(),
                _ => {}
            }
        }
        descriptor.properties.insert(property, leaf.value.clone());
    }

    if sensors.is_empty() {
        bail!("No sensor(s) detected under {SENSOR_ROOT}");
    }

    debug!(
        "discover found {} sensor(s), took: {} ms",
        sensors.len(),
        start.elapsed().as_millis()
    );
    Ok(sensors)
}

/// Render the discovery table the way `--list-sensors` prints it.
pub fn sensor_table(sensors: &SensorTable) -> String {
    let mut out = String::from("ID  Driver       Description\n");
    for descriptor in sensors.values() {
        out.push_str(&format!(
            "{:<2}  {:<12} {}\n",
            descriptor.index, descriptor.driver, descriptor.desc
        ));
    }
    out
}

/// One polling cycle against the selected sensor.
///
/// Each property is read independently: an absent reading flags only its
/// own slot and leaves the stored value for the previous cycle in place.
/// A present reading always clears the flag, but mutates the slot only
/// when the converted value actually differs; redraws are keyed off
/// value changes.
pub async fn poll(
    tree: &impl SensorTree,
    index: u32,
    temperature_leafoid: &str,
    humidity_leafoid: &str,
    store: &mut ReadingStore,
) {
    let start = Instant::now();

    let key = format!("{SENSOR_ROOT}.{index}.{temperature_leafoid}");
    match tree.read_value(&key).await {
        None => {
            warn!("Temperature read failed: {key}");
            store.temperature.set_error(true);
        }
        Some(raw) => {
            // The driver reports decikelvins.
            let celsius = decikelvin_to_celsius(raw);
            store.temperature.set_error(false);
            if store.temperature.value() != Some(celsius) {
                store.temperature.set(celsius);
            }
        }
    }

    let key = format!("{SENSOR_ROOT}.{index}.{humidity_leafoid}");
    match tree.read_value(&key).await {
        None => {
            warn!("Humidity read failed: {key}");
            store.humidity.set_error(true);
        }
        Some(raw) => {
            let humidity = raw as f64;
            store.humidity.set_error(false);
            if store.humidity.value() != Some(humidity) {
                store.humidity.set(humidity);
            }
        }
    }

    debug!("gpioths poll took: {} ms", start.elapsed().as_millis());
}

/// Exact conversion, one implied decimal digit: `(raw - 2731) / 10`.
fn decikelvin_to_celsius(raw: i64) -> f64 {
    (raw - FREEZING_POINT_DECIKELVIN) as f64 / 10.0
}
