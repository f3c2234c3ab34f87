pub mod config;

use crate::collectors::{gpioths, uradmon::UradmonPoller};
use crate::config::AppConfig;
use crate::store::ReadingStore;
use crate::sysctl::SysctlTree;
use anyhow::{bail, Context};
use log::{debug, error, info, warn};
use std::time::Duration;
use tokio::time::MissedTickBehavior;

pub mod cli;
pub mod collectors;
pub mod models;
pub mod store;
pub mod sysctl;

pub async fn run(config: AppConfig, list_sensors: bool) -> anyhow::Result<()> {
    info!("Starting application");

    tokio::select! {
        result = main_loop(config, list_sensors) => {
            match result {
                Ok(_) => info!("Application completed successfully"),
                Err(e) => {
                    error!("Application error: {e:#}");
                    // Print chain of error causes
                    let mut source = e.source();
                    while let Some(e) = source {
                        error!("Caused by: {e}");
                        source = e.source();
                    }
                    return Err(e).context("Application failed to run");
                }
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Exiting...");
        }
    }

    Ok(())
}

async fn main_loop(mut config: AppConfig, list_sensors: bool) -> anyhow::Result<()> {
    let tree = SysctlTree::new();

    debug!("Scanning for sensors");
    let sensors = gpioths::discover(&tree)
        .await
        .context("Sensor discovery failed")?;

    if list_sensors {
        print!("{}", gpioths::sensor_table(&sensors));
        return Ok(());
    }

    if !sensors.contains_key(&config.sensor.index) {
        bail!("Invalid sensor number specified: {}", config.sensor.index);
    }

    let mut poller = UradmonPoller::from_config(&config.uradmon)?;
    if let Some(p) = &poller {
        if !p.probe().await {
            warn!(
                "uRadMon API URL {} does not resolve and/or respond, disabling uRadMonitor.",
                config.uradmon.api
            );
            config.uradmon.enabled = false;
            poller = None;
        }
    }

    let mut store = ReadingStore::default();

    // Both pollers run on one task. A tick whose poll is still in flight
    // is skipped, never queued, so neither poller overlaps itself and at
    // most one remote fetch is outstanding at a time.
    let mut sensor_tick =
        tokio::time::interval(Duration::from_secs(config.sensor.poll_interval));
    sensor_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut uradmon_tick =
        tokio::time::interval(Duration::from_secs(config.uradmon.poll_interval));
    uradmon_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = sensor_tick.tick() => {
                gpioths::poll(
                    &tree,
                    config.sensor.index,
                    &config.sensor.temperature_leafoid,
                    &config.sensor.humidity_leafoid,
                    &mut store,
                )
                .await;
            }
            _ = uradmon_tick.tick(), if poller.is_some() => {
                if let Some(poller) = &poller {
                    poller.poll(&mut store).await;
                }
            }
        }

        let snapshot = store.snapshot();
        info!("{}", snapshot.status_line());
        debug!("{:?}", snapshot);
    }
}
