//! signals-collector - Sensor log to Google Sheets sync service
//!
//! Polls the device on a fixed interval and appends new readings to the
//! configured spreadsheet until terminated.

use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use anyhow::{Context, Result};
use log::{error, info};
use signals::{
    CollectorConfig, DeviceClient, FileStateStore, Scheduler, SheetsClient, StateStore, SyncEngine,
};

mod logging;

fn main() -> ExitCode {
    // Config decides where logs go, so failures here can only reach stderr
    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init(&config.log_file_path) {
        eprintln!("Failed to initialize logging: {:#}", e);
        return ExitCode::FAILURE;
    }

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config() -> Result<CollectorConfig> {
    // Bootstrap config directory
    config::init()?;
    CollectorConfig::load()
}

fn run(config: &CollectorConfig) -> Result<()> {
    info!("Collector service started.");
    info!(
        "Polling {} every {} minutes into sheet {:?}",
        config.device_url,
        config.collection_interval.as_secs() / 60,
        config.sheet_name
    );

    let state = FileStateStore::new(&config.state_file_path);
    // An unreadable state file would silently restart from zero and
    // re-upload everything, so refuse to start instead
    let watermark = state
        .read()
        .context("Cannot start with an unreadable state file")?;
    info!("Last synced timestamp: {}", watermark);

    // Set up signal handling for graceful shutdown.
    let shutdown = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&shutdown))
        .context("Failed to register SIGTERM handler")?;
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&shutdown))
        .context("Failed to register SIGINT handler")?;

    let device = DeviceClient::new(config.device_url.clone(), config.fetch_timeout)
        .with_max_body_bytes(config.fetch_max_bytes);
    let sheets = SheetsClient::new(config.credentials_path.clone(), config.sheet_timeout);
    let engine = SyncEngine::new(&config.sheet_name, &sheets, &device, &state);

    let cycles = Scheduler::new(config.collection_interval).run(&shutdown, || {
        info!("Starting data collection cycle...");
        let report = engine.run_cycle();
        logging::log_report(&report);
    });

    info!("Shutdown requested, stopped after {} cycles.", cycles);
    Ok(())
}
