//! Collector configuration
//!
//! Settings are resolved once at startup, in order of increasing priority:
//! 1. Built-in defaults
//! 2. JSON file (~/.config/signals-collector/collector.json)
//! 3. `.env` file (current directory, or `COLLECTOR_ENV_FILE`)
//! 4. Process environment variables
//!
//! The result is an immutable [`CollectorConfig`] passed to the rest of the
//! collector by reference.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::device;

/// JSON config filename in the config directory
const CONFIG_FILE: &str = "collector.json";

/// Environment variable naming an alternative `.env` file
const ENV_FILE_VAR: &str = "COLLECTOR_ENV_FILE";

const DEFAULT_DEVICE_IP: &str = "192.168.100.80";
const DEFAULT_SHEET_NAME: &str = "DansLights Data";
const DEFAULT_INTERVAL_MINUTES: u64 = 5;
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;
const DEFAULT_SHEET_TIMEOUT_SECS: u64 = 30;

/// One week
const MAX_INTERVAL_MINUTES: u64 = 7 * 24 * 60;
/// One hour
const MAX_TIMEOUT_SECS: u64 = 60 * 60;

/// Resolved collector settings
#[derive(Debug, Clone, PartialEq)]
pub struct CollectorConfig {
    /// Full URL of the device's CSV export
    pub device_url: String,
    /// Name of the target spreadsheet
    pub sheet_name: String,
    /// Service account key file for the Sheets API
    pub credentials_path: PathBuf,
    /// File holding the sync watermark
    pub state_file_path: PathBuf,
    /// File that log output is appended to
    pub log_file_path: PathBuf,
    /// Time between the end of one cycle and the start of the next
    pub collection_interval: Duration,
    /// Timeout for the device request
    pub fetch_timeout: Duration,
    /// Timeout for each Sheets/Drive API request
    pub sheet_timeout: Duration,
    /// Largest device export accepted, in bytes
    pub fetch_max_bytes: u64,
}

/// Optional settings from the JSON config file
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub device_ip: Option<String>,
    pub device_url: Option<String>,
    pub sheet_name: Option<String>,
    pub credentials_path: Option<PathBuf>,
    pub state_file_path: Option<PathBuf>,
    pub log_file_path: Option<PathBuf>,
    pub collection_interval_minutes: Option<u64>,
    pub fetch_timeout_secs: Option<u64>,
    pub sheet_timeout_secs: Option<u64>,
    pub fetch_max_bytes: Option<u64>,
}

impl CollectorConfig {
    /// Load configuration from all sources
    pub fn load() -> Result<Self> {
        let base_dir = config::config_dir().context("Could not determine config directory")?;
        let file: ConfigFile = config::load_optional_json(CONFIG_FILE)?.unwrap_or_default();

        let env_path = std::env::var_os(ENV_FILE_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".env"));
        let dotenv = config::load_env_file(&env_path)?;

        Self::resolve(&base_dir, file, |key| {
            std::env::var(key).ok().or_else(|| dotenv.get(key).cloned())
        })
    }

    /// Build a config from a JSON layer and an environment lookup
    ///
    /// Relative default paths are placed under `base_dir`; explicitly
    /// configured paths are used as given.
    pub fn resolve<F>(base_dir: &Path, file: ConfigFile, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |key: &str, from_file: Option<String>| -> Option<String> {
            env(key).filter(|v| !v.is_empty()).or(from_file)
        };
        let pick_path = |key: &str, from_file: Option<PathBuf>, default: &str| -> PathBuf {
            pick(key, from_file.map(|p| p.to_string_lossy().into_owned()))
                .map(PathBuf::from)
                .unwrap_or_else(|| base_dir.join(default))
        };
        let pick_u64 = |key: &str, from_file: Option<u64>, default: u64| -> Result<u64> {
            match env(key).filter(|v| !v.is_empty()) {
                Some(raw) => raw
                    .trim()
                    .parse::<u64>()
                    .with_context(|| {
                        format!("{} must be a non-negative integer, got {:?}", key, raw)
                    }),
                None => Ok(from_file.unwrap_or(default)),
            }
        };

        let device_ip =
            pick("DEVICE_IP", file.device_ip).unwrap_or_else(|| DEFAULT_DEVICE_IP.to_string());
        let device_url = pick("DEVICE_URL", file.device_url)
            .unwrap_or_else(|| device::device_url(&device_ip));
        url::Url::parse(&device_url)
            .with_context(|| format!("Invalid device URL: {}", device_url))?;

        let interval_minutes = pick_u64(
            "COLLECTION_INTERVAL_MINUTES",
            file.collection_interval_minutes,
            DEFAULT_INTERVAL_MINUTES,
        )?;
        check_range("COLLECTION_INTERVAL_MINUTES", interval_minutes, MAX_INTERVAL_MINUTES)?;
        let fetch_timeout_secs =
            pick_u64("FETCH_TIMEOUT_SECS", file.fetch_timeout_secs, DEFAULT_FETCH_TIMEOUT_SECS)?;
        check_range("FETCH_TIMEOUT_SECS", fetch_timeout_secs, MAX_TIMEOUT_SECS)?;
        let sheet_timeout_secs =
            pick_u64("SHEET_TIMEOUT_SECS", file.sheet_timeout_secs, DEFAULT_SHEET_TIMEOUT_SECS)?;
        check_range("SHEET_TIMEOUT_SECS", sheet_timeout_secs, MAX_TIMEOUT_SECS)?;
        let fetch_max_bytes = pick_u64(
            "FETCH_MAX_BYTES",
            file.fetch_max_bytes,
            device::DEFAULT_MAX_BODY_BYTES,
        )?;
        if fetch_max_bytes == 0 {
            bail!("FETCH_MAX_BYTES must be at least 1");
        }

        Ok(Self {
            device_url,
            sheet_name: pick("GOOGLE_SHEET_NAME", file.sheet_name)
                .unwrap_or_else(|| DEFAULT_SHEET_NAME.to_string()),
            credentials_path: pick_path(
                "GOOGLE_CREDENTIALS_FILE",
                file.credentials_path,
                "credentials.json",
            ),
            state_file_path: pick_path("STATE_FILE", file.state_file_path, "last_upload_state.txt"),
            log_file_path: pick_path("LOG_FILE", file.log_file_path, "collector.log"),
            collection_interval: Duration::from_secs(interval_minutes * 60),
            fetch_timeout: Duration::from_secs(fetch_timeout_secs),
            sheet_timeout: Duration::from_secs(sheet_timeout_secs),
            fetch_max_bytes,
        })
    }

    /// Resolve from a fixed map, ignoring the process environment
    pub fn from_vars(
        base_dir: &Path,
        file: ConfigFile,
        vars: &HashMap<String, String>,
    ) -> Result<Self> {
        Self::resolve(base_dir, file, |key| vars.get(key).cloned())
    }
}

/// Reject zero and values above `max`
fn check_range(key: &str, value: u64, max: u64) -> Result<()> {
    if value == 0 {
        bail!("{} must be at least 1", key);
    }
    if value > max {
        bail!("{} must be at most {}, got {}", key, max, value);
    }
    Ok(())
}
