use std::env;
use std::path::PathBuf;
use std::time::Duration;

use tracing_subscriber::filter::LevelFilter;

use crate::errors::ConfigError;
use crate::youtube::client::DEFAULT_BASE_URL;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: Option<String>,
    pub base_url: String,
    pub stale_time: Duration,
    pub storage_dir: PathBuf,
    pub rehydrate: bool,
    pub bind_addr: String,
    pub log_dir: Option<PathBuf>,
    pub log_level: LevelFilter,
}

impl Config {
    /// Reads the process environment, after loading `.env` if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|var| env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let stale_time = match lookup("CATALOG_STALE_SECS") {
            Some(value) => Duration::from_secs(
                value
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| ConfigError::Invalid { var: "CATALOG_STALE_SECS", value })?,
            ),
            None => Duration::ZERO,
        };

        let rehydrate = match lookup("CATALOG_REHYDRATE") {
            Some(value) => value
                .trim()
                .parse::<bool>()
                .map_err(|_| ConfigError::Invalid { var: "CATALOG_REHYDRATE", value })?,
            None => false,
        };

        let log_level = match lookup("CATALOG_LOG_LEVEL") {
            Some(value) => value
                .trim()
                .parse::<LevelFilter>()
                .map_err(|_| ConfigError::Invalid { var: "CATALOG_LOG_LEVEL", value })?,
            None => LevelFilter::INFO,
        };

        Ok(Self {
            api_key: lookup("YOUTUBE_API_KEY").filter(|key| !key.trim().is_empty()),
            base_url: lookup("YOUTUBE_API_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            stale_time,
            storage_dir: lookup("CATALOG_STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".catalog")),
            rehydrate,
            bind_addr: lookup("CATALOG_BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            log_dir: lookup("CATALOG_LOG_DIR").map(PathBuf::from),
            log_level,
        })
    }
}
