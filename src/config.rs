use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

pub const DEFAULT_AGGREGATOR_URL: &str = "http://localhost:8000";
pub const DEFAULT_LOG_CAPACITY: usize = 1000;
pub const AGGREGATOR_URL_ENV: &str = "MC_AGG_URL";
const APP_DIR: &str = "multi-cluster-dashboard";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("cannot determine a data directory for the audit log")]
    NoDataDir,
}

/// On-disk shape of `config.yaml`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    aggregator_url: Option<String>,
    log_capacity: Option<usize>,
    request_timeout_secs: Option<u64>,
    log_dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// Base URL of the aggregator, without a trailing slash.
    pub aggregator_url: String,
    pub log_capacity: usize,
    /// `None` leaves requests waiting on the transport indefinitely.
    pub request_timeout: Option<Duration>,
    /// Directory holding the persisted audit log.
    pub log_dir: PathBuf,
}

impl DashboardConfig {
    pub fn new(aggregator_url: impl AsRef<str>, log_dir: impl Into<PathBuf>) -> Self {
        Self {
            aggregator_url: normalize_url(aggregator_url.as_ref()),
            log_capacity: DEFAULT_LOG_CAPACITY,
            request_timeout: None,
            log_dir: log_dir.into(),
        }
    }

    /// Resolves the config from, in order: the `MC_AGG_URL` env var, the
    /// user's `config.yaml`, then built-in defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let file = match default_config_path() {
            Some(path) if path.exists() => read_config_file(&path)?,
            Some(path) => {
                log::info!("config: no config file at {}", path.display());
                ConfigFile::default()
            }
            None => ConfigFile::default(),
        };

        let env_url = std::env::var(AGGREGATOR_URL_ENV).ok();
        let log_dir = match file.log_dir.clone() {
            Some(dir) => dir,
            None => dirs::data_dir()
                .map(|d| d.join(APP_DIR))
                .ok_or(ConfigError::NoDataDir)?,
        };

        Ok(Self::resolve(file, env_url, log_dir))
    }

    fn resolve(file: ConfigFile, env_url: Option<String>, log_dir: PathBuf) -> Self {
        let url = env_url
            .filter(|u| !u.trim().is_empty())
            .or(file.aggregator_url)
            .unwrap_or_else(|| DEFAULT_AGGREGATOR_URL.to_string());

        Self {
            aggregator_url: normalize_url(&url),
            log_capacity: file.log_capacity.unwrap_or(DEFAULT_LOG_CAPACITY),
            request_timeout: file.request_timeout_secs.map(Duration::from_secs),
            log_dir,
        }
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR).join("config.yaml"))
}

fn read_config_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let file = serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!("config: loaded {}", path.display());
    Ok(file)
}

fn normalize_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
