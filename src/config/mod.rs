pub mod sensors;

use crate::database::archive::ArchiveSettings;
use anyhow::{Context, Result};
use config::{Config, File, FileFormat};
use log::{debug, LevelFilter};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "housesensor.ini";

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SensorConfig {
    /// The sensor definition file.
    pub config: PathBuf,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            config: PathBuf::from("/etc/house/sensor.config"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HttpConfig {
    pub address: String,
    pub port: u16,
    pub max_response: usize,
    pub host_name: Option<String>,
    /// Static web UI served for every path that is not a sensor endpoint.
    pub static_root: PathBuf,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".to_string(),
            port: 8080,
            max_response: 65536,
            host_name: None,
            static_root: PathBuf::from("/usr/share/house/public"),
        }
    }
}

impl HttpConfig {
    /// The configured host name, else the system's.
    pub fn host_name(&self) -> String {
        self.host_name
            .clone()
            .or_else(sysinfo::System::host_name)
            .unwrap_or_else(|| "localhost".to_string())
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct W1Config {
    pub root: PathBuf,
}

impl Default for W1Config {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/sys/bus/w1/devices"),
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

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub sensor: SensorConfig,
    #[serde(default)]
    pub archive: ArchiveSettings,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub w1: W1Config,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
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
            .add_source(File::from(config_path).format(FileFormat::Ini))
            .build()
            .context(format!("Failed to load config from {}", config_path.display()))?;

        let app_config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize config")?;

        Ok(app_config)
    }
}
