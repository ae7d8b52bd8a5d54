use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::workflows::enrollment::{StagingSettings, SweepSchedule, VerificationPolicy};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the admissions service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub storage: StorageConfig,
    pub verification: VerificationConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(&env_or("APP_ENV", "development"));

        let host = env_or("APP_HOST", "127.0.0.1");
        let port = env_or("APP_PORT", "3000")
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env_or("APP_LOG_LEVEL", "info");

        let storage = StorageConfig {
            root: PathBuf::from(env_or("STORAGE_ROOT", "./storage")),
            folder: env_or("STORAGE_FOLDER", "students"),
            staging_dir: env::var("STORAGE_STAGING_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| env::temp_dir()),
            max_file_bytes: parse_env("STORAGE_MAX_FILE_BYTES", 5 * 1024 * 1024)?,
        };

        let verification = VerificationConfig {
            rejection_retention_days: parse_env("VERIFICATION_REJECTION_RETENTION_DAYS", 14)?,
            pending_alert_days: parse_env("VERIFICATION_PENDING_ALERT_DAYS", 21)?,
            sweep_interval_secs: parse_env("VERIFICATION_SWEEP_INTERVAL_SECS", 86_400)?,
            sweep_on_startup: parse_flag("VERIFICATION_SWEEP_ON_STARTUP", true)?,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                ansi: environment == AppEnvironment::Development,
            },
            storage,
            verification,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { key, value: raw }),
        Err(_) => Ok(default),
    }
}

fn parse_flag(key: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidFlag { key, value: raw }),
        },
        Err(_) => Ok(default),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub ansi: bool,
}

/// Where uploaded student documents are staged and kept.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub root: PathBuf,
    pub folder: String,
    pub staging_dir: PathBuf,
    pub max_file_bytes: u64,
}

impl StorageConfig {
    pub fn staging_settings(&self) -> StagingSettings {
        StagingSettings {
            staging_dir: self.staging_dir.clone(),
            folder: self.folder.clone(),
            max_file_bytes: self.max_file_bytes,
        }
    }
}

/// Windows used by the verification workflow and its background sweep.
#[derive(Debug, Clone)]
pub struct VerificationConfig {
    pub rejection_retention_days: u32,
    pub pending_alert_days: u32,
    pub sweep_interval_secs: u64,
    pub sweep_on_startup: bool,
}

impl VerificationConfig {
    pub fn policy(&self) -> VerificationPolicy {
        VerificationPolicy {
            rejection_retention_days: self.rejection_retention_days,
            pending_alert_days: self.pending_alert_days,
        }
    }

    /// `None` when the periodic sweep is disabled.
    pub fn sweep_schedule(&self) -> Option<SweepSchedule> {
        if self.sweep_interval_secs == 0 {
            return None;
        }

        Some(SweepSchedule {
            interval: Duration::from_secs(self.sweep_interval_secs),
            run_on_startup: self.sweep_on_startup,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("APP_PORT must be a valid u16")]
    InvalidPort,
    #[error("APP_HOST must parse to an IPv4 or IPv6 address")]
    InvalidHost { source: std::net::AddrParseError },
    #[error("{key} must be a non-negative integer (found '{value}')")]
    InvalidNumber { key: &'static str, value: String },
    #[error("{key} must be true or false (found '{value}')")]
    InvalidFlag { key: &'static str, value: String },
}
