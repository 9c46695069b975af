//! Service configuration.
//!
//! Loaded from a JSON file; every field except the data directory has
//! a default. Validation runs at load time so a bad file fails the
//! boot, not the first request.

use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Unreadable(#[from] std::io::Error),

    #[error("invalid config JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("data directory '{0}' does not exist")]
    MissingDataDir(String),

    #[error("artifact ttl can not outlive the id lifespan")]
    TtlTooLong,

    #[error("{0} must be positive")]
    NotPositive(&'static str),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Where uploaded images and their artifacts live
    pub data_dir: PathBuf,

    /// Seconds a processed image stays on disk
    #[serde(default = "default_ttl")]
    pub ttl: i64,

    /// Seconds before an upload id may be reused
    #[serde(default = "default_id_lifespan")]
    pub id_lifespan: i64,

    /// Seconds a completed job stays queryable
    #[serde(default = "default_result_ttl")]
    pub result_ttl: i64,

    /// Seconds one job run may take
    #[serde(default = "default_job_timeout")]
    pub job_timeout: i64,

    #[serde(default = "default_host")]
    pub host: IpAddr,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Origins allowed to call the API from a browser
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_ttl() -> i64 {
    600
}
fn default_id_lifespan() -> i64 {
    // about a year
    31536000
}
fn default_result_ttl() -> i64 {
    500
}
fn default_job_timeout() -> i64 {
    180
}
fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}
fn default_port() -> u16 {
    8000
}

impl ServiceConfig {
    /// Load and validate a config file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Starting point for a fresh install
    pub fn sample(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            ttl: default_ttl(),
            id_lifespan: default_id_lifespan(),
            result_ttl: default_result_ttl(),
            job_timeout: default_job_timeout(),
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if !self.data_dir.is_dir() {
            return Err(ConfigError::MissingDataDir(
                self.data_dir.display().to_string(),
            ));
        }
        for (name, value) in [
            ("ttl", self.ttl),
            ("id_lifespan", self.id_lifespan),
            ("result_ttl", self.result_ttl),
            ("job_timeout", self.job_timeout),
        ] {
            if value <= 0 {
                return Err(ConfigError::NotPositive(name));
            }
        }
        if self.ttl > self.id_lifespan {
            return Err(ConfigError::TtlTooLong);
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("exifwash.json");
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_minimal_config_gets_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let body = format!("{{\"data_dir\": {:?}}}", dir.path().to_string_lossy());
        let path = write_config(dir.path(), &body);

        let config = ServiceConfig::load(&path).unwrap();
        assert_eq!(config.ttl, 600);
        assert_eq!(config.id_lifespan, 31536000);
        assert_eq!(config.result_ttl, 500);
        assert_eq!(config.job_timeout, 180);
        assert_eq!(config.port, 8000);
        assert!(config.cors_origins.is_empty());
    }

    #[test]
    fn test_missing_data_dir_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "{\"data_dir\": \"/no/such/place\"}");

        assert!(matches!(
            ServiceConfig::load(&path),
            Err(ConfigError::MissingDataDir(_))
        ));
    }

    #[test]
    fn test_ttl_longer_than_id_lifespan_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let body = format!(
            "{{\"data_dir\": {:?}, \"ttl\": 100, \"id_lifespan\": 50}}",
            dir.path().to_string_lossy()
        );
        let path = write_config(dir.path(), &body);

        assert!(matches!(
            ServiceConfig::load(&path),
            Err(ConfigError::TtlTooLong)
        ));
    }

    #[test]
    fn test_non_positive_values_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let body = format!(
            "{{\"data_dir\": {:?}, \"ttl\": 0}}",
            dir.path().to_string_lossy()
        );
        let path = write_config(dir.path(), &body);

        assert!(matches!(
            ServiceConfig::load(&path),
            Err(ConfigError::NotPositive("ttl"))
        ));
    }

    #[test]
    fn test_malformed_json_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "{not json");

        assert!(matches!(
            ServiceConfig::load(&path),
            Err(ConfigError::Malformed(_))
        ));
    }

    #[test]
    fn test_bind_addr() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServiceConfig::sample(dir.path().to_path_buf());
        assert_eq!(config.bind_addr().to_string(), "127.0.0.1:8000");
    }
}
