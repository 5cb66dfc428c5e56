//! Configuration management for Turnstile.

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use tracing::info;

use crate::admission::{CleanupPolicy, EngineConfig};
use crate::error::{Result, TurnstileError};

/// Prefix for environment overrides, e.g. `TURNSTILE__ADMISSION__LIMIT=50`.
pub const ENV_PREFIX: &str = "TURNSTILE";

/// Main configuration for the Turnstile service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TurnstileConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Admission control configuration
    #[serde(default)]
    pub admission: AdmissionConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server address
    #[serde(default = "default_http_addr")]
    pub http_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
        }
    }
}

fn default_http_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

/// Admission control configuration, validated by [`AdmissionConfig::engine`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionConfig {
    /// Maximum admitted requests per window
    #[serde(default = "default_limit")]
    pub limit: u64,

    /// Window length in seconds
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// How expired records are reclaimed
    #[serde(default)]
    pub cleanup: CleanupPolicy,

    /// Background sweep interval in seconds, used with the `lazy` policy
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            window_secs: default_window_secs(),
            cleanup: CleanupPolicy::default(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

fn default_limit() -> u64 {
    100
}

fn default_window_secs() -> u64 {
    60
}

fn default_sweep_interval() -> u64 {
    30
}

impl AdmissionConfig {
    /// Validate into an engine configuration.
    pub fn engine(&self) -> Result<EngineConfig> {
        Ok(EngineConfig::new(self.limit, self.window_secs)?.with_cleanup(self.cleanup))
    }
}

impl TurnstileConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading configuration file");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| TurnstileError::Config(format!("Failed to parse configuration: {}", e)))
    }

    /// Layer an optional YAML file and `TURNSTILE__*` environment variables
    /// over the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            info!(path = %path.display(), "Loading configuration file");
            let contents = std::fs::read_to_string(path)?;
            builder = builder.add_source(File::from_str(&contents, FileFormat::Yaml));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TurnstileConfig::default();

        assert_eq!(config.server.http_addr, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.admission.limit, 100);
        assert_eq!(config.admission.window_secs, 60);
        assert_eq!(config.admission.cleanup, CleanupPolicy::EveryCheck);
        assert!(config.admission.engine().is_ok());
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
server:
  http_addr: 0.0.0.0:9000
admission:
  limit: 5
  window_secs: 10
  cleanup: lazy
"#;
        let config = TurnstileConfig::from_yaml(yaml).unwrap();

        assert_eq!(config.server.http_addr.port(), 9000);
        assert_eq!(config.admission.limit, 5);
        assert_eq!(config.admission.window_secs, 10);
        assert_eq!(config.admission.cleanup, CleanupPolicy::Lazy);
        assert_eq!(config.admission.sweep_interval_secs, 30);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config = TurnstileConfig::from_yaml("admission:\n  limit: 7\n").unwrap();

        assert_eq!(config.admission.limit, 7);
        assert_eq!(config.admission.window_secs, 60);
        assert_eq!(config.server.http_addr.port(), 8080);
    }

    #[test]
    fn test_negative_limit_is_config_error() {
        let err = TurnstileConfig::from_yaml("admission:\n  limit: -1\n").unwrap_err();
        assert!(matches!(err, TurnstileError::Config(_)));
    }

    #[test]
    fn test_zero_limit_fails_validation() {
        let config = TurnstileConfig::from_yaml("admission:\n  limit: 0\n").unwrap();
        assert!(matches!(
            config.admission.engine(),
            Err(TurnstileError::Config(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!(
            "turnstile-config-{}.yaml",
            std::process::id()
        ));
        std::fs::write(&path, "admission:\n  limit: 12\n  window_secs: 30\n").unwrap();

        let config = TurnstileConfig::load(Some(&path)).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.admission.limit, 12);
        assert_eq!(config.admission.window_secs, 30);
        assert_eq!(config.server.http_addr.port(), 8080);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = TurnstileConfig::from_file("/nonexistent/turnstile.yaml").unwrap_err();
        assert!(matches!(err, TurnstileError::Io(_)));
    }
}
