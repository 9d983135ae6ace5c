//! Configuration for the campus binaries.
//!
//! Values come from an optional config file layered under environment
//! variables with a per-service prefix (e.g. `CAMPUS_GRADING_PORT=6001`,
//! `CAMPUS_REGISTRY_HEARTBEAT__MAX_ATTEMPTS=5`).

use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use campus_discovery::HeartbeatConfig;

/// Registry server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub host: String,
    pub port: u16,
    pub heartbeat: HeartbeatConfig,
    pub logging: LoggingConfig,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 3000,
            heartbeat: HeartbeatConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl RegistryConfig {
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        load(path, "CAMPUS_REGISTRY")
    }

    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Configuration shared by the application services.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub host: String,
    /// 0 means "use the service's conventional port".
    pub port: u16,
    pub registry_url: String,
    /// Destination file of the log sink; ignored by the other services.
    pub log_file: String,
    pub logging: LoggingConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 0,
            registry_url: "http://127.0.0.1:3000".to_owned(),
            log_file: "./app.log".to_owned(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ServiceConfig {
    pub fn load(path: Option<&str>, env_prefix: &str) -> Result<Self, ConfigError> {
        load(path, env_prefix)
    }

    /// Fall back to the service's conventional port when none is configured.
    #[must_use]
    pub fn or_port(mut self, default_port: u16) -> Self {
        if self.port == 0 {
            self.port = default_port;
        }
        self
    }

    /// The base URL this instance advertises in its registration.
    #[must_use]
    pub fn service_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// trace | debug | info | warn | error
    pub level: String,
    /// "pretty" for development, "json" for production
    pub format: String,
    pub file_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "pretty".to_owned(),
            file_path: None,
        }
    }
}

fn load<T: for<'de> Deserialize<'de>>(
    path: Option<&str>,
    env_prefix: &str,
) -> Result<T, ConfigError> {
    let mut builder = ConfigBuilder::builder();
    if let Some(path) = path {
        builder = builder.add_source(File::with_name(path));
    }
    builder = builder.add_source(Environment::with_prefix(env_prefix).separator("__"));
    builder.build()?.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_usable_without_any_source() {
        let config = RegistryConfig::load(None).unwrap();
        assert_eq!(config.bind_addr(), "127.0.0.1:3000");
        assert_eq!(config.heartbeat.max_attempts, 3);

        let config = ServiceConfig::load(None, "CAMPUS_TEST").unwrap().or_port(6000);
        assert_eq!(config.service_url(), "http://127.0.0.1:6000");
    }

    #[test]
    fn test_configured_port_wins_over_conventional_port() {
        let config = ServiceConfig {
            port: 7123,
            ..ServiceConfig::default()
        }
        .or_port(6000);
        assert_eq!(config.port, 7123);
    }
}
