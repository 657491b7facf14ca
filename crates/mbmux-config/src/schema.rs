// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration schema for mbmux.
//!
//! A configuration lists the devices to front, each pairing one upstream
//! Modbus URL with one listen address, plus optional logging settings:
//!
//! ```yaml
//! devices:
//!   - modbus:
//!       url: plc.example.org:502
//!       timeout: 10
//!       connection_time: 0.1
//!     listen:
//!       bind: ":9502"
//! logging:
//!   level: info
//!   format: text
//! ```

use std::time::Duration;

use mbmux_core::DeviceEndpoint;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::url::{normalize_bind, parse_device_url};

// =============================================================================
// Constants
// =============================================================================

/// Default per-request response timeout, in seconds.
pub const DEFAULT_TIMEOUT_SECS: f64 = 10.0;

/// Default post-connect settle delay, in seconds.
pub const DEFAULT_CONNECTION_TIME: f64 = 0.0;

// =============================================================================
// ProxyConfig
// =============================================================================

/// Top-level mbmux configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProxyConfig {
    /// The devices to front, one bridge each.
    pub devices: Vec<DeviceConfig>,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ProxyConfig {
    /// Creates a single-device configuration, as assembled from command
    /// line arguments.
    pub fn single_device(device: DeviceConfig) -> Self {
        Self {
            devices: vec![device],
            logging: LoggingConfig::default(),
        }
    }

    /// Validates the whole configuration.
    ///
    /// # Errors
    ///
    /// Returns the first problem found: no devices, a bad device URL or
    /// bind address, a non-positive timeout or two devices sharing one
    /// bind address.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.devices.is_empty() {
            return Err(ConfigError::validation(
                "devices",
                "at least one device is required",
            ));
        }

        let mut binds = Vec::with_capacity(self.devices.len());
        for (i, device) in self.devices.iter().enumerate() {
            let field = format!("devices[{}]", i);
            device.validate(&field)?;

            let bind = device.listen.normalized_bind()?;
            if binds.contains(&bind) {
                return Err(ConfigError::duplicate_bind(bind));
            }
            binds.push(bind);
        }

        self.logging.validate()
    }
}

// =============================================================================
// DeviceConfig
// =============================================================================

/// One fronted device: where to reach it and where to listen for its
/// clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceConfig {
    /// Upstream device settings.
    pub modbus: ModbusSettings,

    /// Client-facing listener settings.
    pub listen: ListenSettings,
}

impl DeviceConfig {
    fn validate(&self, field: &str) -> ConfigResult<()> {
        parse_device_url(&self.modbus.url)?;

        if self.modbus.timeout <= 0.0 {
            return Err(ConfigError::validation(
                format!("{}.modbus.timeout", field),
                "must be positive",
            ));
        }
        if self.modbus.connection_time < 0.0 {
            return Err(ConfigError::validation(
                format!("{}.modbus.connection_time", field),
                "must not be negative",
            ));
        }
        Ok(())
    }

    /// Builds the device endpoint this configuration describes.
    ///
    /// # Errors
    ///
    /// Returns a URL error if the device URL is malformed or uses an
    /// unsupported scheme.
    pub fn endpoint(&self) -> ConfigResult<DeviceEndpoint> {
        let (kind, address) = parse_device_url(&self.modbus.url)?;
        Ok(DeviceEndpoint {
            kind,
            address,
            timeout: self.modbus.timeout(),
            settle_delay: self.modbus.connection_time(),
        })
    }
}

// =============================================================================
// ModbusSettings
// =============================================================================

/// Upstream device settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModbusSettings {
    /// Device URL, e.g. `plc.example.org:502` or `serial:///dev/ttyS0`.
    pub url: String,

    /// Per-request response timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: f64,

    /// Pause after connecting before the first request, in seconds.
    ///
    /// For hardware that accepts a TCP connection before it is actually
    /// ready to serve requests.
    #[serde(default = "default_connection_time")]
    pub connection_time: f64,
}

impl ModbusSettings {
    /// Creates settings for a URL with default timings.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: DEFAULT_TIMEOUT_SECS,
            connection_time: DEFAULT_CONNECTION_TIME,
        }
    }

    /// Returns the response timeout as a duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout)
    }

    /// Returns the settle delay as a duration.
    pub fn connection_time(&self) -> Duration {
        Duration::from_secs_f64(self.connection_time)
    }
}

fn default_timeout() -> f64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_connection_time() -> f64 {
    DEFAULT_CONNECTION_TIME
}

// =============================================================================
// ListenSettings
// =============================================================================

/// Client-facing listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListenSettings {
    /// Listen address, e.g. `:9502` or `127.0.0.1:9502`.
    pub bind: String,
}

impl ListenSettings {
    /// Creates listener settings for a bind address.
    pub fn new(bind: impl Into<String>) -> Self {
        Self { bind: bind.into() }
    }

    /// Returns the bind address in canonical `host:port` form.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBind`] for malformed addresses.
    pub fn normalized_bind(&self) -> ConfigResult<String> {
        normalize_bind(&self.bind)
    }
}

// =============================================================================
// LoggingConfig
// =============================================================================

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level filter (`trace`, `debug`, `info`, `warn`, `error`).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormatSetting,
}

impl LoggingConfig {
    fn validate(&self) -> ConfigResult<()> {
        match self.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "warning" | "error" => Ok(()),
            other => Err(ConfigError::validation(
                "logging.level",
                format!("unknown level '{}'", other),
            )),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormatSetting::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormatSetting {
    /// Human-readable text.
    #[default]
    Text,
    /// Structured JSON, one event per line.
    Json,
    /// Single-line compact text.
    Compact,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn device(url: &str, bind: &str) -> DeviceConfig {
        DeviceConfig {
            modbus: ModbusSettings::new(url),
            listen: ListenSettings::new(bind),
        }
    }

    #[test]
    fn test_defaults_applied() {
        let yaml = r#"
devices:
  - modbus:
      url: plc:502
    listen:
      bind: ":9502"
"#;
        let config: ProxyConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.devices[0].modbus.timeout, DEFAULT_TIMEOUT_SECS);
        assert_eq!(
            config.devices[0].modbus.connection_time,
            DEFAULT_CONNECTION_TIME
        );
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormatSetting::Text);
        config.validate().unwrap();
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let yaml = r#"
devices:
  - modbus:
      url: plc:502
      retries: 3
    listen:
      bind: ":9502"
"#;
        assert!(serde_yaml::from_str::<ProxyConfig>(yaml).is_err());
    }

    #[test]
    fn test_empty_devices_rejected() {
        let config = ProxyConfig::default();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation { .. })
        ));
    }

    #[test]
    fn test_duplicate_binds_rejected() {
        let config = ProxyConfig {
            devices: vec![device("plc-a:502", ":9502"), device("plc-b:502", "0:9502")],
            logging: LoggingConfig::default(),
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateBind { .. })
        ));
    }

    #[test]
    fn test_bad_timings_rejected() {
        let mut config = ProxyConfig::single_device(device("plc:502", ":9502"));
        config.devices[0].modbus.timeout = 0.0;
        assert!(config.validate().is_err());

        let mut config = ProxyConfig::single_device(device("plc:502", ":9502"));
        config.devices[0].modbus.connection_time = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rtu_over_tcp_rejected_at_validation() {
        let config = ProxyConfig::single_device(device("tcp+rtu://plc:502", ":9502"));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnsupportedScheme { .. })
        ));
    }

    #[test]
    fn test_endpoint_construction() {
        let mut dev = device("plc.example.org:502", ":9502");
        dev.modbus.timeout = 3.5;
        dev.modbus.connection_time = 0.25;

        let endpoint = dev.endpoint().unwrap();
        assert_eq!(endpoint.url(), "tcp://plc.example.org:502");
        assert_eq!(endpoint.timeout, Duration::from_secs_f64(3.5));
        assert_eq!(endpoint.settle_delay, Duration::from_secs_f64(0.25));
    }

    #[test]
    fn test_logging_level_validation() {
        let mut config = ProxyConfig::single_device(device("plc:502", ":9502"));
        config.logging.level = "verbose".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation { .. })
        ));
    }
}
