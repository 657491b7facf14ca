// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration for the mbmux Modbus connection multiplexer.
//!
//! Provides the configuration schema ([`ProxyConfig`]), device URL
//! parsing, bind address normalization and file loading in YAML, TOML
//! and JSON formats.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod loader;
pub mod schema;
pub mod url;

pub use error::{ConfigError, ConfigResult};
pub use loader::{load_config, ConfigFormat, ConfigLoader};
pub use schema::{
    DeviceConfig, ListenSettings, LogFormatSetting, LoggingConfig, ModbusSettings, ProxyConfig,
    DEFAULT_CONNECTION_TIME, DEFAULT_TIMEOUT_SECS,
};
pub use url::{normalize_bind, parse_device_url};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
