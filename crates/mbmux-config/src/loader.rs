// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration file loading.
//!
//! The file format is chosen by extension: `.yaml`/`.yml`, `.toml` or
//! `.json`. [`ConfigLoader::load`] only parses; [`load_config`] parses
//! and validates in one step.

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::error::{ConfigError, ConfigResult};
use crate::schema::ProxyConfig;

// =============================================================================
// ConfigFormat
// =============================================================================

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML format.
    Yaml,
    /// TOML format.
    Toml,
    /// JSON format.
    Json,
}

impl ConfigFormat {
    /// Determines the format from a file path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnsupportedFormat`] for unknown or missing
    /// extensions.
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match ext.as_deref() {
            Some("yaml") | Some("yml") => Ok(Self::Yaml),
            Some("toml") => Ok(Self::Toml),
            Some("json") => Ok(Self::Json),
            Some(other) => Err(ConfigError::unsupported_format(other)),
            None => Err(ConfigError::unsupported_format("(no extension)")),
        }
    }

    /// Returns the canonical file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Yaml => "yaml",
            Self::Toml => "toml",
            Self::Json => "json",
        }
    }
}

// =============================================================================
// ConfigLoader
// =============================================================================

/// Loads [`ProxyConfig`] from files or strings.
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader;

impl ConfigLoader {
    /// Creates a loader.
    pub fn new() -> Self {
        Self
    }

    /// Parses a configuration file. Does not validate; callers that want
    /// a usable configuration should use [`load_config`] instead.
    ///
    /// # Errors
    ///
    /// Returns a file, format or parse error.
    pub fn load(&self, path: impl AsRef<Path>) -> ConfigResult<ProxyConfig> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }
        let content = fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;

        let format = ConfigFormat::from_path(path)?;
        let config = self
            .load_from_str(&content, format)
            .map_err(|e| match e {
                ConfigError::Serialization { message } => ConfigError::parse(path, message),
                other => other,
            })?;

        debug!(devices = config.devices.len(), "configuration parsed");
        Ok(config)
    }

    /// Parses configuration content in an explicit format.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Serialization`] on parse failure.
    pub fn load_from_str(&self, content: &str, format: ConfigFormat) -> ConfigResult<ProxyConfig> {
        match format {
            ConfigFormat::Yaml => serde_yaml::from_str(content)
                .map_err(|e| ConfigError::serialization(e.to_string())),
            ConfigFormat::Toml => {
                toml::from_str(content).map_err(|e| ConfigError::serialization(e.to_string()))
            }
            ConfigFormat::Json => serde_json::from_str(content)
                .map_err(|e| ConfigError::serialization(e.to_string())),
        }
    }
}

// =============================================================================
// Convenience Functions
// =============================================================================

/// Loads and validates a configuration file.
///
/// # Errors
///
/// Returns any loading error from [`ConfigLoader::load`] or the first
/// validation failure.
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<ProxyConfig> {
    let config = ConfigLoader::new().load(path)?;
    config.validate()?;
    Ok(config)
}

// =============================================================================
// Tests
// =============================================================================
