// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Proxy runtime orchestration.
//!
//! The runtime hosts one [`Bridge`] per configured device. All listen
//! sockets are bound before any bridge starts serving, so a taken
//! address fails the whole process immediately instead of leaving a
//! partial deployment running. Once serving, bridges are independent:
//! an unreachable device affects only its own clients.

use std::path::Path;

use tracing::{info, warn};

use mbmux_config::{
    load_config, DeviceConfig, ListenSettings, ModbusSettings, ProxyConfig,
};
use mbmux_core::Bridge;

use crate::cli::Cli;
use crate::error::{BinError, BinResult};
use crate::shutdown::ShutdownCoordinator;

// =============================================================================
// ProxyRuntime
// =============================================================================

/// The main runtime hosting every configured bridge.
pub struct ProxyRuntime {
    config: ProxyConfig,
    shutdown: ShutdownCoordinator,
}

impl ProxyRuntime {
    /// Creates a runtime for a validated configuration.
    pub fn new(config: ProxyConfig) -> Self {
        Self {
            config,
            shutdown: ShutdownCoordinator::new(),
        }
    }

    /// Returns the shutdown coordinator, e.g. to trigger shutdown from
    /// somewhere other than an OS signal.
    pub fn shutdown_coordinator(&self) -> ShutdownCoordinator {
        self.shutdown.clone()
    }

    /// Runs the proxy until shutdown is signaled.
    ///
    /// # Errors
    ///
    /// Returns a config error for an invalid device entry and a bind
    /// error if any listen address cannot be bound. Both are fatal before
    /// any traffic is served; after startup only shutdown stops the run.
    pub async fn run(self) -> BinResult<()> {
        info!(version = mbmux_core::VERSION, "starting mbmux");

        // Bind everything before serving anything.
        let mut bridges = Vec::with_capacity(self.config.devices.len());
        for device in &self.config.devices {
            let endpoint = device.endpoint()?;
            let bind = device.listen.normalized_bind()?;
            bridges.push(Bridge::bind(&bind, endpoint).await?);
        }

        let mut tasks = Vec::with_capacity(bridges.len());
        for bridge in bridges {
            let shutdown_rx = self.shutdown.subscribe();
            tasks.push(tokio::spawn(bridge.serve(shutdown_rx)));
        }

        info!(devices = tasks.len(), "mbmux is ready");
        self.shutdown.wait_for_shutdown().await;

        for task in tasks {
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "bridge ended with error"),
                Err(e) => warn!(error = %e, "bridge task panicked"),
            }
        }

        info!("mbmux shutdown complete");
        Ok(())
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for constructing the proxy runtime.
pub struct RuntimeBuilder {
    config_path: Option<std::path::PathBuf>,
    config: Option<ProxyConfig>,
}

impl RuntimeBuilder {
    /// Creates a new runtime builder.
    pub fn new() -> Self {
        Self {
            config_path: None,
            config: None,
        }
    }

    /// Sets the configuration file path.
    pub fn config_path(mut self, path: impl AsRef<Path>) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the configuration directly.
    pub fn config(mut self, config: ProxyConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Builds the runtime.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if neither a configuration nor a
    /// path was provided, or if loading the file fails.
    pub fn build(self) -> BinResult<ProxyRuntime> {
        let config = match self.config {
            Some(cfg) => cfg,
            None => {
                let path = self
                    .config_path
                    .ok_or_else(|| BinError::config("No configuration provided"))?;
                load_config(&path)?
            }
        };
        Ok(ProxyRuntime::new(config))
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Configuration Assembly
// =============================================================================

/// Listen address used when `--modbus` is given without `--bind`.
pub const DEFAULT_BIND: &str = ":502";

/// Assembles the effective configuration from CLI arguments.
///
/// A configuration file (`-c`) describes any number of devices; without
/// one, `--modbus` (plus optional `-b`, `--timeout` and
/// `--modbus-connection-time`) describes a single device.
///
/// # Errors
///
/// Returns a configuration error when neither source is given, and any
/// loading or validation error otherwise.
pub fn build_config(cli: &Cli) -> BinResult<ProxyConfig> {
    if let Some(path) = &cli.config_file {
        return Ok(load_config(path)?);
    }

    let Some(url) = &cli.modbus else {
        return Err(BinError::config(
            "either --config-file or --modbus is required",
        ));
    };

    let device = DeviceConfig {
        modbus: ModbusSettings {
            url: url.clone(),
            timeout: cli.timeout,
            connection_time: cli.modbus_connection_time,
        },
        listen: ListenSettings::new(
            cli.bind.clone().unwrap_or_else(|| DEFAULT_BIND.to_string()),
        ),
    };

    let config = ProxyConfig::single_device(device);
    config.validate().map_err(BinError::Config)?;
    Ok(config)
}

// =============================================================================
// Tests
// =============================================================================
