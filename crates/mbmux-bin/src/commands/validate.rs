// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `validate` command.

use crate::cli::{Cli, OutputFormat, ValidateArgs};
use crate::error::{BinError, BinResult};
use crate::runtime::build_config;

/// Executes the `validate` command to check a configuration.
pub fn validate(cli: &Cli, args: ValidateArgs) -> BinResult<()> {
    if let Some(path) = &cli.config_file {
        if !path.exists() {
            return Err(BinError::config(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }
    }

    let config = build_config(cli)?;

    let source = cli
        .config_file
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(command line)".to_string());

    match args.format {
        OutputFormat::Text => {
            println!("Configuration is valid: {}", source);
            println!();
            println!("Devices:");
            for device in &config.devices {
                let bind = device.listen.normalized_bind()?;
                println!(
                    "  {} -> {} (timeout {}s, connection time {}s)",
                    bind, device.modbus.url, device.modbus.timeout, device.modbus.connection_time
                );
            }
            println!();
            println!("Logging: {} ({:?})", config.logging.level, config.logging.format);

            if args.show_config {
                println!();
                println!("Parsed configuration:");
                println!(
                    "{}",
                    serde_yaml::to_string(&config)
                        .unwrap_or_else(|_| "(serialization error)".to_string())
                );
            }
        }
        OutputFormat::Json => {
            let devices: Vec<_> = config
                .devices
                .iter()
                .map(|device| {
                    serde_json::json!({
                        "bind": device.listen.bind,
                        "url": device.modbus.url,
                        "timeout": device.modbus.timeout,
                        "connection_time": device.modbus.connection_time,
                    })
                })
                .collect();

            let output = serde_json::json!({
                "valid": true,
                "source": source,
                "device_count": config.devices.len(),
                "devices": devices,
                "config": if args.show_config { Some(&config) } else { None },
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&output)
                    .unwrap_or_else(|_| "(serialization error)".to_string())
            );
        }
    }

    Ok(())
}
