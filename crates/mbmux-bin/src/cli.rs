// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI argument parsing and command definitions.
//!
//! The proxy can be driven two ways: a configuration file describing any
//! number of devices (`-c`), or a single device given directly on the
//! command line (`-b` plus `--modbus`). Subcommands:
//!
//! - `run`: start the proxy (default)
//! - `validate`: check a configuration file without starting
//! - `version`: show version information

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use mbmux_config::{DEFAULT_CONNECTION_TIME, DEFAULT_TIMEOUT_SECS};

// =============================================================================
// Main CLI Structure
// =============================================================================

/// mbmux - Modbus connection multiplexer
///
/// Lets any number of Modbus TCP clients share devices that accept only
/// one connection at a time. Requests are relayed strictly one at a time
/// per device, in arrival order.
#[derive(Parser, Debug)]
#[command(
    name = "mbmux",
    author = "Sylvex <contact@sylvex.io>",
    version = mbmux_core::VERSION,
    about = "Modbus connection multiplexer",
    long_about = None,
    propagate_version = true
)]
pub struct Cli {
    /// Configuration file path (YAML, TOML or JSON)
    #[arg(short = 'c', long = "config-file", env = "MBMUX_CONFIG", global = true)]
    pub config_file: Option<PathBuf>,

    /// Listen address for single-device mode (e.g. ":9502")
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Upstream device URL for single-device mode (e.g. "plc:502")
    #[arg(long)]
    pub modbus: Option<String>,

    /// Device response timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: f64,

    /// Pause after connecting to the device, in seconds
    #[arg(long = "modbus-connection-time", default_value_t = DEFAULT_CONNECTION_TIME)]
    pub modbus_connection_time: f64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "MBMUX_LOG_LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Log format (text, json, compact)
    #[arg(long, env = "MBMUX_LOG_FORMAT", global = true)]
    pub log_format: Option<LogFormat>,

    /// Enable quiet mode (warnings and errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

// =============================================================================
// Subcommands
// =============================================================================

/// Available subcommands for the mbmux CLI.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the proxy
    ///
    /// This is the default command when no subcommand is specified.
    Run,

    /// Validate the configuration file
    ///
    /// Parses and validates the configuration file without binding any
    /// sockets. Useful for checking configuration before deployment.
    Validate(ValidateArgs),

    /// Show detailed version information
    Version,
}

/// Arguments for the `validate` command.
#[derive(Args, Debug, Default, Clone)]
pub struct ValidateArgs {
    /// Show parsed configuration after validation
    #[arg(short, long)]
    pub show_config: bool,

    /// Output format for validation results
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

// =============================================================================
// Enums
// =============================================================================

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON format for structured logging
    Json,
    /// Compact format for minimal output
    Compact,
}

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON format for programmatic parsing
    Json,
}

// =============================================================================
// Helper Methods
// =============================================================================

impl Cli {
    /// Parse CLI arguments from the command line.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the effective command, defaulting to `Run` if none specified.
    pub fn effective_command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Run)
    }

    /// Get the effective log level based on flags, if one was forced.
    ///
    /// Returns `None` when neither a flag nor `-l` was given, in which
    /// case the configuration file's logging section applies.
    pub fn effective_log_level(&self) -> Option<&str> {
        if self.quiet {
            Some("warn")
        } else if self.verbose {
            Some("debug")
        } else {
            self.log_level.as_deref()
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command() {
        let cli = Cli::parse_from(["mbmux"]);
        assert!(cli.command.is_none());
        assert!(matches!(cli.effective_command(), Commands::Run));
    }

    #[test]
    fn test_single_device_mode() {
        let cli = Cli::parse_from(["mbmux", "-b", ":9502", "--modbus", "plc:502"]);
        assert_eq!(cli.bind.as_deref(), Some(":9502"));
        assert_eq!(cli.modbus.as_deref(), Some("plc:502"));
        assert_eq!(cli.timeout, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_timing_flags() {
        let cli = Cli::parse_from([
            "mbmux",
            "--modbus",
            "plc:502",
            "--timeout",
            "3.5",
            "--modbus-connection-time",
            "0.25",
        ]);
        assert_eq!(cli.timeout, 3.5);
        assert_eq!(cli.modbus_connection_time, 0.25);
    }

    #[test]
    fn test_config_file_path() {
        let cli = Cli::parse_from(["mbmux", "-c", "/etc/mbmux/mbmux.yaml"]);
        assert_eq!(
            cli.config_file,
            Some(PathBuf::from("/etc/mbmux/mbmux.yaml"))
        );
    }

    #[test]
    fn test_validate_command() {
        let cli = Cli::parse_from(["mbmux", "-c", "mbmux.yaml", "validate", "--show-config"]);
        if let Some(Commands::Validate(args)) = cli.command {
            assert!(args.show_config);
        } else {
            panic!("Expected Validate command");
        }
    }

    #[test]
    fn test_quiet_and_verbose() {
        let cli = Cli::parse_from(["mbmux", "-q"]);
        assert_eq!(cli.effective_log_level(), Some("warn"));

        let cli = Cli::parse_from(["mbmux", "-v"]);
        assert_eq!(cli.effective_log_level(), Some("debug"));

        let cli = Cli::parse_from(["mbmux"]);
        assert_eq!(cli.effective_log_level(), None);

        let cli = Cli::parse_from(["mbmux", "-l", "trace"]);
        assert_eq!(cli.effective_log_level(), Some("trace"));
    }
}
