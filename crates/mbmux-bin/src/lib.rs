// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # mbmux-bin
//!
//! CLI binary for the mbmux Modbus connection multiplexer.
//!
//! Provides argument parsing with clap, logging initialization, graceful
//! shutdown handling and the runtime that hosts one bridge per
//! configured device.
//!
//! ## Usage
//!
//! ```bash
//! # Front a single device from the command line
//! mbmux -b :9502 --modbus plc.example.org:502
//!
//! # Front several devices from a configuration file
//! mbmux -c mbmux.yaml
//!
//! # Validate a configuration file
//! mbmux -c mbmux.yaml validate
//!
//! # Show version information
//! mbmux version
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Modules
// =============================================================================

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod runtime;
pub mod shutdown;

// =============================================================================
// Re-exports
// =============================================================================

pub use cli::{Cli, Commands};
pub use error::{BinError, BinResult};
pub use logging::init_logging;
pub use runtime::{ProxyRuntime, RuntimeBuilder};
pub use shutdown::ShutdownCoordinator;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
