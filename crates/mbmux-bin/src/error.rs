// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error types for the mbmux binary.

use thiserror::Error;

/// Result type alias for mbmux-bin operations.
pub type BinResult<T> = Result<T, BinError>;

/// Errors that can occur in the mbmux binary.
#[derive(Debug, Error)]
pub enum BinError {
    /// Configuration error raised by the binary itself.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Config parsing or validation error.
    #[error("Config error: {0}")]
    Config(#[from] mbmux_config::ConfigError),

    /// A listen address could not be bound.
    #[error("Bind error: {0}")]
    Bind(#[from] mbmux_core::BindError),

    /// Proxy engine error.
    #[error("Proxy error: {0}")]
    Proxy(#[from] mbmux_core::ProxyError),

    /// Runtime error.
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),
}

impl BinError {
    /// Creates a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Creates a runtime error.
    pub fn runtime(msg: impl Into<String>) -> Self {
        Self::Runtime(msg.into())
    }

    /// Creates an I/O error.
    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    /// Returns the exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration(_) | Self::Config(_) => 1,
            Self::Bind(_) => 2,
            Self::Proxy(_) | Self::Runtime(_) => 3,
            Self::Io(_) => 4,
        }
    }
}

impl From<std::io::Error> for BinError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

// =============================================================================
// Error Reporting
// =============================================================================

/// Reports an error with its cause chain.
pub fn report_error(error: &BinError) {
    eprintln!("Error: {}", error);

    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        eprintln!("  Caused by: {}", cause);
        source = cause.source();
    }
}

/// Reports an error and exits with the appropriate code.
pub fn report_error_and_exit(error: BinError) -> ! {
    report_error(&error);
    std::process::exit(error.exit_code())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = BinError::config("missing device");
        assert_eq!(err.to_string(), "Configuration error: missing device");
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(BinError::config("x").exit_code(), 1);
        assert_eq!(
            BinError::from(mbmux_config::ConfigError::validation("devices", "empty")).exit_code(),
            1
        );
        assert_eq!(
            BinError::from(mbmux_core::BindError::AddressInUse {
                addr: "0.0.0.0:502".to_string()
            })
            .exit_code(),
            2
        );
        assert_eq!(BinError::runtime("x").exit_code(), 3);
        assert_eq!(BinError::io("x").exit_code(), 4);
    }
}
