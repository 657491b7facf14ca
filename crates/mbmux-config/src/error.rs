// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration error types for mbmux-config.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration-related errors.
///
/// Covers file loading, parsing, device URL interpretation and
/// validation of the assembled configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to parse a configuration file.
    #[error("Failed to parse config file '{path}': {message}")]
    Parse {
        /// Path to the configuration file.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Configuration validation failed.
    #[error("Validation failed for '{field}': {message}")]
    Validation {
        /// The field that failed validation.
        field: String,
        /// Error message.
        message: String,
    },

    /// File I/O error.
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        /// Path to the file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// File not found.
    #[error("File not found: {path}")]
    FileNotFound {
        /// The path that was not found.
        path: PathBuf,
    },

    /// A device URL could not be interpreted.
    #[error("Invalid device URL '{url}': {message}")]
    InvalidUrl {
        /// The offending URL.
        url: String,
        /// Error message.
        message: String,
    },

    /// A device URL uses a scheme the relay cannot serve.
    #[error("Unsupported URL scheme '{scheme}': {message}")]
    UnsupportedScheme {
        /// The offending scheme.
        scheme: String,
        /// Error message.
        message: String,
    },

    /// A bind address could not be interpreted.
    #[error("Invalid bind address '{bind}': {message}")]
    InvalidBind {
        /// The offending bind address.
        bind: String,
        /// Error message.
        message: String,
    },

    /// Two devices declare the same bind address.
    #[error("Duplicate bind address: {bind}")]
    DuplicateBind {
        /// The duplicated bind address.
        bind: String,
    },

    /// Unsupported configuration file format.
    #[error("Unsupported configuration format: {format}")]
    UnsupportedFormat {
        /// The unsupported format.
        format: String,
    },

    /// Serialization error independent of a file path.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message.
        message: String,
    },
}

impl ConfigError {
    /// Creates a parse error.
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a validation error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a file not found error.
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Creates an unsupported scheme error.
    pub fn unsupported_scheme(scheme: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UnsupportedScheme {
            scheme: scheme.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid bind address error.
    pub fn invalid_bind(bind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidBind {
            bind: bind.into(),
            message: message.into(),
        }
    }

    /// Creates a duplicate bind error.
    pub fn duplicate_bind(bind: impl Into<String>) -> Self {
        Self::DuplicateBind { bind: bind.into() }
    }

    /// Creates an unsupported format error.
    pub fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    /// Creates a serialization error.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Returns `true` if this error is related to file I/O.
    pub fn is_io_error(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::FileNotFound { .. })
    }

    /// Returns the error type as a string for logging.
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Parse { .. } => "parse",
            Self::Validation { .. } => "validation",
            Self::Io { .. } => "io",
            Self::FileNotFound { .. } => "file_not_found",
            Self::InvalidUrl { .. } => "invalid_url",
            Self::UnsupportedScheme { .. } => "unsupported_scheme",
            Self::InvalidBind { .. } => "invalid_bind",
            Self::DuplicateBind { .. } => "duplicate_bind",
            Self::UnsupportedFormat { .. } => "unsupported_format",
            Self::Serialization { .. } => "serialization",
        }
    }
}

/// A Result type with ConfigError.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let error = ConfigError::validation("timeout", "must be positive");
        assert!(matches!(error, ConfigError::Validation { .. }));
        assert_eq!(error.error_type(), "validation");

        let error = ConfigError::unsupported_scheme("tcp+rtu", "frame translation required");
        assert!(matches!(error, ConfigError::UnsupportedScheme { .. }));
        assert_eq!(error.error_type(), "unsupported_scheme");

        let error = ConfigError::duplicate_bind("0.0.0.0:502");
        assert_eq!(error.error_type(), "duplicate_bind");
    }

    #[test]
    fn test_is_io_error() {
        let error = ConfigError::io(
            "mbmux.yaml",
            std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        );
        assert!(error.is_io_error());
        assert!(ConfigError::file_not_found("mbmux.yaml").is_io_error());
        assert!(!ConfigError::validation("x", "y").is_io_error());
    }

    #[test]
    fn test_display_messages() {
        let error = ConfigError::invalid_url("weird://", "missing host");
        assert!(error.to_string().contains("weird://"));

        let error = ConfigError::invalid_bind("nonsense", "missing port");
        assert!(error.to_string().contains("nonsense"));
    }
}
