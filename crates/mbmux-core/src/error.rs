// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error types for the multiplexing engine.
//!
//! The taxonomy follows the fault domains of the proxy:
//!
//! ```text
//! ProxyError
//! ├── Frame        - malformed or oversized frame on a stream
//! ├── Connect      - upstream connect failed
//! ├── Timeout      - no complete device response within the window
//! ├── LinkBroken   - device connection dropped or errored mid-exchange
//! ├── Bind         - listen address unavailable at startup
//! └── ShuttingDown - request rejected because the proxy is stopping
//! ```
//!
//! Frame and link errors are local to the affected connection or request;
//! they never propagate to unrelated clients or other devices. `Timeout`,
//! `LinkBroken` and `Connect` all invalidate the current upstream
//! connection, which is recreated lazily on the next request.

use std::time::Duration;

use thiserror::Error;
use tracing::Level;

/// Result type alias for proxy operations.
pub type ProxyResult<T> = Result<T, ProxyError>;

// =============================================================================
// ProxyError - Main Error Type
// =============================================================================

/// The main error type for proxy operations.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Malformed or oversized frame on a client or device stream.
    #[error("{0}")]
    Frame(#[from] FrameError),

    /// Upstream connect failed.
    #[error("{0}")]
    Connect(#[from] ConnectError),

    /// No complete device response within the configured window.
    #[error("no device response within {timeout:?}")]
    Timeout {
        /// The configured response timeout.
        timeout: Duration,
    },

    /// Device connection dropped or errored mid-exchange.
    #[error("device link broken: {reason}")]
    LinkBroken {
        /// What broke the link.
        reason: String,
    },

    /// Listen address unavailable at startup.
    #[error("{0}")]
    Bind(#[from] BindError),

    /// The proxy is shutting down and no longer accepts requests.
    #[error("proxy is shutting down")]
    ShuttingDown,
}

impl ProxyError {
    /// Creates a timeout error.
    #[inline]
    pub fn timeout(timeout: Duration) -> Self {
        Self::Timeout { timeout }
    }

    /// Creates a broken-link error.
    #[inline]
    pub fn link_broken(reason: impl Into<String>) -> Self {
        Self::LinkBroken {
            reason: reason.into(),
        }
    }

    /// Returns `true` if this error invalidates the upstream connection.
    ///
    /// After a link fault the gateway drops the connection and the next
    /// request triggers a fresh connect.
    pub fn is_link_fault(&self) -> bool {
        matches!(
            self,
            Self::Connect(_) | Self::Timeout { .. } | Self::LinkBroken { .. }
        )
    }

    /// Returns the severity this error should be logged at.
    pub fn log_level(&self) -> Level {
        match self {
            // Fatal at startup.
            Self::Bind(_) => Level::ERROR,
            // Per-request faults; the service loop keeps going.
            Self::Frame(_) | Self::Connect(_) | Self::Timeout { .. } | Self::LinkBroken { .. } => {
                Level::WARN
            }
            Self::ShuttingDown => Level::DEBUG,
        }
    }
}

// =============================================================================
// FrameError
// =============================================================================

/// Errors detected by the frame codec.
///
/// Any of these force the hosting connection (client or device) to be
/// torn down; a stream that produced a malformed frame is never repaired.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The MBAP header declares a length of zero.
    #[error("frame header declares zero length")]
    ZeroLength,

    /// The declared frame length exceeds the Modbus TCP maximum.
    #[error("frame length {declared} exceeds the {max}-byte maximum")]
    Oversized {
        /// The length field value from the header.
        declared: usize,
        /// The maximum allowed length field value.
        max: usize,
    },

    /// The stream closed in the middle of a frame.
    #[error("stream closed mid-frame ({got} of {want} bytes)")]
    Truncated {
        /// Bytes buffered when the stream closed.
        got: usize,
        /// Bytes needed for the complete frame.
        want: usize,
    },

    /// Reading from the stream failed.
    #[error("stream read failed: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// ConnectError
// =============================================================================

/// Errors establishing the upstream device connection.
///
/// Connect failures are surfaced to the one pending request that
/// triggered the attempt; they are not retried internally.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// The device refused the connection.
    #[error("connection refused by {target}")]
    Refused {
        /// The device address.
        target: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Host name resolution failed.
    #[error("failed to resolve device host '{host}'")]
    DnsFailed {
        /// The host name that could not be resolved.
        host: String,
    },

    /// The connection attempt did not complete in time.
    #[error("connecting to {target} timed out after {timeout:?}")]
    TimedOut {
        /// The device address.
        target: String,
        /// The connect timeout.
        timeout: Duration,
    },

    /// The endpoint's transport kind cannot be connected.
    #[error("transport '{scheme}' is not supported: {message}")]
    Unsupported {
        /// The URL scheme of the transport.
        scheme: String,
        /// Why it is not supported.
        message: String,
    },

    /// Any other transport-level error.
    #[error("failed to open {target}: {source}")]
    Io {
        /// The device address or path.
        target: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl ConnectError {
    /// Creates a refused error.
    pub fn refused(target: impl Into<String>, source: std::io::Error) -> Self {
        Self::Refused {
            target: target.into(),
            source,
        }
    }

    /// Creates a DNS failure error.
    pub fn dns_failed(host: impl Into<String>) -> Self {
        Self::DnsFailed { host: host.into() }
    }

    /// Creates a connect-timeout error.
    pub fn timed_out(target: impl Into<String>, timeout: Duration) -> Self {
        Self::TimedOut {
            target: target.into(),
            timeout,
        }
    }

    /// Creates an unsupported-transport error.
    pub fn unsupported(scheme: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unsupported {
            scheme: scheme.into(),
            message: message.into(),
        }
    }

    /// Creates a transport I/O error.
    pub fn io(target: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            target: target.into(),
            source,
        }
    }

    /// Classifies an I/O error from a connect attempt.
    pub fn from_io(target: impl Into<String>, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::ConnectionRefused => Self::refused(target, source),
            _ => Self::io(target, source),
        }
    }
}

// =============================================================================
// BindError
// =============================================================================

/// Errors binding a listen address.
///
/// Binding happens once at startup and is fatal for the affected device;
/// it is never retried.
#[derive(Debug, Error)]
pub enum BindError {
    /// The listen address is already in use.
    #[error("listen address {addr} is already in use")]
    AddressInUse {
        /// The configured bind address.
        addr: String,
    },

    /// Any other bind failure.
    #[error("failed to bind {addr}: {source}")]
    Io {
        /// The configured bind address.
        addr: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl BindError {
    /// Classifies an I/O error from a bind attempt.
    pub fn from_io(addr: impl Into<String>, source: std::io::Error) -> Self {
        let addr = addr.into();
        match source.kind() {
            std::io::ErrorKind::AddrInUse => Self::AddressInUse { addr },
            _ => Self::Io { addr, source },
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
    fn test_link_fault_classification() {
        assert!(ProxyError::timeout(Duration::from_secs(1)).is_link_fault());
        assert!(ProxyError::link_broken("reset by peer").is_link_fault());
        assert!(ProxyError::Connect(ConnectError::dns_failed("plc")).is_link_fault());

        assert!(!ProxyError::Frame(FrameError::ZeroLength).is_link_fault());
        assert!(!ProxyError::ShuttingDown.is_link_fault());
    }

    #[test]
    fn test_log_levels() {
        let bind = ProxyError::Bind(BindError::AddressInUse {
            addr: "0.0.0.0:502".into(),
        });
        assert_eq!(bind.log_level(), Level::ERROR);
        assert_eq!(
            ProxyError::timeout(Duration::from_secs(1)).log_level(),
            Level::WARN
        );
        assert_eq!(ProxyError::ShuttingDown.log_level(), Level::DEBUG);
    }

    #[test]
    fn test_display_strings() {
        let err = ProxyError::Frame(FrameError::Oversized {
            declared: 1000,
            max: 254,
        });
        assert_eq!(
            err.to_string(),
            "frame length 1000 exceeds the 254-byte maximum"
        );

        let err = ProxyError::link_broken("connection reset");
        assert_eq!(err.to_string(), "device link broken: connection reset");
    }

    #[test]
    fn test_bind_error_classification() {
        let err = BindError::from_io(
            "127.0.0.1:502",
            std::io::Error::new(std::io::ErrorKind::AddrInUse, "in use"),
        );
        assert!(matches!(err, BindError::AddressInUse { .. }));

        let err = BindError::from_io(
            "127.0.0.1:502",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, BindError::Io { .. }));
    }

    #[test]
    fn test_connect_error_classification() {
        let err = ConnectError::from_io(
            "plc:502",
            std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"),
        );
        assert!(matches!(err, ConnectError::Refused { .. }));
        assert_eq!(err.to_string(), "connection refused by plc:502");
    }
}
