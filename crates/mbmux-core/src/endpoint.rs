// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Device endpoint description.
//!
//! A [`DeviceEndpoint`] identifies one upstream Modbus device: which
//! transport to use, where to reach it, the per-request response timeout
//! and the post-connect settle delay. Endpoints are built once from
//! configuration and never mutated; each is owned by exactly one gateway.

use std::fmt;
use std::time::Duration;

// =============================================================================
// Constants
// =============================================================================

/// Default serial baud rate when the URL does not specify one.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Default per-request response timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

// =============================================================================
// TransportKind
// =============================================================================

/// The transport family selected by a device URL scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    /// Plain Modbus TCP (`tcp://`).
    Tcp,
    /// RTU-framed device behind a TCP socket (`tcp+rtu://`).
    ///
    /// Requires TCP-to-RTU frame translation, which this byte-level relay
    /// does not perform; recognized but rejected at configuration time.
    TcpRtu,
    /// Local serial line (`serial://`).
    Serial,
    /// Remote serial port exposed as a raw TCP byte stream (`serial+tcp://`).
    SerialTcp,
    /// RFC2217 remote serial port (`rfc2217://`).
    ///
    /// Treated as a raw TCP byte stream; the proxy performs no RFC2217
    /// option negotiation.
    Rfc2217,
}

impl TransportKind {
    /// Returns the kind for a URL scheme, if recognized.
    pub fn from_scheme(scheme: &str) -> Option<Self> {
        match scheme {
            "tcp" => Some(Self::Tcp),
            "tcp+rtu" => Some(Self::TcpRtu),
            "serial" => Some(Self::Serial),
            "serial+tcp" => Some(Self::SerialTcp),
            "rfc2217" => Some(Self::Rfc2217),
            _ => None,
        }
    }

    /// Returns the canonical URL scheme for this kind.
    pub fn scheme(&self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::TcpRtu => "tcp+rtu",
            Self::Serial => "serial",
            Self::SerialTcp => "serial+tcp",
            Self::Rfc2217 => "rfc2217",
        }
    }

    /// Returns `true` if a live connection can be established for this kind.
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::TcpRtu)
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scheme())
    }
}

// =============================================================================
// DeviceAddress
// =============================================================================

/// Where a device is reached, per transport family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceAddress {
    /// A network host and port.
    Net {
        /// Host name or IP address.
        host: String,
        /// TCP port.
        port: u16,
    },
    /// A local serial device.
    Serial {
        /// Device path, e.g. `/dev/ttyS0`.
        path: String,
        /// Baud rate.
        baud_rate: u32,
    },
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Net { host, port } => write!(f, "{}:{}", host, port),
            Self::Serial { path, baud_rate } => write!(f, "{}@{}", path, baud_rate),
        }
    }
}

// =============================================================================
// DeviceEndpoint
// =============================================================================

/// Immutable description of one upstream Modbus device.
#[derive(Debug, Clone)]
pub struct DeviceEndpoint {
    /// Transport family.
    pub kind: TransportKind,
    /// Device address.
    pub address: DeviceAddress,
    /// Per-request response timeout (also bounds connect attempts).
    pub timeout: Duration,
    /// Pause after connecting before the first request is sent.
    ///
    /// Models hardware that needs time after TCP accept before it can
    /// process a request.
    pub settle_delay: Duration,
}

impl DeviceEndpoint {
    /// Creates a plain Modbus TCP endpoint with default timings.
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self {
            kind: TransportKind::Tcp,
            address: DeviceAddress::Net {
                host: host.into(),
                port,
            },
            timeout: DEFAULT_TIMEOUT,
            settle_delay: Duration::ZERO,
        }
    }

    /// Creates a serial endpoint with default timings.
    pub fn serial(path: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            kind: TransportKind::Serial,
            address: DeviceAddress::Serial {
                path: path.into(),
                baud_rate,
            },
            timeout: DEFAULT_TIMEOUT,
            settle_delay: Duration::ZERO,
        }
    }

    /// Sets the response timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the post-connect settle delay.
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Returns the device URL this endpoint corresponds to.
    pub fn url(&self) -> String {
        format!("{}://{}", self.kind.scheme(), self.address)
    }
}

impl fmt::Display for DeviceEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.kind.scheme(), self.address)
    }
}

// =============================================================================
// Tests
// =============================================================================
