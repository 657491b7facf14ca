// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Transport seam between the engine and the outside world.
//!
//! The multiplexing core is written once against [`Transport`], which
//! yields a plain byte stream. Framing and serialization never depend on
//! a concrete transport, so TCP sockets, local serial lines and remote
//! serial bridges are interchangeable.

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_serial::SerialPortBuilderExt;

use crate::endpoint::{DeviceAddress, DeviceEndpoint, TransportKind};
use crate::error::ConnectError;

// =============================================================================
// ByteStream
// =============================================================================

/// A bidirectional byte stream, the only capability the core needs from
/// a transport.
pub trait ByteStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> ByteStream for T {}

// =============================================================================
// Transport Trait
// =============================================================================

/// Opens connections to one device.
///
/// A transport is a connection factory: every [`connect`](Transport::connect)
/// call yields a fresh stream, and a broken stream is simply dropped and
/// replaced by the next connect. Implementations never repair a stream in
/// place.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Establishes a new connection to the device.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError`] on refusal, resolution failure or any
    /// transport-level error.
    async fn connect(&self) -> Result<Box<dyn ByteStream>, ConnectError>;

    /// Returns a human-readable name for logging.
    fn display_name(&self) -> String;
}

// =============================================================================
// TcpTransport
// =============================================================================

/// TCP transport, also used for remote serial bridges that present a raw
/// TCP byte stream (`serial+tcp://`, `rfc2217://`).
pub struct TcpTransport {
    host: String,
    port: u16,
}

impl TcpTransport {
    /// Creates a TCP transport for a host and port.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    fn target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn connect(&self) -> Result<Box<dyn ByteStream>, ConnectError> {
        let target = self.target();

        let mut addrs = tokio::net::lookup_host(&target)
            .await
            .map_err(|_| ConnectError::dns_failed(&self.host))?;
        let addr = addrs
            .next()
            .ok_or_else(|| ConnectError::dns_failed(&self.host))?;

        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| ConnectError::from_io(&target, e))?;

        // Request/response traffic; do not batch small writes.
        stream.set_nodelay(true).ok();

        Ok(Box::new(stream))
    }

    fn display_name(&self) -> String {
        self.target()
    }
}

impl std::fmt::Debug for TcpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpTransport")
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}

// =============================================================================
// SerialTransport
// =============================================================================

/// Local serial line transport via tokio-serial.
pub struct SerialTransport {
    path: String,
    baud_rate: u32,
}

impl SerialTransport {
    /// Creates a serial transport for a device path and baud rate.
    pub fn new(path: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            path: path.into(),
            baud_rate,
        }
    }
}

#[async_trait]
impl Transport for SerialTransport {
    async fn connect(&self) -> Result<Box<dyn ByteStream>, ConnectError> {
        let stream = tokio_serial::new(&self.path, self.baud_rate)
            .open_native_async()
            .map_err(|e| {
                ConnectError::io(
                    &self.path,
                    std::io::Error::new(std::io::ErrorKind::Other, e),
                )
            })?;
        Ok(Box::new(stream))
    }

    fn display_name(&self) -> String {
        format!("{}@{}", self.path, self.baud_rate)
    }
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("path", &self.path)
            .field("baud_rate", &self.baud_rate)
            .finish()
    }
}

// =============================================================================
// Transport Selection
// =============================================================================

/// Builds the transport for a device endpoint.
///
/// # Errors
///
/// Returns [`ConnectError::Unsupported`] for transport kinds the relay
/// cannot serve (`tcp+rtu://`, which would require frame translation).
/// Configuration validation rejects these earlier; this is the backstop.
pub fn transport_for(endpoint: &DeviceEndpoint) -> Result<Box<dyn Transport>, ConnectError> {
    match (&endpoint.kind, &endpoint.address) {
        (TransportKind::TcpRtu, _) => Err(ConnectError::unsupported(
            endpoint.kind.scheme(),
            "RTU frame translation is not performed by a byte-level relay",
        )),
        (_, DeviceAddress::Net { host, port }) => Ok(Box::new(TcpTransport::new(host, *port))),
        (_, DeviceAddress::Serial { path, baud_rate }) => {
            Ok(Box::new(SerialTransport::new(path, *baud_rate)))
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::DeviceEndpoint;

    #[test]
    fn test_display_names() {
        assert_eq!(TcpTransport::new("plc", 502).display_name(), "plc:502");
        assert_eq!(
            SerialTransport::new("/dev/ttyS0", 19200).display_name(),
            "/dev/ttyS0@19200"
        );
    }

    #[test]
    fn test_transport_selection() {
        let endpoint = DeviceEndpoint::tcp("plc", 502);
        assert!(transport_for(&endpoint).is_ok());

        let endpoint = DeviceEndpoint::serial("/dev/ttyS0", 9600);
        assert!(transport_for(&endpoint).is_ok());

        let mut endpoint = DeviceEndpoint::tcp("plc", 502);
        endpoint.kind = TransportKind::TcpRtu;
        assert!(matches!(
            transport_for(&endpoint),
            Err(ConnectError::Unsupported { .. })
        ));
    }

    #[tokio::test]
    async fn test_tcp_connect_refused() {
        // Port 1 is essentially never listening on loopback.
        let transport = TcpTransport::new("127.0.0.1", 1);
        match transport.connect().await {
            Err(ConnectError::Refused { target, .. }) => assert_eq!(target, "127.0.0.1:1"),
            Err(ConnectError::Io { .. }) => {} // some platforms report differently
            other => panic!("expected connect failure, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_tcp_connect_success() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let transport = TcpTransport::new("127.0.0.1", port);
        let stream = transport.connect().await;
        assert!(stream.is_ok());
    }
}
