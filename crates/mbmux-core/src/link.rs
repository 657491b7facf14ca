// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The single upstream connection to one Modbus device.
//!
//! An [`UpstreamLink`] owns at most one live stream to its device and
//! serves exactly one request at a time. Only the gateway that owns the
//! link ever touches it, so no lock guards the stream. A broken stream is
//! never repaired: any fault drops it, and the next request triggers a
//! fresh connect (including the settle delay). There is no background
//! keep-alive loop.

use std::fmt;

use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::endpoint::DeviceEndpoint;
use crate::error::{ConnectError, FrameError, ProxyError, ProxyResult};
use crate::frame::FrameReader;
use crate::transport::{transport_for, ByteStream, Transport};

// =============================================================================
// LinkState
// =============================================================================

/// Connection state of an upstream link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LinkState {
    /// No live connection.
    #[default]
    Disconnected,
    /// A connect attempt is in progress.
    Connecting,
    /// Connected and ready to serve a request.
    Connected,
}

impl LinkState {
    /// Returns `true` if the link is connected.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        };
        f.write_str(s)
    }
}

// =============================================================================
// UpstreamLink
// =============================================================================

/// The one connection to a Modbus device.
pub struct UpstreamLink {
    endpoint: DeviceEndpoint,
    transport: Box<dyn Transport>,
    reader: Option<FrameReader<Box<dyn ByteStream>>>,
    state: LinkState,
}

impl UpstreamLink {
    /// Creates a link for an endpoint, selecting the transport from its
    /// kind. No connection is opened yet; connects are lazy.
    pub fn new(endpoint: DeviceEndpoint) -> ProxyResult<Self> {
        let transport = transport_for(&endpoint)?;
        Ok(Self::with_transport(endpoint, transport))
    }

    /// Creates a link over a caller-supplied transport.
    ///
    /// This is the seam for custom transport adapters (and for tests).
    pub fn with_transport(endpoint: DeviceEndpoint, transport: Box<dyn Transport>) -> Self {
        Self {
            endpoint,
            transport,
            reader: None,
            state: LinkState::Disconnected,
        }
    }

    /// Returns the current link state.
    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Returns the endpoint this link serves.
    pub fn endpoint(&self) -> &DeviceEndpoint {
        &self.endpoint
    }

    /// Connects if not already connected.
    ///
    /// The connect attempt is bounded by the endpoint's response timeout.
    /// On success the configured settle delay elapses before the link
    /// reports ready.
    pub async fn ensure_connected(&mut self) -> ProxyResult<()> {
        if self.reader.is_some() {
            return Ok(());
        }

        self.state = LinkState::Connecting;
        let timeout = self.endpoint.timeout;

        let stream = match tokio::time::timeout(timeout, self.transport.connect()).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                self.state = LinkState::Disconnected;
                return Err(e.into());
            }
            Err(_) => {
                self.state = LinkState::Disconnected;
                return Err(
                    ConnectError::timed_out(self.transport.display_name(), timeout).into(),
                );
            }
        };

        if !self.endpoint.settle_delay.is_zero() {
            debug!(
                device = %self.transport.display_name(),
                delay = ?self.endpoint.settle_delay,
                "settle delay after connect"
            );
            tokio::time::sleep(self.endpoint.settle_delay).await;
        }

        self.reader = Some(FrameReader::new(stream));
        self.state = LinkState::Connected;
        info!(device = %self.transport.display_name(), "connected to device");
        Ok(())
    }

    /// Writes one request frame and reads exactly one response frame.
    ///
    /// The whole exchange is bounded by the endpoint's response timeout.
    /// Any failure ([`ProxyError::Timeout`], [`ProxyError::LinkBroken`] or
    /// a device-side frame error) invalidates the connection; the next
    /// caller must trigger a fresh connect.
    pub async fn send_and_receive(&mut self, frame: &Bytes) -> ProxyResult<Bytes> {
        let timeout = self.endpoint.timeout;
        let reader = self
            .reader
            .as_mut()
            .ok_or_else(|| ProxyError::link_broken("link is not connected"))?;

        let result = match tokio::time::timeout(timeout, Self::exchange(reader, frame)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ProxyError::timeout(timeout)),
        };

        if result.is_err() {
            self.disconnect();
        }
        result
    }

    async fn exchange(
        reader: &mut FrameReader<Box<dyn ByteStream>>,
        frame: &Bytes,
    ) -> ProxyResult<Bytes> {
        let stream = reader.get_mut();
        stream
            .write_all(frame)
            .await
            .map_err(|e| ProxyError::link_broken(format!("write failed: {}", e)))?;
        stream
            .flush()
            .await
            .map_err(|e| ProxyError::link_broken(format!("flush failed: {}", e)))?;

        match reader.read_frame().await {
            Ok(Some(reply)) => Ok(reply),
            Ok(None) => Err(ProxyError::link_broken("device closed the connection")),
            // A malformed device frame is a protocol error, not a transient
            // link fault, but either way the connection is unusable.
            Err(e @ (FrameError::ZeroLength | FrameError::Oversized { .. })) => {
                Err(ProxyError::Frame(e))
            }
            Err(e) => Err(ProxyError::link_broken(e.to_string())),
        }
    }

    /// Drops the current connection, if any.
    pub fn disconnect(&mut self) {
        if self.reader.take().is_some() {
            debug!(device = %self.transport.display_name(), "closing device connection");
        }
        self.state = LinkState::Disconnected;
    }

    /// Returns the transport's display name for logging.
    pub fn display_name(&self) -> String {
        self.transport.display_name()
    }
}

impl fmt::Debug for UpstreamLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamLink")
            .field("device", &self.transport.display_name())
            .field("state", &self.state)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
