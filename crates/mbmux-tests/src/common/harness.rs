// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Harness
//!
//! [`ProxyHarness`] runs one bridge against a device address on
//! ephemeral loopback ports; [`TestClient`] speaks raw Modbus TCP to
//! the proxy the way an external client library would.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use mbmux_core::{Bridge, DeviceEndpoint, ProxyResult};

// =============================================================================
// ProxyHarness
// =============================================================================

/// Default device timeout for tests, short enough that timeout tests
/// finish quickly.
pub const TEST_TIMEOUT: Duration = Duration::from_millis(500);

/// One running bridge on an ephemeral port.
pub struct ProxyHarness {
    proxy_addr: SocketAddr,
    shutdown_tx: broadcast::Sender<()>,
    serve_task: JoinHandle<ProxyResult<()>>,
}

impl ProxyHarness {
    /// Starts a bridge fronting a TCP device with the default test
    /// timeout.
    pub async fn start(device_addr: SocketAddr) -> Self {
        Self::start_with_endpoint(
            DeviceEndpoint::tcp(device_addr.ip().to_string(), device_addr.port())
                .with_timeout(TEST_TIMEOUT),
        )
        .await
    }

    /// Starts a bridge for an arbitrary endpoint.
    pub async fn start_with_endpoint(endpoint: DeviceEndpoint) -> Self {
        let bridge = Bridge::bind("127.0.0.1:0", endpoint).await.unwrap();
        let proxy_addr = bridge.local_addr();

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let serve_task = tokio::spawn(bridge.serve(shutdown_rx));

        Self {
            proxy_addr,
            shutdown_tx,
            serve_task,
        }
    }

    /// Returns the proxy's listen address.
    pub fn addr(&self) -> SocketAddr {
        self.proxy_addr
    }

    /// Connects a new client to the proxy.
    pub async fn client(&self) -> TestClient {
        TestClient::connect(self.proxy_addr).await
    }

    /// Signals shutdown and waits for the bridge to stop.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        self.serve_task.await.unwrap().unwrap();
    }
}

// =============================================================================
// TestClient
// =============================================================================

/// A raw Modbus TCP client.
pub struct TestClient {
    stream: TcpStream,
}

impl TestClient {
    /// Connects to an address.
    pub async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        stream.set_nodelay(true).ok();
        Self { stream }
    }

    /// Sends raw bytes.
    pub async fn send(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).await.unwrap();
    }

    /// Reads exactly one frame using the MBAP length prefix.
    pub async fn read_frame(&mut self) -> std::io::Result<Vec<u8>> {
        let mut prefix = [0u8; 6];
        self.stream.read_exact(&mut prefix).await?;
        let body_len = u16::from_be_bytes([prefix[4], prefix[5]]) as usize;

        let mut frame = vec![0u8; 6 + body_len];
        frame[..6].copy_from_slice(&prefix);
        self.stream.read_exact(&mut frame[6..]).await?;
        Ok(frame)
    }

    /// Sends a request and waits for its reply.
    pub async fn exchange(&mut self, request: &[u8]) -> std::io::Result<Vec<u8>> {
        self.send(request).await;
        self.read_frame().await
    }

    /// Asserts that the connection closes without delivering more data.
    pub async fn expect_closed(mut self) {
        let mut buf = Vec::new();
        let n = self.stream.read_to_end(&mut buf).await.unwrap_or(0);
        assert_eq!(n, 0, "expected a bare close, got {} bytes", n);
    }
}
