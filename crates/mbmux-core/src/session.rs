// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Per-client connection handling.
//!
//! A [`ClientSession`] owns one accepted client socket. It reads request
//! frames, submits each to the device's gateway and writes the device's
//! response back verbatim. On any failure the session simply closes the
//! client socket; the proxy never fabricates a Modbus exception response
//! on a device's behalf, so a closed connection is the only failure
//! signal a client ever sees.
//!
//! Sessions pipeline naturally: a client may send several requests
//! back-to-back and the session submits each in arrival order, so queue
//! positions in the gateway preserve the order within one client as well
//! as across clients.

use std::net::SocketAddr;

use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::{debug, warn, Level};

use crate::error::ProxyError;
use crate::frame::{FrameHeader, FrameReader};
use crate::gateway::GatewayHandle;

/// One client connection bound to one device gateway.
pub struct ClientSession {
    peer: SocketAddr,
    reader: FrameReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    gateway: GatewayHandle,
}

impl ClientSession {
    /// Wraps an accepted client socket.
    pub fn new(stream: TcpStream, peer: SocketAddr, gateway: GatewayHandle) -> Self {
        let (read_half, write_half) = stream.into_split();
        Self {
            peer,
            reader: FrameReader::new(read_half),
            writer: write_half,
            gateway,
        }
    }

    /// Serves the client until it disconnects or a failure closes the
    /// session. Always returns; errors are logged, not propagated, since
    /// one session's fate concerns nobody else.
    pub async fn run(mut self) {
        debug!(peer = %self.peer, "client connected");

        loop {
            let frame = match self.reader.read_frame().await {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    debug!(peer = %self.peer, "client disconnected");
                    break;
                }
                Err(e) => {
                    warn!(peer = %self.peer, error = %e, "dropping client after bad frame");
                    break;
                }
            };

            let header = FrameHeader::parse(&frame);
            let reply = match self.gateway.submit(frame).await {
                Ok(reply) => reply,
                Err(e) => {
                    // The client learns of the failure by losing its
                    // connection, nothing else.
                    self.log_failure(&e, header);
                    break;
                }
            };

            if let Err(e) = self.writer.write_all(&reply).await {
                debug!(peer = %self.peer, error = %e, "client write failed");
                break;
            }
            if let Err(e) = self.writer.flush().await {
                debug!(peer = %self.peer, error = %e, "client flush failed");
                break;
            }
        }

        let _ = self.writer.shutdown().await;
    }

    fn log_failure(&self, err: &ProxyError, header: Option<FrameHeader>) {
        let txn = header.map(|h| h.transaction_id).unwrap_or_default();
        match err.log_level() {
            Level::WARN => {
                warn!(peer = %self.peer, txn, error = %err, "closing client after upstream failure")
            }
            _ => {
                debug!(peer = %self.peer, txn, error = %err, "closing client after upstream failure")
            }
        }
    }
}

impl std::fmt::Debug for ClientSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSession")
            .field("peer", &self.peer)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::DeviceEndpoint;
    use crate::error::ConnectError;
    use crate::gateway::Gateway;
    use crate::link::UpstreamLink;
    use crate::transport::{ByteStream, Transport};
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;
    use tokio::sync::broadcast;

    const REQ: &[u8] = &[
        0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01, 0x03, 0x00, 0x00, 0x00, 0x04,
    ];
    const REP: &[u8] = &[
        0x00, 0x01, 0x00, 0x00, 0x00, 0x0B, 0x01, 0x03, 0x08, 0x00, 0x01, 0x00, 0x02, 0x00, 0x03,
        0x00, 0x04,
    ];

    /// Device that answers every request with the canned reply.
    struct CannedTransport;

    #[async_trait]
    impl Transport for CannedTransport {
        async fn connect(&self) -> Result<Box<dyn ByteStream>, ConnectError> {
            let (proxy_side, mut device_side) = tokio::io::duplex(1024);
            tokio::spawn(async move {
                let mut reader = FrameReader::new(&mut device_side);
                while let Ok(Some(_)) = reader.read_frame().await {
                    if reader.get_mut().write_all(REP).await.is_err() {
                        break;
                    }
                }
            });
            Ok(Box::new(proxy_side))
        }

        fn display_name(&self) -> String {
            "canned-device".to_string()
        }
    }

    /// Device that is never reachable.
    struct DeadTransport;

    #[async_trait]
    impl Transport for DeadTransport {
        async fn connect(&self) -> Result<Box<dyn ByteStream>, ConnectError> {
            Err(ConnectError::dns_failed("dead-device"))
        }

        fn display_name(&self) -> String {
            "dead-device".to_string()
        }
    }

    async fn session_fixture(
        transport: Box<dyn Transport>,
    ) -> (TcpStream, tokio::task::JoinHandle<()>, broadcast::Sender<()>) {
        let link = UpstreamLink::with_transport(
            DeviceEndpoint::tcp("device", 502).with_timeout(Duration::from_secs(2)),
            transport,
        );
        let (handle, gateway) = Gateway::new(link);
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        tokio::spawn(gateway.run(shutdown_rx));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let session_task = tokio::spawn(async move {
            let (stream, peer) = listener.accept().await.unwrap();
            ClientSession::new(stream, peer, handle).run().await;
        });

        let client = TcpStream::connect(addr).await.unwrap();
        (client, session_task, shutdown_tx)
    }

    #[tokio::test]
    async fn test_request_reply_relay() {
        let (mut client, session, _shutdown) = session_fixture(Box::new(CannedTransport)).await;

        client.write_all(REQ).await.unwrap();
        let mut reply = vec![0u8; REP.len()];
        client.read_exact(&mut reply).await.unwrap();
        assert_eq!(reply, REP);

        // Session ends cleanly when the client hangs up.
        drop(client);
        session.await.unwrap();
    }

    #[tokio::test]
    async fn test_upstream_failure_closes_client() {
        let (mut client, session, _shutdown) = session_fixture(Box::new(DeadTransport)).await;

        client.write_all(REQ).await.unwrap();

        // No exception frame, just EOF.
        let mut buf = Vec::new();
        let n = client.read_to_end(&mut buf).await.unwrap();
        assert_eq!(n, 0);
        session.await.unwrap();
    }

    #[tokio::test]
    async fn test_malformed_client_frame_closes_connection() {
        let (mut client, session, _shutdown) = session_fixture(Box::new(CannedTransport)).await;

        // Zero-length MBAP header.
        client
            .write_all(&[0x00, 0x01, 0x00, 0x00, 0x00, 0x00])
            .await
            .unwrap();

        let mut buf = Vec::new();
        let n = client.read_to_end(&mut buf).await.unwrap();
        assert_eq!(n, 0);
        session.await.unwrap();
    }

    #[tokio::test]
    async fn test_pipelined_requests() {
        let (mut client, session, _shutdown) = session_fixture(Box::new(CannedTransport)).await;

        // Two requests in one write; two replies come back in order.
        let mut batch = Vec::new();
        batch.extend_from_slice(REQ);
        batch.extend_from_slice(REQ);
        client.write_all(&batch).await.unwrap();

        let mut replies = vec![0u8; REP.len() * 2];
        client.read_exact(&mut replies).await.unwrap();
        assert_eq!(&replies[..REP.len()], REP);
        assert_eq!(&replies[REP.len()..], REP);

        drop(client);
        session.await.unwrap();
    }
}
