// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! One listening socket bound to one upstream device.
//!
//! A [`Bridge`] accepts client connections on its bind address and hands
//! each to a [`ClientSession`] sharing the device's single [`Gateway`].
//! Bridges are independent: one device being down never affects clients
//! of another bridge. Binding and serving are separate steps so a process
//! hosting several bridges can fail fast if any address is taken, before
//! any of them accepts traffic.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::endpoint::DeviceEndpoint;
use crate::error::{BindError, ProxyResult};
use crate::gateway::Gateway;
use crate::link::UpstreamLink;
use crate::session::ClientSession;

/// How long live client sessions get to finish after shutdown is
/// signaled before they are aborted.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Listener plus the device it fronts.
pub struct Bridge {
    listener: TcpListener,
    local_addr: SocketAddr,
    endpoint: DeviceEndpoint,
}

impl Bridge {
    /// Binds the listening socket.
    ///
    /// # Errors
    ///
    /// Returns [`BindError`] if the address cannot be bound; an address
    /// already in use is reported as [`BindError::AddressInUse`].
    pub async fn bind(bind: &str, endpoint: DeviceEndpoint) -> Result<Self, BindError> {
        let listener = TcpListener::bind(bind)
            .await
            .map_err(|e| BindError::from_io(bind, e))?;
        let local_addr = listener.local_addr().map_err(|e| BindError::from_io(bind, e))?;

        info!(bind = %local_addr, device = %endpoint, "listening");
        Ok(Self {
            listener,
            local_addr,
            endpoint,
        })
    }

    /// Returns the bound address, with the real port when bound to port 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns the device this bridge fronts.
    pub fn endpoint(&self) -> &DeviceEndpoint {
        &self.endpoint
    }

    /// Accepts and serves clients until shutdown is signaled.
    ///
    /// The device gateway runs as its own task; each accepted client gets
    /// a session task. On shutdown the listener stops accepting, sessions
    /// get [`SHUTDOWN_GRACE`] to finish, and stragglers are aborted.
    ///
    /// # Errors
    ///
    /// Returns an error only if the device endpoint cannot produce a
    /// transport. Accept failures on individual connections are logged
    /// and skipped.
    pub async fn serve(self, mut shutdown: broadcast::Receiver<()>) -> ProxyResult<()> {
        let link = UpstreamLink::new(self.endpoint.clone())?;
        let (handle, gateway) = Gateway::new(link);
        let gateway_task = tokio::spawn(gateway.run(shutdown.resubscribe()));

        let mut sessions = JoinSet::new();
        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    debug!(bind = %self.local_addr, "listener stopping");
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let session = ClientSession::new(stream, peer, handle.clone());
                        sessions.spawn(session.run());
                    }
                    Err(e) => {
                        warn!(bind = %self.local_addr, error = %e, "accept failed");
                    }
                },
            }
        }

        let local_addr = self.local_addr;
        drop(self.listener);
        Self::drain_sessions(local_addr, sessions).await;
        let _ = gateway_task.await;
        info!(bind = %local_addr, "bridge stopped");
        Ok(())
    }

    async fn drain_sessions(local_addr: SocketAddr, mut sessions: JoinSet<()>) {
        if sessions.is_empty() {
            return;
        }
        debug!(
            bind = %local_addr,
            active = sessions.len(),
            "waiting for client sessions"
        );

        let drain = async {
            while sessions.join_next().await.is_some() {}
        };
        if tokio::time::timeout(SHUTDOWN_GRACE, drain).await.is_err() {
            warn!(
                bind = %local_addr,
                remaining = sessions.len(),
                "aborting client sessions after grace period"
            );
            sessions.abort_all();
            while sessions.join_next().await.is_some() {}
        }
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("bind", &self.local_addr)
            .field("device", &self.endpoint.url())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BindError;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    const REQ: &[u8] = &[
        0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01, 0x03, 0x00, 0x00, 0x00, 0x04,
    ];
    const REP: &[u8] = &[
        0x00, 0x01, 0x00, 0x00, 0x00, 0x0B, 0x01, 0x03, 0x08, 0x00, 0x01, 0x00, 0x02, 0x00, 0x03,
        0x00, 0x04,
    ];

    /// Minimal in-process Modbus TCP device for end-to-end checks.
    async fn spawn_canned_device() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let (mut stream, _) = match listener.accept().await {
                    Ok(accepted) => accepted,
                    Err(_) => return,
                };
                tokio::spawn(async move {
                    let mut buf = vec![0u8; REQ.len()];
                    while stream.read_exact(&mut buf).await.is_ok() {
                        if stream.write_all(REP).await.is_err() {
                            break;
                        }
                    }
                });
            }
        });
        addr
    }

    #[tokio::test]
    async fn test_bind_conflict() {
        let device = DeviceEndpoint::tcp("127.0.0.1", 502);
        let first = Bridge::bind("127.0.0.1:0", device.clone()).await.unwrap();
        let taken = first.local_addr().to_string();

        let err = Bridge::bind(&taken, device).await.unwrap_err();
        assert!(matches!(err, BindError::AddressInUse { .. }));
    }

    #[tokio::test]
    async fn test_end_to_end_relay() {
        let device_addr = spawn_canned_device().await;
        let endpoint = DeviceEndpoint::tcp(device_addr.ip().to_string(), device_addr.port())
            .with_timeout(Duration::from_secs(2));

        let bridge = Bridge::bind("127.0.0.1:0", endpoint).await.unwrap();
        let proxy_addr = bridge.local_addr();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let serve_task = tokio::spawn(bridge.serve(shutdown_rx));

        let mut client = TcpStream::connect(proxy_addr).await.unwrap();
        client.write_all(REQ).await.unwrap();
        let mut reply = vec![0u8; REP.len()];
        client.read_exact(&mut reply).await.unwrap();
        assert_eq!(reply, REP);

        drop(client);
        shutdown_tx.send(()).unwrap();
        serve_task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_drains_live_session() {
        let device_addr = spawn_canned_device().await;
        let endpoint = DeviceEndpoint::tcp(device_addr.ip().to_string(), device_addr.port())
            .with_timeout(Duration::from_secs(2));

        let bridge = Bridge::bind("127.0.0.1:0", endpoint).await.unwrap();
        let proxy_addr = bridge.local_addr();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let serve_task = tokio::spawn(bridge.serve(shutdown_rx));

        let mut client = TcpStream::connect(proxy_addr).await.unwrap();
        client.write_all(REQ).await.unwrap();
        let mut reply = vec![0u8; REP.len()];
        client.read_exact(&mut reply).await.unwrap();
        assert_eq!(reply, REP);

        // The client is still connected when shutdown is signaled; the
        // listener closes first and the session is drained once the
        // client hangs up.
        shutdown_tx.send(()).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(client);

        serve_task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_with_no_clients() {
        let endpoint = DeviceEndpoint::tcp("127.0.0.1", 502);
        let bridge = Bridge::bind("127.0.0.1:0", endpoint).await.unwrap();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let serve_task = tokio::spawn(bridge.serve(shutdown_rx));

        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown_tx.send(()).unwrap();
        serve_task.await.unwrap().unwrap();
    }
}
