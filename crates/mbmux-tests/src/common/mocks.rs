// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Mock Modbus Device
//!
//! A scriptable Modbus TCP device on a real loopback socket.
//!
//! The device accepts any number of connections (the proxy should only
//! ever open one at a time), answers each request with the canned reply
//! for its transaction id, and records everything needed for
//! verification: request arrival order, connection count and the
//! maximum number of requests ever in flight simultaneously.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

use super::frames::{reply_for, txn_of};

// =============================================================================
// DeviceBehavior
// =============================================================================

/// Scripted behavior for a [`MockDevice`].
#[derive(Debug, Clone, Default)]
pub struct DeviceBehavior {
    /// Delay before each reply.
    pub reply_delay: Duration,

    /// Never reply; keep the connection open and go silent.
    pub stall: bool,

    /// Close the connection after serving this many requests.
    pub drop_connection_after: Option<usize>,
}

impl DeviceBehavior {
    /// Replies immediately, never fails.
    pub fn well_behaved() -> Self {
        Self::default()
    }

    /// Replies after a fixed delay.
    pub fn slow(reply_delay: Duration) -> Self {
        Self {
            reply_delay,
            ..Self::default()
        }
    }

    /// Accepts connections but never replies.
    pub fn stalled() -> Self {
        Self {
            stall: true,
            ..Self::default()
        }
    }

    /// Closes each connection after serving a number of requests.
    pub fn flaky(requests_per_connection: usize) -> Self {
        Self {
            drop_connection_after: Some(requests_per_connection),
            ..Self::default()
        }
    }
}

// =============================================================================
// MockDevice
// =============================================================================

/// An in-process Modbus TCP device for end-to-end tests.
pub struct MockDevice {
    addr: SocketAddr,
    arrivals: Arc<Mutex<Vec<u16>>>,
    connections: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl MockDevice {
    /// Starts a device with the given behavior on an ephemeral port.
    pub async fn spawn(behavior: DeviceBehavior) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let arrivals = Arc::new(Mutex::new(Vec::new()));
        let connections = Arc::new(AtomicUsize::new(0));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_in_flight = Arc::new(AtomicUsize::new(0));

        {
            let arrivals = arrivals.clone();
            let connections = connections.clone();
            let in_flight = in_flight.clone();
            let max_in_flight = max_in_flight.clone();

            tokio::spawn(async move {
                loop {
                    let (stream, _) = match listener.accept().await {
                        Ok(accepted) => accepted,
                        Err(_) => return,
                    };
                    connections.fetch_add(1, Ordering::SeqCst);

                    let behavior = behavior.clone();
                    let arrivals = arrivals.clone();
                    let in_flight = in_flight.clone();
                    let max_in_flight = max_in_flight.clone();
                    tokio::spawn(async move {
                        serve_connection(stream, behavior, arrivals, in_flight, max_in_flight)
                            .await;
                    });
                }
            });
        }

        Self {
            addr,
            arrivals,
            connections,
            max_in_flight,
        }
    }

    /// Returns the device's socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Returns the device URL for configuration.
    pub fn url(&self) -> String {
        format!("{}:{}", self.addr.ip(), self.addr.port())
    }

    /// Returns the transaction ids of all requests, in arrival order.
    pub async fn arrivals(&self) -> Vec<u16> {
        self.arrivals.lock().await.clone()
    }

    /// Returns how many connections the device has accepted.
    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Returns the maximum number of requests ever in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

/// Serves one connection with raw prefix-then-body framing.
async fn serve_connection(
    mut stream: TcpStream,
    behavior: DeviceBehavior,
    arrivals: Arc<Mutex<Vec<u16>>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
) {
    let mut served = 0usize;

    loop {
        let mut prefix = [0u8; 6];
        if stream.read_exact(&mut prefix).await.is_err() {
            return;
        }
        let body_len = u16::from_be_bytes([prefix[4], prefix[5]]) as usize;
        let mut frame = vec![0u8; 6 + body_len];
        frame[..6].copy_from_slice(&prefix);
        if stream.read_exact(&mut frame[6..]).await.is_err() {
            return;
        }

        let current = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        max_in_flight.fetch_max(current, Ordering::SeqCst);
        arrivals.lock().await.push(txn_of(&frame));

        if behavior.stall {
            // Hold the connection open forever without replying.
            std::future::pending::<()>().await;
        }
        if !behavior.reply_delay.is_zero() {
            tokio::time::sleep(behavior.reply_delay).await;
        }

        let reply = reply_for(&frame);
        in_flight.fetch_sub(1, Ordering::SeqCst);
        if stream.write_all(&reply).await.is_err() {
            return;
        }

        served += 1;
        if behavior.drop_connection_after == Some(served) {
            return;
        }
    }
}
