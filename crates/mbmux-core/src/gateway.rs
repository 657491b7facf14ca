// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The request serializer.
//!
//! A [`Gateway`] accepts request frames from any number of concurrent
//! client sessions and guarantees exactly-one-in-flight semantics against
//! its [`UpstreamLink`], in strict arrival order. The mechanism is a
//! bounded mpsc queue drained by a single service task that owns the
//! link; that single task is what enforces both the FIFO order and the
//! at-most-one-outstanding-request invariant, so it must never be
//! duplicated.
//!
//! One request's failure is delivered to its own caller only; the service
//! loop logs it and moves on to the next queued request, reconnecting on
//! its behalf if needed. No request is ever retried internally.

use std::time::Instant;

use bytes::Bytes;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, error, info, warn, Level};

use crate::error::{ProxyError, ProxyResult};
use crate::link::UpstreamLink;

/// Default capacity of the request queue.
///
/// Submissions beyond this apply backpressure to their sessions; the
/// queue itself stays strictly FIFO.
pub const DEFAULT_QUEUE_CAPACITY: usize = 128;

// =============================================================================
// PendingRequest
// =============================================================================

/// One in-flight client request: the raw frame plus the handle used to
/// deliver the outcome back to the submitting session.
struct PendingRequest {
    frame: Bytes,
    reply: oneshot::Sender<ProxyResult<Bytes>>,
    enqueued_at: Instant,
}

// =============================================================================
// GatewayHandle
// =============================================================================

/// Cloneable submission handle to a gateway.
///
/// Safe to use concurrently from any number of sessions.
#[derive(Clone)]
pub struct GatewayHandle {
    queue: mpsc::Sender<PendingRequest>,
}

impl GatewayHandle {
    /// Submits a request frame and waits for its response.
    ///
    /// The request joins the tail of the device's FIFO queue; the call
    /// resolves once the single service task has exchanged it with the
    /// device (or failed trying).
    ///
    /// # Errors
    ///
    /// Returns the per-request failure ([`ProxyError::Connect`],
    /// [`ProxyError::Timeout`], [`ProxyError::LinkBroken`], device-side
    /// frame errors) or [`ProxyError::ShuttingDown`] if the gateway has
    /// stopped.
    pub async fn submit(&self, frame: Bytes) -> ProxyResult<Bytes> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let pending = PendingRequest {
            frame,
            reply: reply_tx,
            enqueued_at: Instant::now(),
        };

        self.queue
            .send(pending)
            .await
            .map_err(|_| ProxyError::ShuttingDown)?;

        reply_rx.await.map_err(|_| ProxyError::ShuttingDown)?
    }
}

impl std::fmt::Debug for GatewayHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayHandle").finish()
    }
}

// =============================================================================
// Gateway
// =============================================================================

/// The per-device service loop. Exactly one exists per device.
pub struct Gateway {
    link: UpstreamLink,
    queue: mpsc::Receiver<PendingRequest>,
}

impl Gateway {
    /// Creates a gateway over a link, returning the submission handle and
    /// the gateway itself. Spawn [`run`](Gateway::run) to start serving.
    pub fn new(link: UpstreamLink) -> (GatewayHandle, Self) {
        Self::with_capacity(link, DEFAULT_QUEUE_CAPACITY)
    }

    /// Creates a gateway with an explicit queue capacity.
    pub fn with_capacity(link: UpstreamLink, capacity: usize) -> (GatewayHandle, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (GatewayHandle { queue: tx }, Self { link, queue: rx })
    }

    /// Runs the service loop until shutdown is signaled or every handle
    /// is dropped.
    ///
    /// The loop drains the queue head-first and finishes the request it
    /// is currently serving before reacting to shutdown; requests still
    /// queued at shutdown fail with [`ProxyError::ShuttingDown`].
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        let device = self.link.display_name();
        debug!(device = %device, "gateway service loop started");

        loop {
            // Biased so a pending shutdown wins over further queued work.
            tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    debug!(device = %device, "gateway received shutdown");
                    break;
                }
                pending = self.queue.recv() => match pending {
                    Some(pending) => self.service(pending).await,
                    None => break,
                },
            }
        }

        self.fail_queued();
        self.link.disconnect();
        info!(device = %device, "gateway stopped");
    }

    /// Serves exactly one pending request and delivers its outcome.
    async fn service(&mut self, pending: PendingRequest) {
        let waited = pending.enqueued_at.elapsed();
        let outcome = self.exchange(&pending.frame).await;

        match &outcome {
            Ok(reply) => {
                debug!(
                    device = %self.link.display_name(),
                    request_len = pending.frame.len(),
                    reply_len = reply.len(),
                    queued = ?waited,
                    "request served"
                );
            }
            Err(e) => match e.log_level() {
                Level::ERROR => error!(device = %self.link.display_name(), error = %e, "request failed"),
                Level::WARN => warn!(device = %self.link.display_name(), error = %e, "request failed"),
                _ => debug!(device = %self.link.display_name(), error = %e, "request failed"),
            },
        }

        // The session may have disconnected while waiting; the device's
        // response is then simply discarded.
        let _ = pending.reply.send(outcome);
    }

    /// Ensures the link is connected, then performs the exchange.
    ///
    /// Exactly one attempt per request: a connect failure here is this
    /// request's failure, and the next queued request will trigger its
    /// own fresh connect.
    async fn exchange(&mut self, frame: &Bytes) -> ProxyResult<Bytes> {
        self.link.ensure_connected().await?;
        self.link.send_and_receive(frame).await
    }

    /// Fails every request still queued at shutdown.
    fn fail_queued(&mut self) {
        self.queue.close();
        while let Ok(pending) = self.queue.try_recv() {
            let _ = pending.reply.send(Err(ProxyError::ShuttingDown));
        }
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("device", &self.link.display_name())
            .field("state", &self.link.state())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
