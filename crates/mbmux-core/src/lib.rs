// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # mbmux-core
//!
//! Request/response multiplexing engine for the mbmux Modbus TCP proxy.
//!
//! Many Modbus devices accept only one (or very few) simultaneous TCP
//! sessions. This crate lets any number of clients share a single device
//! connection: every client request is queued, forwarded over the one
//! upstream link, and the matching response is routed back to the client
//! that sent it. Exactly one request is ever outstanding on the device
//! link at a time.
//!
//! ## Components
//!
//! - [`frame`]: Modbus TCP (MBAP) frame boundary detection over a byte
//!   stream. The proxy never interprets function codes or payloads.
//! - [`transport`]: the byte-stream seam ([`Transport`]/[`ByteStream`])
//!   with TCP and serial implementations.
//! - [`link`]: the single upstream connection per device, with lazy
//!   reconnect and a configurable post-connect settle delay.
//! - [`gateway`]: the request serializer. Concurrent submissions are
//!   drained strict-FIFO by a single service task that owns the link.
//! - [`session`]: one task per accepted client connection.
//! - [`bridge`]: per-device listener wiring a gateway to its clients.
//!
//! ## Ownership model
//!
//! The upstream connection is exclusively owned by its gateway's service
//! task. Sessions interact with the device only through
//! [`GatewayHandle::submit`], so no lock ever guards the connection
//! itself.
//!
//! ## Example
//!
//! ```rust,ignore
//! use mbmux_core::{Bridge, DeviceEndpoint};
//! use std::time::Duration;
//!
//! let endpoint = DeviceEndpoint::tcp("plc.example.org", 502)
//!     .with_timeout(Duration::from_secs(10));
//! let bridge = Bridge::bind("0.0.0.0:9502", endpoint).await?;
//! bridge.serve(shutdown_rx).await;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Modules
// =============================================================================

pub mod bridge;
pub mod endpoint;
pub mod error;
pub mod frame;
pub mod gateway;
pub mod link;
pub mod session;
pub mod transport;

// =============================================================================
// Re-exports for convenience
// =============================================================================

pub use bridge::{Bridge, SHUTDOWN_GRACE};
pub use endpoint::{DeviceAddress, DeviceEndpoint, TransportKind, DEFAULT_BAUD_RATE};
pub use error::{BindError, ConnectError, FrameError, ProxyError, ProxyResult};
pub use frame::{FrameCodec, FrameHeader, FrameReader, MAX_FRAME_LEN, MBAP_PREFIX_LEN};
pub use gateway::{Gateway, GatewayHandle};
pub use link::{LinkState, UpstreamLink};
pub use session::ClientSession;
pub use transport::{transport_for, ByteStream, SerialTransport, TcpTransport, Transport};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
