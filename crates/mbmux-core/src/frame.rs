// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Modbus TCP (MBAP) frame boundary detection.
//!
//! A Modbus TCP frame starts with a 6-byte prefix: transaction identifier
//! (2 bytes), protocol identifier (2 bytes) and a big-endian length field
//! (2 bytes) counting the unit identifier plus PDU that follow. The codec
//! is purely a boundary detector: it finds where one frame ends and the
//! next begins, and never validates function codes, unit id ranges or
//! payload contents. Transaction identifiers pass through untouched.
//!
//! [`FrameCodec`] works on a growing [`BytesMut`] buffer;
//! [`FrameReader`] drives it over any [`AsyncRead`] stream.

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::FrameError;

// =============================================================================
// Constants
// =============================================================================

/// Bytes preceding the length-counted portion of a frame
/// (transaction id + protocol id + length field).
pub const MBAP_PREFIX_LEN: usize = 6;

/// Maximum total frame size per the Modbus TCP specification (260-byte ADU).
pub const MAX_FRAME_LEN: usize = 260;

/// Maximum value of the length field (unit id + PDU).
pub const MAX_LENGTH_FIELD: usize = MAX_FRAME_LEN - MBAP_PREFIX_LEN;

// =============================================================================
// FrameHeader
// =============================================================================

/// Decoded MBAP header fields, used for logging and diagnostics only.
///
/// The proxy never mutates any of these; frames are relayed verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Transaction identifier, echoed from request to response.
    pub transaction_id: u16,
    /// Protocol identifier, 0 for Modbus.
    pub protocol_id: u16,
    /// Byte count of unit id + PDU.
    pub length: u16,
    /// Unit (slave) identifier.
    pub unit_id: u8,
}

impl FrameHeader {
    /// Parses the header of a complete frame.
    ///
    /// Returns `None` if fewer than 7 bytes are given.
    pub fn parse(frame: &[u8]) -> Option<Self> {
        if frame.len() < MBAP_PREFIX_LEN + 1 {
            return None;
        }
        Some(Self {
            transaction_id: u16::from_be_bytes([frame[0], frame[1]]),
            protocol_id: u16::from_be_bytes([frame[2], frame[3]]),
            length: u16::from_be_bytes([frame[4], frame[5]]),
            unit_id: frame[6],
        })
    }
}

// =============================================================================
// FrameCodec
// =============================================================================

/// Stateless MBAP boundary detector over a byte buffer.
#[derive(Debug, Default)]
pub struct FrameCodec;

impl FrameCodec {
    /// Extracts one complete frame from the front of `buf`, if present.
    ///
    /// Returns `Ok(None)` when more bytes are needed. On success the frame
    /// bytes are removed from the buffer. A declared length of zero or one
    /// exceeding [`MAX_LENGTH_FIELD`] is a [`FrameError`]; the hosting
    /// connection must be torn down and no further frames attempted on it.
    pub fn decode(buf: &mut BytesMut) -> Result<Option<Bytes>, FrameError> {
        if buf.len() < MBAP_PREFIX_LEN {
            return Ok(None);
        }

        let declared = u16::from_be_bytes([buf[4], buf[5]]) as usize;
        if declared == 0 {
            return Err(FrameError::ZeroLength);
        }
        if declared > MAX_LENGTH_FIELD {
            return Err(FrameError::Oversized {
                declared,
                max: MAX_LENGTH_FIELD,
            });
        }

        let total = MBAP_PREFIX_LEN + declared;
        if buf.len() < total {
            return Ok(None);
        }
        Ok(Some(buf.split_to(total).freeze()))
    }

    /// Returns the total frame size a buffered prefix declares, if the
    /// prefix is complete and sane.
    fn expected_len(buf: &[u8]) -> Option<usize> {
        if buf.len() < MBAP_PREFIX_LEN {
            return None;
        }
        let declared = u16::from_be_bytes([buf[4], buf[5]]) as usize;
        Some(MBAP_PREFIX_LEN + declared)
    }
}

// =============================================================================
// FrameReader
// =============================================================================

/// Reads complete Modbus TCP frames from an async byte stream.
///
/// Bytes are accumulated in an internal buffer, so the stream may deliver
/// data in arbitrary chunks (including one byte at a time) and frames are
/// still reconstructed exactly.
pub struct FrameReader<R> {
    stream: R,
    buf: BytesMut,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Wraps a stream in a frame reader.
    pub fn new(stream: R) -> Self {
        Self {
            stream,
            buf: BytesMut::with_capacity(MAX_FRAME_LEN),
        }
    }

    /// Reads exactly one complete frame.
    ///
    /// Returns `Ok(None)` on a clean end of stream at a frame boundary
    /// (the peer closed between frames). End of stream in the middle of a
    /// frame yields [`FrameError::Truncated`].
    pub async fn read_frame(&mut self) -> Result<Option<Bytes>, FrameError> {
        loop {
            if let Some(frame) = FrameCodec::decode(&mut self.buf)? {
                return Ok(Some(frame));
            }

            let n = self.stream.read_buf(&mut self.buf).await?;
            if n == 0 {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                let want = FrameCodec::expected_len(&self.buf).unwrap_or(MBAP_PREFIX_LEN);
                return Err(FrameError::Truncated {
                    got: self.buf.len(),
                    want,
                });
            }
        }
    }

    /// Returns a mutable reference to the underlying stream.
    ///
    /// Used to write on bidirectional streams without splitting them.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.stream
    }
}

impl<R> std::fmt::Debug for FrameReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameReader")
            .field("buffered", &self.buf.len())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
