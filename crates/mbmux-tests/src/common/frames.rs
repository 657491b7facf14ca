// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Canned Modbus TCP frames and frame builders.
//!
//! The proxy treats frames as opaque past the MBAP prefix, so a small
//! fixed vocabulary is enough: a read_holding_registers request and its
//! reply, parameterized by transaction id.

/// read_holding_registers(unit=1, addr=0, count=4), transaction id 1.
pub const REQ: &[u8] = &[
    0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01, 0x03, 0x00, 0x00, 0x00, 0x04,
];

/// Reply to [`REQ`]: four registers holding 1..=4.
pub const REP: &[u8] = &[
    0x00, 0x01, 0x00, 0x00, 0x00, 0x0B, 0x01, 0x03, 0x08, 0x00, 0x01, 0x00, 0x02, 0x00, 0x03,
    0x00, 0x04,
];

/// Builds [`REQ`] with a chosen transaction id.
pub fn request_with_txn(txn: u16) -> Vec<u8> {
    let mut frame = REQ.to_vec();
    frame[..2].copy_from_slice(&txn.to_be_bytes());
    frame
}

/// Builds the canned reply matching a request's transaction id.
pub fn reply_for(request: &[u8]) -> Vec<u8> {
    let mut frame = REP.to_vec();
    frame[..2].copy_from_slice(&request[..2]);
    frame
}

/// Reads the transaction id of a frame.
pub fn txn_of(frame: &[u8]) -> u16 {
    u16::from_be_bytes([frame[0], frame[1]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use mbmux_core::FrameHeader;

    #[test]
    fn test_frames_are_well_formed() {
        let header = FrameHeader::parse(REQ).unwrap();
        assert_eq!(header.length as usize, REQ.len() - 6);

        let header = FrameHeader::parse(REP).unwrap();
        assert_eq!(header.length as usize, REP.len() - 6);
    }

    #[test]
    fn test_txn_round_trip() {
        let request = request_with_txn(0x1234);
        assert_eq!(txn_of(&request), 0x1234);
        assert_eq!(txn_of(&reply_for(&request)), 0x1234);
    }
}
