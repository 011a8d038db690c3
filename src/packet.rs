// Copyright (C) 2026 Brian Johnson
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

use crate::crc::crc16;
use crate::protocol::*;

/// First sequence number of a transfer
pub const FIRST_SEQUENCE: u8 = 1;

/// Sequence number following `seq`. Runs 1..=255 and wraps back to 1, never 0.
pub fn next_sequence(seq: u8) -> u8 {
    if seq == u8::MAX { FIRST_SEQUENCE } else { seq + 1 }
}

/// One framed data packet, exactly as it goes on the wire.
#[derive(Clone, PartialEq, Eq)]
pub struct Packet {
    bytes: [u8; PACKET_LEN],
}

impl Packet {
    /// Frame `payload` under `sequence`.
    ///
    /// Short payloads are padded with `SUB` up to `BLOCK_LEN`; anything
    /// beyond `BLOCK_LEN` is ignored. The CRC covers the padded payload only.
    pub fn build(sequence: u8, payload: &[u8]) -> Self {
        let mut bytes = [SUB; PACKET_LEN];
        bytes[0] = SOH;
        bytes[1] = sequence;
        bytes[2] = u8::MAX - sequence;

        let len = payload.len().min(BLOCK_LEN);
        bytes[HEADER_LEN..HEADER_LEN + len].copy_from_slice(&payload[..len]);

        let crc = crc16(&bytes[HEADER_LEN..HEADER_LEN + BLOCK_LEN]);
        bytes[HEADER_LEN + BLOCK_LEN..].copy_from_slice(&crc.to_be_bytes());

        Packet { bytes }
    }

    pub fn sequence(&self) -> u8 {
        self.bytes[1]
    }

    pub fn crc(&self) -> u16 {
        u16::from_be_bytes([self.bytes[PACKET_LEN - 2], self.bytes[PACKET_LEN - 1]])
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl std::fmt::Debug for Packet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Packet")
            .field("sequence", &self.sequence())
            .field("crc", &format_args!("0x{:04X}", self.crc()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_full_block_layout() {
        let payload: Vec<u8> = (0..128).map(|i| i as u8).collect();
        let packet = Packet::build(1, &payload);
        let bytes = packet.as_bytes();

        assert_eq!(bytes.len(), 133);
        assert_eq!(bytes[0], 0x01);
        assert_eq!(bytes[1], 1);
        assert_eq!(bytes[2], 254);
        assert_eq!(&bytes[3..131], &payload[..]);

        let crc = crc16(&payload);
        assert_eq!(bytes[131], (crc >> 8) as u8);
        assert_eq!(bytes[132], (crc & 0xFF) as u8);
        assert_eq!(packet.crc(), crc);
    }

    #[test]
    fn test_short_block_is_padded() {
        let packet = Packet::build(3, b"tail");
        let payload = &packet.as_bytes()[3..131];

        assert_eq!(payload.len(), 128);
        assert_eq!(&payload[..4], b"tail");
        assert!(payload[4..].iter().all(|&b| b == 0x1A));

        let mut expected = b"tail".to_vec();
        expected.resize(128, 0x1A);
        assert_eq!(packet.crc(), crc16(&expected));
    }

    #[test]
    fn test_empty_payload() {
        let packet = Packet::build(1, &[]);
        assert!(packet.as_bytes()[HEADER_LEN..HEADER_LEN + BLOCK_LEN].iter().all(|&b| b == SUB));
        assert_eq!(packet.as_bytes().len(), PACKET_LEN);
    }

    #[test]
    fn test_complement_edges() {
        assert_eq!(Packet::build(255, &[]).as_bytes()[2], 0);
        assert_eq!(Packet::build(1, &[]).as_bytes()[2], 254);
        assert_eq!(Packet::build(128, &[]).as_bytes()[2], 127);
    }

    #[test]
    fn test_sequence_wraps_skipping_zero() {
        assert_eq!(next_sequence(1), 2);
        assert_eq!(next_sequence(254), 255);
        assert_eq!(next_sequence(255), 1);

        let mut seq = FIRST_SEQUENCE;
        for _ in 0..1000 {
            seq = next_sequence(seq);
            assert_ne!(seq, 0);
        }
    }

    proptest! {
        #[test]
        fn prop_header_and_length(seq in 1u8..=255, payload in proptest::collection::vec(any::<u8>(), 0..=128)) {
            let packet = Packet::build(seq, &payload);
            let bytes = packet.as_bytes();
            prop_assert_eq!(bytes.len(), PACKET_LEN);
            prop_assert_eq!(bytes[0], SOH);
            prop_assert_eq!(bytes[1], seq);
            prop_assert_eq!(bytes[2], 255 - seq);
            prop_assert_eq!(&bytes[3..3 + payload.len()], &payload[..]);
        }

        #[test]
        fn prop_deterministic(seq in 1u8..=255, payload in proptest::collection::vec(any::<u8>(), 0..=128)) {
            prop_assert_eq!(Packet::build(seq, &payload), Packet::build(seq, &payload));
        }
    }
}
