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

//! XMODEM-CRC protocol constants

/// Start of header - begins a 128-byte data packet
pub const SOH: u8 = 0x01;

/// End of transmission - sender has no more packets
pub const EOT: u8 = 0x04;

/// Acknowledge - receiver accepted the packet
pub const ACK: u8 = 0x06;

/// Negative acknowledge - receiver rejected the packet, resend it
pub const NAK: u8 = 0x15;

/// Receiver requests a CRC-mode transfer
pub const SYNC: u8 = b'C';

/// Filler for the final short block (Ctrl-Z)
pub const SUB: u8 = 0x1A;

/// Payload bytes per packet
pub const BLOCK_LEN: usize = 128;

/// SOH + sequence + complement
pub const HEADER_LEN: usize = 3;

/// CRC high byte + low byte
pub const CRC_LEN: usize = 2;

/// Every data packet on the wire is exactly this long
pub const PACKET_LEN: usize = HEADER_LEN + BLOCK_LEN + CRC_LEN;

/// A single byte read back from the receiver, classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    Ack,
    Nak,
    Sync,
    Other(u8),
}

impl From<u8> for Response {
    fn from(byte: u8) -> Self {
        match byte {
            ACK => Response::Ack,
            NAK => Response::Nak,
            SYNC => Response::Sync,
            other => Response::Other(other),
        }
    }
}

impl std::fmt::Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Response::Ack => write!(f, "ACK"),
            Response::Nak => write!(f, "NACK"),
            Response::Sync => write!(f, "'C'"),
            Response::Other(b) => write!(f, "0x{:02X}", b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_length() {
        assert_eq!(PACKET_LEN, 133);
    }

    #[test]
    fn test_classify_response() {
        assert_eq!(Response::from(0x06), Response::Ack);
        assert_eq!(Response::from(0x15), Response::Nak);
        assert_eq!(Response::from(0x43), Response::Sync);
        assert_eq!(Response::from(0x00), Response::Other(0x00));
        assert_eq!(Response::from(b'N'), Response::Other(b'N'));
    }

    #[test]
    fn test_response_display() {
        assert_eq!(Response::Nak.to_string(), "NACK");
        assert_eq!(Response::Other(0x7F).to_string(), "0x7F");
    }
}
