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

//! CRC-16/XMODEM (poly 0x1021, init 0x0000, no reflection)

/// Initial CRC state
pub const CRC_INIT: u16 = 0x0000;

/// Fold one byte into the running CRC.
///
/// Table-free byte-at-a-time form: swap halves, mix in the byte, then
/// spread the low nibble back through the register.
pub fn crc16_update(state: u16, byte: u8) -> u16 {
    let mut crc = state.rotate_left(8);
    crc ^= byte as u16;
    crc ^= (crc & 0xFF) >> 4;
    crc ^= crc << 12;
    crc ^= (crc & 0xFF) << 5;
    crc
}

/// CRC over a whole block, starting from `CRC_INIT`.
pub fn crc16(data: &[u8]) -> u16 {
    data.iter().fold(CRC_INIT, |crc, &b| crc16_update(crc, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // Plain shift-register reference for cross-checking
    fn crc16_bitwise(data: &[u8]) -> u16 {
        let mut crc: u16 = 0;
        for &b in data {
            crc ^= (b as u16) << 8;
            for _ in 0..8 {
                crc = if crc & 0x8000 != 0 { (crc << 1) ^ 0x1021 } else { crc << 1 };
            }
        }
        crc
    }

    #[test]
    fn test_check_value() {
        assert_eq!(crc16(b"123456789"), 0x31C3);
    }

    #[test]
    fn test_empty_is_init() {
        assert_eq!(crc16(&[]), CRC_INIT);
    }

    #[test]
    fn test_single_bytes() {
        assert_eq!(crc16_update(0, 0x00), 0x0000);
        assert_eq!(crc16_update(0, 0x01), 0x1021);
        assert_eq!(crc16(b"A"), 0x58E5);
    }

    #[test]
    fn test_filler_block() {
        let block = [0x1Au8; 128];
        assert_eq!(crc16(&block), crc16_bitwise(&block));
    }

    proptest! {
        #[test]
        fn prop_matches_bitwise(data in proptest::collection::vec(any::<u8>(), 0..=128)) {
            prop_assert_eq!(crc16(&data), crc16_bitwise(&data));
        }

        #[test]
        fn prop_chaining(data in proptest::collection::vec(any::<u8>(), 0..=128), split in 0usize..=128) {
            let split = split.min(data.len());
            let (head, tail) = data.split_at(split);
            let chained = tail.iter().fold(crc16(head), |crc, &b| crc16_update(crc, b));
            prop_assert_eq!(chained, crc16(&data));
        }

        #[test]
        fn prop_trailing_crc_gives_zero(data in proptest::collection::vec(any::<u8>(), 128)) {
            // A receiver running over payload + CRC (high byte first) lands on zero
            let crc = crc16(&data);
            let mut framed = data.clone();
            framed.push((crc >> 8) as u8);
            framed.push(crc as u8);
            prop_assert_eq!(crc16(&framed), 0);
        }
    }
}
