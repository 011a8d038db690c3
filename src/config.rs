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

use std::str::FromStr;
use std::time::Duration;
use serialport::{DataBits, Parity, StopBits};
use crate::error::ConfigError;

// ============================================================================
// Line Settings
// ============================================================================

/// Supported line speeds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaudRate(u32);

impl BaudRate {
    pub const SUPPORTED: [u32; 10] = [
        1200, 1800, 2400, 4800, 9600, 19200, 38400, 57600, 115200, 230400,
    ];

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for BaudRate {
    fn default() -> Self {
        BaudRate(115200)
    }
}

impl FromStr for BaudRate {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().parse::<u32>() {
            Ok(baud) if Self::SUPPORTED.contains(&baud) => Ok(BaudRate(baud)),
            _ => Err(ConfigError::BaudRate(s.to_string())),
        }
    }
}

impl std::fmt::Display for BaudRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Character framing, written `<databits><parity><stopbits>` (e.g. `8N1`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineMode {
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
}

impl Default for LineMode {
    fn default() -> Self {
        LineMode {
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
        }
    }
}

impl FromStr for LineMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ConfigError::Mode(s.to_string());
        let chars: Vec<char> = s.trim().chars().collect();
        let [bits, parity, stop] = chars[..] else {
            return Err(err());
        };

        let data_bits = match bits {
            '5' => DataBits::Five,
            '6' => DataBits::Six,
            '7' => DataBits::Seven,
            '8' => DataBits::Eight,
            _ => return Err(err()),
        };

        let parity = match parity.to_ascii_uppercase() {
            'N' => Parity::None,
            'E' => Parity::Even,
            'O' => Parity::Odd,
            _ => return Err(err()),
        };

        let stop_bits = match stop {
            '1' => StopBits::One,
            '2' => StopBits::Two,
            _ => return Err(err()),
        };

        Ok(LineMode { data_bits, parity, stop_bits })
    }
}

impl std::fmt::Display for LineMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bits = match self.data_bits {
            DataBits::Five => '5',
            DataBits::Six => '6',
            DataBits::Seven => '7',
            DataBits::Eight => '8',
        };
        let parity = match self.parity {
            Parity::None => 'N',
            Parity::Even => 'E',
            Parity::Odd => 'O',
        };
        let stop = match self.stop_bits {
            StopBits::One => '1',
            StopBits::Two => '2',
        };
        write!(f, "{}{}{}", bits, parity, stop)
    }
}

/// Everything needed to open the serial device
#[derive(Debug, Clone)]
pub struct SerialConfig {
    pub path: String,
    pub baud: BaudRate,
    pub mode: LineMode,
}

// ============================================================================
// Transfer Settings
// ============================================================================

/// Knobs for the sender state machine. Defaults wait for sync forever,
/// retry without limit and never resend on silence.
#[derive(Debug, Clone)]
pub struct TransferConfig {
    /// Upper bound on each channel read; cancellation is seen within one interval
    pub poll_interval: Duration,
    /// Give up if no sync request arrives within this time
    pub sync_timeout: Option<Duration>,
    /// Resend the in-flight packet after this much silence
    pub response_timeout: Option<Duration>,
    /// Fail once a single packet has been retried more than this many times
    pub max_retries: Option<u32>,
    /// How long to wait for the receiver to answer EOT
    pub eot_timeout: Duration,
}

impl Default for TransferConfig {
    fn default() -> Self {
        TransferConfig {
            poll_interval: Duration::from_millis(10),
            sync_timeout: None,
            response_timeout: None,
            max_retries: None,
            eot_timeout: Duration::from_secs(3),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_baud() {
        assert_eq!("9600".parse::<BaudRate>().unwrap().get(), 9600);
        assert_eq!("230400".parse::<BaudRate>().unwrap().get(), 230400);
        assert_eq!(BaudRate::default().get(), 115200);

        assert!("9601".parse::<BaudRate>().is_err());
        assert!("fast".parse::<BaudRate>().is_err());
        assert!("".parse::<BaudRate>().is_err());
    }

    #[test]
    fn test_parse_mode() {
        let mode: LineMode = "8N1".parse().unwrap();
        assert_eq!(mode, LineMode::default());

        let mode: LineMode = "7e2".parse().unwrap();
        assert_eq!(mode.data_bits, DataBits::Seven);
        assert_eq!(mode.parity, Parity::Even);
        assert_eq!(mode.stop_bits, StopBits::Two);

        let mode: LineMode = "5O1".parse().unwrap();
        assert_eq!(mode.data_bits, DataBits::Five);
        assert_eq!(mode.parity, Parity::Odd);
    }

    #[test]
    fn test_parse_mode_rejects() {
        for bad in ["", "8N", "8N1X", "9N1", "8X1", "8N3", "N81"] {
            assert_eq!(
                bad.parse::<LineMode>(),
                Err(ConfigError::Mode(bad.to_string())),
                "mode {:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_mode_display() {
        for s in ["8N1", "7E2", "5O1", "6N2"] {
            assert_eq!(s.parse::<LineMode>().unwrap().to_string(), s);
        }
    }

    #[test]
    fn test_transfer_defaults() {
        let config = TransferConfig::default();
        assert!(config.sync_timeout.is_none());
        assert!(config.max_retries.is_none());
        assert!(config.response_timeout.is_none());
    }
}
