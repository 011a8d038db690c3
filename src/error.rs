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

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while sending.
///
/// `TransferComplete` and `Cancelled` are not failures: they are how a state's
/// `step()` tells the driver the machine has stopped.
#[derive(Debug, Error)]
pub enum SenderError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to open serial port: {0}")]
    Serial(#[from] serialport::Error),

    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("short write: sent {written}/{expected} bytes")]
    ShortWrite { written: usize, expected: usize },

    #[error("no sync request from receiver after {0:?}")]
    SyncTimeout(Duration),

    #[error("packet {sequence} rejected {retries} times, giving up")]
    RetryLimit { sequence: u8, retries: u32 },

    #[error("Transfer complete")]
    TransferComplete,

    #[error("Transfer cancelled")]
    Cancelled,
}

/// Errors from parsing line settings.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid baud rate: {0}. Must be one of 1200, 1800, 2400, 4800, 9600, 19200, 38400, 57600, 115200, 230400")]
    BaudRate(String),

    #[error("invalid mode: {0}. Expected <5-8><N|E|O><1|2>, e.g. 8N1")]
    Mode(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let e = SenderError::ShortWrite { written: 64, expected: 133 };
        assert_eq!(e.to_string(), "short write: sent 64/133 bytes");

        let e = SenderError::RetryLimit { sequence: 7, retries: 10 };
        assert!(e.to_string().contains("packet 7"));

        let e = SenderError::Open {
            path: PathBuf::from("/no/such/file"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert!(e.to_string().contains("/no/such/file"));
    }

    #[test]
    fn test_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broke");
        let e: SenderError = io_err.into();
        assert!(matches!(e, SenderError::Io(_)));
    }
}
