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

use std::io::{Read, Write};
use std::time::Duration;
use serialport::SerialPort as SerialPortTrait;
use tracing::debug;
use crate::config::SerialConfig;

// ============================================================================
// SerialPort Trait
// ============================================================================

/// Duplex byte channel used by the sender
pub trait SerialPort: Send {
    /// Single write attempt; returns how many bytes the line took.
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize>;

    /// Read whatever is available, waiting at most `timeout`.
    /// Silence shows up as `Ok(0)` or an `ErrorKind::TimedOut` error.
    fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> std::io::Result<usize>;
}

// ============================================================================
// Real Serial Port Implementation
// ============================================================================

/// Real serial port implementation that wraps the serialport crate
pub struct RealSerialPort {
    port: Box<dyn SerialPortTrait>,
    timeout: Duration,
}

impl RealSerialPort {
    pub fn open(config: &SerialConfig) -> Result<Self, serialport::Error> {
        let timeout = Duration::from_millis(100);
        let port = serialport::new(&config.path, config.baud.get())
            .data_bits(config.mode.data_bits)
            .parity(config.mode.parity)
            .stop_bits(config.mode.stop_bits)
            .flow_control(serialport::FlowControl::None)
            .timeout(timeout)
            .open()?;

        debug!(path = %config.path, baud = %config.baud, mode = %config.mode, "serial port open");
        Ok(RealSerialPort { port, timeout })
    }
}

impl SerialPort for RealSerialPort {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let written = self.port.write(buf)?;
        self.port.flush()?;
        Ok(written)
    }

    fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> std::io::Result<usize> {
        if timeout != self.timeout {
            self.port.set_timeout(timeout).map_err(std::io::Error::other)?;
            self.timeout = timeout;
        }
        self.port.read(buf)
    }
}

// ============================================================================
// Mock Serial Port for Testing
// ============================================================================

#[cfg(test)]
use crate::cancel::CancelToken;

#[cfg(test)]
pub struct MockSerialPort {
    // Data to return on reads (None = timeout)
    read_buffer: Vec<Option<u8>>,
    read_pos: usize,
    // Reads attempted after the script ran out
    drained_reads: usize,
    // Track what was written
    write_log: Vec<u8>,
    // Expected writes for verification
    expected_writes: Vec<u8>,
    // Each write call accepts at most this many bytes
    write_limit: Option<usize>,
    // Fired once the scripted responses are used up
    cancel_when_drained: Option<CancelToken>,
}

#[cfg(test)]
impl MockSerialPort {
    pub fn new(responses: Vec<Option<u8>>, expected_writes: Vec<u8>) -> Self {
        MockSerialPort {
            read_buffer: responses,
            read_pos: 0,
            drained_reads: 0,
            write_log: Vec::new(),
            expected_writes,
            write_limit: None,
            cancel_when_drained: None,
        }
    }

    pub fn with_write_limit(mut self, limit: usize) -> Self {
        self.write_limit = Some(limit);
        self
    }

    pub fn cancel_when_drained(mut self, cancel: CancelToken) -> Self {
        self.cancel_when_drained = Some(cancel);
        self
    }

    fn timed_out() -> std::io::Error {
        std::io::Error::new(std::io::ErrorKind::TimedOut, "Mock timeout")
    }
}

#[cfg(test)]
impl SerialPort for MockSerialPort {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let n = self.write_limit.map_or(buf.len(), |limit| limit.min(buf.len()));
        self.write_log.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn read_timeout(&mut self, buf: &mut [u8], _timeout: Duration) -> std::io::Result<usize> {
        // Out of responses = timeout
        if self.read_pos >= self.read_buffer.len() {
            if let Some(cancel) = &self.cancel_when_drained {
                cancel.cancel();
            }
            self.drained_reads += 1;
            assert!(
                self.drained_reads < 10_000,
                "MockSerialPort polled forever after its script ran out"
            );
            return Err(Self::timed_out());
        }

        // If current response is None = timeout
        if self.read_buffer[self.read_pos].is_none() {
            self.read_pos += 1;
            return Err(Self::timed_out());
        }

        let mut bytes_read = 0;
        while bytes_read < buf.len() && self.read_pos < self.read_buffer.len() {
            match self.read_buffer[self.read_pos] {
                Some(byte) => {
                    buf[bytes_read] = byte;
                    bytes_read += 1;
                    self.read_pos += 1;
                }
                None => break,  // Stop at timeout marker
            }
        }

        Ok(bytes_read)
    }
}

#[cfg(test)]
impl Drop for MockSerialPort {
    fn drop(&mut self) {
        if std::thread::panicking() {
            return;
        }

        assert_eq!(
            self.read_pos,
            self.read_buffer.len(),
            "MockSerialPort dropped with {} unconsumed responses (read {} of {} bytes)",
            self.read_buffer.len() - self.read_pos,
            self.read_pos,
            self.read_buffer.len()
        );

        assert_eq!(
            &self.write_log,
            &self.expected_writes,
            "MockSerialPort write log mismatch!\nExpected {} bytes:\n{:02X?}\nGot {} bytes:\n{:02X?}",
            self.expected_writes.len(),
            self.expected_writes,
            self.write_log.len(),
            self.write_log
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_scripted_reads() {
        let mut port = MockSerialPort::new(vec![Some(b'C'), None, Some(0x06)], vec![]);
        let mut buf = [0u8; 1];

        assert_eq!(port.read_timeout(&mut buf, Duration::ZERO).unwrap(), 1);
        assert_eq!(buf[0], b'C');
        let err = port.read_timeout(&mut buf, Duration::ZERO).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::TimedOut);
        assert_eq!(port.read_timeout(&mut buf, Duration::ZERO).unwrap(), 1);
        assert_eq!(buf[0], 0x06);
    }

    #[test]
    fn test_mock_write_limit() {
        let mut port = MockSerialPort::new(vec![], vec![1, 2]).with_write_limit(2);
        assert_eq!(port.write(&[1, 2, 3, 4]).unwrap(), 2);
    }

    #[test]
    fn test_mock_cancels_when_drained() {
        let cancel = CancelToken::new();
        let mut port = MockSerialPort::new(vec![], vec![]).cancel_when_drained(cancel.clone());
        let mut buf = [0u8; 1];

        assert!(!cancel.is_cancelled());
        assert!(port.read_timeout(&mut buf, Duration::ZERO).is_err());
        assert!(cancel.is_cancelled());
    }
}
