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

use std::io::Write;
use std::time::Duration;
use tracing::{debug, info, warn};
use crate::cancel::CancelToken;
use crate::config::TransferConfig;
use crate::error::SenderError;
use crate::packet::FIRST_SEQUENCE;
use crate::protocol::{PACKET_LEN, Response};
use crate::sender::{AwaitSync, SenderFsm};
use crate::serial::SerialPort;
use crate::source::ChunkSource;

// ============================================================================
// Session State
// ============================================================================

/// Counters for one transfer, owned by the driver and updated by the FSM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSession {
    /// Sequence number of the in-flight packet
    pub sequence: u8,
    /// Packets the receiver has ACKed
    pub accepted: u64,
    /// Packets the whole file needs
    pub total: u64,
    /// File bytes carried by accepted packets
    pub bytes: u64,
    /// Resends of the in-flight packet
    pub retries: u32,
    /// Resends over the whole transfer
    pub total_retries: u64,
    pub eot_acked: bool,
}

impl TransferSession {
    pub fn new(total: u64) -> Self {
        TransferSession {
            sequence: FIRST_SEQUENCE,
            accepted: 0,
            total,
            bytes: 0,
            retries: 0,
            total_retries: 0,
            eot_acked: false,
        }
    }
}

// ============================================================================
// Progress Reporting
// ============================================================================

/// Things worth telling the user about while a transfer runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferEvent {
    Synchronized { total: u64 },
    PacketSent { sequence: u8, retries: u32 },
    PacketAccepted { sequence: u8, accepted: u64, total: u64 },
    PacketRejected { sequence: u8, retries: u32 },
    ResponseTimeout { sequence: u8, retries: u32 },
    UnexpectedByte(u8),
    EotSent,
    EotAnswered(Option<Response>),
}

pub trait ProgressSink {
    fn on_event(&mut self, event: &TransferEvent);
}

/// Reports progress through `tracing`
#[derive(Debug, Default)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn on_event(&mut self, event: &TransferEvent) {
        match *event {
            TransferEvent::Synchronized { total } => {
                info!("got sync request, start transfer ({} packets)", total)
            }
            TransferEvent::PacketSent { sequence, retries } => {
                debug!(sequence, retries, "packet sent")
            }
            TransferEvent::PacketAccepted { sequence, accepted, total } => {
                info!(sequence, "OK[{:02}/{:02}]", accepted, total)
            }
            TransferEvent::PacketRejected { sequence, retries } => {
                warn!(sequence, "ERROR[{:02}] NACK", retries)
            }
            TransferEvent::ResponseTimeout { sequence, retries } => {
                warn!(sequence, "ERROR[{:02}] no response, resending", retries)
            }
            TransferEvent::UnexpectedByte(byte) => warn!("received unexpected 0x{:02x}", byte),
            TransferEvent::EotSent => info!("end of file, EOT sent"),
            TransferEvent::EotAnswered(Some(Response::Ack)) => info!("OK <EOT> ACKed"),
            TransferEvent::EotAnswered(Some(response)) => {
                warn!("EOT answered with {}", response)
            }
            TransferEvent::EotAnswered(None) => warn!("no answer to EOT"),
        }
    }
}

#[cfg(test)]
impl ProgressSink for Vec<TransferEvent> {
    fn on_event(&mut self, event: &TransferEvent) {
        self.push(event.clone());
    }
}

// ============================================================================
// Driver
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSummary {
    pub outcome: Outcome,
    pub session: TransferSession,
}

/// Send everything `source` holds over `serial`.
///
/// Runs the state machine to completion or cancellation. The port is only
/// borrowed, so it is free for [`relay`] afterwards.
pub fn send(
    serial: &mut dyn SerialPort,
    source: &mut dyn ChunkSource,
    config: &TransferConfig,
    cancel: &CancelToken,
    progress: &mut dyn ProgressSink,
) -> Result<TransferSummary, SenderError> {
    let mut session = TransferSession::new(source.packet_count());
    info!("{} pkt to be sent ({} bytes)", session.total, source.total_size());
    info!("wait for synchro");

    let outcome = {
        let mut state = SenderFsm::<AwaitSync>::new(serial, source, &mut session, progress, config, cancel);
        loop {
            match state.step() {
                Ok(next) => state = next,
                Err(SenderError::TransferComplete) => break Outcome::Completed,
                Err(SenderError::Cancelled) => break Outcome::Cancelled,
                Err(e) => return Err(e),
            }
        }
    };

    match outcome {
        Outcome::Completed => info!(
            packets = session.accepted,
            bytes = session.bytes,
            retries = session.total_retries,
            "transfer complete"
        ),
        Outcome::Cancelled => info!(packets = session.accepted, "transfer cancelled"),
    }

    Ok(TransferSummary { outcome, session })
}

/// Copy whatever arrives on `serial` to `out` until cancelled.
/// Returns the number of bytes relayed.
pub fn relay(
    serial: &mut dyn SerialPort,
    out: &mut dyn Write,
    cancel: &CancelToken,
    poll_interval: Duration,
) -> Result<u64, SenderError> {
    let mut buf = [0u8; PACKET_LEN];
    let mut total = 0u64;

    while !cancel.is_cancelled() {
        match serial.read_timeout(&mut buf, poll_interval) {
            Ok(0) => {}
            Ok(n) => {
                out.write_all(&buf[..n])?;
                out.flush()?;
                total += n as u64;
            }
            Err(e) if is_silence(&e) => {}
            Err(e) => return Err(e.into()),
        }
    }

    Ok(total)
}

/// Read errors that just mean nothing arrived in time
pub(crate) fn is_silence(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock | std::io::ErrorKind::Interrupted
    )
}

// ============================================================================
// Tests
// ============================================================================
