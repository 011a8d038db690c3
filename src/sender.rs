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

use std::marker::PhantomData;
use std::time::Instant;
use tracing::{debug, trace};
use crate::cancel::CancelToken;
use crate::config::TransferConfig;
use crate::error::SenderError;
use crate::packet::{Packet, next_sequence};
use crate::protocol::*;
use crate::serial::SerialPort;
use crate::session::{ProgressSink, TransferEvent, TransferSession, is_silence};
use crate::source::ChunkSource;

// ============================================================================
// States
// ============================================================================

pub struct AwaitSync;
pub struct Transmitting;
pub struct AwaitAck;
pub struct SendingEot;
pub struct AwaitEotAck;

// ============================================================================
// FSM Structure
// ============================================================================

pub struct SenderFsm<'a, State> {
    state: PhantomData<State>,
    serial: &'a mut dyn SerialPort,
    source: &'a mut dyn ChunkSource,
    session: &'a mut TransferSession,
    progress: &'a mut dyn ProgressSink,
    config: &'a TransferConfig,
    cancel: &'a CancelToken,
    // In-flight packet; kept until ACKed so a resend is byte-identical
    packet: Option<Packet>,
    payload_len: usize,
    last: bool,
    waiting_since: Instant,
}

// ============================================================================
// Trait
// ============================================================================

pub trait SenderState<'a> {
    fn step(self: Box<Self>) -> Result<Box<dyn SenderState<'a> + 'a>, SenderError>;
}

// ============================================================================
// Helpers shared by every state
// ============================================================================

impl<'a, S: 'static> SenderFsm<'a, S> {
    fn transition<T: 'static>(self) -> Box<SenderFsm<'a, T>> {
        Box::new(SenderFsm {
            state: PhantomData,
            serial: self.serial,
            source: self.source,
            session: self.session,
            progress: self.progress,
            config: self.config,
            cancel: self.cancel,
            packet: self.packet,
            payload_len: self.payload_len,
            last: self.last,
            waiting_since: Instant::now(),
        })
    }

    fn io_error(&self, e: std::io::Error) -> SenderError {
        let type_name = std::any::type_name::<S>();
        let state_name = type_name.split("::").last().unwrap_or(type_name);
        SenderError::Io(std::io::Error::new(
            e.kind(),
            format!("{} (in state: {})", e, state_name)
        ))
    }

    fn check_cancel(&self) -> Result<(), SenderError> {
        if self.cancel.is_cancelled() {
            debug!("cancelled");
            return Err(SenderError::Cancelled);
        }
        Ok(())
    }

    /// Wait at most one poll interval for a single byte.
    fn poll_byte(&mut self) -> Result<Option<u8>, SenderError> {
        self.check_cancel()?;

        let mut buf = [0u8; 1];
        match self.serial.read_timeout(&mut buf, self.config.poll_interval) {
            Ok(0) => Ok(None),
            Ok(_) => {
                trace!("Received: 0x{:02X}", buf[0]);
                Ok(Some(buf[0]))
            }
            Err(e) if is_silence(&e) => Ok(None),
            Err(e) => Err(self.io_error(e)),
        }
    }

    /// One write call carrying all of `bytes`; anything less is fatal.
    fn send_frame(&mut self, bytes: &[u8]) -> Result<(), SenderError> {
        match self.serial.write(bytes) {
            Ok(n) if n == bytes.len() => Ok(()),
            Ok(written) => Err(SenderError::ShortWrite { written, expected: bytes.len() }),
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn emit(&mut self, event: TransferEvent) {
        self.progress.on_event(&event);
    }

    /// Count a resend of the in-flight packet against the retry ceiling.
    fn record_retry(&mut self) -> Result<(), SenderError> {
        self.session.retries += 1;
        self.session.total_retries += 1;
        match self.config.max_retries {
            Some(max) if self.session.retries > max => Err(SenderError::RetryLimit {
                sequence: self.session.sequence,
                retries: self.session.retries,
            }),
            _ => Ok(()),
        }
    }
}

// ============================================================================
// State Implementations
// ============================================================================

impl<'a> SenderState<'a> for SenderFsm<'a, AwaitSync> {
    fn step(self: Box<Self>) -> Result<Box<dyn SenderState<'a> + 'a>, SenderError> {
        let mut fsm = *self;

        match fsm.poll_byte()? {
            Some(SYNC) => {
                let total = fsm.session.total;
                fsm.emit(TransferEvent::Synchronized { total });
                Ok(fsm.transition::<Transmitting>())
            }
            Some(byte) => {
                debug!("ignoring 0x{:02X} while waiting for sync", byte);
                Ok(Box::new(fsm))
            }
            None => match fsm.config.sync_timeout {
                Some(limit) if fsm.waiting_since.elapsed() >= limit => {
                    Err(SenderError::SyncTimeout(limit))
                }
                _ => Ok(Box::new(fsm)),
            },
        }
    }
}

impl<'a> SenderState<'a> for SenderFsm<'a, Transmitting> {
    fn step(self: Box<Self>) -> Result<Box<dyn SenderState<'a> + 'a>, SenderError> {
        let mut fsm = *self;
        fsm.check_cancel()?;

        let packet = match fsm.packet.take() {
            Some(packet) => packet,
            None => match fsm.source.read_chunk() {
                Ok(Some(chunk)) => {
                    fsm.session.retries = 0;
                    fsm.payload_len = chunk.len;
                    fsm.last = chunk.is_last;
                    let packet = Packet::build(fsm.session.sequence, chunk.bytes());
                    debug!("Prepared {:?} ({} bytes)", packet, chunk.len);
                    packet
                }
                Ok(None) => return Ok(fsm.transition::<SendingEot>()),
                Err(e) => return Err(fsm.io_error(e)),
            },
        };

        let result = fsm.send_frame(packet.as_bytes());
        fsm.packet = Some(packet);
        result?;

        let (sequence, retries) = (fsm.session.sequence, fsm.session.retries);
        fsm.emit(TransferEvent::PacketSent { sequence, retries });
        Ok(fsm.transition::<AwaitAck>())
    }
}

impl<'a> SenderState<'a> for SenderFsm<'a, AwaitAck> {
    fn step(self: Box<Self>) -> Result<Box<dyn SenderState<'a> + 'a>, SenderError> {
        let mut fsm = *self;

        match fsm.poll_byte()?.map(Response::from) {
            Some(Response::Ack) => {
                fsm.packet = None;
                fsm.session.accepted += 1;
                fsm.session.bytes += fsm.payload_len as u64;
                fsm.session.retries = 0;
                let (sequence, accepted, total) =
                    (fsm.session.sequence, fsm.session.accepted, fsm.session.total);
                fsm.emit(TransferEvent::PacketAccepted { sequence, accepted, total });
                fsm.session.sequence = next_sequence(sequence);

                if fsm.last {
                    Ok(fsm.transition::<SendingEot>())
                } else {
                    Ok(fsm.transition::<Transmitting>())
                }
            }
            Some(Response::Nak) => {
                fsm.record_retry()?;
                let (sequence, retries) = (fsm.session.sequence, fsm.session.retries);
                fsm.emit(TransferEvent::PacketRejected { sequence, retries });
                Ok(fsm.transition::<Transmitting>())
            }
            Some(Response::Sync) => {
                fsm.emit(TransferEvent::UnexpectedByte(SYNC));
                Ok(Box::new(fsm))
            }
            Some(Response::Other(byte)) => {
                fsm.emit(TransferEvent::UnexpectedByte(byte));
                Ok(Box::new(fsm))
            }
            None => match fsm.config.response_timeout {
                Some(limit) if fsm.waiting_since.elapsed() >= limit => {
                    fsm.record_retry()?;
                    let (sequence, retries) = (fsm.session.sequence, fsm.session.retries);
                    fsm.emit(TransferEvent::ResponseTimeout { sequence, retries });
                    Ok(fsm.transition::<Transmitting>())
                }
                _ => Ok(Box::new(fsm)),
            },
        }
    }
}

impl<'a> SenderState<'a> for SenderFsm<'a, SendingEot> {
    fn step(self: Box<Self>) -> Result<Box<dyn SenderState<'a> + 'a>, SenderError> {
        let mut fsm = *self;
        fsm.check_cancel()?;

        fsm.send_frame(&[EOT])?;
        fsm.emit(TransferEvent::EotSent);
        Ok(fsm.transition::<AwaitEotAck>())
    }
}

impl<'a> SenderState<'a> for SenderFsm<'a, AwaitEotAck> {
    fn step(self: Box<Self>) -> Result<Box<dyn SenderState<'a> + 'a>, SenderError> {
        let mut fsm = *self;

        // EOT is never resent: whatever comes back (or nothing) ends the transfer
        let answer = match fsm.poll_byte()?.map(Response::from) {
            Some(response) => Some(response),
            None if fsm.waiting_since.elapsed() >= fsm.config.eot_timeout => None,
            None => return Ok(Box::new(fsm)),
        };

        fsm.session.eot_acked = answer == Some(Response::Ack);
        fsm.emit(TransferEvent::EotAnswered(answer));
        Err(SenderError::TransferComplete)
    }
}

// ============================================================================
// Constructor
// ============================================================================

impl<'a> SenderFsm<'a, AwaitSync> {
    pub fn new(
        serial: &'a mut dyn SerialPort,
        source: &'a mut dyn ChunkSource,
        session: &'a mut TransferSession,
        progress: &'a mut dyn ProgressSink,
        config: &'a TransferConfig,
        cancel: &'a CancelToken,
    ) -> Box<dyn SenderState<'a> + 'a> {
        Box::new(SenderFsm {
            state: PhantomData::<AwaitSync>,
            serial,
            source,
            session,
            progress,
            config,
            cancel,
            packet: None,
            payload_len: 0,
            last: false,
            waiting_since: Instant::now(),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
