//! Byte-level framing of the link protocol.
//!
//! [`PacketAssembler::handle_byte`] is called once per exchanged byte from
//! the transport's interrupt context, so it never allocates, never logs and
//! does a bounded amount of work. The reply it returns is latched by the
//! transport and clocked out on the next exchange.
//!
//! Packet layout on the wire:
//!
//! | bytes | content |
//! |-------|---------|
//! | 2 | magic `0x88 0x33` |
//! | 1 | command |
//! | 1 | compression flag |
//! | 2 | data length, little endian |
//! | n | payload |
//! | 2 | checksum, little endian |
//! | 2 | response clock bytes (device answers `0x81`, then status) |

use crate::{
    error::ProtocolError,
    packet::{Packet, MAGIC, PACKET_SIZE},
    status::DeviceStatus,
};

/// Reply to a byte that breaks framing.
pub const REPLY_ERROR: u8 = 0x40;

/// Fixed acknowledgement sent on the first checksum byte.
pub const REPLY_ACK: u8 = 0x81;

/// Reply for every byte that has nothing specific to answer.
pub const REPLY_NONE: u8 = 0x00;

const HEADER_LEN: u8 = 4;
const CHECKSUM_LEN: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Idle,
    MagicPartial,
    Header { remaining: u8 },
    Payload { remaining: u16 },
    Checksum { remaining: u8 },
    ResponseReady,
    ResponsePartial,
}

impl Default for LinkState {
    fn default() -> Self {
        Self::Idle
    }
}

pub struct PacketAssembler {
    state: LinkState,
    packet: Packet,
    protocol_errors: u32,
    last_error: Option<ProtocolError>,
}

impl PacketAssembler {
    pub fn new() -> Self {
        PacketAssembler {
            state: LinkState::Idle,
            packet: Packet::new(),
            protocol_errors: 0,
            last_error: None,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Number of framing faults since construction.
    pub fn protocol_errors(&self) -> u32 {
        self.protocol_errors
    }

    /// Take the most recent framing fault, if one happened since the last call.
    pub fn take_error(&mut self) -> Option<ProtocolError> {
        self.last_error.take()
    }

    /// Drop any partially assembled packet and return to idle.
    pub fn reset(&mut self) {
        self.state = LinkState::Idle;
    }

    /// Consume one received byte.
    ///
    /// Returns the reply byte and, on the last checksum byte, a copy of the
    /// completed packet. The packet is considered complete as soon as the
    /// response phase begins; the two response clock bytes that follow are
    /// absorbed without producing another packet.
    pub fn handle_byte(&mut self, rx: u8, status: DeviceStatus) -> (u8, Option<Packet>) {
        match self.state {
            LinkState::Idle => (self.start(rx), None),

            LinkState::MagicPartial => {
                if rx == MAGIC[1] {
                    self.state = LinkState::Header {
                        remaining: HEADER_LEN,
                    };
                    (REPLY_NONE, None)
                } else {
                    self.fault(ProtocolError::BadSecondMagic(rx));
                    (REPLY_ERROR, None)
                }
            }

            LinkState::Header { remaining } => {
                match HEADER_LEN - remaining {
                    0 => self.packet.command = rx,
                    1 => self.packet.compression_flag = rx != 0,
                    2 => self.packet.data_length = rx as u16,
                    _ => self.packet.data_length |= (rx as u16) << 8,
                }
                self.state = match remaining - 1 {
                    0 if self.packet.data_length > 0 => LinkState::Payload {
                        remaining: self.packet.data_length,
                    },
                    0 => LinkState::Checksum {
                        remaining: CHECKSUM_LEN,
                    },
                    left => LinkState::Header { remaining: left },
                };
                (REPLY_NONE, None)
            }

            LinkState::Payload { remaining } => {
                let idx = (self.packet.data_length - remaining) as usize;
                // lengths beyond the buffer are clocked through but not kept
                if idx < PACKET_SIZE {
                    self.packet.payload[idx] = rx;
                }
                self.state = match remaining - 1 {
                    0 => LinkState::Checksum {
                        remaining: CHECKSUM_LEN,
                    },
                    left => LinkState::Payload { remaining: left },
                };
                (REPLY_NONE, None)
            }

            LinkState::Checksum { remaining: 2 } => {
                self.packet.checksum = rx as u16;
                self.state = LinkState::Checksum { remaining: 1 };
                (REPLY_ACK, None)
            }

            LinkState::Checksum { .. } => {
                self.packet.checksum |= (rx as u16) << 8;
                self.state = LinkState::ResponseReady;
                (status.code(), Some(self.packet.clone()))
            }

            // A sender that skips the response clock bytes starts the next
            // packet straight away; resynchronise on its magic.
            LinkState::ResponseReady | LinkState::ResponsePartial if rx == MAGIC[0] => {
                self.state = LinkState::Idle;
                (self.start(rx), None)
            }

            LinkState::ResponseReady => {
                self.state = LinkState::ResponsePartial;
                (status.code(), None)
            }

            LinkState::ResponsePartial => {
                self.state = LinkState::Idle;
                (REPLY_NONE, None)
            }
        }
    }

    fn start(&mut self, rx: u8) -> u8 {
        if rx == MAGIC[0] {
            self.state = LinkState::MagicPartial;
            REPLY_NONE
        } else {
            self.fault(ProtocolError::BadFirstMagic(rx));
            REPLY_ERROR
        }
    }

    fn fault(&mut self, err: ProtocolError) {
        self.state = LinkState::Idle;
        self.protocol_errors = self.protocol_errors.wrapping_add(1);
        self.last_error = Some(err);
    }
}

impl Default for PacketAssembler {
    fn default() -> Self {
        Self::new()
    }
}
