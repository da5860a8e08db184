use std::fmt;

use crate::error::Error;

/// Two bytes that open every packet on the link.
pub const MAGIC: [u8; 2] = [0x88, 0x33];

/// Largest payload a packet can carry (0x280 bytes, two rows of 20 tiles).
pub const PACKET_SIZE: usize = 0x280;

/// Command byte of a link packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Init,
    Print,
    Data,
    Break,
    Status,
}

impl Command {
    pub fn from_code(code: u8) -> Result<Self, Error> {
        match code {
            0x01 => Ok(Self::Init),
            0x02 => Ok(Self::Print),
            0x04 => Ok(Self::Data),
            0x08 => Ok(Self::Break),
            0x0F => Ok(Self::Status),
            _ => Err(Error::UnknownCommand(code)),
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            Self::Init => 0x01,
            Self::Print => 0x02,
            Self::Data => 0x04,
            Self::Break => 0x08,
            Self::Status => 0x0F,
        }
    }
}

/// One framed link transmission.
///
/// The command is kept as the raw byte seen on the wire so that the
/// assembler never has to reject anything mid-frame; [`Packet::command`]
/// decodes it once the packet is complete.
#[derive(Clone)]
pub struct Packet {
    pub command: u8,
    pub compression_flag: bool,
    pub data_length: u16,
    pub payload: [u8; PACKET_SIZE],
    pub checksum: u16,
}

impl Packet {
    pub fn new() -> Self {
        Packet {
            command: 0,
            compression_flag: false,
            data_length: 0,
            payload: [0x00; PACKET_SIZE],
            checksum: 0,
        }
    }

    /// Build a packet the way a sender would, with a correct checksum.
    ///
    /// Fails with [`Error::PayloadTooLarge`] when `data` does not fit in one
    /// packet.
    pub fn with_payload(
        command: Command,
        compression_flag: bool,
        data: &[u8],
    ) -> Result<Self, Error> {
        if data.len() > PACKET_SIZE {
            return Err(Error::PayloadTooLarge {
                len: data.len(),
                capacity: PACKET_SIZE,
            });
        }
        let mut packet = Packet::new();
        packet.command = command.code();
        packet.compression_flag = compression_flag;
        packet.data_length = data.len() as u16;
        packet.payload[..data.len()].copy_from_slice(data);
        packet.checksum = packet.calculated_checksum();
        Ok(packet)
    }

    pub fn command(&self) -> Result<Command, Error> {
        Command::from_code(self.command)
    }

    /// The logically valid part of the payload.
    pub fn data(&self) -> &[u8] {
        &self.payload[..self.valid_len()]
    }

    fn valid_len(&self) -> usize {
        (self.data_length as usize).min(PACKET_SIZE)
    }

    /// Sum of header and payload bytes, as computed by a sender.
    pub fn calculated_checksum(&self) -> u16 {
        let header = [
            self.command,
            self.compression_flag as u8,
            (self.data_length & 0xFF) as u8,
            (self.data_length >> 8) as u8,
        ];
        header
            .iter()
            .chain(self.data().iter())
            .fold(0u16, |sum, &b| sum.wrapping_add(b as u16))
    }

    pub fn checksum_matches(&self) -> bool {
        self.calculated_checksum() == self.checksum
    }

    /// Serialize into the byte sequence a handheld clocks out, magic through
    /// checksum.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf: Vec<u8> = Vec::with_capacity(8 + self.valid_len());
        buf.extend_from_slice(&MAGIC);
        buf.push(self.command);
        buf.push(self.compression_flag as u8);
        buf.extend_from_slice(&self.data_length.to_le_bytes());
        buf.extend_from_slice(self.data());
        buf.extend_from_slice(&self.checksum.to_le_bytes());
        buf
    }
}

impl Default for Packet {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("command", &format_args!("0x{:02X}", self.command))
            .field("compression_flag", &self.compression_flag)
            .field("data_length", &self.data_length)
            .field("checksum", &format_args!("0x{:04X}", self.checksum))
            .finish()
    }
}
