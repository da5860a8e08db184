//! Error types for link emulation, conversion and printer output.
//!
//! Faults inside the byte-level link state machine are recovered locally and
//! described by [`ProtocolError`]; everything that aborts an operation is an
//! [`Error`].

use thiserror::Error;

/// Main error type for the printer emulator.
#[derive(Error, Debug)]
pub enum Error {
    /// Writing to the printer byte stream failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The packet store has no free slot left.
    ///
    /// The print session should be reset rather than continuing with a
    /// partial image.
    #[error("Packet store is full ({capacity} packets)")]
    BufferFull { capacity: usize },

    /// Decoding the run-length data would write past the packet buffer.
    #[error("Decompressed data overflows the {capacity} byte packet buffer")]
    DecompressionOverflow { capacity: usize },

    /// Data handed to a packet builder does not fit in one packet.
    #[error("Payload of {len} bytes does not fit in a {capacity} byte packet")]
    PayloadTooLarge { len: usize, capacity: usize },

    #[error("Compressed data ends early at offset {offset}")]
    TruncatedCompressedData { offset: usize },

    /// A completed packet carried a command byte outside the known set.
    #[error("Unknown link command 0x{0:02X}")]
    UnknownCommand(u8),

    #[error("Packet index {index} out of range, store holds {count} packets")]
    PacketIndexOutOfRange { index: usize, count: usize },

    #[error("Output slot {index} does not fit in a page of {slots} packets")]
    OutputSlotOutOfRange { index: usize, slots: usize },

    #[error("Page {page} out of range, {pages} pages stored")]
    PageOutOfRange { page: usize, pages: usize },

    #[error("Unsupported zoom factor {0}")]
    UnsupportedZoom(u8),

    #[error("Invalid tone value {0}, must be 0-3 or 49-52")]
    InvalidTone(u8),

    /// Invalid configuration parameter provided.
    #[error("Invalid configuration parameter: {0}")]
    InvalidConfig(String),
}

/// Framing faults seen by the packet assembler.
///
/// These never leave the link layer: the assembler answers with the error
/// reply byte, returns to idle and keeps the last fault for the polling side
/// to report.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("First magic byte bad: 0x{0:02X}")]
    BadFirstMagic(u8),

    #[error("Second magic byte bad: 0x{0:02X}")]
    BadSecondMagic(u8),
}
