//! Super GB Printer
//!
//! This crate emulates the Game Boy Printer on the handheld's link port and
//! reproduces the received images on an ESC/POS receipt printer.
//!
//! Bytes clocked in by the link hardware go through [`GbLink::on_byte`],
//! which answers like a real printer would. Once the handheld has sent a
//! full image and gone quiet, the 2bpp tile data is split into four tone
//! planes and sent to the printer's download graphics memory, a page at a
//! time.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Instant;
//! use super_gb_printer::{EscPos, GbLink, LogDisplay, NullTransport, PrintConfig, SuperPrinter};
//!
//! let output = EscPos::new(std::io::stdout());
//! let config = PrintConfig::new().add_bottom_margin(true);
//! let mut printer =
//!     SuperPrinter::new(GbLink::new(Instant::now()), output, LogDisplay, NullTransport, config)
//!         .unwrap();
//! printer.startup().unwrap();
//! loop {
//!     // feed printer.on_byte() from the link interrupt
//!     printer.poll(Instant::now()).unwrap();
//! }
//! ```

mod compression;
mod config;
mod convert;
mod display;
mod error;
mod escpos;
mod link;
mod packet;
mod printer;
mod session;
mod status;
mod store;
mod supervisor;
mod zoom;

pub use crate::{
    compression::{compress, decompress},
    config::{Justification, PrintConfig},
    convert::{tone_bytes, Tone, ToneConverter, TonePlane, PLANE_ROWS, PLANE_WIDTH_BYTES, ROWS_PER_PACKET},
    display::{LogDisplay, NullDisplay, StatusDisplay},
    error::{Error, ProtocolError},
    escpos::{tone_number, EscPos, PrinterOutput},
    link::{LinkState, PacketAssembler, REPLY_ACK, REPLY_ERROR, REPLY_NONE},
    packet::{Command, Packet, MAGIC, PACKET_SIZE},
    printer::{show_logo, SuperPrinter, LOGO_GLYPHS},
    session::GbLink,
    status::{DeviceStatus, DeviceStatusMachine, PacketEvent, FAKE_PRINT_TICKS},
    store::{PacketStore, StoredPacket, DEFAULT_SCREENS, PACKETS_PER_SCREEN, PAGE_SIZE},
    supervisor::{LinkSupervisor, LinkTimings, LinkTransport, NullTransport},
    zoom::ZoomTable,
};

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
