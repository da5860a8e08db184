use std::ops::Range;

use log::debug;

use crate::{
    error::Error,
    packet::{Packet, PACKET_SIZE},
};

/// Data packets that make up one full handheld screen.
pub const PACKETS_PER_SCREEN: usize = 9;

/// Screens the store holds by default. Most images are at most two screens
/// tall, but banners made of many screens exist.
pub const DEFAULT_SCREENS: usize = 16;

/// Packets converted and transmitted together, the most the printer's
/// download graphics memory takes at once.
pub const PAGE_SIZE: usize = 18;

/// One received Data packet as kept for conversion.
#[derive(Clone)]
pub struct StoredPacket {
    pub data: [u8; PACKET_SIZE],
    pub compressed: bool,
    pub data_length: u16,
}

impl StoredPacket {
    fn empty() -> Self {
        StoredPacket {
            data: [0x00; PACKET_SIZE],
            compressed: false,
            data_length: 0,
        }
    }
}

/// Fixed capacity array of received packets.
///
/// All slots are allocated up front; appending only copies bytes.
pub struct PacketStore {
    slots: Vec<StoredPacket>,
    count: usize,
}

impl PacketStore {
    pub fn new() -> Self {
        Self::with_screens(DEFAULT_SCREENS)
    }

    pub fn with_screens(screens: usize) -> Self {
        Self::with_capacity(screens * PACKETS_PER_SCREEN)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        PacketStore {
            slots: vec![StoredPacket::empty(); capacity],
            count: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn get(&self, index: usize) -> Option<&StoredPacket> {
        self.slots[..self.count].get(index)
    }

    /// Copy a packet's payload and metadata into the next free slot.
    pub fn append(&mut self, packet: &Packet) -> Result<(), Error> {
        let capacity = self.slots.len();
        let slot = self
            .slots
            .get_mut(self.count)
            .ok_or(Error::BufferFull { capacity })?;
        slot.data.copy_from_slice(&packet.payload);
        slot.compressed = packet.compression_flag;
        slot.data_length = packet.data_length;
        self.count += 1;
        debug!("Received new packet, I have {}", self.count);
        Ok(())
    }

    /// Forget all packets. Payload bytes are left in place; they are
    /// overwritten before they are read again.
    pub fn clear(&mut self) {
        for slot in &mut self.slots[..self.count] {
            slot.compressed = false;
            slot.data_length = 0;
        }
        self.count = 0;
    }

    /// Number of pages needed to print everything held; zero when empty.
    pub fn page_count(&self) -> usize {
        (self.count + PAGE_SIZE - 1) / PAGE_SIZE
    }

    /// Packet indices that make up `page`.
    pub fn page_range(&self, page: usize) -> Range<usize> {
        let start = (page * PAGE_SIZE).min(self.count);
        let end = ((page + 1) * PAGE_SIZE).min(self.count);
        start..end
    }
}

impl Default for PacketStore {
    fn default() -> Self {
        Self::new()
    }
}
