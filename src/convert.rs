//! Conversion of 2bpp tile data into the printer's four tone planes.
//!
//! Each 640 byte packet holds two rows ("big rows") of 20 tiles. A tile is
//! 8×8 pixels stored as 8 pixel rows of two bytes: the low bit plane byte
//! followed by the high bit plane byte. The printer takes four independent
//! 1-bit planes, one per hard-wired intensity, so every pixel row byte pair
//! is split with fixed bit algebra:
//!
//! | shade | low | high | planes set |
//! |-------|-----|------|------------|
//! | white | 0 | 0 | none |
//! | light gray | 1 | 0 | 4, 2, 1 |
//! | dark gray | 0 | 1 | 8, 1 |
//! | black | 1 | 1 | 8, 4, 2, 1 |

use log::debug;

use crate::{
    compression::decompress,
    error::Error,
    packet::PACKET_SIZE,
    store::{PacketStore, PAGE_SIZE},
};

pub const TILES_PER_BIG_ROW: usize = 20;
pub const BIG_ROWS_PER_PACKET: usize = 2;
pub const ROWS_PER_TILE: usize = 8;
pub const BYTES_PER_TILE: usize = ROWS_PER_TILE * 2;
pub const BYTES_PER_BIG_ROW: usize = TILES_PER_BIG_ROW * BYTES_PER_TILE;

/// Pixel rows produced from one packet.
pub const ROWS_PER_PACKET: usize = BIG_ROWS_PER_PACKET * ROWS_PER_TILE;

/// Bytes in one plane row, 160 pixels at 8 pixels per byte.
pub const PLANE_WIDTH_BYTES: usize = TILES_PER_BIG_ROW;

/// Rows in one plane: a full page of packets, two screens tall.
pub const PLANE_ROWS: usize = PAGE_SIZE * ROWS_PER_PACKET;

/// Printer tone planes, named by their weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Weight8,
    Weight4,
    Weight2,
    Weight1,
}

impl Tone {
    pub const ALL: [Tone; 4] = [Tone::Weight8, Tone::Weight4, Tone::Weight2, Tone::Weight1];

    pub fn index(&self) -> usize {
        match self {
            Self::Weight8 => 0,
            Self::Weight4 => 1,
            Self::Weight2 => 2,
            Self::Weight1 => 3,
        }
    }
}

/// Split one pixel row of a tile into its four tone bytes.
///
/// Returned in [`Tone::ALL`] order. The weight 4 and weight 2 planes are
/// identical, which doubles ink coverage for light gray.
pub fn tone_bytes(low: u8, high: u8) -> [u8; 4] {
    let lightgray = low & !high;
    let darkgray = !low & high;
    let black = low & high;

    [
        black | darkgray,
        black | lightgray,
        black | lightgray,
        black | darkgray | lightgray,
    ]
}

/// One 1-bit plane sized for a full page.
#[derive(Clone, PartialEq, Eq)]
pub struct TonePlane {
    bytes: Box<[u8; PLANE_ROWS * PLANE_WIDTH_BYTES]>,
}

impl TonePlane {
    pub fn new() -> Self {
        TonePlane {
            bytes: Box::new([0x00; PLANE_ROWS * PLANE_WIDTH_BYTES]),
        }
    }

    pub fn row(&self, row: usize) -> &[u8] {
        assert!(row < PLANE_ROWS, "plane row {} out of range", row);
        let start = row * PLANE_WIDTH_BYTES;
        &self.bytes[start..start + PLANE_WIDTH_BYTES]
    }

    pub fn get(&self, row: usize, col: usize) -> u8 {
        assert!(col < PLANE_WIDTH_BYTES, "plane column {} out of range", col);
        self.row(row)[col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: u8) {
        assert!(row < PLANE_ROWS, "plane row {} out of range", row);
        assert!(col < PLANE_WIDTH_BYTES, "plane column {} out of range", col);
        self.bytes[row * PLANE_WIDTH_BYTES + col] = value;
    }

    /// The first `rows` rows as one contiguous slice.
    pub fn rows(&self, rows: usize) -> &[u8] {
        assert!(rows <= PLANE_ROWS, "plane has only {} rows", PLANE_ROWS);
        &self.bytes[..rows * PLANE_WIDTH_BYTES]
    }

    pub fn clear(&mut self) {
        self.bytes.fill(0x00);
    }
}

impl Default for TonePlane {
    fn default() -> Self {
        Self::new()
    }
}

/// Converts stored packets, one page at a time, into reused tone planes.
pub struct ToneConverter {
    planes: [TonePlane; 4],
    scratch: [u8; PACKET_SIZE],
    converted_packets: usize,
    current_page: usize,
}

impl ToneConverter {
    pub fn new() -> Self {
        ToneConverter {
            planes: [
                TonePlane::new(),
                TonePlane::new(),
                TonePlane::new(),
                TonePlane::new(),
            ],
            scratch: [0x00; PACKET_SIZE],
            converted_packets: 0,
            current_page: 0,
        }
    }

    pub fn planes(&self) -> &[TonePlane; 4] {
        &self.planes
    }

    pub fn plane(&self, tone: Tone) -> &TonePlane {
        &self.planes[tone.index()]
    }

    /// Packets written by the last page conversion.
    pub fn converted_packets(&self) -> usize {
        self.converted_packets
    }

    /// Plane rows holding valid data after the last page conversion.
    pub fn valid_rows(&self) -> usize {
        self.converted_packets * ROWS_PER_PACKET
    }

    /// Zero based page converted last.
    pub fn current_page(&self) -> usize {
        self.current_page
    }

    /// Convert packets `page * PAGE_SIZE ..` into the planes, page 0 style,
    /// so every page lands at the top of the planes.
    ///
    /// Returns the number of packets converted, fewer than [`PAGE_SIZE`] on
    /// the final page.
    pub fn convert_page(&mut self, store: &PacketStore, page: usize) -> Result<usize, Error> {
        let pages = store.page_count();
        if page >= pages {
            return Err(Error::PageOutOfRange { page, pages });
        }

        self.current_page = page;
        self.converted_packets = 0;
        let range = store.page_range(page);
        debug!("Converting page {}/{}: packets {:?}", page + 1, pages, range);

        for (output_index, gb_index) in range.clone().enumerate() {
            self.convert_packet(store, gb_index, output_index)?;
        }
        self.converted_packets = range.len();
        Ok(self.converted_packets)
    }

    /// Convert stored packet `gb_index` into output slot `output_index`.
    ///
    /// Compressed packets are decoded first, bounded by their declared
    /// length. A decoding error leaves the planes untouched.
    pub fn convert_packet(
        &mut self,
        store: &PacketStore,
        gb_index: usize,
        output_index: usize,
    ) -> Result<(), Error> {
        let stored = store.get(gb_index).ok_or(Error::PacketIndexOutOfRange {
            index: gb_index,
            count: store.len(),
        })?;
        if output_index >= PAGE_SIZE {
            return Err(Error::OutputSlotOutOfRange {
                index: output_index,
                slots: PAGE_SIZE,
            });
        }

        let tiles: &[u8; PACKET_SIZE] = if stored.compressed {
            self.scratch.fill(0x00);
            decompress(
                &stored.data,
                stored.data_length as usize,
                &mut self.scratch,
            )?;
            &self.scratch
        } else {
            &stored.data
        };

        for big_row in 0..BIG_ROWS_PER_PACKET {
            let trow = (output_index * BIG_ROWS_PER_PACKET + big_row) * ROWS_PER_TILE;
            for tile_idx in 0..TILES_PER_BIG_ROW {
                let tile_offset = big_row * BYTES_PER_BIG_ROW + tile_idx * BYTES_PER_TILE;
                for row in 0..ROWS_PER_TILE {
                    let low = tiles[tile_offset + row * 2];
                    let high = tiles[tile_offset + row * 2 + 1];
                    for (plane, byte) in self.planes.iter_mut().zip(tone_bytes(low, high)) {
                        plane.set(trow + row, tile_idx, byte);
                    }
                }
            }
        }
        Ok(())
    }
}

impl Default for ToneConverter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        compression::compress,
        packet::{Command, Packet},
    };

    fn store_with(packets: &[Packet]) -> PacketStore {
        let mut store = PacketStore::new();
        for packet in packets {
            store.append(packet).unwrap();
        }
        store
    }

    fn uniform_tiles(low: u8, high: u8) -> Vec<u8> {
        [low, high].repeat(PACKET_SIZE / 2)
    }

    #[test]
    fn shades_map_to_planes() {
        assert_eq!(tone_bytes(0x00, 0x00), [0x00; 4]);
        assert_eq!(tone_bytes(0xFF, 0x00), [0x00, 0xFF, 0xFF, 0xFF]);
        assert_eq!(tone_bytes(0x00, 0xFF), [0xFF, 0x00, 0x00, 0xFF]);
        assert_eq!(tone_bytes(0xFF, 0xFF), [0xFF; 4]);
    }

    #[test]
    fn weight4_and_weight2_always_match() {
        for low in 0..=255u8 {
            for high in (0..=255u8).step_by(7) {
                let tones = tone_bytes(low, high);
                assert_eq!(tones[1], tones[2]);
            }
        }
    }

    #[test]
    fn black_tile_sets_every_plane() {
        let mut data = vec![0x00; PACKET_SIZE];
        // first pixel row of tile 3 in the second big row is black
        let offset = BYTES_PER_BIG_ROW + 3 * BYTES_PER_TILE;
        data[offset] = 0xFF;
        data[offset + 1] = 0xFF;
        let store = store_with(&[Packet::with_payload(Command::Data, false, &data).unwrap()]);

        let mut converter = ToneConverter::new();
        converter.convert_packet(&store, 0, 0).unwrap();
        for tone in Tone::ALL {
            let plane = converter.plane(tone);
            assert_eq!(plane.get(8, 3), 0xFF);
            assert_eq!(plane.get(8, 2), 0x00);
            assert_eq!(plane.get(9, 3), 0x00);
            assert_eq!(plane.get(0, 3), 0x00);
        }
    }

    #[test]
    fn mixed_bits_split_per_pixel() {
        // pixel 0 black, pixel 1 dark gray, pixel 2 light gray, rest white
        let low = 0b1010_0000;
        let high = 0b1100_0000;
        let tones = tone_bytes(low, high);
        assert_eq!(tones[Tone::Weight8.index()], 0b1100_0000);
        assert_eq!(tones[Tone::Weight4.index()], 0b1010_0000);
        assert_eq!(tones[Tone::Weight1.index()], 0b1110_0000);
    }

    #[test]
    fn converting_twice_is_idempotent() {
        let data: Vec<u8> = (0..PACKET_SIZE).map(|i| (i * 37 % 256) as u8).collect();
        let store = store_with(&[Packet::with_payload(Command::Data, false, &data).unwrap()]);
        let mut converter = ToneConverter::new();
        converter.convert_packet(&store, 0, 5).unwrap();
        let first = converter.planes().clone();
        converter.convert_packet(&store, 0, 5).unwrap();
        assert!(first == *converter.planes());
    }

    #[test]
    fn compressed_packet_matches_uncompressed() {
        // runs of eight equal bytes, so the encoding is shorter than the data
        let tiles: Vec<u8> = (0..PACKET_SIZE)
            .map(|i| if (i / 8) % 3 == 0 { 0xF0 } else { 0x3C })
            .collect();
        let packed = compress(&tiles);
        assert!(packed.len() <= PACKET_SIZE);
        let store = store_with(&[
            Packet::with_payload(Command::Data, false, &tiles).unwrap(),
            Packet::with_payload(Command::Data, true, &packed).unwrap(),
        ]);
        let mut plain = ToneConverter::new();
        plain.convert_packet(&store, 0, 0).unwrap();
        let mut decoded = ToneConverter::new();
        decoded.convert_packet(&store, 1, 0).unwrap();
        assert!(plain.planes() == decoded.planes());
    }

    #[test]
    fn corrupt_compressed_packet_is_an_error() {
        // a 129 byte repeat run five times over is more than a packet holds
        let packed = [0xFF, 0x01].repeat(5);
        let store = store_with(&[Packet::with_payload(Command::Data, true, &packed).unwrap()]);
        let mut converter = ToneConverter::new();
        assert!(matches!(
            converter.convert_packet(&store, 0, 0),
            Err(Error::DecompressionOverflow { .. })
        ));
        assert_eq!(converter.plane(Tone::Weight1).get(0, 0), 0x00);
    }

    #[test]
    fn second_page_lands_at_top() {
        let mut packets = Vec::new();
        for i in 0..(PAGE_SIZE + 2) {
            let shade = if i < PAGE_SIZE { 0x00 } else { 0xFF };
            let tiles = uniform_tiles(shade, shade);
            packets.push(Packet::with_payload(Command::Data, false, &tiles).unwrap());
        }
        let store = store_with(&packets);
        let mut converter = ToneConverter::new();

        assert_eq!(converter.convert_page(&store, 0).unwrap(), PAGE_SIZE);
        assert_eq!(converter.valid_rows(), PLANE_ROWS);
        assert_eq!(converter.plane(Tone::Weight8).get(0, 0), 0x00);

        assert_eq!(converter.convert_page(&store, 1).unwrap(), 2);
        assert_eq!(converter.current_page(), 1);
        assert_eq!(converter.valid_rows(), 2 * ROWS_PER_PACKET);
        assert_eq!(converter.plane(Tone::Weight8).get(0, 0), 0xFF);
        assert_eq!(converter.plane(Tone::Weight8).get(31, 19), 0xFF);
    }

    #[test]
    fn page_past_end_is_an_error() {
        let store = PacketStore::new();
        let mut converter = ToneConverter::new();
        assert!(matches!(
            converter.convert_page(&store, 0),
            Err(Error::PageOutOfRange { page: 0, pages: 0 })
        ));
    }

    #[test]
    fn bad_indices_are_rejected() {
        let store = store_with(&[Packet::with_payload(Command::Data, false, &[0; 4]).unwrap()]);
        let mut converter = ToneConverter::new();
        assert!(matches!(
            converter.convert_packet(&store, 1, 0),
            Err(Error::PacketIndexOutOfRange { index: 1, count: 1 })
        ));
        assert!(matches!(
            converter.convert_packet(&store, 0, PAGE_SIZE),
            Err(Error::OutputSlotOutOfRange { .. })
        ));
    }

    #[test]
    #[should_panic(expected = "plane row")]
    fn plane_write_is_bounds_checked() {
        TonePlane::new().set(PLANE_ROWS, 0, 0xFF);
    }
}
