//! Bit-stretch lookup used to magnify plane rows before transmission.
//!
//! Every bit of a plane byte becomes `zoom` copies of itself, most
//! significant bit first, matching the left-to-right pixel order of the
//! tone planes. For example `0b1001_0110` at 3× becomes
//! `111000000111000111111000`.

use crate::error::Error;

/// Zoom factors with a precomputed table.
pub const ZOOM_FACTORS: [u8; 3] = [2, 3, 4];

/// Precomputed stretch patterns for every byte value.
///
/// Built once at startup and shared read-only afterwards.
pub struct ZoomTable {
    x2: [[u8; 2]; 256],
    x3: [[u8; 3]; 256],
    x4: [[u8; 4]; 256],
}

fn stretch(n: u32, zoom: u32) -> u32 {
    if n == 0 {
        0
    } else {
        (1 << zoom) * stretch(n / 2, zoom) + (n % 2)
    }
}

/// Stretch one byte into `N` big-endian bytes.
fn pattern<const N: usize>(value: u8) -> [u8; N] {
    let zoom = N as u32;
    let stretched = stretch(value as u32, zoom) * ((1 << zoom) - 1);
    let be = stretched.to_be_bytes();
    let mut out = [0u8; N];
    out.copy_from_slice(&be[4 - N..]);
    out
}

impl ZoomTable {
    pub fn new() -> Self {
        let mut table = ZoomTable {
            x2: [[0; 2]; 256],
            x3: [[0; 3]; 256],
            x4: [[0; 4]; 256],
        };
        for i in 0..256 {
            let value = i as u8;
            table.x2[i] = pattern::<2>(value);
            table.x3[i] = pattern::<3>(value);
            table.x4[i] = pattern::<4>(value);
        }
        table
    }

    /// The stretched pattern of `value` at `zoom`, `zoom` bytes long.
    pub fn lookup(&self, zoom: u8, value: u8) -> Result<&[u8], Error> {
        let i = value as usize;
        match zoom {
            2 => Ok(&self.x2[i][..]),
            3 => Ok(&self.x3[i][..]),
            4 => Ok(&self.x4[i][..]),
            _ => Err(Error::UnsupportedZoom(zoom)),
        }
    }

    /// Append the stretched form of `row` to `out`.
    pub fn stretch_row(&self, zoom: u8, row: &[u8], out: &mut Vec<u8>) -> Result<(), Error> {
        out.reserve(row.len() * zoom as usize);
        for &b in row {
            out.extend_from_slice(self.lookup(zoom, b)?);
        }
        Ok(())
    }
}

impl Default for ZoomTable {
    fn default() -> Self {
        Self::new()
    }
}
