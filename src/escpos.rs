//! ESC/POS command encoder for Epson TM-T88 class receipt printers.
//!
//! Images are printed through the printer's download graphics memory: the
//! four tone planes are defined under a two byte key code with `GS 8 L`
//! (function 83), then printed with `GS ( L` (function 85). The memory holds
//! one page of converted packets at 3× zoom. The key code comes from the
//! caller's [`PrintConfig`](crate::PrintConfig) on every call.

use std::{io::Write, thread, time::Duration};

use log::{debug, info};

use crate::{
    config::Justification,
    convert::{TonePlane, PLANE_ROWS, PLANE_WIDTH_BYTES},
    error::Error,
    zoom::ZoomTable,
};

/// Tone number the printer expects for the first plane.
pub const FIRST_TONE_NUMBER: u8 = 49;

/// Graphics tone mode for 4 tone data.
const MULTI_TONE: u8 = 52;

const TONES: usize = 4;

/// Everything the print job needs from a printer.
pub trait PrinterOutput {
    fn initialize(&mut self) -> Result<(), Error>;

    fn set_justification(&mut self, justification: Justification) -> Result<(), Error>;

    /// Store the first `rows` rows of every plane in printer memory under
    /// `keycode`, magnified by `zoom`.
    fn send_download_graphics(
        &mut self,
        keycode: [u8; 2],
        planes: &[TonePlane; 4],
        rows: usize,
        zoom: u8,
        table: &ZoomTable,
    ) -> Result<(), Error>;

    /// Print the image stored under `keycode`.
    fn print_download_graphics(&mut self, keycode: [u8; 2], zoom: u8) -> Result<(), Error>;

    /// Print whatever is in the print buffer.
    fn print_buffer(&mut self) -> Result<(), Error>;

    /// Feed `feed` × 1/360 in and cut.
    fn cut(&mut self, feed: u8) -> Result<(), Error>;
}

/// Map a tone index to the number sent before its plane data.
pub fn tone_number(tone: u8) -> Result<u8, Error> {
    match tone {
        0..=3 => Ok(tone + FIRST_TONE_NUMBER),
        49..=52 => Ok(tone),
        _ => Err(Error::InvalidTone(tone)),
    }
}

/// Magnification done before transmission. Zoom 2 is left to the printer.
fn physical_zoom(zoom: u8) -> u8 {
    if zoom < 3 {
        1
    } else {
        zoom
    }
}

/// Magnification requested from the printer at print time.
fn printer_zoom(zoom: u8) -> u8 {
    if zoom == 2 {
        2
    } else {
        1
    }
}

pub struct EscPos<W: Write> {
    writer: W,
    write_delay: Option<Duration>,
}

impl<W: Write> EscPos<W> {
    pub fn new(writer: W) -> Self {
        EscPos {
            writer,
            write_delay: None,
        }
    }

    /// Pause after every write. Some printers drop bytes on a busy UART
    /// without it.
    pub fn write_delay(self, delay: Duration) -> Self {
        EscPos {
            write_delay: Some(delay),
            ..self
        }
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, Error> {
        self.writer.write_all(buf)?;
        self.writer.flush()?;
        if let Some(delay) = self.write_delay {
            thread::sleep(delay);
        }
        Ok(buf.len())
    }

    /// `GS 8 L` header for `x` bytes by `y` rows per tone.
    fn download_graphics_header(keycode: [u8; 2], x: usize, y: usize) -> Vec<u8> {
        let p = (10 + (x * y + 1) * TONES) as u32;
        let dots = (x * 8) as u16;
        let rows = y as u16;

        let mut buf: Vec<u8> = Vec::new();
        buf.append(&mut [0x1D, 0x38, 0x4C].to_vec()); // GS 8 L
        buf.append(&mut p.to_le_bytes().to_vec());
        buf.append(&mut [0x30, 0x53, MULTI_TONE].to_vec()); // m fn a
        buf.append(&mut keycode.to_vec());
        buf.push(TONES as u8);
        buf.append(&mut dots.to_le_bytes().to_vec());
        buf.append(&mut rows.to_le_bytes().to_vec());
        buf
    }

    pub fn send_tone_number(&mut self, tone: u8) -> Result<(), Error> {
        let number = tone_number(tone)?;
        self.write(&[number])?;
        Ok(())
    }
}

impl<W: Write> PrinterOutput for EscPos<W> {
    fn initialize(&mut self) -> Result<(), Error> {
        self.write(&[0x1B, 0x40])?; // ESC @
        Ok(())
    }

    fn set_justification(&mut self, justification: Justification) -> Result<(), Error> {
        self.write(&[0x1B, 0x61, justification.code()])?; // ESC a n
        Ok(())
    }

    fn send_download_graphics(
        &mut self,
        keycode: [u8; 2],
        planes: &[TonePlane; 4],
        rows: usize,
        zoom: u8,
        table: &ZoomTable,
    ) -> Result<(), Error> {
        if zoom == 0 || zoom > 4 {
            return Err(Error::UnsupportedZoom(zoom));
        }
        let rows = rows.min(PLANE_ROWS);
        let phys_zoom = physical_zoom(zoom);
        let x = PLANE_WIDTH_BYTES * phys_zoom as usize;
        let y = rows * phys_zoom as usize;

        let header = Self::download_graphics_header(keycode, x, y);
        self.write(&header)?;
        info!("Sending download data, {} x {} dots", x * 8, y);

        let mut row_buf: Vec<u8> = Vec::with_capacity(x);
        for (i, plane) in planes.iter().enumerate() {
            debug!("Sending tone {}", i);
            self.send_tone_number(i as u8)?;
            for row in 0..rows {
                row_buf.clear();
                if phys_zoom >= 3 {
                    table.stretch_row(phys_zoom, plane.row(row), &mut row_buf)?;
                } else {
                    row_buf.extend_from_slice(plane.row(row));
                }
                // rows are repeated for vertical zoom
                for _ in 0..phys_zoom {
                    self.write(&row_buf)?;
                }
            }
        }
        Ok(())
    }

    fn print_download_graphics(&mut self, keycode: [u8; 2], zoom: u8) -> Result<(), Error> {
        let scale = printer_zoom(zoom);
        let mut buf: Vec<u8> = Vec::new();
        buf.append(&mut [0x1D, 0x28, 0x4C, 0x06, 0x00, 0x30, 0x55].to_vec()); // GS ( L fn 85
        buf.append(&mut keycode.to_vec());
        buf.append(&mut [scale, scale].to_vec());
        self.write(&buf)?;
        Ok(())
    }

    fn print_buffer(&mut self) -> Result<(), Error> {
        self.write(&[0x1D, 0x28, 0x4C, 0x02, 0x00, 0x30, 0x32])?; // GS ( L fn 50
        Ok(())
    }

    fn cut(&mut self, feed: u8) -> Result<(), Error> {
        self.write(&[0x1D, 0x56, 0x41, feed])?; // GS V 65 n
        Ok(())
    }
}
