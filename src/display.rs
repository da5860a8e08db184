//! Status display capability.
//!
//! The printer reports progress on a small character LCD when one is
//! attached. Nothing the core does depends on the display, so every method is
//! best effort and returns nothing.

use log::info;

pub trait StatusDisplay {
    fn clear(&mut self);

    fn print(&mut self, text: &str);

    fn set_cursor(&mut self, col: u8, row: u8);

    /// Store a 5×8 custom glyph in character slot `location`.
    fn create_char(&mut self, location: u8, pattern: [u8; 8]);
}

/// Display that drops everything, for headless hosts and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDisplay;

impl StatusDisplay for NullDisplay {
    fn clear(&mut self) {}

    fn print(&mut self, _text: &str) {}

    fn set_cursor(&mut self, _col: u8, _row: u8) {}

    fn create_char(&mut self, _location: u8, _pattern: [u8; 8]) {}
}

/// Display that forwards printed text to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDisplay;

impl StatusDisplay for LogDisplay {
    fn clear(&mut self) {}

    fn print(&mut self, text: &str) {
        info!("To LCD: {}", text);
    }

    fn set_cursor(&mut self, _col: u8, _row: u8) {}

    fn create_char(&mut self, _location: u8, _pattern: [u8; 8]) {}
}

impl<D: StatusDisplay + ?Sized> StatusDisplay for &mut D {
    fn clear(&mut self) {
        (**self).clear()
    }

    fn print(&mut self, text: &str) {
        (**self).print(text)
    }

    fn set_cursor(&mut self, col: u8, row: u8) {
        (**self).set_cursor(col, row)
    }

    fn create_char(&mut self, location: u8, pattern: [u8; 8]) {
        (**self).create_char(location, pattern)
    }
}
