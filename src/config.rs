use log::debug;

use crate::error::Error;

/// Zoom used when neither scaling option is set.
pub const DEFAULT_ZOOM: u8 = 3;

/// Paper fed before cutting when a bottom margin is requested, in 1/360 in.
pub const BOTTOM_MARGIN_FEED: u8 = 184;

/// Horizontal placement of printed images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Justification {
    Left,
    Center,
    Right,
}

impl Justification {
    pub fn code(&self) -> u8 {
        match self {
            Self::Left => 0,
            Self::Center => 1,
            Self::Right => 2,
        }
    }
}

/// Print options
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintConfig {
    no_scale: bool,
    scale_2x: bool,
    add_bottom_margin: bool,
    auto_cut: bool,
    keycode: [u8; 2],
    justification: Justification,
}

impl PrintConfig {
    /// Initialize configuration with default values: 3× zoom, no bottom
    /// margin, cut after every job, centred, key code `GB`.
    ///
    /// # Example
    ///
    /// ```
    /// use super_gb_printer::PrintConfig;
    ///
    /// let config = PrintConfig::new().scale_2x(true).add_bottom_margin(true);
    /// assert_eq!(config.zoom(), 2);
    /// assert_eq!(config.cut_feed(), 184);
    /// ```
    pub fn new() -> PrintConfig {
        PrintConfig {
            no_scale: false,
            scale_2x: false,
            add_bottom_margin: false,
            auto_cut: true,
            keycode: [b'G', b'B'],
            justification: Justification::Center,
        }
    }

    /// Print at native size.
    pub fn no_scale(self, flag: bool) -> Self {
        PrintConfig {
            no_scale: flag,
            ..self
        }
    }

    /// Print at 2×, scaled by the printer. Takes precedence over `no_scale`.
    pub fn scale_2x(self, flag: bool) -> Self {
        PrintConfig {
            scale_2x: flag,
            ..self
        }
    }

    pub fn add_bottom_margin(self, flag: bool) -> Self {
        PrintConfig {
            add_bottom_margin: flag,
            ..self
        }
    }

    pub fn auto_cut(self, flag: bool) -> Self {
        PrintConfig {
            auto_cut: flag,
            ..self
        }
    }

    /// Key code the image is stored under in printer memory.
    pub fn keycode(self, keycode: [u8; 2]) -> Self {
        PrintConfig { keycode, ..self }
    }

    pub fn justification(self, justification: Justification) -> Self {
        PrintConfig {
            justification,
            ..self
        }
    }

    pub fn zoom(&self) -> u8 {
        if self.scale_2x {
            2
        } else if self.no_scale {
            1
        } else {
            DEFAULT_ZOOM
        }
    }

    pub fn cut_feed(&self) -> u8 {
        if self.add_bottom_margin {
            BOTTOM_MARGIN_FEED
        } else {
            0
        }
    }

    pub fn auto_cut_enabled(&self) -> bool {
        self.auto_cut
    }

    pub fn get_keycode(&self) -> [u8; 2] {
        self.keycode
    }

    pub fn get_justification(&self) -> Justification {
        self.justification
    }

    /// Check values the printer would reject.
    pub fn validate(&self) -> Result<(), Error> {
        // key codes are limited to printable ASCII
        if let Some(b) = self.keycode.iter().find(|b| !(32..=126).contains(*b)) {
            return Err(Error::InvalidConfig(format!(
                "key code byte 0x{:02X} is not printable ASCII",
                b
            )));
        }
        debug!("{:?}", self);
        Ok(())
    }
}

impl Default for PrintConfig {
    fn default() -> Self {
        Self::new()
    }
}
