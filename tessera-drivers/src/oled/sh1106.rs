//! SH1106 OLED display driver
//!
//! Driver for 128x64 SH1106-based OLED modules over I2C.
//!
//! # Memory
//!
//! GDDRAM is organized as 8 pages of 8 pixel rows. One byte is one column
//! of a page, LSB at the top. A set bit lights the pixel. The controller
//! has 132 columns; most modules wire the visible 128 starting at column 2.
//!
//! GDDRAM cannot be read back over I2C, so the driver keeps a shadow copy
//! and only pushes the pages and columns a write touched.

use embedded_hal::i2c::{Error as _, I2c};
use heapless::Vec;
use tessera_core::{
    Bitmap, BitmapMut, BitmapRegion, Capabilities, DisplayDriver, DisplayError, PixelFormat,
    PixelFormats, PixelLayout, ScreenInfo, TransferPolicy,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Display width in pixels
pub const WIDTH: u16 = 128;
/// Display height in pixels
pub const HEIGHT: u16 = 64;
/// Number of 8-row pages
pub const PAGES: usize = HEIGHT as usize / 8;

const BUFFER_LEN: usize = WIDTH as usize * PAGES;

/// I2C control byte preceding a command
const CONTROL_COMMAND: u8 = 0x00;
/// I2C control byte preceding display data
const CONTROL_DATA: u8 = 0x40;

/// SH1106 commands
mod cmd {
    pub const DISPLAY_OFF: u8 = 0xAE;
    pub const DISPLAY_ON: u8 = 0xAF;
    pub const SET_CONTRAST: u8 = 0x81;
    pub const SET_NORMAL: u8 = 0xA6;
    pub const SET_DISPLAY_OFFSET: u8 = 0xD3;
    pub const SET_COM_PINS: u8 = 0xDA;
    pub const SET_VCOM_DETECT: u8 = 0xDB;
    pub const SET_CLOCK_DIV: u8 = 0xD5;
    pub const SET_PRECHARGE: u8 = 0xD9;
    pub const SET_MUX_RATIO: u8 = 0xA8;
    pub const SET_LOW_COLUMN: u8 = 0x00;
    pub const SET_HIGH_COLUMN: u8 = 0x10;
    pub const SET_PAGE_ADDR: u8 = 0xB0;
    pub const SET_START_LINE: u8 = 0x40;
    pub const SET_SEG_NORMAL: u8 = 0xA0;
    pub const SET_SEG_REMAP: u8 = 0xA1;
    pub const SET_COM_SCAN_INC: u8 = 0xC0;
    pub const SET_COM_SCAN_DEC: u8 = 0xC8;
    pub const SET_CHARGE_PUMP: u8 = 0x8D;
}

/// SH1106 driver configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Sh1106Config {
    /// I2C address (0x3C or 0x3D, set by the SA0 strap)
    pub address: u8,
    /// First visible GDDRAM column (2 on most 1.3" modules)
    pub column_offset: u8,
    /// Contrast applied during init (0-255)
    pub contrast: u8,
    /// Use the unflipped segment and COM scan direction
    pub rotate_180: bool,
}

impl Sh1106Config {
    /// Common 1.3" module: address 0x3C, column offset 2
    pub const DEFAULT: Self = Self {
        address: 0x3C,
        column_offset: 2,
        contrast: 0xCF,
        rotate_180: false,
    };

    /// Module with SA0 pulled high
    pub const ALT_ADDRESS: Self = Self {
        address: 0x3D,
        ..Self::DEFAULT
    };
}

impl Default for Sh1106Config {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Power-up command sequence, leaving the panel dark
pub fn init_sequence(config: &Sh1106Config) -> [u8; 21] {
    let (seg, com) = if config.rotate_180 {
        (cmd::SET_SEG_NORMAL, cmd::SET_COM_SCAN_INC)
    } else {
        (cmd::SET_SEG_REMAP, cmd::SET_COM_SCAN_DEC)
    };

    [
        cmd::DISPLAY_OFF,
        cmd::SET_CLOCK_DIV,
        0x80, // Default clock
        cmd::SET_MUX_RATIO,
        0x3F, // 64 lines
        cmd::SET_DISPLAY_OFFSET,
        0x00,
        cmd::SET_START_LINE,
        cmd::SET_CHARGE_PUMP,
        0x14, // Enable charge pump
        seg,
        com,
        cmd::SET_COM_PINS,
        0x12, // Alternative COM config
        cmd::SET_CONTRAST,
        config.contrast,
        cmd::SET_PRECHARGE,
        0xF1,
        cmd::SET_VCOM_DETECT,
        0x40,
        cmd::SET_NORMAL,
    ]
}

/// Native GDDRAM layout: a set bit is a lit (white) pixel
const NATIVE: PixelLayout = PixelLayout::new(PixelFormat::Mono01, ScreenInfo::MONO_VTILED);

const CAPABILITIES: Capabilities = match Capabilities::new(
    WIDTH,
    HEIGHT,
    PixelFormats::MONO01.union(PixelFormats::MONO10),
    ScreenInfo::MONO_VTILED,
    PixelFormat::Mono01,
) {
    Ok(caps) => caps,
    Err(_) => panic!("invalid SH1106 capabilities"),
};

/// SH1106 OLED driver
///
/// Accepts `Mono01` (default) and `Mono10` bitmaps. GDDRAM stays writable
/// while the panel is off, so transfers use [`TransferPolicy::WhileOff`].
pub struct Sh1106<I2C> {
    i2c: I2C,
    config: Sh1106Config,
    caps: Capabilities,
    /// Mirror of the visible GDDRAM, in native layout
    shadow: [u8; BUFFER_LEN],
}

impl<I2C: I2c> Sh1106<I2C> {
    /// Create a new SH1106 driver
    pub fn new(i2c: I2C, config: Sh1106Config) -> Self {
        Self {
            i2c,
            config,
            caps: CAPABILITIES,
            shadow: [0; BUFFER_LEN],
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Sh1106Config {
        &self.config
    }

    /// Give back the bus
    pub fn release(self) -> I2C {
        self.i2c
    }

    fn write_i2c(&mut self, bytes: &[u8]) -> Result<(), DisplayError> {
        self.i2c.write(self.config.address, bytes).map_err(|e| {
            warn!("sh1106: i2c error {}", e.kind());
            DisplayError::HardwareFault
        })
    }

    /// Send a command to the display
    fn command(&mut self, cmd: u8) -> Result<(), DisplayError> {
        self.write_i2c(&[CONTROL_COMMAND, cmd])
    }

    fn commands(&mut self, cmds: &[u8]) -> Result<(), DisplayError> {
        for &c in cmds {
            self.command(c)?;
        }
        Ok(())
    }

    /// Push the shadow pages and columns covered by `region`
    fn flush(&mut self, region: &BitmapRegion) -> Result<(), DisplayError> {
        if region.is_empty() {
            return Ok(());
        }

        let first_page = region.y as usize / 8;
        let last_page = (region.bottom() as usize - 1) / 8;
        let x = region.x as usize;
        let width = region.width as usize;
        let column = region.x + self.config.column_offset as u16;

        for page in first_page..=last_page.min(PAGES - 1) {
            self.commands(&[
                cmd::SET_PAGE_ADDR | page as u8,
                cmd::SET_LOW_COLUMN | (column & 0x0F) as u8,
                cmd::SET_HIGH_COLUMN | (column >> 4) as u8,
            ])?;

            let start = page * WIDTH as usize + x;
            let columns = self
                .shadow
                .get(start..start + width)
                .ok_or(DisplayError::OutOfBounds)?;

            let mut frame: Vec<u8, { WIDTH as usize + 1 }> = Vec::new();
            frame
                .push(CONTROL_DATA)
                .map_err(|_| DisplayError::BufferTooSmall)?;
            frame
                .extend_from_slice(columns)
                .map_err(|_| DisplayError::BufferTooSmall)?;
            self.write_i2c(&frame)?;
        }

        Ok(())
    }
}

impl<I2C: I2c> DisplayDriver for Sh1106<I2C> {
    fn init(&mut self) -> Result<(), DisplayError> {
        let sequence = init_sequence(&self.config);
        self.commands(&sequence)?;

        // GDDRAM content is undefined after reset
        self.shadow.fill(0);
        self.flush(&BitmapRegion::new(0, 0, WIDTH, HEIGHT))?;

        debug!("sh1106: initialized at address {}", self.config.address);
        Ok(())
    }

    fn capabilities(&self) -> Capabilities {
        self.caps
    }

    fn transfer_policy(&self) -> TransferPolicy {
        TransferPolicy::WhileOff
    }

    fn power_on(&mut self) -> Result<(), DisplayError> {
        self.command(cmd::DISPLAY_ON)
    }

    fn power_off(&mut self) -> Result<(), DisplayError> {
        self.command(cmd::DISPLAY_OFF)
    }

    fn write_bitmap(&mut self, region: &BitmapRegion, data: &[u8]) -> Result<(), DisplayError> {
        let src = Bitmap::new(data, self.caps.layout(), region.pitch);
        BitmapMut::new(&mut self.shadow, NATIVE, WIDTH).copy_from(
            &src,
            (0, 0),
            (region.x, region.y),
            region.width,
            region.height,
        )?;

        self.flush(region)
    }

    fn set_contrast(&mut self, level: u8) -> Result<(), DisplayError> {
        self.commands(&[cmd::SET_CONTRAST, level])
    }

    fn set_pixel_format(&mut self, format: PixelFormat) -> Result<(), DisplayError> {
        // Shadow stays native, conversion happens per write
        self.caps = self.caps.with_current_format(format)?;
        Ok(())
    }
}
