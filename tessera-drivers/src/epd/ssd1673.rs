//! SSD1673 e-paper display driver
//!
//! Driver for the 250x122 SSD1673 panel (reel_board style wiring) over SPI
//! with separate DC, RST and BUSY lines.
//!
//! # RAM mapping
//!
//! The controller scans 250 gates along the long edge. Panel column `x` is
//! RAM Y address `x`; each RAM X address holds one byte of 8 vertically
//! stacked pixels, MSB at the top. A set bit is white.
//!
//! # Power
//!
//! `power_off` puts the controller in deep sleep. The image stays on the
//! glass but RAM contents are lost on the wake-up reset, so the first
//! transfer after `power_on` pushes the whole shadow buffer with a full
//! refresh.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::{Error as _, SpiDevice};
use heapless::Vec;
use tessera_core::{
    Bitmap, BitmapMut, BitmapRegion, Capabilities, DisplayDriver, DisplayError, PixelFormat,
    PixelFormats, PixelLayout, ScreenInfo, TransferPolicy,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Display width in pixels (gate lines)
pub const WIDTH: u16 = 250;
/// Display height in pixels (source lines)
pub const HEIGHT: u16 = 122;
/// Number of RAM X bytes per gate line
pub const PAGES: usize = (HEIGHT as usize).div_ceil(8);

const BUFFER_LEN: usize = WIDTH as usize * PAGES;

/// BUSY poll interval
const BUSY_POLL_MS: u32 = 10;

/// SSD1673 commands
mod cmd {
    pub const DRIVER_OUTPUT: u8 = 0x01;
    pub const GATE_VOLTAGE: u8 = 0x03;
    pub const SOURCE_VOLTAGE: u8 = 0x04;
    pub const DEEP_SLEEP: u8 = 0x10;
    pub const DATA_ENTRY: u8 = 0x11;
    pub const SW_RESET: u8 = 0x12;
    pub const MASTER_ACTIVATION: u8 = 0x20;
    pub const UPDATE_CTRL2: u8 = 0x22;
    pub const WRITE_RAM: u8 = 0x24;
    pub const WRITE_VCOM: u8 = 0x2C;
    pub const WRITE_LUT: u8 = 0x32;
    pub const DUMMY_LINE: u8 = 0x3A;
    pub const GATE_LINE_WIDTH: u8 = 0x3B;
    pub const BORDER_WAVEFORM: u8 = 0x3C;
    pub const RAM_X_RANGE: u8 = 0x44;
    pub const RAM_Y_RANGE: u8 = 0x45;
    pub const RAM_X_COUNTER: u8 = 0x4E;
    pub const RAM_Y_COUNTER: u8 = 0x4F;
}

/// X increment, Y increment, X counter advances first
const DATA_ENTRY_XINC_YINC: u8 = 0x03;
/// Deep sleep mode 1: RAM retained until reset
const DEEP_SLEEP_MODE_1: u8 = 0x01;
/// Clock on, analog on, display, analog off, clock off
const UPDATE_SEQUENCE: u8 = 0xC7;

/// Waveform for a full refresh
pub const LUT_FULL: [u8; 30] = [
    0x22, 0x55, 0xAA, 0x55, 0xAA, 0x55, 0xAA, 0x11, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x1E, 0x1E, 0x1E, 0x1E, 0x1E, 0x1E, 0x1E, 0x1E, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// Waveform for a partial refresh
pub const LUT_PARTIAL: [u8; 30] = [
    0x18, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x0F, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// Panel refresh waveform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RefreshMode {
    /// Flashing refresh, clears ghosting
    #[default]
    Full,
    /// Fast refresh, accumulates ghosting
    Partial,
}

impl RefreshMode {
    /// Waveform table for this mode
    pub const fn lut(&self) -> &'static [u8; 30] {
        match self {
            Self::Full => &LUT_FULL,
            Self::Partial => &LUT_PARTIAL,
        }
    }
}

/// Pick the waveform for the next refresh
///
/// Partial refreshes are capped at `interval` in a row; the one after is
/// forced to full. An interval of 0 means every refresh is full.
pub fn select_refresh(configured: RefreshMode, partial_count: u8, interval: u8) -> RefreshMode {
    match configured {
        RefreshMode::Partial if partial_count < interval => RefreshMode::Partial,
        _ => RefreshMode::Full,
    }
}

/// SSD1673 driver configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Ssd1673Config {
    /// Upper bound for a single BUSY wait (ms)
    pub busy_timeout_ms: u32,
    /// Preferred refresh waveform
    pub refresh: RefreshMode,
    /// Partial refreshes allowed before a full one is forced
    pub full_refresh_interval: u8,
    /// Transfers while asleep: `AutoPowerOn` wakes the panel, anything else
    /// fails with `NotPoweredOn`
    pub policy: TransferPolicy,
    /// Gate driving voltage (VGH, VGL)
    pub gate_voltage: [u8; 2],
    /// Source driving voltage
    pub source_voltage: u8,
    /// VCOM register
    pub vcom: u8,
    /// Border waveform control
    pub border_waveform: u8,
    /// Dummy line period
    pub dummy_line: u8,
    /// Gate line width
    pub gate_line_width: u8,
}

impl Ssd1673Config {
    /// Values for the reel_board 2.13" panel
    pub const REEL_BOARD: Self = Self {
        busy_timeout_ms: 4000,
        refresh: RefreshMode::Partial,
        full_refresh_interval: 10,
        policy: TransferPolicy::AutoPowerOn,
        gate_voltage: [0x10, 0x0A],
        source_voltage: 0x19,
        vcom: 0xA8,
        border_waveform: 0x71,
        dummy_line: 0x1A,
        gate_line_width: 0x08,
    };
}

impl Default for Ssd1673Config {
    fn default() -> Self {
        Self::REEL_BOARD
    }
}

/// Native RAM layout: a set bit is white, MSB is the top row of a byte
const NATIVE: PixelLayout = PixelLayout::new(
    PixelFormat::Mono01,
    ScreenInfo::MONO_VTILED.union(ScreenInfo::MONO_MSB_FIRST),
);

const CAPABILITIES: Capabilities = match Capabilities::new(
    WIDTH,
    HEIGHT,
    PixelFormats::MONO01.union(PixelFormats::MONO10),
    ScreenInfo::MONO_VTILED
        .union(ScreenInfo::MONO_MSB_FIRST)
        .union(ScreenInfo::EPD),
    PixelFormat::Mono10,
) {
    Ok(caps) => caps,
    Err(_) => panic!("invalid SSD1673 capabilities"),
};

/// RAM window in controller coordinates (inclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Window {
    first_column: u8,
    last_column: u8,
    first_page: u8,
    last_page: u8,
}

impl Window {
    const FULL: Self = Self {
        first_column: 0,
        last_column: (WIDTH - 1) as u8,
        first_page: 0,
        last_page: (PAGES - 1) as u8,
    };

    /// Smallest page-aligned window covering a non-empty region
    fn covering(region: &BitmapRegion) -> Self {
        Self {
            first_column: region.x as u8,
            last_column: (region.right() - 1) as u8,
            first_page: (region.y / 8) as u8,
            last_page: ((region.bottom() - 1) / 8) as u8,
        }
    }
}

/// SSD1673 e-paper driver
///
/// Generic over:
/// - `SPI`: [`SpiDevice`] (manages CS)
/// - `DC`, `RST`: [`OutputPin`]
/// - `BUSY`: [`InputPin`], high while the controller is busy
/// - `DELAY`: [`DelayNs`]
pub struct Ssd1673<SPI, DC, RST, BUSY, DELAY> {
    spi: SPI,
    dc: DC,
    rst: RST,
    busy: BUSY,
    delay: DELAY,
    config: Ssd1673Config,
    caps: Capabilities,
    awake: bool,
    /// Controller RAM matches the shadow buffer
    ram_valid: bool,
    loaded_lut: Option<RefreshMode>,
    partial_count: u8,
    shadow: [u8; BUFFER_LEN],
}

impl<SPI, DC, RST, BUSY, DELAY> Ssd1673<SPI, DC, RST, BUSY, DELAY>
where
    SPI: SpiDevice,
    DC: OutputPin,
    RST: OutputPin,
    BUSY: InputPin,
    DELAY: DelayNs,
{
    /// Create a new driver instance
    ///
    /// The shadow buffer starts all white.
    pub fn new(
        spi: SPI,
        dc: DC,
        rst: RST,
        busy: BUSY,
        delay: DELAY,
        config: Ssd1673Config,
    ) -> Self {
        Self {
            spi,
            dc,
            rst,
            busy,
            delay,
            config,
            caps: CAPABILITIES,
            awake: false,
            ram_valid: false,
            loaded_lut: None,
            partial_count: 0,
            shadow: [0xFF; BUFFER_LEN],
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Ssd1673Config {
        &self.config
    }

    /// Preferred refresh waveform
    pub fn refresh_mode(&self) -> RefreshMode {
        self.config.refresh
    }

    /// Change the preferred refresh waveform
    pub fn set_refresh_mode(&mut self, mode: RefreshMode) {
        self.config.refresh = mode;
    }

    /// Partial refreshes since the last full one
    pub fn partial_refreshes(&self) -> u8 {
        self.partial_count
    }

    /// Check if the controller is out of deep sleep
    pub fn is_awake(&self) -> bool {
        self.awake
    }

    /// Blank the panel to white with a full refresh
    pub fn clear(&mut self) -> Result<(), DisplayError> {
        if !self.awake {
            return Err(DisplayError::NotPoweredOn);
        }
        self.shadow.fill(0xFF);
        self.push(Window::FULL, RefreshMode::Full)
    }

    /// Give back the bus, pins and delay
    pub fn release(self) -> (SPI, DC, RST, BUSY, DELAY) {
        (self.spi, self.dc, self.rst, self.busy, self.delay)
    }

    fn send_command(&mut self, cmd: u8) -> Result<(), DisplayError> {
        self.dc.set_low().map_err(|_| DisplayError::HardwareFault)?;
        self.write_spi(&[cmd])
    }

    fn send_data(&mut self, data: &[u8]) -> Result<(), DisplayError> {
        if data.is_empty() {
            return Ok(());
        }
        self.dc.set_high().map_err(|_| DisplayError::HardwareFault)?;
        self.write_spi(data)
    }

    fn cmd_data(&mut self, cmd: u8, data: &[u8]) -> Result<(), DisplayError> {
        self.send_command(cmd)?;
        self.send_data(data)
    }

    fn write_spi(&mut self, bytes: &[u8]) -> Result<(), DisplayError> {
        self.spi.write(bytes).map_err(|e| {
            warn!("ssd1673: spi error {}", e.kind());
            DisplayError::HardwareFault
        })
    }

    /// Wait until BUSY goes low or `busy_timeout_ms` expires
    fn wait_busy(&mut self) -> Result<(), DisplayError> {
        let polls = self.config.busy_timeout_ms.div_ceil(BUSY_POLL_MS).max(1);

        for _ in 0..polls {
            let busy = self.busy.is_high().map_err(|_| DisplayError::HardwareFault)?;
            if !busy {
                return Ok(());
            }
            self.delay.delay_ms(BUSY_POLL_MS);
        }

        warn!("ssd1673: busy for more than {} ms", self.config.busy_timeout_ms);
        Err(DisplayError::Timeout)
    }

    /// RST high, low, high
    fn hardware_reset(&mut self) -> Result<(), DisplayError> {
        self.rst.set_high().map_err(|_| DisplayError::HardwareFault)?;
        self.delay.delay_ms(10);
        self.rst.set_low().map_err(|_| DisplayError::HardwareFault)?;
        self.delay.delay_ms(10);
        self.rst.set_high().map_err(|_| DisplayError::HardwareFault)?;
        self.delay.delay_ms(10);
        Ok(())
    }

    /// Reset the controller and wait for it to come up
    fn reset(&mut self) -> Result<(), DisplayError> {
        self.hardware_reset()?;
        self.send_command(cmd::SW_RESET)?;
        self.wait_busy()?;

        self.loaded_lut = None;
        self.ram_valid = false;
        Ok(())
    }

    fn configure(&mut self) -> Result<(), DisplayError> {
        let gates = WIDTH - 1;
        let config = self.config;

        self.cmd_data(cmd::DRIVER_OUTPUT, &[(gates & 0xFF) as u8, (gates >> 8) as u8, 0x00])?;
        self.cmd_data(cmd::GATE_VOLTAGE, &config.gate_voltage)?;
        self.cmd_data(cmd::SOURCE_VOLTAGE, &[config.source_voltage])?;
        self.cmd_data(cmd::DUMMY_LINE, &[config.dummy_line])?;
        self.cmd_data(cmd::GATE_LINE_WIDTH, &[config.gate_line_width])?;
        self.cmd_data(cmd::BORDER_WAVEFORM, &[config.border_waveform])?;
        self.cmd_data(cmd::WRITE_VCOM, &[config.vcom])?;
        self.cmd_data(cmd::DATA_ENTRY, &[DATA_ENTRY_XINC_YINC])
    }

    fn load_lut(&mut self, mode: RefreshMode) -> Result<(), DisplayError> {
        if self.loaded_lut == Some(mode) {
            return Ok(());
        }
        self.cmd_data(cmd::WRITE_LUT, mode.lut())?;
        self.loaded_lut = Some(mode);
        Ok(())
    }

    /// Stream a window of the shadow buffer into controller RAM
    fn stream(&mut self, window: Window) -> Result<(), DisplayError> {
        self.cmd_data(cmd::RAM_X_RANGE, &[window.first_page, window.last_page])?;
        self.cmd_data(cmd::RAM_Y_RANGE, &[window.first_column, window.last_column])?;
        self.cmd_data(cmd::RAM_X_COUNTER, &[window.first_page])?;
        self.cmd_data(cmd::RAM_Y_COUNTER, &[window.first_column])?;
        self.send_command(cmd::WRITE_RAM)?;

        self.dc.set_high().map_err(|_| DisplayError::HardwareFault)?;
        for column in window.first_column..=window.last_column {
            // X advances first: one column is a run of pages
            let mut run: Vec<u8, PAGES> = Vec::new();
            for page in window.first_page..=window.last_page {
                let byte = self
                    .shadow
                    .get(page as usize * WIDTH as usize + column as usize)
                    .copied()
                    .ok_or(DisplayError::OutOfBounds)?;
                run.push(byte).map_err(|_| DisplayError::BufferTooSmall)?;
            }
            self.write_spi(&run)?;
        }
        Ok(())
    }

    fn refresh(&mut self, mode: RefreshMode) -> Result<(), DisplayError> {
        self.load_lut(mode)?;
        self.cmd_data(cmd::UPDATE_CTRL2, &[UPDATE_SEQUENCE])?;
        self.send_command(cmd::MASTER_ACTIVATION)?;
        self.wait_busy()?;

        self.partial_count = match mode {
            RefreshMode::Full => 0,
            RefreshMode::Partial => self.partial_count.saturating_add(1),
        };
        trace!("ssd1673: refreshed, {} partial in a row", self.partial_count);
        Ok(())
    }

    /// Stream a window and refresh, falling back to a full frame when
    /// controller RAM is stale
    fn push(&mut self, window: Window, mode: RefreshMode) -> Result<(), DisplayError> {
        let (window, mode) = if self.ram_valid {
            (window, mode)
        } else {
            (Window::FULL, RefreshMode::Full)
        };

        self.ram_valid = false;
        self.stream(window)?;
        self.refresh(mode)?;
        self.ram_valid = true;
        Ok(())
    }
}

impl<SPI, DC, RST, BUSY, DELAY> DisplayDriver for Ssd1673<SPI, DC, RST, BUSY, DELAY>
where
    SPI: SpiDevice,
    DC: OutputPin,
    RST: OutputPin,
    BUSY: InputPin,
    DELAY: DelayNs,
{
    fn init(&mut self) -> Result<(), DisplayError> {
        self.reset()?;
        self.cmd_data(cmd::DEEP_SLEEP, &[DEEP_SLEEP_MODE_1])?;
        self.awake = false;
        debug!("ssd1673: controller responding, asleep");
        Ok(())
    }

    fn capabilities(&self) -> Capabilities {
        self.caps
    }

    fn transfer_policy(&self) -> TransferPolicy {
        match self.config.policy {
            TransferPolicy::AutoPowerOn => TransferPolicy::AutoPowerOn,
            // RAM is unreachable in deep sleep
            TransferPolicy::WhileOff | TransferPolicy::RequirePowerOn => {
                TransferPolicy::RequirePowerOn
            }
        }
    }

    fn power_on(&mut self) -> Result<(), DisplayError> {
        if self.awake {
            return Ok(());
        }
        self.reset()?;
        self.configure()?;
        self.awake = true;
        Ok(())
    }

    fn power_off(&mut self) -> Result<(), DisplayError> {
        if !self.awake {
            return Ok(());
        }
        self.cmd_data(cmd::DEEP_SLEEP, &[DEEP_SLEEP_MODE_1])?;
        self.awake = false;
        Ok(())
    }

    fn write_bitmap(&mut self, region: &BitmapRegion, data: &[u8]) -> Result<(), DisplayError> {
        if !self.awake {
            return Err(DisplayError::NotPoweredOn);
        }
        if region.is_empty() {
            return Ok(());
        }

        let src = Bitmap::new(data, self.caps.layout(), region.pitch);
        BitmapMut::new(&mut self.shadow, NATIVE, WIDTH).copy_from(
            &src,
            (0, 0),
            (region.x, region.y),
            region.width,
            region.height,
        )?;

        let mode = select_refresh(
            self.config.refresh,
            self.partial_count,
            self.config.full_refresh_interval,
        );
        self.push(Window::covering(region), mode)
    }

    fn set_pixel_format(&mut self, format: PixelFormat) -> Result<(), DisplayError> {
        self.caps = self.caps.with_current_format(format)?;
        Ok(())
    }
}
