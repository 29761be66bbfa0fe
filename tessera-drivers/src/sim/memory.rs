//! RAM-backed panel
//!
//! [`MemoryPanel`] treats caller-provided storage as the panel's linear
//! framebuffer. Every optional feature can be switched on or off, which
//! makes it a stand-in for real hardware in host tests and simulators.

use tessera_core::{
    Bitmap, BitmapMut, BitmapRegion, Capabilities, CapabilitiesError, DisplayDriver,
    DisplayError, Framebuffer, PixelFormat, PixelFormats, PixelLayout, ScreenInfo, TransferPolicy,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Errors that can occur when building a memory panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MemoryPanelError {
    /// The configuration does not describe a valid panel
    Capabilities(CapabilitiesError),
    /// Storage cannot hold a full frame in every supported format
    StorageTooSmall {
        /// Bytes needed for the largest format
        required: usize,
    },
}

impl core::fmt::Display for MemoryPanelError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Capabilities(e) => write!(f, "Invalid panel: {}", e),
            Self::StorageTooSmall { required } => {
                write!(f, "Storage too small, {} bytes required", required)
            }
        }
    }
}

impl core::error::Error for MemoryPanelError {}

impl From<CapabilitiesError> for MemoryPanelError {
    fn from(e: CapabilitiesError) -> Self {
        Self::Capabilities(e)
    }
}

/// Memory panel configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MemoryPanelConfig {
    /// Width in pixels
    pub width: u16,
    /// Height in pixels
    pub height: u16,
    /// Formats the panel accepts
    pub supported_formats: PixelFormats,
    /// Format active after construction
    pub format: PixelFormat,
    /// Reported layout traits
    pub screen_info: ScreenInfo,
    /// Transfer policy while off
    pub policy: TransferPolicy,
    /// Allow `read_bitmap`
    pub readback: bool,
    /// Expose storage through `framebuffer`
    pub framebuffer: bool,
    /// Accept `set_brightness`
    pub brightness: bool,
    /// Accept `set_contrast`
    pub contrast: bool,
}

impl MemoryPanelConfig {
    /// 320x240 RGB888 panel with every feature enabled
    pub const RGB_320X240: Self = Self {
        width: 320,
        height: 240,
        supported_formats: PixelFormats::RGB_888,
        format: PixelFormat::Rgb888,
        screen_info: ScreenInfo::empty(),
        policy: TransferPolicy::WhileOff,
        readback: true,
        framebuffer: true,
        brightness: true,
        contrast: true,
    };

    /// 128x64 vertically tiled mono panel, OLED-like feature set
    pub const MONO_128X64: Self = Self {
        width: 128,
        height: 64,
        supported_formats: PixelFormats::MONO01.union(PixelFormats::MONO10),
        format: PixelFormat::Mono10,
        screen_info: ScreenInfo::MONO_VTILED,
        policy: TransferPolicy::WhileOff,
        readback: false,
        framebuffer: false,
        brightness: false,
        contrast: true,
    };

    /// Bytes of storage a panel built from this config needs
    pub fn required_storage(&self) -> usize {
        self.supported_formats
            .formats()
            .map(|format| {
                PixelLayout::new(format, self.screen_info)
                    .buffer_len(self.width, self.height)
            })
            .max()
            .unwrap_or(0)
    }
}

impl Default for MemoryPanelConfig {
    fn default() -> Self {
        Self::RGB_320X240
    }
}

/// RAM-backed display driver
pub struct MemoryPanel<'a> {
    storage: &'a mut [u8],
    config: MemoryPanelConfig,
    caps: Capabilities,
    on: bool,
    brightness: Option<u8>,
    contrast: Option<u8>,
    power_ons: u32,
    power_offs: u32,
    writes: u32,
    reads: u32,
}

impl<'a> MemoryPanel<'a> {
    /// Create a panel over `storage`
    ///
    /// Storage is cleared to zero.
    pub fn new(storage: &'a mut [u8], config: MemoryPanelConfig) -> Result<Self, MemoryPanelError> {
        let caps = Capabilities::new(
            config.width,
            config.height,
            config.supported_formats,
            config.screen_info,
            config.format,
        )?;

        let required = config.required_storage();
        if storage.len() < required {
            return Err(MemoryPanelError::StorageTooSmall { required });
        }
        storage.fill(0);

        Ok(Self {
            storage,
            config,
            caps,
            on: false,
            brightness: None,
            contrast: None,
            power_ons: 0,
            power_offs: 0,
            writes: 0,
            reads: 0,
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &MemoryPanelConfig {
        &self.config
    }

    /// Bytes of one frame in the current format
    fn frame_len(&self) -> usize {
        self.caps.layout().buffer_len(self.config.width, self.config.height)
    }

    /// Current frame contents
    pub fn frame(&self) -> &[u8] {
        self.storage.get(..self.frame_len()).unwrap_or(&[])
    }

    /// Check if the panel is on
    pub fn is_on(&self) -> bool {
        self.on
    }

    /// Last brightness set
    pub fn brightness(&self) -> Option<u8> {
        self.brightness
    }

    /// Last contrast set
    pub fn contrast(&self) -> Option<u8> {
        self.contrast
    }

    /// Number of `power_on` calls
    pub fn power_ons(&self) -> u32 {
        self.power_ons
    }

    /// Number of `power_off` calls
    pub fn power_offs(&self) -> u32 {
        self.power_offs
    }

    /// Number of completed writes
    pub fn writes(&self) -> u32 {
        self.writes
    }

    /// Number of completed reads
    pub fn reads(&self) -> u32 {
        self.reads
    }
}

impl DisplayDriver for MemoryPanel<'_> {
    fn capabilities(&self) -> Capabilities {
        self.caps
    }

    fn transfer_policy(&self) -> TransferPolicy {
        self.config.policy
    }

    fn power_on(&mut self) -> Result<(), DisplayError> {
        self.on = true;
        self.power_ons += 1;
        Ok(())
    }

    fn power_off(&mut self) -> Result<(), DisplayError> {
        self.on = false;
        self.power_offs += 1;
        Ok(())
    }

    fn write_bitmap(&mut self, region: &BitmapRegion, data: &[u8]) -> Result<(), DisplayError> {
        let layout = self.caps.layout();
        let src = Bitmap::new(data, layout, region.pitch);
        BitmapMut::new(&mut *self.storage, layout, self.config.width).copy_from(
            &src,
            (0, 0),
            (region.x, region.y),
            region.width,
            region.height,
        )?;

        self.writes += 1;
        Ok(())
    }

    fn supports_readback(&self) -> bool {
        self.config.readback
    }

    fn read_bitmap(&mut self, region: &BitmapRegion, data: &mut [u8]) -> Result<(), DisplayError> {
        if !self.config.readback {
            return Err(DisplayError::Unsupported);
        }

        let layout = self.caps.layout();
        let src = Bitmap::new(&*self.storage, layout, self.config.width);
        BitmapMut::new(data, layout, region.pitch).copy_from(
            &src,
            (region.x, region.y),
            (0, 0),
            region.width,
            region.height,
        )?;

        self.reads += 1;
        Ok(())
    }

    fn framebuffer(&mut self) -> Option<Framebuffer<'_>> {
        if !self.config.framebuffer {
            return None;
        }

        let len = self.frame_len();
        let layout = self.caps.layout();
        let (width, height) = (self.config.width, self.config.height);
        let data = self.storage.get_mut(..len)?;
        Some(Framebuffer::new(data, layout, width, width, height))
    }

    fn set_brightness(&mut self, level: u8) -> Result<(), DisplayError> {
        if !self.config.brightness {
            return Err(DisplayError::Unsupported);
        }
        self.brightness = Some(level);
        Ok(())
    }

    fn set_contrast(&mut self, level: u8) -> Result<(), DisplayError> {
        if !self.config.contrast {
            return Err(DisplayError::Unsupported);
        }
        self.contrast = Some(level);
        Ok(())
    }

    fn set_pixel_format(&mut self, format: PixelFormat) -> Result<(), DisplayError> {
        if format == self.caps.current_pixel_format() {
            return Ok(());
        }

        self.caps = self.caps.with_current_format(format)?;
        // Old contents are meaningless in the new encoding
        self.storage.fill(0);
        Ok(())
    }
}
