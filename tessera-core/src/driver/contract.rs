//! Driver operation table
//!
//! [`DisplayDriver`] is the set of operations a concrete panel driver
//! implements. Callers do not use it directly: they bind a driver into a
//! [`Display`](super::Display) handle, which validates arguments and tracks
//! the power state before forwarding here.

use crate::error::DisplayError;
use crate::model::{BitmapMut, BitmapRegion, Capabilities, PixelFormat, PixelLayout};

/// Power state of a bound panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerState {
    /// Driver value exists but has not been bound yet
    ///
    /// Names the state before [`Display::bind`](super::Display::bind). A
    /// live handle never reports it, since binding is what leaves it.
    Uninitialized,
    /// Panel is off (bind leaves it here)
    Off,
    /// Panel is on
    On,
}

impl core::fmt::Display for PowerState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "uninitialized"),
            Self::Off => write!(f, "off"),
            Self::On => write!(f, "on"),
        }
    }
}

/// What a bitmap transfer does while the panel is off
///
/// Every driver declares exactly one policy and applies it to both
/// `write_bitmap` and `read_bitmap`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TransferPolicy {
    /// Controller memory stays addressable while the panel is off
    WhileOff,
    /// The panel is powered on before the transfer
    AutoPowerOn,
    /// The transfer fails with [`DisplayError::NotPoweredOn`]
    #[default]
    RequirePowerOn,
}

/// Direct view of a driver's linear framebuffer
///
/// Obtained from [`Display::framebuffer`](super::Display::framebuffer).
/// Writes through this view skip all region and format validation. The
/// view mutably borrows the handle, so no other operation can run while it
/// is alive.
#[derive(Debug)]
pub struct Framebuffer<'a> {
    bitmap: BitmapMut<'a>,
    width: u16,
    height: u16,
}

impl<'a> Framebuffer<'a> {
    /// Wrap driver memory holding `height` rows of `pitch` pixels
    pub fn new(
        data: &'a mut [u8],
        layout: PixelLayout,
        pitch: u16,
        width: u16,
        height: u16,
    ) -> Self {
        Self {
            bitmap: BitmapMut::new(data, layout, pitch),
            width,
            height,
        }
    }

    /// Visible width in pixels
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Visible height in pixels
    pub fn height(&self) -> u16 {
        self.height
    }

    /// Row stride in pixels
    pub fn pitch(&self) -> u16 {
        self.bitmap.pitch()
    }

    /// Packing rules of the memory
    pub fn layout(&self) -> PixelLayout {
        self.bitmap.layout()
    }

    /// Raw memory
    pub fn bytes(&self) -> &[u8] {
        self.bitmap.data()
    }

    /// Raw memory, mutable
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        self.bitmap.data_mut()
    }

    /// Pixel-level access to the memory
    pub fn bitmap(&mut self) -> &mut BitmapMut<'a> {
        &mut self.bitmap
    }
}

/// Operations every display driver exposes
///
/// Required methods cover what all panels can do. Optional features have
/// defaults that report absence explicitly ([`DisplayError::Unsupported`]
/// or `None`), never a silent no-op.
///
/// When called through a [`Display`](super::Display) handle:
/// - `write_bitmap`/`read_bitmap` only see regions inside the panel with a
///   valid pitch and a buffer large enough for the current format
/// - `set_pixel_format` only sees formats from the supported set
/// - transfers only run in a power state the driver's [`TransferPolicy`]
///   allows
///
/// An implementation must commit format and power changes fully before
/// returning `Ok`, and leave them untouched when returning `Err`.
pub trait DisplayDriver {
    /// One-time hardware bring-up, run when the driver is bound
    ///
    /// Must leave the panel off.
    fn init(&mut self) -> Result<(), DisplayError> {
        Ok(())
    }

    /// Current capability snapshot
    fn capabilities(&self) -> Capabilities;

    /// Policy for transfers while the panel is off
    fn transfer_policy(&self) -> TransferPolicy;

    /// Turn the panel on (must succeed when already on)
    fn power_on(&mut self) -> Result<(), DisplayError>;

    /// Turn the panel off (must succeed when already off)
    fn power_off(&mut self) -> Result<(), DisplayError>;

    /// Transfer `region` from `data` to the panel
    fn write_bitmap(&mut self, region: &BitmapRegion, data: &[u8]) -> Result<(), DisplayError>;

    /// Check if `read_bitmap` has hardware backing
    ///
    /// Drivers overriding `read_bitmap` must return `true` here, otherwise
    /// the handle reports `Unsupported` without calling them.
    fn supports_readback(&self) -> bool {
        false
    }

    /// Transfer `region` from the panel into `data`
    fn read_bitmap(
        &mut self,
        _region: &BitmapRegion,
        _data: &mut [u8],
    ) -> Result<(), DisplayError> {
        Err(DisplayError::Unsupported)
    }

    /// Linear, caller-addressable framebuffer if the hardware has one
    fn framebuffer(&mut self) -> Option<Framebuffer<'_>> {
        None
    }

    /// Set brightness, 0 = minimum, 255 = maximum
    fn set_brightness(&mut self, _level: u8) -> Result<(), DisplayError> {
        Err(DisplayError::Unsupported)
    }

    /// Set contrast, 0 = minimum, 255 = maximum
    fn set_contrast(&mut self, _level: u8) -> Result<(), DisplayError> {
        Err(DisplayError::Unsupported)
    }

    /// Switch the active pixel format
    fn set_pixel_format(&mut self, format: PixelFormat) -> Result<(), DisplayError>;
}

impl<D: DisplayDriver + ?Sized> DisplayDriver for &mut D {
    fn init(&mut self) -> Result<(), DisplayError> {
        (**self).init()
    }

    fn capabilities(&self) -> Capabilities {
        (**self).capabilities()
    }

    fn transfer_policy(&self) -> TransferPolicy {
        (**self).transfer_policy()
    }

    fn power_on(&mut self) -> Result<(), DisplayError> {
        (**self).power_on()
    }

    fn power_off(&mut self) -> Result<(), DisplayError> {
        (**self).power_off()
    }

    fn write_bitmap(&mut self, region: &BitmapRegion, data: &[u8]) -> Result<(), DisplayError> {
        (**self).write_bitmap(region, data)
    }

    fn supports_readback(&self) -> bool {
        (**self).supports_readback()
    }

    fn read_bitmap(&mut self, region: &BitmapRegion, data: &mut [u8]) -> Result<(), DisplayError> {
        (**self).read_bitmap(region, data)
    }

    fn framebuffer(&mut self) -> Option<Framebuffer<'_>> {
        (**self).framebuffer()
    }

    fn set_brightness(&mut self, level: u8) -> Result<(), DisplayError> {
        (**self).set_brightness(level)
    }

    fn set_contrast(&mut self, level: u8) -> Result<(), DisplayError> {
        (**self).set_contrast(level)
    }

    fn set_pixel_format(&mut self, format: PixelFormat) -> Result<(), DisplayError> {
        (**self).set_pixel_format(format)
    }
}
