//! Pixel formats and panel layout traits

use bitflags::bitflags;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Pixel encoding of a bitmap buffer
///
/// A panel may support several formats but has exactly one active format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PixelFormat {
    /// 3 bytes per pixel, red first
    Rgb888,
    /// 1 bit per pixel, 0 = black, 1 = white
    Mono01,
    /// 1 bit per pixel, 1 = black, 0 = white
    Mono10,
}

impl PixelFormat {
    /// All formats, in flag order
    pub const ALL: [PixelFormat; 3] = [Self::Rgb888, Self::Mono01, Self::Mono10];

    /// Number of bits a single pixel occupies
    pub const fn bits_per_pixel(&self) -> u8 {
        match self {
            Self::Rgb888 => 24,
            Self::Mono01 | Self::Mono10 => 1,
        }
    }

    /// Check if this is a 1-bit format
    pub const fn is_mono(&self) -> bool {
        matches!(self, Self::Mono01 | Self::Mono10)
    }

    /// The singleton set holding this format
    pub const fn as_set(&self) -> PixelFormats {
        match self {
            Self::Rgb888 => PixelFormats::RGB_888,
            Self::Mono01 => PixelFormats::MONO01,
            Self::Mono10 => PixelFormats::MONO10,
        }
    }
}

impl core::fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Rgb888 => write!(f, "RGB888"),
            Self::Mono01 => write!(f, "MONO01"),
            Self::Mono10 => write!(f, "MONO10"),
        }
    }
}

bitflags! {
    /// Set of pixel formats a driver can switch between
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub struct PixelFormats: u8 {
        /// [`PixelFormat::Rgb888`]
        const RGB_888 = 1 << 0;
        /// [`PixelFormat::Mono01`]
        const MONO01 = 1 << 1;
        /// [`PixelFormat::Mono10`]
        const MONO10 = 1 << 2;
    }
}

impl PixelFormats {
    /// No formats; never valid in a capability snapshot
    pub const EMPTY: Self = Self::empty();

    /// Check if `format` is a member of this set
    pub const fn supports(&self, format: PixelFormat) -> bool {
        self.contains(format.as_set())
    }

    /// Iterate over the member formats in flag order
    pub fn formats(&self) -> impl Iterator<Item = PixelFormat> + '_ {
        PixelFormat::ALL
            .into_iter()
            .filter(move |format| self.supports(*format))
    }
}

impl From<PixelFormat> for PixelFormats {
    fn from(format: PixelFormat) -> Self {
        format.as_set()
    }
}

impl FromIterator<PixelFormat> for PixelFormats {
    fn from_iter<T: IntoIterator<Item = PixelFormat>>(iter: T) -> Self {
        iter.into_iter()
            .fold(Self::EMPTY, |set, format| set | format.as_set())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for PixelFormats {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "PixelFormats({=u8:#04x})", self.bits())
    }
}

bitflags! {
    /// Physical pixel layout traits of a panel
    ///
    /// These are read-only hardware facts. They are reported, never
    /// negotiated.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub struct ScreenInfo: u8 {
        /// One octet holds 8 vertically stacked pixels (otherwise horizontal)
        const MONO_VTILED = 1 << 0;
        /// The MSB holds the first pixel (otherwise the LSB does)
        const MONO_MSB_FIRST = 1 << 1;
        /// Electrophoretic panel: slow refresh, persistent image, ghosting
        const EPD = 1 << 2;
    }
}

impl ScreenInfo {
    /// Check if mono octets stack pixels vertically
    pub const fn is_vtiled(&self) -> bool {
        self.contains(Self::MONO_VTILED)
    }

    /// Check if the first pixel of an octet is its MSB
    pub const fn is_msb_first(&self) -> bool {
        self.contains(Self::MONO_MSB_FIRST)
    }

    /// Check if the panel is electrophoretic
    pub const fn is_electrophoretic(&self) -> bool {
        self.contains(Self::EPD)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ScreenInfo {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "ScreenInfo({=u8:#04x})", self.bits())
    }
}
