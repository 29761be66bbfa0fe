//! Capability descriptor a driver reports

use super::format::{PixelFormat, PixelFormats, ScreenInfo};
use super::layout::PixelLayout;
use crate::error::DisplayError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Errors that can occur when building a capability snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CapabilitiesError {
    /// A resolution axis is zero
    EmptyResolution,
    /// The supported format set is empty
    NoPixelFormats,
    /// The current format is not in the supported set
    CurrentFormatUnsupported,
}

impl core::fmt::Display for CapabilitiesError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::EmptyResolution => write!(f, "Resolution must be at least 1x1"),
            Self::NoPixelFormats => write!(f, "At least one pixel format must be supported"),
            Self::CurrentFormatUnsupported => {
                write!(f, "Current pixel format is not in the supported set")
            }
        }
    }
}

impl core::error::Error for CapabilitiesError {}

/// Snapshot of what a panel can do
///
/// Returned by value: holding one never observes a later format switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Capabilities {
    x_resolution: u16,
    y_resolution: u16,
    supported_pixel_formats: PixelFormats,
    screen_info: ScreenInfo,
    current_pixel_format: PixelFormat,
}

impl Capabilities {
    /// Build a snapshot, checking its invariants
    pub const fn new(
        x_resolution: u16,
        y_resolution: u16,
        supported_pixel_formats: PixelFormats,
        screen_info: ScreenInfo,
        current_pixel_format: PixelFormat,
    ) -> Result<Self, CapabilitiesError> {
        if x_resolution == 0 || y_resolution == 0 {
            return Err(CapabilitiesError::EmptyResolution);
        }
        if supported_pixel_formats.is_empty() {
            return Err(CapabilitiesError::NoPixelFormats);
        }
        if !supported_pixel_formats.supports(current_pixel_format) {
            return Err(CapabilitiesError::CurrentFormatUnsupported);
        }

        Ok(Self {
            x_resolution,
            y_resolution,
            supported_pixel_formats,
            screen_info,
            current_pixel_format,
        })
    }

    /// Panel width in pixels
    pub const fn x_resolution(&self) -> u16 {
        self.x_resolution
    }

    /// Panel height in pixels
    pub const fn y_resolution(&self) -> u16 {
        self.y_resolution
    }

    /// Formats the driver can switch to
    pub const fn supported_pixel_formats(&self) -> PixelFormats {
        self.supported_pixel_formats
    }

    /// Physical layout traits
    pub const fn screen_info(&self) -> ScreenInfo {
        self.screen_info
    }

    /// Currently active format
    pub const fn current_pixel_format(&self) -> PixelFormat {
        self.current_pixel_format
    }

    /// Packing rules for buffers in the current format
    pub const fn layout(&self) -> PixelLayout {
        PixelLayout::new(self.current_pixel_format, self.screen_info)
    }

    /// Check if `format` can be activated
    pub const fn supports(&self, format: PixelFormat) -> bool {
        self.supported_pixel_formats.supports(format)
    }

    /// Copy of this snapshot with a different active format
    ///
    /// Fails with [`DisplayError::UnsupportedFormat`] if `format` is not in
    /// the supported set; `self` is left as it was.
    pub const fn with_current_format(&self, format: PixelFormat) -> Result<Self, DisplayError> {
        if !self.supports(format) {
            return Err(DisplayError::UnsupportedFormat);
        }

        Ok(Self {
            current_pixel_format: format,
            ..*self
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn epd_caps() -> Capabilities {
        Capabilities::new(
            250,
            122,
            PixelFormats::MONO01.union(PixelFormats::MONO10),
            ScreenInfo::MONO_VTILED.union(ScreenInfo::EPD),
            PixelFormat::Mono01,
        )
        .unwrap()
    }

    #[test]
    fn test_valid_snapshot() {
        let caps = epd_caps();

        assert_eq!(caps.x_resolution(), 250);
        assert_eq!(caps.y_resolution(), 122);
        assert_eq!(caps.current_pixel_format(), PixelFormat::Mono01);
        assert!(caps.screen_info().is_electrophoretic());
    }

    #[test]
    fn test_rejects_empty_resolution() {
        let result = Capabilities::new(
            0,
            64,
            PixelFormats::MONO10,
            ScreenInfo::empty(),
            PixelFormat::Mono10,
        );
        assert_eq!(result, Err(CapabilitiesError::EmptyResolution));
    }

    #[test]
    fn test_rejects_empty_format_set() {
        let result = Capabilities::new(
            128,
            64,
            PixelFormats::EMPTY,
            ScreenInfo::empty(),
            PixelFormat::Mono10,
        );
        assert_eq!(result, Err(CapabilitiesError::NoPixelFormats));
    }

    #[test]
    fn test_rejects_current_outside_supported() {
        let result = Capabilities::new(
            128,
            64,
            PixelFormats::MONO10,
            ScreenInfo::empty(),
            PixelFormat::Rgb888,
        );
        assert_eq!(result, Err(CapabilitiesError::CurrentFormatUnsupported));
    }

    #[test]
    fn test_with_current_format() {
        let caps = epd_caps();

        assert_eq!(
            caps.with_current_format(PixelFormat::Rgb888),
            Err(DisplayError::UnsupportedFormat)
        );

        let switched = caps.with_current_format(PixelFormat::Mono10).unwrap();
        assert_eq!(switched.current_pixel_format(), PixelFormat::Mono10);
        assert_eq!(switched.x_resolution(), caps.x_resolution());
        // Earlier snapshot is a value, not a live view
        assert_eq!(caps.current_pixel_format(), PixelFormat::Mono01);
    }
}
