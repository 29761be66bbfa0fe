//! Rectangular bitmap transfer descriptor

use super::capabilities::Capabilities;

/// Rectangle addressed by a bitmap transfer
///
/// `pitch` is the distance, in pixels, between the starts of two
/// consecutive rows in the caller's buffer. Only the first `width` pixels
/// of each row are transferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BitmapRegion {
    /// Left edge on the panel
    pub x: u16,
    /// Top edge on the panel
    pub y: u16,
    /// Width in pixels
    pub width: u16,
    /// Height in pixels
    pub height: u16,
    /// Row stride of the caller buffer in pixels
    pub pitch: u16,
}

impl BitmapRegion {
    /// Create a region with unpadded rows (`pitch == width`)
    pub const fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self {
            x,
            y,
            width,
            height,
            pitch: width,
        }
    }

    /// Region covering a whole panel
    pub const fn full(caps: &Capabilities) -> Self {
        Self::new(0, 0, caps.x_resolution(), caps.y_resolution())
    }

    /// Set the row stride of the caller buffer
    pub const fn with_pitch(self, pitch: u16) -> Self {
        Self { pitch, ..self }
    }

    /// Check if the region addresses no pixels
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Check if each row fits in its stride
    pub const fn has_valid_pitch(&self) -> bool {
        self.pitch >= self.width
    }

    /// Check if the region lies entirely on a `x_res` by `y_res` panel
    pub const fn fits_within(&self, x_res: u16, y_res: u16) -> bool {
        // Widen before adding so u16::MAX origins cannot wrap
        (self.x as u32 + self.width as u32) <= x_res as u32
            && (self.y as u32 + self.height as u32) <= y_res as u32
    }

    /// Exclusive right edge
    pub const fn right(&self) -> u32 {
        self.x as u32 + self.width as u32
    }

    /// Exclusive bottom edge
    pub const fn bottom(&self) -> u32 {
        self.y as u32 + self.height as u32
    }
}
