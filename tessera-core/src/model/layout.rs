//! Bitmap addressing model
//!
//! Defines how pixels are packed into a byte buffer for a given
//! [`PixelFormat`] and [`ScreenInfo`]:
//!
//! - `Rgb888`: 3 bytes per pixel (R, G, B), rows `pitch` pixels apart
//! - Mono, horizontal tiling: byte `y * ceil(pitch / 8) + x / 8`
//! - Mono, vertical tiling: byte `(y / 8) * pitch + x`
//!
//! Within a mono octet the pixel's bit is `7 - k` when
//! [`ScreenInfo::MONO_MSB_FIRST`] is set and `k` otherwise, with
//! `k = x % 8` (horizontal) or `k = y % 8` (vertical). Coordinates are
//! relative to the start of the buffer.
//!
//! Drivers and rendering clients must both go through these rules so a
//! bitmap means the same thing on every panel.

use super::format::{PixelFormat, ScreenInfo};
use crate::error::DisplayError;

/// Decoded value of a single pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Pixel {
    /// Mono pixel in its "black" state (lit on emissive mono panels)
    Black,
    /// Mono pixel in its "white" state
    White,
    /// RGB pixel
    Rgb([u8; 3]),
}

/// Packing rules for one buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PixelLayout {
    format: PixelFormat,
    screen_info: ScreenInfo,
}

/// Location of a pixel inside a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    /// First byte of an RGB triple
    Rgb(usize),
    /// Byte index and bit number of a mono pixel
    Bit(usize, u8),
}

impl PixelLayout {
    /// Create a layout
    pub const fn new(format: PixelFormat, screen_info: ScreenInfo) -> Self {
        Self {
            format,
            screen_info,
        }
    }

    /// Pixel encoding
    pub const fn format(&self) -> PixelFormat {
        self.format
    }

    /// Tiling and bit order traits
    pub const fn screen_info(&self) -> ScreenInfo {
        self.screen_info
    }

    /// Number of bits one pixel occupies
    pub const fn bits_per_pixel(&self) -> u8 {
        self.format.bits_per_pixel()
    }

    /// Bytes needed for `rows` rows of `pitch` pixels
    ///
    /// Saturates at `usize::MAX` where the size does not fit the target's
    /// address space.
    pub const fn buffer_len(&self, pitch: u16, rows: u16) -> usize {
        let pitch = pitch as usize;
        let rows = rows as usize;

        match self.format {
            PixelFormat::Rgb888 => pitch.saturating_mul(rows).saturating_mul(3),
            PixelFormat::Mono01 | PixelFormat::Mono10 => {
                if self.screen_info.is_vtiled() {
                    pitch.saturating_mul(rows.div_ceil(8))
                } else {
                    pitch.div_ceil(8).saturating_mul(rows)
                }
            }
        }
    }

    /// Check if two layouts hold the same kind of pixel (RGB or mono)
    pub const fn is_compatible_with(&self, other: &PixelLayout) -> bool {
        self.format.is_mono() == other.format.is_mono()
    }

    fn slot(&self, pitch: u16, x: u16, y: u16) -> Slot {
        let pitch = pitch as usize;
        let x = x as usize;
        let y = y as usize;

        if !self.format.is_mono() {
            return Slot::Rgb(y.saturating_mul(pitch).saturating_add(x).saturating_mul(3));
        }

        let (index, k) = if self.screen_info.is_vtiled() {
            ((y / 8) * pitch + x, (y % 8) as u8)
        } else {
            (y * pitch.div_ceil(8) + x / 8, (x % 8) as u8)
        };

        let bit = if self.screen_info.is_msb_first() {
            7 - k
        } else {
            k
        };

        Slot::Bit(index, bit)
    }

    fn decode_bit(&self, set: bool) -> Pixel {
        match (self.format, set) {
            (PixelFormat::Mono01, false) | (PixelFormat::Mono10, true) => Pixel::Black,
            _ => Pixel::White,
        }
    }

    fn encode_bit(&self, pixel: Pixel) -> Result<bool, DisplayError> {
        match (self.format, pixel) {
            (PixelFormat::Mono01, Pixel::White) | (PixelFormat::Mono10, Pixel::Black) => Ok(true),
            (PixelFormat::Mono01, Pixel::Black) | (PixelFormat::Mono10, Pixel::White) => Ok(false),
            _ => Err(DisplayError::UnsupportedFormat),
        }
    }

    /// Read the pixel at `(x, y)` of a buffer with row stride `pitch`
    pub fn read(&self, buf: &[u8], pitch: u16, x: u16, y: u16) -> Result<Pixel, DisplayError> {
        if x >= pitch {
            return Err(DisplayError::OutOfBounds);
        }

        match self.slot(pitch, x, y) {
            Slot::Rgb(index) => {
                let end = index.checked_add(3).ok_or(DisplayError::BufferTooSmall)?;
                let rgb = buf.get(index..end).ok_or(DisplayError::BufferTooSmall)?;
                Ok(Pixel::Rgb([rgb[0], rgb[1], rgb[2]]))
            }
            Slot::Bit(index, bit) => {
                let byte = buf.get(index).ok_or(DisplayError::BufferTooSmall)?;
                Ok(self.decode_bit(byte & (1 << bit) != 0))
            }
        }
    }

    /// Write `pixel` at `(x, y)` of a buffer with row stride `pitch`
    ///
    /// Fails with [`DisplayError::UnsupportedFormat`] when an RGB pixel is
    /// written into a mono layout or the other way round.
    pub fn write(
        &self,
        buf: &mut [u8],
        pitch: u16,
        x: u16,
        y: u16,
        pixel: Pixel,
    ) -> Result<(), DisplayError> {
        if x >= pitch {
            return Err(DisplayError::OutOfBounds);
        }

        match self.slot(pitch, x, y) {
            Slot::Rgb(index) => {
                let Pixel::Rgb(rgb) = pixel else {
                    return Err(DisplayError::UnsupportedFormat);
                };
                let end = index.checked_add(3).ok_or(DisplayError::BufferTooSmall)?;
                buf.get_mut(index..end)
                    .ok_or(DisplayError::BufferTooSmall)?
                    .copy_from_slice(&rgb);
                Ok(())
            }
            Slot::Bit(index, bit) => {
                let set = self.encode_bit(pixel)?;
                let byte = buf.get_mut(index).ok_or(DisplayError::BufferTooSmall)?;
                if set {
                    *byte |= 1 << bit;
                } else {
                    *byte &= !(1 << bit);
                }
                Ok(())
            }
        }
    }
}

/// Read-only bitmap: a buffer plus its packing rules
#[derive(Debug, Clone, Copy)]
pub struct Bitmap<'a> {
    data: &'a [u8],
    layout: PixelLayout,
    pitch: u16,
}

impl<'a> Bitmap<'a> {
    /// Wrap a buffer
    pub const fn new(data: &'a [u8], layout: PixelLayout, pitch: u16) -> Self {
        Self {
            data,
            layout,
            pitch,
        }
    }

    /// Packing rules
    pub const fn layout(&self) -> PixelLayout {
        self.layout
    }

    /// Row stride in pixels
    pub const fn pitch(&self) -> u16 {
        self.pitch
    }

    /// Raw bytes
    pub const fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Read one pixel
    pub fn pixel(&self, x: u16, y: u16) -> Result<Pixel, DisplayError> {
        self.layout.read(self.data, self.pitch, x, y)
    }
}

/// Mutable bitmap: a buffer plus its packing rules
#[derive(Debug)]
pub struct BitmapMut<'a> {
    data: &'a mut [u8],
    layout: PixelLayout,
    pitch: u16,
}

impl<'a> BitmapMut<'a> {
    /// Wrap a buffer
    pub fn new(data: &'a mut [u8], layout: PixelLayout, pitch: u16) -> Self {
        Self {
            data,
            layout,
            pitch,
        }
    }

    /// Packing rules
    pub const fn layout(&self) -> PixelLayout {
        self.layout
    }

    /// Row stride in pixels
    pub const fn pitch(&self) -> u16 {
        self.pitch
    }

    /// Raw bytes
    pub fn data(&self) -> &[u8] {
        &*self.data
    }

    /// Raw bytes, mutable
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut *self.data
    }

    /// Read-only view of the same buffer
    pub fn as_bitmap(&self) -> Bitmap<'_> {
        Bitmap::new(&*self.data, self.layout, self.pitch)
    }

    /// Read one pixel
    pub fn pixel(&self, x: u16, y: u16) -> Result<Pixel, DisplayError> {
        self.layout.read(&*self.data, self.pitch, x, y)
    }

    /// Write one pixel
    pub fn set_pixel(&mut self, x: u16, y: u16, pixel: Pixel) -> Result<(), DisplayError> {
        self.layout.write(&mut *self.data, self.pitch, x, y, pixel)
    }

    /// Check that a `width` x `height` window at `(x, y)` is addressable
    fn check_window(
        layout: &PixelLayout,
        len: usize,
        pitch: u16,
        (x, y): (u16, u16),
        width: u16,
        height: u16,
    ) -> Result<(), DisplayError> {
        if x as u32 + width as u32 > pitch as u32 {
            return Err(DisplayError::OutOfBounds);
        }
        let rows = y as u32 + height as u32;
        if rows > u16::MAX as u32 {
            return Err(DisplayError::OutOfBounds);
        }
        if layout.buffer_len(pitch, rows as u16) > len {
            return Err(DisplayError::BufferTooSmall);
        }
        Ok(())
    }

    /// Fill a window with one pixel value
    pub fn fill(
        &mut self,
        origin: (u16, u16),
        width: u16,
        height: u16,
        pixel: Pixel,
    ) -> Result<(), DisplayError> {
        Self::check_window(&self.layout, self.data.len(), self.pitch, origin, width, height)?;

        for row in 0..height {
            for col in 0..width {
                self.set_pixel(origin.0 + col, origin.1 + row, pixel)?;
            }
        }
        Ok(())
    }

    /// Copy a `width` x `height` window from `src` into this bitmap
    ///
    /// Both windows are checked before any pixel is touched, so a failed
    /// copy leaves the destination unchanged. Mono formats convert through
    /// the decoded pixel value: black stays black across `Mono01` and
    /// `Mono10`. RGB and mono layouts cannot be mixed.
    pub fn copy_from(
        &mut self,
        src: &Bitmap<'_>,
        src_origin: (u16, u16),
        dst_origin: (u16, u16),
        width: u16,
        height: u16,
    ) -> Result<(), DisplayError> {
        if !self.layout.is_compatible_with(&src.layout) {
            return Err(DisplayError::UnsupportedFormat);
        }
        Self::check_window(&src.layout, src.data.len(), src.pitch, src_origin, width, height)?;
        Self::check_window(&self.layout, self.data.len(), self.pitch, dst_origin, width, height)?;

        if self.layout == src.layout && !self.layout.format().is_mono() {
            // Linear RGB rows copy as whole slices
            let row_bytes = width as usize * 3;
            for row in 0..height {
                let s = ((src_origin.1 + row) as usize * src.pitch as usize
                    + src_origin.0 as usize)
                    * 3;
                let d = ((dst_origin.1 + row) as usize * self.pitch as usize
                    + dst_origin.0 as usize)
                    * 3;
                let from = src
                    .data
                    .get(s..s + row_bytes)
                    .ok_or(DisplayError::BufferTooSmall)?;
                self.data
                    .get_mut(d..d + row_bytes)
                    .ok_or(DisplayError::BufferTooSmall)?
                    .copy_from_slice(from);
            }
            return Ok(());
        }

        for row in 0..height {
            for col in 0..width {
                let pixel = src.pixel(src_origin.0 + col, src_origin.1 + row)?;
                self.set_pixel(dst_origin.0 + col, dst_origin.1 + row, pixel)?;
            }
        }
        Ok(())
    }
}
