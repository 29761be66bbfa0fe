//! Capability and format model
//!
//! Value types describing what a panel can do and how its bitmaps are
//! packed. Nothing in here talks to hardware.

pub mod capabilities;
pub mod format;
pub mod layout;
pub mod region;

pub use capabilities::{Capabilities, CapabilitiesError};
pub use format::{PixelFormat, PixelFormats, ScreenInfo};
pub use layout::{Bitmap, BitmapMut, Pixel, PixelLayout};
pub use region::BitmapRegion;
