//! Driver-independent display contract
//!
//! This crate defines what every display driver offers and what callers
//! may rely on, without depending on any bus or panel:
//!
//! - Pixel formats, panel layout traits and capability snapshots
//! - Bitmap regions and the packing rules for mono and RGB buffers
//! - The driver operation table with explicit optional features
//! - A bound handle that validates requests and tracks power state
//! - Error taxonomy shared by all drivers

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

mod fmt;

pub mod driver;
pub mod error;
pub mod model;

pub use driver::{Display, DisplayDriver, Framebuffer, PowerState, SharedDisplay, TransferPolicy};
pub use error::DisplayError;
pub use model::{
    Bitmap, BitmapMut, BitmapRegion, Capabilities, CapabilitiesError, Pixel, PixelFormat,
    PixelFormats, PixelLayout, ScreenInfo,
};
