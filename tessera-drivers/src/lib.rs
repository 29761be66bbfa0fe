//! Display driver implementations
//!
//! This crate provides concrete implementations of the driver contract
//! defined in tessera-core:
//!
//! - OLED panels (SH1106 over I2C)
//! - E-paper panels (SSD1673 over SPI)
//! - A RAM-backed panel for host tests and simulators

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

mod fmt;

pub mod epd;
pub mod oled;
pub mod sim;

pub use epd::{RefreshMode, Ssd1673, Ssd1673Config};
pub use oled::{Sh1106, Sh1106Config};
pub use sim::{MemoryPanel, MemoryPanelConfig, MemoryPanelError};
