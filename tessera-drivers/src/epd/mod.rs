//! Electrophoretic panel drivers

pub mod ssd1673;

pub use ssd1673::{RefreshMode, Ssd1673, Ssd1673Config};
