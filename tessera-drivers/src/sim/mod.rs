//! Software panels

pub mod memory;

pub use memory::{MemoryPanel, MemoryPanelConfig, MemoryPanelError};
