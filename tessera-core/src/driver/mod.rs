//! Driver contract and the handle that enforces it

mod contract;
mod display;
mod shared;

pub use contract::{DisplayDriver, Framebuffer, PowerState, TransferPolicy};
pub use display::Display;
pub use shared::{DisplayCell, SharedDisplay};
