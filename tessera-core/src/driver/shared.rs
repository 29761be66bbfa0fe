//! Display shared between tasks
//!
//! The handle itself is a plain single-owner value. To reach one panel from
//! several execution contexts, put it in a blocking mutex and hand out
//! [`SharedDisplay`] references, each of which runs one closure at a time
//! against the display.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;

use super::contract::DisplayDriver;
use super::display::Display;

/// Mutex-guarded display cell
pub type DisplayCell<M, D> = Mutex<M, RefCell<Display<D>>>;

/// Reference to a display shared between tasks
pub struct SharedDisplay<'a, M: RawMutex, D: DisplayDriver> {
    cell: &'a DisplayCell<M, D>,
}

impl<'a, M: RawMutex, D: DisplayDriver> SharedDisplay<'a, M, D> {
    /// Share a display cell
    pub fn new(cell: &'a DisplayCell<M, D>) -> Self {
        Self { cell }
    }

    /// Run `f` with exclusive access to the display
    ///
    /// Returns `None` if called from inside another `lock` on the same
    /// cell.
    pub fn lock<R>(&self, f: impl FnOnce(&mut Display<D>) -> R) -> Option<R> {
        self.cell.lock(|cell| {
            let Ok(mut display) = cell.try_borrow_mut() else {
                warn!("display already borrowed");
                return None;
            };
            Some(f(&mut display))
        })
    }
}

impl<M: RawMutex, D: DisplayDriver> Clone for SharedDisplay<'_, M, D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M: RawMutex, D: DisplayDriver> Copy for SharedDisplay<'_, M, D> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::TransferPolicy;
    use crate::error::DisplayError;
    use crate::model::{BitmapRegion, Capabilities, PixelFormat, PixelFormats, ScreenInfo};
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;

    struct CountingPanel {
        writes: u32,
    }

    impl DisplayDriver for CountingPanel {
        fn capabilities(&self) -> Capabilities {
            Capabilities::new(
                8,
                8,
                PixelFormats::MONO01,
                ScreenInfo::empty(),
                PixelFormat::Mono01,
            )
            .unwrap()
        }

        fn transfer_policy(&self) -> TransferPolicy {
            TransferPolicy::AutoPowerOn
        }

        fn power_on(&mut self) -> Result<(), DisplayError> {
            Ok(())
        }

        fn power_off(&mut self) -> Result<(), DisplayError> {
            Ok(())
        }

        fn write_bitmap(
            &mut self,
            _region: &BitmapRegion,
            _data: &[u8],
        ) -> Result<(), DisplayError> {
            self.writes += 1;
            Ok(())
        }

        fn set_pixel_format(&mut self, _format: PixelFormat) -> Result<(), DisplayError> {
            Ok(())
        }
    }

    fn cell() -> DisplayCell<NoopRawMutex, CountingPanel> {
        let display = Display::bind(CountingPanel { writes: 0 }).unwrap();
        Mutex::new(RefCell::new(display))
    }

    #[test]
    fn test_handles_serialize_on_one_display() {
        let cell = cell();
        let a = SharedDisplay::new(&cell);
        let b = a;

        let region = BitmapRegion::new(0, 0, 8, 8);
        a.lock(|d| d.write_bitmap(&region, &[0; 8])).unwrap().unwrap();
        b.lock(|d| d.write_bitmap(&region, &[0; 8])).unwrap().unwrap();

        let writes = a.lock(|d| d.driver().writes).unwrap();
        assert_eq!(writes, 2);
        assert_eq!(b.lock(|d| d.is_on()), Some(true));
    }

    #[test]
    fn test_reentrant_lock_is_refused() {
        let cell = cell();
        let shared = SharedDisplay::new(&cell);

        let inner = shared.lock(|_| shared.lock(|d| d.power_on()));
        assert_eq!(inner, Some(None));
    }
}
