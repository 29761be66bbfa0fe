//! Bound display handle
//!
//! [`Display`] owns a driver and is the only way callers reach it. It:
//!
//! - Validates regions, pitches, buffer sizes and formats before the driver
//!   sees them
//! - Tracks the power state and applies the driver's transfer policy
//! - Commits state changes only after the driver reports success

use super::contract::{DisplayDriver, Framebuffer, PowerState, TransferPolicy};
use crate::error::DisplayError;
use crate::model::{BitmapRegion, Capabilities, PixelFormat, PixelLayout};

/// A driver bound to a panel
#[derive(Debug)]
pub struct Display<D: DisplayDriver> {
    driver: D,
    power: PowerState,
}

impl<D: DisplayDriver> Display<D> {
    /// Bind a driver, running its one-time bring-up
    ///
    /// The panel is `Off` afterwards.
    pub fn bind(mut driver: D) -> Result<Self, DisplayError> {
        if let Err(e) = driver.init() {
            error!("display init failed: {}", e);
            return Err(e);
        }

        let caps = driver.capabilities();
        info!(
            "display bound: {}x{} {}",
            caps.x_resolution(),
            caps.y_resolution(),
            caps.current_pixel_format()
        );

        Ok(Self {
            driver,
            power: PowerState::Off,
        })
    }

    /// Current capability snapshot
    pub fn capabilities(&self) -> Capabilities {
        self.driver.capabilities()
    }

    /// Current power state
    pub fn power_state(&self) -> PowerState {
        self.power
    }

    /// Check if the panel is on
    pub fn is_on(&self) -> bool {
        self.power == PowerState::On
    }

    /// Policy the driver applies to transfers while off
    pub fn transfer_policy(&self) -> TransferPolicy {
        self.driver.transfer_policy()
    }

    /// Packing rules for buffers in the current format
    pub fn layout(&self) -> PixelLayout {
        self.capabilities().layout()
    }

    /// Turn the panel on
    ///
    /// Always forwarded to the driver, so calling it while on is harmless.
    pub fn power_on(&mut self) -> Result<(), DisplayError> {
        if let Err(e) = self.driver.power_on() {
            warn!("power on failed: {}", e);
            return Err(e);
        }
        if self.power != PowerState::On {
            debug!("power {} -> on", self.power);
        }
        self.power = PowerState::On;
        Ok(())
    }

    /// Turn the panel off
    ///
    /// Always forwarded to the driver, so calling it while off is harmless.
    pub fn power_off(&mut self) -> Result<(), DisplayError> {
        if let Err(e) = self.driver.power_off() {
            warn!("power off failed: {}", e);
            return Err(e);
        }
        if self.power != PowerState::Off {
            debug!("power {} -> off", self.power);
        }
        self.power = PowerState::Off;
        Ok(())
    }

    /// Transfer a region from `data` to the panel
    ///
    /// `data` holds `region.height` rows of `region.pitch` pixels in the
    /// current pixel format. A region with zero width or height succeeds
    /// without reaching the driver.
    pub fn write_bitmap(&mut self, region: &BitmapRegion, data: &[u8]) -> Result<(), DisplayError> {
        if let Err(e) = self.check_transfer(region, data.len()) {
            debug!("write rejected: {}", e);
            return Err(e);
        }
        if region.is_empty() {
            return Ok(());
        }
        self.prepare_transfer()?;

        trace!(
            "write {}x{} at ({}, {})",
            region.width,
            region.height,
            region.x,
            region.y
        );
        self.driver.write_bitmap(region, data)
    }

    /// Transfer a region from the panel into `data`
    ///
    /// Validated exactly like [`write_bitmap`](Self::write_bitmap). Fails
    /// with [`DisplayError::Unsupported`] on panels without read-back,
    /// before the transfer policy can power the panel on.
    pub fn read_bitmap(
        &mut self,
        region: &BitmapRegion,
        data: &mut [u8],
    ) -> Result<(), DisplayError> {
        if let Err(e) = self.check_transfer(region, data.len()) {
            debug!("read rejected: {}", e);
            return Err(e);
        }
        if !self.driver.supports_readback() {
            return Err(DisplayError::Unsupported);
        }
        if region.is_empty() {
            return Ok(());
        }
        self.prepare_transfer()?;

        trace!(
            "read {}x{} at ({}, {})",
            region.width,
            region.height,
            region.x,
            region.y
        );
        self.driver.read_bitmap(region, data)
    }

    /// Direct view of the driver's framebuffer, if it has one
    ///
    /// The view borrows the handle, so it must be dropped before any other
    /// operation runs.
    pub fn framebuffer(&mut self) -> Option<Framebuffer<'_>> {
        self.driver.framebuffer()
    }

    /// Set brightness, 0 = minimum, 255 = maximum
    pub fn set_brightness(&mut self, level: u8) -> Result<(), DisplayError> {
        self.driver.set_brightness(level)
    }

    /// Set contrast, 0 = minimum, 255 = maximum
    pub fn set_contrast(&mut self, level: u8) -> Result<(), DisplayError> {
        self.driver.set_contrast(level)
    }

    /// Switch the active pixel format
    ///
    /// Formats outside the supported set fail with
    /// [`DisplayError::UnsupportedFormat`] before reaching the driver. On any
    /// failure the previous format stays active.
    pub fn set_pixel_format(&mut self, format: PixelFormat) -> Result<(), DisplayError> {
        let caps = self.capabilities();
        if !caps.supports(format) {
            debug!("format {} not supported", format);
            return Err(DisplayError::UnsupportedFormat);
        }

        self.driver.set_pixel_format(format)?;
        debug!("format {} -> {}", caps.current_pixel_format(), format);
        Ok(())
    }

    /// Shared access to the driver for panel-specific queries
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Exclusive access to the driver for panel-specific features
    ///
    /// Power changes made through this reference are not tracked by the
    /// handle.
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Unbind and return the driver
    pub fn release(self) -> D {
        self.driver
    }

    /// Check a transfer request against the panel and the current layout
    fn check_transfer(&self, region: &BitmapRegion, len: usize) -> Result<(), DisplayError> {
        if !region.has_valid_pitch() {
            return Err(DisplayError::BufferTooSmall);
        }

        let caps = self.capabilities();
        if !region.fits_within(caps.x_resolution(), caps.y_resolution()) {
            return Err(DisplayError::OutOfBounds);
        }

        if len < caps.layout().buffer_len(region.pitch, region.height) {
            return Err(DisplayError::BufferTooSmall);
        }

        Ok(())
    }

    /// Apply the transfer policy ahead of a non-empty transfer
    fn prepare_transfer(&mut self) -> Result<(), DisplayError> {
        if self.power == PowerState::On {
            return Ok(());
        }

        match self.driver.transfer_policy() {
            TransferPolicy::WhileOff => Ok(()),
            TransferPolicy::AutoPowerOn => self.power_on(),
            TransferPolicy::RequirePowerOn => Err(DisplayError::NotPoweredOn),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Bitmap, BitmapMut, Pixel, PixelFormats, ScreenInfo};

    const SIZE: u16 = 16;
    const INFO: ScreenInfo = ScreenInfo::MONO_VTILED;

    /// 16x16 vertically tiled mono panel backed by an array
    struct FakePanel {
        format: PixelFormat,
        policy: TransferPolicy,
        ram: [u8; 32],
        linear: bool,
        inits: u32,
        power_ons: u32,
        power_offs: u32,
        writes: u32,
        init_fault: Option<DisplayError>,
        power_fault: Option<DisplayError>,
        format_fault: Option<DisplayError>,
    }

    impl FakePanel {
        fn new(policy: TransferPolicy) -> Self {
            Self {
                format: PixelFormat::Mono10,
                policy,
                ram: [0; 32],
                linear: false,
                inits: 0,
                power_ons: 0,
                power_offs: 0,
                writes: 0,
                init_fault: None,
                power_fault: None,
                format_fault: None,
            }
        }

        fn layout(&self) -> PixelLayout {
            PixelLayout::new(self.format, INFO)
        }
    }

    impl DisplayDriver for FakePanel {
        fn init(&mut self) -> Result<(), DisplayError> {
            self.inits += 1;
            match self.init_fault {
                Some(e) => Err(e),
                None => Ok(()),
            }
        }

        fn capabilities(&self) -> Capabilities {
            Capabilities::new(
                SIZE,
                SIZE,
                PixelFormats::MONO01 | PixelFormats::MONO10,
                INFO,
                self.format,
            )
            .unwrap()
        }

        fn transfer_policy(&self) -> TransferPolicy {
            self.policy
        }

        fn power_on(&mut self) -> Result<(), DisplayError> {
            if let Some(e) = self.power_fault {
                return Err(e);
            }
            self.power_ons += 1;
            Ok(())
        }

        fn power_off(&mut self) -> Result<(), DisplayError> {
            self.power_offs += 1;
            Ok(())
        }

        fn write_bitmap(&mut self, region: &BitmapRegion, data: &[u8]) -> Result<(), DisplayError> {
            let layout = self.layout();
            let src = Bitmap::new(data, layout, region.pitch);
            BitmapMut::new(&mut self.ram, layout, SIZE).copy_from(
                &src,
                (0, 0),
                (region.x, region.y),
                region.width,
                region.height,
            )?;
            self.writes += 1;
            Ok(())
        }

        fn framebuffer(&mut self) -> Option<Framebuffer<'_>> {
            if !self.linear {
                return None;
            }
            let layout = self.layout();
            Some(Framebuffer::new(&mut self.ram, layout, SIZE, SIZE, SIZE))
        }

        fn set_contrast(&mut self, _level: u8) -> Result<(), DisplayError> {
            Ok(())
        }

        fn set_pixel_format(&mut self, format: PixelFormat) -> Result<(), DisplayError> {
            if let Some(e) = self.format_fault {
                return Err(e);
            }
            self.format = format;
            Ok(())
        }
    }

    fn bound(policy: TransferPolicy) -> Display<FakePanel> {
        Display::bind(FakePanel::new(policy)).unwrap()
    }

    #[test]
    fn test_bind_leaves_panel_off() {
        let display = bound(TransferPolicy::RequirePowerOn);

        assert_eq!(display.power_state(), PowerState::Off);
        assert_eq!(display.driver().inits, 1);
        assert_eq!(display.driver().power_ons, 0);
    }

    #[test]
    fn test_bind_propagates_init_failure() {
        let mut panel = FakePanel::new(TransferPolicy::WhileOff);
        panel.init_fault = Some(DisplayError::Timeout);

        assert_eq!(Display::bind(panel).err(), Some(DisplayError::Timeout));
    }

    #[test]
    fn test_capabilities_are_stable() {
        let display = bound(TransferPolicy::WhileOff);
        let first = display.capabilities();

        assert_eq!(first, display.capabilities());
        assert_eq!(first.x_resolution(), SIZE);
        assert!(first.supports(first.current_pixel_format()));
    }

    #[test]
    fn test_power_transitions_are_idempotent() {
        let mut display = bound(TransferPolicy::WhileOff);

        display.power_on().unwrap();
        display.power_on().unwrap();
        assert!(display.is_on());
        assert_eq!(display.driver().power_ons, 2);

        display.power_off().unwrap();
        display.power_off().unwrap();
        assert_eq!(display.power_state(), PowerState::Off);
    }

    #[test]
    fn test_failed_power_on_keeps_state() {
        let mut display = bound(TransferPolicy::WhileOff);
        display.driver_mut().power_fault = Some(DisplayError::HardwareFault);

        assert_eq!(display.power_on(), Err(DisplayError::HardwareFault));
        assert_eq!(display.power_state(), PowerState::Off);
    }

    #[test]
    fn test_write_out_of_bounds_never_reaches_driver() {
        let mut display = bound(TransferPolicy::WhileOff);
        let data = [0u8; 64];

        let past_edge = BitmapRegion::new(SIZE - 1, 0, 2, 8);
        assert_eq!(
            display.write_bitmap(&past_edge, &data),
            Err(DisplayError::OutOfBounds)
        );

        let wrapping = BitmapRegion::new(u16::MAX, u16::MAX, 2, 2);
        assert_eq!(
            display.write_bitmap(&wrapping, &data),
            Err(DisplayError::OutOfBounds)
        );
        assert_eq!(display.driver().writes, 0);
    }

    #[test]
    fn test_write_rejects_short_buffer() {
        let mut display = bound(TransferPolicy::WhileOff);

        // 8 columns x 9 rows spans two pages of 8 bytes
        let region = BitmapRegion::new(0, 0, 8, 9);
        assert_eq!(
            display.write_bitmap(&region, &[0u8; 15]),
            Err(DisplayError::BufferTooSmall)
        );
        assert!(display.write_bitmap(&region, &[0u8; 16]).is_ok());
    }

    #[test]
    fn test_write_rejects_pitch_below_width() {
        let mut display = bound(TransferPolicy::WhileOff);
        let region = BitmapRegion::new(0, 0, 8, 8).with_pitch(4);

        assert_eq!(
            display.write_bitmap(&region, &[0u8; 64]),
            Err(DisplayError::BufferTooSmall)
        );
        assert_eq!(display.driver().writes, 0);
    }

    #[test]
    fn test_empty_region_is_a_noop() {
        let mut display = bound(TransferPolicy::RequirePowerOn);

        assert!(display.write_bitmap(&BitmapRegion::new(4, 4, 0, 8), &[]).is_ok());
        assert!(display.write_bitmap(&BitmapRegion::new(4, 4, 8, 0), &[]).is_ok());
        assert_eq!(display.driver().writes, 0);
        assert_eq!(display.power_state(), PowerState::Off);
    }

    #[test]
    fn test_require_power_on_rejects_transfer_while_off() {
        let mut display = bound(TransferPolicy::RequirePowerOn);
        let region = BitmapRegion::new(0, 0, 8, 8);
        let data = [0xFFu8; 8];

        assert_eq!(
            display.write_bitmap(&region, &data),
            Err(DisplayError::NotPoweredOn)
        );
        assert_eq!(display.driver().writes, 0);

        display.power_on().unwrap();
        display.write_bitmap(&region, &data).unwrap();
        assert_eq!(display.driver().ram[..8], [0xFF; 8]);
    }

    #[test]
    fn test_auto_power_on_before_transfer() {
        let mut display = bound(TransferPolicy::AutoPowerOn);

        display
            .write_bitmap(&BitmapRegion::new(0, 0, 1, 1), &[1])
            .unwrap();

        assert!(display.is_on());
        assert_eq!(display.driver().power_ons, 1);
        assert_eq!(display.driver().writes, 1);
    }

    #[test]
    fn test_auto_power_on_failure_skips_transfer() {
        let mut display = bound(TransferPolicy::AutoPowerOn);
        display.driver_mut().power_fault = Some(DisplayError::Timeout);

        assert_eq!(
            display.write_bitmap(&BitmapRegion::new(0, 0, 1, 1), &[1]),
            Err(DisplayError::Timeout)
        );
        assert_eq!(display.driver().writes, 0);
        assert_eq!(display.power_state(), PowerState::Off);
    }

    #[test]
    fn test_while_off_transfers_in_off_state() {
        let mut display = bound(TransferPolicy::WhileOff);

        display
            .write_bitmap(&BitmapRegion::new(0, 0, 1, 1), &[1])
            .unwrap();

        assert_eq!(display.power_state(), PowerState::Off);
        assert_eq!(display.driver().power_ons, 0);
        assert_eq!(display.driver().ram[0], 1);
    }

    #[test]
    fn test_write_honours_pitch() {
        let mut display = bound(TransferPolicy::WhileOff);

        // 2 columns taken from a 4 column stride; columns 2 and 3 are padding
        let data = [0x01, 0x02, 0xAA, 0xAA];
        let region = BitmapRegion::new(5, 0, 2, 8).with_pitch(4);
        display.write_bitmap(&region, &data).unwrap();

        let ram = display.driver().ram;
        assert_eq!(ram[5], 0x01);
        assert_eq!(ram[6], 0x02);
        assert_eq!(ram[7], 0x00);
    }

    #[test]
    fn test_partial_overlap_leaves_rest_untouched() {
        let mut display = bound(TransferPolicy::WhileOff);

        display
            .write_bitmap(&BitmapRegion::new(0, 0, SIZE, SIZE), &[0xFF; 32])
            .unwrap();
        display
            .write_bitmap(&BitmapRegion::new(2, 0, 1, 8), &[0x00])
            .unwrap();

        let ram = display.driver().ram;
        assert_eq!(ram[2], 0x00);
        assert_eq!(ram[1], 0xFF);
        assert_eq!(ram[3], 0xFF);
        assert_eq!(ram[SIZE as usize + 2], 0xFF);
    }

    #[test]
    fn test_read_defaults_to_unsupported() {
        let mut display = bound(TransferPolicy::WhileOff);
        let mut data = [0u8; 8];

        assert_eq!(
            display.read_bitmap(&BitmapRegion::new(0, 0, 8, 8), &mut data),
            Err(DisplayError::Unsupported)
        );
        // Validation still runs first
        assert_eq!(
            display.read_bitmap(&BitmapRegion::new(0, 0, 8, 32), &mut data),
            Err(DisplayError::OutOfBounds)
        );
    }

    #[test]
    fn test_read_without_readback_skips_power_policy() {
        let mut data = [0u8; 8];
        let region = BitmapRegion::new(0, 0, 8, 8);

        let mut display = bound(TransferPolicy::AutoPowerOn);
        assert_eq!(
            display.read_bitmap(&region, &mut data),
            Err(DisplayError::Unsupported)
        );
        assert_eq!(display.power_state(), PowerState::Off);
        assert_eq!(display.driver().power_ons, 0);

        let mut display = bound(TransferPolicy::RequirePowerOn);
        assert_eq!(
            display.read_bitmap(&region, &mut data),
            Err(DisplayError::Unsupported)
        );
        assert_eq!(display.power_state(), PowerState::Off);
    }

    #[test]
    fn test_exact_and_padded_pitch_write_same_pixels() {
        let mut exact = bound(TransferPolicy::WhileOff);
        let mut padded = bound(TransferPolicy::WhileOff);

        let tight = [0x81, 0x42, 0x24];
        exact
            .write_bitmap(&BitmapRegion::new(3, 8, 3, 8), &tight)
            .unwrap();

        // Same three columns, each row followed by two padding columns
        let wide = [0x81, 0x42, 0x24, 0xEE, 0xEE];
        padded
            .write_bitmap(&BitmapRegion::new(3, 8, 3, 8).with_pitch(5), &wide)
            .unwrap();

        assert_eq!(exact.driver().ram, padded.driver().ram);
        assert_eq!(exact.driver().ram[SIZE as usize + 3..SIZE as usize + 6], tight);
        assert_eq!(exact.driver().ram[SIZE as usize + 6], 0x00);
    }

    #[test]
    fn test_optional_features_report_absence() {
        let mut display = bound(TransferPolicy::WhileOff);

        assert!(display.framebuffer().is_none());
        assert_eq!(display.set_brightness(128), Err(DisplayError::Unsupported));
        assert!(display.set_contrast(128).is_ok());
    }

    #[test]
    fn test_framebuffer_writes_reach_panel_memory() {
        let mut display = bound(TransferPolicy::WhileOff);
        display.driver_mut().linear = true;

        {
            let mut fb = display.framebuffer().unwrap();
            assert_eq!(fb.width(), SIZE);
            assert_eq!(fb.pitch(), SIZE);
            fb.bitmap().set_pixel(3, 9, Pixel::Black).unwrap();
        }

        assert_eq!(display.driver().ram[SIZE as usize + 3], 0b0000_0010);
    }

    #[test]
    fn test_unsupported_format_never_reaches_driver() {
        let mut display = bound(TransferPolicy::WhileOff);
        display.driver_mut().format_fault = Some(DisplayError::HardwareFault);

        assert_eq!(
            display.set_pixel_format(PixelFormat::Rgb888),
            Err(DisplayError::UnsupportedFormat)
        );
        assert_eq!(display.capabilities().current_pixel_format(), PixelFormat::Mono10);
    }

    #[test]
    fn test_format_switch_is_observable() {
        let mut display = bound(TransferPolicy::WhileOff);

        display.set_pixel_format(PixelFormat::Mono01).unwrap();

        assert_eq!(display.capabilities().current_pixel_format(), PixelFormat::Mono01);
        assert_eq!(display.layout().format(), PixelFormat::Mono01);
    }

    #[test]
    fn test_failed_format_switch_keeps_previous() {
        let mut display = bound(TransferPolicy::WhileOff);
        display.driver_mut().format_fault = Some(DisplayError::HardwareFault);

        assert_eq!(
            display.set_pixel_format(PixelFormat::Mono01),
            Err(DisplayError::HardwareFault)
        );
        assert_eq!(display.capabilities().current_pixel_format(), PixelFormat::Mono10);
    }

    #[test]
    fn test_binds_through_trait_object() {
        let mut panel = FakePanel::new(TransferPolicy::AutoPowerOn);
        {
            let dyn_panel: &mut dyn DisplayDriver = &mut panel;
            let mut display = Display::bind(dyn_panel).unwrap();
            display
                .write_bitmap(&BitmapRegion::new(0, 0, 1, 1), &[1])
                .unwrap();
            assert!(display.is_on());
        }
        assert_eq!(panel.writes, 1);
    }

    #[test]
    fn test_release_returns_driver() {
        let mut display = bound(TransferPolicy::WhileOff);
        display.power_on().unwrap();

        let panel = display.release();
        assert_eq!(panel.power_ons, 1);
    }
}
