/*
 *  display/drivers/mock.rs
 *
 *  OLEDStat - always on, always up
 *  (c) 2020-26 Stuart Hunter
 *
 *  Mock display driver for testing and headless runs
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use crate::config::DisplayConfig;
use crate::display::error::DisplayError;
use crate::display::framebuffer::Frame;
use crate::display::traits::{DisplayDriver, DisplayCapabilities};

use log::{log_enabled, trace, Level};
use std::sync::{Arc, Mutex, MutexGuard};

/// Mock display driver
///
/// Simulates a panel without hardware. Useful for:
/// - Unit tests
/// - Integration tests
/// - Running the reporter on a desktop (`--driver mock`)
///
/// The "panel contents" is the last frame that was written successfully,
/// exactly what a real panel keeps showing after a failed transfer.
#[derive(Debug, Clone)]
pub struct MockDriver {
    /// Display capabilities
    capabilities: DisplayCapabilities,

    /// Unrotated panel geometry
    native: (u32, u32),

    /// Shared state for testing
    state: Arc<Mutex<MockDriverState>>,
}

/// Internal state for the mock driver (shared for inspection in tests)
#[derive(Debug, Default)]
pub struct MockDriverState {
    /// Number of times init() was called
    pub init_count: usize,

    /// Every write_frame() call, successful or not
    pub write_attempts: usize,

    /// Successful write_frame() calls
    pub frames_written: usize,

    /// Number of times clear() was called
    pub clear_count: usize,

    /// What the panel currently shows
    pub panel: Option<Frame>,

    /// Controller RAM as the SSD1306 would hold it, in page order
    pub gddram: Vec<u8>,

    /// Last brightness value set
    pub last_brightness: Option<u8>,

    /// Last rotation set
    pub last_rotation: Option<u16>,

    /// Last invert state set
    pub last_invert: Option<bool>,

    /// Whether the driver is initialized
    pub is_initialized: bool,

    /// Set once shutdown() ran
    pub is_shut_down: bool,

    /// Simulate failures (for error testing)
    pub simulate_init_failure: bool,
    pub simulate_write_failure: bool,
    /// 1-based write attempts that fail, e.g. `vec![3]`
    pub fail_on_attempts: Vec<usize>,
}

impl MockDriver {
    /// Create a new mock driver sized from configuration
    pub fn new(config: &DisplayConfig) -> Result<Self, DisplayError> {
        let (width, height) = config.size();

        let capabilities = DisplayCapabilities {
            width,
            height,
            supports_rotation: true,
            supports_brightness: true,
            supports_invert: true,
        };

        Ok(Self {
            capabilities,
            native: (width, height),
            state: Arc::new(Mutex::new(MockDriverState::default())),
        })
    }

    /// Create a mock driver with specific dimensions
    pub fn new_with_size(width: u32, height: u32) -> Result<Self, DisplayError> {
        let config = DisplayConfig {
            width: Some(width),
            height: Some(height),
            ..Default::default()
        };
        Self::new(&config)
    }

    /// Get reference to state for inspection in tests
    pub fn state(&self) -> Arc<Mutex<MockDriverState>> {
        Arc::clone(&self.state)
    }

    /// Snapshot of what the panel shows
    pub fn panel(&self) -> Option<Frame> {
        self.lock().panel.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MockDriverState> {
        // a panicking test thread must not hide the state from the next assertion
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DisplayDriver for MockDriver {
    fn capabilities(&self) -> &DisplayCapabilities {
        &self.capabilities
    }

    fn init(&mut self) -> Result<(), DisplayError> {
        let mut state = self.lock();

        if state.simulate_init_failure {
            return Err(DisplayError::InitializationFailed("Simulated init failure".to_string()));
        }

        state.init_count += 1;
        state.is_initialized = true;
        let blank = Frame::new(self.capabilities.width, self.capabilities.height);
        state.gddram = blank.to_page_bytes();
        state.panel = Some(blank);
        Ok(())
    }

    fn set_brightness(&mut self, value: u8) -> Result<(), DisplayError> {
        self.lock().last_brightness = Some(value);
        Ok(())
    }

    fn write_frame(&mut self, frame: &Frame) -> Result<(), DisplayError> {
        let expected = self.dimensions();
        if frame.dimensions() != expected {
            return Err(DisplayError::FrameSizeMismatch { expected, actual: frame.dimensions() });
        }

        let mut state = self.lock();
        state.write_attempts += 1;
        let attempt = state.write_attempts;

        if state.simulate_write_failure || state.fail_on_attempts.contains(&attempt) {
            return Err(DisplayError::I2cError(format!("Simulated write failure on attempt {}", attempt)));
        }

        state.frames_written += 1;
        state.gddram = frame.to_page_bytes();
        state.panel = Some(frame.clone());
        drop(state);

        if log_enabled!(Level::Trace) {
            trace!("mock panel frame {}:\n{}", attempt, frame.to_ascii());
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        let mut state = self.lock();
        state.clear_count += 1;
        let blank = Frame::new(self.capabilities.width, self.capabilities.height);
        state.gddram = blank.to_page_bytes();
        state.panel = Some(blank);
        Ok(())
    }

    fn set_invert(&mut self, inverted: bool) -> Result<(), DisplayError> {
        self.lock().last_invert = Some(inverted);
        Ok(())
    }

    fn set_rotation(&mut self, degrees: u16) -> Result<(), DisplayError> {
        if degrees != 0 && degrees != 90 && degrees != 180 && degrees != 270 {
            return Err(DisplayError::InvalidRotation(degrees));
        }

        // quarter turns swap the logical geometry, as on the real controller
        let (w, h) = self.native;
        let (w, h) = if degrees % 180 == 90 { (h, w) } else { (w, h) };
        self.capabilities.width = w;
        self.capabilities.height = h;
        self.lock().last_rotation = Some(degrees);
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), DisplayError> {
        self.clear()?;
        self.lock().is_shut_down = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::pixelcolor::BinaryColor;
    use embedded_graphics::prelude::*;
    use embedded_graphics::primitives::{Line, PrimitiveStyle};

    fn lit_frame() -> Frame {
        let mut frame = Frame::new(128, 64);
        Line::new(Point::new(0, 0), Point::new(10, 10))
            .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
            .draw(&mut frame)
            .unwrap();
        frame
    }

    #[test]
    fn test_mock_driver_creation() {
        let driver = MockDriver::new_with_size(128, 64).unwrap();
        assert_eq!(driver.capabilities().width, 128);
        assert_eq!(driver.capabilities().height, 64);
        assert!(driver.panel().is_none());
    }

    #[test]
    fn test_mock_driver_init() {
        let mut driver = MockDriver::new_with_size(128, 64).unwrap();

        let state = driver.state();
        assert_eq!(state.lock().unwrap().init_count, 0);
        assert!(!state.lock().unwrap().is_initialized);

        driver.init().unwrap();

        assert_eq!(state.lock().unwrap().init_count, 1);
        assert!(state.lock().unwrap().is_initialized);
        assert!(driver.panel().unwrap().is_blank());
    }

    #[test]
    fn test_mock_driver_write_and_clear() {
        let mut driver = MockDriver::new_with_size(128, 64).unwrap();
        driver.init().unwrap();

        let frame = lit_frame();
        driver.write_frame(&frame).unwrap();
        assert_eq!(driver.panel(), Some(frame));

        // (0,0) is bit 0 of the first page byte, (1,1) bit 1 of the next column
        let gddram = driver.state().lock().unwrap().gddram.clone();
        assert_eq!(gddram.len(), 128 * 8);
        assert_eq!(gddram[0], 0b0000_0001);
        assert_eq!(gddram[1], 0b0000_0010);

        driver.clear().unwrap();
        assert!(driver.panel().unwrap().is_blank());
        assert_eq!(driver.state().lock().unwrap().clear_count, 1);
        assert!(driver.state().lock().unwrap().gddram.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_mock_driver_failed_write_keeps_panel() {
        let mut driver = MockDriver::new_with_size(128, 64).unwrap();
        driver.init().unwrap();
        driver.state().lock().unwrap().fail_on_attempts = vec![2];

        let first = lit_frame();
        driver.write_frame(&first).unwrap();
        assert!(driver.write_frame(&Frame::new(128, 64)).is_err());
        assert_eq!(driver.panel(), Some(first));

        let state = driver.state();
        assert_eq!(state.lock().unwrap().write_attempts, 2);
        assert_eq!(state.lock().unwrap().frames_written, 1);
    }

    #[test]
    fn test_mock_driver_rotation() {
        let mut driver = MockDriver::new_with_size(128, 64).unwrap();

        driver.set_rotation(90).unwrap();
        assert_eq!(driver.state().lock().unwrap().last_rotation, Some(90));
        assert_eq!(driver.dimensions(), (64, 128));

        driver.set_rotation(180).unwrap();
        assert_eq!(driver.state().lock().unwrap().last_rotation, Some(180));
        assert_eq!(driver.dimensions(), (128, 64));

        driver.set_rotation(270).unwrap();
        assert_eq!(driver.dimensions(), (64, 128));
        assert!(driver.write_frame(&Frame::new(128, 64)).is_err());
        assert!(driver.write_frame(&Frame::new(64, 128)).is_ok());

        // Invalid rotation should fail
        assert!(driver.set_rotation(45).is_err());
    }

    #[test]
    fn test_mock_driver_apply_settings() {
        let mut driver = MockDriver::new_with_size(128, 64).unwrap();
        let config = DisplayConfig {
            rotate_deg: Some(180),
            invert: Some(true),
            brightness: Some(40),
            ..Default::default()
        };
        driver.apply_settings(&config).unwrap();

        let state = driver.state();
        let state = state.lock().unwrap();
        assert_eq!(state.last_rotation, Some(180));
        assert_eq!(state.last_invert, Some(true));
        assert_eq!(state.last_brightness, Some(40));
    }

    #[test]
    fn test_mock_driver_frame_size_mismatch() {
        let mut driver = MockDriver::new_with_size(128, 64).unwrap();
        let result = driver.write_frame(&Frame::new(128, 32));
        assert!(matches!(result, Err(DisplayError::FrameSizeMismatch { .. })));
        assert_eq!(driver.state().lock().unwrap().write_attempts, 0);
    }

    #[test]
    fn test_mock_driver_shutdown() {
        let mut driver = MockDriver::new_with_size(128, 64).unwrap();
        driver.init().unwrap();
        driver.write_frame(&lit_frame()).unwrap();
        driver.shutdown().unwrap();
        assert!(driver.state().lock().unwrap().is_shut_down);
        assert!(driver.panel().unwrap().is_blank());
    }
}
