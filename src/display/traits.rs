/*
 *  display/traits.rs
 *
 *  OLEDStat - always on, always up
 *  (c) 2020-26 Stuart Hunter
 *
 *  Core trait definitions for display driver abstraction
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

/// Display capabilities and metadata
#[derive(Debug, Clone)]
pub struct DisplayCapabilities {
    /// Display width in pixels
    pub width: u32,

    /// Display height in pixels
    pub height: u32,

    /// Whether the display supports hardware rotation
    pub supports_rotation: bool,

    /// Whether the display supports brightness control
    pub supports_brightness: bool,

    /// Whether the display supports inversion
    pub supports_invert: bool,
}

/// Minimal hardware abstraction - the capability the reporter needs from a panel.
///
/// A driver is created already bound to its bus (see `DisplayDriverFactory`),
/// is initialized once with `init`, receives whole frames with `write_frame`
/// and is released with `shutdown`.
pub trait DisplayDriver: Send {
    /// Returns the capabilities of this display
    fn capabilities(&self) -> &DisplayCapabilities;

    /// Returns the display dimensions as (width, height)
    fn dimensions(&self) -> (u32, u32) {
        let caps = self.capabilities();
        (caps.width, caps.height)
    }

    /// Initialize the display hardware
    ///
    /// Runs the controller init sequence and leaves the panel blank. This is
    /// the first point at which a missing device is detected.
    fn init(&mut self) -> Result<(), DisplayError>;

    /// Set display brightness (0-255)
    fn set_brightness(&mut self, value: u8) -> Result<(), DisplayError>;

    /// Push a complete frame to the panel.
    ///
    /// On error the panel keeps whatever it showed before the call.
    fn write_frame(&mut self, frame: &Frame) -> Result<(), DisplayError>;

    /// Clear the display to blank/off state
    fn clear(&mut self) -> Result<(), DisplayError>;

    /// Set display inversion (if supported)
    fn set_invert(&mut self, _inverted: bool) -> Result<(), DisplayError> {
        Err(DisplayError::UnsupportedOperation)
    }

    /// Set display rotation (if supported)
    ///
    /// Rotation angle should be 0, 90, 180, or 270 degrees.
    fn set_rotation(&mut self, degrees: u16) -> Result<(), DisplayError> {
        if !self.capabilities().supports_rotation {
            return Err(DisplayError::UnsupportedOperation);
        }
        Err(DisplayError::InvalidRotation(degrees))
    }

    /// Blank the panel and switch it off before the bus is closed.
    fn shutdown(&mut self) -> Result<(), DisplayError> {
        self.clear()
    }

    /// Apply the optional orientation/contrast settings from config.
    fn apply_settings(&mut self, config: &DisplayConfig) -> Result<(), DisplayError> {
        if let Some(rotation) = config.rotate_deg {
            self.set_rotation(rotation)?;
        }
        if self.capabilities().supports_brightness {
            self.set_brightness(config.brightness.unwrap_or(crate::config::DEFAULT_BRIGHTNESS))?;
        }
        if let Some(invert) = config.invert {
            self.set_invert(invert)?;
        }
        Ok(())
    }
}
