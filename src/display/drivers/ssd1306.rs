/*
 *  display/drivers/ssd1306.rs
 *
 *  OLEDStat - always on, always up
 *  (c) 2020-26 Stuart Hunter
 *
 *  SSD1306 OLED display driver implementation
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

use linux_embedded_hal::I2cdev;
use ssd1306::{
    mode::BufferedGraphicsMode,
    prelude::*,
    size::{DisplaySize128x64, DisplaySize128x32},
    I2CDisplayInterface,
    Ssd1306,
};
// init() lives on this trait; the name clashes with our config struct
use ssd1306::mode::DisplayConfig as _;

use embedded_graphics::prelude::*;

use crate::config::DisplayConfig;
use crate::display::error::DisplayError;
use crate::display::framebuffer::Frame;
use crate::display::traits::{DisplayDriver, DisplayCapabilities};

use log::{debug, info};

type Panel<SIZE> = Ssd1306<I2CInterface<I2cdev>, SIZE, BufferedGraphicsMode<SIZE>>;

/// SSD1306 display driver wrapper
pub struct Ssd1306Driver {
    /// The underlying ssd1306 driver
    display: Ssd1306Variants,

    /// Display capabilities
    capabilities: DisplayCapabilities,
}

/// Enum to handle different SSD1306 display sizes
enum Ssd1306Variants {
    Size128x64(Panel<DisplaySize128x64>),
    Size128x32(Panel<DisplaySize128x32>),
}

/// Run the same expression against whichever panel size is wired up
macro_rules! with_panel {
    ($variants:expr, $panel:ident => $body:expr) => {
        match $variants {
            Ssd1306Variants::Size128x64($panel) => $body,
            Ssd1306Variants::Size128x32($panel) => $body,
        }
    };
}

impl Ssd1306Driver {
    /// Open the SSD1306 on an I2C bus
    ///
    /// # Arguments
    ///
    /// * `i2c_bus_path` - Path to I2C device (e.g., "/dev/i2c-1")
    /// * `address` - I2C address (typically 0x3C or 0x3D)
    /// * `config` - Display configuration
    ///
    /// Only the device node is opened here; the panel is first spoken to
    /// in `init()`.
    pub fn new_i2c(
        i2c_bus_path: &str,
        address: u8,
        config: &DisplayConfig,
    ) -> Result<Self, DisplayError> {
        info!("Opening SSD1306 on {} at address 0x{:02X}", i2c_bus_path, address);

        let i2c = I2cdev::new(i2c_bus_path)
            .map_err(|e| DisplayError::I2cError(format!("Failed to open {}: {}", i2c_bus_path, e)))?;

        let (width, height) = config.size();
        let interface = I2CDisplayInterface::new_custom_address(i2c, address);

        let display = match (width, height) {
            (128, 64) => Ssd1306Variants::Size128x64(
                Ssd1306::new(interface, DisplaySize128x64, DisplayRotation::Rotate0)
                    .into_buffered_graphics_mode(),
            ),
            (128, 32) => Ssd1306Variants::Size128x32(
                Ssd1306::new(interface, DisplaySize128x32, DisplayRotation::Rotate0)
                    .into_buffered_graphics_mode(),
            ),
            _ => {
                return Err(DisplayError::InvalidConfiguration(
                    format!("Unsupported SSD1306 size: {}x{}", width, height)
                ));
            }
        };

        let capabilities = DisplayCapabilities {
            width,
            height,
            supports_rotation: true,
            supports_brightness: true,
            supports_invert: true,
        };

        Ok(Self { display, capabilities })
    }
}

fn push_frame<SIZE: DisplaySize>(display: &mut Panel<SIZE>, frame: &Frame) -> Result<(), DisplayError> {
    display.clear_buffer();
    display.draw_iter(frame.on_pixels())?;
    display.flush()?;
    Ok(())
}

impl DisplayDriver for Ssd1306Driver {
    fn capabilities(&self) -> &DisplayCapabilities {
        &self.capabilities
    }

    fn init(&mut self) -> Result<(), DisplayError> {
        with_panel!(&mut self.display, display => {
            display.init()
                .map_err(|e| DisplayError::InitializationFailed(format!("{:?}", e)))?;
            display.clear_buffer();
            display.flush()?;
        });
        info!("SSD1306 initialized ({}x{})", self.capabilities.width, self.capabilities.height);
        Ok(())
    }

    fn set_brightness(&mut self, value: u8) -> Result<(), DisplayError> {
        let brightness = match value {
            0..=63 => Brightness::DIMMEST,
            64..=127 => Brightness::DIM,
            128..=191 => Brightness::NORMAL,
            _ => Brightness::BRIGHTEST,
        };
        with_panel!(&mut self.display, display => display.set_brightness(brightness))?;
        Ok(())
    }

    fn write_frame(&mut self, frame: &Frame) -> Result<(), DisplayError> {
        let expected = self.dimensions();
        if frame.dimensions() != expected {
            return Err(DisplayError::FrameSizeMismatch { expected, actual: frame.dimensions() });
        }
        with_panel!(&mut self.display, display => push_frame(display, frame))
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        with_panel!(&mut self.display, display => {
            display.clear_buffer();
            display.flush()?;
        });
        Ok(())
    }

    fn set_invert(&mut self, inverted: bool) -> Result<(), DisplayError> {
        with_panel!(&mut self.display, display => display.set_invert(inverted))?;
        Ok(())
    }

    fn set_rotation(&mut self, degrees: u16) -> Result<(), DisplayError> {
        let rotation = match degrees {
            0 => DisplayRotation::Rotate0,
            90 => DisplayRotation::Rotate90,
            180 => DisplayRotation::Rotate180,
            270 => DisplayRotation::Rotate270,
            _ => return Err(DisplayError::InvalidRotation(degrees)),
        };

        with_panel!(&mut self.display, display => display.set_rotation(rotation))?;

        // quarter turns swap the logical geometry
        let (w, h) = with_panel!(&self.display, display => display.dimensions());
        self.capabilities.width = w as u32;
        self.capabilities.height = h as u32;
        debug!("SSD1306 rotated {} degrees, now {}x{}", degrees, w, h);
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), DisplayError> {
        self.clear()?;
        with_panel!(&mut self.display, display => display.set_display_on(false))?;
        Ok(())
    }
}
