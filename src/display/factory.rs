/*
 *  display/factory.rs
 *
 *  OLEDStat - always on, always up
 *  (c) 2020-26 Stuart Hunter
 *
 *  Opens the configured display driver
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

use crate::config::{DisplayConfig, DriverKind};
#[cfg(feature = "driver-ssd1306")]
use crate::config::BusConfig;
use crate::display::drivers::mock::MockDriver;
use crate::display::error::DisplayFactoryError;
use crate::display::traits::DisplayDriver;
use log::info;
#[cfg(feature = "driver-ssd1306")]
use log::warn;

#[cfg(feature = "driver-ssd1306")]
use crate::display::drivers::ssd1306::Ssd1306Driver;

/// Type alias for boxed display driver trait objects
pub type BoxedDriver = Box<dyn DisplayDriver>;

/// Factory for creating display drivers from configuration
pub struct DisplayDriverFactory;

impl DisplayDriverFactory {
    /// Open a display driver from configuration
    ///
    /// The returned driver owns the bus but has not been initialized yet.
    ///
    /// ```ignore
    /// let config = DisplayConfig {
    ///     driver: Some(DriverKind::Ssd1306),
    ///     bus: Some(BusConfig::I2c {
    ///         bus: "/dev/i2c-5".to_string(),
    ///         address: 0x3C,
    ///         speed_hz: None,
    ///     }),
    ///     ..Default::default()
    /// };
    ///
    /// let driver = DisplayDriverFactory::create_from_config(&config)?;
    /// ```
    pub fn create_from_config(
        config: &DisplayConfig
    ) -> Result<BoxedDriver, DisplayFactoryError> {
        Self::validate_config(config)?;

        match config.driver_kind() {
            DriverKind::Mock => {
                let (w, h) = config.size();
                info!("Using mock display ({}x{}), frames are logged at trace level", w, h);
                Ok(Box::new(MockDriver::new(config)?))
            }

            #[cfg(feature = "driver-ssd1306")]
            DriverKind::Ssd1306 => {
                let (bus, address) = config.i2c_target();
                if let Some(BusConfig::I2c { speed_hz: Some(hz), .. }) = &config.bus {
                    warn!("speed_hz {} ignored, the i2c-dev clock is set by the device tree", hz);
                }
                Ok(Box::new(Ssd1306Driver::new_i2c(&bus, address, config)?))
            }

            #[cfg(not(feature = "driver-ssd1306"))]
            DriverKind::Ssd1306 => Err(DisplayFactoryError::DriverNotEnabled("SSD1306")),
        }
    }

    /// Validate a configuration without touching hardware
    pub fn validate_config(config: &DisplayConfig) -> Result<(), DisplayFactoryError> {
        if let Some(rotation) = config.rotate_deg {
            if rotation != 0 && rotation != 90 && rotation != 180 && rotation != 270 {
                return Err(DisplayFactoryError::ConfigError(
                    format!("Invalid rotation angle: {} (must be 0, 90, 180, or 270)", rotation)
                ));
            }
        }

        let (width, height) = config.size();
        if width == 0 || height == 0 {
            return Err(DisplayFactoryError::ConfigError(
                format!("Invalid display size: {}x{}", width, height)
            ));
        }

        Ok(())
    }
}
