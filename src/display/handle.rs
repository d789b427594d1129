/*
 *  display/handle.rs
 *
 *  OLEDStat - always on, always up
 *  (c) 2020-26 Stuart Hunter
 *
 *  The one owned handle to the panel, released on every exit path
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

use log::{debug, info, warn};

use crate::config::DisplayConfig;
use crate::display::error::{DisplayError, DisplayFactoryError};
use crate::display::factory::{BoxedDriver, DisplayDriverFactory};
use crate::display::framebuffer::Frame;
use crate::display::traits::DisplayCapabilities;
use crate::error::StatusError;

/// Exclusive owner of an initialized display.
///
/// Not `Clone`; it is moved into the reporter and lives as long as the
/// process. Dropping it blanks the panel, switches it off and closes the bus.
pub struct DisplayHandle {
    driver: BoxedDriver,
    bus: String,
    released: bool,
}

impl DisplayHandle {
    /// Open and initialize the configured panel.
    pub fn acquire(config: &DisplayConfig) -> Result<Self, StatusError> {
        let bus = config.bus_label();
        let driver = DisplayDriverFactory::create_from_config(config)
            .map_err(|source| StatusError::DeviceUnavailable { bus: bus.clone(), source })?;
        Self::from_driver(driver, bus, config)
    }

    /// Initialize an already opened driver and take ownership of it.
    ///
    /// On failure the driver is dropped without any further bus traffic.
    pub fn from_driver(
        mut driver: BoxedDriver,
        bus: impl Into<String>,
        config: &DisplayConfig,
    ) -> Result<Self, StatusError> {
        let bus = bus.into();
        let unavailable = |e: DisplayError| StatusError::DeviceUnavailable {
            bus: bus.clone(),
            source: DisplayFactoryError::DriverInitFailed(e),
        };

        driver.init().map_err(unavailable)?;
        driver.apply_settings(config).map_err(unavailable)?;

        let (w, h) = driver.dimensions();
        info!("Display ready on {} ({}x{})", bus, w, h);
        Ok(Self { driver, bus, released: false })
    }

    pub fn bus(&self) -> &str {
        &self.bus
    }

    pub fn capabilities(&self) -> &DisplayCapabilities {
        self.driver.capabilities()
    }

    pub fn write_frame(&mut self, frame: &Frame) -> Result<(), DisplayError> {
        self.driver.write_frame(frame)
    }

    pub fn set_brightness(&mut self, value: u8) -> Result<(), DisplayError> {
        self.driver.set_brightness(value)
    }

    /// Explicit release, reporting the result instead of only logging it.
    pub fn release(mut self) -> Result<(), DisplayError> {
        self.released = true;
        self.driver.shutdown()
    }
}

impl Drop for DisplayHandle {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        match self.driver.shutdown() {
            Ok(()) => debug!("Display on {} released", self.bus),
            Err(e) => warn!("Display on {} not cleared on release: {}", self.bus, e),
        }
    }
}
