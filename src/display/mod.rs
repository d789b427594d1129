/*
 *  display/mod.rs
 *
 *  OLEDStat - always on, always up
 *  (c) 2020-26 Stuart Hunter
 *
 *  Display subsystem - driver trait, frame buffer and panel ownership
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

// Core trait definitions
pub mod traits;
pub mod error;
pub mod framebuffer;
pub mod factory;

// Scoped ownership of the open panel
pub mod handle;

// Fixed positions for the status screen
pub mod layout;

// Display drivers (hardware ones behind feature flags)
pub mod drivers;

pub use error::{DisplayError, DisplayFactoryError};
pub use factory::{BoxedDriver, DisplayDriverFactory};
pub use framebuffer::Frame;
pub use handle::DisplayHandle;
pub use layout::StatusLayout;
pub use traits::{DisplayCapabilities, DisplayDriver};
