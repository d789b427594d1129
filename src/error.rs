/*
 *  error.rs
 *
 *  OLEDStat - always on, always up
 *  (c) 2020-26 Stuart Hunter
 *
 *  Reporter level error taxonomy
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

use thiserror::Error;

use crate::config::ConfigError;
use crate::display::error::{DisplayError, DisplayFactoryError};

/// Errors that leave a step of the reporter.
///
/// Only `DeviceUnavailable` (at startup) and `Config` ever reach `main`;
/// `Io` is consumed by the loop. Per-metric failures have their own type,
/// see `metrics::MetricUnavailable`.
#[derive(Debug, Error)]
pub enum StatusError {
    #[error("display unavailable on {bus}: {source}")]
    DeviceUnavailable {
        bus: String,
        #[source]
        source: DisplayFactoryError,
    },

    #[error("display write failed: {0}")]
    Io(#[source] DisplayError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
