/*
 *  pacer.rs
 *
 *  OLEDStat - always on, always up
 *  (c) 2020-26 Stuart Hunter
 *
 *  Fixed period tick deadlines that never compound drift
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
use tokio::time::{Duration, Instant};

/// Tick deadlines at `start + k * period`.
///
/// A tick that runs past later deadlines skips them rather than bursting,
/// so lateness is bounded by one tick's work.
pub struct Pacer {
    next_deadline: Instant,
    period: Duration,
}

impl Pacer {
    /// First deadline is `start` itself
    pub fn new(start: Instant, period: Duration) -> Self {
        let period = period.max(Duration::from_millis(1));
        Self { next_deadline: start, period }
    }

    #[inline]
    pub fn period(&self) -> Duration {
        self.period
    }

    #[inline]
    pub fn next_deadline(&self) -> Instant {
        self.next_deadline
    }

    /// Move past the deadline just served. Returns how many later deadlines
    /// were already behind `now` and got dropped.
    pub fn advance(&mut self, now: Instant) -> u32 {
        self.next_deadline += self.period;
        if self.next_deadline >= now {
            return 0;
        }

        let behind = (now - self.next_deadline).as_nanos();
        let missed = behind.div_ceil(self.period.as_nanos()).min(u32::MAX as u128) as u32;
        self.next_deadline += self.period * missed;
        missed
    }
}
