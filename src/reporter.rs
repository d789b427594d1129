/*
 *  reporter.rs
 *
 *  OLEDStat - always on, always up
 *  (c) 2020-26 Stuart Hunter
 *
 *  Sample, render, push - once per tick, forever
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

use chrono::{DateTime, Local};
use log::{debug, error, info, warn};
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, sleep_until, Instant};

use crate::config::{
    Config, DisplayConfig, RetryConfig, RetryMode, DEFAULT_BRIGHTNESS, DEFAULT_MAX_SKIP_TICKS,
    DEFAULT_WARN_AFTER,
};
use crate::display::handle::DisplayHandle;
use crate::display::layout::StatusLayout;
use crate::error::StatusError;
use crate::metrics::{MetricSnapshot, MetricSource};
use crate::pacer::Pacer;
use crate::render::{render_snapshot, splash_frame};

const SPLASH_FADE_STEPS: u32 = 8;

/// Where the reporter is in its cycle.
///
/// `Starting` lasts until `run` is entered. A reporter that could not
/// acquire its display never exists: `StatusReporter::start` returns the
/// `DeviceUnavailable` error instead, which is the terminal failed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReporterState {
    Starting,
    /// Waiting for the next tick
    Running,
    Sampling,
    Rendering,
    Pushing,
}

/// What one tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Pushed,
    PushFailed,
    /// Held back by the backoff policy; nothing sampled or written
    Skipped,
}

/// How the loop treats a display that keeps failing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub mode: RetryMode,
    /// Consecutive failures before the one "display unavailable" warning
    pub warn_after: u32,
    /// Backoff ceiling, in ticks
    pub max_skip_ticks: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            mode: RetryMode::EveryTick,
            warn_after: DEFAULT_WARN_AFTER,
            max_skip_ticks: DEFAULT_MAX_SKIP_TICKS,
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        let defaults = Self::default();
        Self {
            mode: cfg.mode.unwrap_or(defaults.mode),
            warn_after: cfg.warn_after.unwrap_or(defaults.warn_after),
            max_skip_ticks: cfg.max_skip_ticks.unwrap_or(defaults.max_skip_ticks),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReporterSettings {
    pub interval: Duration,
    pub splash: Duration,
    pub brightness: u8,
    pub retry: RetryPolicy,
}

impl Default for ReporterSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl ReporterSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            interval: cfg.interval(),
            splash: cfg.splash(),
            brightness: cfg.display_config().brightness.unwrap_or(DEFAULT_BRIGHTNESS),
            retry: RetryPolicy::from(&cfg.retry_config()),
        }
    }
}

/// The always-on reporter: owns the display and the metric source.
pub struct StatusReporter<M: MetricSource> {
    display: DisplayHandle,
    source: M,
    layout: StatusLayout,
    settings: ReporterSettings,
    state: ReporterState,

    ticks: u64,
    consecutive_failures: u32,
    /// Tick of the first failure in the current outage
    outage_started: Option<u64>,
    /// The unavailable warning went out for the current outage
    outage_reported: bool,
    skip_remaining: u32,
    next_skip: u32,
}

impl<M: MetricSource> StatusReporter<M> {
    /// Acquire the display and build a reporter around it.
    pub fn start(display_config: &DisplayConfig, source: M, settings: ReporterSettings) -> Result<Self, StatusError> {
        let display = DisplayHandle::acquire(display_config)?;
        Ok(Self::new(display, source, settings))
    }

    pub fn new(display: DisplayHandle, source: M, settings: ReporterSettings) -> Self {
        let layout = StatusLayout::for_display(display.capabilities());
        debug!("Status layout {:?} for {}x{}", layout.category, layout.width, layout.height);
        Self {
            display,
            source,
            layout,
            settings,
            state: ReporterState::Starting,
            ticks: 0,
            consecutive_failures: 0,
            outage_started: None,
            outage_reported: false,
            skip_remaining: 0,
            next_skip: 1,
        }
    }

    pub fn state(&self) -> ReporterState {
        self.state
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// True while an outage has been reported and not yet recovered
    pub fn outage_reported(&self) -> bool {
        self.outage_reported
    }

    pub fn layout(&self) -> &StatusLayout {
        &self.layout
    }

    pub fn display(&self) -> &DisplayHandle {
        &self.display
    }

    pub fn tick(&mut self) -> TickOutcome {
        self.tick_at(Local::now())
    }

    /// One sample, render, push cycle stamped with `now`.
    pub fn tick_at(&mut self, now: DateTime<Local>) -> TickOutcome {
        self.ticks += 1;

        if self.skip_remaining > 0 {
            self.skip_remaining -= 1;
            debug!("Tick {} skipped, display backoff ({} more)", self.ticks, self.skip_remaining);
            return TickOutcome::Skipped;
        }

        self.state = ReporterState::Sampling;
        let snapshot = MetricSnapshot::collect(&mut self.source, now);

        self.state = ReporterState::Rendering;
        let frame = render_snapshot(&snapshot, &self.layout);

        self.state = ReporterState::Pushing;
        let pushed = self.display.write_frame(&frame).map_err(StatusError::Io);
        self.state = ReporterState::Running;

        match pushed {
            Ok(()) => {
                self.record_success();
                TickOutcome::Pushed
            }
            Err(e) => {
                error!("Tick {}: {}", self.ticks, e);
                self.record_failure();
                TickOutcome::PushFailed
            }
        }
    }

    fn record_success(&mut self) {
        if let Some(first) = self.outage_started.take() {
            if self.outage_reported {
                info!(
                    "Display on {} recovered after {} ticks",
                    self.display.bus(),
                    self.ticks - first
                );
            }
        }
        self.consecutive_failures = 0;
        self.outage_reported = false;
        self.next_skip = 1;
    }

    fn record_failure(&mut self) {
        self.consecutive_failures += 1;
        self.outage_started.get_or_insert(self.ticks);

        // a threshold of zero still warns on the first failure
        if self.consecutive_failures == self.settings.retry.warn_after.max(1) {
            self.outage_reported = true;
            warn!(
                "Display on {} appears unavailable, {} consecutive writes failed",
                self.display.bus(),
                self.consecutive_failures
            );
        }

        if self.settings.retry.mode == RetryMode::Backoff {
            self.skip_remaining = self.next_skip.min(self.settings.retry.max_skip_ticks);
            self.next_skip = self.next_skip.saturating_mul(2);
        }
    }

    /// Boot splash with a brightness fade in. Never fails startup.
    pub async fn splash(&mut self, version: &str, build_date: &str) {
        if self.settings.splash.is_zero() {
            return;
        }

        let frame = splash_frame(self.layout.width, self.layout.height, version, build_date);
        let fade = self.display.capabilities().supports_brightness;
        let target = self.settings.brightness;

        if fade {
            self.set_brightness(0);
        }
        if let Err(e) = self.display.write_frame(&frame) {
            warn!("Splash not shown: {}", e);
            if fade {
                self.set_brightness(target);
            }
            return;
        }

        let step = self.settings.splash / SPLASH_FADE_STEPS;
        for i in 1..=SPLASH_FADE_STEPS {
            if fade {
                self.set_brightness((target as u32 * i / SPLASH_FADE_STEPS) as u8);
            }
            sleep(step).await;
        }
    }

    fn set_brightness(&mut self, value: u8) {
        if let Err(e) = self.display.set_brightness(value) {
            debug!("Brightness {} not applied: {}", value, e);
        }
    }

    /// Tick until `shutdown` resolves. The first tick runs immediately.
    pub async fn run<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut shutdown = std::pin::pin!(shutdown);
        let mut pacer = Pacer::new(Instant::now(), self.settings.interval);
        self.state = ReporterState::Running;
        info!("Reporting every {:?} on {}", pacer.period(), self.display.bus());

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Reporter stopping after {} ticks", self.ticks);
                    break;
                }
                _ = sleep_until(pacer.next_deadline()) => {
                    self.tick();
                    let missed = pacer.advance(Instant::now());
                    if missed > 0 {
                        warn!("Tick {} overran, {} deadline(s) dropped", self.ticks, missed);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::drivers::mock::{MockDriver, MockDriverState};
    use crate::display::layout::LayoutCategory;
    use crate::metrics::{Metric, MetricUnavailable};
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::{Arc, Mutex};

    struct FakeMetrics;

    impl MetricSource for FakeMetrics {
        fn cpu_percent(&mut self) -> Result<f64, MetricUnavailable> { Ok(42.0) }
        fn memory_percent(&mut self) -> Result<f64, MetricUnavailable> {
            Err(MetricUnavailable::new(Metric::Memory, "no meminfo"))
        }
        fn cpu_temperature(&mut self) -> Result<f64, MetricUnavailable> { Ok(51.0) }
        fn uptime(&mut self) -> Result<Duration, MetricUnavailable> { Ok(Duration::from_secs(600)) }
        fn ip_address(&mut self) -> Result<IpAddr, MetricUnavailable> {
            Ok(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 10)))
        }
        fn hostname(&mut self) -> Result<String, MetricUnavailable> { Ok("cm5".to_string()) }
        fn battery_percent(&mut self) -> Result<f64, MetricUnavailable> { Ok(76.0) }
    }

    fn reporter(settings: ReporterSettings) -> (StatusReporter<FakeMetrics>, Arc<Mutex<MockDriverState>>) {
        let mock = MockDriver::new_with_size(128, 64).unwrap();
        let state = mock.state();
        let handle = DisplayHandle::from_driver(Box::new(mock), "mock", &DisplayConfig::default()).unwrap();
        (StatusReporter::new(handle, FakeMetrics, settings), state)
    }

    fn backoff(max_skip_ticks: u32) -> ReporterSettings {
        ReporterSettings {
            retry: RetryPolicy { mode: RetryMode::Backoff, warn_after: 3, max_skip_ticks },
            ..Default::default()
        }
    }

    #[test]
    fn test_failed_tick_keeps_previous_frame() {
        let (mut reporter, state) = reporter(ReporterSettings::default());
        state.lock().unwrap().fail_on_attempts = vec![3];
        let now = Local::now();

        assert_eq!(reporter.tick_at(now), TickOutcome::Pushed);
        assert_eq!(reporter.tick_at(now), TickOutcome::Pushed);
        let after_two = state.lock().unwrap().panel.clone().unwrap();
        assert!(!after_two.is_blank());

        assert_eq!(reporter.tick_at(now), TickOutcome::PushFailed);
        assert_eq!(state.lock().unwrap().panel.as_ref(), Some(&after_two));
        assert_eq!(reporter.consecutive_failures(), 1);

        assert_eq!(reporter.tick_at(now), TickOutcome::Pushed);
        assert_eq!(reporter.consecutive_failures(), 0);
        assert_eq!(state.lock().unwrap().frames_written, 3);
        assert_eq!(reporter.state(), ReporterState::Running);
    }

    #[test]
    fn test_zero_warn_threshold_reports_first_failure() {
        let mut settings = ReporterSettings::default();
        settings.retry.warn_after = 0;
        let (mut reporter, state) = reporter(settings);
        state.lock().unwrap().fail_on_attempts = vec![1];

        assert_eq!(reporter.tick(), TickOutcome::PushFailed);
        assert!(reporter.outage_reported());

        assert_eq!(reporter.tick(), TickOutcome::Pushed);
        assert!(!reporter.outage_reported());
    }

    #[test]
    fn test_short_outage_stays_quiet() {
        let (mut reporter, state) = reporter(ReporterSettings::default());
        state.lock().unwrap().fail_on_attempts = vec![1, 2];

        reporter.tick();
        reporter.tick();
        assert_eq!(reporter.consecutive_failures(), 2);
        assert!(!reporter.outage_reported());

        assert_eq!(reporter.tick(), TickOutcome::Pushed);
        assert!(!reporter.outage_reported());
    }

    #[test]
    fn test_quarter_turn_renders_portrait() {
        let mock = MockDriver::new_with_size(128, 64).unwrap();
        let state = mock.state();
        let config = DisplayConfig { rotate_deg: Some(90), ..Default::default() };
        let handle = DisplayHandle::from_driver(Box::new(mock), "mock", &config).unwrap();
        let mut reporter = StatusReporter::new(handle, FakeMetrics, ReporterSettings::default());

        let layout = reporter.layout();
        assert_eq!((layout.width, layout.height), (64, 128));
        assert_eq!(layout.category, LayoutCategory::Full);
        assert!(layout.bars.is_none());

        assert_eq!(reporter.tick(), TickOutcome::Pushed);
        let panel = state.lock().unwrap().panel.clone().unwrap();
        assert_eq!(panel.dimensions(), (64, 128));
        assert!(!panel.is_blank());
    }

    #[test]
    fn test_every_tick_keeps_trying() {
        let (mut reporter, state) = reporter(ReporterSettings::default());
        state.lock().unwrap().simulate_write_failure = true;

        for _ in 0..20 {
            assert_eq!(reporter.tick(), TickOutcome::PushFailed);
        }
        assert_eq!(state.lock().unwrap().write_attempts, 20);
        assert_eq!(reporter.consecutive_failures(), 20);
        assert!(reporter.outage_reported());
    }

    #[test]
    fn test_backoff_skips_grow_and_cap() {
        use TickOutcome::{PushFailed as F, Skipped as S};

        let (mut reporter, state) = reporter(backoff(3));
        state.lock().unwrap().simulate_write_failure = true;

        let outcomes: Vec<_> = (0..14).map(|_| reporter.tick()).collect();
        assert_eq!(outcomes, vec![F, S, F, S, S, F, S, S, S, F, S, S, S, F]);
        assert_eq!(state.lock().unwrap().write_attempts, 5);
    }

    #[test]
    fn test_backoff_resets_after_success() {
        let (mut reporter, state) = reporter(backoff(12));
        state.lock().unwrap().simulate_write_failure = true;

        assert_eq!(reporter.tick(), TickOutcome::PushFailed);
        assert_eq!(reporter.tick(), TickOutcome::Skipped);
        assert_eq!(reporter.tick(), TickOutcome::PushFailed);

        state.lock().unwrap().simulate_write_failure = false;
        assert_eq!(reporter.tick(), TickOutcome::Skipped);
        assert_eq!(reporter.tick(), TickOutcome::Skipped);
        assert_eq!(reporter.tick(), TickOutcome::Pushed);

        // a fresh outage starts again at one skipped tick
        state.lock().unwrap().simulate_write_failure = true;
        assert_eq!(reporter.tick(), TickOutcome::PushFailed);
        assert_eq!(reporter.tick(), TickOutcome::Skipped);
        assert_eq!(reporter.tick(), TickOutcome::PushFailed);
    }

    #[test]
    fn test_retry_policy_from_config() {
        let policy = RetryPolicy::from(&RetryConfig {
            mode: Some(RetryMode::Backoff),
            warn_after: None,
            max_skip_ticks: Some(4),
        });
        assert_eq!(policy.mode, RetryMode::Backoff);
        assert_eq!(policy.warn_after, DEFAULT_WARN_AFTER);
        assert_eq!(policy.max_skip_ticks, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_ticks_on_fixed_interval() {
        let (mut reporter, state) = reporter(ReporterSettings::default());

        // ticks at 0, 5 and 10 seconds
        reporter.run(sleep(Duration::from_secs(12))).await;
        assert_eq!(reporter.ticks(), 3);
        assert_eq!(state.lock().unwrap().frames_written, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_continues_after_failed_push() {
        let (mut reporter, state) = reporter(ReporterSettings::default());
        state.lock().unwrap().fail_on_attempts = vec![1];

        reporter.run(sleep(Duration::from_secs(7))).await;
        let state = state.lock().unwrap();
        assert_eq!(state.write_attempts, 2);
        assert_eq!(state.frames_written, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_splash_fades_in_and_tolerates_failure() {
        let (mut reporter, state) = reporter(ReporterSettings { brightness: 200, ..Default::default() });

        reporter.splash("0.1.0", "2026-01-01 00:00 UTC").await;
        {
            let state = state.lock().unwrap();
            assert_eq!(state.last_brightness, Some(200));
            assert!(!state.panel.as_ref().unwrap().is_blank());
        }

        state.lock().unwrap().simulate_write_failure = true;
        reporter.splash("0.1.0", "2026-01-01 00:00 UTC").await;
        assert_eq!(state.lock().unwrap().last_brightness, Some(200));
        assert_eq!(reporter.state(), ReporterState::Starting);
    }
}
