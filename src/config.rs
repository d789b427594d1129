/*
 *  config.rs
 *
 *  OLEDStat - always on, always up
 *  (c) 2020-26 Stuart Hunter
 *
 *  Layered configuration: defaults, YAML file, environment and CLI
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

use clap::{ArgAction, Parser, ValueEnum, ValueHint};
use dirs_next::home_dir;
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}, time::Duration};
use thiserror::Error;

pub const DEFAULT_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_SPLASH_SECS: u64 = 2;
pub const DEFAULT_I2C_BUS: &str = "/dev/i2c-1";
pub const DEFAULT_I2C_ADDRESS: u8 = 0x3C;
pub const DEFAULT_WIDTH: u32 = 128;
pub const DEFAULT_HEIGHT: u32 = 64;
pub const DEFAULT_BRIGHTNESS: u8 = 255;
pub const DEFAULT_WARN_AFTER: u32 = 3;
pub const DEFAULT_MAX_SKIP_TICKS: u32 = 12;

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Top-level app configuration. Every field is optional so files and
/// overrides can be layered; the accessors below supply the defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub log_level: Option<String>,     // e.g., "info" | "debug"
    pub interval_secs: Option<u64>,    // seconds between ticks
    pub splash_secs: Option<u64>,      // 0 disables the splash frame
    pub display: Option<DisplayConfig>,
    pub metrics: Option<MetricsConfig>,
    pub retry: Option<RetryConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DisplayConfig {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub rotate_deg: Option<u16>,
    pub invert: Option<bool>,
    pub brightness: Option<u8>,     // 0-255
    pub driver: Option<DriverKind>,
    pub bus: Option<BusConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MetricsConfig {
    /// Report the address of this interface instead of the default route's
    pub interface: Option<String>,
    pub thermal_zone: Option<u32>,
    /// Filesystem root for /proc and /sys lookups
    pub root: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RetryConfig {
    pub mode: Option<RetryMode>,
    pub warn_after: Option<u32>,
    pub max_skip_ticks: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BusConfig {
    I2c {
        bus: String,        // e.g. "/dev/i2c-1", or just "1"
        address: u8,        // e.g. 0x3C (I2C addresses are 7-bit, stored in u8)
        speed_hz: Option<u32>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    Ssd1306,
    /// In-memory panel, frames are logged at trace level
    Mock,
}

/// What to do while the panel keeps rejecting frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum RetryMode {
    EveryTick,
    Backoff,
}

/// CLI overrides. All fields are Options so we can layer them over YAML.
#[derive(Debug, Parser, Clone)]
#[command(name = "oledstat", version, about = "OLEDStat - host status on a small OLED panel")]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(long, short = 'c', env = "OLEDSTAT_CONFIG", value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    #[arg(long, env = "OLEDSTAT_LOG_LEVEL")]
    pub log_level: Option<String>,
    /// Enable debug log level
    #[arg(long, short = 'v', alias = "verbose", action = ArgAction::SetTrue)]
    pub debug: bool,
    /// Seconds between display updates
    #[arg(long, short = 'i', env = "OLEDSTAT_INTERVAL_SECS")]
    pub interval_secs: Option<u64>,
    #[arg(long, env = "OLEDSTAT_DRIVER", value_enum)]
    pub driver: Option<DriverKind>,
    /// I2C bus device path or number (e.g. /dev/i2c-5 or 5)
    #[arg(long, env = "OLEDSTAT_I2C_BUS")]
    pub i2c_bus: Option<String>,
    /// 7-bit I2C address, decimal or 0x-prefixed hex
    #[arg(long, env = "OLEDSTAT_I2C_ADDRESS", value_parser = parse_i2c_address)]
    pub i2c_address: Option<u8>,
    #[arg(long)]
    pub display_width: Option<u32>,
    #[arg(long)]
    pub display_height: Option<u32>,
    #[arg(long)]
    pub display_rotate_deg: Option<u16>,
    #[arg(long, action = ArgAction::Set)]
    pub display_invert: Option<bool>,
    #[arg(long)]
    pub brightness: Option<u8>,
    /// Network interface whose address is shown
    #[arg(long)]
    pub interface: Option<String>,
    #[arg(long, value_enum)]
    pub retry: Option<RetryMode>,
    /// Skip splash screen (shown by default)
    #[arg(long, action = ArgAction::SetTrue)]
    pub no_splash: bool,
    /// dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
}

impl Config {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.unwrap_or(DEFAULT_INTERVAL_SECS))
    }

    pub fn splash(&self) -> Duration {
        Duration::from_secs(self.splash_secs.unwrap_or(DEFAULT_SPLASH_SECS))
    }

    pub fn display_config(&self) -> DisplayConfig {
        self.display.clone().unwrap_or_default()
    }

    pub fn metrics_config(&self) -> MetricsConfig {
        self.metrics.clone().unwrap_or_default()
    }

    pub fn retry_config(&self) -> RetryConfig {
        self.retry.clone().unwrap_or_default()
    }
}

impl DisplayConfig {
    pub fn driver_kind(&self) -> DriverKind {
        self.driver.unwrap_or(DriverKind::Ssd1306)
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width.unwrap_or(DEFAULT_WIDTH), self.height.unwrap_or(DEFAULT_HEIGHT))
    }

    /// Resolved (device path, address) for the I2C panel.
    pub fn i2c_target(&self) -> (String, u8) {
        match &self.bus {
            Some(BusConfig::I2c { bus, address, .. }) => (normalize_bus(bus), *address),
            None => (DEFAULT_I2C_BUS.to_string(), DEFAULT_I2C_ADDRESS),
        }
    }

    /// Human readable bus identifier used in logs and errors.
    pub fn bus_label(&self) -> String {
        match self.driver_kind() {
            DriverKind::Mock => "mock".to_string(),
            DriverKind::Ssd1306 => {
                let (bus, address) = self.i2c_target();
                format!("{}@0x{:02X}", bus, address)
            }
        }
    }
}

/// Public entry point: read YAML, merge CLI/env overrides, validate.
pub fn load(cli: &Cli) -> Result<Config, ConfigError> {
    // 1) defaults (from `Default` impl)
    let mut cfg = Config::default();

    // 2) YAML file (explicit path or search)
    if let Some(p) = cli.config.as_ref() {
        if p.exists() {
            let y = read_yaml(p)?;
            merge(&mut cfg, y);
        } else {
            return Err(ConfigError::Validation(format!(
                "Config file not found: {}",
                p.display()
            )));
        }
    } else if let Some(p) = find_config_file() {
        let y = read_yaml(&p)?;
        merge(&mut cfg, y);
    }

    // 3) CLI / environment overrides (highest precedence)
    apply_cli_overrides(&mut cfg, cli);

    // 4) Validate
    validate(&cfg)?;

    Ok(cfg)
}

/// Pretty YAML of the effective config, for `--dump-config`.
pub fn dump(cfg: &Config) -> Result<String, ConfigError> {
    Ok(serde_yaml::to_string(cfg)?)
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    // XDG-style: ~/.config/oledstat/config.yaml
    if let Some(home) = home_dir() {
        let p = home.join(".config/oledstat/config.yaml");
        if p.exists() { return Some(p) }
        let p = home.join(".config/oledstat.yaml");
        if p.exists() { return Some(p) }
    }
    for candidate in &["/etc/oledstat/config.yaml", "oledstat.yaml"] {
        let p = PathBuf::from(candidate);
        if p.exists() { return Some(p) }
    }
    None
}

fn read_yaml(path: &Path) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&s)?;
    Ok(cfg)
}

/// Shallow merge `src` into `dst`, Option-by-Option.
fn merge(dst: &mut Config, src: Config) {
    if src.log_level.is_some()      { dst.log_level = src.log_level; }
    if src.interval_secs.is_some()  { dst.interval_secs = src.interval_secs; }
    if src.splash_secs.is_some()    { dst.splash_secs = src.splash_secs; }
    match (&mut dst.display, src.display) {
        (None, Some(c)) => dst.display = Some(c),
        (Some(d), Some(s)) => merge_display(d, s),
        _ => {}
    }
    match (&mut dst.metrics, src.metrics) {
        (None, Some(c)) => dst.metrics = Some(c),
        (Some(d), Some(s)) => {
            if s.interface.is_some()    { d.interface = s.interface; }
            if s.thermal_zone.is_some() { d.thermal_zone = s.thermal_zone; }
            if s.root.is_some()         { d.root = s.root; }
        }
        _ => {}
    }
    match (&mut dst.retry, src.retry) {
        (None, Some(c)) => dst.retry = Some(c),
        (Some(d), Some(s)) => {
            if s.mode.is_some()           { d.mode = s.mode; }
            if s.warn_after.is_some()     { d.warn_after = s.warn_after; }
            if s.max_skip_ticks.is_some() { d.max_skip_ticks = s.max_skip_ticks; }
        }
        _ => {}
    }
}

fn merge_display(dst: &mut DisplayConfig, src: DisplayConfig) {
    if src.width.is_some()       { dst.width = src.width; }
    if src.height.is_some()      { dst.height = src.height; }
    if src.rotate_deg.is_some()  { dst.rotate_deg = src.rotate_deg; }
    if src.invert.is_some()      { dst.invert = src.invert; }
    if src.brightness.is_some()  { dst.brightness = src.brightness; }
    if src.driver.is_some()      { dst.driver = src.driver; }
    if src.bus.is_some()         { dst.bus = src.bus; }
}

fn apply_cli_overrides(cfg: &mut Config, cli: &Cli) {
    if cli.log_level.is_some()       { cfg.log_level = cli.log_level.clone(); }
    if cli.debug                     { cfg.log_level = Some("debug".to_string()); }
    if cli.interval_secs.is_some()   { cfg.interval_secs = cli.interval_secs; }
    if cli.no_splash                 { cfg.splash_secs = Some(0); }

    let display = cfg.display.get_or_insert_with(DisplayConfig::default);
    if cli.driver.is_some()              { display.driver = cli.driver; }
    if cli.display_width.is_some()       { display.width = cli.display_width; }
    if cli.display_height.is_some()      { display.height = cli.display_height; }
    if cli.display_rotate_deg.is_some()  { display.rotate_deg = cli.display_rotate_deg; }
    if cli.display_invert.is_some()      { display.invert = cli.display_invert; }
    if cli.brightness.is_some()          { display.brightness = cli.brightness; }

    if cli.i2c_bus.is_some() || cli.i2c_address.is_some() {
        let (mut bus, mut address, mut speed) = (DEFAULT_I2C_BUS.to_string(), DEFAULT_I2C_ADDRESS, None);
        if let Some(BusConfig::I2c { bus: b, address: a, speed_hz }) = display.bus.take() {
            bus = b;
            address = a;
            speed = speed_hz;
        }
        if let Some(b) = cli.i2c_bus.as_ref() { bus = b.clone(); }
        if let Some(a) = cli.i2c_address      { address = a; }
        display.bus = Some(BusConfig::I2c { bus, address, speed_hz: speed });
    }
    if let Some(BusConfig::I2c { bus, .. }) = display.bus.as_mut() {
        *bus = normalize_bus(bus);
    }

    if cli.interface.is_some() {
        cfg.metrics.get_or_insert_with(MetricsConfig::default).interface = cli.interface.clone();
    }
    if cli.retry.is_some() {
        cfg.retry.get_or_insert_with(RetryConfig::default).mode = cli.retry;
    }
}

/// Put any invariants here (required fields, ranges, etc.)
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.interval_secs == Some(0) {
        return Err(ConfigError::Validation("interval_secs must be > 0".into()));
    }
    if let Some(display) = cfg.display.as_ref() {
        let (w, h) = display.size();
        if w == 0 || h == 0 {
            return Err(ConfigError::Validation("display width/height must be > 0".into()));
        }
        if let Some(rot) = display.rotate_deg {
            match rot {
                0 | 90 | 180 | 270 => {},
                _ => return Err(ConfigError::Validation("display rotate_deg must be 0|90|180|270".into()))
            }
        }
        if let Some(BusConfig::I2c { bus, address, .. }) = display.bus.as_ref() {
            if bus.trim().is_empty() {
                return Err(ConfigError::Validation("i2c bus must not be empty".into()));
            }
            check_i2c_address(*address).map_err(ConfigError::Validation)?;
        }
    }
    Ok(())
}

/// Accept a bare bus number as shorthand for its device node.
pub fn normalize_bus(bus: &str) -> String {
    let bus = bus.trim();
    if !bus.is_empty() && bus.chars().all(|c| c.is_ascii_digit()) {
        format!("/dev/i2c-{}", bus)
    } else {
        bus.to_string()
    }
}

/// clap value parser for `--i2c-address`.
pub fn parse_i2c_address(s: &str) -> Result<u8, String> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse::<u8>(),
    };
    let address = parsed.map_err(|e| format!("invalid I2C address '{}': {}", s, e))?;
    check_i2c_address(address)?;
    Ok(address)
}

// 0x00-0x02 and 0x78-0x7F are reserved by the I2C spec
fn check_i2c_address(address: u8) -> Result<(), String> {
    if (0x03..=0x77).contains(&address) {
        Ok(())
    } else {
        Err(format!("I2C address 0x{:02X} outside 7-bit range 0x03..=0x77", address))
    }
}
