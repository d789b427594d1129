/*
 *  metrics.rs
 *
 *  OLEDStat - always on, always up
 *  (c) 2020-26 Stuart Hunter
 *
 *  Host metrics from /proc and /sys, one independently fallible read each
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
//! Gathering host metrics from /proc and /sys files.

use chrono::{DateTime, Local};
use log::debug;
use std::fmt;
use std::fs;
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::config::MetricsConfig;

/// Which reading failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Cpu,
    Memory,
    Temperature,
    Uptime,
    IpAddress,
    Hostname,
    Battery,
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Metric::Cpu => "cpu load",
            Metric::Memory => "memory usage",
            Metric::Temperature => "cpu temperature",
            Metric::Uptime => "uptime",
            Metric::IpAddress => "ip address",
            Metric::Hostname => "hostname",
            Metric::Battery => "battery",
        };
        f.write_str(name)
    }
}

/// One metric could not be read this tick.
#[derive(Debug, Error)]
#[error("{metric} unavailable: {reason}")]
pub struct MetricUnavailable {
    pub metric: Metric,
    pub reason: String,
}

impl MetricUnavailable {
    pub fn new(metric: Metric, reason: impl fmt::Display) -> Self {
        Self { metric, reason: reason.to_string() }
    }
}

/// Host metrics collaborator. Each accessor stands alone so one failing
/// source never hides the others.
pub trait MetricSource {
    /// CPU busy time since the previous call, percent
    fn cpu_percent(&mut self) -> Result<f64, MetricUnavailable>;
    /// Memory in use, percent of total
    fn memory_percent(&mut self) -> Result<f64, MetricUnavailable>;
    /// Degrees Celsius
    fn cpu_temperature(&mut self) -> Result<f64, MetricUnavailable>;
    fn uptime(&mut self) -> Result<Duration, MetricUnavailable>;
    fn ip_address(&mut self) -> Result<IpAddr, MetricUnavailable>;
    fn hostname(&mut self) -> Result<String, MetricUnavailable>;
    /// Charge of the first battery, percent. Boards without one report
    /// unavailable every time.
    fn battery_percent(&mut self) -> Result<f64, MetricUnavailable>;
}

/// The values read at one tick. `None` means the read failed.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSnapshot {
    pub taken_at: DateTime<Local>,
    pub cpu_percent: Option<f64>,
    pub memory_percent: Option<f64>,
    pub cpu_temp_c: Option<f64>,
    pub uptime: Option<Duration>,
    pub ip_address: Option<IpAddr>,
    pub hostname: Option<String>,
    pub battery_percent: Option<f64>,
}

impl MetricSnapshot {
    /// Query every metric once; failures are logged and left empty.
    pub fn collect<M: MetricSource + ?Sized>(source: &mut M, taken_at: DateTime<Local>) -> Self {
        Self {
            taken_at,
            cpu_percent: reading(source.cpu_percent()),
            memory_percent: reading(source.memory_percent()),
            cpu_temp_c: reading(source.cpu_temperature()),
            uptime: reading(source.uptime()),
            ip_address: reading(source.ip_address()),
            hostname: reading(source.hostname()),
            battery_percent: reading(source.battery_percent()),
        }
    }
}

fn reading<T>(result: Result<T, MetricUnavailable>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            debug!("{}", e);
            None
        }
    }
}

/// Aggregate jiffies from the `cpu` line of /proc/stat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct CpuTimes {
    idle: u64,
    total: u64,
}

/// Linux metrics read straight from procfs/sysfs.
pub struct ProcMetrics {
    root: PathBuf,
    thermal_zone: u32,
    interface: Option<String>,
    last_cpu: Option<CpuTimes>,
}

impl ProcMetrics {
    pub fn new(config: &MetricsConfig) -> Self {
        Self {
            root: config.root.clone().unwrap_or_else(|| PathBuf::from("/")),
            thermal_zone: config.thermal_zone.unwrap_or(0),
            interface: config.interface.clone(),
            last_cpu: None,
        }
    }

    fn read(&self, metric: Metric, relative: &str) -> Result<String, MetricUnavailable> {
        let path = self.root.join(relative);
        fs::read_to_string(&path)
            .map_err(|e| MetricUnavailable::new(metric, format!("{}: {}", path.display(), e)))
    }

    /// Reads the first float value from a given file.
    fn read_first_float(&self, metric: Metric, relative: &str) -> Result<f64, MetricUnavailable> {
        let content = self.read(metric, relative)?;
        let first_word = content.split_whitespace().next()
            .ok_or_else(|| MetricUnavailable::new(metric, format!("{} is empty", relative)))?;
        first_word.parse::<f64>()
            .map_err(|e| MetricUnavailable::new(metric, format!("{}: {}", relative, e)))
    }
}

impl MetricSource for ProcMetrics {
    fn cpu_percent(&mut self) -> Result<f64, MetricUnavailable> {
        let stat = self.read(Metric::Cpu, "proc/stat")?;
        let now = parse_cpu_times(&stat)
            .ok_or_else(|| MetricUnavailable::new(Metric::Cpu, "no aggregate cpu line in /proc/stat"))?;

        // the first reading (or a counter that did not move) falls back to
        // the since-boot ratio
        let busy = self.last_cpu
            .and_then(|prev| busy_percent(prev, now))
            .or_else(|| busy_percent(CpuTimes::default(), now));
        self.last_cpu = Some(now);

        busy.ok_or_else(|| MetricUnavailable::new(Metric::Cpu, "no cpu time accounted"))
    }

    fn memory_percent(&mut self) -> Result<f64, MetricUnavailable> {
        let meminfo = self.read(Metric::Memory, "proc/meminfo")?;
        parse_meminfo_used_percent(&meminfo)
            .ok_or_else(|| MetricUnavailable::new(Metric::Memory, "MemTotal missing from /proc/meminfo"))
    }

    fn cpu_temperature(&mut self) -> Result<f64, MetricUnavailable> {
        let zone = format!("sys/class/thermal/thermal_zone{}/temp", self.thermal_zone);
        // The value is in millidegrees Celsius.
        Ok(self.read_first_float(Metric::Temperature, &zone)? / 1000.0)
    }

    fn uptime(&mut self) -> Result<Duration, MetricUnavailable> {
        let seconds = self.read_first_float(Metric::Uptime, "proc/uptime")?;
        Duration::try_from_secs_f64(seconds).map_err(|e| MetricUnavailable::new(Metric::Uptime, e))
    }

    fn ip_address(&mut self) -> Result<IpAddr, MetricUnavailable> {
        match self.interface.as_deref() {
            Some(name) => {
                let interfaces = local_ip_address::list_afinet_netifas()
                    .map_err(|e| MetricUnavailable::new(Metric::IpAddress, e))?;
                pick_interface_address(name, &interfaces)
                    .ok_or_else(|| MetricUnavailable::new(Metric::IpAddress, format!("no address on {}", name)))
            }
            None => local_ip_address::local_ip().map_err(|e| MetricUnavailable::new(Metric::IpAddress, e)),
        }
    }

    fn hostname(&mut self) -> Result<String, MetricUnavailable> {
        let name = self.read(Metric::Hostname, "proc/sys/kernel/hostname")?;
        let name = name.trim();
        if name.is_empty() {
            return Err(MetricUnavailable::new(Metric::Hostname, "hostname is empty"));
        }
        Ok(name.to_string())
    }

    fn battery_percent(&mut self) -> Result<f64, MetricUnavailable> {
        let supplies = self.root.join("sys/class/power_supply");
        let entries = fs::read_dir(&supplies)
            .map_err(|e| MetricUnavailable::new(Metric::Battery, format!("{}: {}", supplies.display(), e)))?;

        let mut batteries: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| name.starts_with("BAT"))
            .collect();
        batteries.sort();

        batteries.iter()
            .find_map(|name| {
                let capacity = format!("sys/class/power_supply/{}/capacity", name);
                self.read_first_float(Metric::Battery, &capacity).ok()
            })
            .ok_or_else(|| MetricUnavailable::new(Metric::Battery, "no BAT* power supply"))
    }
}

fn parse_cpu_times(stat: &str) -> Option<CpuTimes> {
    let line = stat.lines().find(|l| l.starts_with("cpu "))?;
    // user nice system idle iowait irq softirq steal; guest time is already
    // folded into user/nice
    let fields = line.split_whitespace()
        .skip(1)
        .take(8)
        .map(|f| f.parse::<u64>().ok())
        .collect::<Option<Vec<u64>>>()?;
    if fields.len() < 4 {
        return None;
    }
    let idle = fields[3] + fields.get(4).copied().unwrap_or(0);
    Some(CpuTimes { idle, total: fields.iter().sum() })
}

fn busy_percent(prev: CpuTimes, now: CpuTimes) -> Option<f64> {
    let total = now.total.checked_sub(prev.total)?;
    let idle = now.idle.checked_sub(prev.idle)?;
    if total == 0 {
        return None;
    }
    Some(100.0 * total.saturating_sub(idle) as f64 / total as f64)
}

fn parse_meminfo_used_percent(meminfo: &str) -> Option<f64> {
    let field = |key: &str| -> Option<u64> {
        meminfo.lines()
            .find_map(|l| l.strip_prefix(key)?.strip_prefix(':'))
            .and_then(|rest| rest.split_whitespace().next())
            .and_then(|v| v.parse().ok())
    };

    let total = field("MemTotal").filter(|&t| t > 0)?;
    // kernels before 3.14 have no MemAvailable
    let available = field("MemAvailable").unwrap_or_else(|| {
        field("MemFree").unwrap_or(0) + field("Buffers").unwrap_or(0) + field("Cached").unwrap_or(0)
    });
    Some(100.0 * total.saturating_sub(available) as f64 / total as f64)
}

/// IPv4 first, then whatever else the interface carries.
fn pick_interface_address(name: &str, interfaces: &[(String, IpAddr)]) -> Option<IpAddr> {
    let mut on_interface = interfaces.iter().filter(|(n, _)| n == name).map(|(_, ip)| *ip);
    let first = on_interface.next()?;
    if first.is_ipv4() {
        return Some(first);
    }
    Some(on_interface.find(|ip| ip.is_ipv4()).unwrap_or(first))
}
