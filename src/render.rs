/*
 *  render.rs
 *
 *  OLEDStat - always on, always up
 *  (c) 2020-26 Stuart Hunter
 *
 *  Snapshot to frame rendering, and the boot splash
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

use embedded_graphics::{
    mono_font::{MonoFont, MonoTextStyle},
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{Line, PrimitiveStyle, Rectangle},
    text::{Alignment, Baseline, Text, TextStyleBuilder},
};
use std::time::Duration;

use crate::display::framebuffer::Frame;
use crate::display::layout::{BarLayout, FontSize, RowKind, StatusLayout};
use crate::metrics::MetricSnapshot;

pub const PLACEHOLDER: &str = "N/A";

/// Battery glyph body, the tip adds one column on the right
const BATTERY_BODY: Size = Size::new(12, 7);
const BATTERY_GAP: i32 = 3;

/// Text for one metric row, e.g. `CPU: 42%`
pub fn status_line(kind: RowKind, snapshot: &MetricSnapshot) -> String {
    let value = match kind {
        RowKind::Cpu => snapshot.cpu_percent.map(format_percent),
        RowKind::Memory => snapshot.memory_percent.map(format_percent),
        RowKind::Temperature => snapshot.cpu_temp_c.map(|t| format!("{:.1}C", t)),
        RowKind::IpAddress => snapshot.ip_address.map(|ip| ip.to_string()),
        RowKind::Uptime => snapshot.uptime.map(format_uptime),
    };
    format!("{}: {}", kind.label(), value.as_deref().unwrap_or(PLACEHOLDER))
}

/// Row texts in layout order
pub fn status_lines(snapshot: &MetricSnapshot, layout: &StatusLayout) -> Vec<String> {
    layout.rows.iter().map(|row| status_line(row.kind, snapshot)).collect()
}

/// Clamped to 0..=100 and rounded
pub fn percent_value(value: f64) -> u32 {
    value.clamp(0.0, 100.0).round() as u32
}

fn format_percent(value: f64) -> String {
    format!("{}%", percent_value(value))
}

/// `3d 04:12`, or `04:12` under a day
pub fn format_uptime(uptime: Duration) -> String {
    let secs = uptime.as_secs();
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3_600;
    let minutes = (secs % 3_600) / 60;
    if days > 0 {
        format!("{}d {:02}:{:02}", days, hours, minutes)
    } else {
        format!("{:02}:{:02}", hours, minutes)
    }
}

/// Draw a fresh frame for the snapshot
pub fn render_snapshot(snapshot: &MetricSnapshot, layout: &StatusLayout) -> Frame {
    let mut frame = Frame::new(layout.width, layout.height);
    match draw_status(&mut frame, snapshot, layout) {
        Ok(()) => frame,
        Err(never) => match never {},
    }
}

pub fn draw_status<D>(
    target: &mut D,
    snapshot: &MetricSnapshot,
    layout: &StatusLayout,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor> + OriginDimensions,
{
    if let Some(header) = &layout.header {
        let font = header.font.font();
        let clock = snapshot.taken_at.format("%H:%M").to_string();
        let clock_width = clock.len() as u32 * header.font.char_width();
        let clock_x = layout.width.saturating_sub(clock_width) as i32;

        // battery sits left of the clock, only when there is one to show
        let battery_x = clock_x - BATTERY_GAP - 1 - BATTERY_BODY.width as i32;
        let host_limit = match snapshot.battery_percent {
            Some(charge) if battery_x >= 0 => {
                draw_battery(target, Point::new(battery_x, 1), percent_value(charge))?;
                battery_x
            }
            _ => clock_x,
        };

        // hostname gets whatever is left, less one cell
        let host_chars = (host_limit as u32 / header.font.char_width()).saturating_sub(1) as usize;
        let host = snapshot.hostname.as_deref().unwrap_or(PLACEHOLDER);
        let host: String = host.chars().take(host_chars).collect();

        draw_text(target, &host, Point::new(0, 0), font)?;
        draw_text(target, &clock, Point::new(clock_x, 0), font)?;

        Line::new(Point::new(0, header.rule_y), Point::new(layout.width as i32 - 1, header.rule_y))
            .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
            .draw(target)?;
    }

    let font = layout.row_font.font();
    for row in &layout.rows {
        draw_text(target, &status_line(row.kind, snapshot), row.origin, font)?;

        let Some(bar) = layout.bars.filter(|_| row.kind.has_bar()) else { continue };
        let value = match row.kind {
            RowKind::Cpu => snapshot.cpu_percent,
            RowKind::Memory => snapshot.memory_percent,
            _ => None,
        };
        if let Some(value) = value {
            draw_bar(target, bar, row.origin.y + 1, percent_value(value))?;
        }
    }
    Ok(())
}

/// Outlined bar filled left to right
fn draw_bar<D>(target: &mut D, bar: BarLayout, y: i32, percent: u32) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor> + OriginDimensions,
{
    Rectangle::new(Point::new(bar.x, y), Size::new(bar.width, bar.height))
        .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
        .draw(target)?;

    let inner = bar.width.saturating_sub(2);
    let fill = inner * percent.min(100) / 100;
    if fill > 0 {
        Rectangle::new(Point::new(bar.x + 1, y + 1), Size::new(fill, bar.height.saturating_sub(2)))
            .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
            .draw(target)?;
    }
    Ok(())
}

/// Outline with a tip, filled in proportion to the charge
fn draw_battery<D>(target: &mut D, origin: Point, percent: u32) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor> + OriginDimensions,
{
    Rectangle::new(origin, BATTERY_BODY)
        .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
        .draw(target)?;

    let tip_x = origin.x + BATTERY_BODY.width as i32;
    let tip_y = origin.y + 2;
    Line::new(Point::new(tip_x, tip_y), Point::new(tip_x, tip_y + BATTERY_BODY.height as i32 - 5))
        .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
        .draw(target)?;

    let fill = (BATTERY_BODY.width - 2) * percent.min(100) / 100;
    if fill > 0 {
        Rectangle::new(origin + Point::new(1, 1), Size::new(fill, BATTERY_BODY.height - 2))
            .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
            .draw(target)?;
    }
    Ok(())
}

fn draw_text<D>(target: &mut D, text: &str, origin: Point, font: &MonoFont) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor> + OriginDimensions,
{
    Text::with_baseline(text, origin, MonoTextStyle::new(font, BinaryColor::On), Baseline::Top)
        .draw(target)?;
    Ok(())
}

/// Boot splash: name, version, build date and "Booting..." centred
pub fn splash_frame(width: u32, height: u32, version: &str, build_date: &str) -> Frame {
    let mut frame = Frame::new(width, height);
    match draw_splash(&mut frame, version, build_date) {
        Ok(()) => frame,
        Err(never) => match never {},
    }
}

fn draw_splash<D>(target: &mut D, version: &str, build_date: &str) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor> + OriginDimensions,
{
    let size = target.size();
    let centre = (size.width / 2) as i32;
    let centred = TextStyleBuilder::new()
        .alignment(Alignment::Center)
        .baseline(Baseline::Top)
        .build();

    let title = format!("OLEDStat v{}", version);
    let (title_font, lines): (FontSize, Vec<&str>) = if size.height >= 64 {
        (FontSize::Medium, vec![build_date, "", "Booting..."])
    } else {
        (FontSize::Small, vec![build_date, "Booting..."])
    };

    let mut y = if size.height >= 64 { 8 } else { 2 };
    Text::with_text_style(
        &title,
        Point::new(centre, y),
        MonoTextStyle::new(title_font.font(), BinaryColor::On),
        centred,
    )
    .draw(target)?;
    y += title_font.line_height() as i32 + 2;

    let small = MonoTextStyle::new(FontSize::Small.font(), BinaryColor::On);
    for line in lines {
        if !line.is_empty() {
            Text::with_text_style(line, Point::new(centre, y), small, centred).draw(target)?;
        }
        y += FontSize::Small.line_height() as i32 + 2;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};
    use std::net::{IpAddr, Ipv4Addr};

    fn snapshot() -> MetricSnapshot {
        MetricSnapshot {
            taken_at: Local.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap(),
            cpu_percent: Some(42.0),
            memory_percent: None,
            cpu_temp_c: Some(48.2),
            uptime: Some(Duration::from_secs(3 * 86_400 + 4 * 3_600 + 12 * 60 + 59)),
            ip_address: Some(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 10))),
            hostname: Some("orangepicm5".to_string()),
            battery_percent: None,
        }
    }

    fn lit_rows(frame: &Frame, top: u32, bottom: u32) -> usize {
        (top..bottom)
            .flat_map(|y| (0..frame.width()).map(move |x| (x, y)))
            .filter(|&(x, y)| frame.pixel(x, y) == Some(BinaryColor::On))
            .count()
    }

    #[test]
    fn test_scenario_lines() {
        let layout = StatusLayout::for_size(128, 32);
        let lines = status_lines(&snapshot(), &layout);
        assert_eq!(lines, vec!["CPU: 42%", "MEM: N/A", "IP: 192.168.1.10", "UP: 3d 04:12"]);
    }

    #[test]
    fn test_full_layout_lines() {
        let layout = StatusLayout::for_size(128, 64);
        let lines = status_lines(&snapshot(), &layout);
        assert_eq!(lines[2], "TMP: 48.2C");
        assert_eq!(lines.len(), 5);
    }

    #[test]
    fn test_percent_is_clamped_and_rounded() {
        assert_eq!(percent_value(41.6), 42);
        assert_eq!(percent_value(-3.0), 0);
        assert_eq!(percent_value(180.0), 100);
        assert_eq!(percent_value(f64::NAN), 0);
    }

    #[test]
    fn test_uptime_format() {
        assert_eq!(format_uptime(Duration::from_secs(4 * 3_600 + 12 * 60)), "04:12");
        assert_eq!(format_uptime(Duration::from_secs(59)), "00:00");
        assert_eq!(format_uptime(Duration::from_secs(86_400)), "1d 00:00");
    }

    #[test]
    fn test_partial_failure_still_draws_every_row() {
        let mut snap = snapshot();
        snap.cpu_percent = None;
        snap.ip_address = None;
        snap.hostname = None;

        let layout = StatusLayout::for_size(128, 64);
        let frame = render_snapshot(&snap, &layout);
        assert_eq!(frame.dimensions(), (128, 64));

        assert!(lit_rows(&frame, 0, 10) > 0, "header missing");
        for row in &layout.rows {
            let top = row.origin.y as u32;
            assert!(lit_rows(&frame, top, top + 8) > 0, "{:?} row is empty", row.kind);
        }
    }

    #[test]
    fn test_bar_only_for_known_values() {
        let layout = StatusLayout::for_size(128, 64);
        let bar = layout.bars.unwrap();
        let frame = render_snapshot(&snapshot(), &layout);

        let cpu_y = layout.rows[0].origin.y as u32 + 1;
        let mem_y = layout.rows[1].origin.y as u32 + 1;
        assert_eq!(frame.pixel(bar.x as u32, cpu_y), Some(BinaryColor::On));
        assert_eq!(frame.pixel(bar.x as u32, mem_y), Some(BinaryColor::Off));
    }

    #[test]
    fn test_battery_glyph_only_with_a_battery() {
        let layout = StatusLayout::for_size(128, 64);
        // clock "09:26" starts at x=98, glyph body spans 82..94, tip at 94
        let body = |frame: &Frame, x: u32| frame.pixel(x, 1) == Some(BinaryColor::On);

        let frame = render_snapshot(&snapshot(), &layout);
        assert!(!body(&frame, 82));

        let mut snap = snapshot();
        snap.battery_percent = Some(50.0);
        let frame = render_snapshot(&snap, &layout);
        assert!(body(&frame, 82) && body(&frame, 93));
        assert_eq!(frame.pixel(94, 3), Some(BinaryColor::On));

        // half charge fills 5 of the 10 inner columns
        assert_eq!(frame.pixel(87, 4), Some(BinaryColor::On));
        assert_eq!(frame.pixel(88, 4), Some(BinaryColor::Off));

        // the hostname gives way: 82 / 6 - 1 = 12 cells, nothing in the gap
        assert!((72..82).all(|x| (0..10).all(|y| frame.pixel(x, y) == Some(BinaryColor::Off))));
    }

    #[test]
    fn test_splash_is_not_blank() {
        for (w, h) in [(128, 64), (128, 32)] {
            let frame = splash_frame(w, h, "0.1.0", "2026-03-14 09:26 UTC");
            assert!(!frame.is_blank());
        }
    }
}
