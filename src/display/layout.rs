/*
 *  display/layout.rs
 *
 *  OLEDStat - always on, always up
 *  (c) 2020-26 Stuart Hunter
 *
 *  Fixed text positions per panel size
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

use embedded_graphics::mono_font::{
    ascii::{FONT_5X8, FONT_6X10},
    MonoFont,
};
use embedded_graphics::prelude::*;

use crate::display::traits::DisplayCapabilities;

/// Layout configuration for the status screen
///
/// Chosen once from the panel geometry; every tick draws into the same
/// positions.
#[derive(Debug, Clone)]
pub struct StatusLayout {
    /// Display width in pixels
    pub width: u32,

    /// Display height in pixels
    pub height: u32,

    /// Layout category (determines which preset to use)
    pub category: LayoutCategory,

    /// Hostname and clock row, full layout only
    pub header: Option<HeaderLayout>,

    /// Metric rows, top to bottom
    pub rows: Vec<StatusRow>,

    /// Font for metric rows
    pub row_font: FontSize,

    /// Usage bars next to CPU and MEM
    pub bars: Option<BarLayout>,
}

/// Layout category based on panel height
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutCategory {
    /// 64 rows or more: header, rule, five metric rows, bars
    Full,

    /// 32 row strips: four metric rows only
    Compact,
}

/// Header row configuration
#[derive(Debug, Clone)]
pub struct HeaderLayout {
    pub font: FontSize,

    /// Y of the separator rule under the header
    pub rule_y: i32,
}

/// Horizontal usage bar geometry
#[derive(Debug, Clone, Copy)]
pub struct BarLayout {
    pub x: i32,
    pub width: u32,
    pub height: u32,
}

/// What a row shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Cpu,
    Memory,
    Temperature,
    IpAddress,
    Uptime,
}

impl RowKind {
    pub fn label(&self) -> &'static str {
        match self {
            RowKind::Cpu => "CPU",
            RowKind::Memory => "MEM",
            RowKind::Temperature => "TMP",
            RowKind::IpAddress => "IP",
            RowKind::Uptime => "UP",
        }
    }

    /// Rows that can carry a usage bar
    pub fn has_bar(&self) -> bool {
        matches!(self, RowKind::Cpu | RowKind::Memory)
    }
}

/// One metric row: the top-left of its text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusRow {
    pub kind: RowKind,
    pub origin: Point,
}

/// Font size categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontSize {
    /// 5x8
    Small,

    /// 6x10
    Medium,
}

impl FontSize {
    pub fn font(&self) -> &'static MonoFont<'static> {
        match self {
            FontSize::Small => &FONT_5X8,
            FontSize::Medium => &FONT_6X10,
        }
    }

    pub fn char_width(&self) -> u32 {
        self.font().character_size.width
    }

    pub fn line_height(&self) -> u32 {
        self.font().character_size.height
    }
}

const FULL_ROWS: [RowKind; 5] = [
    RowKind::Cpu,
    RowKind::Memory,
    RowKind::Temperature,
    RowKind::IpAddress,
    RowKind::Uptime,
];

const COMPACT_ROWS: [RowKind; 4] = [
    RowKind::Cpu,
    RowKind::Memory,
    RowKind::IpAddress,
    RowKind::Uptime,
];

/// Widest bar label, "MEM: 100%"
const BAR_TEXT_CHARS: u32 = 9;
const BAR_MIN_WIDTH: u32 = 16;

impl StatusLayout {
    /// Pick the layout for a panel
    pub fn for_display(caps: &DisplayCapabilities) -> Self {
        Self::for_size(caps.width, caps.height)
    }

    pub fn for_size(width: u32, height: u32) -> Self {
        if height >= 64 {
            Self::full(width, height)
        } else {
            Self::compact(width, height)
        }
    }

    fn full(width: u32, height: u32) -> Self {
        let header = HeaderLayout { font: FontSize::Medium, rule_y: 11 };
        let row_font = FontSize::Small;
        let row_pitch = 10;
        let top = header.rule_y + 2;

        let rows = FULL_ROWS.iter().enumerate()
            .map(|(i, &kind)| StatusRow { kind, origin: Point::new(0, top + i as i32 * row_pitch) })
            .collect();

        // bar sits right of the longest text with a little gap
        let bar_x = BAR_TEXT_CHARS * row_font.char_width() + 4;
        let bars = width.checked_sub(bar_x + 2)
            .filter(|&w| w >= BAR_MIN_WIDTH)
            .map(|bar_width| BarLayout { x: bar_x as i32, width: bar_width, height: 6 });

        Self {
            width,
            height,
            category: LayoutCategory::Full,
            header: Some(header),
            rows,
            row_font,
            bars,
        }
    }

    fn compact(width: u32, height: u32) -> Self {
        let row_font = FontSize::Small;
        let pitch = row_font.line_height() as i32;

        let rows = COMPACT_ROWS.iter().enumerate()
            .map(|(i, &kind)| StatusRow { kind, origin: Point::new(0, i as i32 * pitch) })
            .collect();

        Self {
            width,
            height,
            category: LayoutCategory::Compact,
            header: None,
            rows,
            row_font,
            bars: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_layout_fits_128x64() {
        let layout = StatusLayout::for_size(128, 64);
        assert_eq!(layout.category, LayoutCategory::Full);
        assert_eq!(layout.rows.len(), 5);

        let last = layout.rows.last().unwrap();
        let bottom = last.origin.y + layout.row_font.line_height() as i32;
        assert!(bottom <= 64, "last row ends at {}", bottom);

        let bars = layout.bars.unwrap();
        assert!(bars.x as u32 + bars.width <= 128);
        assert!(layout.header.unwrap().rule_y < layout.rows[0].origin.y);
    }

    #[test]
    fn test_compact_layout_for_128x32() {
        let layout = StatusLayout::for_size(128, 32);
        assert_eq!(layout.category, LayoutCategory::Compact);
        assert!(layout.header.is_none());
        assert!(layout.bars.is_none());

        let kinds: Vec<_> = layout.rows.iter().map(|r| r.kind).collect();
        assert_eq!(kinds, COMPACT_ROWS.to_vec());
        assert_eq!(layout.rows[3].origin.y + 8, 32);
    }

    #[test]
    fn test_narrow_panel_drops_bars() {
        let layout = StatusLayout::for_size(64, 128);
        assert_eq!(layout.category, LayoutCategory::Full);
        assert!(layout.bars.is_none());
    }
}
