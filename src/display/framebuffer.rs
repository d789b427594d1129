/*
 *  display/framebuffer.rs
 *
 *  OLEDStat - always on, always up
 *  (c) 2020-26 Stuart Hunter
 *
 *  Monochrome frame, drawn with embedded-graphics and pushed whole each tick
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

use core::convert::Infallible;
use embedded_graphics::geometry::{OriginDimensions, Size};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;

/// A runtime-sized 1-bit framebuffer matching the panel geometry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    buf: Vec<BinaryColor>,
    w: usize,
    h: usize,
}

impl Frame {
    /// New blank frame
    pub fn new(width: u32, height: u32) -> Self {
        let (w, h) = (width as usize, height as usize);
        Self { buf: vec![BinaryColor::Off; w * h], w, h }
    }

    pub fn width(&self) -> u32 { self.w as u32 }
    pub fn height(&self) -> u32 { self.h as u32 }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    pub fn as_slice(&self) -> &[BinaryColor] { &self.buf }

    /// Pixel state, `None` outside the frame
    pub fn pixel(&self, x: u32, y: u32) -> Option<BinaryColor> {
        self.idx(Point::new(x as i32, y as i32)).map(|i| self.buf[i])
    }

    pub fn count_on_pixels(&self) -> usize {
        self.buf.iter().filter(|&&p| p == BinaryColor::On).count()
    }

    pub fn is_blank(&self) -> bool {
        self.count_on_pixels() == 0
    }

    /// Lit pixels only, for copying onto a driver's own buffer
    pub fn on_pixels(&self) -> impl Iterator<Item = Pixel<BinaryColor>> + '_ {
        self.buf.iter().enumerate().filter_map(move |(i, &c)| {
            (c == BinaryColor::On)
                .then(|| Pixel(Point::new((i % self.w) as i32, (i / self.w) as i32), c))
        })
    }

    /// Pack into SSD1306 GDDRAM order: one byte per column per 8-row page,
    /// LSB is the top row of the page, pages top to bottom.
    pub fn to_page_bytes(&self) -> Vec<u8> {
        let pages = self.h.div_ceil(8);
        let mut bytes = vec![0u8; pages * self.w];
        for (i, &pixel) in self.buf.iter().enumerate() {
            if pixel.is_on() {
                let (x, y) = (i % self.w, i / self.w);
                bytes[(y / 8) * self.w + x] |= 1 << (y % 8);
            }
        }
        bytes
    }

    /// Render as text art, `#` for lit pixels. Used by the mock panel.
    pub fn to_ascii(&self) -> String {
        let mut out = String::with_capacity((self.w + 1) * self.h);
        for row in self.buf.chunks(self.w.max(1)) {
            out.extend(row.iter().map(|p| if p.is_on() { '#' } else { '.' }));
            out.push('\n');
        }
        out
    }

    /// Map (x,y) to linear index; returns None if out of bounds
    #[inline]
    fn idx(&self, p: Point) -> Option<usize> {
        if p.x >= 0 && p.y >= 0 {
            let (x, y) = (p.x as usize, p.y as usize);
            if x < self.w && y < self.h {
                return Some(y * self.w + x);
            }
        }
        None
    }
}

impl OriginDimensions for Frame {
    fn size(&self) -> Size {
        Size::new(self.w as u32, self.h as u32)
    }
}

impl DrawTarget for Frame {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(p, c) in pixels {
            if let Some(i) = self.idx(p) {
                self.buf[i] = c;
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.buf.fill(color);
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        // fast path for the bar graphs, clipped to the frame
        let area = area.intersection(&self.bounding_box());
        let Size { width, height } = area.size;
        if width == 0 || height == 0 { return Ok(()); }
        let (x0, y0) = (area.top_left.x as usize, area.top_left.y as usize);
        for row in y0..y0 + height as usize {
            let base = row * self.w + x0;
            self.buf[base..base + width as usize].fill(color);
        }
        Ok(())
    }
}
