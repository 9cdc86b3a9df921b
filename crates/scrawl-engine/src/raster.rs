//! Software raster surface.
//!
//! A plain RGBA pixel buffer with Bresenham line drawing. This is the
//! headless stand-in for a browser canvas: good enough to verify that two
//! event interleavings produce identical pixels, which is all the sync
//! engine's correctness properties need.

use scrawl_core::protocol::{Point, StrokeStyle};
use tracing::warn;

use crate::surface::DrawSurface;

/// Packed 0xRRGGBBAA pixel.
pub type Pixel = u32;

const BACKGROUND: Pixel = 0;

/// Widest brush the rasterizer accepts; wire values above this are capped.
const MAX_BRUSH_WIDTH: u32 = 64;

/// Parse a `#rgb` or `#rrggbb` CSS hex color into a packed opaque pixel.
/// Unparseable colors fall back to black, matching how a canvas treats an
/// invalid strokeStyle as a no-op on the previous (default black) value.
pub fn parse_color(color: &str) -> Pixel {
    fn hex(b: u8) -> Option<u32> {
        (b as char).to_digit(16)
    }

    fn channels(raw: &[u8]) -> Option<(u32, u32, u32)> {
        match raw {
            [b'#', r, g, b] => Some((hex(*r)? * 17, hex(*g)? * 17, hex(*b)? * 17)),
            [b'#', r1, r0, g1, g0, b1, b0] => Some((
                hex(*r1)? * 16 + hex(*r0)?,
                hex(*g1)? * 16 + hex(*g0)?,
                hex(*b1)? * 16 + hex(*b0)?,
            )),
            _ => None,
        }
    }

    match channels(color.as_bytes()) {
        Some((r, g, b)) => (r << 24) | (g << 16) | (b << 8) | 0xff,
        None => {
            warn!(%color, "Unparseable stroke color, painting black");
            0x0000_00ff
        }
    }
}

/// A fixed-size RGBA canvas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterSurface {
    width: u32,
    height: u32,
    pixels: Vec<Pixel>,
}

impl RasterSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![BACKGROUND; (width * height) as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel(&self, x: i32, y: i32) -> Option<Pixel> {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return None;
        }
        Some(self.pixels[(y as u32 * self.width + x as u32) as usize])
    }

    pub fn is_blank(&self) -> bool {
        self.pixels.iter().all(|&p| p == BACKGROUND)
    }

    /// Number of non-background pixels.
    pub fn painted_count(&self) -> usize {
        self.pixels.iter().filter(|&&p| p != BACKGROUND).count()
    }

    /// Stamp a square brush centered on (x, y). The stamp is always
    /// odd-sized (`2 * half + 1`), so an even stroke width rounds up to the
    /// next odd square. Out-of-bounds pixels are clipped, not wrapped.
    fn stamp(&mut self, x: i32, y: i32, half: i32, color: Pixel) {
        for dy in -half..=half {
            for dx in -half..=half {
                let (px, py) = (x + dx, y + dy);
                if px >= 0 && py >= 0 && (px as u32) < self.width && (py as u32) < self.height {
                    self.pixels[(py as u32 * self.width + px as u32) as usize] = color;
                }
            }
        }
    }
}

impl DrawSurface for RasterSurface {
    fn draw_segment(&mut self, style: &StrokeStyle, from: Point, to: Point) {
        let color = parse_color(&style.color);
        let half = (style.width.min(MAX_BRUSH_WIDTH) as i32) / 2;

        // Coordinates come straight off the wire. Clamp both endpoints to
        // just outside the surface before stepping, so extreme values can
        // neither overflow the delta math nor stretch the loop over an
        // astronomic span.
        let margin = half + 1;
        let (max_x, max_y) = (self.width as i32 + margin, self.height as i32 + margin);
        let from = Point::new(from.x.clamp(-margin, max_x), from.y.clamp(-margin, max_y));
        let to = Point::new(to.x.clamp(-margin, max_x), to.y.clamp(-margin, max_y));

        // Bresenham between the endpoints, stamping the brush at each step.
        let (mut x, mut y) = (from.x, from.y);
        let dx = (to.x - from.x).abs();
        let dy = -(to.y - from.y).abs();
        let sx = if from.x < to.x { 1 } else { -1 };
        let sy = if from.y < to.y { 1 } else { -1 };
        let mut err = dx + dy;

        loop {
            self.stamp(x, y, half, color);
            if x == to.x && y == to.y {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    fn clear(&mut self) {
        self.pixels.fill(BACKGROUND);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_color_forms() {
        assert_eq!(parse_color("#fff"), 0xffff_ffff);
        assert_eq!(parse_color("#000000"), 0x0000_00ff);
        assert_eq!(parse_color("#e74c3c"), 0xe74c_3cff);
        // Invalid falls back to black rather than erroring.
        assert_eq!(parse_color("red"), 0x0000_00ff);
        assert_eq!(parse_color(""), 0x0000_00ff);
    }

    #[test]
    fn test_dot_and_line() {
        let mut surface = RasterSurface::new(16, 16);
        let style = StrokeStyle {
            color: "#fff".into(),
            width: 1,
        };

        // Zero-length segment paints a single pixel.
        surface.draw_segment(&style, Point::new(3, 3), Point::new(3, 3));
        assert_eq!(surface.painted_count(), 1);
        assert_eq!(surface.pixel(3, 3), Some(0xffff_ffff));

        // A horizontal line covers every column between the endpoints.
        surface.draw_segment(&style, Point::new(0, 8), Point::new(7, 8));
        for x in 0..=7 {
            assert_eq!(surface.pixel(x, 8), Some(0xffff_ffff), "missing x={x}");
        }
    }

    #[test]
    fn test_stroke_width_stamps_square() {
        let mut surface = RasterSurface::new(16, 16);
        let style = StrokeStyle {
            color: "#fff".into(),
            width: 3,
        };
        surface.draw_segment(&style, Point::new(8, 8), Point::new(8, 8));
        // width 3 -> half 1 -> 3x3 square
        assert_eq!(surface.painted_count(), 9);
        assert_eq!(surface.pixel(7, 7), Some(0xffff_ffff));
        assert_eq!(surface.pixel(9, 9), Some(0xffff_ffff));
        assert_eq!(surface.pixel(10, 8), Some(0));
    }

    #[test]
    fn test_extreme_coordinates_are_clamped() {
        let mut surface = RasterSurface::new(8, 8);
        let style = StrokeStyle {
            color: "#fff".into(),
            width: 1,
        };

        // A span the full i32 range wide must neither overflow nor spin;
        // the visible part of the row is still painted.
        surface.draw_segment(&style, Point::new(i32::MIN, 0), Point::new(i32::MAX, 0));
        for x in 0..8 {
            assert_eq!(surface.pixel(x, 0), Some(0xffff_ffff), "missing x={x}");
        }

        surface.draw_segment(&style, Point::new(3, i32::MAX), Point::new(3, i32::MIN));
        for y in 0..8 {
            assert_eq!(surface.pixel(3, y), Some(0xffff_ffff), "missing y={y}");
        }
    }

    #[test]
    fn test_oversized_brush_width_is_capped() {
        let mut surface = RasterSurface::new(8, 8);
        let style = StrokeStyle {
            color: "#fff".into(),
            width: u32::MAX,
        };
        surface.draw_segment(&style, Point::new(4, 4), Point::new(4, 4));
        assert_eq!(surface.painted_count(), 64);
    }

    #[test]
    fn test_out_of_bounds_is_clipped() {
        let mut surface = RasterSurface::new(4, 4);
        let style = StrokeStyle {
            color: "#fff".into(),
            width: 8,
        };
        surface.draw_segment(&style, Point::new(-10, -10), Point::new(10, 10));
        // Survives without panicking and paints something inside.
        assert!(surface.painted_count() > 0);
    }

    #[test]
    fn test_clear_resets_to_blank() {
        let mut surface = RasterSurface::new(8, 8);
        surface.draw_segment(&StrokeStyle::default(), Point::new(0, 0), Point::new(7, 7));
        assert!(!surface.is_blank());
        surface.clear();
        assert!(surface.is_blank());
    }
}
