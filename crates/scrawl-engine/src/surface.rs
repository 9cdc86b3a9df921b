//! Drawing surface abstraction.

use scrawl_core::protocol::{Point, StrokeStyle};

/// Something segments can be painted onto.
///
/// The engine only ever needs two operations; stroke grouping is the
/// engine's job, not the surface's.
pub trait DrawSurface {
    /// Paint one line segment. A zero-length segment is a dot.
    fn draw_segment(&mut self, style: &StrokeStyle, from: Point, to: Point);

    /// Erase everything.
    fn clear(&mut self);
}

/// A surface that records every call instead of rasterizing.
///
/// Used by tests to assert on exactly which segments were painted.
#[derive(Debug, Default)]
pub struct SegmentLog {
    pub segments: Vec<(StrokeStyle, Point, Point)>,
    pub clears: usize,
}

impl SegmentLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Endpoints only, for compact assertions.
    pub fn endpoints(&self) -> Vec<(Point, Point)> {
        self.segments.iter().map(|(_, a, b)| (*a, *b)).collect()
    }
}

impl DrawSurface for SegmentLog {
    fn draw_segment(&mut self, style: &StrokeStyle, from: Point, to: Point) {
        self.segments.push((style.clone(), from, to));
    }

    fn clear(&mut self) {
        self.segments.clear();
        self.clears += 1;
    }
}
