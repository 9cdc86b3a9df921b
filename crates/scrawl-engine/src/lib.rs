//! Stroke reconstruction for the collaborative canvas.
//!
//! The server relays one event per short line segment, per author, with no
//! ordering guarantees across authors. This crate rebuilds continuous
//! freehand strokes from that stream: per-author continuity state, the
//! dropped-segment bridging heuristic, deterministic history replay, and the
//! local echo path that paints input before the network round-trip.

pub mod echo;
pub mod engine;
pub mod raster;
pub mod surface;

pub use echo::LocalEcho;
pub use engine::StrokeEngine;
pub use raster::RasterSurface;
pub use surface::{DrawSurface, SegmentLog};
