//! Per-author stroke reconstruction.
//!
//! Freehand input arrives as one event per short segment. Redrawing each
//! segment as an independent stroke leaves visible seams at the joins, so
//! the engine tracks where each author's pen last was and decides, per
//! event, whether to continue the current path, bridge over a dropped
//! segment, or start a new stroke.

use std::collections::HashMap;

use scrawl_core::protocol::{DrawEvent, EventKind, Point, Segment, StrokeStyle};
use tracing::{debug, warn};

use crate::surface::DrawSurface;

/// Default maximum gap (millis) that still bridges a discontinuity.
pub const DEFAULT_GAP_THRESHOLD_MS: i64 = 100;

/// Authors that never sent a client id share one continuity slot.
const ANONYMOUS_AUTHOR: &str = "";

/// Where an author's pen last was, and with what style.
///
/// Rebuilt entirely from the event stream; discarded on `clear` and on
/// reconnect. Never shared outside the engine.
#[derive(Debug, Clone)]
struct PathState {
    last_point: Point,
    last_style: StrokeStyle,
    last_time: Option<i64>,
}

/// The stroke reconstruction engine: a map from author id to [`PathState`]
/// plus the continuity heuristics that decide how each segment is painted.
#[derive(Debug)]
pub struct StrokeEngine {
    paths: HashMap<String, PathState>,
    gap_threshold_ms: i64,
    local_id: Option<String>,
}

impl Default for StrokeEngine {
    fn default() -> Self {
        Self::new(DEFAULT_GAP_THRESHOLD_MS)
    }
}

impl StrokeEngine {
    pub fn new(gap_threshold_ms: i64) -> Self {
        Self {
            paths: HashMap::new(),
            gap_threshold_ms,
            local_id: None,
        }
    }

    /// Set the local client identity. Subsequent events echoed back with
    /// this id update continuity state but are not repainted, since the
    /// local echo controller already painted them.
    pub fn set_local_id(&mut self, id: impl Into<String>) {
        self.local_id = Some(id.into());
    }

    pub fn local_id(&self) -> Option<&str> {
        self.local_id.as_deref()
    }

    /// Number of authors with live path state.
    pub fn active_authors(&self) -> usize {
        self.paths.len()
    }

    /// Drop all per-author state without touching the surface. Used on
    /// reconnect, where the server's history replay re-establishes pixels.
    pub fn reset(&mut self) {
        self.paths.clear();
    }

    /// Apply one live inbound event to the surface.
    pub fn apply(&mut self, event: &DrawEvent, surface: &mut dyn DrawSurface) {
        self.apply_inner(event, surface, true);
    }

    fn apply_inner(&mut self, event: &DrawEvent, surface: &mut dyn DrawSurface, live: bool) {
        match event.kind {
            // Keep-alive and subscription signals carry nothing drawable.
            EventKind::Ping | EventKind::Listen => {}
            // A clear is authoritative and unconditional regardless of
            // author: all path state goes, then the surface.
            EventKind::Clear => {
                self.paths.clear();
                surface.clear();
            }
            EventKind::Draw => match event.as_segment() {
                Some(segment) => self.apply_segment(&segment, surface, live),
                None => {
                    warn!(?event, "Dropping draw event with missing fields");
                }
            },
        }
    }

    fn apply_segment(&mut self, segment: &Segment, surface: &mut dyn DrawSurface, live: bool) {
        let author = segment.author.as_deref().unwrap_or(ANONYMOUS_AUTHOR);

        // Only live echoes are suppressed: during history replay nothing was
        // painted by this session's local echo, so even segments carrying
        // the local id must be drawn.
        let suppress = live
            && match (&self.local_id, &segment.author) {
                (Some(local), Some(author)) => local == author,
                _ => false,
            };
        if suppress {
            // Server echo of our own input: the local echo controller
            // already painted it, so only the continuity state advances.
            self.store(author, segment);
            return;
        }

        if let Some(prior) = self.paths.get(author) {
            let same_style = segment.style == prior.last_style;
            let continuous = segment.prev == prior.last_point;
            let recent_gap = match (segment.time, prior.last_time) {
                (Some(now), Some(then)) => now - then < self.gap_threshold_ms,
                _ => false,
            };

            if !continuous && same_style && recent_gap {
                // An intermediate event was dropped: paint the missing
                // piece from where the pen last was to this event's start,
                // keeping the stroke visually connected.
                debug!(author, "Bridging dropped segment");
                surface.draw_segment(&segment.style, prior.last_point, segment.prev);
            }
        }

        // Continue (same style, connected) and new-stroke both paint the
        // event's own prev -> curr line; they differ only in whether the
        // prior path was committed, which the surface does not care about.
        surface.draw_segment(&segment.style, segment.prev, segment.curr);
        self.store(author, segment);
    }

    fn store(&mut self, author: &str, segment: &Segment) {
        self.paths.insert(
            author.to_string(),
            PathState {
                last_point: segment.curr,
                last_style: segment.style.clone(),
                last_time: segment.time,
            },
        );
    }

    /// Replay a full event log in order. The resulting surface is
    /// indistinguishable from having observed the live sequence — including
    /// segments authored under the local id in an earlier session, which are
    /// painted rather than suppressed.
    pub fn replay(&mut self, events: &[DrawEvent], surface: &mut dyn DrawSurface) {
        for event in events {
            self.apply_inner(event, surface, false);
        }
    }
}
