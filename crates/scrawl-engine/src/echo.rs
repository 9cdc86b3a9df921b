//! Local echo — paint pointer input immediately, before the network sees it.
//!
//! The controller owns the in-progress local stroke. Every handler paints
//! the surface first and returns the wire event to transmit; the returned
//! event is tagged with the local client id (when known) so the engine can
//! suppress the server's echo of it.

use chrono::Utc;
use scrawl_core::protocol::{DrawEvent, Point, StrokeStyle};

use crate::surface::DrawSurface;

#[derive(Debug, Default)]
pub struct LocalEcho {
    client_id: Option<String>,
    style: StrokeStyle,
    last: Option<Point>,
}

impl LocalEcho {
    pub fn new(style: StrokeStyle) -> Self {
        Self {
            client_id: None,
            style,
            last: None,
        }
    }

    pub fn set_client_id(&mut self, id: impl Into<String>) {
        self.client_id = Some(id.into());
    }

    pub fn set_style(&mut self, style: StrokeStyle) {
        self.style = style;
    }

    pub fn style(&self) -> &StrokeStyle {
        &self.style
    }

    pub fn is_drawing(&self) -> bool {
        self.last.is_some()
    }

    /// Pointer contact: paint a zero-length segment (a dot) so single
    /// clicks leave a mark, start the stroke, and return the event to send.
    pub fn pointer_down(&mut self, at: Point, surface: &mut dyn DrawSurface) -> DrawEvent {
        surface.draw_segment(&self.style, at, at);
        self.last = Some(at);
        DrawEvent::segment(
            &self.style,
            at,
            at,
            self.client_id.clone(),
            Utc::now().timestamp_millis(),
        )
    }

    /// Pointer motion: paint `last -> to` immediately and return the event
    /// to send. Returns `None` when no stroke is in progress (motion with
    /// the pointer up).
    pub fn pointer_move(&mut self, to: Point, surface: &mut dyn DrawSurface) -> Option<DrawEvent> {
        let from = self.last?;
        surface.draw_segment(&self.style, from, to);
        self.last = Some(to);
        Some(DrawEvent::segment(
            &self.style,
            from,
            to,
            self.client_id.clone(),
            Utc::now().timestamp_millis(),
        ))
    }

    /// Pointer release or leave: end the stroke. No wire event is needed;
    /// the next event's discontinuity starts a new stroke implicitly.
    pub fn pointer_up(&mut self) {
        self.last = None;
    }
}
