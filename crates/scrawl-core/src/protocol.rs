//! Canvas wire protocol.
//!
//! All traffic is JSON, exchanged identically over either transport. A
//! `ClientRequest` carries at most one draw event; a `ServerResponse` is
//! either a single live event or the full history sent on join.

use serde::{Deserialize, Serialize};

/// Kind of a canvas event. Only `draw` and `clear` are visible to other
/// clients; `ping` and `listen` are channel keep-alive/subscription signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Draw,
    Clear,
    Ping,
    Listen,
}

/// One atomic canvas mutation: a single line segment, a clear, or a
/// keep-alive. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev_x: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev_y: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub curr_x: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub curr_y: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    /// Capture time in epoch millis (client clock). Used only by the
    /// continuity heuristics, never for ordering.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<i64>,
}

/// Client -> server message envelope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draw_event: Option<DrawEvent>,
}

/// Server -> client message envelope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draw_event: Option<DrawEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_history: Option<History>,
}

/// The full ordered event log for a session, replayed on join.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct History {
    pub events: Vec<DrawEvent>,
}

/// Integer pixel coordinates on the shared canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Stroke style at the moment an event was captured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrokeStyle {
    pub color: String,
    pub width: u32,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            color: "#222".into(),
            width: 2,
        }
    }
}

/// A validated `draw` event: one `prev -> curr` line with its style.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub author: Option<String>,
    pub style: StrokeStyle,
    pub prev: Point,
    pub curr: Point,
    pub time: Option<i64>,
}

impl DrawEvent {
    /// Build a `draw` event for one segment.
    pub fn segment(
        style: &StrokeStyle,
        prev: Point,
        curr: Point,
        client_id: Option<String>,
        time: i64,
    ) -> Self {
        Self {
            kind: EventKind::Draw,
            color: Some(style.color.clone()),
            size: Some(style.width),
            prev_x: Some(prev.x),
            prev_y: Some(prev.y),
            curr_x: Some(curr.x),
            curr_y: Some(curr.y),
            client_id,
            time: Some(time),
        }
    }

    /// Build a `clear` event. Style and coordinates are ignored on the wire.
    pub fn clear(client_id: Option<String>) -> Self {
        Self {
            kind: EventKind::Clear,
            color: None,
            size: None,
            prev_x: None,
            prev_y: None,
            curr_x: None,
            curr_y: None,
            client_id,
            time: None,
        }
    }

    /// Build a keep-alive `ping` event.
    pub fn ping() -> Self {
        Self {
            kind: EventKind::Ping,
            color: None,
            size: None,
            prev_x: None,
            prev_y: None,
            curr_x: None,
            curr_y: None,
            client_id: None,
            time: None,
        }
    }

    /// Validate a `draw` event into a typed segment. Returns `None` for
    /// non-draw kinds and for draw events missing coordinates or style
    /// (an unrecognized shape the caller should drop with a log).
    pub fn as_segment(&self) -> Option<Segment> {
        if self.kind != EventKind::Draw {
            return None;
        }
        Some(Segment {
            author: self.client_id.clone(),
            style: StrokeStyle {
                color: self.color.clone()?,
                width: self.size?,
            },
            prev: Point::new(self.prev_x?, self.prev_y?),
            curr: Point::new(self.curr_x?, self.curr_y?),
            time: self.time,
        })
    }
}

impl ClientRequest {
    pub fn event(event: DrawEvent) -> Self {
        Self {
            draw_event: Some(event),
        }
    }
}
