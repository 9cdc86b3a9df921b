//! Networking for the Scrawl canvas client.
//!
//! One channel per session, one transport per channel: WebTransport when the
//! server speaks it, a plain WebSocket otherwise. Messages are
//! newline-delimited JSON frames; the session itself is negotiated over a
//! short HTTP exchange before the channel connects.

pub mod channel;
pub mod endpoint;
pub mod framing;
pub mod session;

pub use channel::{CanvasChannel, ChannelEvent, ChannelOptions, TransportKind};
pub use endpoint::SessionEndpoints;
pub use framing::{encode_frame, FrameDecoder};
pub use session::SessionApi;
