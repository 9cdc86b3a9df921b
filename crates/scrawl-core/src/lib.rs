//! Shared types for the Scrawl collaborative canvas client.
//!
//! Everything that crosses a crate boundary lives here: the JSON wire
//! protocol, the session-code type, client configuration, and the error
//! taxonomy.

pub mod config;
pub mod error;
pub mod protocol;
pub mod session_code;

pub use config::ClientConfig;
pub use error::{Result, ScrawlError};
pub use protocol::{
    ClientRequest, DrawEvent, EventKind, History, Point, Segment, ServerResponse, StrokeStyle,
};
pub use session_code::SessionCode;
