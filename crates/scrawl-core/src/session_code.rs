//! Session codes — short opaque identifiers for collaboration rooms.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ScrawlError;

/// Fixed length of a session code as issued by the server.
pub const CODE_LEN: usize = 6;

/// A normalized session code: exactly six ASCII-alphanumeric characters,
/// stored uppercase. Codes are opaque; the client never interprets them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionCode(String);

impl SessionCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for SessionCode {
    type Err = ScrawlError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_uppercase();
        if normalized.len() != CODE_LEN || !normalized.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(ScrawlError::InvalidSessionCode(raw.trim().to_string()));
        }
        Ok(Self(normalized))
    }
}

impl fmt::Display for SessionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
