//! Client configuration loading.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

fn default_base_url() -> String {
    "https://localhost:4433".into()
}

fn default_ping_interval_secs() -> u64 {
    30
}

fn default_gap_threshold_ms() -> i64 {
    100
}

fn default_canvas_width() -> u32 {
    800
}

fn default_canvas_height() -> u32 {
    500
}

/// Top-level Scrawl client configuration.
///
/// Loaded from an optional JSON file; any missing field takes its default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base service URL the canvas endpoints are derived from.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Keep-alive ping interval in seconds.
    #[serde(default = "default_ping_interval_secs")]
    pub ping_interval_secs: u64,

    /// Maximum gap between same-style events that still bridges a dropped
    /// segment instead of starting a new stroke.
    #[serde(default = "default_gap_threshold_ms")]
    pub gap_threshold_ms: i64,

    #[serde(default = "default_canvas_width")]
    pub canvas_width: u32,

    #[serde(default = "default_canvas_height")]
    pub canvas_height: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            ping_interval_secs: default_ping_interval_secs(),
            gap_threshold_ms: default_gap_threshold_ms(),
            canvas_width: default_canvas_width(),
            canvas_height: default_canvas_height(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from a JSON file. A missing file yields defaults;
    /// a file that exists but fails to parse is an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&raw)?;
        Ok(config)
    }
}
