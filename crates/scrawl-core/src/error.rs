use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScrawlError {
    #[error("Invalid session code: {0}")]
    InvalidSessionCode(String),

    #[error("Session rejected: no room with code {0}")]
    SessionRejected(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Channel closed")]
    ChannelClosed,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ScrawlError>;
