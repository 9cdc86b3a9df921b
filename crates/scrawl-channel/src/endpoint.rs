//! Per-session endpoint derivation.
//!
//! Both canvas endpoints hang off the same base service URL, differing only
//! in path segment and scheme: `/webtransport/canva` over HTTPS for the mux
//! transport, `/ws/canva` over ws(s) for the socket fallback.

use anyhow::Context;
use scrawl_core::{Result, ScrawlError, SessionCode};
use url::Url;

/// The pair of transport endpoints derived for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEndpoints {
    /// WebTransport endpoint (always https).
    pub mux: String,
    /// WebSocket fallback endpoint (ws or wss).
    pub socket: String,
}

impl SessionEndpoints {
    /// Derive both endpoints from a base service URL and a session code.
    pub fn derive(base_url: &str, code: &SessionCode) -> Result<Self> {
        let base = base_url.trim_end_matches('/');

        let mut mux = Url::parse(&format!("{base}/webtransport/canva?code={code}"))
            .context("invalid base URL")?;
        // WebTransport runs over HTTP/3; a plain-http base still negotiates
        // TLS on the QUIC side.
        if mux.scheme() == "http" {
            mux.set_scheme("https")
                .map_err(|_| ScrawlError::Transport("cannot upgrade base URL scheme".into()))?;
        }

        let mut socket =
            Url::parse(&format!("{base}/ws/canva?code={code}")).context("invalid base URL")?;
        let ws_scheme = if socket.scheme() == "https" { "wss" } else { "ws" };
        socket
            .set_scheme(ws_scheme)
            .map_err(|_| ScrawlError::Transport("cannot derive ws scheme".into()))?;

        Ok(Self {
            mux: mux.to_string(),
            socket: socket.to_string(),
        })
    }
}
