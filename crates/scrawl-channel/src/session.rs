//! Session negotiation — the short HTTP exchange before the channel opens.
//!
//! Both operations are one-shot with no retry policy; a failure leaves the
//! caller's state untouched and the user re-triggers manually.

use serde::Deserialize;
use tracing::info;

use scrawl_core::{Result, ScrawlError, SessionCode};

#[derive(Debug, Deserialize)]
struct CreateResponse {
    code: String,
}

/// Client for the session create/join API.
#[derive(Debug, Clone)]
pub struct SessionApi {
    base: String,
    http: reqwest::Client,
}

impl SessionApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base = base_url.into();
        while base.ends_with('/') {
            base.pop();
        }
        Self {
            base,
            http: reqwest::Client::new(),
        }
    }

    /// Create a fresh session room: `POST <base>/create` -> `{ code }`.
    pub async fn create(&self) -> Result<SessionCode> {
        let response = self
            .http
            .post(format!("{}/create", self.base))
            .send()
            .await?
            .error_for_status()?;
        let body: CreateResponse = response.json().await?;
        let code: SessionCode = body.code.parse()?;
        info!(%code, "Created session");
        Ok(code)
    }

    /// Validate and join an existing room. The code is normalized locally
    /// first, so a malformed code never reaches the network.
    pub async fn join(&self, raw_code: &str) -> Result<SessionCode> {
        let code: SessionCode = raw_code.parse()?;
        let response = self
            .http
            .get(format!("{}/join", self.base))
            .query(&[("code", code.as_str())])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ScrawlError::SessionRejected(code.to_string()));
        }
        info!(%code, "Joined session");
        Ok(code)
    }
}
