//! High-level collaborative canvas client.
//!
//! Wires the pieces together: session endpoints feed the channel, channel
//! events feed the reconstruction engine, pointer input goes through the
//! local echo controller and out over the channel. Everything is owned by
//! one [`CollabClient`] and mutated from whichever task drives it — there is
//! no shared state and no locking.

use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use scrawl_channel::{
    CanvasChannel, ChannelEvent, ChannelOptions, SessionEndpoints, TransportKind,
};
use scrawl_core::protocol::{ClientRequest, DrawEvent, EventKind, Point, StrokeStyle};
use scrawl_core::{ClientConfig, Result, ScrawlError, SessionCode};
use scrawl_engine::{LocalEcho, RasterSurface, StrokeEngine};

/// Connection status as shown to the user. There is no automatic
/// reconnect; a disconnected client stays disconnected until the caller
/// builds a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Connecting,
    Connected,
    Disconnected,
}

/// What the last processed channel event amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientUpdate {
    Opened(TransportKind),
    /// History replay finished; carries the event count.
    HistoryReplayed(usize),
    /// A live draw event was applied (or suppressed as a self-echo).
    Drawn,
    /// A peer cleared the canvas.
    Cleared,
    /// Keep-alive or otherwise non-drawable traffic.
    Ignored,
    Disconnected(Option<String>),
}

/// A connected client for one canvas session.
pub struct CollabClient {
    channel: CanvasChannel,
    events: mpsc::UnboundedReceiver<ChannelEvent>,
    engine: StrokeEngine,
    echo: LocalEcho,
    surface: RasterSurface,
    status: Status,
}

impl CollabClient {
    /// Derive the session endpoints and connect.
    ///
    /// The local identity defaults to a fresh v4 UUID so outbound events
    /// are always tagged and the engine can suppress their echoes. Pass
    /// `identity` to override (e.g. reusing an id across reconnects).
    pub async fn connect(
        config: &ClientConfig,
        code: &SessionCode,
        identity: Option<String>,
    ) -> Result<Self> {
        let endpoints = SessionEndpoints::derive(&config.base_url, code)?;
        let options = ChannelOptions {
            ping_interval: std::time::Duration::from_secs(config.ping_interval_secs),
            ..ChannelOptions::default()
        };
        let (channel, events) =
            CanvasChannel::connect(&endpoints.mux, &endpoints.socket, options).await?;

        let local_id = identity.unwrap_or_else(|| Uuid::new_v4().to_string());
        let mut engine = StrokeEngine::new(config.gap_threshold_ms);
        engine.set_local_id(local_id.clone());
        let mut echo = LocalEcho::new(StrokeStyle::default());
        echo.set_client_id(local_id);

        Ok(Self {
            channel,
            events,
            engine,
            echo,
            surface: RasterSurface::new(config.canvas_width, config.canvas_height),
            status: Status::Connecting,
        })
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn transport_kind(&self) -> TransportKind {
        self.channel.transport_kind()
    }

    pub fn surface(&self) -> &RasterSurface {
        &self.surface
    }

    pub fn local_id(&self) -> Option<&str> {
        self.engine.local_id()
    }

    /// Authors the engine currently tracks continuity for.
    pub fn active_authors(&self) -> usize {
        self.engine.active_authors()
    }

    pub fn set_style(&mut self, style: StrokeStyle) {
        self.echo.set_style(style);
    }

    /// Wait for the next channel event and apply it. `None` once the
    /// channel's event stream is exhausted after a close.
    pub async fn next_update(&mut self) -> Option<ClientUpdate> {
        let event = self.events.recv().await?;
        Some(self.apply_channel_event(event))
    }

    fn apply_channel_event(&mut self, event: ChannelEvent) -> ClientUpdate {
        match event {
            ChannelEvent::Open { transport } => {
                info!(?transport, "Canvas channel open");
                self.status = Status::Connected;
                ClientUpdate::Opened(transport)
            }
            ChannelEvent::Message(message) => {
                if let Some(history) = message.initial_history {
                    self.engine.replay(&history.events, &mut self.surface);
                    info!(events = history.events.len(), "History replayed");
                    return ClientUpdate::HistoryReplayed(history.events.len());
                }
                match message.draw_event {
                    Some(event) => self.apply_draw_event(event),
                    None => ClientUpdate::Ignored,
                }
            }
            ChannelEvent::Closed { reason } => {
                warn!(?reason, "Canvas channel closed");
                self.status = Status::Disconnected;
                // Continuity state is meaningless across a reconnect; the
                // next session's history replay starts from scratch.
                self.engine.reset();
                ClientUpdate::Disconnected(reason)
            }
        }
    }

    fn apply_draw_event(&mut self, event: DrawEvent) -> ClientUpdate {
        match event.kind {
            EventKind::Ping | EventKind::Listen => ClientUpdate::Ignored,
            EventKind::Clear => {
                self.engine.apply(&event, &mut self.surface);
                ClientUpdate::Cleared
            }
            EventKind::Draw => {
                self.engine.apply(&event, &mut self.surface);
                ClientUpdate::Drawn
            }
        }
    }

    /// Local pointer contact: paint immediately, then transmit.
    pub async fn pointer_down(&mut self, at: Point) -> Result<()> {
        let event = self.echo.pointer_down(at, &mut self.surface);
        self.channel.send(&ClientRequest::event(event)).await
    }

    /// Local pointer motion: paint immediately, then transmit. A move with
    /// the pointer up sends nothing.
    pub async fn pointer_move(&mut self, to: Point) -> Result<()> {
        match self.echo.pointer_move(to, &mut self.surface) {
            Some(event) => self.channel.send(&ClientRequest::event(event)).await,
            None => Ok(()),
        }
    }

    /// Local pointer release. Nothing is transmitted; the next stroke's
    /// discontinuity implies the break.
    pub fn pointer_up(&mut self) {
        self.echo.pointer_up();
    }

    /// Ask the server to clear the canvas. The local surface clears when
    /// the event comes back, keeping the history authoritative.
    pub async fn send_clear(&mut self) -> Result<()> {
        let event = DrawEvent::clear(self.engine.local_id().map(String::from));
        self.channel.send(&ClientRequest::event(event)).await
    }

    /// Send a clear and wait until the server's echo applies it. A channel
    /// that ends before the echo arrives leaves the clear unconfirmed,
    /// which is an error.
    pub async fn clear_confirmed(&mut self) -> Result<()> {
        self.send_clear().await?;
        loop {
            match self.next_update().await {
                Some(ClientUpdate::Cleared) => return Ok(()),
                Some(ClientUpdate::Disconnected(reason)) => {
                    return Err(ScrawlError::Transport(format!(
                        "disconnected before clear was confirmed: {reason:?}"
                    )));
                }
                Some(_) => {}
                None => return Err(ScrawlError::ChannelClosed),
            }
        }
    }

    pub fn close(&self) {
        self.channel.close();
    }
}
