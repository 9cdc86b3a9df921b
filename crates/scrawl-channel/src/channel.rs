//! The framed canvas channel.
//!
//! Owns exactly one underlying transport. Connection order: WebTransport
//! first, WebSocket fallback — a mux handshake failure is recovered locally
//! and never surfaced, a socket failure is fatal. Inbound traffic arrives as
//! [`ChannelEvent`]s on an unbounded receiver; all read loops hang off one
//! cancellation token so `close()` aborts everything at once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use wtransport::error::ConnectionError;
use wtransport::{ClientConfig, Connection, Endpoint, RecvStream, VarInt};

use scrawl_core::protocol::{ClientRequest, DrawEvent, ServerResponse};
use scrawl_core::{Result, ScrawlError};

use crate::framing::{encode_frame, FrameDecoder};

/// Which transport a channel ended up on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    WebTransport,
    WebSocket,
}

/// Events observed by the channel's consumer.
#[derive(Debug)]
pub enum ChannelEvent {
    /// Fired exactly once, after whichever transport connected.
    Open { transport: TransportKind },
    Message(ServerResponse),
    /// Fired at most once when the connection dies or the peer closes.
    Closed { reason: Option<String> },
}

/// Connection tuning. Defaults match the deployed service.
#[derive(Debug, Clone)]
pub struct ChannelOptions {
    /// Keep-alive ping interval.
    pub ping_interval: Duration,
    /// Upper bound on the WebTransport attempt before falling back. The
    /// fallback itself has no timeout; this only bounds how long a dead mux
    /// endpoint can delay it.
    pub mux_connect_timeout: Duration,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(30),
            mux_connect_timeout: Duration::from_secs(3),
        }
    }
}

/// The active transport, tagged explicitly. The two transports have
/// materially different stream models (one connection vs. a stream per
/// message), so every send/close dispatches on this instead of going
/// through a polymorphic transport object.
#[derive(Clone)]
enum Transport {
    Mux { connection: Connection },
    Socket { tx: mpsc::UnboundedSender<String> },
}

/// Shared event sink guaranteeing `Closed` is delivered at most once even
/// though several read loops can observe the death of the connection.
struct EventSink {
    tx: mpsc::UnboundedSender<ChannelEvent>,
    closed: AtomicBool,
}

impl EventSink {
    fn new(tx: mpsc::UnboundedSender<ChannelEvent>) -> Arc<Self> {
        Arc::new(Self {
            tx,
            closed: AtomicBool::new(false),
        })
    }

    fn open(&self, transport: TransportKind) {
        let _ = self.tx.send(ChannelEvent::Open { transport });
    }

    fn message(&self, message: ServerResponse) {
        let _ = self.tx.send(ChannelEvent::Message(message));
    }

    fn closed(&self, reason: Option<String>) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            let _ = self.tx.send(ChannelEvent::Closed { reason });
        }
    }
}

/// A connected dual-transport channel for one canvas session.
pub struct CanvasChannel {
    transport: Transport,
    kind: TransportKind,
    cancel: CancellationToken,
}

impl CanvasChannel {
    /// Connect to a session: WebTransport first, WebSocket fallback.
    ///
    /// Returns the channel and the receiver its events arrive on. `Open` is
    /// already queued on the receiver when this returns.
    pub async fn connect(
        mux_url: &str,
        socket_url: &str,
        options: ChannelOptions,
    ) -> Result<(Self, mpsc::UnboundedReceiver<ChannelEvent>)> {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let sink = EventSink::new(event_tx);
        let cancel = CancellationToken::new();

        let transport = match tokio::time::timeout(
            options.mux_connect_timeout,
            connect_webtransport(mux_url, sink.clone(), cancel.clone()),
        )
        .await
        {
            Ok(Ok(connection)) => {
                info!(url = %mux_url, "WebTransport session established");
                Transport::Mux { connection }
            }
            Ok(Err(e)) => {
                info!(error = %e, "WebTransport unavailable, falling back to WebSocket");
                connect_websocket(socket_url, sink.clone(), cancel.clone()).await?
            }
            Err(_) => {
                info!("WebTransport handshake timed out, falling back to WebSocket");
                connect_websocket(socket_url, sink.clone(), cancel.clone()).await?
            }
        };

        let kind = match &transport {
            Transport::Mux { .. } => TransportKind::WebTransport,
            Transport::Socket { .. } => TransportKind::WebSocket,
        };
        sink.open(kind);

        let channel = Self {
            transport,
            kind,
            cancel,
        };

        // Announce ourselves so the server registers the subscription, then
        // keep the connection warm.
        if let Err(e) = send_on(&channel.transport, &ClientRequest::event(DrawEvent::ping())).await
        {
            debug!(error = %e, "Initial ping failed");
        }
        channel.spawn_ping(options.ping_interval);

        Ok((channel, event_rx))
    }

    /// The transport this channel settled on.
    pub fn transport_kind(&self) -> TransportKind {
        self.kind
    }

    /// Send one message. On the socket transport this is a single text
    /// frame on the shared connection; on the mux transport every send is a
    /// fresh bidirectional stream, written and finished, never reused.
    pub async fn send(&self, request: &ClientRequest) -> Result<()> {
        send_on(&self.transport, request).await
    }

    /// Tear the channel down: cancel all stream read loops and close the
    /// underlying transport.
    pub fn close(&self) {
        self.cancel.cancel();
        if let Transport::Mux { connection } = &self.transport {
            connection.close(VarInt::from_u32(0), b"");
        }
    }

    fn spawn_ping(&self, interval: Duration) {
        let transport = self.transport.clone();
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately; the connect path already
            // sent the initial ping.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) =
                            send_on(&transport, &ClientRequest::event(DrawEvent::ping())).await
                        {
                            debug!(error = %e, "Keep-alive ping failed, stopping");
                            break;
                        }
                    }
                }
            }
        });
    }
}

async fn send_on(transport: &Transport, request: &ClientRequest) -> Result<()> {
    match transport {
        Transport::Mux { connection } => {
            let payload = encode_frame(request)?;
            let opening = connection
                .open_bi()
                .await
                .map_err(|e| ScrawlError::Transport(e.to_string()))?;
            let (mut send, _recv) = opening
                .await
                .map_err(|e| ScrawlError::Transport(e.to_string()))?;
            send.write_all(&payload)
                .await
                .map_err(|e| ScrawlError::Transport(e.to_string()))?;
            send.finish()
                .await
                .map_err(|e| ScrawlError::Transport(e.to_string()))?;
            Ok(())
        }
        Transport::Socket { tx } => {
            let text = serde_json::to_string(request)?;
            tx.send(text).map_err(|_| ScrawlError::ChannelClosed)
        }
    }
}

/// Establish a WebTransport session and spawn the two stream acceptors.
/// Any failure here is recoverable by design; the error is only logged.
async fn connect_webtransport(
    url: &str,
    sink: Arc<EventSink>,
    cancel: CancellationToken,
) -> anyhow::Result<Connection> {
    let endpoint = Endpoint::client(ClientConfig::default())?;
    let connection = endpoint.connect(url).await?;

    // Incoming bidirectional streams carry live events.
    let bi_conn = connection.clone();
    let bi_sink = sink.clone();
    let bi_cancel = cancel.clone();
    tokio::spawn(async move {
        // The endpoint must outlive the connection's read loops.
        let _endpoint = endpoint;
        loop {
            tokio::select! {
                _ = bi_cancel.cancelled() => break,
                accepted = bi_conn.accept_bi() => match accepted {
                    Ok((_send, recv)) => {
                        spawn_stream_reader(recv, bi_sink.clone(), bi_cancel.clone());
                    }
                    Err(e) => {
                        report_connection_end(&bi_sink, e);
                        break;
                    }
                },
            }
        }
    });

    // Incoming unidirectional streams carry the history push.
    let uni_conn = connection.clone();
    let uni_sink = sink;
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                accepted = uni_conn.accept_uni() => match accepted {
                    Ok(recv) => {
                        spawn_stream_reader(recv, uni_sink.clone(), cancel.clone());
                    }
                    Err(e) => {
                        report_connection_end(&uni_sink, e);
                        break;
                    }
                },
            }
        }
    });

    Ok(connection)
}

fn report_connection_end(sink: &Arc<EventSink>, error: ConnectionError) {
    debug!(error = %error, "Mux connection ended");
    sink.closed(Some(error.to_string()));
}

/// Read one accepted mux stream to end-of-stream. A mid-stream error ends
/// this loop only; other streams stay alive.
fn spawn_stream_reader(mut recv: RecvStream, sink: Arc<EventSink>, cancel: CancellationToken) {
    tokio::spawn(async move {
        let mut decoder = FrameDecoder::new();
        let mut buf = vec![0u8; 4096];
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                read = recv.read(&mut buf) => match read {
                    Ok(Some(n)) => {
                        for message in decoder.push(&buf[..n]) {
                            sink.message(message);
                        }
                    }
                    Ok(None) => {
                        if let Some(message) = decoder.finish() {
                            sink.message(message);
                        }
                        return;
                    }
                    Err(e) => {
                        warn!(error = %e, "Stream read error, abandoning stream");
                        return;
                    }
                },
            }
        }
    });
}

/// Open the WebSocket fallback. Unlike the mux attempt, a failure here is
/// fatal for the whole connection attempt.
async fn connect_websocket(
    url: &str,
    sink: Arc<EventSink>,
    cancel: CancellationToken,
) -> Result<Transport> {
    let (ws, _) = connect_async(url)
        .await
        .map_err(|e| ScrawlError::Transport(e.to_string()))?;
    info!(url = %url, "WebSocket connected");
    let (mut ws_tx, mut ws_rx) = ws.split();

    let (tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();

    // Writer half: serialize the send queue onto the single connection.
    let writer_cancel = cancel.clone();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = writer_cancel.cancelled() => {
                    let _ = ws_tx.send(Message::Close(None)).await;
                    break;
                }
                queued = outbound_rx.recv() => match queued {
                    Some(text) => {
                        if ws_tx.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                },
            }
        }
    });

    // Reader half: each text frame is one complete JSON message.
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                incoming = ws_rx.next() => match incoming {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ServerResponse>(&text) {
                            Ok(message) => sink.message(message),
                            Err(e) => warn!(error = %e, "Dropping undecodable frame"),
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        debug!(?frame, "Server closed WebSocket");
                        sink.closed(None);
                        return;
                    }
                    Some(Ok(_)) => {
                        // Ping/pong handled by tungstenite; binary unused.
                    }
                    Some(Err(e)) => {
                        sink.closed(Some(e.to_string()));
                        return;
                    }
                    None => {
                        sink.closed(None);
                        return;
                    }
                },
            }
        }
    });

    Ok(Transport::Socket { tx })
}
