//! Upstream connection to the OpenAI Realtime API.
//!
//! One `UpstreamSession` owns one WebSocket connection to the service. The
//! session configuration is written to the socket before the pump task
//! starts, so it always precedes any relayed traffic. The pump task owns
//! both halves of the socket: it drains outbound messages into the sink and
//! parses inbound frames into [`UpstreamEvent`]s for the bridge. It never
//! performs CRM calls; tool dispatch happens in the bridge so the pump's
//! dequeue cadence is only ever an async handoff.

use futures_util::{SinkExt, StreamExt};
use http::StatusCode;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, error, info, warn};
use url::Url;

use super::config::{SessionSettings, UpstreamConfig};
use super::events::{ClientEvent, SessionPayload, UpstreamEvent};
use super::UpstreamError;
use crate::tools::ToolDef;

/// Channel capacity for messages flowing to and from the upstream socket.
const WS_CHANNEL_CAPACITY: usize = 256;

/// Handle to one live upstream connection.
///
/// Dropping the handle (or calling [`UpstreamSession::close`]) tears the
/// connection down; the bridge also observes teardown as the event channel
/// closing when the remote side goes away first.
pub struct UpstreamSession {
    outbound: mpsc::Sender<String>,
    task: JoinHandle<()>,
}

impl UpstreamSession {
    /// Connect, send the session configuration, and start the pump task.
    ///
    /// Returns the session handle plus the receiver the bridge drains for
    /// upstream events. Fails with [`UpstreamError::Config`] when no API key
    /// is configured, [`UpstreamError::Auth`] when the service rejects the
    /// handshake with 401/403, and [`UpstreamError::Transport`] for every
    /// other connection failure.
    pub async fn connect(
        config: &UpstreamConfig,
        settings: &SessionSettings,
        tools: Vec<ToolDef>,
    ) -> Result<(Self, mpsc::Receiver<UpstreamEvent>), UpstreamError> {
        let Some(api_key) = config.api_key.as_deref().filter(|k| !k.is_empty()) else {
            return Err(UpstreamError::Config(
                "OPENAI_API_KEY is not configured".to_string(),
            ));
        };

        let uri = format!("{}?model={}", config.url, config.model);
        let host = host_header(&uri)?;

        let request = http::Request::builder()
            .uri(&uri)
            .header("Authorization", format!("Bearer {api_key}"))
            .header("OpenAI-Beta", "realtime=v1")
            .header(
                "Sec-WebSocket-Key",
                tungstenite::handshake::client::generate_key(),
            )
            .header("Sec-WebSocket-Version", "13")
            .header("Connection", "Upgrade")
            .header("Upgrade", "websocket")
            .header("Host", host)
            .body(())
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        let (ws_stream, _response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(classify_handshake_error)?;

        info!(model = %config.model, "connected to realtime API");

        let (mut ws_sink, mut ws_stream) = ws_stream.split();

        // Session configuration goes out before the pump starts, so it is
        // on the wire ahead of any relayed frame.
        let session_update = ClientEvent::SessionUpdate {
            session: SessionPayload::new(settings, tools),
        };
        let json = serde_json::to_string(&session_update)
            .map_err(|e| UpstreamError::Transport(format!("failed to encode session config: {e}")))?;
        ws_sink
            .send(Message::Text(json.into()))
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        let (outbound_tx, mut outbound_rx) = mpsc::channel::<String>(WS_CHANNEL_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel::<UpstreamEvent>(WS_CHANNEL_CAPACITY);

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    outgoing = outbound_rx.recv() => match outgoing {
                        Some(text) => {
                            if let Err(e) = ws_sink.send(Message::Text(text.into())).await {
                                error!("failed to send upstream message: {e}");
                                break;
                            }
                        }
                        None => {
                            let _ = ws_sink.send(Message::Close(None)).await;
                            break;
                        }
                    },

                    incoming = ws_stream.next() => match incoming {
                        Some(Ok(Message::Text(text))) => {
                            let event = UpstreamEvent::parse(text.to_string());
                            if event_tx.send(event).await.is_err() {
                                // Bridge is gone; nothing left to relay to.
                                break;
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            if let Err(e) = ws_sink.send(Message::Pong(data)).await {
                                error!("failed to send pong upstream: {e}");
                            }
                        }
                        Some(Ok(Message::Close(_))) => {
                            info!("upstream closed the connection");
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            warn!("upstream websocket error: {e}");
                            break;
                        }
                        None => break,
                    },
                }
            }
            // Dropping event_tx here is what the bridge observes as teardown.
        });

        Ok((
            Self {
                outbound: outbound_tx,
                task,
            },
            event_rx,
        ))
    }

    /// Send a raw text frame upstream. Best-effort: once teardown has begun
    /// the message is logged and dropped.
    pub async fn send(&self, text: impl Into<String>) {
        if self.outbound.send(text.into()).await.is_err() {
            debug!("dropping message for closed upstream connection");
        }
    }

    /// Serialize and send a client event upstream.
    pub async fn send_event(&self, event: &ClientEvent) {
        match serde_json::to_string(event) {
            Ok(json) => self.send(json).await,
            Err(e) => error!("failed to serialize upstream event: {e}"),
        }
    }

    /// Tear the connection down and cancel the pump task.
    pub fn close(self) {
        self.task.abort();
    }
}

/// Host header value for the handshake, including the port when non-default.
fn host_header(uri: &str) -> Result<String, UpstreamError> {
    let parsed = Url::parse(uri)
        .map_err(|e| UpstreamError::Transport(format!("invalid upstream URL '{uri}': {e}")))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| UpstreamError::Transport(format!("upstream URL '{uri}' has no host")))?;
    Ok(match parsed.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

/// Map a handshake failure onto the error taxonomy. A 401/403 response is
/// an authentication failure; everything else is transport.
fn classify_handshake_error(error: tungstenite::Error) -> UpstreamError {
    match error {
        tungstenite::Error::Http(response)
            if response.status() == StatusCode::UNAUTHORIZED
                || response.status() == StatusCode::FORBIDDEN =>
        {
            UpstreamError::Auth(format!(
                "realtime API rejected the API key (HTTP {})",
                response.status()
            ))
        }
        other => UpstreamError::Transport(other.to_string()),
    }
}
