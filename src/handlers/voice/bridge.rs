//! Voice relay WebSocket handler.
//!
//! One [`BridgeSession`] per browser connection. The session owns both legs:
//! the downstream socket the browser speaks to and, once the conversation
//! starts, an [`UpstreamSession`] to the realtime API. Frames are relayed
//! verbatim in both directions; completed function calls are intercepted,
//! dispatched against the tool registry, and answered upstream before the
//! model is asked to continue.
//!
//! The upstream link is lazy: it is only dialed when the first client frame
//! arrives, and it is rebuilt the same way after an upstream loss. Connect
//! failures surface to the browser as in-band error events — the downstream
//! connection is never closed because the upstream leg failed.

use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;
use tracing::{debug, error, info, trace, warn};

use crate::core::upstream::{
    ClientEvent, ConversationItem, ServerEvent, ToolInvocation, UpstreamEvent, UpstreamSession,
};
use crate::state::AppState;
use crate::tools::ToolArguments;

use super::messages::{DownstreamEvent, OutboundFrame};

/// Channel buffer size toward the client socket.
const CHANNEL_BUFFER_SIZE: usize = 1024;

/// Maximum WebSocket frame size (10 MB)
const MAX_WS_FRAME_SIZE: usize = 10 * 1024 * 1024;

/// Maximum WebSocket message size (10 MB)
const MAX_WS_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

/// Voice relay WebSocket handler.
///
/// Upgrades the HTTP connection to WebSocket and runs the relay until the
/// client disconnects.
pub async fn voice_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    ws.max_frame_size(MAX_WS_FRAME_SIZE)
        .max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_voice_socket(socket, state))
}

/// Run one relay session over an upgraded socket.
async fn handle_voice_socket(socket: WebSocket, state: Arc<AppState>) {
    let connection_id = Uuid::new_v4();
    info!(connection = %connection_id, "client connected");

    let (mut sender, mut receiver) = socket.split();
    let (out_tx, mut out_rx) = mpsc::channel::<OutboundFrame>(CHANNEL_BUFFER_SIZE);

    // Sender task: the only writer to the client socket.
    let sender_task = tokio::spawn(async move {
        while let Some(frame) = out_rx.recv().await {
            let should_close = matches!(frame, OutboundFrame::Close);

            let result = match frame {
                OutboundFrame::Relay(text) => sender.send(Message::Text(text.into())).await,
                OutboundFrame::Event(event) => match serde_json::to_string(&event) {
                    Ok(json) => sender.send(Message::Text(json.into())).await,
                    Err(e) => {
                        error!("failed to serialize client event: {e}");
                        continue;
                    }
                },
                OutboundFrame::Close => sender.send(Message::Close(None)).await,
            };

            if result.is_err() || should_close {
                break;
            }
        }
    });

    let mut bridge = BridgeSession::new(connection_id, state, out_tx);

    loop {
        tokio::select! {
            frame = receiver.next() => match frame {
                Some(Ok(Message::Text(text))) => bridge.on_client_frame(text.as_str()).await,
                Some(Ok(Message::Binary(_))) => {
                    debug!(connection = %connection_id, "ignoring binary client frame");
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                Some(Ok(Message::Close(_))) | None => {
                    info!(connection = %connection_id, "client disconnected");
                    break;
                }
                Some(Err(e)) => {
                    warn!(connection = %connection_id, "client websocket error: {e}");
                    break;
                }
            },

            event = bridge.next_upstream_event() => match event {
                Some(event) => bridge.on_upstream_event(event).await,
                None => bridge.on_upstream_lost(),
            },
        }
    }

    bridge.shutdown();
    let _ = bridge.out.send(OutboundFrame::Close).await;
    let _ = sender_task.await;
    info!(connection = %connection_id, "session terminated");
}

/// Lifecycle of the upstream leg. Owned and mutated only by the bridge
/// task; the two flows (client frames, upstream events) meet in its select
/// loop rather than on shared mutable fields.
enum LinkState {
    /// No upstream; the next client frame triggers a connect attempt
    Idle,
    /// Connect attempt in flight
    Connecting,
    /// Bidirectional relay running
    Active {
        session: UpstreamSession,
        events: mpsc::Receiver<UpstreamEvent>,
    },
}

/// Per-connection relay state machine.
struct BridgeSession {
    connection_id: Uuid,
    state: Arc<AppState>,
    out: mpsc::Sender<OutboundFrame>,
    link: LinkState,
}

impl BridgeSession {
    fn new(connection_id: Uuid, state: Arc<AppState>, out: mpsc::Sender<OutboundFrame>) -> Self {
        Self {
            connection_id,
            state,
            out,
            link: LinkState::Idle,
        }
    }

    /// Next upstream event; pends forever while no upstream is active, so
    /// the select branch only fires when there is a link to drain.
    async fn next_upstream_event(&mut self) -> Option<UpstreamEvent> {
        match &mut self.link {
            LinkState::Active { events, .. } => events.recv().await,
            _ => std::future::pending().await,
        }
    }

    /// Handle one text frame from the client.
    async fn on_client_frame(&mut self, text: &str) {
        if let LinkState::Active { session, .. } = &self.link {
            session.send(text).await;
            return;
        }
        if matches!(self.link, LinkState::Connecting) {
            // The connect attempt is awaited inline, so no frame can be
            // observed in this state; dropped if that ever changes.
            debug!(connection = %self.connection_id, "dropping frame received mid-connect");
            return;
        }
        self.open_upstream(text).await;
    }

    /// Dial the upstream service. The attempt is awaited here, so frames
    /// the client sends meanwhile stay queued in the downstream socket and
    /// flow out, in order, once the relay is active.
    async fn open_upstream(&mut self, trigger: &str) {
        info!(connection = %self.connection_id, "starting upstream connection");
        self.link = LinkState::Connecting;

        let config = self.state.config.upstream_config();
        let settings = self.state.config.session_settings();
        let tools = self.state.tools.definitions();

        match UpstreamSession::connect(&config, &settings, tools).await {
            Ok((session, events)) => {
                // The session configuration is already on the wire; the
                // frame that triggered the attempt goes out right behind it.
                session.send(trigger).await;
                self.link = LinkState::Active { session, events };
                info!(connection = %self.connection_id, "relay active");
            }
            Err(error) => {
                warn!(connection = %self.connection_id, "upstream connect failed: {error}");
                self.link = LinkState::Idle;
                self.send_error(error.to_string()).await;
            }
        }
    }

    /// Handle one upstream event: relay it, then react to it.
    async fn on_upstream_event(&mut self, event: UpstreamEvent) {
        self.log_event(&event);
        let invocation = event.tool_invocation();

        if self.out.send(OutboundFrame::Relay(event.raw)).await.is_err() {
            // Client sender is gone; the outer loop is about to wind down.
            return;
        }

        if let Some(invocation) = invocation {
            self.handle_tool_call(invocation).await;
        }
    }

    /// Execute a completed function call and answer it upstream. The result
    /// item strictly precedes the continue signal; both are dropped if the
    /// upstream vanished while the CRM call was running.
    async fn handle_tool_call(&mut self, invocation: ToolInvocation) {
        info!(
            connection = %self.connection_id,
            tool = %invocation.name,
            args = %invocation.arguments,
            "executing tool call"
        );

        let result = match serde_json::from_str::<ToolArguments>(&invocation.arguments) {
            Ok(arguments) => self.state.tools.dispatch(&invocation.name, &arguments).await,
            Err(e) => {
                warn!(tool = %invocation.name, "malformed tool arguments: {e}");
                format!("Error: invalid tool arguments: {e}")
            }
        };
        debug!(tool = %invocation.name, "tool result: {result}");

        if let LinkState::Active { session, .. } = &self.link {
            session
                .send_event(&ClientEvent::ConversationItemCreate {
                    item: ConversationItem::function_call_output(&invocation.call_id, &result),
                })
                .await;
            session.send_event(&ClientEvent::ResponseCreate).await;
        } else {
            debug!(tool = %invocation.name, "upstream gone, discarding tool result");
        }
    }

    fn on_upstream_lost(&mut self) {
        info!(
            connection = %self.connection_id,
            "upstream connection lost; will rebuild on next client message"
        );
        self.link = LinkState::Idle;
    }

    fn shutdown(&mut self) {
        if let LinkState::Active { session, .. } =
            std::mem::replace(&mut self.link, LinkState::Idle)
        {
            session.close();
        }
    }

    async fn send_error(&self, message: String) {
        if self
            .out
            .send(OutboundFrame::Event(DownstreamEvent::Error { error: message }))
            .await
            .is_err()
        {
            debug!("client sender closed; dropping error event");
        }
    }

    fn log_event(&self, event: &UpstreamEvent) {
        match &event.event {
            Some(ServerEvent::SessionCreated {}) => {
                info!(connection = %self.connection_id, "upstream session created");
            }
            Some(ServerEvent::SessionUpdated {}) => {
                debug!(connection = %self.connection_id, "upstream session configured");
            }
            Some(ServerEvent::ResponseCreated {}) => {
                debug!(connection = %self.connection_id, "response started");
            }
            Some(ServerEvent::ResponseDone { response }) => {
                info!(
                    connection = %self.connection_id,
                    usage = ?response.usage,
                    "response done"
                );
            }
            Some(ServerEvent::SpeechStarted { .. }) => {
                debug!(connection = %self.connection_id, "user started speaking");
            }
            Some(ServerEvent::SpeechStopped { .. }) => {
                debug!(connection = %self.connection_id, "user stopped speaking");
            }
            Some(ServerEvent::TranscriptionCompleted { transcript }) => {
                info!(connection = %self.connection_id, "[user] {transcript}");
            }
            Some(ServerEvent::AudioTranscriptDone { transcript }) => {
                info!(connection = %self.connection_id, "[assistant] {transcript}");
            }
            // Too chatty to log per delta.
            Some(ServerEvent::AudioDelta {}) => {}
            Some(ServerEvent::Error { error }) => {
                error!(
                    connection = %self.connection_id,
                    "upstream error event: {} - {}",
                    error.error_type,
                    error.message
                );
            }
            Some(ServerEvent::FunctionCallArgumentsDone { name, .. }) => {
                info!(connection = %self.connection_id, tool = %name, "tool call completed upstream");
            }
            None => {
                trace!(connection = %self.connection_id, "relaying unrecognized event");
            }
        }
    }
}
