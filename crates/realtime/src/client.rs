//! WebSocket connection to the realtime endpoint.

use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::error::{Error, Result};
use crate::protocol::{ClientEvent, ServerEvent, SessionConfig};

pub const OPENAI_REALTIME_URL: &str = "wss://api.openai.com/v1/realtime";

pub const DEFAULT_MODEL: &str = "gpt-4o-realtime-preview";

/// Default bound on connect plus `session.created`.
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(15);

const CHANNEL_CAPACITY: usize = 64;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Where and how to connect.
#[derive(Clone)]
pub struct ClientConfig {
    pub url: String,
    pub model: String,
    pub api_key: String,
    pub handshake_timeout: Duration,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            url: OPENAI_REALTIME_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: api_key.into(),
            handshake_timeout: HANDSHAKE_TIMEOUT,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_handshake_timeout(mut self, handshake_timeout: Duration) -> Self {
        self.handshake_timeout = handshake_timeout;
        self
    }

    /// Full WebSocket URL including the model query parameter.
    pub fn endpoint(&self) -> String {
        format!("{}?model={}", self.url, self.model)
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("url", &self.url)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .field("handshake_timeout", &self.handshake_timeout)
            .finish()
    }
}

enum Frame {
    Event(ClientEvent),
    Close,
}

/// Sends client events to the socket task.
#[derive(Clone)]
pub struct EventSender {
    frames: mpsc::Sender<Frame>,
}

impl EventSender {
    pub async fn send(&self, event: ClientEvent) -> Result<()> {
        self.frames
            .send(Frame::Event(event))
            .await
            .map_err(|_| Error::Closed)
    }

    /// Ask the socket task to send a close frame and stop.
    pub async fn close(&self) -> Result<()> {
        self.frames.send(Frame::Close).await.map_err(|_| Error::Closed)
    }

    pub fn is_closed(&self) -> bool {
        self.frames.is_closed()
    }
}

/// An established realtime session.
pub struct Connection {
    session_id: String,
    sender: EventSender,
    events: mpsc::Receiver<ServerEvent>,
}

impl Connection {
    /// Connect, wait for `session.created` and push `session`.
    ///
    /// The whole handshake is bounded by `config.handshake_timeout`.
    pub async fn open(config: &ClientConfig, session: SessionConfig) -> Result<Self> {
        let mut request = config
            .endpoint()
            .into_client_request()
            .map_err(|e| Error::Connect(e.to_string()))?;

        let bearer = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|e| Error::Connect(e.to_string()))?;
        let headers = request.headers_mut();
        headers.insert(AUTHORIZATION, bearer);
        headers.insert("OpenAI-Beta", HeaderValue::from_static("realtime=v1"));

        let (socket, session_id) = timeout(config.handshake_timeout, async {
            let (socket, _response) = connect_async(request).await?;
            let (sink, mut stream) = socket.split();
            let session_id = await_session(&mut stream).await?;
            Ok::<_, Error>(((sink, stream), session_id))
        })
        .await
        .map_err(|_| Error::Timeout)??;

        tracing::info!(session_id = %session_id, model = %config.model, "realtime session created");

        let (mut sink, stream) = socket;
        let update = serde_json::to_string(&ClientEvent::SessionUpdate { session })?;
        sink.send(Message::Text(update.into())).await?;

        let (frames_tx, frames_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (events_tx, events_rx) = mpsc::channel(CHANNEL_CAPACITY);
        tokio::spawn(run_socket(sink, stream, frames_rx, events_tx));

        Ok(Self {
            session_id,
            sender: EventSender { frames: frames_tx },
            events: events_rx,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Split into the outgoing sender and the incoming event stream.
    ///
    /// The event stream ends when the socket closes.
    pub fn into_parts(self) -> (EventSender, mpsc::Receiver<ServerEvent>) {
        (self.sender, self.events)
    }
}

async fn await_session(stream: &mut SplitStream<Socket>) -> Result<String> {
    while let Some(msg) = stream.next().await {
        match msg? {
            Message::Text(text) => match serde_json::from_str::<ServerEvent>(&text) {
                Ok(ServerEvent::SessionCreated { session }) => return Ok(session.id),
                Ok(ServerEvent::Error { error }) => return Err(Error::Api(error.to_string())),
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "failed to parse server event during handshake"),
            },
            Message::Close(frame) => {
                return Err(Error::Handshake(format!(
                    "closed before session was created: {frame:?}"
                )));
            }
            _ => {}
        }
    }
    Err(Error::Handshake("stream ended before session was created".into()))
}

async fn run_socket(
    mut sink: SplitSink<Socket, Message>,
    mut stream: SplitStream<Socket>,
    mut frames: mpsc::Receiver<Frame>,
    events: mpsc::Sender<ServerEvent>,
) {
    loop {
        tokio::select! {
            frame = frames.recv() => match frame {
                Some(Frame::Event(event)) => {
                    let json = match serde_json::to_string(&event) {
                        Ok(json) => json,
                        Err(e) => {
                            tracing::error!(error = %e, "failed to serialize client event");
                            continue;
                        }
                    };
                    if let Err(e) = sink.send(Message::Text(json.into())).await {
                        tracing::warn!(error = %e, "failed to send realtime event");
                        break;
                    }
                }
                Some(Frame::Close) | None => {
                    let _ = sink.send(Message::Close(None)).await;
                    tracing::debug!("realtime connection closed by client");
                    break;
                }
            },
            msg = stream.next() => match msg {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<ServerEvent>(&text) {
                    Ok(ServerEvent::Unknown) => {}
                    Ok(event) => {
                        if events.send(event).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => tracing::warn!(error = %e, "failed to parse server event"),
                },
                Some(Ok(Message::Ping(data))) => {
                    if let Err(e) = sink.send(Message::Pong(data)).await {
                        tracing::warn!(error = %e, "failed to send pong");
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    tracing::info!(?frame, "realtime connection closed by server");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "realtime socket error");
                    break;
                }
                None => break,
            },
        }
    }
}
