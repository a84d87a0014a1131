//! Voice session client: connection lifecycle, handshake, and inbound
//! routing.
//!
//! [`VoiceSession`] owns the duplex channel to the realtime service. One
//! spawned IO task serializes outbound events from a bounded queue and
//! routes inbound events to the playback scheduler, the transcript
//! recorder, the tool-call bridge and the session event channel. The
//! real-time audio threads are only ever touched through the ring buffer
//! and the capture gate flag.
//!
//! There is no reconnection logic anywhere in this module: a dropped
//! channel tears the session down to `Disconnected` and surfaces
//! `Connection(false)`; resuming is the caller's `connect()` call.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::audio::backend::AudioBackend;
use crate::audio::capture::CaptureStage;
use crate::audio::codec::{self, DecodeScratch};
use crate::audio::device::CpalBackend;
use crate::audio::playback::PlaybackScheduler;
use crate::error::{VoiceError, VoiceResult};

use super::bridge::{ToolCallBridge, TranscriptRecorder};
use super::config::{SessionOptions, WIRE_SAMPLE_RATE};
use super::events::{SessionEvent, TranscriptEntry, TranscriptRole};
use super::messages::{ClientEvent, ServerEvent, SessionConfig};

/// Capacity of the outbound event queue between the capture thread, the
/// control methods and the IO task.
const OUTBOUND_CHANNEL_CAPACITY: usize = 256;

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsStream = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

// =============================================================================
// Session state
// =============================================================================

/// Lifecycle state of a [`VoiceSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No channel, no devices
    #[default]
    Disconnected,
    /// Devices starting and handshake in flight
    Connecting,
    /// Channel open, audio flowing
    Open,
    /// Teardown in progress
    Closing,
    /// A failure is being cleaned up; always lands in `Disconnected`
    Error,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Disconnected => write!(f, "Disconnected"),
            SessionState::Connecting => write!(f, "Connecting"),
            SessionState::Open => write!(f, "Open"),
            SessionState::Closing => write!(f, "Closing"),
            SessionState::Error => write!(f, "Error"),
        }
    }
}

// =============================================================================
// Shared session state
// =============================================================================

/// State shared between the session handle and its IO task.
struct SessionShared {
    state: RwLock<SessionState>,
    /// Capture gate: frames are forwarded only while this is set.
    link_open: Arc<AtomicBool>,
    scheduler: Arc<PlaybackScheduler>,
    backend: Mutex<Box<dyn AudioBackend>>,
    recorder: TranscriptRecorder,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl SessionShared {
    /// Run the common cleanup path, in order: capture gate, devices,
    /// playback state. Idempotent; emits `Connection(false)` only on the
    /// transition out of an open link.
    fn teardown(&self) {
        let was_open = self.link_open.swap(false, Ordering::SeqCst);
        self.backend.lock().stop();
        // The output stream is stopped, so clearing the ring is legal.
        self.scheduler.stop();
        *self.state.write() = SessionState::Disconnected;
        if was_open {
            let _ = self.events.send(SessionEvent::Connection(false));
        }
    }
}

// =============================================================================
// VoiceSession
// =============================================================================

/// Bidirectional voice streaming session.
///
/// Construct with [`new`](Self::new) (hardware devices) or
/// [`with_backend`](Self::with_backend) (any [`AudioBackend`], e.g.
/// [`NullBackend`](crate::audio::NullBackend) for headless use). Consume
/// [`SessionEvent`]s from the receiver returned alongside the session.
///
/// # Example
///
/// ```rust,ignore
/// use voicelink::{SessionOptions, VoiceSession};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let options = SessionOptions::from_env()?;
///     let (mut session, mut events) = VoiceSession::new(options);
///     session.connect().await?;
///
///     while let Some(event) = events.recv().await {
///         println!("{event:?}");
///     }
///     session.disconnect().await?;
///     Ok(())
/// }
/// ```
pub struct VoiceSession {
    options: SessionOptions,
    shared: Arc<SessionShared>,
    outbound: Mutex<Option<mpsc::Sender<ClientEvent>>>,
    io_task: Option<JoinHandle<()>>,
}

impl VoiceSession {
    /// Session against the system default audio devices.
    pub fn new(options: SessionOptions) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        Self::with_backend(options, Box::new(CpalBackend::new()))
    }

    /// Session with a caller-supplied audio backend.
    pub fn with_backend(
        options: SessionOptions,
        backend: Box<dyn AudioBackend>,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(SessionShared {
            state: RwLock::new(SessionState::Disconnected),
            link_open: Arc::new(AtomicBool::new(false)),
            scheduler: Arc::new(PlaybackScheduler::new(WIRE_SAMPLE_RATE)),
            backend: Mutex::new(backend),
            recorder: TranscriptRecorder::new(),
            events: events_tx,
        });
        let session = Self {
            options,
            shared,
            outbound: Mutex::new(None),
            io_task: None,
        };
        (session, events_rx)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        *self.shared.state.read()
    }

    /// Fast check for an open channel.
    pub fn is_open(&self) -> bool {
        self.shared.link_open.load(Ordering::SeqCst)
    }

    /// Snapshot of the session transcript, in order.
    pub fn transcript(&self) -> Vec<TranscriptEntry> {
        self.shared.recorder.entries()
    }

    /// Discard the session transcript.
    pub fn clear_transcript(&self) {
        self.shared.recorder.clear();
    }

    /// Playback diagnostics handle (buffered samples, underruns, overflow).
    pub fn playback(&self) -> Arc<PlaybackScheduler> {
        self.shared.scheduler.clone()
    }

    /// Connect to the realtime service.
    ///
    /// Legal only from `Disconnected`; resolves or rejects exactly once for
    /// any terminal outcome. Audio devices start first, so a capture or
    /// playback failure rejects before any channel exists; on entering
    /// `Open` the session configuration is sent once, the capture gate
    /// opens, and `Connection(true)` is emitted.
    pub async fn connect(&mut self) -> VoiceResult<()> {
        {
            let mut state = self.shared.state.write();
            if *state != SessionState::Disconnected {
                return Err(VoiceError::InvalidState(format!(
                    "connect requires Disconnected, session is {state}"
                )));
            }
            *state = SessionState::Connecting;
        }

        match self.establish().await {
            Ok(()) => Ok(()),
            Err(e) => {
                // Error runs the same cleanup as Closing, then lands in
                // Disconnected; connect still rejects exactly once.
                *self.shared.state.write() = SessionState::Error;
                *self.outbound.lock() = None;
                if let Some(handle) = self.io_task.take() {
                    handle.abort();
                }
                self.shared.teardown();
                Err(e)
            }
        }
    }

    async fn establish(&mut self) -> VoiceResult<()> {
        self.options.validate()?;

        // New session, fresh transcript.
        self.shared.recorder.clear();

        let (out_tx, out_rx) = mpsc::channel::<ClientEvent>(OUTBOUND_CHANNEL_CAPACITY);

        // Devices first: capture or playback errors fail fast here, before
        // any channel is opened.
        let capture = CaptureStage::new(out_tx.clone(), self.shared.link_open.clone());
        self.shared
            .backend
            .lock()
            .start(capture, self.shared.scheduler.clone())?;

        let request = build_ws_request(&self.options)?;
        let (ws, _response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| VoiceError::ConnectionFailed(e.to_string()))?;
        tracing::info!(endpoint = %self.options.endpoint, "connected to realtime service");

        let (ws_sink, ws_stream) = ws.split();
        let router = EventRouter::new(self.shared.clone());
        self.io_task = Some(tokio::spawn(run_io_loop(
            ws_sink,
            ws_stream,
            out_rx,
            router,
            self.shared.clone(),
        )));

        // Entering Open: declare the session exactly once, then let audio
        // frames through.
        out_tx
            .send(ClientEvent::SessionUpdate {
                session: SessionConfig::from_options(&self.options),
            })
            .await
            .map_err(|e| VoiceError::WebSocket(e.to_string()))?;

        *self.outbound.lock() = Some(out_tx);
        *self.shared.state.write() = SessionState::Open;
        self.shared.link_open.store(true, Ordering::SeqCst);
        let _ = self.shared.events.send(SessionEvent::Connection(true));
        Ok(())
    }

    /// Disconnect and release all resources.
    ///
    /// Legal from any state and idempotent: the second call is a no-op.
    /// Teardown order is channel, capture, playback (clearing its ring),
    /// audio devices; afterwards the session is eligible for a fresh
    /// `connect()`.
    pub async fn disconnect(&mut self) -> VoiceResult<()> {
        {
            let mut state = self.shared.state.write();
            if *state == SessionState::Disconnected && self.io_task.is_none() {
                return Ok(());
            }
            *state = SessionState::Closing;
        }

        // Channel first.
        *self.outbound.lock() = None;
        if let Some(handle) = self.io_task.take() {
            handle.abort();
            let _ = handle.await;
        }

        self.shared.teardown();
        tracing::info!("session disconnected");
        Ok(())
    }

    /// Send an out-of-band user text message into the conversation.
    pub async fn send_text(&self, text: &str) -> VoiceResult<()> {
        self.send_event(ClientEvent::ConversationItemCreate {
            item: super::messages::ConversationItem::user_text(text),
        })
        .await
    }

    /// Cancel the in-flight response (barge-in).
    pub async fn cancel_response(&self) -> VoiceResult<()> {
        self.send_event(ClientEvent::ResponseCancel).await
    }

    /// Commit the input audio buffer (manual turn detection).
    pub async fn commit_audio_buffer(&self) -> VoiceResult<()> {
        self.send_event(ClientEvent::InputAudioBufferCommit).await
    }

    /// Discard the uncommitted input audio buffer.
    pub async fn clear_audio_buffer(&self) -> VoiceResult<()> {
        self.send_event(ClientEvent::InputAudioBufferClear).await
    }

    async fn send_event(&self, event: ClientEvent) -> VoiceResult<()> {
        if !self.is_open() {
            return Err(VoiceError::NotConnected);
        }
        let tx = self
            .outbound
            .lock()
            .clone()
            .ok_or(VoiceError::NotConnected)?;
        tx.send(event)
            .await
            .map_err(|e| VoiceError::WebSocket(e.to_string()))
    }
}

/// Build the upgrade request with bearer authentication.
fn build_ws_request(options: &SessionOptions) -> VoiceResult<http::Request<()>> {
    let url = options.ws_url();
    let parsed = url::Url::parse(&url)
        .map_err(|e| VoiceError::InvalidConfiguration(format!("endpoint: {e}")))?;
    let host = match (parsed.host_str(), parsed.port()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_string(),
        (None, _) => {
            return Err(VoiceError::InvalidConfiguration(
                "endpoint has no host".to_string(),
            ));
        }
    };

    http::Request::builder()
        .uri(&url)
        .header("Authorization", format!("Bearer {}", options.api_key))
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
        .map_err(|e| VoiceError::ConnectionFailed(e.to_string()))
}

// =============================================================================
// IO task
// =============================================================================

/// Serialize outbound events and route inbound ones until either direction
/// ends, then run the common teardown.
async fn run_io_loop(
    mut ws_sink: WsSink,
    mut ws_stream: WsStream,
    mut out_rx: mpsc::Receiver<ClientEvent>,
    mut router: EventRouter,
    shared: Arc<SessionShared>,
) {
    loop {
        tokio::select! {
            Some(event) = out_rx.recv() => {
                let json = match serde_json::to_string(&event) {
                    Ok(json) => json,
                    Err(e) => {
                        tracing::error!("failed to serialize client event: {e}");
                        continue;
                    }
                };
                if let Err(e) = ws_sink.send(Message::Text(json.into())).await {
                    tracing::error!("failed to send message: {e}");
                    *shared.state.write() = SessionState::Error;
                    break;
                }
            }

            Some(msg) = ws_stream.next() => {
                match msg {
                    Ok(Message::Text(text)) => {
                        match serde_json::from_str::<ServerEvent>(&text) {
                            Ok(event) => router.route(event),
                            Err(e) => {
                                tracing::warn!("ignoring unparseable server message: {e}");
                            }
                        }
                    }
                    Ok(Message::Close(_)) => {
                        tracing::info!("channel closed by peer");
                        break;
                    }
                    Ok(Message::Ping(data)) => {
                        if let Err(e) = ws_sink.send(Message::Pong(data)).await {
                            tracing::error!("failed to send pong: {e}");
                        }
                    }
                    Err(e) => {
                        tracing::error!("channel error: {e}");
                        *shared.state.write() = SessionState::Error;
                        break;
                    }
                    _ => {}
                }
            }

            else => break,
        }
    }

    // A remotely-dropped channel runs the same cleanup as an explicit
    // disconnect; no reconnection is attempted.
    shared.teardown();
    tracing::debug!("session io task ended");
}

// =============================================================================
// Inbound routing
// =============================================================================

/// Routes parsed inbound events to the pipeline and the event channel.
///
/// Owns the decode scratch arena, sized once at session start; audio deltas
/// stream through it in bounded chunks straight into the playback ring.
struct EventRouter {
    shared: Arc<SessionShared>,
    bridge: ToolCallBridge,
    scratch: DecodeScratch,
}

impl EventRouter {
    fn new(shared: Arc<SessionShared>) -> Self {
        Self {
            shared,
            bridge: ToolCallBridge::new(),
            scratch: DecodeScratch::new(),
        }
    }

    fn route(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::AudioDelta { delta, .. } => {
                let scheduler = &self.shared.scheduler;
                match codec::decode_frame(&delta, &mut self.scratch, |chunk| {
                    scheduler.enqueue(chunk);
                }) {
                    Ok(samples) => tracing::trace!(samples, "audio delta enqueued"),
                    Err(e) => tracing::warn!("discarding undecodable audio delta: {e}"),
                }
            }

            ServerEvent::TextDelta { delta } => {
                let _ = self.shared.events.send(SessionEvent::Text(delta));
            }

            ServerEvent::TranscriptionCompleted { transcript, .. } => {
                tracing::debug!("user transcript: {transcript}");
                let entry = self
                    .shared
                    .recorder
                    .append(TranscriptRole::User, transcript);
                let _ = self.shared.events.send(SessionEvent::Transcript(entry));
            }

            ServerEvent::OutputItemAdded { item } => {
                // Message items carry the assistant's text, possibly split
                // across several fragments. Function-call items surface via
                // FunctionCallArgumentsDone instead.
                if item.item_type == "message"
                    && let Some(text) = item.joined_text()
                {
                    let entry = self.shared.recorder.append(TranscriptRole::Assistant, text);
                    let _ = self.shared.events.send(SessionEvent::Transcript(entry));
                }
            }

            ServerEvent::FunctionCallArgumentsDone {
                name,
                call_id,
                arguments,
            } => {
                if let Some(call) = self.bridge.shape(name, call_id, &arguments) {
                    let _ = self.shared.events.send(SessionEvent::ToolCall(call));
                }
            }

            ServerEvent::ResponseDone { response } => {
                tracing::debug!(id = ?response.map(|r| r.id), "response done");
            }

            ServerEvent::SessionCreated { session } => {
                tracing::info!(id = %session.id, "realtime session created");
            }

            ServerEvent::SpeechStarted { audio_start_ms } => {
                tracing::debug!(audio_start_ms, "speech started");
            }

            ServerEvent::SpeechStopped { audio_end_ms } => {
                tracing::debug!(audio_end_ms, "speech stopped");
            }

            // Logged only: the session error surface is the event stream,
            // and a service error never closes the channel by itself.
            ServerEvent::Error { error } => {
                tracing::error!(
                    code = ?error.code,
                    kind = ?error.error_type,
                    "service error: {}",
                    error.message
                );
            }

            ServerEvent::AudioTranscriptDelta { .. } => {}

            ServerEvent::AudioTranscriptDone { transcript } => {
                tracing::debug!("assistant speech transcript: {transcript}");
            }

            ServerEvent::Unknown => {
                tracing::trace!("unhandled server event kind");
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
