use std::fmt;

use bytes::Bytes;
use remoteview_common::{Timestamp, now_millis};
use remoteview_input::{DeviceInput, InputEncoder};
use remoteview_protocol::{
    Ack, Message, MessageHeader, MessageKind, ProtocolError, SceneRequest,
};
use remoteview_scene::{Scene, SceneDelta, SceneError};
use serde::{Serialize, Serializer};
use tokio::sync::mpsc;

use crate::latency::{LatencySample, LatencyTracker};
use crate::transport::{Connector, Inbound, Outbound, Transport, TransportError};

/// Connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ConnectionState {
    /// No connection has been attempted yet.
    Disconnected,
    Connecting,
    Open,
    /// The last connection failed, was closed by the peer, or was torn down.
    Closed,
}

/// Errors surfaced by session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("connection is not open")]
    NotOpen,
}

/// What applying one inbound frame did.
///
/// Serializes as `{"outcome": "<variant>", "detail": ...}`; errors are
/// rendered with their display text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum FrameOutcome {
    MeshReplaced {
        vertex_count: u32,
        index_count: u32,
    },
    MeshRejected(#[serde(serialize_with = "display")] SceneError),
    RegionPatched {
        vertex_offset: u32,
        vertex_count: u32,
        index_offset: u32,
        index_count: u32,
    },
    PatchRejected(#[serde(serialize_with = "display")] SceneError),
    ViewUpdated,
    ProjectionUpdated,
    /// The frame could not be decoded and was discarded.
    Dropped(#[serde(serialize_with = "display")] ProtocolError),
}

impl FrameOutcome {
    /// The acknowledgement owed to the server for this outcome.
    ///
    /// Rejected mesh updates are still acknowledged: the frame was consumed,
    /// and withholding the ack would stall the server's flow control.
    pub fn ack(&self) -> Option<Ack> {
        match self {
            FrameOutcome::MeshReplaced { .. } | FrameOutcome::MeshRejected(_) => Some(Ack::Got),
            FrameOutcome::RegionPatched { .. } | FrameOutcome::PatchRejected(_) => {
                Some(Ack::GotRegion)
            }
            FrameOutcome::ViewUpdated
            | FrameOutcome::ProjectionUpdated
            | FrameOutcome::Dropped(_) => None,
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(
            self,
            FrameOutcome::MeshRejected(_) | FrameOutcome::PatchRejected(_)
        )
    }
}

fn display<T: fmt::Display, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

fn ack_text<S: Serializer>(ack: &Option<Ack>, serializer: S) -> Result<S::Ok, S::Error> {
    ack.map(Ack::as_str).serialize(serializer)
}

/// Result of handling one frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameReport {
    #[serde(flatten)]
    pub outcome: FrameOutcome,
    /// Present whenever the header could be decoded, whatever the kind.
    pub latency: Option<LatencySample>,
    /// The acknowledgement that was sent, if any.
    #[serde(serialize_with = "ack_text")]
    pub ack: Option<Ack>,
}

/// Something the session loop reports to its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A frame was handled and any acknowledgement has been sent.
    Frame(FrameReport),
    /// The connection state differs from what it was before the last wake.
    State(ConnectionState),
}

/// Apply a decoded message to `scene`.
///
/// Scene errors are reported in the outcome, never propagated: a rejected
/// mutation leaves the scene as it was.
pub fn apply_message(scene: &mut Scene, message: Message) -> FrameOutcome {
    match message {
        Message::FullMesh(mesh) => {
            let vertex_count = mesh.vertex_count();
            let index_count = mesh.index_count();
            let (vertices, indices) = mesh.into_parts();
            match scene.buffer.replace_all(vertices, indices) {
                Ok(()) => FrameOutcome::MeshReplaced {
                    vertex_count,
                    index_count,
                },
                Err(e) => {
                    tracing::warn!(error = %e, "full mesh rejected");
                    FrameOutcome::MeshRejected(e)
                }
            }
        }
        Message::ViewMatrix(m) => {
            scene.transforms.set_view(m);
            FrameOutcome::ViewUpdated
        }
        Message::ProjMatrix(m) => {
            scene.transforms.set_projection(m);
            FrameOutcome::ProjectionUpdated
        }
        Message::RegionPatch {
            vertex_offset,
            index_offset,
            mesh,
        } => {
            let vertex_count = mesh.vertex_count();
            let index_count = mesh.index_count();
            let (vertices, indices) = mesh.into_parts();
            match scene.buffer.patch_region(
                vertex_offset,
                vertex_count,
                index_offset,
                index_count,
                vertices,
                indices,
            ) {
                Ok(()) => FrameOutcome::RegionPatched {
                    vertex_offset,
                    vertex_count,
                    index_offset,
                    index_count,
                },
                Err(e) => {
                    tracing::warn!(error = %e, "region patch rejected");
                    FrameOutcome::PatchRejected(e)
                }
            }
        }
    }
}

/// Per-session counters for instrumentation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub frames_received: u64,
    pub frames_dropped: u64,
    pub patches_rejected: u64,
    pub acks_sent: u64,
    pub inputs_sent: u64,
    pub inputs_dropped: u64,
    pub scene_requests_sent: u64,
}

/// Requests for a running session loop.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    /// Tear down any live connection, then connect to the address.
    Connect(String),
    Disconnect,
    Input(DeviceInput),
    RequestScene(SceneRequest),
    /// Close the connection and leave the loop.
    Shutdown,
}

enum Wake {
    Inbound(Option<Result<Inbound, TransportError>>),
    Command(Option<SessionCommand>),
}

/// A single point-to-point session with a render server.
///
/// The session is the only writer of its [`Scene`]. Frames are handled one at
/// a time in arrival order; each frame's mutation and acknowledgement finish
/// before the next frame is read.
pub struct Session<C: Connector> {
    connector: C,
    transport: Option<C::Transport>,
    state: ConnectionState,
    address: Option<String>,
    scene: Scene,
    latency: LatencyTracker,
    encoder: InputEncoder,
    stats: SessionStats,
}

impl<C: Connector> Session<C> {
    /// A session whose scene keeps no GPU update queue.
    pub fn new(connector: C) -> Self {
        Self::with_scene(connector, Scene::new())
    }

    /// Use [`Scene::with_update_queue`] when a renderer drains
    /// [`Session::take_scene_delta`].
    pub fn with_scene(connector: C, scene: Scene) -> Self {
        Self {
            connector,
            transport: None,
            state: ConnectionState::Disconnected,
            address: None,
            scene,
            latency: LatencyTracker::default(),
            encoder: InputEncoder::new(),
            stats: SessionStats::default(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    /// Address of the current or most recent connection.
    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    /// Read-only view of the streamed scene.
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Drain scene changes for a renderer on another thread.
    pub fn take_scene_delta(&mut self) -> SceneDelta {
        SceneDelta::capture(&mut self.scene)
    }

    pub fn latency(&self) -> &LatencyTracker {
        &self.latency
    }

    pub fn latency_mut(&mut self) -> &mut LatencyTracker {
        &mut self.latency
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Timestamp of the last input event sent upstream.
    pub fn last_input_sent(&self) -> Option<Timestamp> {
        self.encoder.last_sent()
    }

    /// Connect to `address`, closing any live connection first.
    ///
    /// On failure the session is left `Closed`; nothing is retried.
    pub async fn connect(&mut self, address: &str) -> Result<(), SessionError> {
        self.disconnect().await;

        tracing::info!(address, "connecting");
        self.state = ConnectionState::Connecting;
        self.address = Some(address.to_owned());
        match self.connector.connect(address).await {
            Ok(transport) => {
                self.transport = Some(transport);
                self.state = ConnectionState::Open;
                tracing::info!(address, "connection open");
                Ok(())
            }
            Err(e) => {
                self.state = ConnectionState::Closed;
                tracing::warn!(address, error = %e, "connection failed");
                Err(e.into())
            }
        }
    }

    /// Close the live connection, if any.
    pub async fn disconnect(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            if let Err(e) = transport.close().await {
                tracing::debug!(error = %e, "error while closing connection");
            }
            self.state = ConnectionState::Closed;
            tracing::info!("connection closed");
        }
    }

    /// Decode and apply one inbound binary frame, then send any
    /// acknowledgement it requires.
    ///
    /// Undecodable frames are dropped without an acknowledgement and the
    /// session stays open. The only error is a failure to send the ack.
    pub async fn handle_frame(
        &mut self,
        data: Bytes,
        received_at: Timestamp,
    ) -> Result<FrameReport, SessionError> {
        self.stats.frames_received += 1;
        let mut buf = data;

        let header = match MessageHeader::decode(&mut buf) {
            Ok(header) => header,
            Err(e) => return Ok(self.drop_frame(None, e)),
        };
        let sample = LatencySample::new(header.timestamps, received_at);
        self.latency.record(sample);

        let message = match MessageKind::try_from(header.kind)
            .and_then(|kind| Message::decode(kind, &mut buf))
        {
            Ok(message) => message,
            Err(e) => return Ok(self.drop_frame(Some(sample), e)),
        };

        let outcome = self.apply(message);
        let ack = outcome.ack();
        if let Some(ack) = ack {
            self.send(Outbound::Text(ack.as_str())).await?;
            self.stats.acks_sent += 1;
        }
        Ok(FrameReport {
            outcome,
            latency: Some(sample),
            ack,
        })
    }

    fn drop_frame(&mut self, latency: Option<LatencySample>, error: ProtocolError) -> FrameReport {
        self.stats.frames_dropped += 1;
        tracing::warn!(%error, "dropping frame");
        FrameReport {
            outcome: FrameOutcome::Dropped(error),
            latency,
            ack: None,
        }
    }

    fn apply(&mut self, message: Message) -> FrameOutcome {
        let outcome = apply_message(&mut self.scene, message);
        if let FrameOutcome::PatchRejected(_) = outcome {
            self.stats.patches_rejected += 1;
        }
        outcome
    }

    /// Encode and send a device input, if the connection is open.
    ///
    /// Returns whether an event went out. Input while not open is dropped,
    /// never queued.
    pub async fn send_input(
        &mut self,
        input: &DeviceInput,
        timestamp: Timestamp,
    ) -> Result<bool, SessionError> {
        if !self.is_open() {
            self.stats.inputs_dropped += 1;
            tracing::trace!(?input, "dropping input while not connected");
            return Ok(false);
        }
        let Some(event) = self.encoder.encode(input, timestamp) else {
            return Ok(false);
        };
        self.send(Outbound::Binary(Bytes::copy_from_slice(&event.encode())))
            .await?;
        self.stats.inputs_sent += 1;
        Ok(true)
    }

    /// Ask the server to switch scenes, if the connection is open.
    pub async fn request_scene(&mut self, request: SceneRequest) -> Result<bool, SessionError> {
        if !self.is_open() {
            tracing::debug!(?request, "not connected, scene request ignored");
            return Ok(false);
        }
        self.send(Outbound::Text(request.as_str())).await?;
        self.stats.scene_requests_sent += 1;
        Ok(true)
    }

    async fn send(&mut self, message: Outbound) -> Result<(), SessionError> {
        let transport = self.transport.as_mut().ok_or(SessionError::NotOpen)?;
        if let Err(e) = transport.send(message).await {
            tracing::warn!(error = %e, "send failed");
            self.mark_closed();
            return Err(e.into());
        }
        Ok(())
    }

    fn mark_closed(&mut self) {
        self.transport = None;
        self.state = ConnectionState::Closed;
    }

    /// Wait for the next binary frame and handle it.
    ///
    /// Text messages from the server are logged and skipped. Returns `None`
    /// when there is no connection or it has just closed.
    pub async fn next_frame(&mut self) -> Option<FrameReport> {
        loop {
            let inbound = self.transport.as_mut()?.recv().await;
            if let Some(report) = self.on_inbound(inbound).await {
                return Some(report);
            }
            if !self.is_open() {
                return None;
            }
        }
    }

    async fn on_inbound(
        &mut self,
        inbound: Option<Result<Inbound, TransportError>>,
    ) -> Option<FrameReport> {
        match inbound {
            Some(Ok(Inbound::Binary(data))) => match self.handle_frame(data, now_millis()).await {
                Ok(report) => Some(report),
                Err(e) => {
                    tracing::warn!(error = %e, "failed to acknowledge frame");
                    None
                }
            },
            Some(Ok(Inbound::Text(text))) => {
                tracing::debug!(%text, "ignoring text message from server");
                None
            }
            Some(Err(e)) => {
                tracing::warn!(error = %e, "connection error");
                self.mark_closed();
                None
            }
            None => {
                tracing::info!("server closed the connection");
                self.mark_closed();
                None
            }
        }
    }

    /// Drive the session until [`SessionCommand::Shutdown`] or until the
    /// command channel closes.
    ///
    /// Inbound frames and commands are served from a single task, so frame
    /// handling never interleaves with input sends. `on_event` runs after
    /// each handled frame, with the acknowledgement already sent, and after
    /// any wake that left the connection in a different state. A peer close,
    /// a failed connect and the final shutdown all surface as
    /// [`SessionEvent::State`].
    pub async fn run<F>(&mut self, commands: &mut mpsc::UnboundedReceiver<SessionCommand>, mut on_event: F)
    where
        F: FnMut(&mut Self, &SessionEvent),
    {
        loop {
            let before = self.state;
            let wake = match self.transport.as_mut() {
                Some(transport) => tokio::select! {
                    inbound = transport.recv() => Wake::Inbound(inbound),
                    command = commands.recv() => Wake::Command(command),
                },
                None => Wake::Command(commands.recv().await),
            };

            let finished = match wake {
                Wake::Inbound(inbound) => {
                    if let Some(report) = self.on_inbound(inbound).await {
                        on_event(self, &SessionEvent::Frame(report));
                    }
                    false
                }
                Wake::Command(None | Some(SessionCommand::Shutdown)) => {
                    self.disconnect().await;
                    true
                }
                Wake::Command(Some(command)) => {
                    self.execute(command).await;
                    false
                }
            };

            if self.state != before {
                on_event(self, &SessionEvent::State(self.state));
            }
            if finished {
                tracing::debug!("session loop finished");
                return;
            }
        }
    }

    async fn execute(&mut self, command: SessionCommand) {
        let result = match command {
            SessionCommand::Connect(address) => self.connect(&address).await,
            SessionCommand::Disconnect => {
                self.disconnect().await;
                Ok(())
            }
            SessionCommand::Input(input) => self.send_input(&input, now_millis()).await.map(drop),
            SessionCommand::RequestScene(request) => self.request_scene(request).await.map(drop),
            SessionCommand::Shutdown => Ok(()),
        };
        if let Err(e) = result {
            tracing::warn!(error = %e, "session command failed");
        }
    }
}
