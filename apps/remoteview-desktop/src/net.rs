//! The network thread: a current-thread runtime driving the session loop.

use std::thread::JoinHandle;

use anyhow::{Context, Result};
use remoteview_scene::{Scene, SceneDelta};
use remoteview_session::{
    ConnectionState, LatencySample, Session, SessionCommand, SessionEvent, WsConnector,
};
use tokio::sync::mpsc;

/// What the render thread receives after each frame or state change.
#[derive(Debug)]
pub struct FrameUpdate {
    pub delta: SceneDelta,
    pub latency: Option<LatencySample>,
    pub state: ConnectionState,
}

/// Owns the network thread and both ends of its channels.
pub struct NetworkHandle {
    commands: mpsc::UnboundedSender<SessionCommand>,
    updates: crossbeam_channel::Receiver<FrameUpdate>,
    thread: Option<JoinHandle<()>>,
}

impl NetworkHandle {
    pub fn spawn() -> Result<Self> {
        let (command_tx, mut command_rx) = mpsc::unbounded_channel();
        let (update_tx, update_rx) = crossbeam_channel::unbounded();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("building network runtime")?;

        let thread = std::thread::Builder::new()
            .name("network".into())
            .spawn(move || {
                runtime.block_on(async move {
                    let mut session =
                        Session::with_scene(WsConnector, Scene::with_update_queue());
                    session
                        .run(&mut command_rx, |session, event| {
                            let latency = match event {
                                SessionEvent::Frame(report) => report.latency,
                                SessionEvent::State(state) => {
                                    tracing::info!(?state, "connection state changed");
                                    None
                                }
                            };
                            let update = FrameUpdate {
                                delta: session.take_scene_delta(),
                                latency,
                                state: session.state(),
                            };
                            if update_tx.send(update).is_err() {
                                tracing::debug!("render side has gone away");
                            }
                        })
                        .await;
                    tracing::info!(stats = ?session.stats(), "network thread finished");
                });
            })
            .context("spawning network thread")?;

        Ok(Self {
            commands: command_tx,
            updates: update_rx,
            thread: Some(thread),
        })
    }

    pub fn send(&self, command: SessionCommand) {
        if self.commands.send(command).is_err() {
            tracing::warn!("network thread is not running");
        }
    }

    /// Updates received since the last call, oldest first.
    pub fn drain(&self) -> impl Iterator<Item = FrameUpdate> + '_ {
        self.updates.try_iter()
    }

    /// Stop the session loop and wait for the thread.
    pub fn shutdown(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        self.send(SessionCommand::Shutdown);
        if thread.join().is_err() {
            tracing::error!("network thread panicked");
        }
    }
}

impl Drop for NetworkHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
