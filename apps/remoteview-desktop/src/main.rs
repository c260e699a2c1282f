mod input;
mod net;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use remoteview_common::now_millis;
use remoteview_input::DeviceInput;
use remoteview_protocol::SceneRequest;
use remoteview_render_wgpu::{GpuScene, capabilities};
use remoteview_session::{ConnectionState, LatencyTracker, SessionCommand};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use crate::net::NetworkHandle;

const TITLE_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Clone, Copy, ValueEnum)]
enum SceneArg {
    Cube,
    Tetra,
}

impl From<SceneArg> for SceneRequest {
    fn from(arg: SceneArg) -> Self {
        match arg {
            SceneArg::Cube => SceneRequest::Cube,
            SceneArg::Tetra => SceneRequest::Tetra,
        }
    }
}

#[derive(Parser)]
#[command(name = "remoteview-desktop", about = "Remote-render desktop client")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Render server address
    #[arg(long, env = "REMOTEVIEW_ADDR", default_value = "ws://localhost:9008")]
    addr: String,

    /// Scene to request once connected (F1 and F2 switch later)
    #[arg(long, value_enum)]
    scene: Option<SceneArg>,
}

struct Gpu {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    scene: GpuScene,
}

struct App {
    window: Option<Arc<Window>>,
    gpu: Option<Gpu>,
    net: NetworkHandle,
    latency: LatencyTracker,
    render_latency: Option<i64>,
    state: ConnectionState,
    cursor: (i32, i32),
    last_title: Instant,
    /// Sent once the GPU passes its capability check.
    startup: Vec<SessionCommand>,
    error: Option<anyhow::Error>,
}

/// The commands that open the session, in order.
fn startup_commands(addr: String, scene: Option<SceneRequest>) -> Vec<SessionCommand> {
    let mut commands = vec![SessionCommand::Connect(addr)];
    commands.extend(scene.map(SessionCommand::RequestScene));
    commands
}

/// Held startup commands, released only once GPU setup has succeeded.
fn release_startup(pending: &mut Vec<SessionCommand>, gpu: &Result<()>) -> Vec<SessionCommand> {
    match gpu {
        Ok(()) => std::mem::take(pending),
        Err(_) => Vec::new(),
    }
}

impl App {
    fn new(net: NetworkHandle, startup: Vec<SessionCommand>) -> Self {
        Self {
            window: None,
            gpu: None,
            net,
            latency: LatencyTracker::default(),
            render_latency: None,
            state: ConnectionState::Disconnected,
            cursor: (0, 0),
            last_title: Instant::now(),
            startup,
            error: None,
        }
    }

    fn init_gpu(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title("remoteview")
            .with_inner_size(PhysicalSize::new(1280u32, 720));
        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .context("creating window")?,
        );

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .context("creating surface")?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("no suitable GPU adapter")?;

        let backend = adapter.get_info().backend.to_str();
        capabilities(&adapter).require_index_u32(backend)?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("remoteview_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))
        .context("creating device")?;

        let size = window.inner_size();
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .context("surface reports no formats")?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let scene = GpuScene::new(&device, surface_format, config.width, config.height);

        tracing::info!(backend, format = ?surface_format, "GPU initialized");

        self.window = Some(window);
        self.gpu = Some(Gpu {
            surface,
            device,
            queue,
            config,
            scene,
        });
        Ok(())
    }

    fn send_input(&self, input: DeviceInput) {
        self.net.send(SessionCommand::Input(input));
    }

    fn handle_key(&self, key: KeyCode, pressed: bool) {
        match key {
            KeyCode::F1 if pressed => {
                self.net
                    .send(SessionCommand::RequestScene(SceneRequest::Cube));
            }
            KeyCode::F2 if pressed => {
                self.net
                    .send(SessionCommand::RequestScene(SceneRequest::Tetra));
            }
            KeyCode::F1 | KeyCode::F2 => {}
            _ => match input::dom_keycode(key) {
                Some(keycode) => self.send_input(DeviceInput::Key { keycode, pressed }),
                None => tracing::trace!(?key, "no key code mapping"),
            },
        }
    }

    /// Apply every pending scene delta, in order.
    fn apply_updates(&mut self) {
        let Some(gpu) = &mut self.gpu else {
            return;
        };
        for update in self.net.drain() {
            gpu.scene.apply(&gpu.device, &gpu.queue, &update.delta);
            if let Some(sample) = update.latency {
                self.latency.record(sample);
            }
            self.state = update.state;
        }
    }

    fn redraw(&mut self) {
        self.apply_updates();

        let Some(gpu) = &self.gpu else {
            return;
        };

        let output = match gpu.surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                gpu.surface.configure(&gpu.device, &gpu.config);
                return;
            }
            Err(e) => {
                tracing::error!("surface error: {e}");
                return;
            }
        };

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        gpu.scene.render(&gpu.device, &gpu.queue, &view);
        output.present();

        if let Some(ms) = self.latency.mark_rendered(now_millis()) {
            tracing::trace!(render_latency_ms = ms, "frame drawn");
            self.render_latency = Some(ms);
        }
        self.update_title();
    }

    fn update_title(&mut self) {
        if self.last_title.elapsed() < TITLE_INTERVAL {
            return;
        }
        self.last_title = Instant::now();
        let Some(window) = &self.window else {
            return;
        };
        let title = match (self.state, self.latency.last()) {
            (ConnectionState::Open, Some(sample)) => format!(
                "remoteview - rtt {} ms (avg {}) - server {} ms - render {} ms",
                sample.round_trip(),
                self.latency.average(),
                sample.server_processing(),
                self.render_latency.unwrap_or_default()
            ),
            (state, _) => format!("remoteview - {state:?}"),
        };
        window.set_title(&title);
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let gpu = self.init_gpu(event_loop);
        for command in release_startup(&mut self.startup, &gpu) {
            self.net.send(command);
        }
        if let Err(e) = gpu {
            tracing::error!("startup failed: {e:#}");
            self.error = Some(e);
            event_loop.exit();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                if let Some(gpu) = &mut self.gpu {
                    gpu.config.width = new_size.width.max(1);
                    gpu.config.height = new_size.height.max(1);
                    gpu.surface.configure(&gpu.device, &gpu.config);
                    gpu.scene
                        .resize(&gpu.device, gpu.config.width, gpu.config.height);
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state: key_state,
                        ..
                    },
                ..
            } => {
                self.handle_key(key, key_state == ElementState::Pressed);
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = (position.x as i32, position.y as i32);
                let (x, y) = self.cursor;
                self.send_input(DeviceInput::MouseMove { x, y });
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let (x, y) = self.cursor;
                self.send_input(DeviceInput::MouseButton {
                    button: input::button_index(button),
                    x,
                    y,
                    pressed: state == ElementState::Pressed,
                });
            }
            WindowEvent::MouseWheel { delta, .. } => {
                self.send_input(input::wheel(delta));
            }
            WindowEvent::RedrawRequested => {
                self.redraw();
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    tracing::info!(addr = %cli.addr, "remoteview-desktop starting");

    let net = NetworkHandle::spawn()?;
    let startup = startup_commands(cli.addr, cli.scene.map(Into::into));

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(net, startup);
    event_loop.run_app(&mut app)?;
    app.net.shutdown();

    match app.error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startup_connects_before_requesting_a_scene() {
        assert_eq!(
            startup_commands("ws://host:1".into(), Some(SceneRequest::Tetra)),
            vec![
                SessionCommand::Connect("ws://host:1".into()),
                SessionCommand::RequestScene(SceneRequest::Tetra),
            ]
        );
        assert_eq!(
            startup_commands("ws://host:1".into(), None),
            vec![SessionCommand::Connect("ws://host:1".into())]
        );
    }

    #[test]
    fn failed_gpu_setup_never_connects() {
        let mut pending = startup_commands("ws://host:1".into(), Some(SceneRequest::Cube));
        let failed: Result<()> = Err(anyhow::anyhow!("adapter lacks 32-bit indices"));
        assert!(release_startup(&mut pending, &failed).is_empty());

        let released = release_startup(&mut pending, &Ok(()));
        assert_eq!(released.len(), 2);
        assert!(matches!(released[0], SessionCommand::Connect(_)));
        assert!(pending.is_empty());
        assert!(release_startup(&mut pending, &Ok(())).is_empty());
    }
}
