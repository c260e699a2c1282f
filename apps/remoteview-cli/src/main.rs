use std::path::PathBuf;

use anyhow::{Context, Result};
use bytes::Bytes;
use clap::{Parser, Subcommand, ValueEnum};
use remoteview_common::now_millis;
use remoteview_input::DeviceInput;
use remoteview_protocol::{Frame, SceneRequest};
use remoteview_render::{DebugTextRenderer, Renderer};
use remoteview_scene::Scene;
use remoteview_session::{FrameReport, Session, WsConnector, apply_message};
use tracing_subscriber::EnvFilter;

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
#[command(name = "remoteview-cli", about = "Headless remote-render client")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and crate info
    Info,
    /// Connect, request a scene and report each received frame
    Connect {
        /// Render server address
        #[arg(long, env = "REMOTEVIEW_ADDR", default_value = "ws://localhost:9008")]
        addr: String,
        /// Scene to request after connecting
        #[arg(short, long, value_enum, default_value = "cube")]
        scene: SceneArg,
        /// Stop after this many frames
        #[arg(short, long, default_value = "10")]
        frames: usize,
        /// DOM key code to press and release after the first frame
        #[arg(long)]
        key: Option<u32>,
    },
    /// Decode captured binary frames and apply them in order
    Decode {
        /// Files each holding one raw frame
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Info => {
            println!("remoteview-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("common: {}", remoteview_common::crate_info());
            println!("protocol: {}", remoteview_protocol::crate_info());
            println!("scene: {}", remoteview_scene::crate_info());
            println!("input: {}", remoteview_input::crate_info());
            println!("session: {}", remoteview_session::crate_info());
            println!("render: {}", remoteview_render::crate_info());
        }
        Commands::Connect {
            addr,
            scene,
            frames,
            key,
        } => {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            runtime.block_on(connect(&addr, scene.into(), frames, key, cli.json))?;
        }
        Commands::Decode { files } => decode(&files, cli.json)?,
    }

    Ok(())
}

async fn connect(
    addr: &str,
    scene: SceneRequest,
    frames: usize,
    key: Option<u32>,
    json: bool,
) -> Result<()> {
    let mut session = Session::new(WsConnector);
    session.connect(addr).await?;
    session.request_scene(scene).await?;

    let mut received = 0;
    while received < frames {
        let Some(report) = session.next_frame().await else {
            tracing::info!("connection closed after {received} frames");
            break;
        };
        received += 1;
        print_report(&report, json)?;

        if received == 1 {
            if let Some(keycode) = key {
                for pressed in [true, false] {
                    session
                        .send_input(&DeviceInput::Key { keycode, pressed }, now_millis())
                        .await?;
                }
            }
        }
    }
    session.disconnect().await;

    let latency = session.latency();
    if json {
        let summary = serde_json::json!({
            "stats": session.stats(),
            "round_trip_ms": {
                "avg": latency.average(),
                "min": latency.min(),
                "max": latency.max(),
            },
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "round trip: avg={}ms min={}ms max={}ms over {} samples",
            latency.average(),
            latency.min(),
            latency.max(),
            latency.count()
        );
        println!("{:?}", session.stats());
        let scene = session.scene();
        print!(
            "{}",
            DebugTextRenderer::new().render(&scene.buffer, &scene.transforms)
        );
    }
    Ok(())
}

fn print_report(report: &FrameReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(report)?);
    } else {
        match &report.latency {
            Some(sample) => println!(
                "{:?} (rtt={}ms out={}ms server={}ms)",
                report.outcome,
                sample.round_trip(),
                sample.network_out(),
                sample.server_processing()
            ),
            None => println!("{:?}", report.outcome),
        }
    }
    Ok(())
}

fn decode(files: &[PathBuf], json: bool) -> Result<()> {
    let mut scene = Scene::new();
    for path in files {
        let data = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        let frame = Frame::decode(Bytes::from(data))
            .with_context(|| format!("decoding {}", path.display()))?;
        let kind = frame.message.kind();
        let outcome = apply_message(&mut scene, frame.message);
        if outcome.is_rejected() {
            tracing::warn!(file = %path.display(), ?kind, ?outcome, "rejected");
        } else {
            tracing::info!(file = %path.display(), ?kind, "applied");
        }
    }

    if json {
        let summary = serde_json::json!({
            "vertices": scene.buffer.vertex_count(),
            "indices": scene.buffer.index_count(),
            "revision": scene.buffer.revision(),
            "view": scene.transforms.view().to_cols_array(),
            "projection": scene.transforms.projection().to_cols_array(),
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!(
            "{}",
            DebugTextRenderer::new().render(&scene.buffer, &scene.transforms)
        );
    }
    Ok(())
}
