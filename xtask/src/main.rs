use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use glam::Vec3;
use remoteview_common::{Vertex, now_millis};
use remoteview_protocol::{Frame, Message, MeshData, Timestamps};
use std::path::{Path, PathBuf};
use std::process::Command;

#[derive(Parser)]
#[command(name = "xtask", about = "Workspace automation for remoteview")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run all checks: fmt, clippy, tests, doc
    Check,
    /// Run cargo fmt --check on all crates
    Fmt,
    /// Run clippy on all crates
    Clippy,
    /// Run all tests
    Test,
    /// Build rustdoc for the workspace
    Doc,
    /// Run the frame decode benchmark
    Bench,
    /// Write sample captured frames for `remoteview-cli decode`
    Frames {
        /// Output directory
        #[arg(long, default_value = "target/frames")]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check => {
            cargo("fmt", &["fmt", "--all", "--", "--check"])?;
            cargo("clippy", &clippy_args())?;
            cargo("test", &["test", "--workspace"])?;
            cargo("doc", &["doc", "--workspace", "--no-deps"])?;
        }
        Commands::Fmt => cargo("fmt", &["fmt", "--all", "--", "--check"])?,
        Commands::Clippy => cargo("clippy", &clippy_args())?,
        Commands::Test => cargo("test", &["test", "--workspace"])?,
        Commands::Doc => cargo("doc", &["doc", "--workspace", "--no-deps"])?,
        Commands::Bench => cargo(
            "bench",
            &["bench", "-p", "remoteview-protocol", "--bench", "bench_decode"],
        )?,
        Commands::Frames { out } => write_frames(&out)?,
    }

    Ok(())
}

fn clippy_args() -> [&'static str; 6] {
    ["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"]
}

fn cargo(task: &str, args: &[&str]) -> Result<()> {
    println!("==> Running cargo {}", args.join(" "));
    let status = Command::new("cargo").args(args).status()?;
    if !status.success() {
        anyhow::bail!("cargo {task} failed");
    }
    Ok(())
}

/// A quad split into two triangles, facing +Z.
fn quad() -> MeshData {
    let colour = [90, 160, 230, 255];
    let vertices = [
        Vertex::new(Vec3::new(-1.0, -1.0, 0.0), Vec3::Z, colour),
        Vertex::new(Vec3::new(1.0, -1.0, 0.0), Vec3::Z, colour),
        Vertex::new(Vec3::new(1.0, 1.0, 0.0), Vec3::Z, colour),
        Vertex::new(Vec3::new(-1.0, 1.0, 0.0), Vec3::Z, colour),
    ];
    MeshData::from_parts(&vertices, &[0, 1, 2, 2, 3, 0])
}

fn write_frames(out: &Path) -> Result<()> {
    std::fs::create_dir_all(out).with_context(|| format!("creating {}", out.display()))?;

    let now = now_millis();
    let stamps = Timestamps {
        client_send_echo: now,
        server_recv: now + 2,
        server_send: now + 5,
    };
    let view = glam::Mat4::look_at_rh(Vec3::new(0.0, 0.0, 4.0), Vec3::ZERO, Vec3::Y);
    let projection = glam::Mat4::perspective_rh_gl(45f32.to_radians(), 16.0 / 9.0, 0.1, 100.0);
    let patch = MeshData::from_parts(
        &[Vertex::new(Vec3::new(1.0, 1.5, 0.0), Vec3::Z, [255, 80, 40, 255])],
        &[],
    );

    let frames = [
        ("0-full-mesh.bin", Message::FullMesh(quad())),
        ("1-view.bin", Message::ViewMatrix(view.to_cols_array())),
        ("2-projection.bin", Message::ProjMatrix(projection.to_cols_array())),
        (
            "3-region-patch.bin",
            Message::RegionPatch {
                vertex_offset: 2,
                index_offset: 0,
                mesh: patch,
            },
        ),
    ];
    for (name, message) in frames {
        let path = out.join(name);
        std::fs::write(&path, Frame::new(stamps, message).encode())
            .with_context(|| format!("writing {}", path.display()))?;
        println!("wrote {}", path.display());
    }
    Ok(())
}
