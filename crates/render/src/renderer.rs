use std::fmt::Write as _;

use glam::Mat4;
use remoteview_common::{VERTEX_STRIDE, Vertex};
use remoteview_scene::{SceneBuffer, TransformStore};

/// Renderer-agnostic interface. All renderers implement this trait.
///
/// A renderer reads the scene buffer and the current transforms, then
/// produces output. It never mutates either.
pub trait Renderer {
    /// The output type produced by this renderer.
    type Output;

    /// Render one frame from the current scene.
    fn render(&self, buffer: &SceneBuffer, transforms: &TransformStore) -> Self::Output;
}

/// Produces a human-readable summary of the scene. Used by the CLI and tests.
#[derive(Debug)]
pub struct DebugTextRenderer {
    /// How many leading vertices to list.
    pub max_vertices: usize,
}

impl Default for DebugTextRenderer {
    fn default() -> Self {
        Self { max_vertices: 4 }
    }
}

impl DebugTextRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

fn write_matrix(out: &mut String, label: &str, m: Mat4) {
    let _ = writeln!(out, "{label}:");
    // Rows, for reading; storage stays column-major.
    for r in 0..4 {
        let row = m.row(r);
        let _ = writeln!(
            out,
            "  [{:8.3} {:8.3} {:8.3} {:8.3}]",
            row.x, row.y, row.z, row.w
        );
    }
}

impl Renderer for DebugTextRenderer {
    type Output = String;

    fn render(&self, buffer: &SceneBuffer, transforms: &TransformStore) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "=== Scene (revision={}, transforms={}) ===",
            buffer.revision(),
            transforms.revision()
        );
        if !buffer.is_initialized() {
            out.push_str("No mesh received\n");
        }
        let _ = writeln!(
            out,
            "Vertices: {}  Indices: {}  Triangles: {}",
            buffer.vertex_count(),
            buffer.index_count(),
            buffer.index_count() / 3
        );

        for (i, chunk) in buffer
            .vertex_bytes()
            .chunks_exact(VERTEX_STRIDE)
            .take(self.max_vertices)
            .enumerate()
        {
            let v: Vertex = bytemuck::pod_read_unaligned(chunk);
            let [x, y, z] = v.position;
            let [r, g, b, a] = v.colour;
            let _ = writeln!(
                out,
                "  [{i}] pos=({x:.2}, {y:.2}, {z:.2}) rgba=({r}, {g}, {b}, {a})"
            );
        }

        write_matrix(&mut out, "View", transforms.view());
        write_matrix(&mut out, "Projection", transforms.projection());
        out
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use glam::Vec3;

    use super::*;

    fn vertex_bytes(vertices: &[Vertex]) -> Bytes {
        Bytes::copy_from_slice(bytemuck::cast_slice(vertices))
    }

    #[test]
    fn debug_renderer_empty_scene() {
        let output = DebugTextRenderer::new().render(&SceneBuffer::new(), &TransformStore::new());

        assert!(output.contains("revision=0"));
        assert!(output.contains("No mesh received"));
        assert!(output.contains("Vertices: 0  Indices: 0"));
        assert!(output.contains("View:"));
    }

    #[test]
    fn debug_renderer_lists_vertices() {
        let mut buffer = SceneBuffer::new();
        let vertices = [
            Vertex::new(Vec3::new(1.0, 2.0, 3.0), Vec3::Y, [10, 20, 30, 255]),
            Vertex::new(Vec3::ZERO, Vec3::Y, [0; 4]),
            Vertex::new(Vec3::X, Vec3::Y, [0; 4]),
        ];
        let indices: [u32; 3] = [0, 1, 2];
        buffer
            .replace_all(
                vertex_bytes(&vertices),
                Bytes::copy_from_slice(bytemuck::cast_slice(&indices)),
            )
            .unwrap();

        let output = DebugTextRenderer::new().render(&buffer, &TransformStore::new());
        assert!(output.contains("Vertices: 3  Indices: 3  Triangles: 1"));
        assert!(output.contains("[0] pos=(1.00, 2.00, 3.00) rgba=(10, 20, 30, 255)"));
        assert!(!output.contains("No mesh received"));
    }

    #[test]
    fn debug_renderer_prints_matrix_rows() {
        let mut transforms = TransformStore::new();
        let mut m = Mat4::IDENTITY.to_cols_array();
        // Column-major: element 12 is the x translation.
        m[12] = 5.0;
        transforms.set_view(m);

        let output = DebugTextRenderer::new().render(&SceneBuffer::new(), &transforms);
        assert!(output.contains("[   1.000    0.000    0.000    5.000]"));
    }
}
