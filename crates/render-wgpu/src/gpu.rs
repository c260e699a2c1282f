use crate::shaders;
use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use remoteview_common::{VERTEX_STRIDE, Vertex};
use remoteview_render::RenderCapabilities;
use remoteview_scene::{BufferUpdate, SceneDelta};
use wgpu::util::DeviceExt;

/// Maps OpenGL clip space (z in `[-1, 1]`) to wgpu clip space (z in `[0, 1]`).
#[rustfmt::skip]
pub const OPENGL_TO_WGPU: Mat4 = Mat4::from_cols_array(&[
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
]);

const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 3] = [
    wgpu::VertexAttribute {
        format: wgpu::VertexFormat::Float32x3,
        offset: 0,
        shader_location: 0,
    },
    wgpu::VertexAttribute {
        format: wgpu::VertexFormat::Float32x3,
        offset: Vertex::NORMAL_OFFSET as u64,
        shader_location: 1,
    },
    wgpu::VertexAttribute {
        format: wgpu::VertexFormat::Unorm8x4,
        offset: Vertex::COLOUR_OFFSET as u64,
        shader_location: 2,
    },
];

fn vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: VERTEX_STRIDE as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &VERTEX_ATTRIBUTES,
    }
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct Uniforms {
    view: [[f32; 4]; 4],
    projection: [[f32; 4]; 4],
    params: [f32; 4],
}

impl Uniforms {
    fn new(view: Mat4, projection: Mat4, encode_gamma: bool) -> Self {
        Self {
            view: view.to_cols_array_2d(),
            projection: (OPENGL_TO_WGPU * projection).to_cols_array_2d(),
            params: [if encode_gamma { 1.0 } else { 0.0 }, 0.0, 0.0, 0.0],
        }
    }
}

/// Read the features the stream depends on from the adapter.
pub fn capabilities(adapter: &wgpu::Adapter) -> RenderCapabilities {
    let flags = adapter.get_downlevel_capabilities().flags;
    RenderCapabilities {
        index_u32: flags.contains(wgpu::DownlevelFlags::FULL_DRAW_INDEX_UINT32),
    }
}

/// GPU mirror of the streamed scene.
///
/// Full replaces recreate a buffer at the new size; patches are sub-range
/// writes into the existing one.
pub struct GpuScene {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    vertex_buffer: Option<wgpu::Buffer>,
    index_buffer: Option<wgpu::Buffer>,
    index_count: u32,
    view: Mat4,
    projection: Mat4,
    revision: u64,
    depth_texture: wgpu::TextureView,
    surface_format: wgpu::TextureFormat,
}

impl GpuScene {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Self {
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("scene_uniforms"),
            contents: bytemuck::bytes_of(&Uniforms::new(
                Mat4::IDENTITY,
                Mat4::IDENTITY,
                !surface_format.is_srgb(),
            )),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("scene_uniform_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("scene_uniform_bind_group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("scene_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("scene_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::SCENE_SHADER.into()),
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("scene_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[vertex_layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                // Winding is not part of the stream.
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: wgpu::TextureFormat::Depth32Float,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: Default::default(),
                bias: Default::default(),
            }),
            multisample: Default::default(),
            multiview: None,
            cache: None,
        });

        let depth_texture = Self::create_depth_texture(device, width, height);

        Self {
            pipeline,
            uniform_buffer,
            uniform_bind_group,
            vertex_buffer: None,
            index_buffer: None,
            index_count: 0,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            revision: 0,
            depth_texture,
            surface_format,
        }
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.depth_texture = Self::create_depth_texture(device, width, height);
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_format
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Scene revision of the last applied delta.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Replay a delta captured on the session thread.
    pub fn apply(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, delta: &SceneDelta) {
        for update in &delta.updates {
            self.apply_update(device, queue, update);
        }
        self.index_count = delta.index_count;
        self.view = delta.view;
        self.projection = delta.projection;
        self.revision = delta.revision;
    }

    fn apply_update(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, update: &BufferUpdate) {
        match update {
            BufferUpdate::ReplaceVertices(data) => {
                self.vertex_buffer = Some(device.create_buffer_init(
                    &wgpu::util::BufferInitDescriptor {
                        label: Some("scene_vertices"),
                        contents: data,
                        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                    },
                ));
            }
            BufferUpdate::ReplaceIndices(data) => {
                self.index_buffer = Some(device.create_buffer_init(
                    &wgpu::util::BufferInitDescriptor {
                        label: Some("scene_indices"),
                        contents: data,
                        usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
                    },
                ));
            }
            BufferUpdate::PatchVertices { byte_offset, data } => {
                write_range(queue, self.vertex_buffer.as_ref(), *byte_offset, data, "vertex");
            }
            BufferUpdate::PatchIndices { byte_offset, data } => {
                write_range(queue, self.index_buffer.as_ref(), *byte_offset, data, "index");
            }
        }
    }

    /// Draw the mirrored scene into `target`.
    pub fn render(&self, device: &wgpu::Device, queue: &wgpu::Queue, target: &wgpu::TextureView) {
        queue.write_buffer(
            &self.uniform_buffer,
            0,
            bytemuck::bytes_of(&Uniforms::new(
                self.view,
                self.projection,
                !self.surface_format.is_srgb(),
            )),
        );

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("scene_encoder"),
        });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            if let (Some(vertices), Some(indices)) = (&self.vertex_buffer, &self.index_buffer) {
                if self.index_count > 0 {
                    pass.set_pipeline(&self.pipeline);
                    pass.set_bind_group(0, &self.uniform_bind_group, &[]);
                    pass.set_vertex_buffer(0, vertices.slice(..));
                    pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);
                    pass.draw_indexed(0..self.index_count, 0, 0..1);
                }
            }
        }

        queue.submit(std::iter::once(encoder.finish()));
    }

    fn create_depth_texture(
        device: &wgpu::Device,
        width: u32,
        height: u32,
    ) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth_texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Depth32Float,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&Default::default())
    }
}

fn write_range(
    queue: &wgpu::Queue,
    buffer: Option<&wgpu::Buffer>,
    byte_offset: usize,
    data: &[u8],
    region: &str,
) {
    let Some(buffer) = buffer else {
        tracing::warn!(region, "patch for a region with no GPU buffer, skipped");
        return;
    };
    let end = (byte_offset + data.len()) as u64;
    if end > buffer.size() {
        tracing::warn!(region, end, size = buffer.size(), "patch past end of GPU buffer, skipped");
        return;
    }
    queue.write_buffer(buffer, byte_offset as u64, data);
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn vertex_layout_matches_wire_record() {
        let layout = vertex_layout();
        assert_eq!(layout.array_stride, 28);
        let offsets: Vec<u64> = layout.attributes.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 12, 24]);
        assert_eq!(layout.attributes[2].format, wgpu::VertexFormat::Unorm8x4);
    }

    #[test]
    fn uniforms_are_uniform_aligned() {
        assert_eq!(std::mem::size_of::<Uniforms>() % 16, 0);
    }

    #[test]
    fn correction_maps_gl_depth_range() {
        let near = OPENGL_TO_WGPU * Vec4::new(0.0, 0.0, -1.0, 1.0);
        let far = OPENGL_TO_WGPU * Vec4::new(0.0, 0.0, 1.0, 1.0);
        assert_eq!(near.z, 0.0);
        assert_eq!(far.z, 1.0);
        let xy = OPENGL_TO_WGPU * Vec4::new(0.3, -0.7, 0.0, 1.0);
        assert_eq!((xy.x, xy.y, xy.w), (0.3, -0.7, 1.0));
    }

    #[test]
    fn projection_is_corrected_view_is_not() {
        let u = Uniforms::new(Mat4::IDENTITY, Mat4::IDENTITY, true);
        assert_eq!(u.view, Mat4::IDENTITY.to_cols_array_2d());
        assert_eq!(u.projection, OPENGL_TO_WGPU.to_cols_array_2d());
        assert_eq!(u.params[0], 1.0);
    }
}
