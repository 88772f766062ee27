use glam::Mat3;
use wgpu::util::DeviceExt;

use vitrine_core::color::Color;
use vitrine_core::geometry::GeometryStore;
use vitrine_core::scene::{Light, NodeKind, SceneGraph};

use crate::camera::Camera3D;
use crate::mesh_pipeline::{LightUniform, MeshPipeline};
use crate::vertex::MeshVertex;

/// Per-frame counters surfaced in the debug overlay.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderStats {
    pub mesh_nodes: u32,
    pub vertices: u32,
    pub triangles: u32,
    pub lights: u32,
}

/// CPU-side result of walking the scene graph: world-space vertices ready to
/// stream, plus the folded lighting terms.
#[derive(Debug, Default)]
pub struct FrameMesh {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
    pub light: Option<LightUniform>,
    pub stats: RenderStats,
}

/// Flattens the scene graph into a single world-space triangle mesh.
///
/// Node transforms are applied on the CPU each frame, so the GPU sees one
/// vertex stream and one draw call regardless of how many nodes a bundle
/// attached. Stale geometry handles (disposed while still referenced) are
/// skipped with a warning instead of poisoning the frame.
pub fn build_frame_mesh(graph: &SceneGraph, store: &GeometryStore) -> FrameMesh {
    let mut mesh = FrameMesh::default();
    let mut ambient = [0.0f32; 3];
    let mut directional: Option<([f32; 3], [f32; 3])> = None;
    let mut any_light = false;

    graph.for_each_world(|world, node| match node.kind {
        NodeKind::Group => {}
        NodeKind::Mesh(handle) => {
            let Some(geometry) = store.get(handle) else {
                log::warn!("Scene node references disposed geometry {:?}; skipping", handle);
                return;
            };

            let normal_matrix = {
                let linear = Mat3::from_mat4(world);
                if linear.determinant().abs() > f32::EPSILON {
                    linear.inverse().transpose()
                } else {
                    linear
                }
            };

            let base = mesh.vertices.len() as u32;
            for vertex in &geometry.vertices {
                mesh.vertices.push(MeshVertex {
                    position: world.transform_point3(vertex.position).to_array(),
                    normal: (normal_matrix * vertex.normal).normalize_or_zero().to_array(),
                    color: vertex.color,
                });
            }
            mesh.indices
                .extend(geometry.indices.iter().map(|index| base + index));
            mesh.stats.mesh_nodes += 1;
        }
        NodeKind::Light(light) => {
            any_light = true;
            mesh.stats.lights += 1;
            match light {
                Light::Ambient { color, intensity } => {
                    ambient[0] += color.r * intensity;
                    ambient[1] += color.g * intensity;
                    ambient[2] += color.b * intensity;
                }
                Light::Directional {
                    direction,
                    color,
                    intensity,
                } => {
                    if directional.is_none() {
                        directional = Some((
                            direction.to_array(),
                            [color.r * intensity, color.g * intensity, color.b * intensity],
                        ));
                    }
                }
            }
        }
    });

    mesh.stats.vertices = mesh.vertices.len() as u32;
    mesh.stats.triangles = (mesh.indices.len() / 3) as u32;

    if any_light {
        let (direction, color) = directional.unwrap_or(([0.0, -1.0, 0.0], [0.0, 0.0, 0.0]));
        mesh.light = Some(LightUniform {
            direction: [direction[0], direction[1], direction[2], 0.0],
            color: [color[0], color[1], color[2], 0.0],
            ambient: [ambient[0], ambient[1], ambient[2], 0.0],
        });
    }

    mesh
}

pub struct SceneRenderer {
    pipeline: MeshPipeline,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    camera_buffer: wgpu::Buffer,
    light_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    vertex_capacity: usize,
    index_capacity: usize,
    index_count: u32,
    pub stats: RenderStats,
}

impl SceneRenderer {
    pub fn new(device: &wgpu::Device, surface_format: wgpu::TextureFormat) -> Self {
        let pipeline = MeshPipeline::new(device, surface_format);

        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Uniform Buffer"),
            contents: bytemuck::cast_slice(&[Camera3D::new(1, 1).build_uniform()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let light_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Light Uniform Buffer"),
            contents: bytemuck::cast_slice(&[LightUniform::default()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let uniform_bind_group =
            pipeline.create_uniform_bind_group(device, &camera_buffer, &light_buffer);

        let vertex_capacity = 1024;
        let index_capacity = 1024;
        Self {
            vertex_buffer: create_vertex_buffer(device, vertex_capacity),
            index_buffer: create_index_buffer(device, index_capacity),
            camera_buffer,
            light_buffer,
            uniform_bind_group,
            pipeline,
            vertex_capacity,
            index_capacity,
            index_count: 0,
            stats: RenderStats::default(),
        }
    }

    /// Rebuilds the frame mesh from the scene graph and streams it to the
    /// GPU. Buffers grow to the next power of two but never shrink.
    pub fn prepare(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        camera: &Camera3D,
        graph: &SceneGraph,
        store: &GeometryStore,
    ) {
        let mesh = build_frame_mesh(graph, store);
        self.stats = mesh.stats;
        self.index_count = mesh.indices.len() as u32;

        self.ensure_mesh_capacity(device, mesh.vertices.len(), mesh.indices.len());
        if !mesh.vertices.is_empty() {
            queue.write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(&mesh.vertices));
        }
        if !mesh.indices.is_empty() {
            queue.write_buffer(&self.index_buffer, 0, bytemuck::cast_slice(&mesh.indices));
        }

        queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::cast_slice(&[camera.build_uniform()]),
        );
        queue.write_buffer(
            &self.light_buffer,
            0,
            bytemuck::cast_slice(&[mesh.light.unwrap_or_default()]),
        );
    }

    /// Records the scene render pass. Call after `prepare` for the frame.
    pub fn draw(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        depth_view: &wgpu::TextureView,
        clear_color: Color,
    ) {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Scene Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: clear_color.r as f64,
                        g: clear_color.g as f64,
                        b: clear_color.b as f64,
                        a: 1.0,
                    }),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            ..Default::default()
        });

        if self.index_count == 0 {
            return;
        }

        render_pass.set_pipeline(&self.pipeline.render_pipeline);
        render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        render_pass.draw_indexed(0..self.index_count, 0, 0..1);
    }

    fn ensure_mesh_capacity(
        &mut self,
        device: &wgpu::Device,
        vertex_count: usize,
        index_count: usize,
    ) {
        let needed_vertices = vertex_count.max(1);
        if needed_vertices > self.vertex_capacity {
            self.vertex_capacity = needed_vertices.next_power_of_two();
            self.vertex_buffer = create_vertex_buffer(device, self.vertex_capacity);
        }

        let needed_indices = index_count.max(1);
        if needed_indices > self.index_capacity {
            self.index_capacity = needed_indices.next_power_of_two();
            self.index_buffer = create_index_buffer(device, self.index_capacity);
        }
    }
}

fn create_vertex_buffer(device: &wgpu::Device, vertex_capacity: usize) -> wgpu::Buffer {
    let byte_len = (vertex_capacity * std::mem::size_of::<MeshVertex>()).max(1) as u64;
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Scene Vertex Buffer"),
        size: byte_len,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn create_index_buffer(device: &wgpu::Device, index_capacity: usize) -> wgpu::Buffer {
    let byte_len = (index_capacity * std::mem::size_of::<u32>()).max(1) as u64;
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Scene Index Buffer"),
        size: byte_len,
        usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}
