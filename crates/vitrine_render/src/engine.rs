use std::sync::Arc;
use winit::window::Window;

use vitrine_core::color::Color;
use vitrine_core::geometry::GeometryStore;
use vitrine_core::manifest::Manifest;
use vitrine_core::scene::SceneGraph;

use crate::camera::Camera3D;
use crate::gpu_context::GpuContext;
use crate::renderer::SceneRenderer;

/// Shared rendering context for one player instance.
///
/// Owns the output device, the camera, and the clear color. Exactly one of
/// these exists per player and it outlives every bundle; manifests reposition
/// the camera and recolor the background between bundles, nothing else does.
pub struct EngineContext {
    pub gpu: GpuContext,
    pub camera: Camera3D,
    pub clear_color: Color,
    pub renderer: SceneRenderer,
}

impl EngineContext {
    /// Constructs the GPU context and camera sized to the window's current
    /// bounds. Called once, at player construction.
    pub fn new(window: Arc<Window>) -> Self {
        let gpu = GpuContext::new(window);
        let camera = Camera3D::new(gpu.size.0, gpu.size.1);
        let renderer = SceneRenderer::new(&gpu.device, gpu.surface_format);
        Self {
            gpu,
            camera,
            clear_color: Color::new(0.02, 0.02, 0.04),
            renderer,
        }
    }

    /// Applies manifest configuration. Fields the manifest omits keep their
    /// current values.
    pub fn apply_manifest(&mut self, manifest: &Manifest) {
        if let Some(position) = manifest.camera_position {
            self.camera.position = position.into();
            log::info!("Manifest set camera position to {:?}", position);
        }
        if let Some(background) = manifest.background_color {
            self.clear_color = background;
        }
    }

    /// Resizes the output surface and recomputes the camera aspect. No-op
    /// for zero or unchanged sizes, so callers may fire this on every
    /// viewport event without coordination.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 || (width, height) == self.gpu.size {
            return;
        }
        self.gpu.resize(width, height);
        self.camera.set_viewport(width, height);
        log::info!("Resized to {}x{}", width, height);
    }

    /// Streams the scene into GPU buffers and records the scene pass.
    pub fn render_scene(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        graph: &SceneGraph,
        store: &GeometryStore,
    ) {
        self.renderer
            .prepare(&self.gpu.device, &self.gpu.queue, &self.camera, graph, store);
        self.renderer
            .draw(encoder, view, &self.gpu.depth_view, self.clear_color);
    }
}
