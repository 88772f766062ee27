use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use winit::window::Window;

use vitrine_core::geometry::GeometryStore;
use vitrine_core::manifest::{self, Manifest, ManifestError, ManifestWatcher};
use vitrine_core::scene::SceneGraph;
use vitrine_core::state::{IllegalState, PlayerState};
use vitrine_devtools::{DebugOverlay, OverlayStats};
use vitrine_render::EngineContext;

use crate::lifecycle::{LifecycleController, LoadOutcome};
use crate::loader::{self, BundleLoadError, BundleRegistry};

#[derive(Debug, Error)]
pub enum PlayerError {
    #[error(transparent)]
    Load(#[from] BundleLoadError),
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error(transparent)]
    State(#[from] IllegalState),
}

/// One player instance: the engine context, the shared scene state, and the
/// lifecycle machinery, wired to a window.
///
/// Ownership is split into three conceptual groups:
///  - **Engine** (GPU context, camera, renderer) -- outlives every bundle,
///    released only on dispose
///  - **Shared scene state** (graph, geometry store) -- mutated by the
///    lifecycle controller and the attached bundle, nothing else
///  - **Lifecycle** (state machine, clock, frame bookkeeping, registry) --
///    headless logic, fully testable without any of the above
pub struct Player {
    window: Arc<Window>,
    engine: Option<EngineContext>,
    overlay: DebugOverlay,
    graph: SceneGraph,
    geometry: GeometryStore,
    controller: LifecycleController,
    registry: BundleRegistry,
    active_ref: Option<String>,
    manifest_watcher: Option<ManifestWatcher>,
    last_error: Option<String>,
}

impl Player {
    pub fn new(window: Arc<Window>, registry: BundleRegistry) -> Self {
        let engine = EngineContext::new(window.clone());
        let overlay = DebugOverlay::new(&engine.gpu.device, engine.gpu.surface_format, &window);
        log::info!("Registered bundles: {:?}", registry.references());
        Self {
            window,
            engine: Some(engine),
            overlay,
            graph: SceneGraph::new(),
            geometry: GeometryStore::new(),
            controller: LifecycleController::new(),
            registry,
            active_ref: None,
            manifest_watcher: None,
            last_error: None,
        }
    }

    #[allow(dead_code)]
    pub fn state(&self) -> PlayerState {
        self.controller.state()
    }

    pub fn has_pending_frame(&self) -> bool {
        self.controller.has_pending_frame()
    }

    pub fn request_redraw(&self) {
        self.window.request_redraw();
    }

    /// Loads a bundle: tears down the previous one, applies the manifest to
    /// the engine, resolves the reference, and runs the factory.
    pub fn load_bundle(&mut self, manifest: &Manifest, reference: &str) -> Result<(), PlayerError> {
        manifest::validate_manifest(manifest)?;

        let ticket = self
            .controller
            .begin_load(&mut self.graph, &mut self.geometry)?;

        let Some(engine) = self.engine.as_mut() else {
            // begin_load already rejects Disposed; a missing engine outside
            // that state would be a bug, surface it the same way.
            return Err(IllegalState::new("load_bundle", self.controller.state()).into());
        };

        match loader::resolve_and_attach(
            &mut self.controller,
            ticket,
            &self.registry,
            reference,
            &mut self.graph,
            &mut self.geometry,
            || engine.apply_manifest(manifest),
        ) {
            Ok(LoadOutcome::Attached) => {
                self.active_ref = Some(reference.to_string());
                self.last_error = None;
                self.window.request_redraw();
                Ok(())
            }
            Ok(LoadOutcome::Superseded) => Ok(()),
            Err(err) => {
                self.last_error = Some(err.to_string());
                log::error!("Failed to load bundle: {}", err);
                Err(err.into())
            }
        }
    }

    /// Loads a bundle with its manifest read from disk, and keeps watching
    /// the file so edits re-apply while the bundle runs. A missing or broken
    /// manifest falls back to defaults rather than blocking the bundle.
    pub fn load_bundle_file(
        &mut self,
        manifest_path: &Path,
        reference: &str,
    ) -> Result<(), PlayerError> {
        let manifest = match manifest::load_manifest_from_path(manifest_path) {
            Ok(manifest) => manifest,
            Err(err) => {
                log::warn!(
                    "Manifest '{}' unavailable ({}); using defaults",
                    manifest_path.display(),
                    err
                );
                Manifest::default()
            }
        };
        self.manifest_watcher = Some(ManifestWatcher::new(manifest_path.to_path_buf()));
        self.load_bundle(&manifest, reference)
    }

    pub fn play(&mut self) -> Result<(), IllegalState> {
        self.controller.play()?;
        self.window.request_redraw();
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), IllegalState> {
        self.controller.pause()
    }

    /// Space-bar behavior: flip between playing and paused, ignore the key
    /// when there is nothing to play.
    pub fn toggle_pause(&mut self) {
        let result = match self.controller.state() {
            PlayerState::Playing => self.pause(),
            PlayerState::Paused => self.play(),
            state => {
                log::debug!("Ignoring play/pause toggle in state {}", state);
                Ok(())
            }
        };
        if let Err(err) = result {
            log::warn!("{}", err);
        }
    }

    pub fn reset(&mut self) -> Result<(), IllegalState> {
        self.controller.reset(&mut self.graph, &mut self.geometry)?;
        self.active_ref = None;
        self.manifest_watcher = None;
        self.window.request_redraw();
        Ok(())
    }

    /// Terminal teardown: runs the full reset sequence, then releases the
    /// output device. The player only answers `IllegalState` afterwards.
    pub fn dispose(&mut self) -> Result<(), IllegalState> {
        self.controller.dispose(&mut self.graph, &mut self.geometry)?;
        self.engine = None;
        self.active_ref = None;
        self.manifest_watcher = None;
        Ok(())
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if let Some(engine) = self.engine.as_mut() {
            engine.resize(width, height);
            self.window.request_redraw();
        }
    }

    pub fn handle_window_event(&mut self, event: &winit::event::WindowEvent) -> bool {
        self.overlay.handle_window_event(&self.window, event)
    }

    pub fn toggle_overlay(&mut self) {
        self.overlay.toggle();
        self.window.request_redraw();
    }

    /// One render-loop step, driven by the window's redraw event.
    ///
    /// The redraw event is only the wake-up: the simulation advances iff the
    /// live frame handle fired (pause/reset in between drops the callback),
    /// while the scene is repainted either way so exposes and resizes stay
    /// correct while paused.
    pub fn pump_frame(&mut self) {
        self.check_manifest_reload();

        let tick = self
            .controller
            .pending_frame()
            .and_then(|handle| self.controller.begin_frame(handle));
        if let Some(tick) = tick {
            self.controller.update_active(&mut self.graph, tick);
        }

        let stats = self.overlay_stats();
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        if engine.gpu.size.0 == 0 || engine.gpu.size.1 == 0 {
            return;
        }

        let Some((output, view)) = engine.gpu.begin_frame() else {
            return;
        };

        let (primitives, textures_delta, actions) =
            self.overlay
                .prepare(&self.window, self.controller.clock(), Some(stats));

        let mut encoder = engine
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        engine.render_scene(&mut encoder, &view, &self.graph, &self.geometry);

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [engine.gpu.size.0, engine.gpu.size.1],
            pixels_per_point: self.window.scale_factor() as f32,
        };

        self.overlay.upload(
            &engine.gpu.device,
            &engine.gpu.queue,
            &mut encoder,
            &primitives,
            &textures_delta,
            &screen_descriptor,
        );

        {
            let mut egui_pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui Render Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    ..Default::default()
                })
                .forget_lifetime();

            self.overlay
                .paint(&mut egui_pass, &primitives, &screen_descriptor);
        }

        self.overlay.cleanup(&textures_delta);

        engine.gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        // Overlay button actions land after the frame is out the door.
        if actions.toggle_pause {
            self.toggle_pause();
        }
        if actions.reset {
            if let Err(err) = self.reset() {
                log::warn!("Overlay reset rejected: {}", err);
            }
        }

        if tick.is_some() {
            self.controller.end_frame();
        }
        if self.controller.has_pending_frame() {
            self.window.request_redraw();
        }
    }

    fn overlay_stats(&self) -> OverlayStats {
        let render_stats = self
            .engine
            .as_ref()
            .map(|engine| engine.renderer.stats)
            .unwrap_or_default();
        OverlayStats {
            state_label: self.controller.state().label().to_string(),
            bundle_ref: self.active_ref.clone(),
            root_nodes: self.graph.root_count() as u32,
            total_nodes: self.graph.node_count() as u32,
            live_geometry: self.geometry.live_count() as u32,
            vertices: render_stats.vertices,
            triangles: render_stats.triangles,
            lights: render_stats.lights,
            last_error: self.last_error.clone(),
        }
    }

    /// Re-applies the active manifest when its file changes on disk. Runs at
    /// the frame boundary, never mid-update.
    fn check_manifest_reload(&mut self) {
        let Some(watcher) = self.manifest_watcher.as_mut() else {
            return;
        };
        if !watcher.should_reload() {
            return;
        }
        match manifest::load_manifest_from_path(watcher.path()) {
            Ok(manifest) => {
                if let Some(engine) = self.engine.as_mut() {
                    engine.apply_manifest(&manifest);
                    log::info!("Manifest re-applied: {}", watcher.path().display());
                }
            }
            Err(err) => {
                log::error!("Manifest reload failed: {}", err);
            }
        }
    }
}
