//! Vitrine player -- main loop and application entry point.
//!
//! Architecture: winit drives the event loop via `ApplicationHandler`; the
//! redraw event is the frame loop's wake-up source. One frame inside
//! `RedrawRequested` (see `Player::pump_frame`):
//!
//!   1. Claim the live frame handle -- callbacks cancelled by pause/reset
//!      are dropped here, so teardown never races a final frame
//!   2. Tick the play clock (pause-aware delta/elapsed) and run the active
//!      bundle's `update`
//!   3. Flatten the scene graph into one world-space mesh, stream it, draw
//!   4. Composite the egui overlay, then reschedule iff still playing
//!
//! Bundles are registered factories, not dynamically loaded code: the host
//! resolves a reference in the registry, runs the factory against the shared
//! scene graph, and owns the resulting `update`/`dispose` pair. Keyboard
//! controls stand in for the catalog UI: digits switch bundles, Space
//! toggles play/pause, R resets, F3 shows the overlay.

mod bundle;
mod bundles;
mod lifecycle;
mod loader;
mod player;

use std::path::PathBuf;

use winit::application::ApplicationHandler;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowId;

use vitrine_platform::window::PlatformConfig;

use player::Player;

const INITIAL_BUNDLE: &str = "demo";

fn manifest_path_for(reference: &str) -> PathBuf {
    PathBuf::from("demos/manifests").join(format!("{reference}.json"))
}

struct App {
    config: PlatformConfig,
    player: Option<Player>,
}

impl App {
    fn new() -> Self {
        Self {
            config: PlatformConfig::default(),
            player: None,
        }
    }

    fn switch_bundle(&mut self, reference: &str) {
        if let Some(player) = self.player.as_mut() {
            if let Err(err) = player.load_bundle_file(&manifest_path_for(reference), reference) {
                log::error!("Could not load bundle '{}': {}", reference, err);
            }
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.player.is_some() {
            return;
        }
        let window = vitrine_platform::window::create_window(event_loop, &self.config);
        log::info!(
            "Window created: {}x{}",
            self.config.width,
            self.config.height
        );

        let mut player = Player::new(window, bundles::builtin_registry());
        if let Err(err) =
            player.load_bundle_file(&manifest_path_for(INITIAL_BUNDLE), INITIAL_BUNDLE)
        {
            log::error!("Initial bundle failed to load: {}", err);
        }
        self.player = Some(player);
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(player) = &self.player {
            if player.has_pending_frame() {
                player.request_redraw();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(player) = self.player.as_mut() else {
            return;
        };

        let egui_consumed = player.handle_window_event(&event);
        let mut bundle_to_load: Option<&'static str> = None;

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, exiting.");
                if let Err(err) = player.dispose() {
                    log::debug!("Dispose on close: {}", err);
                }
                event_loop.exit();
            }

            WindowEvent::Resized(physical_size) => {
                player.resize(physical_size.width, physical_size.height);
            }

            WindowEvent::RedrawRequested => {
                player.pump_frame();
            }

            WindowEvent::KeyboardInput { event, .. } if !egui_consumed => {
                if event.state == ElementState::Pressed && !event.repeat {
                    if let PhysicalKey::Code(key_code) = event.physical_key {
                        match key_code {
                            KeyCode::Escape => {
                                if let Err(err) = player.dispose() {
                                    log::debug!("Dispose on exit: {}", err);
                                }
                                event_loop.exit();
                            }
                            KeyCode::Space => player.toggle_pause(),
                            KeyCode::KeyR => {
                                if let Err(err) = player.reset() {
                                    log::warn!("Reset rejected: {}", err);
                                }
                            }
                            KeyCode::F3 => player.toggle_overlay(),
                            KeyCode::Digit1 => bundle_to_load = Some("demo"),
                            KeyCode::Digit2 => bundle_to_load = Some("orbit"),
                            KeyCode::Digit3 => bundle_to_load = Some("waves"),
                            _ => {}
                        }
                    }
                }
            }

            _ => {}
        }

        if let Some(reference) = bundle_to_load {
            self.switch_bundle(reference);
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Vitrine player starting...");

    let event_loop = EventLoop::new().expect("Failed to create event loop");
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = App::new();
    event_loop.run_app(&mut app).expect("Event loop error");
}
