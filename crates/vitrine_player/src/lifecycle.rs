//! Player lifecycle state machine.
//!
//! Owns the one-bundle-at-a-time invariant: every load starts with a full
//! teardown (cancel the pending frame, detach all scene children, dispose the
//! active bundle), so two bundles' geometry can never coexist under the scene
//! root. Loads are tagged with a generation counter; a load result whose
//! ticket no longer matches the current generation is discarded without ever
//! invoking its factory, which is what keeps a superseded load from attaching
//! a stale bundle to the live scene.

use vitrine_core::clock::{FrameTick, PlayClock};
use vitrine_core::frame::{FrameHandle, FrameScheduler};
use vitrine_core::geometry::GeometryStore;
use vitrine_core::scene::SceneGraph;
use vitrine_core::state::{IllegalState, PlayerState};

use crate::bundle::{BundleCtx, BundleFactory, ContentBundle, TeardownCtx, UpdateCtx};
use crate::loader::BundleLoadError;

/// Permission to finish the load it was issued for. Goes stale the moment a
/// reset, dispose, or newer load bumps the generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
}

/// What became of a completed load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The bundle is attached and the player is playing.
    Attached,
    /// A newer load or reset superseded this one; its factory never ran.
    Superseded,
}

pub struct LifecycleController {
    state: PlayerState,
    clock: PlayClock,
    scheduler: FrameScheduler,
    generation: u64,
    active: Option<Box<dyn ContentBundle>>,
}

impl LifecycleController {
    pub fn new() -> Self {
        Self {
            state: PlayerState::Idle,
            clock: PlayClock::new(),
            scheduler: FrameScheduler::new(),
            generation: 0,
            active: None,
        }
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn clock(&self) -> &PlayClock {
        &self.clock
    }

    pub fn pending_frame(&self) -> Option<FrameHandle> {
        self.scheduler.pending()
    }

    pub fn has_pending_frame(&self) -> bool {
        self.scheduler.has_pending()
    }

    /// Starts a load: tears down whatever was attached and hands back the
    /// ticket that the eventual resolution must present.
    pub fn begin_load(
        &mut self,
        scene: &mut SceneGraph,
        geometry: &mut GeometryStore,
    ) -> Result<LoadTicket, IllegalState> {
        if self.state.is_terminal() {
            return Err(IllegalState::new("load_bundle", self.state));
        }
        self.teardown(scene, geometry);
        self.state = PlayerState::Loading;
        Ok(LoadTicket {
            generation: self.generation,
        })
    }

    /// Marks the load behind `ticket` as failed before its factory ran
    /// (e.g. the reference did not resolve). Stale tickets are ignored.
    pub fn fail_load(&mut self, ticket: LoadTicket) {
        if ticket.generation == self.generation && self.state == PlayerState::Loading {
            self.state = PlayerState::Idle;
        }
    }

    /// Completes a load by invoking `factory` against the live scene.
    ///
    /// If the ticket was superseded the factory is not invoked at all and
    /// the call reports `Superseded`. On factory failure the player returns
    /// to Idle with no bundle attached; scene mutations a misbehaving
    /// factory made before failing are not rolled back.
    pub fn attach(
        &mut self,
        ticket: LoadTicket,
        reference: &str,
        factory: &dyn BundleFactory,
        scene: &mut SceneGraph,
        geometry: &mut GeometryStore,
    ) -> Result<LoadOutcome, BundleLoadError> {
        if ticket.generation != self.generation || self.state != PlayerState::Loading {
            log::debug!(
                "Discarding superseded load result for bundle '{}'",
                reference
            );
            return Ok(LoadOutcome::Superseded);
        }

        let mut ctx = BundleCtx { scene, geometry };
        match factory.create(&mut ctx) {
            Ok(bundle) => {
                self.active = Some(bundle);
                self.state = PlayerState::Playing;
                self.clock.reset();
                self.clock.start();
                self.scheduler.schedule();
                log::info!("Bundle '{}' attached, playing", reference);
                Ok(LoadOutcome::Attached)
            }
            Err(source) => {
                self.state = PlayerState::Idle;
                Err(BundleLoadError::Factory {
                    reference: reference.to_string(),
                    source,
                })
            }
        }
    }

    /// Resumes playback. No-op while already playing; illegal when there is
    /// no bundle to play.
    pub fn play(&mut self) -> Result<(), IllegalState> {
        match self.state {
            PlayerState::Playing => Ok(()),
            PlayerState::Paused => {
                self.state = PlayerState::Playing;
                self.clock.start();
                self.scheduler.schedule();
                log::info!("Playback resumed");
                Ok(())
            }
            state => Err(IllegalState::new("play", state)),
        }
    }

    /// Halts playback. No-op while already paused. Cancels the pending
    /// frame, so no further update or render happens until `play`.
    pub fn pause(&mut self) -> Result<(), IllegalState> {
        match self.state {
            PlayerState::Paused => Ok(()),
            PlayerState::Playing => {
                self.state = PlayerState::Paused;
                self.clock.stop();
                self.scheduler.cancel();
                log::info!("Playback paused");
                Ok(())
            }
            state => Err(IllegalState::new("pause", state)),
        }
    }

    /// Tears everything down and returns to Idle, ready for a fresh load.
    pub fn reset(
        &mut self,
        scene: &mut SceneGraph,
        geometry: &mut GeometryStore,
    ) -> Result<(), IllegalState> {
        if self.state.is_terminal() {
            return Err(IllegalState::new("reset", self.state));
        }
        self.teardown(scene, geometry);
        self.state = PlayerState::Idle;
        Ok(())
    }

    /// Terminal teardown. After this every operation fails with
    /// `IllegalState`; the caller releases the output device.
    pub fn dispose(
        &mut self,
        scene: &mut SceneGraph,
        geometry: &mut GeometryStore,
    ) -> Result<(), IllegalState> {
        if self.state.is_terminal() {
            return Err(IllegalState::new("dispose", self.state));
        }
        self.teardown(scene, geometry);
        self.state = PlayerState::Disposed;
        log::info!("Player disposed");
        Ok(())
    }

    /// Claims a fired frame callback. Returns the frame's timing iff the
    /// handle is the live one *and* the player is still playing; a callback
    /// that raced a pause/reset/dispose is dropped here, which is what keeps
    /// a dangling final frame from running after teardown.
    pub fn begin_frame(&mut self, handle: FrameHandle) -> Option<FrameTick> {
        if !self.scheduler.acquire(handle) {
            return None;
        }
        if self.state != PlayerState::Playing {
            return None;
        }
        Some(self.clock.tick())
    }

    /// Runs the active bundle's update for this frame.
    pub fn update_active(&mut self, scene: &mut SceneGraph, tick: FrameTick) {
        if let Some(bundle) = self.active.as_mut() {
            let mut ctx = UpdateCtx {
                scene,
                delta: tick.delta,
                elapsed: tick.elapsed,
            };
            bundle.update(&mut ctx);
        }
    }

    /// Schedules the next frame iff still playing.
    pub fn end_frame(&mut self) -> Option<FrameHandle> {
        if self.state == PlayerState::Playing {
            Some(self.scheduler.schedule())
        } else {
            None
        }
    }

    /// The teardown sequence shared by load/reset/dispose: cancel the
    /// pending frame, detach all scene children, dispose the active bundle.
    /// A dispose failure is logged and isolated; the rest of the sequence
    /// always completes.
    fn teardown(&mut self, scene: &mut SceneGraph, geometry: &mut GeometryStore) {
        self.scheduler.cancel();
        self.clock.reset();

        let detached = scene.clear();
        if detached > 0 {
            log::debug!("Detached {} scene nodes", detached);
        }

        if let Some(mut bundle) = self.active.take() {
            let mut ctx = TeardownCtx { scene, geometry };
            if let Err(err) = bundle.dispose(&mut ctx) {
                log::error!("Bundle dispose failed: {} (teardown continues)", err);
            }
        }

        let leaked = geometry.live_count();
        if leaked > 0 {
            log::warn!("{} geometries still allocated after teardown", leaked);
        }

        self.generation += 1;
    }
}

impl Default for LifecycleController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    use vitrine_core::color::Color;
    use vitrine_core::geometry::{Geometry, GeometryHandle};
    use vitrine_core::scene::{NodeId, SceneNode};

    use crate::bundle::{BundleError, TeardownError};

    /// Shared observation point for everything a test bundle does.
    #[derive(Default)]
    struct Probe {
        factory_calls: u32,
        dispose_calls: u32,
        updates: Vec<(f32, f32)>,
        fail_factory: bool,
        fail_dispose: bool,
    }

    struct ProbeBundle {
        probe: Rc<RefCell<Probe>>,
        node: NodeId,
        geometry: GeometryHandle,
    }

    impl ContentBundle for ProbeBundle {
        fn update(&mut self, ctx: &mut UpdateCtx<'_>) {
            assert!(
                ctx.scene.contains(self.node),
                "bundle's node must be live while it is attached"
            );
            self.probe.borrow_mut().updates.push((ctx.delta, ctx.elapsed));
        }

        fn dispose(&mut self, ctx: &mut TeardownCtx<'_>) -> Result<(), TeardownError> {
            self.probe.borrow_mut().dispose_calls += 1;
            ctx.geometry.dispose(self.geometry);
            if self.probe.borrow().fail_dispose {
                return Err(TeardownError::new("probe dispose failure"));
            }
            Ok(())
        }
    }

    fn probe_factory(
        probe: Rc<RefCell<Probe>>,
    ) -> impl Fn(&mut BundleCtx<'_>) -> Result<Box<dyn ContentBundle>, BundleError> {
        move |ctx: &mut BundleCtx<'_>| {
            probe.borrow_mut().factory_calls += 1;
            if probe.borrow().fail_factory {
                return Err(BundleError::new("probe factory failure"));
            }
            let geometry = ctx
                .geometry
                .insert(Geometry::cuboid(1.0, 1.0, 1.0, Color::WHITE));
            let node = ctx.scene.attach(SceneNode::mesh(geometry));
            Ok(Box::new(ProbeBundle {
                probe: probe.clone(),
                node,
                geometry,
            }))
        }
    }

    struct Fixture {
        controller: LifecycleController,
        scene: SceneGraph,
        geometry: GeometryStore,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                controller: LifecycleController::new(),
                scene: SceneGraph::new(),
                geometry: GeometryStore::new(),
            }
        }

        fn load(&mut self, probe: &Rc<RefCell<Probe>>) -> Result<LoadOutcome, BundleLoadError> {
            let ticket = self
                .controller
                .begin_load(&mut self.scene, &mut self.geometry)
                .expect("begin_load is legal outside Disposed");
            let factory = probe_factory(probe.clone());
            self.controller.attach(
                ticket,
                "probe",
                &factory,
                &mut self.scene,
                &mut self.geometry,
            )
        }

        fn run_frame(&mut self) -> Option<FrameTick> {
            let handle = self.controller.pending_frame()?;
            let tick = self.controller.begin_frame(handle)?;
            self.controller.update_active(&mut self.scene, tick);
            self.controller.end_frame();
            Some(tick)
        }

        /// The frame-handle bound: a pending frame exists iff Playing.
        fn assert_frame_invariant(&self) {
            assert_eq!(
                self.controller.has_pending_frame(),
                self.controller.state() == PlayerState::Playing,
                "frame-handle invariant broken in state {}",
                self.controller.state()
            );
        }
    }

    #[test]
    fn successful_load_attaches_and_plays() {
        let mut fixture = Fixture::new();
        let probe = Rc::new(RefCell::new(Probe::default()));

        let outcome = fixture.load(&probe).expect("load should succeed");
        assert_eq!(outcome, LoadOutcome::Attached);
        assert_eq!(fixture.controller.state(), PlayerState::Playing);
        assert_eq!(probe.borrow().factory_calls, 1);
        assert_eq!(fixture.scene.root_count(), 1);
        fixture.assert_frame_invariant();
    }

    #[test]
    fn frames_drive_update_with_monotonic_elapsed() {
        let mut fixture = Fixture::new();
        let probe = Rc::new(RefCell::new(Probe::default()));
        fixture.load(&probe).expect("load should succeed");

        for _ in 0..3 {
            std::thread::sleep(Duration::from_millis(2));
            fixture.run_frame().expect("a frame should be pending while playing");
        }

        let updates = probe.borrow().updates.clone();
        assert_eq!(updates.len(), 3);
        let mut previous_elapsed = -1.0;
        for (delta, elapsed) in updates {
            assert!(delta >= 0.0, "delta must be non-negative");
            assert!(
                elapsed > previous_elapsed,
                "elapsed must increase monotonically: {} then {}",
                previous_elapsed,
                elapsed
            );
            previous_elapsed = elapsed;
        }
        fixture.assert_frame_invariant();
    }

    #[test]
    fn pause_and_play_are_idempotent() {
        let mut fixture = Fixture::new();
        let probe = Rc::new(RefCell::new(Probe::default()));
        fixture.load(&probe).expect("load should succeed");

        fixture.controller.pause().expect("pause from Playing is legal");
        fixture.controller.pause().expect("second pause is a no-op");
        assert_eq!(fixture.controller.state(), PlayerState::Paused);
        fixture.assert_frame_invariant();

        fixture.controller.play().expect("play from Paused is legal");
        fixture.controller.play().expect("second play is a no-op");
        assert_eq!(fixture.controller.state(), PlayerState::Playing);
        fixture.assert_frame_invariant();
    }

    #[test]
    fn play_without_a_bundle_is_illegal() {
        let mut fixture = Fixture::new();
        let err = fixture.controller.play().expect_err("nothing to play in Idle");
        assert_eq!(err, IllegalState::new("play", PlayerState::Idle));
        assert_eq!(
            fixture.controller.state(),
            PlayerState::Idle,
            "an illegal call must not move the state machine"
        );
    }

    #[test]
    fn pause_without_a_bundle_is_illegal() {
        let mut fixture = Fixture::new();
        assert!(fixture.controller.pause().is_err());
    }

    #[test]
    fn reset_detaches_everything_and_disposes_once() {
        let mut fixture = Fixture::new();
        let probe = Rc::new(RefCell::new(Probe::default()));
        fixture.load(&probe).expect("load should succeed");

        fixture
            .controller
            .reset(&mut fixture.scene, &mut fixture.geometry)
            .expect("reset is legal while playing");

        assert_eq!(fixture.controller.state(), PlayerState::Idle);
        assert!(fixture.scene.is_empty(), "reset must detach all scene children");
        assert_eq!(fixture.geometry.live_count(), 0);
        assert_eq!(probe.borrow().dispose_calls, 1);
        fixture.assert_frame_invariant();

        // Reset from Idle is legal and must not double-dispose.
        fixture
            .controller
            .reset(&mut fixture.scene, &mut fixture.geometry)
            .expect("reset from Idle is legal");
        assert_eq!(probe.borrow().dispose_calls, 1);
    }

    #[test]
    fn loading_over_an_active_bundle_never_leaves_two_attached() {
        let mut fixture = Fixture::new();
        let first = Rc::new(RefCell::new(Probe::default()));
        let second = Rc::new(RefCell::new(Probe::default()));

        fixture.load(&first).expect("first load should succeed");
        fixture.load(&second).expect("second load should succeed");

        assert_eq!(fixture.scene.root_count(), 1, "only the new bundle's nodes remain");
        assert_eq!(first.borrow().dispose_calls, 1, "old bundle disposed exactly once");
        assert_eq!(second.borrow().dispose_calls, 0);
        assert_eq!(fixture.geometry.live_count(), 1, "only the new bundle's geometry");
        fixture.assert_frame_invariant();
    }

    #[test]
    fn superseded_load_never_invokes_its_factory() {
        let mut fixture = Fixture::new();
        let stale_probe = Rc::new(RefCell::new(Probe::default()));
        let live_probe = Rc::new(RefCell::new(Probe::default()));

        // Load A begins, but is reset away before its resolution arrives.
        let stale_ticket = fixture
            .controller
            .begin_load(&mut fixture.scene, &mut fixture.geometry)
            .expect("begin_load is legal");
        fixture
            .controller
            .reset(&mut fixture.scene, &mut fixture.geometry)
            .expect("reset during a load is legal");

        // Load B begins and completes.
        fixture.load(&live_probe).expect("live load should succeed");

        // A's resolution finally shows up.
        let stale_factory = probe_factory(stale_probe.clone());
        let outcome = fixture
            .controller
            .attach(
                stale_ticket,
                "stale",
                &stale_factory,
                &mut fixture.scene,
                &mut fixture.geometry,
            )
            .expect("a stale completion is not an error");

        assert_eq!(outcome, LoadOutcome::Superseded);
        assert_eq!(
            stale_probe.borrow().factory_calls,
            0,
            "a superseded load's factory must never touch the live scene"
        );
        assert_eq!(fixture.scene.root_count(), 1);
        assert_eq!(fixture.controller.state(), PlayerState::Playing);
        assert_eq!(live_probe.borrow().dispose_calls, 0);
    }

    #[test]
    fn factory_failure_returns_to_idle_with_no_loop_started() {
        let mut fixture = Fixture::new();
        let probe = Rc::new(RefCell::new(Probe {
            fail_factory: true,
            ..Probe::default()
        }));

        let err = fixture.load(&probe).expect_err("factory is rigged to fail");
        assert!(matches!(err, BundleLoadError::Factory { .. }));
        assert_eq!(err.reference(), "probe");
        assert_eq!(fixture.controller.state(), PlayerState::Idle);
        assert!(!fixture.controller.has_pending_frame(), "no render loop after a failed load");

        let play_err = fixture.controller.play().expect_err("no bundle to play");
        assert_eq!(play_err, IllegalState::new("play", PlayerState::Idle));
    }

    #[test]
    fn fail_load_applies_only_to_the_current_ticket() {
        let mut fixture = Fixture::new();
        let probe = Rc::new(RefCell::new(Probe::default()));

        let stale_ticket = fixture
            .controller
            .begin_load(&mut fixture.scene, &mut fixture.geometry)
            .expect("begin_load is legal");
        fixture.load(&probe).expect("newer load should succeed");

        // The stale resolution failing must not disturb the live bundle.
        fixture.controller.fail_load(stale_ticket);
        assert_eq!(fixture.controller.state(), PlayerState::Playing);
    }

    #[test]
    fn dispose_error_does_not_stop_teardown() {
        let mut fixture = Fixture::new();
        let probe = Rc::new(RefCell::new(Probe {
            fail_dispose: true,
            ..Probe::default()
        }));
        fixture.load(&probe).expect("load should succeed");

        fixture
            .controller
            .dispose(&mut fixture.scene, &mut fixture.geometry)
            .expect("dispose is legal while playing");

        assert_eq!(fixture.controller.state(), PlayerState::Disposed);
        assert!(fixture.scene.is_empty(), "teardown must finish despite the dispose error");
        assert!(!fixture.controller.has_pending_frame());
        assert_eq!(probe.borrow().dispose_calls, 1);
    }

    #[test]
    fn disposed_is_terminal() {
        let mut fixture = Fixture::new();
        let probe = Rc::new(RefCell::new(Probe::default()));
        fixture.load(&probe).expect("load should succeed");

        fixture
            .controller
            .dispose(&mut fixture.scene, &mut fixture.geometry)
            .expect("first dispose is legal");

        assert!(fixture.controller.dispose(&mut fixture.scene, &mut fixture.geometry).is_err());
        assert!(fixture.controller.play().is_err());
        assert!(fixture.controller.pause().is_err());
        assert!(fixture.controller.reset(&mut fixture.scene, &mut fixture.geometry).is_err());
        assert!(fixture
            .controller
            .begin_load(&mut fixture.scene, &mut fixture.geometry)
            .is_err());
        assert_eq!(fixture.controller.state(), PlayerState::Disposed);
    }

    #[test]
    fn cancelled_frame_callback_is_dropped() {
        let mut fixture = Fixture::new();
        let probe = Rc::new(RefCell::new(Probe::default()));
        fixture.load(&probe).expect("load should succeed");

        let handle = fixture
            .controller
            .pending_frame()
            .expect("playing implies a pending frame");
        fixture.controller.pause().expect("pause is legal");

        assert!(
            fixture.controller.begin_frame(handle).is_none(),
            "a frame cancelled by pause must not run"
        );
        assert_eq!(probe.borrow().updates.len(), 0);
        fixture.assert_frame_invariant();
    }

    #[test]
    fn frame_invariant_holds_across_a_full_session() {
        let mut fixture = Fixture::new();
        let probe = Rc::new(RefCell::new(Probe::default()));

        fixture.assert_frame_invariant();
        fixture.load(&probe).expect("load should succeed");
        fixture.assert_frame_invariant();
        let _ = fixture.run_frame();
        fixture.assert_frame_invariant();
        fixture.controller.pause().expect("pause");
        fixture.assert_frame_invariant();
        fixture.controller.play().expect("play");
        fixture.assert_frame_invariant();
        fixture
            .controller
            .reset(&mut fixture.scene, &mut fixture.geometry)
            .expect("reset");
        fixture.assert_frame_invariant();
        fixture
            .controller
            .dispose(&mut fixture.scene, &mut fixture.geometry)
            .expect("dispose");
        fixture.assert_frame_invariant();
    }

    #[test]
    fn paused_wall_clock_is_excluded_from_elapsed() {
        let mut fixture = Fixture::new();
        let probe = Rc::new(RefCell::new(Probe::default()));
        fixture.load(&probe).expect("load should succeed");

        fixture.run_frame().expect("first frame");
        fixture.controller.pause().expect("pause");
        std::thread::sleep(Duration::from_millis(100));
        fixture.controller.play().expect("play");
        let tick = fixture.run_frame().expect("frame after resume");

        assert!(
            tick.elapsed < 0.09,
            "elapsed {} must not include the 100ms paused interval",
            tick.elapsed
        );
    }
}
