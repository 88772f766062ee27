//! The contract a content bundle must satisfy.
//!
//! Design contract: bundles author scene content, the host owns the scene.
//! A factory receives the shared scene-graph root and the geometry store,
//! attaches whatever it needs, and synchronously returns the capability pair
//! the host will drive: `update` once per frame while playing, `dispose`
//! exactly once at teardown. Node and geometry handles a bundle keeps are
//! generational, so handles from a previous life can never touch a newer
//! bundle's content.
//!
//! Geometry outlives node detachment by design: the host clearing the graph
//! does not free a bundle's geometry. `dispose` is where a bundle frees what
//! it allocated, and the host logs whatever is left over.

use thiserror::Error;

use vitrine_core::geometry::GeometryStore;
use vitrine_core::scene::SceneGraph;

/// A bundle factory failed to build its scene.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct BundleError(pub String);

impl BundleError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// A bundle's `dispose` failed. Reported but never allowed to interrupt the
/// rest of the teardown sequence.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct TeardownError(pub String);

impl TeardownError {
    #[allow(dead_code)]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// What a factory gets to work with while building its scene.
pub struct BundleCtx<'a> {
    pub scene: &'a mut SceneGraph,
    pub geometry: &'a mut GeometryStore,
}

/// Per-frame context handed to `update`.
pub struct UpdateCtx<'a> {
    pub scene: &'a mut SceneGraph,
    /// Seconds since the previous frame.
    pub delta: f32,
    /// Seconds of play time since this bundle started, pauses excluded.
    pub elapsed: f32,
}

/// Teardown context handed to `dispose`. The graph has already been cleared
/// when this arrives; the geometry store has not.
pub struct TeardownCtx<'a> {
    pub scene: &'a mut SceneGraph,
    pub geometry: &'a mut GeometryStore,
}

/// A running content bundle. Both operations are required: a bundle that has
/// nothing to free still implements `dispose` (returning `Ok`), which keeps
/// "forgot to clean up" visible at compile time instead of at leak time.
pub trait ContentBundle {
    fn update(&mut self, ctx: &mut UpdateCtx<'_>);
    fn dispose(&mut self, ctx: &mut TeardownCtx<'_>) -> Result<(), TeardownError>;
}

/// Builds a bundle against the host-provided context. Implemented for free
/// by any `fn(&mut BundleCtx) -> Result<Box<dyn ContentBundle>, BundleError>`.
pub trait BundleFactory {
    fn create(&self, ctx: &mut BundleCtx<'_>) -> Result<Box<dyn ContentBundle>, BundleError>;
}

impl<F> BundleFactory for F
where
    F: Fn(&mut BundleCtx<'_>) -> Result<Box<dyn ContentBundle>, BundleError>,
{
    fn create(&self, ctx: &mut BundleCtx<'_>) -> Result<Box<dyn ContentBundle>, BundleError> {
        self(ctx)
    }
}
