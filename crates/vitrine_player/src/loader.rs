use std::collections::HashMap;

use thiserror::Error;

use vitrine_core::geometry::GeometryStore;
use vitrine_core::scene::SceneGraph;

use crate::bundle::{BundleError, BundleFactory};
use crate::lifecycle::{LifecycleController, LoadOutcome, LoadTicket};

/// A bundle reference failed to resolve or initialize. Either way the
/// reference travels with the error so the notice names the content that
/// broke, not just that something did.
#[derive(Debug, Error)]
pub enum BundleLoadError {
    #[error("no bundle is registered under reference '{reference}'")]
    UnknownReference { reference: String },
    #[error("bundle '{reference}' failed to initialize: {source}")]
    Factory {
        reference: String,
        #[source]
        source: BundleError,
    },
}

impl BundleLoadError {
    pub fn reference(&self) -> &str {
        match self {
            Self::UnknownReference { reference } | Self::Factory { reference, .. } => reference,
        }
    }
}

/// Maps bundle references to their factories.
///
/// Registration happens once at startup, which is what makes the bundle
/// contract compile-time checked: there is no dynamic code path, a reference
/// either resolves to a registered factory or fails with a load error.
#[derive(Default)]
pub struct BundleRegistry {
    factories: HashMap<String, Box<dyn BundleFactory>>,
}

impl BundleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, reference: impl Into<String>, factory: impl BundleFactory + 'static) {
        let reference = reference.into();
        if self
            .factories
            .insert(reference.clone(), Box::new(factory))
            .is_some()
        {
            log::warn!(
                "Bundle '{}' was already registered and has been replaced",
                reference
            );
        }
    }

    pub fn resolve(&self, reference: &str) -> Result<&dyn BundleFactory, BundleLoadError> {
        self.factories
            .get(reference)
            .map(|factory| factory.as_ref())
            .ok_or_else(|| BundleLoadError::UnknownReference {
                reference: reference.to_string(),
            })
    }

    /// Registered references in sorted order, for logs and the overlay.
    pub fn references(&self) -> Vec<&str> {
        let mut references: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        references.sort_unstable();
        references
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.factories.len()
    }
}

/// Completes a load that `begin_load` opened: applies engine configuration,
/// resolves the reference, and hands the factory to the controller.
///
/// `configure_engine` always runs before the factory does, so a bundle comes
/// up against the manifest's camera pose and background, never the previous
/// bundle's. A reference that fails to resolve closes the load ticket and
/// leaves the player Idle with nothing attached.
pub fn resolve_and_attach(
    controller: &mut LifecycleController,
    ticket: LoadTicket,
    registry: &BundleRegistry,
    reference: &str,
    scene: &mut SceneGraph,
    geometry: &mut GeometryStore,
    configure_engine: impl FnOnce(),
) -> Result<LoadOutcome, BundleLoadError> {
    configure_engine();

    let factory = match registry.resolve(reference) {
        Ok(factory) => factory,
        Err(err) => {
            controller.fail_load(ticket);
            return Err(err);
        }
    };

    controller.attach(ticket, reference, factory, scene, geometry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::{BundleCtx, ContentBundle, TeardownCtx, UpdateCtx};
    use vitrine_core::geometry::GeometryStore;
    use vitrine_core::scene::SceneGraph;

    struct NullBundle;

    impl ContentBundle for NullBundle {
        fn update(&mut self, _ctx: &mut UpdateCtx<'_>) {}
        fn dispose(&mut self, _ctx: &mut TeardownCtx<'_>) -> Result<(), crate::bundle::TeardownError> {
            Ok(())
        }
    }

    fn null_factory(_ctx: &mut BundleCtx<'_>) -> Result<Box<dyn ContentBundle>, BundleError> {
        Ok(Box::new(NullBundle))
    }

    #[test]
    fn resolve_finds_registered_factory() {
        let mut registry = BundleRegistry::new();
        registry.register("demo", null_factory);

        let factory = registry.resolve("demo").expect("'demo' is registered");
        let mut scene = SceneGraph::new();
        let mut geometry = GeometryStore::new();
        let mut ctx = BundleCtx {
            scene: &mut scene,
            geometry: &mut geometry,
        };
        assert!(factory.create(&mut ctx).is_ok());
    }

    #[test]
    fn resolve_unknown_reference_reports_the_reference() {
        let registry = BundleRegistry::new();
        let err = registry.resolve("missing").err().expect("nothing is registered");
        assert_eq!(err.reference(), "missing");
        assert!(err.to_string().contains("missing"), "message was: {}", err);
    }

    #[test]
    fn re_registering_replaces_the_factory() {
        let mut registry = BundleRegistry::new();
        registry.register("demo", null_factory);
        registry.register("demo", null_factory);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn references_are_sorted() {
        let mut registry = BundleRegistry::new();
        registry.register("waves", null_factory);
        registry.register("demo", null_factory);
        registry.register("orbit", null_factory);
        assert_eq!(registry.references(), vec!["demo", "orbit", "waves"]);
    }

    #[test]
    fn engine_configuration_runs_before_the_factory() {
        use std::cell::Cell;
        use std::rc::Rc;

        let configured = Rc::new(Cell::new(false));
        let seen_by_factory = Rc::new(Cell::new(false));

        let mut registry = BundleRegistry::new();
        {
            let configured = configured.clone();
            let seen_by_factory = seen_by_factory.clone();
            registry.register("probe", move |_ctx: &mut BundleCtx<'_>| {
                seen_by_factory.set(configured.get());
                Ok::<Box<dyn ContentBundle>, BundleError>(Box::new(NullBundle))
            });
        }

        let mut controller = LifecycleController::new();
        let mut scene = SceneGraph::new();
        let mut geometry = GeometryStore::new();
        let ticket = controller
            .begin_load(&mut scene, &mut geometry)
            .expect("begin_load is legal");

        resolve_and_attach(
            &mut controller,
            ticket,
            &registry,
            "probe",
            &mut scene,
            &mut geometry,
            || configured.set(true),
        )
        .expect("load should succeed");

        assert!(
            seen_by_factory.get(),
            "the manifest must be applied before the factory runs"
        );
    }

    #[test]
    fn unresolved_reference_closes_the_ticket_and_returns_to_idle() {
        use vitrine_core::state::PlayerState;

        let registry = BundleRegistry::new();
        let mut controller = LifecycleController::new();
        let mut scene = SceneGraph::new();
        let mut geometry = GeometryStore::new();
        let ticket = controller
            .begin_load(&mut scene, &mut geometry)
            .expect("begin_load is legal");

        let err = resolve_and_attach(
            &mut controller,
            ticket,
            &registry,
            "missing",
            &mut scene,
            &mut geometry,
            || {},
        )
        .expect_err("nothing is registered");

        assert_eq!(err.reference(), "missing");
        assert_eq!(controller.state(), PlayerState::Idle);
        assert!(!controller.has_pending_frame());
        assert!(scene.is_empty(), "a failed resolution must leave no scene mutation");
    }

    #[test]
    fn closures_work_as_factories() {
        let mut registry = BundleRegistry::new();
        registry.register("broken", |_ctx: &mut BundleCtx<'_>| {
            Err::<Box<dyn ContentBundle>, _>(BundleError::new("asset missing"))
        });

        let factory = registry.resolve("broken").expect("'broken' is registered");
        let mut scene = SceneGraph::new();
        let mut geometry = GeometryStore::new();
        let mut ctx = BundleCtx {
            scene: &mut scene,
            geometry: &mut geometry,
        };
        let err = factory.create(&mut ctx).err().expect("factory always fails");
        assert!(err.to_string().contains("asset missing"));
    }
}
