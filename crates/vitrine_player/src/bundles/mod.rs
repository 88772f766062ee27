//! Built-in content bundles, one per catalog entry type: a game-style demo,
//! a simulation, and an educational visual.

mod orbit;
mod spin_demo;
mod waves;

use crate::loader::BundleRegistry;

/// Registry preloaded with every built-in bundle.
pub fn builtin_registry() -> BundleRegistry {
    let mut registry = BundleRegistry::new();
    registry.register("demo", spin_demo::create);
    registry.register("orbit", orbit::create);
    registry.register("waves", waves::create);
    registry
}
