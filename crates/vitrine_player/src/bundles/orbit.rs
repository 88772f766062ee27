use glam::Vec3;

use vitrine_core::color::Color;
use vitrine_core::geometry::{Geometry, GeometryHandle};
use vitrine_core::scene::{Light, NodeId, SceneNode, Transform};

use crate::bundle::{BundleCtx, BundleError, ContentBundle, TeardownCtx, TeardownError, UpdateCtx};

struct Planet {
    node: NodeId,
    orbit_radius: f32,
    /// Radians per second around the sun.
    angular_speed: f32,
    phase: f32,
}

/// Toy solar system: a fixed sun and a handful of planets on circular
/// orbits, each with its own radius and period.
struct OrbitSim {
    planets: Vec<Planet>,
    geometries: Vec<GeometryHandle>,
}

const PLANETS: &[(f32, f32, f32, Color)] = &[
    // (orbit radius, angular speed, body radius, color)
    (1.6, 1.9, 0.18, Color { r: 0.72, g: 0.45, b: 0.2 }),
    (2.6, 1.1, 0.28, Color { r: 0.25, g: 0.5, b: 0.9 }),
    (3.8, 0.6, 0.22, Color { r: 0.8, g: 0.25, b: 0.2 }),
    (5.2, 0.35, 0.45, Color { r: 0.85, g: 0.7, b: 0.45 }),
];

pub fn create(ctx: &mut BundleCtx<'_>) -> Result<Box<dyn ContentBundle>, BundleError> {
    let mut geometries = Vec::new();

    let sun_geometry = ctx
        .geometry
        .insert(Geometry::uv_sphere(0.8, 24, 16, Color::new(1.0, 0.85, 0.3)));
    geometries.push(sun_geometry);
    ctx.scene.attach(SceneNode::mesh(sun_geometry));

    let mut planets = Vec::new();
    for (index, &(orbit_radius, angular_speed, body_radius, color)) in PLANETS.iter().enumerate() {
        let geometry = ctx
            .geometry
            .insert(Geometry::uv_sphere(body_radius, 18, 12, color));
        geometries.push(geometry);

        let phase = index as f32 * 1.7;
        let node = ctx.scene.attach(
            SceneNode::mesh(geometry).with_transform(Transform::from_translation(Vec3::new(
                orbit_radius * phase.cos(),
                0.0,
                orbit_radius * phase.sin(),
            ))),
        );
        planets.push(Planet {
            node,
            orbit_radius,
            angular_speed,
            phase,
        });
    }

    ctx.scene.attach(SceneNode::light(Light::directional(
        Vec3::new(-1.0, -2.0, -1.0),
        Color::WHITE,
        1.4,
    )));
    ctx.scene.attach(SceneNode::light(Light::ambient(
        Color::new(0.35, 0.32, 0.3),
        1.0,
    )));

    Ok(Box::new(OrbitSim { planets, geometries }))
}

impl ContentBundle for OrbitSim {
    fn update(&mut self, ctx: &mut UpdateCtx<'_>) {
        for planet in &self.planets {
            let angle = planet.phase + ctx.elapsed * planet.angular_speed;
            if let Some(node) = ctx.scene.get_mut(planet.node) {
                node.transform.translation = Vec3::new(
                    planet.orbit_radius * angle.cos(),
                    0.0,
                    planet.orbit_radius * angle.sin(),
                );
            }
        }
    }

    fn dispose(&mut self, ctx: &mut TeardownCtx<'_>) -> Result<(), TeardownError> {
        for geometry in self.geometries.drain(..) {
            ctx.geometry.dispose(geometry);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitrine_core::geometry::GeometryStore;
    use vitrine_core::scene::SceneGraph;

    #[test]
    fn planets_stay_on_their_orbit_radius() {
        let mut scene = SceneGraph::new();
        let mut geometry = GeometryStore::new();
        let mut bundle = create(&mut BundleCtx {
            scene: &mut scene,
            geometry: &mut geometry,
        })
        .expect("orbit factory should succeed");

        bundle.update(&mut UpdateCtx {
            scene: &mut scene,
            delta: 1.0 / 60.0,
            elapsed: 3.7,
        });

        // Skip the sun (first mesh node, at the origin).
        let mut radii = Vec::new();
        scene.for_each_world(|world, node| {
            if matches!(node.kind, vitrine_core::scene::NodeKind::Mesh(_)) {
                radii.push(world.transform_point3(Vec3::ZERO).length());
            }
        });
        assert_eq!(radii.len(), 1 + PLANETS.len());
        for (radius, &(orbit_radius, ..)) in radii[1..].iter().zip(PLANETS) {
            assert!(
                (radius - orbit_radius).abs() < 1e-3,
                "planet strayed from its orbit: {} vs {}",
                radius,
                orbit_radius
            );
        }
    }

    #[test]
    fn dispose_frees_sun_and_planets() {
        let mut scene = SceneGraph::new();
        let mut geometry = GeometryStore::new();
        let mut bundle = create(&mut BundleCtx {
            scene: &mut scene,
            geometry: &mut geometry,
        })
        .expect("orbit factory should succeed");

        scene.clear();
        bundle
            .dispose(&mut TeardownCtx {
                scene: &mut scene,
                geometry: &mut geometry,
            })
            .expect("orbit dispose should succeed");
        assert_eq!(geometry.live_count(), 0);
    }
}
