use glam::Vec3;

use vitrine_core::color::Color;
use vitrine_core::geometry::{Geometry, GeometryHandle};
use vitrine_core::scene::{Light, NodeId, SceneNode, Transform};

use crate::bundle::{BundleCtx, BundleError, ContentBundle, TeardownCtx, TeardownError, UpdateCtx};

const GRID_SIDE: usize = 12;
const SPACING: f32 = 0.55;

/// A field of cubes riding a sine wave. Every cube shares one geometry, so
/// this doubles as the smoke test for handle sharing: one dispose frees the
/// whole field.
struct WaveField {
    cubes: Vec<(NodeId, f32)>,
    cube_geometry: GeometryHandle,
}

pub fn create(ctx: &mut BundleCtx<'_>) -> Result<Box<dyn ContentBundle>, BundleError> {
    let cube_geometry = ctx
        .geometry
        .insert(Geometry::cuboid(0.35, 0.35, 0.35, Color::new(0.2, 0.75, 0.6)));

    // All cubes live under one group node, so the whole field is a single
    // subtree of the scene root.
    let field = ctx.scene.attach(SceneNode::group());

    let half_extent = (GRID_SIDE as f32 - 1.0) * SPACING * 0.5;
    let mut cubes = Vec::with_capacity(GRID_SIDE * GRID_SIDE);
    for row in 0..GRID_SIDE {
        for column in 0..GRID_SIDE {
            let x = column as f32 * SPACING - half_extent;
            let z = row as f32 * SPACING - half_extent;
            let node = ctx
                .scene
                .attach_child(
                    field,
                    SceneNode::mesh(cube_geometry)
                        .with_transform(Transform::from_translation(Vec3::new(x, 0.0, z))),
                )
                .ok_or_else(|| BundleError::new("wave field group vanished during setup"))?;
            let phase = (x + z) * 0.9;
            cubes.push((node, phase));
        }
    }

    ctx.scene.attach(SceneNode::light(Light::directional(
        Vec3::new(-1.5, -3.0, -2.0),
        Color::WHITE,
        1.8,
    )));
    ctx.scene.attach(SceneNode::light(Light::ambient(
        Color::new(0.2, 0.22, 0.25),
        1.0,
    )));

    Ok(Box::new(WaveField { cubes, cube_geometry }))
}

impl ContentBundle for WaveField {
    fn update(&mut self, ctx: &mut UpdateCtx<'_>) {
        for &(node, phase) in &self.cubes {
            if let Some(node) = ctx.scene.get_mut(node) {
                node.transform.translation.y = (ctx.elapsed * 2.0 + phase).sin() * 0.4;
            }
        }
    }

    fn dispose(&mut self, ctx: &mut TeardownCtx<'_>) -> Result<(), TeardownError> {
        ctx.geometry.dispose(self.cube_geometry);
        Ok(())
    }
}
