use glam::{EulerRot, Quat, Vec3};

use vitrine_core::color::Color;
use vitrine_core::geometry::{Geometry, GeometryHandle};
use vitrine_core::scene::{Light, NodeId, SceneNode, Transform};

use crate::bundle::{BundleCtx, BundleError, ContentBundle, TeardownCtx, TeardownError, UpdateCtx};

const CUBE_COLOR: Color = Color { r: 0.388, g: 0.4, b: 0.945 };
const GRID_COLOR: Color = Color { r: 0.267, g: 0.267, b: 0.267 };

/// A cube spinning and hovering over a reference grid. The canonical "is the
/// player alive" scene.
struct SpinDemo {
    cube: NodeId,
    cube_geometry: GeometryHandle,
    grid_geometry: GeometryHandle,
    angle_x: f32,
    angle_y: f32,
}

pub fn create(ctx: &mut BundleCtx<'_>) -> Result<Box<dyn ContentBundle>, BundleError> {
    let cube_geometry = ctx.geometry.insert(Geometry::cuboid(1.0, 1.0, 1.0, CUBE_COLOR));
    let grid_geometry = ctx.geometry.insert(Geometry::grid(10.0, 10, GRID_COLOR));

    let cube = ctx.scene.attach(
        SceneNode::mesh(cube_geometry)
            .with_transform(Transform::from_translation(Vec3::new(0.0, 1.0, 0.0))),
    );
    ctx.scene.attach(SceneNode::mesh(grid_geometry));
    ctx.scene.attach(SceneNode::light(Light::directional(
        Vec3::new(-2.0, -5.0, -2.0),
        Color::WHITE,
        2.0,
    )));
    ctx.scene.attach(SceneNode::light(Light::ambient(
        Color::new(0.25, 0.25, 0.25),
        1.0,
    )));

    Ok(Box::new(SpinDemo {
        cube,
        cube_geometry,
        grid_geometry,
        angle_x: 0.0,
        angle_y: 0.0,
    }))
}

impl ContentBundle for SpinDemo {
    fn update(&mut self, ctx: &mut UpdateCtx<'_>) {
        self.angle_x += 1.0 * ctx.delta;
        self.angle_y += 0.5 * ctx.delta;

        if let Some(node) = ctx.scene.get_mut(self.cube) {
            node.transform.rotation = Quat::from_euler(EulerRot::XYZ, self.angle_x, self.angle_y, 0.0);
            // Simple hover effect.
            node.transform.translation.y = 1.0 + (ctx.elapsed * 2.0).sin() * 0.2;
        }
    }

    fn dispose(&mut self, ctx: &mut TeardownCtx<'_>) -> Result<(), TeardownError> {
        ctx.geometry.dispose(self.cube_geometry);
        ctx.geometry.dispose(self.grid_geometry);
        Ok(())
    }
}
