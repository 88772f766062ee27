use glam::{Mat4, Vec3};

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
}

/// Perspective camera owned by the engine context. Bundles never touch it;
/// manifests position it, resize events keep the aspect ratio honest.
pub struct Camera3D {
    pub position: Vec3,
    pub target: Vec3,
    pub fov_y_deg: f32,
    pub near: f32,
    pub far: f32,
    pub aspect: f32,
}

impl Camera3D {
    pub fn new(viewport_width: u32, viewport_height: u32) -> Self {
        Self {
            position: Vec3::new(0.0, 2.0, 6.0),
            target: Vec3::ZERO,
            fov_y_deg: 75.0,
            near: 0.1,
            far: 1000.0,
            aspect: aspect_ratio(viewport_width, viewport_height),
        }
    }

    /// Recomputes the aspect ratio from the current viewport bounds. Cheap
    /// enough to call on every resize event.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.aspect = aspect_ratio(width, height);
    }

    pub fn build_uniform(&self) -> CameraUniform {
        let view = Mat4::look_at_rh(self.position, self.target, Vec3::Y);
        let proj = Mat4::perspective_rh(self.fov_y_deg.to_radians(), self.aspect, self.near, self.far);
        CameraUniform {
            view_proj: (proj * view).to_cols_array_2d(),
        }
    }
}

fn aspect_ratio(width: u32, height: u32) -> f32 {
    width.max(1) as f32 / height.max(1) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aspect_tracks_viewport() {
        let mut camera = Camera3D::new(1280, 720);
        assert!((camera.aspect - 1280.0 / 720.0).abs() < 1e-6);

        camera.set_viewport(800, 800);
        assert!((camera.aspect - 1.0).abs() < 1e-6);
    }

    #[test]
    fn zero_viewport_does_not_divide_by_zero() {
        let camera = Camera3D::new(0, 0);
        assert!(camera.aspect.is_finite());
    }

    #[test]
    fn view_projection_maps_the_target_in_front_of_the_camera() {
        let mut camera = Camera3D::new(100, 100);
        camera.position = Vec3::new(0.0, 0.0, 5.0);
        camera.target = Vec3::ZERO;

        let view_proj = Mat4::from_cols_array_2d(&camera.build_uniform().view_proj);
        let projected = view_proj.project_point3(Vec3::ZERO);
        // The origin sits on the camera axis, inside the depth range.
        assert!(projected.x.abs() < 1e-4);
        assert!(projected.y.abs() < 1e-4);
        assert!(projected.z > 0.0 && projected.z < 1.0);
    }
}
