use glam::Vec3;

use crate::color::Color;

/// One mesh vertex as authored by a bundle. GPU layout is the renderer's
/// concern; bundles only ever deal in this form.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub color: [f32; 4],
}

/// Indexed triangle geometry, CPU-side.
#[derive(Debug, Clone, Default)]
pub struct Geometry {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl Geometry {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Axis-aligned box centered on the origin, one flat-shaded quad per face.
    pub fn cuboid(width: f32, height: f32, depth: f32, color: Color) -> Self {
        let (hw, hh, hd) = (width * 0.5, height * 0.5, depth * 0.5);
        let faces: [(Vec3, [Vec3; 4]); 6] = [
            (
                Vec3::Z,
                [
                    Vec3::new(-hw, -hh, hd),
                    Vec3::new(hw, -hh, hd),
                    Vec3::new(hw, hh, hd),
                    Vec3::new(-hw, hh, hd),
                ],
            ),
            (
                Vec3::NEG_Z,
                [
                    Vec3::new(hw, -hh, -hd),
                    Vec3::new(-hw, -hh, -hd),
                    Vec3::new(-hw, hh, -hd),
                    Vec3::new(hw, hh, -hd),
                ],
            ),
            (
                Vec3::X,
                [
                    Vec3::new(hw, -hh, hd),
                    Vec3::new(hw, -hh, -hd),
                    Vec3::new(hw, hh, -hd),
                    Vec3::new(hw, hh, hd),
                ],
            ),
            (
                Vec3::NEG_X,
                [
                    Vec3::new(-hw, -hh, -hd),
                    Vec3::new(-hw, -hh, hd),
                    Vec3::new(-hw, hh, hd),
                    Vec3::new(-hw, hh, -hd),
                ],
            ),
            (
                Vec3::Y,
                [
                    Vec3::new(-hw, hh, hd),
                    Vec3::new(hw, hh, hd),
                    Vec3::new(hw, hh, -hd),
                    Vec3::new(-hw, hh, -hd),
                ],
            ),
            (
                Vec3::NEG_Y,
                [
                    Vec3::new(-hw, -hh, -hd),
                    Vec3::new(hw, -hh, -hd),
                    Vec3::new(hw, -hh, hd),
                    Vec3::new(-hw, -hh, hd),
                ],
            ),
        ];

        let mut geometry = Geometry::default();
        for (normal, corners) in faces {
            push_quad(&mut geometry, normal, corners, color);
        }
        geometry
    }

    /// Flat quad on the XZ plane facing +Y, centered on the origin.
    pub fn plane(width: f32, depth: f32, color: Color) -> Self {
        let (hw, hd) = (width * 0.5, depth * 0.5);
        let mut geometry = Geometry::default();
        push_quad(
            &mut geometry,
            Vec3::Y,
            [
                Vec3::new(-hw, 0.0, -hd),
                Vec3::new(-hw, 0.0, hd),
                Vec3::new(hw, 0.0, hd),
                Vec3::new(hw, 0.0, -hd),
            ],
            color,
        );
        geometry
    }

    /// UV sphere centered on the origin. `segments` is the slice count around
    /// the Y axis, `rings` the stack count pole to pole; both are clamped to
    /// a sane minimum.
    pub fn uv_sphere(radius: f32, segments: u32, rings: u32, color: Color) -> Self {
        let segments = segments.max(3);
        let rings = rings.max(2);
        let mut geometry = Geometry::default();

        for ring in 0..=rings {
            let phi = std::f32::consts::PI * ring as f32 / rings as f32;
            for segment in 0..=segments {
                let theta = std::f32::consts::TAU * segment as f32 / segments as f32;
                let normal = Vec3::new(
                    phi.sin() * theta.cos(),
                    phi.cos(),
                    phi.sin() * theta.sin(),
                );
                geometry.vertices.push(Vertex {
                    position: normal * radius,
                    normal,
                    color: rgba(color),
                });
            }
        }

        let stride = segments + 1;
        for ring in 0..rings {
            for segment in 0..segments {
                let a = ring * stride + segment;
                let b = a + stride;
                geometry.indices.extend_from_slice(&[a, b, a + 1, a + 1, b, b + 1]);
            }
        }
        geometry
    }

    /// Reference grid on the XZ plane, built from thin quads so it renders
    /// through the ordinary triangle pipeline.
    pub fn grid(size: f32, divisions: u32, color: Color) -> Self {
        let divisions = divisions.max(1);
        let half = size * 0.5;
        let step = size / divisions as f32;
        let half_line = (size * 0.002).max(0.001);
        let mut geometry = Geometry::default();

        for division in 0..=divisions {
            let offset = -half + division as f32 * step;
            // Line parallel to the X axis.
            push_quad(
                &mut geometry,
                Vec3::Y,
                [
                    Vec3::new(-half, 0.0, offset - half_line),
                    Vec3::new(-half, 0.0, offset + half_line),
                    Vec3::new(half, 0.0, offset + half_line),
                    Vec3::new(half, 0.0, offset - half_line),
                ],
                color,
            );
            // Line parallel to the Z axis.
            push_quad(
                &mut geometry,
                Vec3::Y,
                [
                    Vec3::new(offset - half_line, 0.0, -half),
                    Vec3::new(offset - half_line, 0.0, half),
                    Vec3::new(offset + half_line, 0.0, half),
                    Vec3::new(offset + half_line, 0.0, -half),
                ],
                color,
            );
        }
        geometry
    }
}

fn rgba(color: Color) -> [f32; 4] {
    [color.r, color.g, color.b, 1.0]
}

fn push_quad(geometry: &mut Geometry, normal: Vec3, corners: [Vec3; 4], color: Color) {
    let base = geometry.vertices.len() as u32;
    for corner in corners {
        geometry.vertices.push(Vertex {
            position: corner,
            normal,
            color: rgba(color),
        });
    }
    geometry
        .indices
        .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
}

/// Handle to geometry held in a [`GeometryStore`]. Generational: a handle
/// goes stale the moment its slot is disposed, even if the slot is later
/// reused by another bundle's geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GeometryHandle {
    index: u32,
    generation: u32,
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    geometry: Option<Geometry>,
}

/// Owns every geometry bundles allocate.
///
/// Detaching a scene node does *not* free its geometry; the owning bundle
/// must call `dispose` during teardown. The store tracks the live count so
/// the host can detect leaks after a bundle is gone.
#[derive(Debug, Default)]
pub struct GeometryStore {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl GeometryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, geometry: Geometry) -> GeometryHandle {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.geometry = Some(geometry);
            GeometryHandle {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                geometry: Some(geometry),
            });
            GeometryHandle {
                index,
                generation: 0,
            }
        }
    }

    pub fn get(&self, handle: GeometryHandle) -> Option<&Geometry> {
        let slot = self.slots.get(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.geometry.as_ref()
    }

    pub fn contains(&self, handle: GeometryHandle) -> bool {
        self.get(handle).is_some()
    }

    /// Frees the geometry behind `handle`. Returns `false` (and logs) for a
    /// stale or already-disposed handle.
    pub fn dispose(&mut self, handle: GeometryHandle) -> bool {
        let Some(slot) = self.slots.get_mut(handle.index as usize) else {
            log::warn!("Disposing unknown geometry handle {:?}", handle);
            return false;
        };
        if slot.generation != handle.generation || slot.geometry.is_none() {
            log::warn!("Geometry handle {:?} was already disposed", handle);
            return false;
        }
        slot.geometry = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        true
    }

    /// Number of geometries currently allocated.
    pub fn live_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.geometry.is_some())
            .count()
    }
}
