use glam::Vec3;

use crate::color::Color;

/// Light source attached to the scene graph. The renderer folds all ambient
/// terms together and uses the first directional light it encounters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Light {
    Directional {
        /// Direction the light travels in (normalized on construction).
        direction: Vec3,
        color: Color,
        intensity: f32,
    },
    Ambient {
        color: Color,
        intensity: f32,
    },
}

impl Light {
    pub fn directional(direction: Vec3, color: Color, intensity: f32) -> Self {
        Self::Directional {
            direction: direction.normalize_or_zero(),
            color,
            intensity,
        }
    }

    pub fn ambient(color: Color, intensity: f32) -> Self {
        Self::Ambient { color, intensity }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directional_constructor_normalizes() {
        let light = Light::directional(Vec3::new(0.0, -10.0, 0.0), Color::WHITE, 2.0);
        match light {
            Light::Directional { direction, .. } => {
                assert!((direction.length() - 1.0).abs() < 1e-6);
            }
            _ => panic!("expected a directional light"),
        }
    }
}
