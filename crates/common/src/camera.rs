use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// Viewpoint used for distance sorting.
///
/// A render context holds a copy of its current camera; the scene owns the
/// camera that drives it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub location: Vec3,
    pub direction: Vec3,
    pub up: Vec3,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            location: Vec3::ZERO,
            direction: Vec3::NEG_Z,
            up: Vec3::Y,
        }
    }
}

impl Camera {
    pub fn new(location: Vec3, direction: Vec3) -> Self {
        Self {
            location,
            direction: direction.normalize_or(Vec3::NEG_Z),
            ..Self::default()
        }
    }

    pub fn look_at(location: Vec3, target: Vec3) -> Self {
        Self::new(location, target - location)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.location, self.direction, self.up)
    }

    /// Squared distance from the camera to `point`, measured in camera space.
    pub fn distance_to_cam(&self, point: Vec3) -> f32 {
        self.view_matrix().transform_point3(point).length_squared()
    }
}
