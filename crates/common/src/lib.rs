//! Shared value types for the lumen render-state core.
//!
//! Identity types for GPU contexts, textures and meshes, the capability
//! descriptor a backend reports, and the camera used for distance sorting.

mod camera;
mod types;

pub use camera::Camera;
pub use types::{Capabilities, ContextKey, MeshHandle, TextureKey, is_valid_vec3};

pub fn crate_info() -> &'static str {
    "lumen-common v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("common"));
    }
}
