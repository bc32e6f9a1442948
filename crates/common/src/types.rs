use glam::Vec3;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identity of one underlying GPU context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContextKey(pub Uuid);

impl ContextKey {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ContextKey {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ContextKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ctx-{:.8}", self.0.to_string())
    }
}

/// Identity of a texture image. Opaque sorting groups drawables by this key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TextureKey(pub u64);

/// A handle referencing mesh data owned by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MeshHandle(pub u64);

/// What a GPU context can do. Reported by the backend when the context is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Capabilities {
    /// Number of fixed texture units the driver exposes.
    pub max_texture_units: usize,
    /// Number of simultaneous lights.
    pub max_lights: usize,
    pub supports_stencil: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            max_texture_units: 8,
            max_lights: 8,
            supports_stencil: true,
        }
    }
}

/// True when every component is finite.
pub fn is_valid_vec3(v: Vec3) -> bool {
    v.is_finite()
}
