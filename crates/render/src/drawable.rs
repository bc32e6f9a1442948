use glam::Vec3;
use lumen_common::MeshHandle;
use lumen_state::{RenderState, StateMap, StateType};
use serde::{Deserialize, Serialize};

use crate::{RenderError, Renderer};

/// Which queue bucket a drawable goes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketType {
    /// Not queued at all.
    Skip,
    /// Drawn first, in insertion order.
    Pre,
    #[default]
    Opaque,
    Transparent,
    /// Screen-space overlays, ordered by [`Drawable::ortho_order`].
    Ortho,
    /// Drawn last, in insertion order.
    Post,
}

impl BucketType {
    pub fn name(self) -> &'static str {
        match self {
            BucketType::Skip => "skip",
            BucketType::Pre => "pre",
            BucketType::Opaque => "opaque",
            BucketType::Transparent => "transparent",
            BucketType::Ortho => "ortho",
            BucketType::Post => "post",
        }
    }
}

impl std::fmt::Display for BucketType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// How the transparent bucket draws an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransparencyType {
    #[default]
    OnePass,
    /// Back faces first, then front faces.
    TwoPass,
}

/// Something the queue can sort and draw.
///
/// Owned by the scene graph; buckets keep a reference for one frame only.
pub trait Drawable {
    fn name(&self) -> &str;

    /// Center of the world bounding volume, if the object has one.
    fn world_bound_center(&self) -> Option<Vec3>;

    fn world_translation(&self) -> Vec3;

    /// Effective state of the given type, as resolved from the hierarchy.
    fn world_state(&self, ty: StateType) -> Option<&RenderState>;

    fn bucket(&self) -> BucketType {
        BucketType::Opaque
    }

    fn ortho_order(&self) -> i32 {
        0
    }

    fn transparency(&self) -> TransparencyType {
        TransparencyType::OnePass
    }

    fn draw(&self, renderer: &mut dyn Renderer) -> Result<(), RenderError>;
}

/// A mesh with resolved world states: applies its states and issues one draw.
#[derive(Debug, Clone)]
pub struct MeshDrawable {
    name: String,
    mesh: MeshHandle,
    bound_center: Option<Vec3>,
    translation: Vec3,
    states: StateMap<Option<RenderState>>,
    bucket: BucketType,
    ortho_order: i32,
    transparency: TransparencyType,
}

impl MeshDrawable {
    pub fn new(name: impl Into<String>, mesh: MeshHandle) -> Self {
        Self {
            name: name.into(),
            mesh,
            bound_center: None,
            translation: Vec3::ZERO,
            states: StateMap::empty(),
            bucket: BucketType::Opaque,
            ortho_order: 0,
            transparency: TransparencyType::OnePass,
        }
    }

    pub fn at(mut self, translation: Vec3) -> Self {
        self.translation = translation;
        self
    }

    pub fn with_bound_center(mut self, center: Option<Vec3>) -> Self {
        self.bound_center = center;
        self
    }

    pub fn in_bucket(mut self, bucket: BucketType) -> Self {
        self.bucket = bucket;
        self
    }

    pub fn with_ortho_order(mut self, order: i32) -> Self {
        self.ortho_order = order;
        self
    }

    pub fn with_transparency(mut self, transparency: TransparencyType) -> Self {
        self.transparency = transparency;
        self
    }

    pub fn with_state(mut self, state: RenderState) -> Self {
        let ty = state.state_type();
        self.states[ty] = Some(state);
        self
    }

    /// Replace all world states, e.g. with the output of a state stack.
    pub fn set_world_states(&mut self, states: StateMap<Option<RenderState>>) {
        self.states = states;
    }

    pub fn mesh(&self) -> MeshHandle {
        self.mesh
    }
}

impl Drawable for MeshDrawable {
    fn name(&self) -> &str {
        &self.name
    }

    fn world_bound_center(&self) -> Option<Vec3> {
        self.bound_center
    }

    fn world_translation(&self) -> Vec3 {
        self.translation
    }

    fn world_state(&self, ty: StateType) -> Option<&RenderState> {
        self.states[ty].as_ref()
    }

    fn bucket(&self) -> BucketType {
        self.bucket
    }

    fn ortho_order(&self) -> i32 {
        self.ortho_order
    }

    fn transparency(&self) -> TransparencyType {
        self.transparency
    }

    fn draw(&self, renderer: &mut dyn Renderer) -> Result<(), RenderError> {
        renderer.apply_states(self)?;
        renderer.draw_mesh(self.mesh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_state::params::CullState;

    #[test]
    fn builder_sets_fields() {
        let mesh = MeshDrawable::new("crate", MeshHandle(4))
            .at(Vec3::new(1.0, 2.0, 3.0))
            .in_bucket(BucketType::Transparent)
            .with_transparency(TransparencyType::TwoPass)
            .with_state(RenderState::new(CullState::default()));

        assert_eq!(mesh.name(), "crate");
        assert_eq!(mesh.world_translation(), Vec3::new(1.0, 2.0, 3.0));
        assert!(mesh.world_bound_center().is_none());
        assert_eq!(mesh.bucket(), BucketType::Transparent);
        assert_eq!(mesh.transparency(), TransparencyType::TwoPass);
        assert!(mesh.world_state(StateType::Cull).is_some());
        assert!(mesh.world_state(StateType::Fog).is_none());
    }

    #[test]
    fn bucket_names() {
        assert_eq!(BucketType::Opaque.to_string(), "opaque");
        assert_eq!(BucketType::default(), BucketType::Opaque);
    }
}
