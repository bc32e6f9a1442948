use std::collections::BTreeMap;
use std::path::Path;
use std::rc::Rc;

use anyhow::Context;
use glam::Vec3;
use lumen_common::{Camera, MeshHandle};
use lumen_render::{BucketType, Drawable, MeshDrawable, Pass, PassManager, TransparencyType};
use lumen_state::{CombinePolicy, NodeStates, RenderState, StateStack, StateType};
use serde::Deserialize;

const DEMO_SCENE: &str = include_str!("../scenes/demo.yaml");

/// A scene description: a node hierarchy plus optional extra passes.
#[derive(Debug, Deserialize)]
pub struct Scene {
    #[serde(default)]
    pub camera: SceneCamera,
    #[serde(default)]
    pub nodes: Vec<SceneNode>,
    #[serde(default)]
    pub passes: Vec<ScenePass>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct SceneCamera {
    pub location: Vec3,
    pub target: Vec3,
}

impl Default for SceneCamera {
    fn default() -> Self {
        Self {
            location: Vec3::new(0.0, 0.0, 10.0),
            target: Vec3::ZERO,
        }
    }
}

impl SceneCamera {
    pub fn camera(&self) -> Camera {
        Camera::look_at(self.location, self.target)
    }
}

/// One node. Nodes with a mesh become drawables; all nodes contribute states
/// to their descendants.
#[derive(Debug, Deserialize)]
pub struct SceneNode {
    pub name: String,
    #[serde(default)]
    pub mesh: Option<u64>,
    #[serde(default)]
    pub bucket: BucketType,
    #[serde(default)]
    pub transparency: TransparencyType,
    #[serde(default)]
    pub ortho_order: i32,
    #[serde(default)]
    pub translation: Vec3,
    #[serde(default)]
    pub bound_center: Option<Vec3>,
    #[serde(default)]
    pub states: Vec<RenderState>,
    #[serde(default)]
    pub policies: BTreeMap<StateType, CombinePolicy>,
    #[serde(default)]
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    fn node_states(&self) -> NodeStates {
        let mut node = NodeStates::new();
        for state in &self.states {
            node.set_state(state.clone());
        }
        for (&ty, &policy) in &self.policies {
            node.set_policy(ty, Some(policy));
        }
        node
    }
}

#[derive(Debug, Deserialize)]
pub struct ScenePass {
    pub name: String,
    #[serde(default)]
    pub states: Vec<RenderState>,
    #[serde(default)]
    pub z_offset: Option<[f32; 2]>,
    #[serde(default)]
    pub to_texture: bool,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// Names of the drawables this pass renders.
    #[serde(default)]
    pub draw: Vec<String>,
}

fn enabled_by_default() -> bool {
    true
}

impl Scene {
    pub fn from_yaml_str(text: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Load `path`, or the built-in demo scene when no path is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Self::from_yaml_str(DEMO_SCENE).context("parsing built-in demo scene");
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading scene {}", path.display()))?;
        Self::from_yaml_str(&text).with_context(|| format!("parsing scene {}", path.display()))
    }

    /// Walk the hierarchy and build a drawable, with resolved world states,
    /// for every node that has a mesh.
    pub fn drawables(&self) -> Vec<Rc<MeshDrawable>> {
        let mut stack = StateStack::new();
        let mut out = Vec::new();
        for node in &self.nodes {
            collect(node, &mut stack, &mut out);
        }
        out
    }

    pub fn pass_manager(&self, drawables: &[Rc<MeshDrawable>]) -> anyhow::Result<PassManager> {
        let mut manager = PassManager::new();
        for desc in &self.passes {
            let mut pass = Pass::new(desc.name.as_str());
            for state in &desc.states {
                pass.states_mut().set_pass_state(state.clone());
            }
            if let Some([factor, units]) = desc.z_offset {
                pass.states_mut().set_z_offset(factor, units);
            }
            if desc.to_texture {
                pass = pass.to_texture();
            }
            pass.set_enabled(desc.enabled);

            for name in &desc.draw {
                let drawable = drawables
                    .iter()
                    .find(|d| d.name() == name)
                    .with_context(|| format!("pass {} draws unknown node {name}", desc.name))?;
                pass.add_drawable(Rc::clone(drawable) as Rc<dyn Drawable>);
            }
            manager.add(pass);
        }
        Ok(manager)
    }
}

fn collect(node: &SceneNode, stack: &mut StateStack, out: &mut Vec<Rc<MeshDrawable>>) {
    stack.push(&node.node_states());
    if let Some(mesh) = node.mesh {
        let mut drawable = MeshDrawable::new(node.name.as_str(), MeshHandle(mesh))
            .at(node.translation)
            .with_bound_center(node.bound_center)
            .in_bucket(node.bucket)
            .with_ortho_order(node.ortho_order)
            .with_transparency(node.transparency);
        drawable.set_world_states(stack.resolve_all());
        tracing::debug!(node = %node.name, depth = stack.depth(), "drawable built");
        out.push(Rc::new(drawable));
    }
    for child in &node.children {
        collect(child, stack, out);
    }
    stack.pop();
}
