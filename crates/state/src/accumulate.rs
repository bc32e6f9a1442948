//! Effective-state resolution across a scene hierarchy.
//!
//! Each node may declare a state per type. Walking from the root down to a
//! node yields, per type, a stack of declarations; the node's combine
//! policy folds that stack into one freshly built state.

use serde::{Deserialize, Serialize};

use crate::{RenderState, StateMap, StateType};

/// How a state type merges across the ancestry of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombinePolicy {
    /// Only the node's own declaration counts.
    Off,
    /// The closest declaration wins outright.
    Replace,
    /// Root to leaf; root-ward entries fill slots first.
    CombineFirst,
    /// Leaf to root; leaf-ward entries fill slots first.
    CombineClosest,
    /// Leaf to root, stopping at the first disabled entry.
    CombineClosestEnabled,
}

impl CombinePolicy {
    /// Policy used where neither a node nor any ancestor chose one.
    pub fn default_for(ty: StateType) -> Self {
        match ty {
            StateType::Texture => CombinePolicy::CombineClosest,
            StateType::Light => CombinePolicy::CombineFirst,
            _ => CombinePolicy::Replace,
        }
    }
}

/// Resolve one state type.
///
/// `stack` is ordered root to node, one entry per node on the path, `None`
/// where a node declares nothing. The result never aliases an entry.
pub fn resolve(stack: &[Option<RenderState>], policy: CombinePolicy) -> Option<RenderState> {
    match policy {
        CombinePolicy::Off => stack.last()?.as_ref().map(RenderState::synthesize),
        CombinePolicy::Replace => stack.iter().rev().flatten().next().map(RenderState::synthesize),
        CombinePolicy::CombineFirst => combine(stack.iter().flatten(), false),
        CombinePolicy::CombineClosest => combine(stack.iter().rev().flatten(), false),
        CombinePolicy::CombineClosestEnabled => combine(stack.iter().rev().flatten(), true),
    }
}

fn combine<'a>(
    entries: impl Iterator<Item = &'a RenderState>,
    halt_on_disabled: bool,
) -> Option<RenderState> {
    let mut merged: Option<RenderState> = None;
    let mut first_disabled: Option<&RenderState> = None;

    for entry in entries {
        if !entry.is_enabled() {
            first_disabled.get_or_insert(entry);
            if halt_on_disabled {
                break;
            }
            continue;
        }
        match merged.as_mut() {
            None => merged = Some(entry.synthesize()),
            Some(acc) => acc.fill_from(entry),
        }
    }

    merged.or_else(|| first_disabled.map(RenderState::synthesize))
}

/// States and policies a single node declares.
#[derive(Debug, Clone, Default)]
pub struct NodeStates {
    states: StateMap<Option<RenderState>>,
    /// `None` inherits the ancestor's policy.
    policies: StateMap<Option<CombinePolicy>>,
}

impl NodeStates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(mut self, state: RenderState) -> Self {
        self.set_state(state);
        self
    }

    pub fn with_policy(mut self, ty: StateType, policy: CombinePolicy) -> Self {
        self.policies[ty] = Some(policy);
        self
    }

    pub fn set_state(&mut self, state: RenderState) -> Option<RenderState> {
        let ty = state.state_type();
        self.states[ty].replace(state)
    }

    pub fn clear_state(&mut self, ty: StateType) -> Option<RenderState> {
        self.states[ty].take()
    }

    pub fn state(&self, ty: StateType) -> Option<&RenderState> {
        self.states[ty].as_ref()
    }

    pub fn set_policy(&mut self, ty: StateType, policy: Option<CombinePolicy>) {
        self.policies[ty] = policy;
    }

    pub fn policy(&self, ty: StateType) -> Option<CombinePolicy> {
        self.policies[ty]
    }
}

/// Per-type declaration stacks maintained while walking a scene graph.
///
/// Push a node when descending into it and pop it when leaving; in between,
/// [`StateStack::resolve_all`] gives the node's effective states.
#[derive(Debug, Clone)]
pub struct StateStack {
    stacks: StateMap<Vec<Option<RenderState>>>,
    policies: StateMap<Vec<CombinePolicy>>,
}

impl Default for StateStack {
    fn default() -> Self {
        Self {
            stacks: StateMap::from_fn(|_| Vec::new()),
            policies: StateMap::from_fn(|_| Vec::new()),
        }
    }
}

impl StateStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.stacks[StateType::Blend].len()
    }

    pub fn push(&mut self, node: &NodeStates) {
        for ty in StateType::ALL {
            self.stacks[ty].push(node.states[ty].clone());
            let inherited = self.policies[ty]
                .last()
                .copied()
                .unwrap_or_else(|| CombinePolicy::default_for(ty));
            self.policies[ty].push(node.policies[ty].unwrap_or(inherited));
        }
    }

    pub fn pop(&mut self) {
        assert!(self.depth() > 0, "StateStack::pop on an empty stack");
        for ty in StateType::ALL {
            self.stacks[ty].pop();
            self.policies[ty].pop();
        }
    }

    /// Policy in effect for `ty` at the top node.
    pub fn policy(&self, ty: StateType) -> CombinePolicy {
        self.policies[ty]
            .last()
            .copied()
            .unwrap_or_else(|| CombinePolicy::default_for(ty))
    }

    pub fn resolve(&self, ty: StateType) -> Option<RenderState> {
        resolve(&self.stacks[ty], self.policy(ty))
    }

    /// Effective states of the top node, one slot per type.
    pub fn resolve_all(&self) -> StateMap<Option<RenderState>> {
        StateMap::from_fn(|ty| self.resolve(ty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{CullFace, CullState, Light, LightKind, LightState, TextureState, TextureUnit};
    use glam::{Vec3, Vec4};

    fn textures(units: &[(usize, u64)]) -> TextureState {
        let mut ts = TextureState::default();
        for &(unit, key) in units {
            ts.set_texture(unit, Some(TextureUnit::new(key))).unwrap();
        }
        ts
    }

    fn tex(units: &[(usize, u64)]) -> Option<RenderState> {
        Some(RenderState::new(textures(units)))
    }

    fn tex_disabled(units: &[(usize, u64)]) -> Option<RenderState> {
        Some(RenderState::disabled(textures(units)))
    }

    fn keys(state: &RenderState) -> Vec<Option<u64>> {
        state
            .get::<TextureState>()
            .unwrap()
            .units()
            .iter()
            .map(|u| u.map(|u| u.key.0))
            .collect()
    }

    #[test]
    fn combine_first_fills_from_root() {
        // A(tex0=T1) at the root, B(tex0=null, tex1=T2) below it.
        let stack = vec![tex(&[(0, 1)]), tex(&[(1, 2)])];
        let out = resolve(&stack, CombinePolicy::CombineFirst).unwrap();
        assert!(out.is_enabled());
        assert_eq!(keys(&out), vec![Some(1), Some(2)]);
    }

    #[test]
    fn combine_first_root_wins_shared_slot() {
        let stack = vec![tex(&[(0, 1)]), tex(&[(0, 5), (1, 2)])];
        let out = resolve(&stack, CombinePolicy::CombineFirst).unwrap();
        assert_eq!(keys(&out), vec![Some(1), Some(2)]);
    }

    #[test]
    fn combine_closest_leaf_wins_shared_slot() {
        let stack = vec![tex(&[(0, 1), (2, 3)]), tex_disabled(&[(1, 9)]), tex(&[(0, 5)])];
        let out = resolve(&stack, CombinePolicy::CombineClosest).unwrap();
        // The disabled middle entry is skipped, the scan continues to the root.
        assert_eq!(keys(&out), vec![Some(5), None, Some(3)]);
    }

    #[test]
    fn combine_closest_enabled_halts_at_disabled() {
        // Root to leaf: A(enabled, tex0=T1), B(disabled), C(enabled, tex0=T3).
        let stack = vec![tex(&[(0, 1), (1, 4)]), tex_disabled(&[]), tex(&[(0, 3)])];
        let out = resolve(&stack, CombinePolicy::CombineClosestEnabled).unwrap();
        assert!(out.is_enabled());
        assert_eq!(keys(&out), vec![Some(3)]);
    }

    #[test]
    fn all_disabled_yields_disabled_state() {
        let stack = vec![tex_disabled(&[(0, 1)]), tex_disabled(&[(0, 2)])];
        let first = resolve(&stack, CombinePolicy::CombineFirst).unwrap();
        assert!(!first.is_enabled());
        assert_eq!(keys(&first), vec![Some(1)]);

        let closest = resolve(&stack, CombinePolicy::CombineClosestEnabled).unwrap();
        assert!(!closest.is_enabled());
        assert_eq!(keys(&closest), vec![Some(2)]);
    }

    #[test]
    fn off_uses_only_own_declaration() {
        let stack = vec![tex(&[(0, 1)]), None];
        assert!(resolve(&stack, CombinePolicy::Off).is_none());

        let stack = vec![tex(&[(0, 1)]), tex(&[(1, 2)])];
        let out = resolve(&stack, CombinePolicy::Off).unwrap();
        assert_eq!(keys(&out), vec![None, Some(2)]);
    }

    #[test]
    fn replace_takes_nearest_declaration() {
        let stack = vec![tex(&[(0, 1)]), tex(&[(1, 2)]), None];
        let out = resolve(&stack, CombinePolicy::Replace).unwrap();
        assert_eq!(keys(&out), vec![None, Some(2)]);
    }

    #[test]
    fn empty_ancestry_resolves_to_none() {
        for policy in [
            CombinePolicy::Off,
            CombinePolicy::Replace,
            CombinePolicy::CombineFirst,
            CombinePolicy::CombineClosest,
            CombinePolicy::CombineClosestEnabled,
        ] {
            assert!(resolve(&[], policy).is_none());
            assert!(resolve(&[None, None], policy).is_none());
        }
    }

    #[test]
    fn scalar_types_do_not_merge() {
        let front = RenderState::new(CullState {
            face: CullFace::Front,
            ..CullState::default()
        });
        let back = RenderState::new(CullState::default());
        let stack = vec![Some(front.clone()), Some(back.clone())];
        assert_eq!(resolve(&stack, CombinePolicy::CombineFirst), Some(front));
        assert_eq!(resolve(&stack, CombinePolicy::CombineClosest), Some(back));
    }

    #[test]
    fn result_is_a_fresh_copy() {
        let stack = vec![tex(&[(0, 1)])];
        let mut out = resolve(&stack, CombinePolicy::Replace).unwrap();
        out.edit::<TextureState>().unwrap().clear();
        assert_eq!(keys(stack[0].as_ref().unwrap()), vec![Some(1)]);
    }

    #[test]
    fn lights_merge_per_slot() {
        let light = |x: f32| Light {
            kind: LightKind::Point,
            color: Vec4::ONE,
            vector: Vec3::new(x, 0.0, 0.0),
        };
        let mut root = LightState::default();
        root.set_light(0, Some(light(1.0))).unwrap();
        let mut leaf = LightState::default();
        leaf.set_light(0, Some(light(2.0))).unwrap();
        leaf.set_light(1, Some(light(3.0))).unwrap();

        let stack = vec![Some(RenderState::new(root)), Some(RenderState::new(leaf))];
        let out = resolve(&stack, CombinePolicy::CombineFirst).unwrap();
        let lights = out.get::<LightState>().unwrap();
        assert_eq!(lights.count(), 2);
        assert_eq!(lights.light(0).unwrap().vector.x, 1.0);
        assert_eq!(lights.light(1).unwrap().vector.x, 3.0);
    }

    #[test]
    fn stack_inherits_policies() {
        let mut stack = StateStack::new();
        let root = NodeStates::new()
            .with_state(RenderState::new(textures(&[(0, 1)])))
            .with_policy(StateType::Texture, CombinePolicy::CombineFirst);
        let child = NodeStates::new().with_state(RenderState::new(textures(&[(0, 2), (1, 3)])));

        stack.push(&root);
        stack.push(&child);
        assert_eq!(stack.depth(), 2);
        assert_eq!(stack.policy(StateType::Texture), CombinePolicy::CombineFirst);
        assert_eq!(stack.policy(StateType::Cull), CombinePolicy::Replace);

        let effective = stack.resolve_all();
        let ts = effective[StateType::Texture].as_ref().unwrap();
        assert_eq!(keys(ts), vec![Some(1), Some(3)]);
        assert!(effective[StateType::Cull].is_none());

        stack.pop();
        let ts = stack.resolve(StateType::Texture).unwrap();
        assert_eq!(keys(&ts), vec![Some(1)]);
    }

    #[test]
    fn default_policies() {
        let stack = StateStack::new();
        assert_eq!(stack.policy(StateType::Texture), CombinePolicy::CombineClosest);
        assert_eq!(stack.policy(StateType::Light), CombinePolicy::CombineFirst);
    }

    #[test]
    #[should_panic(expected = "empty stack")]
    fn pop_on_empty_stack_fails_fast() {
        StateStack::new().pop();
    }
}
