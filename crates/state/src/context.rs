use lumen_common::{Camera, Capabilities, ContextKey};
use serde::{Deserialize, Serialize};

use crate::{RenderState, StateMap, StateRecord, StateType};

/// Polygon depth bias pushed by multi-pass techniques.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DepthBias {
    pub factor: f32,
    pub units: f32,
}

impl DepthBias {
    pub fn new(factor: f32, units: f32) -> Self {
        Self { factor, units }
    }

    pub fn is_zero(&self) -> bool {
        self.factor == 0.0 && self.units == 0.0
    }
}

/// Render-state bookkeeping for one GPU context.
///
/// # Invariants
/// - `records` holds one entry per state type from construction on.
/// - `enforced` and `current` are sparse; an empty slot means no entry.
/// - Invalidation touches records and current states, never enforcement.
#[derive(Debug)]
pub struct RenderContext {
    key: ContextKey,
    capabilities: Capabilities,
    enforced: StateMap<Option<RenderState>>,
    current: StateMap<Option<RenderState>>,
    records: StateMap<StateRecord>,
    camera: Option<Camera>,
    depth_bias: Option<DepthBias>,
    enforced_stack: Vec<StateMap<Option<RenderState>>>,
}

impl RenderContext {
    pub fn new(key: ContextKey, capabilities: Capabilities) -> Self {
        Self {
            key,
            capabilities,
            enforced: StateMap::empty(),
            current: StateMap::empty(),
            records: StateMap::from_fn(StateRecord::new),
            camera: None,
            depth_bias: None,
            enforced_stack: Vec::new(),
        }
    }

    pub fn key(&self) -> ContextKey {
        self.key
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    // --- Enforcement ---

    /// Install `state` as the override for its type. Returns the override it replaced.
    pub fn enforce_state(&mut self, state: RenderState) -> Option<RenderState> {
        let ty = state.state_type();
        tracing::trace!(%ty, ctx = %self.key, "enforce state");
        self.enforced[ty].replace(state)
    }

    pub fn enforced_state(&self, ty: StateType) -> Option<&RenderState> {
        self.enforced[ty].as_ref()
    }

    pub fn enforced_states(&self) -> &StateMap<Option<RenderState>> {
        &self.enforced
    }

    pub fn clear_enforced_state(&mut self, ty: StateType) -> Option<RenderState> {
        self.enforced[ty].take()
    }

    pub fn clear_enforced_states(&mut self) {
        self.enforced.clear();
    }

    /// Save the whole enforced map; restore it with [`Self::pop_enforced_states`].
    pub fn push_enforced_states(&mut self) {
        self.enforced_stack.push(self.enforced.clone());
        tracing::debug!(depth = self.enforced_stack.len(), "pushed enforced states");
    }

    pub fn pop_enforced_states(&mut self) {
        let Some(saved) = self.enforced_stack.pop() else {
            panic!("pop_enforced_states without matching push");
        };
        self.enforced = saved;
        tracing::debug!(depth = self.enforced_stack.len(), "popped enforced states");
    }

    // --- Current states ---

    /// Record what per-object resolution contributed for `ty` (or that it contributed nothing).
    pub fn set_current_state(&mut self, ty: StateType, state: Option<RenderState>) {
        if let Some(s) = &state {
            assert_eq!(s.state_type(), ty, "current state stored under another type");
        }
        self.current[ty] = state;
    }

    pub fn current_state(&self, ty: StateType) -> Option<&RenderState> {
        self.current[ty].as_ref()
    }

    // --- Records ---

    pub fn state_record(&self, ty: StateType) -> &StateRecord {
        &self.records[ty]
    }

    pub fn state_record_mut(&mut self, ty: StateType) -> &mut StateRecord {
        &mut self.records[ty]
    }

    /// The enforced override and the record for `ty`, borrowed together.
    pub fn enforced_and_record(
        &mut self,
        ty: StateType,
    ) -> (Option<&RenderState>, &mut StateRecord) {
        (self.enforced[ty].as_ref(), &mut self.records[ty])
    }

    /// Mark every record invalid and drop current states. Enforcement is kept.
    ///
    /// Called after the context was lost or reacquired.
    pub fn invalidate_states(&mut self) {
        for (_, record) in self.records.iter_mut() {
            record.invalidate();
        }
        self.current.clear();
        tracing::debug!(ctx = %self.key, "render states invalidated");
    }

    // --- Camera and depth bias ---

    pub fn set_current_camera(&mut self, camera: Option<Camera>) {
        self.camera = camera;
    }

    pub fn current_camera(&self) -> Option<&Camera> {
        self.camera.as_ref()
    }

    pub fn depth_bias(&self) -> Option<DepthBias> {
        self.depth_bias
    }

    /// Set the active depth bias, returning the previous one.
    pub fn set_depth_bias(&mut self, bias: Option<DepthBias>) -> Option<DepthBias> {
        std::mem::replace(&mut self.depth_bias, bias)
    }
}

/// Anything that owns a [`RenderContext`] and lends it out.
pub trait HasRenderContext {
    fn render_context(&self) -> &RenderContext;
    fn render_context_mut(&mut self) -> &mut RenderContext;
}

impl HasRenderContext for RenderContext {
    fn render_context(&self) -> &RenderContext {
        self
    }

    fn render_context_mut(&mut self) -> &mut RenderContext {
        self
    }
}
