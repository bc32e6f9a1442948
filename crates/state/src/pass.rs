use std::ops::{Deref, DerefMut};

use crate::{DepthBias, HasRenderContext, RenderContext, RenderState, StateMap, StateType};

/// A scoped enforcement transaction.
///
/// `apply` pushes the pass states onto a context as enforced overrides and
/// remembers what they replaced; `reset` puts the replaced overrides back.
/// A balanced bracket leaves the context's enforced map exactly as it found
/// it, also when other instances nest inside it.
///
/// # Invariants
/// - Idle → `apply` → Active → `reset` → Idle. Anything else panics.
/// - Instances touching the same state types must nest strictly.
#[derive(Debug, Default)]
pub struct PassNodeState {
    pass_states: StateMap<Option<RenderState>>,
    saved: Vec<(StateType, Option<RenderState>)>,
    depth_bias: DepthBias,
    saved_bias: Option<Option<DepthBias>>,
    active: bool,
}

impl PassNodeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_states(states: impl IntoIterator<Item = RenderState>) -> Self {
        let mut node = Self::new();
        for state in states {
            node.set_pass_state(state);
        }
        node
    }

    /// Set the override this pass installs for the state's type.
    pub fn set_pass_state(&mut self, state: RenderState) -> Option<RenderState> {
        self.assert_idle("set_pass_state");
        let ty = state.state_type();
        self.pass_states[ty].replace(state)
    }

    pub fn pass_state(&self, ty: StateType) -> Option<&RenderState> {
        self.pass_states[ty].as_ref()
    }

    pub fn clear_pass_state(&mut self, ty: StateType) -> Option<RenderState> {
        self.assert_idle("clear_pass_state");
        self.pass_states[ty].take()
    }

    pub fn clear_pass_states(&mut self) {
        self.assert_idle("clear_pass_states");
        self.pass_states.clear();
    }

    /// Polygon depth bias pushed while the pass is active. Zero disables it.
    pub fn set_z_offset(&mut self, z_factor: f32, z_offset: f32) {
        self.depth_bias = DepthBias::new(z_factor, z_offset);
    }

    pub fn z_offset(&self) -> DepthBias {
        self.depth_bias
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Enforce the pass states on `ctx`, saving what each one replaces.
    pub fn apply(&mut self, ctx: &mut RenderContext) {
        assert!(!self.active, "PassNodeState::apply on an active pass");
        debug_assert!(self.saved.is_empty());

        for (ty, state) in self.pass_states.entries() {
            let previous = ctx.enforce_state(state.clone());
            self.saved.push((ty, previous));
        }
        if !self.depth_bias.is_zero() {
            self.saved_bias = Some(ctx.set_depth_bias(Some(self.depth_bias)));
        }
        self.active = true;
        tracing::debug!(states = self.saved.len(), "pass states applied");
    }

    /// Restore the overrides saved by [`Self::apply`].
    pub fn reset(&mut self, ctx: &mut RenderContext) {
        assert!(self.active, "PassNodeState::reset without matching apply");

        for (ty, saved) in self.saved.drain(..) {
            match saved {
                Some(state) => {
                    ctx.enforce_state(state);
                }
                None => {
                    ctx.clear_enforced_state(ty);
                }
            }
        }
        if let Some(previous) = self.saved_bias.take() {
            ctx.set_depth_bias(previous);
        }
        self.active = false;
        tracing::debug!("pass states reset");
    }

    /// Apply on `holder`'s context and return a guard that resets on drop.
    pub fn enter<'a, H>(&'a mut self, holder: &'a mut H) -> PassScope<'a, H>
    where
        H: HasRenderContext + ?Sized,
    {
        self.apply(holder.render_context_mut());
        PassScope { node: self, holder }
    }

    /// Run `f` with the pass states enforced.
    pub fn with<H, T>(&mut self, holder: &mut H, f: impl FnOnce(&mut H) -> T) -> T
    where
        H: HasRenderContext + ?Sized,
    {
        let mut scope = self.enter(holder);
        f(&mut *scope)
    }

    fn assert_idle(&self, op: &str) {
        assert!(!self.active, "PassNodeState::{op} while the pass is active");
    }
}

/// Guard returned by [`PassNodeState::enter`]. Resets the pass when dropped,
/// whichever way the scope is left.
pub struct PassScope<'a, H: HasRenderContext + ?Sized> {
    node: &'a mut PassNodeState,
    holder: &'a mut H,
}

impl<H: HasRenderContext + ?Sized> Deref for PassScope<'_, H> {
    type Target = H;

    fn deref(&self) -> &H {
        self.holder
    }
}

impl<H: HasRenderContext + ?Sized> DerefMut for PassScope<'_, H> {
    fn deref_mut(&mut self) -> &mut H {
        self.holder
    }
}

impl<H: HasRenderContext + ?Sized> Drop for PassScope<'_, H> {
    fn drop(&mut self) {
        self.node.reset(self.holder.render_context_mut());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{CullFace, CullState, FogState, WireframeState, ZBufferState};
    use lumen_common::{Capabilities, ContextKey};

    fn ctx() -> RenderContext {
        RenderContext::new(ContextKey::new(), Capabilities::default())
    }

    fn cull(face: CullFace) -> RenderState {
        RenderState::new(CullState {
            face,
            ..CullState::default()
        })
    }

    #[test]
    fn apply_then_reset_restores_empty_slot() {
        let mut ctx = ctx();
        let mut pass = PassNodeState::with_states([cull(CullFace::Front)]);

        pass.apply(&mut ctx);
        assert!(pass.is_active());
        assert_eq!(ctx.enforced_state(StateType::Cull), Some(&cull(CullFace::Front)));

        pass.reset(&mut ctx);
        assert!(!pass.is_active());
        assert!(ctx.enforced_state(StateType::Cull).is_none());
    }

    #[test]
    fn reset_restores_prior_override() {
        let mut ctx = ctx();
        ctx.enforce_state(cull(CullFace::Back));
        let mut pass = PassNodeState::with_states([cull(CullFace::Front)]);

        pass.apply(&mut ctx);
        pass.reset(&mut ctx);
        assert_eq!(ctx.enforced_state(StateType::Cull), Some(&cull(CullFace::Back)));
    }

    #[test]
    fn nested_brackets_balance() {
        let mut ctx = ctx();
        ctx.enforce_state(RenderState::new(FogState::default()));
        let before = ctx.enforced_states().clone();

        let mut outer = PassNodeState::with_states([
            cull(CullFace::Front),
            RenderState::new(ZBufferState {
                writable: false,
                ..ZBufferState::default()
            }),
        ]);
        let mut inner = PassNodeState::with_states([
            cull(CullFace::FrontAndBack),
            RenderState::new(WireframeState::default()),
            RenderState::disabled(FogState::default()),
        ]);

        outer.apply(&mut ctx);
        let during_outer = ctx.enforced_states().clone();
        inner.apply(&mut ctx);
        assert_eq!(
            ctx.enforced_state(StateType::Cull),
            Some(&cull(CullFace::FrontAndBack))
        );
        inner.reset(&mut ctx);
        assert_eq!(ctx.enforced_states(), &during_outer);
        outer.reset(&mut ctx);

        assert_eq!(ctx.enforced_states(), &before);
    }

    #[test]
    fn scope_resets_on_early_return() {
        fn render(pass: &mut PassNodeState, ctx: &mut RenderContext) -> Result<(), String> {
            let scope = pass.enter(ctx);
            assert!(scope.enforced_state(StateType::Cull).is_some());
            Err("draw failed".into())
        }

        let mut ctx = ctx();
        let mut pass = PassNodeState::with_states([cull(CullFace::Front)]);
        assert!(render(&mut pass, &mut ctx).is_err());
        assert!(!pass.is_active());
        assert!(ctx.enforced_state(StateType::Cull).is_none());
    }

    #[test]
    fn with_runs_closure_inside_bracket() {
        let mut ctx = ctx();
        let mut pass = PassNodeState::with_states([cull(CullFace::Front)]);
        let seen = pass.with(&mut ctx, |c| c.enforced_state(StateType::Cull).cloned());
        assert_eq!(seen, Some(cull(CullFace::Front)));
        assert!(ctx.enforced_state(StateType::Cull).is_none());
    }

    #[test]
    fn depth_bias_pushed_and_restored() {
        let mut ctx = ctx();
        ctx.set_depth_bias(Some(DepthBias::new(0.5, 0.5)));
        let mut pass = PassNodeState::new();
        pass.set_z_offset(-1.0, -2.0);

        pass.apply(&mut ctx);
        assert_eq!(ctx.depth_bias(), Some(DepthBias::new(-1.0, -2.0)));
        pass.reset(&mut ctx);
        assert_eq!(ctx.depth_bias(), Some(DepthBias::new(0.5, 0.5)));
    }

    #[test]
    fn zero_bias_leaves_context_alone() {
        let mut ctx = ctx();
        let mut pass = PassNodeState::new();
        pass.apply(&mut ctx);
        assert_eq!(ctx.depth_bias(), None);
        pass.reset(&mut ctx);
        assert_eq!(ctx.depth_bias(), None);
    }

    #[test]
    #[should_panic(expected = "active pass")]
    fn double_apply_fails_fast() {
        let mut ctx = ctx();
        let mut pass = PassNodeState::with_states([cull(CullFace::Front)]);
        pass.apply(&mut ctx);
        pass.apply(&mut ctx);
    }

    #[test]
    #[should_panic(expected = "without matching apply")]
    fn reset_without_apply_fails_fast() {
        let mut pass = PassNodeState::new();
        pass.reset(&mut ctx());
    }
}
