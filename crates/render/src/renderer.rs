use lumen_common::MeshHandle;
use lumen_state::{
    DepthBias, HasRenderContext, RenderContext, RenderState, StateError, StateMap, StateType,
};

use crate::backend::{BackendError, StateBackend};
use crate::drawable::Drawable;
use crate::queue::Queue;

/// Errors from rendering a frame.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
    #[error("no current camera set on render context")]
    NoCamera,
    #[error(transparent)]
    State(#[from] StateError),
}

/// What drawables talk to while drawing.
pub trait Renderer: HasRenderContext {
    /// Bring the GPU in line with the drawable's effective states.
    fn apply_states(&mut self, drawable: &dyn Drawable) -> Result<(), RenderError>;

    fn draw_mesh(&mut self, mesh: MeshHandle) -> Result<(), RenderError>;

    fn set_ortho(&mut self, enabled: bool) -> Result<(), RenderError>;
}

/// Per-frame counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub draws: usize,
    pub states_applied: usize,
    pub states_skipped: usize,
}

impl std::fmt::Display for FrameStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "draws={} states_applied={} states_skipped={}",
            self.draws, self.states_applied, self.states_skipped
        )
    }
}

/// Renderer that owns one context's bookkeeping and drives a backend.
///
/// For each state type the active state is the enforced override, else the
/// drawable's own state, else the type's default. The context's record
/// decides whether the backend sees it.
pub struct StateRenderer<B: StateBackend> {
    context: RenderContext,
    backend: B,
    defaults: StateMap<RenderState>,
    /// Depth bias last sent to the backend; `None` until the first send.
    sent_bias: Option<Option<DepthBias>>,
    ortho: bool,
    stats: FrameStats,
}

impl<B: StateBackend> StateRenderer<B> {
    pub fn new(context: RenderContext, backend: B) -> Self {
        Self {
            context,
            backend,
            defaults: StateMap::from_fn(RenderState::default_for),
            sent_bias: None,
            ortho: false,
            stats: FrameStats::default(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    pub fn begin_frame(&mut self) {
        self.stats = FrameStats::default();
    }

    /// React to a lost or reacquired context: everything is reapplied next time.
    pub fn invalidate(&mut self) {
        self.context.invalidate_states();
        self.sent_bias = None;
    }

    /// Sort, draw and clear every bucket of `queue`.
    pub fn render_queue(&mut self, queue: &mut Queue) -> Result<(), RenderError> {
        let _span = tracing::info_span!("render_queue", ctx = %self.context.key()).entered();
        queue.render_buckets(self)
    }

    pub fn into_parts(self) -> (RenderContext, B) {
        (self.context, self.backend)
    }

    fn backend_failed(&mut self, err: BackendError) -> RenderError {
        if err == BackendError::ContextLost {
            tracing::warn!(ctx = %self.context.key(), "context lost, invalidating states");
            self.invalidate();
        }
        RenderError::Backend(err)
    }

    fn sync_depth_bias(&mut self) -> Result<(), RenderError> {
        let bias = self.context.depth_bias();
        if self.sent_bias == Some(bias) {
            return Ok(());
        }
        if let Err(err) = self.backend.set_depth_bias(bias) {
            return Err(self.backend_failed(err));
        }
        self.sent_bias = Some(bias);
        Ok(())
    }
}

impl<B: StateBackend> HasRenderContext for StateRenderer<B> {
    fn render_context(&self) -> &RenderContext {
        &self.context
    }

    fn render_context_mut(&mut self) -> &mut RenderContext {
        &mut self.context
    }
}

impl<B: StateBackend> Renderer for StateRenderer<B> {
    fn apply_states(&mut self, drawable: &dyn Drawable) -> Result<(), RenderError> {
        self.sync_depth_bias()?;
        let caps = *self.context.capabilities();

        for ty in StateType::ALL {
            let own = drawable.world_state(ty);
            if self.context.current_state(ty) != own {
                self.context.set_current_state(ty, own.cloned());
            }

            let (enforced, record) = self.context.enforced_and_record(ty);
            let state = enforced.or(own).unwrap_or(&self.defaults[ty]);
            if !record.needs_apply(state) {
                self.stats.states_skipped += 1;
                continue;
            }
            match self.backend.apply_state(state, record, &caps) {
                Ok(()) => {
                    record.commit(state);
                    self.stats.states_applied += 1;
                    tracing::trace!(%ty, drawable = drawable.name(), "state applied");
                }
                Err(err) => return Err(self.backend_failed(err)),
            }
        }
        Ok(())
    }

    fn draw_mesh(&mut self, mesh: MeshHandle) -> Result<(), RenderError> {
        if let Err(err) = self.backend.draw_mesh(mesh) {
            return Err(self.backend_failed(err));
        }
        self.stats.draws += 1;
        Ok(())
    }

    fn set_ortho(&mut self, enabled: bool) -> Result<(), RenderError> {
        if self.ortho == enabled {
            return Ok(());
        }
        if let Err(err) = self.backend.set_ortho(enabled) {
            return Err(self.backend_failed(err));
        }
        self.ortho = enabled;
        Ok(())
    }
}
