use std::rc::Rc;

use lumen_state::{PassNodeState, RenderState};

use crate::drawable::Drawable;
use crate::queue::Queue;
use crate::{RenderError, Renderer};

/// A set of drawables rendered with pass-wide state overrides.
///
/// Rendering enforces the pass states, queues the drawables, renders the
/// queue and restores the previous overrides. A render-to-texture pass also
/// stashes whatever the queue held when it started.
pub struct Pass {
    name: String,
    states: PassNodeState,
    drawables: Vec<Rc<dyn Drawable>>,
    enabled: bool,
    render_to_texture: bool,
}

impl Pass {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            states: PassNodeState::new(),
            drawables: Vec::new(),
            enabled: true,
            render_to_texture: false,
        }
    }

    pub fn with_state(mut self, state: RenderState) -> Self {
        self.states.set_pass_state(state);
        self
    }

    pub fn with_z_offset(mut self, z_factor: f32, z_offset: f32) -> Self {
        self.states.set_z_offset(z_factor, z_offset);
        self
    }

    pub fn to_texture(mut self) -> Self {
        self.render_to_texture = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn states(&self) -> &PassNodeState {
        &self.states
    }

    pub fn states_mut(&mut self) -> &mut PassNodeState {
        &mut self.states
    }

    pub fn add_drawable(&mut self, drawable: Rc<dyn Drawable>) {
        self.drawables.push(drawable);
    }

    pub fn drawables(&self) -> &[Rc<dyn Drawable>] {
        &self.drawables
    }

    pub fn clear_drawables(&mut self) {
        self.drawables.clear();
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn renders_to_texture(&self) -> bool {
        self.render_to_texture
    }

    pub fn render(
        &mut self,
        renderer: &mut dyn Renderer,
        queue: &mut Queue,
    ) -> Result<(), RenderError> {
        if !self.enabled {
            return Ok(());
        }
        let _span = tracing::debug_span!("pass", name = %self.name).entered();

        let Self {
            states,
            drawables,
            render_to_texture,
            ..
        } = self;
        states.with(renderer, |r| {
            if *render_to_texture {
                queue_and_render(&mut queue.nested(), drawables, r)
            } else {
                queue_and_render(queue, drawables, r)
            }
        })
    }
}

fn queue_and_render(
    queue: &mut Queue,
    drawables: &[Rc<dyn Drawable>],
    renderer: &mut dyn Renderer,
) -> Result<(), RenderError> {
    for drawable in drawables {
        queue.add(Rc::clone(drawable));
    }
    queue.render_buckets(renderer)
}

/// Ordered list of passes, rendered front to back.
#[derive(Default)]
pub struct PassManager {
    passes: Vec<Pass>,
}

impl PassManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, pass: Pass) {
        self.passes.push(pass);
    }

    /// Insert at `index`. Panics if `index > len`.
    pub fn insert(&mut self, index: usize, pass: Pass) {
        self.passes.insert(index, pass);
    }

    /// Remove the first pass called `name`.
    pub fn remove(&mut self, name: &str) -> Option<Pass> {
        let index = self.passes.iter().position(|p| p.name == name)?;
        Some(self.passes.remove(index))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&Pass> {
        self.passes.iter().find(|p| p.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Pass> {
        self.passes.iter_mut().find(|p| p.name == name)
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    pub fn clear(&mut self) {
        self.passes.clear();
    }

    pub fn passes(&self) -> &[Pass] {
        &self.passes
    }

    /// Render every enabled pass in order. Stops at the first failure.
    pub fn render_passes(
        &mut self,
        renderer: &mut dyn Renderer,
        queue: &mut Queue,
    ) -> Result<(), RenderError> {
        for pass in &mut self.passes {
            pass.render(renderer, queue)?;
        }
        Ok(())
    }
}
