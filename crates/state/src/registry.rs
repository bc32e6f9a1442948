use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use lumen_common::{Capabilities, ContextKey};

use crate::{RenderContext, StateError};

/// Owns the render contexts, one per underlying GPU context.
///
/// Removing a key drops its context, so a context never outlives the GPU
/// context it mirrors.
#[derive(Debug, Default)]
pub struct ContextRegistry {
    contexts: BTreeMap<ContextKey, RenderContext>,
    current: Option<ContextKey>,
}

impl ContextRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new GPU context. Fails if the key is already known.
    pub fn add_context(
        &mut self,
        key: ContextKey,
        capabilities: Capabilities,
    ) -> Result<&mut RenderContext, StateError> {
        match self.contexts.entry(key) {
            Entry::Occupied(_) => Err(StateError::DuplicateContext(key)),
            Entry::Vacant(slot) => {
                tracing::debug!(ctx = %key, "render context added");
                Ok(slot.insert(RenderContext::new(key, capabilities)))
            }
        }
    }

    /// Drop the context for a destroyed GPU context.
    pub fn remove_context(&mut self, key: ContextKey) -> Option<RenderContext> {
        if self.current == Some(key) {
            self.current = None;
        }
        let removed = self.contexts.remove(&key);
        if removed.is_some() {
            tracing::debug!(ctx = %key, "render context removed");
        }
        removed
    }

    pub fn get(&self, key: ContextKey) -> Option<&RenderContext> {
        self.contexts.get(&key)
    }

    pub fn get_mut(&mut self, key: ContextKey) -> Option<&mut RenderContext> {
        self.contexts.get_mut(&key)
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// Make `key` the current context.
    pub fn make_current(&mut self, key: ContextKey) -> Result<&mut RenderContext, StateError> {
        let ctx = self
            .contexts
            .get_mut(&key)
            .ok_or(StateError::UnknownContext(key))?;
        self.current = Some(key);
        Ok(ctx)
    }

    /// Make `key` current after the GPU context was reacquired; its records
    /// no longer describe what the driver holds.
    pub fn reacquire(&mut self, key: ContextKey) -> Result<&mut RenderContext, StateError> {
        let ctx = self.make_current(key)?;
        ctx.invalidate_states();
        Ok(ctx)
    }

    pub fn current(&self) -> Option<&RenderContext> {
        self.current.and_then(|key| self.contexts.get(&key))
    }

    pub fn current_mut(&mut self) -> Option<&mut RenderContext> {
        let key = self.current?;
        self.contexts.get_mut(&key)
    }
}
