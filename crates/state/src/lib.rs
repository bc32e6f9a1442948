//! Render-state management: which pipeline configuration is active per GPU
//! context, and when it has to be reapplied.
//!
//! # Invariants
//! - At most one state per [`StateType`] is enforced or current per context.
//! - Every context carries one [`StateRecord`] per state type.
//! - A balanced [`PassNodeState`] bracket leaves the enforced map unchanged.
//! - Effective states are freshly built, never shared with ancestors.

mod accumulate;
mod context;
mod error;
pub mod params;
mod pass;
mod record;
mod registry;
mod state;
mod types;

pub use accumulate::{CombinePolicy, NodeStates, StateStack, resolve};
pub use context::{DepthBias, HasRenderContext, RenderContext};
pub use error::StateError;
pub use pass::{PassNodeState, PassScope};
pub use record::StateRecord;
pub use registry::ContextRegistry;
pub use state::{RenderState, StateKind, StateParams};
pub use types::{StateMap, StateType};

pub fn crate_info() -> &'static str {
    "lumen-state v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("state"));
    }
}
