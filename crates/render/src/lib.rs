//! Draw ordering on top of `lumen-state`.
//!
//! Drawables are routed into per-category [`RenderBucket`]s, sorted, and
//! drawn through a [`Renderer`]. [`StateRenderer`] resolves each drawable's
//! effective states against the context's enforced overrides and only hands
//! the backend what actually changed.
//!
//! # Invariants
//! - Sorting is stable: equal keys keep insertion order.
//! - Bucket slot capacity never shrinks; cleared slots hold no references.
//! - Nested queue pushes and pass brackets are undone on every exit path.
//! - The core issues no GPU calls itself; a [`StateBackend`] does.

mod backend;
mod bucket;
mod compare;
mod config;
mod drawable;
mod pass;
mod queue;
mod renderer;

pub use backend::{BackendCall, BackendError, RecordingBackend, StateBackend};
pub use bucket::{RenderBucket, SortOrder, distance_to_cam};
pub use compare::{by_textures, farthest_first, nearest_first};
pub use config::{ConfigError, QueueConfig, RenderConfig};
pub use drawable::{BucketType, Drawable, MeshDrawable, TransparencyType};
pub use pass::{Pass, PassManager};
pub use queue::{NestedQueue, Queue};
pub use renderer::{FrameStats, RenderError, Renderer, StateRenderer};

pub fn crate_info() -> &'static str {
    "lumen-render v0.1.0"
}
