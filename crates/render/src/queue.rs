use std::ops::{Deref, DerefMut};
use std::rc::Rc;

use lumen_common::Camera;

use crate::bucket::{RenderBucket, SortOrder};
use crate::config::QueueConfig;
use crate::drawable::{BucketType, Drawable};
use crate::{RenderError, Renderer};

const LAYOUT: [(BucketType, SortOrder); 5] = [
    (BucketType::Pre, SortOrder::Unsorted),
    (BucketType::Opaque, SortOrder::Opaque),
    (BucketType::Transparent, SortOrder::Transparent),
    (BucketType::Ortho, SortOrder::Ortho),
    (BucketType::Post, SortOrder::Unsorted),
];

/// The per-frame render queue: one bucket per [`BucketType`], drawn in
/// declaration order.
///
/// A nested render-to-texture pass stashes the in-progress frame with
/// [`Queue::push_buckets`] (or [`Queue::nested`]) and gets it back with
/// [`Queue::pop_buckets`]. Only one level of nesting is supported.
#[derive(Debug)]
pub struct Queue {
    buckets: Vec<RenderBucket>,
    pushed: bool,
}

impl Default for Queue {
    fn default() -> Self {
        Self::new(&QueueConfig::default())
    }
}

impl Queue {
    pub fn new(config: &QueueConfig) -> Self {
        let buckets = LAYOUT
            .iter()
            .map(|&(ty, order)| {
                let bucket = RenderBucket::new(ty, order, config.initial_capacity);
                if ty == BucketType::Transparent && config.two_pass_transparency {
                    bucket.with_two_pass_transparency()
                } else {
                    bucket
                }
            })
            .collect();
        Self {
            buckets,
            pushed: false,
        }
    }

    /// Queue `drawable` in the bucket it asks for. Returns false for
    /// [`BucketType::Skip`].
    pub fn add(&mut self, drawable: Rc<dyn Drawable>) -> bool {
        let ty = drawable.bucket();
        match self.bucket_mut(ty) {
            Some(bucket) => {
                bucket.add(drawable);
                true
            }
            None => false,
        }
    }

    pub fn bucket(&self, ty: BucketType) -> Option<&RenderBucket> {
        self.buckets.iter().find(|b| b.bucket_type() == ty)
    }

    pub fn bucket_mut(&mut self, ty: BucketType) -> Option<&mut RenderBucket> {
        self.buckets.iter_mut().find(|b| b.bucket_type() == ty)
    }

    /// Buckets in drawing order.
    pub fn buckets(&self) -> &[RenderBucket] {
        &self.buckets
    }

    /// Drawables queued across all buckets.
    pub fn len(&self) -> usize {
        self.buckets.iter().map(RenderBucket::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(RenderBucket::is_empty)
    }

    pub fn sort(&mut self, camera: &Camera) {
        let _span = tracing::info_span!("queue_sort", queued = self.len()).entered();
        for bucket in &mut self.buckets {
            bucket.sort(camera);
        }
    }

    pub fn render(&mut self, renderer: &mut dyn Renderer) -> Result<(), RenderError> {
        for bucket in &mut self.buckets {
            bucket.render(renderer)?;
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
    }

    /// Sort with the context's camera, draw, then clear. The buckets are
    /// cleared on failure too.
    pub fn render_buckets(&mut self, renderer: &mut dyn Renderer) -> Result<(), RenderError> {
        let result = match renderer.render_context().current_camera().copied() {
            Some(camera) => {
                self.sort(&camera);
                self.render(renderer)
            }
            None => Err(RenderError::NoCamera),
        };
        self.clear();
        result
    }

    /// Stash the current contents of every bucket.
    pub fn push_buckets(&mut self) {
        assert!(!self.pushed, "Queue::push_buckets while already pushed");
        for bucket in &mut self.buckets {
            bucket.swap();
        }
        self.pushed = true;
        tracing::debug!("queue buckets pushed");
    }

    /// Bring back what [`Self::push_buckets`] stashed, dropping whatever the
    /// nested pass left behind.
    pub fn pop_buckets(&mut self) {
        assert!(self.pushed, "Queue::pop_buckets without matching push");
        for bucket in &mut self.buckets {
            bucket.swap();
            bucket.clear_back();
        }
        self.pushed = false;
        tracing::debug!("queue buckets popped");
    }

    pub fn is_pushed(&self) -> bool {
        self.pushed
    }

    /// Push the buckets and return a guard that pops them when dropped.
    pub fn nested(&mut self) -> NestedQueue<'_> {
        self.push_buckets();
        NestedQueue { queue: self }
    }
}

/// Guard returned by [`Queue::nested`].
pub struct NestedQueue<'a> {
    queue: &'a mut Queue,
}

impl Deref for NestedQueue<'_> {
    type Target = Queue;

    fn deref(&self) -> &Queue {
        self.queue
    }
}

impl DerefMut for NestedQueue<'_> {
    fn deref_mut(&mut self) -> &mut Queue {
        self.queue
    }
}

impl Drop for NestedQueue<'_> {
    fn drop(&mut self) {
        self.queue.pop_buckets();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendError, RecordingBackend};
    use crate::drawable::MeshDrawable;
    use crate::renderer::StateRenderer;
    use glam::Vec3;
    use lumen_common::{Capabilities, ContextKey, MeshHandle};
    use lumen_state::RenderContext;

    fn mesh(id: u64, bucket: BucketType) -> Rc<dyn Drawable> {
        Rc::new(
            MeshDrawable::new(format!("m{id}"), MeshHandle(id))
                .in_bucket(bucket)
                .at(Vec3::new(0.0, 0.0, -(id as f32))),
        )
    }

    fn renderer() -> StateRenderer<RecordingBackend> {
        let mut ctx = RenderContext::new(ContextKey::new(), Capabilities::default());
        ctx.set_current_camera(Some(Camera::default()));
        StateRenderer::new(ctx, RecordingBackend::new())
    }

    #[test]
    fn routes_by_bucket_type() {
        let mut queue = Queue::default();
        assert!(queue.add(mesh(1, BucketType::Opaque)));
        assert!(queue.add(mesh(2, BucketType::Ortho)));
        assert!(!queue.add(mesh(3, BucketType::Skip)));

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.bucket(BucketType::Opaque).unwrap().len(), 1);
        assert_eq!(queue.bucket(BucketType::Ortho).unwrap().len(), 1);
        assert!(queue.bucket(BucketType::Skip).is_none());
    }

    #[test]
    fn buckets_draw_in_category_order() {
        let mut queue = Queue::default();
        queue.add(mesh(5, BucketType::Post));
        queue.add(mesh(4, BucketType::Ortho));
        queue.add(mesh(3, BucketType::Transparent));
        queue.add(mesh(2, BucketType::Opaque));
        queue.add(mesh(1, BucketType::Pre));

        let mut r = renderer();
        r.render_queue(&mut queue).unwrap();
        let draws: Vec<u64> = r.backend().draws().iter().map(|m| m.0).collect();
        assert_eq!(draws, [1, 2, 3, 4, 5]);
        assert!(queue.is_empty());
    }

    #[test]
    fn missing_camera_fails_and_clears() {
        let mut queue = Queue::default();
        queue.add(mesh(1, BucketType::Opaque));
        let ctx = RenderContext::new(ContextKey::new(), Capabilities::default());
        let mut r = StateRenderer::new(ctx, RecordingBackend::new());

        let err = queue.render_buckets(&mut r).unwrap_err();
        assert!(matches!(err, RenderError::NoCamera));
        assert!(queue.is_empty());
    }

    #[test]
    fn backend_failure_still_clears() {
        let mut queue = Queue::default();
        queue.add(mesh(1, BucketType::Opaque));
        let mut r = renderer();
        r.backend_mut().fail_next(BackendError::Driver("boom".into()));

        assert!(queue.render_buckets(&mut r).is_err());
        assert!(queue.is_empty());
    }

    #[test]
    fn nested_pass_restores_outer_frame() {
        let mut queue = Queue::default();
        queue.add(mesh(1, BucketType::Opaque));
        queue.add(mesh(2, BucketType::Transparent));
        let mut r = renderer();

        {
            let mut inner = queue.nested();
            assert!(inner.is_empty());
            inner.add(mesh(9, BucketType::Opaque));
            inner.render_buckets(&mut r).unwrap();
        }

        assert!(!queue.is_pushed());
        assert_eq!(queue.len(), 2);
        r.render_queue(&mut queue).unwrap();
        let draws: Vec<u64> = r.backend().draws().iter().map(|m| m.0).collect();
        assert_eq!(draws, [9, 1, 2]);
    }

    #[test]
    fn nested_guard_pops_on_early_return() {
        fn inner_pass(queue: &mut Queue, r: &mut dyn Renderer) -> Result<(), RenderError> {
            let mut inner = queue.nested();
            inner.add(mesh(9, BucketType::Opaque));
            r.render_context_mut().set_current_camera(None);
            inner.render_buckets(r)?;
            Ok(())
        }

        let mut queue = Queue::default();
        queue.add(mesh(1, BucketType::Opaque));
        let mut r = renderer();
        assert!(inner_pass(&mut queue, &mut r).is_err());
        assert!(!queue.is_pushed());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn leftover_nested_contents_are_dropped_on_pop() {
        let mut queue = Queue::default();
        let leftover = mesh(3, BucketType::Opaque);
        queue.push_buckets();
        queue.add(leftover.clone());
        queue.pop_buckets();
        assert!(queue.is_empty());
        assert_eq!(Rc::strong_count(&leftover), 1);
    }

    #[test]
    #[should_panic(expected = "already pushed")]
    fn double_push_panics() {
        let mut queue = Queue::default();
        queue.push_buckets();
        queue.push_buckets();
    }

    #[test]
    #[should_panic(expected = "without matching push")]
    fn pop_without_push_panics() {
        Queue::default().pop_buckets();
    }

    #[test]
    fn two_pass_follows_config() {
        let config = QueueConfig {
            two_pass_transparency: false,
            ..QueueConfig::default()
        };
        let mut queue = Queue::new(&config);
        queue.add(Rc::new(
            MeshDrawable::new("glass", MeshHandle(7))
                .in_bucket(BucketType::Transparent)
                .with_transparency(crate::drawable::TransparencyType::TwoPass),
        ));
        let mut r = renderer();
        r.render_queue(&mut queue).unwrap();
        assert_eq!(r.backend().draws(), vec![MeshHandle(7)]);
    }
}
