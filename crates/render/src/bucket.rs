use std::cell::OnceCell;
use std::cmp::Ordering;
use std::rc::Rc;

use lumen_common::{Camera, is_valid_vec3};
use lumen_state::params::{CullFace, CullState, ZBufferState};
use lumen_state::{PassNodeState, RenderState};

use crate::compare;
use crate::drawable::{BucketType, Drawable, TransparencyType};
use crate::{RenderError, Renderer};

/// How a bucket orders its drawables before drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Insertion order.
    Unsorted,
    /// Texture grouping, then nearest first.
    Opaque,
    /// Farthest first.
    Transparent,
    /// Ascending ortho order.
    Ortho,
}

/// Squared camera-space distance of a drawable.
///
/// Uses the bound center if it is valid, else the world translation if that
/// is valid. Returns `f32::NEG_INFINITY` when neither can be measured.
pub fn distance_to_cam(drawable: &dyn Drawable, camera: &Camera) -> f32 {
    drawable
        .world_bound_center()
        .filter(|c| is_valid_vec3(*c))
        .or_else(|| Some(drawable.world_translation()).filter(|t| is_valid_vec3(*t)))
        .map_or(f32::NEG_INFINITY, |p| camera.distance_to_cam(p))
}

struct Entry {
    drawable: Rc<dyn Drawable>,
    /// Distance to the camera of the running sort, computed on first comparison.
    distance: OnceCell<f32>,
}

impl Entry {
    fn new(drawable: Rc<dyn Drawable>) -> Self {
        Self {
            drawable,
            distance: OnceCell::new(),
        }
    }

    fn distance(&self, camera: &Camera) -> f32 {
        *self
            .distance
            .get_or_init(|| distance_to_cam(&*self.drawable, camera))
    }
}

/// Overrides for drawing two-pass transparent objects: back faces without
/// depth writes first, then front faces.
#[derive(Debug)]
struct TwoPass {
    back_faces: PassNodeState,
    front_faces: PassNodeState,
}

impl TwoPass {
    fn new() -> Self {
        let cull = |face| RenderState::new(CullState { face, ..CullState::default() });
        Self {
            back_faces: PassNodeState::with_states([
                cull(CullFace::Front),
                RenderState::new(ZBufferState {
                    writable: false,
                    ..ZBufferState::default()
                }),
            ]),
            front_faces: PassNodeState::with_states([cull(CullFace::Back)]),
        }
    }
}

/// One category of drawables, sorted and drawn as a unit.
///
/// Slots live in two arrays: the front one is in use, the back one holds a
/// stashed frame while a nested render-to-texture pass runs. Slot capacity
/// only grows. Entries past the logical length are always `None`.
pub struct RenderBucket {
    bucket: BucketType,
    order: SortOrder,
    front: Vec<Option<Entry>>,
    front_len: usize,
    back: Vec<Option<Entry>>,
    back_len: usize,
    scratch: Vec<Option<Entry>>,
    swapped: bool,
    two_pass: Option<TwoPass>,
}

impl RenderBucket {
    pub fn new(bucket: BucketType, order: SortOrder, capacity: usize) -> Self {
        Self {
            bucket,
            order,
            front: empty_slots(capacity),
            front_len: 0,
            back: empty_slots(capacity),
            back_len: 0,
            scratch: Vec::new(),
            swapped: false,
            two_pass: None,
        }
    }

    /// Draw [`TransparencyType::TwoPass`] drawables as back faces, then front faces.
    pub fn with_two_pass_transparency(mut self) -> Self {
        self.two_pass = Some(TwoPass::new());
        self
    }

    pub fn bucket_type(&self) -> BucketType {
        self.bucket
    }

    pub fn sort_order(&self) -> SortOrder {
        self.order
    }

    pub fn len(&self) -> usize {
        self.front_len
    }

    pub fn is_empty(&self) -> bool {
        self.front_len == 0
    }

    /// Slots available before the next growth.
    pub fn capacity(&self) -> usize {
        self.front.len()
    }

    pub fn add(&mut self, drawable: Rc<dyn Drawable>) {
        if self.front_len == self.front.len() {
            let grown = (self.front.len() * 2).max(1);
            self.front.resize_with(grown, || None);
        }
        self.front[self.front_len] = Some(Entry::new(drawable));
        self.front_len += 1;
    }

    /// Drop every reference without giving back slot capacity.
    pub fn clear(&mut self) {
        for slot in &mut self.front[..self.front_len] {
            *slot = None;
        }
        self.front_len = 0;
    }

    /// The drawable at position `index` of the live prefix.
    pub fn get(&self, index: usize) -> &Rc<dyn Drawable> {
        assert!(
            index < self.front_len,
            "index {index} beyond {} bucket length {}",
            self.bucket,
            self.front_len
        );
        &live(&self.front[index]).drawable
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rc<dyn Drawable>> + '_ {
        self.front[..self.front_len]
            .iter()
            .map(|slot| &live(slot).drawable)
    }

    /// Stable sort of the live prefix.
    pub fn sort(&mut self, camera: &Camera) {
        if self.front_len < 2 || self.order == SortOrder::Unsorted {
            return;
        }
        if self.scratch.len() < self.front.len() {
            self.scratch.resize_with(self.front.len(), || None);
        }
        // Each sort may use a different camera.
        for slot in self.front[..self.front_len].iter_mut().flatten() {
            slot.distance.take();
        }

        let order = self.order;
        let mut cmp = |a: &Entry, b: &Entry| match order {
            SortOrder::Opaque => compare::opaque(&*a.drawable, &*b.drawable, || {
                (a.distance(camera), b.distance(camera))
            }),
            SortOrder::Transparent => {
                compare::farthest_first(a.distance(camera), b.distance(camera))
            }
            SortOrder::Ortho => compare::ortho(&*a.drawable, &*b.drawable),
            SortOrder::Unsorted => Ordering::Equal,
        };
        let len = self.front_len;
        merge_sort(&mut self.front[..len], &mut self.scratch[..len], &mut cmp);
        tracing::trace!(bucket = %self.bucket, len, "bucket sorted");
    }

    /// Draw the live prefix in order.
    pub fn render(&mut self, renderer: &mut dyn Renderer) -> Result<(), RenderError> {
        if self.order != SortOrder::Ortho {
            return self.draw_all(renderer);
        }
        renderer.set_ortho(true)?;
        let drawn = self.draw_all(renderer);
        let restored = renderer.set_ortho(false);
        drawn.and(restored)
    }

    fn draw_all(&mut self, renderer: &mut dyn Renderer) -> Result<(), RenderError> {
        let Self {
            front,
            front_len,
            two_pass,
            ..
        } = self;

        for slot in &front[..*front_len] {
            let drawable = &live(slot).drawable;
            match two_pass.as_mut() {
                Some(tp) if drawable.transparency() == TransparencyType::TwoPass => {
                    tp.back_faces.with(renderer, |r| drawable.draw(r))?;
                    tp.front_faces.with(renderer, |r| drawable.draw(r))?;
                }
                _ => drawable.draw(renderer)?,
            }
        }
        Ok(())
    }

    /// Exchange the front and back slot arrays. Calls come in matching pairs.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.front, &mut self.back);
        std::mem::swap(&mut self.front_len, &mut self.back_len);
        self.swapped = !self.swapped;
    }

    /// Release whatever the back slots still reference.
    pub fn clear_back(&mut self) {
        for slot in &mut self.back[..self.back_len] {
            *slot = None;
        }
        self.back_len = 0;
    }

    /// True between the two calls of a swap pair.
    pub fn is_swapped(&self) -> bool {
        self.swapped
    }
}

impl std::fmt::Debug for RenderBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderBucket")
            .field("bucket", &self.bucket)
            .field("order", &self.order)
            .field("len", &self.front_len)
            .field("capacity", &self.front.len())
            .field("swapped", &self.swapped)
            .finish()
    }
}

fn empty_slots(n: usize) -> Vec<Option<Entry>> {
    std::iter::repeat_with(|| None).take(n).collect()
}

fn live(slot: &Option<Entry>) -> &Entry {
    match slot {
        Some(entry) => entry,
        None => unreachable!("empty slot inside the live prefix"),
    }
}

/// Top-down merge sort; ties keep their input order.
fn merge_sort<F>(slots: &mut [Option<Entry>], scratch: &mut [Option<Entry>], cmp: &mut F)
where
    F: FnMut(&Entry, &Entry) -> Ordering,
{
    let len = slots.len();
    if len < 2 {
        return;
    }
    let mid = len / 2;
    merge_sort(&mut slots[..mid], &mut scratch[..mid], cmp);
    merge_sort(&mut slots[mid..], &mut scratch[mid..], cmp);

    for (dst, src) in scratch.iter_mut().zip(slots.iter_mut()) {
        *dst = src.take();
    }
    let (left, right) = scratch.split_at_mut(mid);
    let (mut i, mut j) = (0, 0);
    for slot in slots.iter_mut() {
        let take_left = if i == left.len() {
            false
        } else if j == right.len() {
            true
        } else {
            cmp(live(&left[i]), live(&right[j])) != Ordering::Greater
        };
        *slot = if take_left {
            i += 1;
            left[i - 1].take()
        } else {
            j += 1;
            right[j - 1].take()
        };
    }
}
