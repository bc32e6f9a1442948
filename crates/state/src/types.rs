use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};
use std::str::FromStr;

use crate::StateError;

/// One orthogonal axis of pipeline configuration.
///
/// The set is closed: every per-context table is a fixed array indexed by
/// [`StateType::index`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateType {
    Blend,
    ColorMask,
    Cull,
    Fog,
    Light,
    Material,
    Offset,
    Shading,
    Stencil,
    Texture,
    Wireframe,
    ZBuffer,
}

impl StateType {
    pub const COUNT: usize = 12;

    /// Every state type, in ordinal order.
    pub const ALL: [StateType; Self::COUNT] = [
        StateType::Blend,
        StateType::ColorMask,
        StateType::Cull,
        StateType::Fog,
        StateType::Light,
        StateType::Material,
        StateType::Offset,
        StateType::Shading,
        StateType::Stencil,
        StateType::Texture,
        StateType::Wireframe,
        StateType::ZBuffer,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            StateType::Blend => "blend",
            StateType::ColorMask => "color_mask",
            StateType::Cull => "cull",
            StateType::Fog => "fog",
            StateType::Light => "light",
            StateType::Material => "material",
            StateType::Offset => "offset",
            StateType::Shading => "shading",
            StateType::Stencil => "stencil",
            StateType::Texture => "texture",
            StateType::Wireframe => "wireframe",
            StateType::ZBuffer => "z_buffer",
        }
    }
}

impl std::fmt::Display for StateType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StateType {
    type Err = StateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StateType::ALL
            .iter()
            .copied()
            .find(|t| t.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| StateError::UnknownStateType(s.to_string()))
    }
}

/// Fixed-size table with one slot per [`StateType`].
///
/// `StateMap<Option<T>>` is the sparse form: an empty slot means "no entry".
#[derive(Debug, Clone, PartialEq)]
pub struct StateMap<T> {
    slots: [T; StateType::COUNT],
}

impl<T> StateMap<T> {
    pub fn from_fn(mut f: impl FnMut(StateType) -> T) -> Self {
        Self {
            slots: std::array::from_fn(|i| f(StateType::ALL[i])),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (StateType, &T)> {
        StateType::ALL.into_iter().zip(self.slots.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (StateType, &mut T)> {
        StateType::ALL.into_iter().zip(self.slots.iter_mut())
    }
}

impl<T> StateMap<Option<T>> {
    pub fn empty() -> Self {
        Self::from_fn(|_| None)
    }

    /// Occupied entries in ordinal order.
    pub fn entries(&self) -> impl Iterator<Item = (StateType, &T)> {
        self.iter().filter_map(|(ty, slot)| slot.as_ref().map(|v| (ty, v)))
    }

    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
    }
}

impl<T: Default> Default for StateMap<T> {
    fn default() -> Self {
        Self::from_fn(|_| T::default())
    }
}

impl<T> Index<StateType> for StateMap<T> {
    type Output = T;

    fn index(&self, ty: StateType) -> &T {
        &self.slots[ty.index()]
    }
}

impl<T> IndexMut<StateType> for StateMap<T> {
    fn index_mut(&mut self, ty: StateType) -> &mut T {
        &mut self.slots[ty.index()]
    }
}
