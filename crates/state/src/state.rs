use serde::{Deserialize, Serialize};
use std::cell::Cell;

use crate::StateType;
use crate::params::{
    BlendState, ColorMaskState, CullState, FogState, LightState, MaterialState, OffsetState,
    ShadingState, StencilState, TextureState, WireframeState, ZBufferState,
};

/// Parameters of a render state, one arm per [`StateType`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StateParams {
    Blend(BlendState),
    ColorMask(ColorMaskState),
    Cull(CullState),
    Fog(FogState),
    Light(LightState),
    Material(MaterialState),
    Offset(OffsetState),
    Shading(ShadingState),
    Stencil(StencilState),
    Texture(TextureState),
    Wireframe(WireframeState),
    ZBuffer(ZBufferState),
}

/// Typed access to one arm of [`StateParams`].
pub trait StateKind: Sized + Into<StateParams> {
    const TYPE: StateType;

    fn from_params(params: &StateParams) -> Option<&Self>;
    fn from_params_mut(params: &mut StateParams) -> Option<&mut Self>;
}

macro_rules! state_kinds {
    ($($arm:ident => $ty:ident),* $(,)?) => {
        impl StateParams {
            pub fn state_type(&self) -> StateType {
                match self {
                    $(StateParams::$arm(_) => StateType::$arm,)*
                }
            }

            pub fn default_for(ty: StateType) -> Self {
                match ty {
                    $(StateType::$arm => StateParams::$arm($ty::default()),)*
                }
            }
        }

        $(
            impl From<$ty> for StateParams {
                fn from(p: $ty) -> Self {
                    StateParams::$arm(p)
                }
            }

            impl StateKind for $ty {
                const TYPE: StateType = StateType::$arm;

                fn from_params(params: &StateParams) -> Option<&Self> {
                    match params {
                        StateParams::$arm(p) => Some(p),
                        _ => None,
                    }
                }

                fn from_params_mut(params: &mut StateParams) -> Option<&mut Self> {
                    match params {
                        StateParams::$arm(p) => Some(p),
                        _ => None,
                    }
                }
            }
        )*
    };
}

state_kinds! {
    Blend => BlendState,
    ColorMask => ColorMaskState,
    Cull => CullState,
    Fog => FogState,
    Light => LightState,
    Material => MaterialState,
    Offset => OffsetState,
    Shading => ShadingState,
    Stencil => StencilState,
    Texture => TextureState,
    Wireframe => WireframeState,
    ZBuffer => ZBufferState,
}

impl StateParams {
    /// Number of independently inheritable slots.
    ///
    /// Texture units and light slots merge per slot across a hierarchy;
    /// every other type is one indivisible slot.
    pub fn slot_count(&self) -> usize {
        match self {
            StateParams::Texture(t) => t.units_used(),
            StateParams::Light(l) => l.slots_used(),
            _ => 1,
        }
    }

    /// Fill slots that are empty here from `other`. Returns true if anything changed.
    pub(crate) fn fill_empty_slots(&mut self, other: &StateParams) -> bool {
        match (self, other) {
            (StateParams::Texture(acc), StateParams::Texture(src)) => acc.fill_empty_slots(src),
            (StateParams::Light(acc), StateParams::Light(src)) => acc.fill_empty_slots(src),
            _ => false,
        }
    }
}

/// A pipeline configuration value for one [`StateType`].
///
/// The type is fixed when the state is built. Every mutation marks the state
/// as needing a refresh; the flag is cleared when a backend applies it. A
/// freshly built state is not marked: its value alone decides.
/// Equality compares `enabled` and the parameters only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderState {
    #[serde(default = "enabled_by_default")]
    enabled: bool,
    #[serde(flatten)]
    params: StateParams,
    #[serde(skip)]
    needs_refresh: Cell<bool>,
}

fn enabled_by_default() -> bool {
    true
}

impl RenderState {
    pub fn new(params: impl Into<StateParams>) -> Self {
        Self {
            enabled: true,
            params: params.into(),
            needs_refresh: Cell::new(false),
        }
    }

    pub fn disabled(params: impl Into<StateParams>) -> Self {
        let mut state = Self::new(params);
        state.enabled = false;
        state
    }

    /// The state a context starts out with for `ty`.
    pub fn default_for(ty: StateType) -> Self {
        Self::new(StateParams::default_for(ty))
    }

    pub fn state_type(&self) -> StateType {
        self.params.state_type()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        self.needs_refresh.set(true);
    }

    pub fn params(&self) -> &StateParams {
        &self.params
    }

    /// Typed read access. `None` if `P` is not this state's kind.
    pub fn get<P: StateKind>(&self) -> Option<&P> {
        P::from_params(&self.params)
    }

    /// Typed mutable access; marks the state for refresh.
    pub fn edit<P: StateKind>(&mut self) -> Option<&mut P> {
        let params = P::from_params_mut(&mut self.params)?;
        self.needs_refresh.set(true);
        Some(params)
    }

    pub fn needs_refresh(&self) -> bool {
        self.needs_refresh.get()
    }

    /// Force the next apply cycle to reapply this state.
    pub fn mark_refresh(&self) {
        self.needs_refresh.set(true);
    }

    pub(crate) fn clear_refresh(&self) {
        self.needs_refresh.set(false);
    }

    /// An independent copy for effective-state resolution.
    pub(crate) fn synthesize(&self) -> Self {
        Self {
            enabled: self.enabled,
            params: self.params.clone(),
            needs_refresh: Cell::new(self.needs_refresh()),
        }
    }

    /// Merge `other`'s slots into the empty slots of this state.
    pub(crate) fn fill_from(&mut self, other: &RenderState) {
        self.params.fill_empty_slots(&other.params);
        if other.needs_refresh() {
            self.needs_refresh.set(true);
        }
    }
}

impl PartialEq for RenderState {
    fn eq(&self, other: &Self) -> bool {
        self.enabled == other.enabled && self.params == other.params
    }
}

impl<P: StateKind> From<P> for RenderState {
    fn from(params: P) -> Self {
        RenderState::new(params)
    }
}
