//! Parameter blocks for each state type.
//!
//! Defaults follow the fixed-function pipeline's initial values, so a
//! freshly created state describes what a new context already has.

use glam::{Vec3, Vec4};
use lumen_common::TextureKey;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

use crate::StateError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TestFunction {
    Never,
    #[default]
    Less,
    Equal,
    LessOrEqual,
    Greater,
    NotEqual,
    GreaterOrEqual,
    Always,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlendFactor {
    Zero,
    One,
    SourceColor,
    OneMinusSourceColor,
    SourceAlpha,
    OneMinusSourceAlpha,
    DestinationColor,
    DestinationAlpha,
    OneMinusDestinationAlpha,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlphaTest {
    pub function: TestFunction,
    pub reference: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlendState {
    pub source: BlendFactor,
    pub destination: BlendFactor,
    pub alpha_test: Option<AlphaTest>,
}

impl Default for BlendState {
    fn default() -> Self {
        Self {
            source: BlendFactor::SourceAlpha,
            destination: BlendFactor::OneMinusSourceAlpha,
            alpha_test: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorMaskState {
    pub red: bool,
    pub green: bool,
    pub blue: bool,
    pub alpha: bool,
}

impl Default for ColorMaskState {
    fn default() -> Self {
        Self {
            red: true,
            green: true,
            blue: true,
            alpha: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CullFace {
    None,
    Front,
    #[default]
    Back,
    FrontAndBack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Winding {
    #[default]
    CounterClockwise,
    Clockwise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CullState {
    pub face: CullFace,
    pub front_face: Winding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FogMode {
    #[default]
    Linear,
    Exponential,
    ExponentialSquared,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FogState {
    pub mode: FogMode,
    pub color: Vec4,
    pub start: f32,
    pub end: f32,
    pub density: f32,
}

impl Default for FogState {
    fn default() -> Self {
        Self {
            mode: FogMode::Linear,
            color: Vec4::new(0.0, 0.0, 0.0, 0.0),
            start: 0.0,
            end: 1.0,
            density: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LightKind {
    Directional,
    Point,
    Spot,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Light {
    pub kind: LightKind,
    pub color: Vec4,
    /// Direction for directional lights, position otherwise.
    pub vector: Vec3,
}

/// Lights bound to fixed light slots.
///
/// Slots never end in an empty entry, so equal bindings compare equal.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LightState {
    #[serde(deserialize_with = "deserialize_lights")]
    slots: Vec<Option<Light>>,
    pub two_sided: bool,
}

impl LightState {
    pub const MAX_LIGHTS: usize = 8;

    pub fn set_light(&mut self, slot: usize, light: Option<Light>) -> Result<(), StateError> {
        if slot >= Self::MAX_LIGHTS {
            return Err(StateError::LightSlotOutOfRange {
                slot,
                max: Self::MAX_LIGHTS,
            });
        }
        set_slot(&mut self.slots, slot, light);
        Ok(())
    }

    pub fn light(&self, slot: usize) -> Option<&Light> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    pub fn slots(&self) -> &[Option<Light>] {
        &self.slots
    }

    /// Number of slots up to and including the highest occupied one.
    pub fn slots_used(&self) -> usize {
        self.slots.len()
    }

    pub fn count(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub(crate) fn fill_empty_slots(&mut self, other: &Self) -> bool {
        fill_slots(&mut self.slots, &other.slots)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialState {
    pub ambient: Vec4,
    pub diffuse: Vec4,
    pub specular: Vec4,
    pub emissive: Vec4,
    pub shininess: f32,
}

impl Default for MaterialState {
    fn default() -> Self {
        Self {
            ambient: Vec4::new(0.2, 0.2, 0.2, 1.0),
            diffuse: Vec4::new(0.8, 0.8, 0.8, 1.0),
            specular: Vec4::new(0.0, 0.0, 0.0, 1.0),
            emissive: Vec4::new(0.0, 0.0, 0.0, 1.0),
            shininess: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OffsetState {
    pub factor: f32,
    pub units: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ShadingMode {
    #[default]
    Smooth,
    Flat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadingState {
    pub mode: ShadingMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StencilOp {
    #[default]
    Keep,
    Zero,
    Replace,
    Increment,
    Decrement,
    Invert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StencilState {
    pub function: TestFunction,
    pub reference: i32,
    pub mask: u32,
    pub on_fail: StencilOp,
    pub on_depth_fail: StencilOp,
    pub on_pass: StencilOp,
}

impl Default for StencilState {
    fn default() -> Self {
        Self {
            function: TestFunction::Always,
            reference: 0,
            mask: u32::MAX,
            on_fail: StencilOp::Keep,
            on_depth_fail: StencilOp::Keep,
            on_pass: StencilOp::Keep,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ApplyMode {
    #[default]
    Modulate,
    Replace,
    Decal,
    Blend,
    Add,
}

/// A texture bound to one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureUnit {
    pub key: TextureKey,
    #[serde(default)]
    pub apply: ApplyMode,
}

impl TextureUnit {
    pub fn new(key: u64) -> Self {
        Self {
            key: TextureKey(key),
            apply: ApplyMode::Modulate,
        }
    }
}

/// Textures bound per unit. Empty units are `None`; the list never ends in
/// one.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureState {
    #[serde(deserialize_with = "deserialize_units")]
    units: Vec<Option<TextureUnit>>,
}

impl TextureState {
    pub const MAX_UNITS: usize = 32;

    pub fn with_texture(unit: usize, texture: TextureUnit) -> Result<Self, StateError> {
        let mut state = Self::default();
        state.set_texture(unit, Some(texture))?;
        Ok(state)
    }

    pub fn set_texture(
        &mut self,
        unit: usize,
        texture: Option<TextureUnit>,
    ) -> Result<(), StateError> {
        if unit >= Self::MAX_UNITS {
            return Err(StateError::TextureUnitOutOfRange {
                unit,
                max: Self::MAX_UNITS,
            });
        }
        set_slot(&mut self.units, unit, texture);
        Ok(())
    }

    pub fn texture(&self, unit: usize) -> Option<&TextureUnit> {
        self.units.get(unit).and_then(Option::as_ref)
    }

    pub fn units(&self) -> &[Option<TextureUnit>] {
        &self.units
    }

    /// Unbind every unit.
    pub fn clear(&mut self) {
        self.units.clear();
    }

    /// Highest unit holding a texture, if any.
    pub fn max_unit_used(&self) -> Option<usize> {
        self.units.len().checked_sub(1)
    }

    /// Number of units up to and including the highest bound one.
    pub fn units_used(&self) -> usize {
        self.units.len()
    }

    pub(crate) fn fill_empty_slots(&mut self, other: &Self) -> bool {
        fill_slots(&mut self.units, &other.units)
    }
}

fn set_slot<T: Clone>(slots: &mut Vec<Option<T>>, index: usize, value: Option<T>) {
    if slots.len() <= index {
        if value.is_none() {
            return;
        }
        slots.resize(index + 1, None);
    }
    slots[index] = value;
    trim_slots(slots);
}

fn trim_slots<T>(slots: &mut Vec<Option<T>>) {
    let used = slots.iter().rposition(Option::is_some).map_or(0, |i| i + 1);
    slots.truncate(used);
}

fn fill_slots<T: Clone>(acc: &mut Vec<Option<T>>, src: &[Option<T>]) -> bool {
    let mut changed = false;
    for (i, slot) in src.iter().enumerate() {
        let Some(value) = slot else { continue };
        if acc.len() <= i {
            acc.resize(i + 1, None);
        }
        if acc[i].is_none() {
            acc[i] = Some(value.clone());
            changed = true;
        }
    }
    changed
}

fn deserialize_bounded<'de, D, T>(
    deserializer: D,
    max: usize,
    out_of_range: impl FnOnce(usize) -> StateError,
) -> Result<Vec<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let mut slots = Vec::<Option<T>>::deserialize(deserializer)?;
    trim_slots(&mut slots);
    if let Some(highest) = slots.len().checked_sub(1).filter(|&i| i >= max) {
        return Err(de::Error::custom(out_of_range(highest)));
    }
    Ok(slots)
}

fn deserialize_units<'de, D>(deserializer: D) -> Result<Vec<Option<TextureUnit>>, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_bounded(deserializer, TextureState::MAX_UNITS, |unit| {
        StateError::TextureUnitOutOfRange {
            unit,
            max: TextureState::MAX_UNITS,
        }
    })
}

fn deserialize_lights<'de, D>(deserializer: D) -> Result<Vec<Option<Light>>, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_bounded(deserializer, LightState::MAX_LIGHTS, |slot| {
        StateError::LightSlotOutOfRange {
            slot,
            max: LightState::MAX_LIGHTS,
        }
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WireframeFace {
    Front,
    Back,
    #[default]
    FrontAndBack,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WireframeState {
    pub face: WireframeFace,
    pub line_width: f32,
}

impl Default for WireframeState {
    fn default() -> Self {
        Self {
            face: WireframeFace::FrontAndBack,
            line_width: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZBufferState {
    pub function: TestFunction,
    pub writable: bool,
}

impl Default for ZBufferState {
    fn default() -> Self {
        Self {
            function: TestFunction::LessOrEqual,
            writable: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn texture_units_grow_on_demand() {
        let mut ts = TextureState::default();
        assert_eq!(ts.units_used(), 0);
        ts.set_texture(2, Some(TextureUnit::new(7))).unwrap();
        assert_eq!(ts.units().len(), 3);
        assert_eq!(ts.max_unit_used(), Some(2));
        assert_eq!(ts.units_used(), 3);
        assert!(ts.texture(0).is_none());
        assert_eq!(ts.texture(2).unwrap().key, TextureKey(7));
    }

    #[test]
    fn clearing_top_unit_lowers_usage() {
        let mut ts = TextureState::with_texture(1, TextureUnit::new(1)).unwrap();
        ts.set_texture(3, Some(TextureUnit::new(2))).unwrap();
        ts.set_texture(3, None).unwrap();
        assert_eq!(ts.units_used(), 2);
    }

    #[test]
    fn texture_unit_out_of_range() {
        let mut ts = TextureState::default();
        let err = ts
            .set_texture(TextureState::MAX_UNITS, Some(TextureUnit::new(1)))
            .unwrap_err();
        assert!(matches!(err, StateError::TextureUnitOutOfRange { unit: 32, .. }));
    }

    #[test]
    fn light_slots() {
        let mut ls = LightState::default();
        let sun = Light {
            kind: LightKind::Directional,
            color: Vec4::ONE,
            vector: Vec3::NEG_Y,
        };
        ls.set_light(1, Some(sun)).unwrap();
        assert_eq!(ls.count(), 1);
        assert!(ls.light(0).is_none());
        assert!(ls.set_light(LightState::MAX_LIGHTS, Some(sun)).is_err());
    }

    #[test]
    fn trailing_empty_units_do_not_change_equality() {
        let bound = TextureState::with_texture(0, TextureUnit::new(1)).unwrap();
        let mut padded = bound.clone();
        padded.set_texture(2, None).unwrap();
        assert_eq!(padded, bound);

        let parsed: TextureState =
            serde_yaml::from_str("units:\n  - key: 1\n  - null\n  - null\n").unwrap();
        assert_eq!(parsed, bound);
        assert_eq!(parsed.units_used(), 1);
    }

    #[test]
    fn deserialized_slots_are_bounded() {
        let units = format!(
            "units: [{}{{key: 1}}]",
            "null, ".repeat(TextureState::MAX_UNITS)
        );
        let err = serde_yaml::from_str::<TextureState>(&units).unwrap_err();
        assert!(err.to_string().contains("texture unit 32 out of range"));

        let lights = format!(
            "slots: [{}{{kind: Point, color: [1, 1, 1, 1], vector: [0, 0, 0]}}]",
            "null, ".repeat(LightState::MAX_LIGHTS)
        );
        let err = serde_yaml::from_str::<LightState>(&lights).unwrap_err();
        assert!(err.to_string().contains("light slot 8 out of range"));

        let padded = format!("slots: [{}]", ["null"; 12].join(", "));
        let ls: LightState = serde_yaml::from_str(&padded).unwrap();
        assert_eq!(ls.slots_used(), 0);
    }
}
