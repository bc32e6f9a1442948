use lumen_common::ContextKey;

/// Errors from render-state bookkeeping.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("unknown state type: {0}")]
    UnknownStateType(String),
    #[error("texture unit {unit} out of range (max {max})")]
    TextureUnitOutOfRange { unit: usize, max: usize },
    #[error("light slot {slot} out of range (max {max})")]
    LightSlotOutOfRange { slot: usize, max: usize },
    #[error("a render context already exists for {0}")]
    DuplicateContext(ContextKey),
    #[error("no render context registered for {0}")]
    UnknownContext(ContextKey),
}
