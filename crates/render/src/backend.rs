use lumen_common::{Capabilities, MeshHandle};
use lumen_state::params::{LightState, TextureState};
use lumen_state::{DepthBias, RenderState, StateRecord, StateType};

/// Failures reported by a GPU backend.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BackendError {
    #[error("GPU context lost")]
    ContextLost,
    #[error("unsupported configuration: {0}")]
    Unsupported(String),
    #[error("driver error: {0}")]
    Driver(String),
}

/// Translates render states into driver calls.
///
/// The core decides which state is active and whether it must be applied;
/// the backend only issues calls. `record` holds what was applied last, so an
/// implementation can limit itself to the fields that changed.
pub trait StateBackend {
    fn apply_state(
        &mut self,
        state: &RenderState,
        record: &StateRecord,
        capabilities: &Capabilities,
    ) -> Result<(), BackendError>;

    fn set_depth_bias(&mut self, bias: Option<DepthBias>) -> Result<(), BackendError>;

    fn set_ortho(&mut self, enabled: bool) -> Result<(), BackendError>;

    fn draw_mesh(&mut self, mesh: MeshHandle) -> Result<(), BackendError>;
}

/// One call received by a [`RecordingBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    Apply { ty: StateType, enabled: bool },
    DepthBias(Option<DepthBias>),
    Ortho(bool),
    Draw(MeshHandle),
}

impl std::fmt::Display for BackendCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendCall::Apply { ty, enabled } => {
                write!(f, "apply {ty}{}", if *enabled { "" } else { " (disabled)" })
            }
            BackendCall::DepthBias(Some(b)) => {
                write!(f, "depth bias factor={:.2} units={:.2}", b.factor, b.units)
            }
            BackendCall::DepthBias(None) => write!(f, "depth bias off"),
            BackendCall::Ortho(on) => write!(f, "ortho {}", if *on { "on" } else { "off" }),
            BackendCall::Draw(mesh) => write!(f, "draw mesh #{}", mesh.0),
        }
    }
}

/// Backend that records calls instead of talking to a GPU.
///
/// Stands in for a driver in tests and in the CLI. It rejects texture units
/// beyond the context's capabilities, and can be told to fail the next call.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    calls: Vec<BackendCall>,
    fail_next: Option<BackendError>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[BackendCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<BackendCall> {
        std::mem::take(&mut self.calls)
    }

    /// Make the next call return `err`.
    pub fn fail_next(&mut self, err: BackendError) {
        self.fail_next = Some(err);
    }

    /// Number of apply calls recorded for `ty`.
    pub fn applies(&self, ty: StateType) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, BackendCall::Apply { ty: t, .. } if *t == ty))
            .count()
    }

    /// Meshes drawn, in order.
    pub fn draws(&self) -> Vec<MeshHandle> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                BackendCall::Draw(mesh) => Some(*mesh),
                _ => None,
            })
            .collect()
    }

    fn record(&mut self, call: BackendCall) -> Result<(), BackendError> {
        if let Some(err) = self.fail_next.take() {
            return Err(err);
        }
        self.calls.push(call);
        Ok(())
    }
}

impl StateBackend for RecordingBackend {
    fn apply_state(
        &mut self,
        state: &RenderState,
        _record: &StateRecord,
        capabilities: &Capabilities,
    ) -> Result<(), BackendError> {
        if let Some(textures) = state.get::<TextureState>() {
            if textures.units_used() > capabilities.max_texture_units {
                return Err(BackendError::Unsupported(format!(
                    "{} texture units requested, {} available",
                    textures.units_used(),
                    capabilities.max_texture_units
                )));
            }
        }
        if let Some(lights) = state.get::<LightState>() {
            if lights.slots_used() > capabilities.max_lights {
                return Err(BackendError::Unsupported(format!(
                    "{} light slots requested, {} available",
                    lights.slots_used(),
                    capabilities.max_lights
                )));
            }
        }
        self.record(BackendCall::Apply {
            ty: state.state_type(),
            enabled: state.is_enabled(),
        })
    }

    fn set_depth_bias(&mut self, bias: Option<DepthBias>) -> Result<(), BackendError> {
        self.record(BackendCall::DepthBias(bias))
    }

    fn set_ortho(&mut self, enabled: bool) -> Result<(), BackendError> {
        self.record(BackendCall::Ortho(enabled))
    }

    fn draw_mesh(&mut self, mesh: MeshHandle) -> Result<(), BackendError> {
        self.record(BackendCall::Draw(mesh))
    }
}
