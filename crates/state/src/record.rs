use crate::{RenderState, StateParams, StateType};

/// Mirror of the values last applied for one state type in one context.
///
/// The backend consults the record to skip driver calls that would not
/// change anything.
#[derive(Debug, Clone)]
pub struct StateRecord {
    state_type: StateType,
    valid: bool,
    enabled: bool,
    applied: Option<StateParams>,
    /// Number of false-to-true transitions of the valid flag.
    validations: u64,
}

impl StateRecord {
    pub fn new(state_type: StateType) -> Self {
        Self {
            state_type,
            valid: false,
            enabled: false,
            applied: None,
            validations: 0,
        }
    }

    pub fn state_type(&self) -> StateType {
        self.state_type
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Last applied parameters, if anything was applied since creation.
    pub fn applied(&self) -> Option<&StateParams> {
        self.applied.as_ref()
    }

    pub fn applied_enabled(&self) -> bool {
        self.enabled
    }

    pub fn validations(&self) -> u64 {
        self.validations
    }

    /// Whether the backend has to (re)apply `state`.
    pub fn needs_apply(&self, state: &RenderState) -> bool {
        debug_assert_eq!(state.state_type(), self.state_type);
        !self.valid
            || state.needs_refresh()
            || self.enabled != state.is_enabled()
            || self.applied.as_ref() != Some(state.params())
    }

    /// Record `state` as applied: update the mirror, mark valid, clear the refresh flag.
    pub fn commit(&mut self, state: &RenderState) {
        assert_eq!(
            state.state_type(),
            self.state_type,
            "state committed to the record of another type"
        );
        self.enabled = state.is_enabled();
        if self.applied.as_ref() != Some(state.params()) {
            self.applied = Some(state.params().clone());
        }
        if !self.valid {
            self.valid = true;
            self.validations += 1;
        }
        state.clear_refresh();
    }

    /// Forget what the GPU holds; the next apply for this type goes through.
    pub fn invalidate(&mut self) {
        self.valid = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{CullFace, CullState, TextureState, TextureUnit};

    #[test]
    fn new_record_forces_apply() {
        let record = StateRecord::new(StateType::Cull);
        let state = RenderState::new(CullState::default());
        state.clear_refresh();
        assert!(!record.is_valid());
        assert!(record.needs_apply(&state));
    }

    #[test]
    fn commit_then_skip_equal_value() {
        let mut record = StateRecord::new(StateType::Cull);
        let state = RenderState::new(CullState::default());
        record.commit(&state);
        assert!(record.is_valid());
        assert!(!state.needs_refresh());
        assert!(!record.needs_apply(&state));

        // A distinct instance with identical fields does not force reapplication.
        let twin = RenderState::new(CullState::default());
        twin.clear_refresh();
        assert!(!record.needs_apply(&twin));
    }

    #[test]
    fn changed_value_or_refresh_forces_apply() {
        let mut record = StateRecord::new(StateType::Cull);
        let mut state = RenderState::new(CullState::default());
        record.commit(&state);

        state.edit::<CullState>().unwrap().face = CullFace::Front;
        assert!(record.needs_apply(&state));
        record.commit(&state);
        assert!(!record.needs_apply(&state));

        state.mark_refresh();
        assert!(record.needs_apply(&state));
    }

    #[test]
    fn invalidate_counts_one_flip_per_reapply() {
        let mut record = StateRecord::new(StateType::Cull);
        let state = RenderState::new(CullState::default());
        record.commit(&state);
        record.commit(&state);
        assert_eq!(record.validations(), 1);

        record.invalidate();
        assert!(record.needs_apply(&state));
        record.commit(&state);
        assert_eq!(record.validations(), 2);
    }

    #[test]
    #[should_panic(expected = "another type")]
    fn commit_of_wrong_type_fails_fast() {
        let mut record = StateRecord::new(StateType::Fog);
        record.commit(&RenderState::new(CullState::default()));
    }

    #[test]
    fn padded_texture_binding_matches_committed_one() {
        let mut record = StateRecord::new(StateType::Texture);
        let committed =
            RenderState::new(TextureState::with_texture(0, TextureUnit::new(1)).unwrap());
        record.commit(&committed);

        let mut textures = TextureState::with_texture(0, TextureUnit::new(1)).unwrap();
        textures.set_texture(2, None).unwrap();
        let same = RenderState::new(textures);
        assert!(!record.needs_apply(&same));
    }
}
