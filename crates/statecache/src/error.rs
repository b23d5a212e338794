use crate::registry::PassId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error("{0} is not registered with the state tracker")]
    UnknownPass(PassId),
    #[error("bind group at slot {slot} carries dynamic offsets but its dynamic offset count is unknown")]
    UnknownDynamicOffsetCount { slot: u32 },
    #[error(
        "dynamic offsets out of range: {needed} value(s) requested from index {start}, only {available} supplied"
    )]
    OffsetsOutOfRange {
        start: usize,
        needed: usize,
        available: usize,
    },
    #[error("packed dynamic offsets must be whole 4-byte words, got {0} bytes")]
    MisalignedOffsets(usize),
    #[error("buffer offset {offset} lies past the end of a {size}-byte buffer")]
    OffsetBeyondBuffer { offset: u64, size: u64 },
    #[error("slot {slot} is out of range, passes track slots below {max}")]
    SlotOutOfRange { slot: u32, max: u32 },
}

impl StateError {
    /// Host programming errors, as opposed to inconsistent call arguments.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            StateError::UnknownPass(_) | StateError::UnknownDynamicOffsetCount { .. }
        )
    }
}
