use crate::scope::SequenceScope;

/// The persisted state of one scope's sequence.
///
/// `current_value` is the last number handed out. It is signed because an
/// unbounded revert may leave it at zero or below.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SequenceCounter {
    pub scope: SequenceScope,
    pub current_value: i64,
}

impl SequenceCounter {
    /// The value of a counter created by its first allocation.
    pub const FIRST: i64 = 1;

    pub const fn new(scope: SequenceScope, current_value: i64) -> Self {
        Self {
            scope,
            current_value,
        }
    }

    /// A counter as it exists right after its first allocation.
    pub const fn first(scope: SequenceScope) -> Self {
        Self::new(scope, Self::FIRST)
    }

    /// The counter advanced by one, or `None` on overflow.
    #[must_use]
    pub fn incremented(self) -> Option<Self> {
        self.current_value
            .checked_add(1)
            .map(|current_value| Self { current_value, ..self })
    }

    /// The counter moved back by one, or `None` on underflow.
    #[must_use]
    pub fn decremented(self) -> Option<Self> {
        self.current_value
            .checked_sub(1)
            .map(|current_value| Self { current_value, ..self })
    }
}
