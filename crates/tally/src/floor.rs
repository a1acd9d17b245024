/// How far a revert may move a counter down.
///
/// Reverts have no natural lower bound: a caller may undo more allocations
/// than were made. The floor makes the policy explicit.
///
/// # Example
/// ```
/// use tally::RevertFloor;
///
/// assert!(RevertFloor::Unbounded.permits(i64::MIN + 1));
/// assert!(RevertFloor::AtLeast(1).permits(2));
/// assert!(!RevertFloor::AtLeast(1).permits(1));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RevertFloor {
    /// Always decrement, even to zero or below.
    #[default]
    Unbounded,
    /// Refuse a revert that would leave the counter below this value.
    AtLeast(i64),
}

impl RevertFloor {
    /// Builds a floor from an optional lower bound.
    pub const fn from_bound(bound: Option<i64>) -> Self {
        match bound {
            Some(floor) => Self::AtLeast(floor),
            None => Self::Unbounded,
        }
    }

    /// The lower bound, if any.
    pub const fn bound(self) -> Option<i64> {
        match self {
            Self::Unbounded => None,
            Self::AtLeast(floor) => Some(floor),
        }
    }

    /// Whether a counter at `current` may be decremented once.
    pub fn permits(self, current: i64) -> bool {
        match self {
            Self::Unbounded => true,
            Self::AtLeast(floor) => current.checked_sub(1).is_some_and(|next| next >= floor),
        }
    }
}
