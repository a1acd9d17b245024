use core::fmt;
use uuid::Uuid;

/// The composite key that identifies one independent counter.
///
/// Two scopes that differ in any field, including only the `emergency` flag,
/// address different counters.
///
/// # Example
/// ```
/// use tally::SequenceScope;
/// use uuid::Uuid;
///
/// let regular = SequenceScope::new(Uuid::from_u128(1), Uuid::from_u128(2), 2024, false);
/// let emergency = regular.with_emergency(true);
///
/// assert_ne!(regular, emergency);
/// assert_eq!(
///     emergency.to_string(),
///     "00000000-0000-0000-0000-000000000001/00000000-0000-0000-0000-000000000002/2024/emergency"
/// );
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SequenceScope {
    /// Opaque facility identifier.
    pub facility_id: Uuid,
    /// Opaque program identifier.
    pub program_id: Uuid,
    /// Numbering year.
    pub year: i32,
    /// Whether the sequence numbers emergency documents.
    pub emergency: bool,
}

impl SequenceScope {
    pub const fn new(facility_id: Uuid, program_id: Uuid, year: i32, emergency: bool) -> Self {
        Self {
            facility_id,
            program_id,
            year,
            emergency,
        }
    }

    /// Returns the same scope with the emergency flag replaced.
    #[must_use]
    pub const fn with_emergency(self, emergency: bool) -> Self {
        Self { emergency, ..self }
    }
}

impl fmt::Display for SequenceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.emergency { "emergency" } else { "regular" };
        write!(
            f,
            "{}/{}/{}/{}",
            self.facility_id, self.program_id, self.year, kind
        )
    }
}
