//! Stable leg ordering for deterministic LIFO processing.

use crate::domain::{LegEvent, Timestamp};

/// Ordering key for leg events.
///
/// Ordering: timestamp -> input sequence. Legs sharing a timestamp keep the
/// order in which their trades were supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LegOrderingKey {
    pub timestamp: Timestamp,
    pub seq: usize,
}

impl LegOrderingKey {
    pub fn from_leg(leg: &LegEvent) -> Self {
        LegOrderingKey {
            timestamp: leg.timestamp,
            seq: leg.seq,
        }
    }
}

/// Sort legs by timestamp without perturbing input order on ties.
pub fn sort_legs_stable(legs: &mut [LegEvent]) {
    legs.sort_by_key(LegOrderingKey::from_leg);
}
