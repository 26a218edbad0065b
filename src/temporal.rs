//! Logical time for valuations and the validity windows of compiled functions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A logical valuation instant, in milliseconds since the epoch.
///
/// This is the "snapshot time" a cycle evaluates at; it has nothing to do with
/// wall-clock measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Instant(pub i64);

impl Instant {
    pub fn from_millis(millis: i64) -> Self { Self(millis) }
    pub fn millis(&self) -> i64 { self.0 }
}

impl fmt::Display for Instant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// Inclusive window during which a compiled function may be invoked.
///
/// `None` on either side means unbounded in that direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ValidityWindow {
    pub earliest: Option<Instant>,
    pub latest: Option<Instant>,
}

impl ValidityWindow {
    pub const UNBOUNDED: ValidityWindow = ValidityWindow { earliest: None, latest: None };

    pub fn new(earliest: Option<Instant>, latest: Option<Instant>) -> Self {
        Self { earliest, latest }
    }

    pub fn between(earliest: Instant, latest: Instant) -> Self {
        Self { earliest: Some(earliest), latest: Some(latest) }
    }

    pub fn starting_at(earliest: Instant) -> Self {
        Self { earliest: Some(earliest), latest: None }
    }

    pub fn ending_at(latest: Instant) -> Self {
        Self { earliest: None, latest: Some(latest) }
    }

    #[inline]
    pub fn covers(&self, instant: Instant) -> bool {
        self.earliest.map_or(true, |e| e <= instant) && self.latest.map_or(true, |l| instant <= l)
    }

    /// True when no later instant can fall outside the window.
    pub fn is_unbounded_forward(&self) -> bool { self.latest.is_none() }

    /// True when no earlier instant can fall outside the window.
    pub fn is_unbounded_backward(&self) -> bool { self.earliest.is_none() }

    /// True when no instant can satisfy both bounds.
    pub fn is_empty(&self) -> bool {
        matches!((self.earliest, self.latest), (Some(e), Some(l)) if e > l)
    }

    /// Narrows the window to the part shared with `other`.
    ///
    /// The result may be empty (earliest > latest); `covers` is then false everywhere.
    pub fn intersect(&self, other: &ValidityWindow) -> ValidityWindow {
        let earliest = match (self.earliest, other.earliest) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        let latest = match (self.latest, other.latest) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        ValidityWindow { earliest, latest }
    }
}

impl fmt::Display for ValidityWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fmt_bound = |b: Option<Instant>| b.map_or_else(|| "*".to_string(), |i| i.0.to_string());
        write!(f, "[{}, {}]", fmt_bound(self.earliest), fmt_bound(self.latest))
    }
}
