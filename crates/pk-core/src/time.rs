//! Simulation time model.
//!
//! # Design
//!
//! Time is a continuous `f64` measured in model units (typically days).  Plans
//! are scheduled at arbitrary times and dispatched in ascending order, so
//! `Time` needs a total order; it uses `f64::total_cmp`, and the scheduler
//! refuses non-finite times so the ordering never has to reason about NaN.

use std::cmp::Ordering;
use std::fmt;

/// An absolute point in simulated time.
#[derive(Copy, Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Time(pub f64);

impl Time {
    pub const ZERO: Time = Time(0.0);

    /// `true` for every time the scheduler accepts (finite values).
    #[inline]
    pub fn is_finite(self) -> bool {
        self.0.is_finite()
    }

    /// The time `dt` units after `self`.
    #[inline]
    pub fn after(self, dt: f64) -> Time {
        Time(self.0 + dt)
    }

    /// Elapsed time from `earlier` to `self`.
    #[inline]
    pub fn since(self, earlier: Time) -> f64 {
        self.0 - earlier.0
    }
}

impl PartialEq for Time {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Time {}

/// Hashes the bit pattern, which is exactly what `total_cmp` equality
/// compares.
impl std::hash::Hash for Time {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl PartialOrd for Time {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Time {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl std::ops::Add<f64> for Time {
    type Output = Time;
    #[inline]
    fn add(self, rhs: f64) -> Time {
        Time(self.0 + rhs)
    }
}

impl From<f64> for Time {
    fn from(t: f64) -> Time {
        Time(t)
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t={}", self.0)
    }
}
