//! Simulated time model.
//!
//! # Design
//!
//! The engine runs on continuous simulated seconds: travel times are edge
//! lengths divided by bot speeds, reservations are real intervals, and the
//! planner's look-ahead window is a duration in seconds.  `SimTime` wraps the
//! `f64` second count and gives it a **total order** via [`f64::total_cmp`]
//! so times can live in sorted collections and binary heaps.
//!
//! Durations stay plain `f64` seconds; only absolute instants are wrapped.
//! Open-ended reservations use [`SimTime::INFINITY`].

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Sub};

/// An absolute instant on the simulation clock, in seconds.
///
/// NaN is not a meaningful instant; `total_cmp` keeps the order total anyway
/// so a NaN produced by a buggy estimate sorts deterministically instead of
/// poisoning comparisons.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimTime(pub f64);

impl SimTime {
    pub const ZERO: SimTime = SimTime(0.0);

    /// The open end of a half-infinite reservation interval.
    pub const INFINITY: SimTime = SimTime(f64::INFINITY);

    #[inline]
    pub fn is_finite(self) -> bool {
        self.0.is_finite()
    }

    /// Seconds elapsed from `earlier` to `self` (negative if `earlier` is later).
    #[inline]
    pub fn since(self, earlier: SimTime) -> f64 {
        self.0 - earlier.0
    }

    #[inline]
    pub fn min(self, other: SimTime) -> SimTime {
        if self <= other { self } else { other }
    }

    #[inline]
    pub fn max(self, other: SimTime) -> SimTime {
        if self >= other { self } else { other }
    }
}

impl Eq for SimTime {}

impl Ord for SimTime {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl PartialOrd for SimTime {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Add<f64> for SimTime {
    type Output = SimTime;
    #[inline]
    fn add(self, secs: f64) -> SimTime {
        SimTime(self.0 + secs)
    }
}

impl AddAssign<f64> for SimTime {
    #[inline]
    fn add_assign(&mut self, secs: f64) {
        self.0 += secs;
    }
}

impl Sub for SimTime {
    type Output = f64;
    #[inline]
    fn sub(self, rhs: SimTime) -> f64 {
        self.0 - rhs.0
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_finite() {
            write!(f, "{:.3}s", self.0)
        } else {
            write!(f, "∞")
        }
    }
}
