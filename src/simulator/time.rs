//! Virtual time for the process simulator.
//!
//! A `VirtualTime` is a finite, non-negative `f64` with a total order so it
//! can key the event heap. It never observes the wall clock; it only moves
//! when the event queue pops an event.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VirtualTime(f64);

impl VirtualTime {
    pub const ZERO: VirtualTime = VirtualTime(0.0);

    /// Build a time point, rejecting NaN, infinities and negative values.
    pub fn new(units: f64) -> SimResult<Self> {
        if units.is_finite() && units >= 0.0 {
            // -0.0 compares equal to 0.0 but sorts below it under total_cmp.
            Ok(VirtualTime(units + 0.0))
        } else {
            Err(SimError::InvalidTime(units))
        }
    }

    #[inline]
    pub fn as_f64(self) -> f64 {
        self.0
    }

    /// The time point `delay` units after `self`.
    pub fn after(self, delay: f64) -> SimResult<Self> {
        if !delay.is_finite() || delay < 0.0 {
            return Err(SimError::InvalidTime(delay));
        }
        VirtualTime::new(self.0 + delay)
    }

    /// Units elapsed from `earlier` to `self`, or `None` if `earlier` is later.
    pub fn duration_since(self, earlier: VirtualTime) -> Option<f64> {
        (self >= earlier).then(|| self.0 - earlier.0)
    }
}

impl Eq for VirtualTime {}

impl PartialOrd for VirtualTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for VirtualTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl fmt::Display for VirtualTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t={:.3}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_invalid_values() {
        assert!(VirtualTime::new(f64::NAN).is_err());
        assert!(VirtualTime::new(f64::INFINITY).is_err());
        assert!(VirtualTime::new(-1.0).is_err());
        assert!(VirtualTime::new(0.0).is_ok());
    }

    #[test]
    fn test_negative_zero_normalized() {
        let t = VirtualTime::new(-0.0).unwrap();
        assert_eq!(t.cmp(&VirtualTime::ZERO), Ordering::Equal);
    }

    #[test]
    fn test_ordering() {
        let a = VirtualTime::new(1.5).unwrap();
        let b = VirtualTime::new(2.0).unwrap();
        assert!(a < b);
        assert_eq!(a.max(b), b);
    }

    #[test]
    fn test_after_and_duration() {
        let t = VirtualTime::new(10.0).unwrap();
        let later = t.after(2.5).unwrap();
        assert_eq!(later.as_f64(), 12.5);
        assert_eq!(later.duration_since(t), Some(2.5));
        assert_eq!(t.duration_since(later), None);
        assert!(t.after(-1.0).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(VirtualTime::new(3.0).unwrap().to_string(), "t=3.000");
    }
}
