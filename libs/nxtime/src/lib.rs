//! Temporal quantification for the kernel.
//!
//! The kernel clock ticks in milliseconds since boot, so `Instant` is a
//! plain millisecond counter. It is monotone and opaque; only differences
//! between two instants are meaningful.

#![cfg_attr(not(test), no_std)]

use core::convert::TryFrom;
use core::fmt;
use core::ops::{Add, AddAssign, Sub};

pub use core::time::Duration;

use serde::{Deserialize, Serialize};

/// A measurement of the monotonically nondecreasing boot clock.
///
/// Instants are always guaranteed to be no less than any previously
/// measured instant. They make no attempt to track wall-clock time.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Instant(u64);

impl Instant {
    /// Moment the clock started, i.e. boot
    pub const ZERO: Instant = Instant(0);

    /// Used by the system clock as a constructor
    pub const fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Returns `None` on overflow
    pub fn checked_add(self, duration: Duration) -> Option<Instant> {
        let ms = u64::try_from(duration.as_millis()).ok()?;
        self.0.checked_add(ms).map(Instant)
    }

    /// Panics if `earlier` is later than `self`
    pub fn duration_since(self, earlier: Instant) -> Duration {
        self.checked_duration_since(earlier)
            .expect("specified instant was later than self")
    }

    pub fn checked_duration_since(self, earlier: Instant) -> Option<Duration> {
        self.0.checked_sub(earlier.0).map(Duration::from_millis)
    }
}

impl Add<Duration> for Instant {
    type Output = Instant;

    fn add(self, other: Duration) -> Instant {
        self.checked_add(other)
            .expect("overflow when adding duration to instant")
    }
}

impl AddAssign<Duration> for Instant {
    fn add_assign(&mut self, other: Duration) {
        *self = *self + other;
    }
}

impl Sub<Instant> for Instant {
    type Output = Duration;

    fn sub(self, other: Instant) -> Duration {
        self.duration_since(other)
    }
}

impl fmt::Display for Instant {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_arithmetic() {
        let t0 = Instant::from_millis(1_000);
        let t1 = t0 + Duration::from_millis(234);
        assert_eq!(t1.as_millis(), 1_234);
        assert_eq!(t1 - t0, Duration::from_millis(234));
        assert_eq!(t0.checked_duration_since(t1), None);
    }

    #[test]
    fn test_subsecond_truncation() {
        // Sub-millisecond parts are discarded, never rounded up
        let t0 = Instant::from_millis(10);
        assert_eq!(t0 + Duration::from_micros(2_999), Instant::from_millis(12));
    }

    #[test]
    fn test_overflow() {
        assert_eq!(Instant::from_millis(u64::MAX).checked_add(Duration::from_millis(1)), None);
    }
}
