//! Media timeline types.
//!
//! Positions on the media timeline are absolute seconds from the start of the
//! media ([`MediaPoint`]); offsets and lengths are signed seconds
//! ([`MediaDuration`]). Both wrap an `f64` because decode sources report
//! presentation times as `pts * time_base`, which is rarely an exact integer
//! number of ticks, and because offsets (seek deltas, audio drift) can be
//! negative, which `std::time::Duration` cannot express.

use std::fmt;
use std::ops::{Add, AddAssign, Div, Neg, Sub, SubAssign};
use std::time::{Duration, Instant};

/// An absolute position on the media timeline, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct MediaPoint(f64);

impl MediaPoint {
    /// The start of the media timeline.
    pub const ZERO: MediaPoint = MediaPoint(0.0);

    /// Creates a point from seconds since the start of the media.
    pub const fn from_secs(secs: f64) -> Self {
        Self(secs)
    }

    /// Returns the point as seconds since the start of the media.
    pub const fn as_secs(self) -> f64 {
        self.0
    }

    /// Returns the earlier of two points.
    pub fn min(self, other: MediaPoint) -> MediaPoint {
        if other.0 < self.0 {
            other
        } else {
            self
        }
    }
}

impl fmt::Display for MediaPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", self.0)
    }
}

/// A signed offset or length on the media timeline, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct MediaDuration(f64);

impl MediaDuration {
    pub const ZERO: MediaDuration = MediaDuration(0.0);

    /// Creates a duration from (possibly negative) seconds.
    pub const fn from_secs(secs: f64) -> Self {
        Self(secs)
    }

    /// Creates a duration from milliseconds.
    pub fn from_millis(millis: i64) -> Self {
        Self(millis as f64 / 1000.0)
    }

    /// Returns the duration in seconds.
    pub const fn as_secs(self) -> f64 {
        self.0
    }

    /// Wall-clock time elapsed from `earlier` to `later`.
    ///
    /// Negative if `later` is actually before `earlier`.
    pub fn between(earlier: Instant, later: Instant) -> Self {
        match later.checked_duration_since(earlier) {
            Some(elapsed) => Self(elapsed.as_secs_f64()),
            None => Self(-earlier.duration_since(later).as_secs_f64()),
        }
    }

    /// Converts to a `std::time::Duration` suitable for sleeping.
    ///
    /// Negative and NaN values clamp to zero; values too large for a
    /// `Duration` saturate at `Duration::MAX`.
    pub fn to_std(self) -> Duration {
        if self.0 > 0.0 {
            Duration::try_from_secs_f64(self.0).unwrap_or(Duration::MAX)
        } else {
            Duration::ZERO
        }
    }
}

impl From<Duration> for MediaDuration {
    fn from(duration: Duration) -> Self {
        Self(duration.as_secs_f64())
    }
}

impl fmt::Display for MediaDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:+.3}s", self.0)
    }
}

impl Add<MediaDuration> for MediaPoint {
    type Output = MediaPoint;

    fn add(self, rhs: MediaDuration) -> MediaPoint {
        MediaPoint(self.0 + rhs.0)
    }
}

impl Sub<MediaDuration> for MediaPoint {
    type Output = MediaPoint;

    fn sub(self, rhs: MediaDuration) -> MediaPoint {
        MediaPoint(self.0 - rhs.0)
    }
}

impl Sub<MediaPoint> for MediaPoint {
    type Output = MediaDuration;

    fn sub(self, rhs: MediaPoint) -> MediaDuration {
        MediaDuration(self.0 - rhs.0)
    }
}

impl Add for MediaDuration {
    type Output = MediaDuration;

    fn add(self, rhs: MediaDuration) -> MediaDuration {
        MediaDuration(self.0 + rhs.0)
    }
}

impl Sub for MediaDuration {
    type Output = MediaDuration;

    fn sub(self, rhs: MediaDuration) -> MediaDuration {
        MediaDuration(self.0 - rhs.0)
    }
}

impl AddAssign for MediaDuration {
    fn add_assign(&mut self, rhs: MediaDuration) {
        self.0 += rhs.0;
    }
}

impl SubAssign for MediaDuration {
    fn sub_assign(&mut self, rhs: MediaDuration) {
        self.0 -= rhs.0;
    }
}

impl Neg for MediaDuration {
    type Output = MediaDuration;

    fn neg(self) -> MediaDuration {
        MediaDuration(-self.0)
    }
}

impl Div<u32> for MediaDuration {
    type Output = MediaDuration;

    fn div(self, rhs: u32) -> MediaDuration {
        MediaDuration(self.0 / f64::from(rhs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_duration_arithmetic() {
        let p = MediaPoint::from_secs(10.0);
        let d = MediaDuration::from_secs(2.5);

        assert_eq!(p + d, MediaPoint::from_secs(12.5));
        assert_eq!(p - d, MediaPoint::from_secs(7.5));
        assert_eq!(MediaPoint::from_secs(3.0) - p, MediaDuration::from_secs(-7.0));
        assert_eq!(-d, MediaDuration::from_secs(-2.5));
        assert_eq!(MediaDuration::from_secs(1.0) / 4, MediaDuration::from_secs(0.25));
    }

    #[test]
    fn test_between_is_signed() {
        let earlier = Instant::now();
        let later = earlier + Duration::from_millis(250);

        assert!((MediaDuration::between(earlier, later).as_secs() - 0.25).abs() < 1e-9);
        assert!((MediaDuration::between(later, earlier).as_secs() + 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_to_std_clamps_negative() {
        assert_eq!(MediaDuration::from_secs(-1.0).to_std(), Duration::ZERO);
        assert_eq!(MediaDuration::from_secs(f64::NAN).to_std(), Duration::ZERO);
        assert_eq!(MediaDuration::from_millis(20).to_std(), Duration::from_millis(20));
    }

    #[test]
    fn test_to_std_saturates_huge_values() {
        assert_eq!(MediaDuration::from_secs(1e20).to_std(), Duration::MAX);
        assert_eq!(MediaDuration::from_secs(f64::INFINITY).to_std(), Duration::MAX);
    }

    #[test]
    fn test_point_min() {
        let a = MediaPoint::from_secs(1.0);
        let b = MediaPoint::from_secs(2.0);
        assert_eq!(a.min(b), a);
        assert_eq!(b.min(a), a);
    }
}
