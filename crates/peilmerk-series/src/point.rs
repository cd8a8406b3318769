//! A single (time, height) observation.

use std::fmt;

/// One height observation.
///
/// `time` is days since 1970-01-01, `height` is metres (positive = up).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    /// Days since the epoch.
    pub time: f64,
    /// Height in metres.
    pub height: f64,
}

impl Point {
    /// Create a point.
    #[must_use]
    pub const fn new(time: f64, height: f64) -> Self {
        Self { time, height }
    }

    /// Return a copy with `dz` added to the height.
    #[must_use]
    pub fn shifted(self, dz: f64) -> Self {
        Self {
            time: self.time,
            height: self.height + dz,
        }
    }

    pub(crate) fn is_finite(&self) -> bool {
        self.time.is_finite() && self.height.is_finite()
    }
}

impl From<(f64, f64)> for Point {
    fn from((time, height): (f64, f64)) -> Self {
        Self::new(time, height)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.6})", self.time, self.height)
    }
}
