//! Height series types with validation guarantees.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Index;

use crate::error::SeriesError;
use crate::point::Point;

/// Identifier of one series within a collection (a survey name, or a marker
/// name when marker medians are aligned against each other).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SeriesKey(String);

impl SeriesKey {
    /// Create a key from any string-like value.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Return the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SeriesKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for SeriesKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// Mapping from series key to series. Key order carries no meaning.
pub type SeriesCollection = BTreeMap<SeriesKey, TzSeries>;

/// Owned, validated height series.
///
/// All times and heights are finite and times never decrease. Repeated
/// times are allowed; [`collapse_duplicates`](crate::collapse_duplicates)
/// folds them. A series may be empty.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TzSeries(Vec<Point>);

impl TzSeries {
    /// Create a series from points already in time order.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`SeriesError::NonFiniteValue`] | A time or height is NaN or infinite |
    /// | [`SeriesError::UnsortedTimes`] | A time is below its predecessor |
    pub fn new(points: Vec<Point>) -> Result<Self, SeriesError> {
        validate_finite(&points)?;
        if let Some(index) = points
            .windows(2)
            .position(|w| w[1].time < w[0].time)
            .map(|i| i + 1)
        {
            return Err(SeriesError::UnsortedTimes { index });
        }
        Ok(Self(points))
    }

    /// Create a series from points in any order. Points are stably sorted by
    /// time, so repeated times keep their input order.
    ///
    /// # Errors
    ///
    /// Returns [`SeriesError::NonFiniteValue`] if a time or height is NaN or
    /// infinite.
    pub fn from_unsorted(mut points: Vec<Point>) -> Result<Self, SeriesError> {
        validate_finite(&points)?;
        points.sort_by(|a, b| a.time.total_cmp(&b.time));
        Ok(Self(points))
    }

    /// Build from points known to be finite and sorted.
    pub(crate) fn new_unchecked(points: Vec<Point>) -> Self {
        debug_assert!(points.windows(2).all(|w| w[0].time <= w[1].time));
        Self(points)
    }

    /// Borrow the points.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.0
    }

    /// Return the number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Return true if the series has no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First point, if any.
    #[must_use]
    pub fn first(&self) -> Option<Point> {
        self.0.first().copied()
    }

    /// Last point, if any.
    #[must_use]
    pub fn last(&self) -> Option<Point> {
        self.0.last().copied()
    }

    /// Time span `(first, last)`, or `None` for an empty series.
    #[must_use]
    pub fn time_range(&self) -> Option<(f64, f64)> {
        Some((self.first()?.time, self.last()?.time))
    }

    /// Return a new series with `dz` added to every height.
    #[must_use]
    pub fn shifted(&self, dz: f64) -> Self {
        Self(self.0.iter().map(|p| p.shifted(dz)).collect())
    }

    /// Join series end to end in time order.
    ///
    /// Parts that already follow one another are kept as they are;
    /// otherwise the points are stably sorted by time.
    #[must_use]
    pub fn concat<'a, I>(parts: I) -> Self
    where
        I: IntoIterator<Item = &'a TzSeries>,
    {
        let mut points: Vec<Point> = parts
            .into_iter()
            .flat_map(|s| s.0.iter().copied())
            .collect();
        if points.windows(2).any(|w| w[1].time < w[0].time) {
            points.sort_by(|a, b| a.time.total_cmp(&b.time));
        }
        Self::new_unchecked(points)
    }

    /// Consume and return the inner vector.
    #[must_use]
    pub fn into_inner(self) -> Vec<Point> {
        self.0
    }
}

impl Index<usize> for TzSeries {
    type Output = Point;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl AsRef<[Point]> for TzSeries {
    fn as_ref(&self) -> &[Point] {
        &self.0
    }
}

impl TryFrom<Vec<Point>> for TzSeries {
    type Error = SeriesError;

    fn try_from(points: Vec<Point>) -> Result<Self, Self::Error> {
        Self::new(points)
    }
}

impl TryFrom<Vec<(f64, f64)>> for TzSeries {
    type Error = SeriesError;

    fn try_from(pairs: Vec<(f64, f64)>) -> Result<Self, Self::Error> {
        Self::new(pairs.into_iter().map(Point::from).collect())
    }
}

fn validate_finite(points: &[Point]) -> Result<(), SeriesError> {
    match points.iter().position(|p| !p.is_finite()) {
        Some(index) => Err(SeriesError::NonFiniteValue { index }),
        None => Ok(()),
    }
}
