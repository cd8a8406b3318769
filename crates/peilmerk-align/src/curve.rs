//! Keys for curve collections that mix input series with derived curves.

use std::fmt;

use peilmerk_series::SeriesKey;

use crate::segment::SegmentId;

/// Key of a curve in an alignment output.
///
/// Input series and derived reference curves share one collection; the
/// variant tells them apart, so a survey that happens to be called
/// `"median"` never collides with the consensus curve.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CurveKey {
    /// An input series.
    Series(SeriesKey),
    /// The consensus curve over all segments, concatenated.
    Median,
    /// The consensus curve of one segment.
    Segment(SegmentId),
    /// All input points pooled into one curve.
    Merge,
}

impl CurveKey {
    /// Return the series key if this is an input series.
    #[must_use]
    pub fn as_series(&self) -> Option<&SeriesKey> {
        match self {
            Self::Series(key) => Some(key),
            _ => None,
        }
    }

    /// Return true for curves computed from the inputs rather than measured.
    #[must_use]
    pub fn is_derived(&self) -> bool {
        !matches!(self, Self::Series(_))
    }
}

impl From<SeriesKey> for CurveKey {
    fn from(key: SeriesKey) -> Self {
        Self::Series(key)
    }
}

impl fmt::Display for CurveKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Series(key) => write!(f, "{key}"),
            Self::Median => f.write_str("median"),
            Self::Segment(id) => write!(f, "{id}"),
            Self::Merge => f.write_str("merge"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn series_named_median_is_not_the_median() {
        let survey = CurveKey::Series(SeriesKey::new("median"));
        assert_ne!(survey, CurveKey::Median);
        assert!(!survey.is_derived());
        assert!(CurveKey::Median.is_derived());
    }

    #[test]
    fn display_labels() {
        assert_eq!(CurveKey::Median.to_string(), "median");
        assert_eq!(CurveKey::Merge.to_string(), "merge");
        assert_eq!(CurveKey::Segment(SegmentId::new(2)).to_string(), "median_segment_2");
        assert_eq!(CurveKey::from(SeriesKey::new("RWS")).to_string(), "RWS");
    }

    #[test]
    fn as_series_extracts_key() {
        let key = SeriesKey::new("NAP");
        assert_eq!(CurveKey::Series(key.clone()).as_series(), Some(&key));
        assert_eq!(CurveKey::Merge.as_series(), None);
    }
}
