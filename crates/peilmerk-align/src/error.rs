use peilmerk_series::SeriesError;

use crate::segment::SegmentId;

/// Errors from median-curve analysis and alignment.
#[derive(Debug, thiserror::Error)]
pub enum AlignError {
    /// Returned when two series neither overlap in time nor touch within the
    /// time tolerance, or when either of them is empty.
    #[error("series share no temporal overlap")]
    NoOverlap,

    /// Returned when a detected segment ends up without member series.
    ///
    /// This cannot happen for sorted input and indicates a bug in segment
    /// detection.
    #[error("segment {segment} has no member series")]
    EmptySegment {
        /// The memberless segment.
        segment: SegmentId,
    },

    /// Returned when a series' first time falls in no detected segment.
    ///
    /// Like [`AlignError::EmptySegment`] this indicates a bug rather than bad
    /// input.
    #[error("series {key} lies outside every detected segment")]
    UnassignedSeries {
        /// Key of the orphaned series.
        key: String,
    },

    /// Returned when the time tolerance is negative, NaN, or infinite.
    #[error("time tolerance must be finite and non-negative, got {value}")]
    InvalidTimeTolerance {
        /// The rejected tolerance in days.
        value: f64,
    },

    /// Returned when a reference or focus date is NaN or infinite.
    #[error("date must be finite, got {value}")]
    NonFiniteDate {
        /// The rejected date in days since the epoch.
        value: f64,
    },

    /// Returned when an alignment mode name is not recognised.
    #[error("unknown alignment mode \"{name}\" (expected raw, add-median, add-merge, median, all, or segment)")]
    UnknownMode {
        /// The unrecognised name.
        name: String,
    },

    /// Wraps a series lookup error.
    #[error("series error: {0}")]
    Series(#[from] SeriesError),
}
