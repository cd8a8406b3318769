//! Error types for series construction and point lookup.

/// Errors from series validation and lookup.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SeriesError {
    /// Returned when a lookup is performed on an empty sequence.
    #[error("series must be non-empty")]
    EmptySeries,

    /// Returned when a point has a NaN or infinite time or height.
    #[error("series contains non-finite value at index {index}")]
    NonFiniteValue {
        /// Position of the first offending point.
        index: usize,
    },

    /// Returned when point times decrease.
    #[error("series times decrease at index {index}")]
    UnsortedTimes {
        /// Position of the first point whose time is below its predecessor's.
        index: usize,
    },
}
