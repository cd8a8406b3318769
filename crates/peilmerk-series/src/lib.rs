//! Time-height series primitives for survey marker analysis.
//!
//! Pure math library, zero I/O. Provides validated point and series types,
//! bisection-based nearest-point and interpolation lookups, per-series
//! duplicate collapsing, and pooling of several series into one merged
//! curve.

mod error;
mod lookup;
mod merge;
mod point;
mod series;

pub use error::SeriesError;
pub use lookup::{Extrapolation, closest_point, interpolate};
pub use merge::{collapse_duplicates, median, merge_series};
pub use point::Point;
pub use series::{SeriesCollection, SeriesKey, TzSeries};
