//! Median-curve construction and vertical alignment of height series.
//!
//! Builds a consensus curve from many offset survey series, detects
//! segments with no continuous coverage, computes the shift that places each
//! series on the consensus, and aligns whole collections (or collections of
//! markers) onto a reference date.

mod align;
mod analyze;
mod config;
mod curve;
mod error;
mod mode;
mod overlap;
mod result;
mod segment;
mod timing;

pub use config::{AlignConfig, AnalysisConfig, DEFAULT_TIME_TOLERANCE, OverlapConfig};
pub use curve::CurveKey;
pub use error::AlignError;
pub use mode::AlignmentMode;
pub use result::{Alignment, MedianAnalysis, MedianSegment, TwoLevelAlignment};
pub use segment::SegmentId;
pub use timing::{NoopTimings, Stage, StageTimings, TimingSink};
