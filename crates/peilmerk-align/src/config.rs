//! Configuration builders for median analysis, alignment and overlap shifts.

use std::collections::BTreeMap;

use peilmerk_series::{SeriesCollection, SeriesKey, TzSeries};

use crate::curve::CurveKey;
use crate::error::AlignError;
use crate::mode::AlignmentMode;
use crate::result::{Alignment, MedianAnalysis, TwoLevelAlignment};
use crate::timing::{NoopTimings, TimingSink};

/// Default time tolerance in days.
pub const DEFAULT_TIME_TOLERANCE: f64 = 30.0;

/// Configuration for the median-curve builder.
///
/// # Defaults
///
/// | Parameter        | Default              |
/// |------------------|----------------------|
/// | `time_tolerance` | 30 days              |
/// | `after_date`     | none (no weighting)  |
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisConfig {
    pub(crate) time_tolerance: f64,
    pub(crate) after_date: Option<f64>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            time_tolerance: DEFAULT_TIME_TOLERANCE,
            after_date: None,
        }
    }
}

impl AnalysisConfig {
    /// Create a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the time tolerance in days. It bridges small gaps between series
    /// when detecting segments.
    #[must_use]
    pub fn with_time_tolerance(mut self, time_tolerance: f64) -> Self {
        self.time_tolerance = time_tolerance;
        self
    }

    /// Set the focus date. Intervals starting at or before it weigh a
    /// hundredth of later ones when fitting shifts.
    #[must_use]
    pub fn with_after_date(mut self, after_date: Option<f64>) -> Self {
        self.after_date = after_date;
        self
    }

    /// Return the time tolerance in days.
    #[must_use]
    pub fn time_tolerance(&self) -> f64 {
        self.time_tolerance
    }

    /// Return the focus date, if any.
    #[must_use]
    pub fn after_date(&self) -> Option<f64> {
        self.after_date
    }

    /// Check the settings.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`AlignError::InvalidTimeTolerance`] | Tolerance is negative or not finite |
    /// | [`AlignError::NonFiniteDate`] | `after_date` is NaN or infinite |
    pub fn validate(&self) -> Result<(), AlignError> {
        if !self.time_tolerance.is_finite() || self.time_tolerance < 0.0 {
            return Err(AlignError::InvalidTimeTolerance {
                value: self.time_tolerance,
            });
        }
        check_date(self.after_date)
    }

    /// Build consensus curves, segments and shifts for `collection`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`AlignError::InvalidTimeTolerance`] | See [`validate`](Self::validate) |
    /// | [`AlignError::NonFiniteDate`] | See [`validate`](Self::validate) |
    /// | [`AlignError::EmptySegment`] | A segment ended up without members |
    /// | [`AlignError::UnassignedSeries`] | A series fell outside every segment |
    pub fn analyze(&self, collection: &SeriesCollection) -> Result<MedianAnalysis, AlignError> {
        crate::analyze::analyze(self, collection, &NoopTimings)
    }

    /// Like [`analyze`](Self::analyze), reporting each stage's elapsed time
    /// to `sink`.
    ///
    /// # Errors
    ///
    /// As for [`analyze`](Self::analyze).
    pub fn analyze_with_timings(
        &self,
        collection: &SeriesCollection,
        sink: &dyn TimingSink,
    ) -> Result<MedianAnalysis, AlignError> {
        crate::analyze::analyze(self, collection, sink)
    }
}

/// Configuration for aligning series onto their consensus curve.
///
/// Construct via [`AlignConfig::new`] with the reference date, then chain
/// `with_*` methods to tune the underlying analysis.
///
/// # Defaults
///
/// | Parameter        | Default               |
/// |------------------|-----------------------|
/// | `ref_date`       | 0.0 (1970-01-01)      |
/// | `time_tolerance` | 30 days               |
/// | `after_date`     | none                  |
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AlignConfig {
    pub(crate) ref_date: f64,
    pub(crate) analysis: AnalysisConfig,
}

impl AlignConfig {
    /// Create a configuration that zeroes the consensus at `ref_date`.
    #[must_use]
    pub fn new(ref_date: f64) -> Self {
        Self {
            ref_date,
            analysis: AnalysisConfig::default(),
        }
    }

    /// Replace the analysis settings.
    #[must_use]
    pub fn with_analysis(mut self, analysis: AnalysisConfig) -> Self {
        self.analysis = analysis;
        self
    }

    /// Set the analysis time tolerance in days.
    #[must_use]
    pub fn with_time_tolerance(mut self, time_tolerance: f64) -> Self {
        self.analysis = self.analysis.with_time_tolerance(time_tolerance);
        self
    }

    /// Set the analysis focus date.
    #[must_use]
    pub fn with_after_date(mut self, after_date: Option<f64>) -> Self {
        self.analysis = self.analysis.with_after_date(after_date);
        self
    }

    /// Return the reference date.
    #[must_use]
    pub fn ref_date(&self) -> f64 {
        self.ref_date
    }

    /// Return the analysis settings.
    #[must_use]
    pub fn analysis(&self) -> &AnalysisConfig {
        &self.analysis
    }

    pub(crate) fn validate(&self) -> Result<(), AlignError> {
        check_date(Some(self.ref_date))?;
        self.analysis.validate()
    }

    /// Shift every series and the median by the consensus value at the
    /// reference date.
    ///
    /// # Errors
    ///
    /// [`AlignError::NonFiniteDate`] for a non-finite reference date, plus
    /// the errors of [`AnalysisConfig::analyze`].
    pub fn align_median(&self, collection: &SeriesCollection) -> Result<Alignment, AlignError> {
        self.validate()?;
        crate::align::align_median(self, collection)
    }

    /// Shift every series onto the consensus curve, then zero the consensus
    /// at the reference date.
    ///
    /// # Errors
    ///
    /// As for [`align_median`](Self::align_median).
    pub fn align_all(&self, collection: &SeriesCollection) -> Result<Alignment, AlignError> {
        self.validate()?;
        crate::align::align_all(self, collection)
    }

    /// Align the surveys of each marker, then the markers against each other.
    ///
    /// # Errors
    ///
    /// As for [`align_median`](Self::align_median).
    pub fn align_two_level(
        &self,
        markers: &BTreeMap<SeriesKey, SeriesCollection>,
    ) -> Result<TwoLevelAlignment, AlignError> {
        self.validate()?;
        crate::align::align_two_level(self, markers)
    }

    /// Align only the series in the segment that covers the reference date.
    ///
    /// Returns `Ok(None)` when no segment reaches within the time tolerance
    /// of the reference date.
    ///
    /// # Errors
    ///
    /// As for [`align_median`](Self::align_median).
    pub fn align_segment(
        &self,
        collection: &SeriesCollection,
    ) -> Result<Option<Alignment>, AlignError> {
        self.validate()?;
        crate::align::align_segment(self, collection)
    }

    /// Produce the curves shown for `mode`.
    ///
    /// # Errors
    ///
    /// As for [`align_median`](Self::align_median).
    pub fn apply(
        &self,
        mode: AlignmentMode,
        collection: &SeriesCollection,
    ) -> Result<BTreeMap<CurveKey, TzSeries>, AlignError> {
        self.validate()?;
        crate::align::apply(self, mode, collection)
    }
}

/// Configuration for the two-series overlap shift.
///
/// # Defaults
///
/// | Parameter        | Default |
/// |------------------|---------|
/// | `time_tolerance` | 30 days |
/// | `focus_after`    | none    |
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlapConfig {
    pub(crate) time_tolerance: f64,
    pub(crate) focus_after: Option<f64>,
}

impl Default for OverlapConfig {
    fn default() -> Self {
        Self {
            time_tolerance: DEFAULT_TIME_TOLERANCE,
            focus_after: None,
        }
    }
}

impl OverlapConfig {
    /// Create a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set how far apart in days two non-overlapping series may end and
    /// start while still being compared.
    #[must_use]
    pub fn with_time_tolerance(mut self, time_tolerance: f64) -> Self {
        self.time_tolerance = time_tolerance;
        self
    }

    /// Set the focus date. Sample intervals ending before it barely count.
    #[must_use]
    pub fn with_focus_after(mut self, focus_after: Option<f64>) -> Self {
        self.focus_after = focus_after;
        self
    }

    /// Return the time tolerance in days.
    #[must_use]
    pub fn time_tolerance(&self) -> f64 {
        self.time_tolerance
    }

    /// Return the focus date, if any.
    #[must_use]
    pub fn focus_after(&self) -> Option<f64> {
        self.focus_after
    }

    /// Return the shift to add to `a` so that it matches `b` where they
    /// overlap.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`AlignError::NoOverlap`] | Either series is empty, or they neither overlap nor touch |
    /// | [`AlignError::InvalidTimeTolerance`] | Tolerance is negative or not finite |
    /// | [`AlignError::NonFiniteDate`] | `focus_after` is NaN or infinite |
    pub fn shift(&self, a: &TzSeries, b: &TzSeries) -> Result<f64, AlignError> {
        if !self.time_tolerance.is_finite() || self.time_tolerance < 0.0 {
            return Err(AlignError::InvalidTimeTolerance {
                value: self.time_tolerance,
            });
        }
        check_date(self.focus_after)?;
        crate::overlap::shift(self, a, b)
    }
}

fn check_date(date: Option<f64>) -> Result<(), AlignError> {
    match date {
        Some(value) if !value.is_finite() => Err(AlignError::NonFiniteDate { value }),
        _ => Ok(()),
    }
}
