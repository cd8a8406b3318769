//! Result types for median-curve analysis and alignment.

use std::collections::BTreeMap;

use peilmerk_series::{SeriesCollection, SeriesKey, TzSeries};

use crate::curve::CurveKey;
use crate::segment::SegmentId;

/// Consensus curve of one segment.
#[derive(Debug, Clone, PartialEq)]
pub struct MedianSegment {
    /// Position of the segment in time order.
    pub id: SegmentId,
    /// The consensus curve, centred on the weighted mean of its members.
    pub curve: TzSeries,
}

impl MedianSegment {
    /// First time covered by the segment.
    #[must_use]
    pub fn start(&self) -> f64 {
        self.curve.first().map_or(f64::NAN, |p| p.time)
    }

    /// Last time covered by the segment.
    #[must_use]
    pub fn end(&self) -> f64 {
        self.curve.last().map_or(f64::NAN, |p| p.time)
    }

    /// Return true if `t` lies within `[start, end]`.
    #[must_use]
    pub fn contains(&self, t: f64) -> bool {
        self.start() <= t && t <= self.end()
    }
}

/// Output of the median-curve builder.
#[derive(Debug, Clone, Default)]
pub struct MedianAnalysis {
    /// One consensus curve per detected segment, in time order.
    pub segments: Vec<MedianSegment>,
    /// Segment membership of every analysed series.
    pub assignments: BTreeMap<SeriesKey, SegmentId>,
    /// Shift that brings each series onto its segment's consensus curve.
    pub shifts: BTreeMap<SeriesKey, f64>,
}

impl MedianAnalysis {
    /// Return true if no series was analysed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// All segment curves concatenated in time order.
    ///
    /// Heights jump at segment boundaries: segments are not vertically tied
    /// to one another.
    #[must_use]
    pub fn median(&self) -> TzSeries {
        TzSeries::concat(self.segments.iter().map(|s| &s.curve))
    }

    /// Look up a segment by id.
    #[must_use]
    pub fn segment(&self, id: SegmentId) -> Option<&MedianSegment> {
        self.segments.get(id.index())
    }

    /// Keys of the series assigned to `id`.
    #[must_use]
    pub fn members(&self, id: SegmentId) -> Vec<&SeriesKey> {
        self.assignments
            .iter()
            .filter_map(|(key, &seg)| (seg == id).then_some(key))
            .collect()
    }

    /// Number of series assigned to each segment.
    #[must_use]
    pub fn segment_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0usize; self.segments.len()];
        for id in self.assignments.values() {
            sizes[id.index()] += 1;
        }
        sizes
    }

    /// The derived curves as a curve collection: the concatenated median
    /// plus one entry per segment.
    #[must_use]
    pub fn curves(&self) -> BTreeMap<CurveKey, TzSeries> {
        let mut curves = BTreeMap::new();
        curves.insert(CurveKey::Median, self.median());
        for segment in &self.segments {
            curves.insert(CurveKey::Segment(segment.id), segment.curve.clone());
        }
        curves
    }
}

/// Output of an alignment policy.
#[derive(Debug, Clone, Default)]
pub struct Alignment {
    /// Shifted input series and shifted derived curves.
    pub curves: BTreeMap<CurveKey, TzSeries>,
    /// Total shift added to each input series.
    pub applied_shifts: BTreeMap<SeriesKey, f64>,
    /// Consensus height at the reference date, subtracted from every curve.
    pub reference_offset: f64,
}

impl Alignment {
    /// Shifted series for `key`.
    #[must_use]
    pub fn series(&self, key: &SeriesKey) -> Option<&TzSeries> {
        self.curves.get(&CurveKey::Series(key.clone()))
    }

    /// The shifted consensus curve, if the policy produces one.
    #[must_use]
    pub fn median(&self) -> Option<&TzSeries> {
        self.curves.get(&CurveKey::Median)
    }

    /// Undo the applied shifts, recovering the input series.
    #[must_use]
    pub fn restore(&self) -> SeriesCollection {
        self.curves
            .iter()
            .filter_map(|(key, series)| {
                let key = key.as_series()?;
                let dz = self.applied_shifts.get(key).copied().unwrap_or(0.0);
                Some((key.clone(), series.shifted(-dz)))
            })
            .collect()
    }

    /// Add `dz` to every curve and record it against every series.
    pub(crate) fn shift_all(&mut self, dz: f64) {
        for series in self.curves.values_mut() {
            *series = series.shifted(dz);
        }
        for shift in self.applied_shifts.values_mut() {
            *shift += dz;
        }
    }
}

/// Output of two-level (marker, then survey) alignment.
#[derive(Debug, Clone, Default)]
pub struct TwoLevelAlignment {
    /// Per-marker alignment, including the marker- and area-level shifts.
    pub markers: BTreeMap<SeriesKey, Alignment>,
    /// Consensus of the per-marker medians, zero at the reference date.
    pub grand_median: TzSeries,
    /// Shift that brings each marker's median onto the grand median.
    pub marker_shifts: BTreeMap<SeriesKey, f64>,
    /// Grand-median height at the reference date, subtracted from everything.
    pub reference_offset: f64,
}
