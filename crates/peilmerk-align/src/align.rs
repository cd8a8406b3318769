//! Alignment policies built on the median-curve builder.

use std::collections::BTreeMap;

use peilmerk_series::{
    Extrapolation, SeriesCollection, SeriesKey, TzSeries, interpolate, merge_series,
};
use rayon::prelude::*;
use tracing::{debug, info, instrument};

use crate::config::AlignConfig;
use crate::curve::CurveKey;
use crate::error::AlignError;
use crate::mode::AlignmentMode;
use crate::result::{Alignment, TwoLevelAlignment};

/// Height of `curve` at `t`, held constant beyond its ends. Zero for an
/// empty curve.
fn reference_value(curve: &TzSeries, t: f64) -> Result<f64, AlignError> {
    if curve.is_empty() {
        return Ok(0.0);
    }
    Ok(interpolate(curve.points(), t, Extrapolation::Clamp)?)
}

fn unshifted(collection: &SeriesCollection) -> Alignment {
    Alignment {
        curves: collection
            .iter()
            .map(|(key, s)| (CurveKey::Series(key.clone()), s.clone()))
            .collect(),
        applied_shifts: collection.keys().map(|key| (key.clone(), 0.0)).collect(),
        reference_offset: 0.0,
    }
}

#[instrument(skip_all, fields(n_series = collection.len(), ref_date = config.ref_date))]
pub(crate) fn align_median(
    config: &AlignConfig,
    collection: &SeriesCollection,
) -> Result<Alignment, AlignError> {
    let analysis = config.analysis.analyze(collection)?;
    let median = analysis.median();
    let d = reference_value(&median, config.ref_date)?;

    let mut alignment = unshifted(collection);
    alignment.curves.insert(CurveKey::Median, median);
    alignment.shift_all(-d);
    alignment.reference_offset = d;
    debug!(reference_offset = d, "median aligned");
    Ok(alignment)
}

#[instrument(skip_all, fields(n_series = collection.len(), ref_date = config.ref_date))]
pub(crate) fn align_all(
    config: &AlignConfig,
    collection: &SeriesCollection,
) -> Result<Alignment, AlignError> {
    let analysis = config.analysis.analyze(collection)?;
    let median = analysis.median();
    let d = reference_value(&median, config.ref_date)?;

    let mut alignment = Alignment::default();
    for (key, series) in collection {
        let dz = analysis.shifts.get(key).copied().unwrap_or(0.0);
        alignment
            .curves
            .insert(CurveKey::Series(key.clone()), series.shifted(dz));
        alignment.applied_shifts.insert(key.clone(), dz);
    }
    alignment.curves.insert(CurveKey::Median, median);
    alignment.shift_all(-d);
    alignment.reference_offset = d;
    debug!(reference_offset = d, "all series aligned");
    Ok(alignment)
}

#[instrument(skip_all, fields(n_markers = markers.len(), ref_date = config.ref_date))]
pub(crate) fn align_two_level(
    config: &AlignConfig,
    markers: &BTreeMap<SeriesKey, SeriesCollection>,
) -> Result<TwoLevelAlignment, AlignError> {
    let mut aligned: BTreeMap<SeriesKey, Alignment> = markers
        .par_iter()
        .map(|(marker, surveys)| Ok((marker.clone(), align_all(config, surveys)?)))
        .collect::<Result<_, AlignError>>()?;

    let medians: SeriesCollection = aligned
        .iter()
        .filter_map(|(marker, alignment)| {
            let median = alignment.median().filter(|m| !m.is_empty())?;
            Some((marker.clone(), median.clone()))
        })
        .collect();
    debug!(
        n_markers = aligned.len(),
        n_with_data = medians.len(),
        "first level complete"
    );

    let analysis = config.analysis.analyze(&medians)?;
    for (marker, &dz) in &analysis.shifts {
        if let Some(alignment) = aligned.get_mut(marker) {
            alignment.shift_all(dz);
        }
    }

    let grand_median = analysis.median();
    let d = reference_value(&grand_median, config.ref_date)?;
    for alignment in aligned.values_mut() {
        alignment.shift_all(-d);
    }

    info!(
        n_markers = aligned.len(),
        n_segments = analysis.segments.len(),
        reference_offset = d,
        "two-level alignment complete"
    );
    Ok(TwoLevelAlignment {
        markers: aligned,
        grand_median: grand_median.shifted(-d),
        marker_shifts: analysis.shifts,
        reference_offset: d,
    })
}

#[instrument(skip_all, fields(n_series = collection.len(), ref_date = config.ref_date))]
pub(crate) fn align_segment(
    config: &AlignConfig,
    collection: &SeriesCollection,
) -> Result<Option<Alignment>, AlignError> {
    let analysis = config.analysis.analyze(collection)?;
    let (ref_date, tol) = (config.ref_date, config.analysis.time_tolerance);

    let Some(segment) = analysis
        .segments
        .iter()
        .find(|s| s.start() <= ref_date + tol && s.end() >= ref_date - tol)
    else {
        info!("no segment near the reference date");
        return Ok(None);
    };
    let d = reference_value(&segment.curve, ref_date)?;

    let mut alignment = Alignment::default();
    for key in analysis.members(segment.id) {
        let (Some(series), Some(&dz)) = (collection.get(key), analysis.shifts.get(key)) else {
            continue;
        };
        alignment
            .curves
            .insert(CurveKey::Series(key.clone()), series.shifted(dz));
        alignment.applied_shifts.insert(key.clone(), dz);
    }
    alignment
        .curves
        .insert(CurveKey::Segment(segment.id), segment.curve.clone());
    alignment.shift_all(-d);
    alignment.reference_offset = d;
    debug!(segment = %segment.id, n_members = alignment.applied_shifts.len(), "segment aligned");
    Ok(Some(alignment))
}

pub(crate) fn apply(
    config: &AlignConfig,
    mode: AlignmentMode,
    collection: &SeriesCollection,
) -> Result<BTreeMap<CurveKey, TzSeries>, AlignError> {
    let curves = match mode {
        AlignmentMode::Raw => unshifted(collection).curves,
        AlignmentMode::AddMedian => {
            let mut curves = unshifted(collection).curves;
            curves.extend(config.analysis.analyze(collection)?.curves());
            curves
        }
        AlignmentMode::AddMerge => {
            let mut curves = unshifted(collection).curves;
            let merged = merge_series(collection.values(), config.analysis.time_tolerance);
            curves.insert(CurveKey::Merge, merged);
            curves
        }
        AlignmentMode::AlignMedian => align_median(config, collection)?.curves,
        AlignmentMode::AlignAll => align_all(config, collection)?.curves,
        AlignmentMode::AlignSegment => align_segment(config, collection)?
            .map(|alignment| alignment.curves)
            .unwrap_or_default(),
    };
    Ok(curves)
}
