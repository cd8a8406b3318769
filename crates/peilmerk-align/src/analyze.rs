//! Median-curve builder: consensus curves, segment detection and per-series
//! shifts.
//!
//! The builder walks the union of all sample times. Over every interval it
//! takes the median of the slopes of the series that cover the interval and
//! integrates it into the running consensus curve. An interval nobody covers
//! ends the current segment; the next one starts afresh at height zero.
//! Each series is then fitted against its segment's curve and every segment
//! is re-centred on the weighted mean of its members.

use std::collections::BTreeMap;

use peilmerk_series::{
    Extrapolation, Point, SeriesCollection, SeriesKey, TzSeries, collapse_duplicates, interpolate,
    median,
};
use tracing::{debug, error, info, instrument, warn};

use crate::config::AnalysisConfig;
use crate::error::AlignError;
use crate::result::{MedianAnalysis, MedianSegment};
use crate::segment::SegmentId;
use crate::timing::{Lap, Stage, TimingSink};

/// Weight of an interval that starts at or before the focus date.
const EARLY_WEIGHT: f64 = 0.01;

/// Minimum weight of a series in its segment's balance.
const MIN_BALANCE_WEIGHT: f64 = 0.001;

/// Fit of one series against its segment curve.
#[derive(Debug, Clone, Copy)]
struct Fit {
    shift: f64,
    weight: f64,
}

#[instrument(skip_all, fields(n_series = collection.len(), time_tolerance = config.time_tolerance))]
pub(crate) fn analyze(
    config: &AnalysisConfig,
    collection: &SeriesCollection,
    sink: &dyn TimingSink,
) -> Result<MedianAnalysis, AlignError> {
    config.validate()?;
    let mut lap = Lap::start(sink);

    let mut series: Vec<(&SeriesKey, TzSeries)> = Vec::with_capacity(collection.len());
    for (key, s) in collection {
        if s.is_empty() {
            warn!(series = %key, "skipping empty series");
            continue;
        }
        series.push((key, collapse_duplicates(s)));
    }
    lap.lap(Stage::CollapseDuplicates);

    if series.is_empty() {
        debug!("nothing to analyse");
        return Ok(MedianAnalysis::default());
    }

    let timeline = timeline(&series);
    lap.lap(Stage::Timeline);

    let curves = integrate(&series, &timeline, config.time_tolerance);
    lap.lap(Stage::Integrate);

    let assignments = assign(&series, &curves)?;
    lap.lap(Stage::Assign);

    let mut fits = Vec::with_capacity(series.len());
    for ((_, s), &segment) in series.iter().zip(&assignments) {
        fits.push(fit_shift(s, &curves[segment], config.after_date)?);
    }
    lap.lap(Stage::Shifts);

    let offsets = balance(&curves, &assignments, &fits)?;
    lap.lap(Stage::Balance);

    let segments = curves
        .into_iter()
        .zip(&offsets)
        .enumerate()
        .map(|(i, (points, &offset))| {
            Ok(MedianSegment {
                id: SegmentId::new(i),
                curve: TzSeries::new(points)?.shifted(-offset),
            })
        })
        .collect::<Result<Vec<_>, AlignError>>()?;

    let mut analysis = MedianAnalysis {
        segments,
        assignments: BTreeMap::new(),
        shifts: BTreeMap::new(),
    };
    for (((key, _), &segment), fit) in series.iter().zip(&assignments).zip(&fits) {
        let id = SegmentId::new(segment);
        analysis.assignments.insert((*key).clone(), id);
        analysis.shifts.insert((*key).clone(), fit.shift - offsets[segment]);
    }

    info!(
        n_series = series.len(),
        n_segments = analysis.segments.len(),
        n_times = timeline.len(),
        "median analysis complete"
    );
    Ok(analysis)
}

/// Sorted union of the distinct times of all series.
fn timeline(series: &[(&SeriesKey, TzSeries)]) -> Vec<f64> {
    let mut times: Vec<f64> = series
        .iter()
        .flat_map(|(_, s)| s.points().iter().map(|p| p.time))
        .collect();
    times.sort_by(f64::total_cmp);
    times.dedup();
    times
}

/// Integrate the median slope over the timeline into one curve per segment.
fn integrate(series: &[(&SeriesKey, TzSeries)], timeline: &[f64], tol: f64) -> Vec<Vec<Point>> {
    let mut cursors = vec![0usize; series.len()];
    let mut slopes: Vec<f64> = Vec::with_capacity(series.len());
    let mut curves: Vec<Vec<Point>> = vec![vec![Point::new(timeline[0], 0.0)]];
    let mut z1 = 0.0;

    for w in timeline.windows(2) {
        let (t0, t1) = (w[0], w[1]);
        let z0 = z1;
        let mid = (t0 + t1) / 2.0;

        slopes.clear();
        for ((_, s), cursor) in series.iter().zip(cursors.iter_mut()) {
            let points = s.points();
            while *cursor < points.len() && points[*cursor].time < t1 {
                *cursor += 1;
            }
            // a series ending just short of t1 still counts
            if *cursor == points.len() && points[*cursor - 1].time > t1 - tol {
                *cursor -= 1;
            }
            if *cursor == 0 || *cursor == points.len() {
                continue;
            }
            let (p0, p1) = (points[*cursor - 1], points[*cursor]);
            if p0.time - tol < mid && mid <= p1.time + tol {
                slopes.push((p1.height - p0.height) / (p1.time - p0.time));
            }
        }

        match median(&mut slopes) {
            Some(slope) => {
                z1 = z0 + slope * (t1 - t0);
                if let Some(curve) = curves.last_mut() {
                    curve.push(Point::new(t1, z1));
                }
            }
            None => {
                debug!(t0, t1, "no coverage, starting new segment");
                z1 = 0.0;
                curves.push(vec![Point::new(t1, z1)]);
            }
        }
    }
    curves
}

/// Segment index of every series, found by bisecting segment start times.
fn assign(
    series: &[(&SeriesKey, TzSeries)],
    curves: &[Vec<Point>],
) -> Result<Vec<usize>, AlignError> {
    let starts: Vec<f64> = curves.iter().map(|c| c[0].time).collect();
    series
        .iter()
        .map(|(key, s)| {
            let t = s.points()[0].time;
            let found = starts
                .partition_point(|&start| start <= t)
                .checked_sub(1)
                .filter(|&i| curves[i].last().is_some_and(|p| t <= p.time));
            found.ok_or_else(|| {
                error!(series = %key, time = t, "series outside every segment");
                AlignError::UnassignedSeries {
                    key: key.to_string(),
                }
            })
        })
        .collect()
}

/// Mean height difference `curve - series` over the consensus intervals the
/// series covers, trapezoid-weighted by interval length.
fn fit_shift(series: &TzSeries, curve: &[Point], after_date: Option<f64>) -> Result<Fit, AlignError> {
    let points = series.points();
    if points.len() == 1 {
        let z = interpolate(curve, points[0].time, Extrapolation::Clamp)?;
        return Ok(Fit {
            shift: z - points[0].height,
            weight: 0.0,
        });
    }

    let mut sum = 0.0;
    let mut dt = 0.0;
    let mut idx = 0usize;
    for w in curve.windows(2) {
        let (c0, c1) = (w[0], w[1]);
        while idx < points.len() && points[idx].time < c1.time {
            idx += 1;
        }
        if idx == 0 || idx == points.len() {
            continue;
        }
        let pair = &points[idx - 1..=idx];
        if c0.time < pair[0].time || c1.time > pair[1].time {
            continue;
        }
        let s0 = interpolate(pair, c0.time, Extrapolation::Linear)?;
        let s1 = interpolate(pair, c1.time, Extrapolation::Linear)?;
        let weight = match after_date {
            Some(after) if c0.time <= after => EARLY_WEIGHT,
            _ => 1.0,
        };
        let span = c1.time - c0.time;
        sum += ((c0.height - s0) + (c1.height - s1)) / 2.0 * span * weight;
        dt += span * weight;
    }

    let shift = if dt > 0.0 { sum / dt } else { 0.0 };
    Ok(Fit { shift, weight: dt })
}

/// Weighted mean shift of each segment's members.
fn balance(curves: &[Vec<Point>], assignments: &[usize], fits: &[Fit]) -> Result<Vec<f64>, AlignError> {
    let mut sums = vec![0.0; curves.len()];
    let mut weights = vec![0.0; curves.len()];
    for (&segment, fit) in assignments.iter().zip(fits) {
        let w = fit.weight.max(MIN_BALANCE_WEIGHT);
        sums[segment] += fit.shift * w;
        weights[segment] += w;
    }

    sums.iter()
        .zip(&weights)
        .enumerate()
        .map(|(i, (&sum, &weight))| {
            if weight > 0.0 {
                Ok(sum / weight)
            } else {
                let segment = SegmentId::new(i);
                error!(%segment, "segment has no members");
                Err(AlignError::EmptySegment { segment })
            }
        })
        .collect()
}
