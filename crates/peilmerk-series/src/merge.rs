//! Duplicate collapsing and pooling of several series into one.

use tracing::{debug, instrument};

use crate::point::Point;
use crate::series::TzSeries;

/// Median of `values`; the mean of the two middle values for an even count.
///
/// Reorders `values`. Returns `None` when `values` is empty.
#[must_use]
pub fn median(values: &mut [f64]) -> Option<f64> {
    let n = values.len();
    if n == 0 {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = n / 2;
    if n % 2 == 1 {
        Some(values[mid])
    } else {
        Some((values[mid - 1] + values[mid]) / 2.0)
    }
}

/// Fold points that share exactly the same time into one point carrying
/// the median height.
#[must_use]
pub fn collapse_duplicates(series: &TzSeries) -> TzSeries {
    let mut out: Vec<Point> = Vec::with_capacity(series.len());
    let mut heights: Vec<f64> = Vec::new();

    for &point in series.points() {
        match out.last().map(|prev| prev.time) {
            Some(time) if time == point.time => heights.push(point.height),
            _ => {
                fold_run(&mut out, &mut heights);
                out.push(point);
                heights.push(point.height);
            }
        }
    }
    fold_run(&mut out, &mut heights);

    TzSeries::new_unchecked(out)
}

/// Replace the last point's height with the median of the pending run.
fn fold_run(out: &mut [Point], heights: &mut Vec<f64>) {
    if heights.len() > 1
        && let Some(last) = out.last_mut()
        && let Some(z) = median(heights)
    {
        last.height = z;
    }
    heights.clear();
}

/// Pool every point of every series into one ascending series.
///
/// Points are sorted by time (then height). A run starts at a point and
/// absorbs each following point whose time equals the run's first time or
/// is strictly less than `time_tolerance` after it. Every run becomes one
/// point at the median time with the median height.
///
/// Runs are anchored at their first point, so chained points can leave
/// two output times closer than `time_tolerance`.
#[must_use]
#[instrument(skip(series))]
pub fn merge_series<'a, I>(series: I, time_tolerance: f64) -> TzSeries
where
    I: IntoIterator<Item = &'a TzSeries>,
{
    let mut pooled: Vec<Point> = series
        .into_iter()
        .flat_map(|s| s.points().iter().copied())
        .collect();
    pooled.sort_by(|a, b| {
        a.time
            .total_cmp(&b.time)
            .then_with(|| a.height.total_cmp(&b.height))
    });

    let mut merged: Vec<Point> = Vec::with_capacity(pooled.len());
    let mut run_times: Vec<f64> = Vec::new();
    let mut run_heights: Vec<f64> = Vec::new();

    for point in pooled {
        let in_run = run_times
            .first()
            .is_some_and(|&start| point.time == start || point.time - start < time_tolerance);
        if in_run {
            run_times.push(point.time);
            run_heights.push(point.height);
            continue;
        }
        if let Some(collapsed) = collapse_run(&mut run_times, &mut run_heights) {
            merged.push(collapsed);
        }
        run_times.push(point.time);
        run_heights.push(point.height);
    }
    if let Some(collapsed) = collapse_run(&mut run_times, &mut run_heights) {
        merged.push(collapsed);
    }

    debug!(n_points = merged.len(), "series merged");
    TzSeries::new_unchecked(merged)
}

fn collapse_run(times: &mut Vec<f64>, heights: &mut Vec<f64>) -> Option<Point> {
    let point = Point::new(median(times)?, median(heights)?);
    times.clear();
    heights.clear();
    Some(point)
}
