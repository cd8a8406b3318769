//! Height shift between two series over their shared time span.

use peilmerk_series::{Extrapolation, Point, TzSeries, interpolate};
use tracing::{debug, instrument};

use crate::config::OverlapConfig;
use crate::error::AlignError;

/// Weight of a sample interval that ends before the focus date.
const EARLY_WEIGHT: f64 = 0.001;

#[instrument(skip_all, fields(len_a = a.len(), len_b = b.len()))]
pub(crate) fn shift(config: &OverlapConfig, a: &TzSeries, b: &TzSeries) -> Result<f64, AlignError> {
    if a.is_empty() || b.is_empty() {
        return Err(AlignError::NoOverlap);
    }

    let mut samples = differences(a.points(), b.points())?;
    if samples.is_empty() {
        let touch = touching(a, b, config.time_tolerance).ok_or(AlignError::NoOverlap)?;
        debug!(time = touch.time, "series touch without overlapping");
        samples.push(touch);
    }

    let mean = weighted_mean(&samples, config.focus_after);
    debug!(n_samples = samples.len(), mean, "overlap difference");
    Ok(-mean)
}

/// Samples `(t, z_a - z_b)` at every time where one series has a point and
/// the other brackets it. The bracketing side is linearly interpolated.
fn differences(a: &[Point], b: &[Point]) -> Result<Vec<Point>, AlignError> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0usize, 0usize);

    loop {
        let take_a = match (a.get(i), b.get(j)) {
            (None, None) => break,
            (Some(p), Some(q)) if p.time == q.time => {
                out.push(Point::new(p.time, p.height - q.height));
                i += 1;
                j += 1;
                continue;
            }
            (Some(p), Some(q)) => p.time < q.time,
            (Some(_), None) => true,
            (None, Some(_)) => false,
        };

        if take_a {
            let p = a[i];
            if j > 0 && j < b.len() {
                let zb = interpolate(&b[j - 1..=j], p.time, Extrapolation::Linear)?;
                out.push(Point::new(p.time, p.height - zb));
            }
            i += 1;
        } else {
            let q = b[j];
            if i > 0 && i < a.len() {
                let za = interpolate(&a[i - 1..=i], q.time, Extrapolation::Linear)?;
                out.push(Point::new(q.time, za - q.height));
            }
            j += 1;
        }
    }
    Ok(out)
}

/// One synthetic sample when one series ends less than `tol` before the
/// other starts.
fn touching(a: &TzSeries, b: &TzSeries, tol: f64) -> Option<Point> {
    let (a_first, a_last) = (a.first()?, a.last()?);
    let (b_first, b_last) = (b.first()?, b.last()?);

    if a_last.time < b_first.time && b_first.time - a_last.time < tol {
        let t = (a_last.time + b_first.time) / 2.0;
        return Some(Point::new(t, a_last.height - b_first.height));
    }
    if b_last.time < a_first.time && a_first.time - b_last.time < tol {
        let t = (b_last.time + a_first.time) / 2.0;
        return Some(Point::new(t, a_first.height - b_last.height));
    }
    None
}

/// Trapezoid mean of the samples over time. Samples all at one time give
/// the mean of the first and last one.
fn weighted_mean(samples: &[Point], focus_after: Option<f64>) -> f64 {
    let (first, last) = (samples[0], samples[samples.len() - 1]);
    if samples.len() == 1 || first.time == last.time {
        return (first.height + last.height) / 2.0;
    }

    let mut sum = 0.0;
    let mut dt = 0.0;
    for w in samples.windows(2) {
        let (s0, s1) = (w[0], w[1]);
        let weight = match focus_after {
            Some(focus) if s1.time < focus => EARLY_WEIGHT,
            _ => 1.0,
        };
        let span = s1.time - s0.time;
        sum += span * weight * (s0.height + s1.height) / 2.0;
        dt += span * weight;
    }
    sum / dt
}
