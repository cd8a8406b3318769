//! Nearest-point and linear interpolation lookups by bisection on time.
//!
//! Both lookups accept ascending or descending sequences with unique times.
//! The direction is read from the end points and the bisection runs on time
//! values, so reversing a sequence never changes a result.

use crate::error::SeriesError;
use crate::point::Point;

/// Behaviour of [`interpolate`] outside the sequence's time range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Extrapolation {
    /// Extend the line through the nearest bracketing pair (default).
    #[default]
    Linear,
    /// Return the height at the nearest end point.
    Clamp,
}

/// Indices of the minimum-time and maximum-time end points.
fn ends(points: &[Point]) -> (usize, usize) {
    let last = points.len() - 1;
    if points[0].time > points[last].time {
        (last, 0)
    } else {
        (0, last)
    }
}

/// Bisect for adjacent indices `(a, b)` with `time[a] < t <= time[b]`,
/// starting from the end-point indices `lo` (min time) and `hi` (max time).
///
/// Outside the range the pair adjacent to the nearer end is returned.
fn bracket(points: &[Point], t: f64, lo: usize, hi: usize) -> (usize, usize) {
    let (mut a, mut b) = (lo, hi);
    while a.abs_diff(b) > 1 {
        let mid = (a + b) / 2;
        if points[mid].time < t {
            a = mid;
        } else {
            b = mid;
        }
    }
    (a, b)
}

/// Return the point whose time is nearest to `t`.
///
/// Below the first time the minimum-time point is returned, above the last
/// time the maximum-time point. Equidistant candidates resolve to the
/// earlier of the two.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`SeriesError::EmptySeries`] | `points` is empty |
pub fn closest_point(points: &[Point], t: f64) -> Result<Point, SeriesError> {
    match points.len() {
        0 => return Err(SeriesError::EmptySeries),
        1 => return Ok(points[0]),
        _ => {}
    }

    let (lo, hi) = ends(points);
    if t <= points[lo].time {
        return Ok(points[lo]);
    }
    if t >= points[hi].time {
        return Ok(points[hi]);
    }

    let (a, b) = bracket(points, t, lo, hi);
    let (pa, pb) = (points[a], points[b]);
    if (t - pa.time).abs() <= (t - pb.time).abs() {
        Ok(pa)
    } else {
        Ok(pb)
    }
}

/// Return the linearly interpolated height at `t`.
///
/// At the time of an existing point its height is returned exactly. A
/// single-point sequence yields its height for every `t`.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`SeriesError::EmptySeries`] | `points` is empty |
pub fn interpolate(
    points: &[Point],
    t: f64,
    extrapolation: Extrapolation,
) -> Result<f64, SeriesError> {
    match points.len() {
        0 => return Err(SeriesError::EmptySeries),
        1 => return Ok(points[0].height),
        _ => {}
    }

    let (lo, hi) = ends(points);
    if extrapolation == Extrapolation::Clamp {
        if t <= points[lo].time {
            return Ok(points[lo].height);
        }
        if t >= points[hi].time {
            return Ok(points[hi].height);
        }
    }

    let (a, b) = bracket(points, t, lo, hi);
    Ok(linear(points[a], points[b], t))
}

/// Value at `t` on the line through `p0` and `p1`. Exact at either end.
pub(crate) fn linear(p0: Point, p1: Point, t: f64) -> f64 {
    if t == p0.time {
        return p0.height;
    }
    if t == p1.time {
        return p1.height;
    }
    let slope = (p1.height - p0.height) / (p1.time - p0.time);
    p0.height + slope * (t - p0.time)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(pairs: &[(f64, f64)]) -> Vec<Point> {
        pairs.iter().copied().map(Point::from).collect()
    }

    fn reversed(points: &[Point]) -> Vec<Point> {
        points.iter().rev().copied().collect()
    }

    #[test]
    fn empty_is_an_error() {
        assert_eq!(closest_point(&[], 1.0), Err(SeriesError::EmptySeries));
        assert_eq!(
            interpolate(&[], 1.0, Extrapolation::Linear),
            Err(SeriesError::EmptySeries)
        );
    }

    #[test]
    fn single_point_answers_everything() {
        let p = pts(&[(5.0, 2.5)]);
        for t in [-100.0, 5.0, 1e6] {
            assert_eq!(closest_point(&p, t).unwrap(), p[0]);
            assert_eq!(interpolate(&p, t, Extrapolation::Linear).unwrap(), 2.5);
            assert_eq!(interpolate(&p, t, Extrapolation::Clamp).unwrap(), 2.5);
        }
    }

    #[test]
    fn closest_below_and_above_range() {
        let p = pts(&[(0.0, 1.0), (10.0, 2.0), (20.0, 3.0)]);
        assert_eq!(closest_point(&p, -5.0).unwrap(), p[0]);
        assert_eq!(closest_point(&p, 25.0).unwrap(), p[2]);
    }

    #[test]
    fn closest_picks_nearer_neighbour() {
        let p = pts(&[(0.0, 1.0), (10.0, 2.0), (20.0, 3.0), (30.0, 4.0)]);
        assert_eq!(closest_point(&p, 12.0).unwrap(), p[1]);
        assert_eq!(closest_point(&p, 18.0).unwrap(), p[2]);
        assert_eq!(closest_point(&p, 29.0).unwrap(), p[3]);
    }

    #[test]
    fn closest_tie_goes_to_earlier_point() {
        let p = pts(&[(0.0, 1.0), (10.0, 2.0), (20.0, 3.0)]);
        assert_eq!(closest_point(&p, 15.0).unwrap(), p[1]);
        assert_eq!(closest_point(&reversed(&p), 15.0).unwrap(), p[1]);
    }

    #[test]
    fn interpolate_inside_range() {
        let p = pts(&[(0.0, 0.0), (10.0, 1.0), (20.0, 3.0)]);
        assert!((interpolate(&p, 5.0, Extrapolation::Linear).unwrap() - 0.5).abs() < 1e-12);
        assert!((interpolate(&p, 15.0, Extrapolation::Linear).unwrap() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn interpolate_exact_at_existing_times() {
        let p = pts(&[(0.1, 0.3), (0.7, 0.11), (3.3, 7.77), (9.9, -0.123456789)]);
        for point in &p {
            for mode in [Extrapolation::Linear, Extrapolation::Clamp] {
                assert_eq!(interpolate(&p, point.time, mode).unwrap(), point.height);
                assert_eq!(
                    interpolate(&reversed(&p), point.time, mode).unwrap(),
                    point.height
                );
            }
        }
    }

    #[test]
    fn interpolate_extrapolates_linearly() {
        let p = pts(&[(0.0, 0.0), (10.0, 1.0), (20.0, 3.0)]);
        assert!((interpolate(&p, -10.0, Extrapolation::Linear).unwrap() + 1.0).abs() < 1e-12);
        assert!((interpolate(&p, 30.0, Extrapolation::Linear).unwrap() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn interpolate_clamps() {
        let p = pts(&[(0.0, 0.0), (10.0, 1.0), (20.0, 3.0)]);
        assert_eq!(interpolate(&p, -10.0, Extrapolation::Clamp).unwrap(), 0.0);
        assert_eq!(interpolate(&p, 30.0, Extrapolation::Clamp).unwrap(), 3.0);
    }

    #[test]
    fn reversal_does_not_change_results() {
        let p = pts(&[(1.0, 4.0), (2.5, 3.0), (4.0, 3.5), (8.0, 1.0), (9.0, 0.5)]);
        let r = reversed(&p);
        for i in -4..=24 {
            let t = f64::from(i) * 0.5;
            assert_eq!(closest_point(&p, t).unwrap(), closest_point(&r, t).unwrap());
            for mode in [Extrapolation::Linear, Extrapolation::Clamp] {
                let a = interpolate(&p, t, mode).unwrap();
                let b = interpolate(&r, t, mode).unwrap();
                assert!((a - b).abs() < 1e-12, "t={t}: {a} vs {b}");
            }
        }
    }
}
