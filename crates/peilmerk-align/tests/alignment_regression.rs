//! Regression tests for peilmerk-align.
//!
//! These tests pin the behaviour of the median-curve builder and the
//! alignment policies on small hand-checked datasets.

use std::collections::BTreeMap;

use peilmerk_align::{
    AlignConfig, AlignError, AnalysisConfig, CurveKey, OverlapConfig, Stage, StageTimings,
};
use peilmerk_series::{SeriesCollection, SeriesKey, TzSeries};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn series(pairs: &[(f64, f64)]) -> TzSeries {
    pairs.to_vec().try_into().unwrap()
}

fn collection(items: &[(&str, &[(f64, f64)])]) -> SeriesCollection {
    items
        .iter()
        .map(|(k, pairs)| (SeriesKey::new(*k), series(pairs)))
        .collect()
}

fn key(name: &str) -> SeriesKey {
    SeriesKey::new(name)
}

/// Two series per segment, segments at days 0, 1000 and 2000.
fn three_segments() -> SeriesCollection {
    collection(&[
        ("a", &[(0.0, 1.0), (50.0, 1.5), (100.0, 2.0)]),
        ("b", &[(0.0, 3.0), (100.0, 4.0)]),
        ("c", &[(1000.0, 5.0), (1100.0, 6.0)]),
        ("d", &[(1000.0, 7.0), (1100.0, 8.0)]),
        ("e", &[(2000.0, -1.0), (2100.0, -2.0)]),
        ("f", &[(2000.0, 0.0), (2050.0, -0.4), (2100.0, -1.0)]),
    ])
}

/// Overlapping surveys with different offsets and slightly different
/// sampling.
fn marker_surveys(offset: f64) -> SeriesCollection {
    let base = |shift: f64, step: f64| -> TzSeries {
        let pairs: Vec<(f64, f64)> = (0..8)
            .map(|i| {
                let t = f64::from(i) * step;
                (t, shift + offset - 0.002 * t)
            })
            .collect();
        series(&pairs)
    };
    let mut c = SeriesCollection::new();
    c.insert(key("nap"), base(0.0, 365.0));
    c.insert(key("rws"), base(0.35, 400.0));
    c.insert(key("gem"), base(-0.2, 330.0));
    c
}

// ---------------------------------------------------------------------------
// a) drifting_pair_balances_half_the_drift
// ---------------------------------------------------------------------------

/// A = [(0,10),(10,11)], B = [(0,20),(10,21.5)]: the consensus slope is the
/// median of 0.1 and 0.15, and the shifts differ by the offset plus half the
/// drift.
#[test]
fn drifting_pair_balances_half_the_drift() {
    let c = collection(&[
        ("a", &[(0.0, 10.0), (10.0, 11.0)]),
        ("b", &[(0.0, 20.0), (10.0, 21.5)]),
    ]);
    let analysis = AnalysisConfig::new().analyze(&c).unwrap();

    assert_eq!(analysis.segments.len(), 1);
    assert_eq!(analysis.segment_sizes(), vec![2]);

    let (sa, sb) = (analysis.shifts[&key("a")], analysis.shifts[&key("b")]);
    assert!((sa - 5.125).abs() < 1e-9, "shift a = {sa}");
    assert!((sb + 5.125).abs() < 1e-9, "shift b = {sb}");
    assert!((sa - sb - 10.25).abs() < 1e-9);

    let median = analysis.median();
    assert!((median[0].height - 15.0).abs() < 1e-9);
    assert!((median[1].height - 16.25).abs() < 1e-9);
}

// ---------------------------------------------------------------------------
// b) disjoint_pair_forms_two_segments
// ---------------------------------------------------------------------------

#[test]
fn disjoint_pair_forms_two_segments() {
    let c = collection(&[
        ("a", &[(0.0, 0.0), (10.0, 1.0)]),
        ("b", &[(100.0, 5.0), (110.0, 4.0)]),
    ]);
    let analysis = AnalysisConfig::new().analyze(&c).unwrap();

    assert_eq!(analysis.segments.len(), 2);
    assert_ne!(analysis.assignments[&key("a")], analysis.assignments[&key("b")]);
    assert_eq!(analysis.segment_sizes(), vec![1, 1]);
    assert_eq!(analysis.segments[1].start(), 100.0);
    assert_eq!(analysis.segments[1].id.to_string(), "median_segment_1");
}

/// A gap shorter than the tolerance does not split the consensus.
#[test]
fn short_gap_is_bridged() {
    let c = collection(&[
        ("a", &[(0.0, 0.0), (10.0, 1.0)]),
        ("b", &[(25.0, 5.0), (35.0, 4.0)]),
    ]);
    let analysis = AnalysisConfig::new().analyze(&c).unwrap();
    assert_eq!(analysis.segments.len(), 1);

    let strict = AnalysisConfig::new().with_time_tolerance(0.0).analyze(&c).unwrap();
    assert_eq!(strict.segments.len(), 2);
}

// ---------------------------------------------------------------------------
// c) identical_series_need_no_shift
// ---------------------------------------------------------------------------

#[test]
fn identical_series_need_no_shift() {
    let pairs = [(0.0, 2.0), (30.0, 1.7), (95.0, 1.9), (200.0, 1.1)];
    let c = collection(&[("a", &pairs), ("b", &pairs)]);
    let analysis = AnalysisConfig::new().analyze(&c).unwrap();

    for shift in analysis.shifts.values() {
        assert!(shift.abs() < 1e-12, "shift {shift}");
    }
    let median = analysis.median();
    assert_eq!(median.len(), pairs.len());
    for (p, &(t, z)) in median.points().iter().zip(&pairs) {
        assert_eq!(p.time, t);
        assert!((p.height - z).abs() < 1e-9);
    }
}

// ---------------------------------------------------------------------------
// d) segment_assignment_is_a_partition
// ---------------------------------------------------------------------------

#[test]
fn segment_assignment_is_a_partition() {
    let c = three_segments();
    let analysis = AnalysisConfig::new().analyze(&c).unwrap();

    assert_eq!(analysis.segments.len(), 3);
    assert_eq!(analysis.assignments.len(), c.len());
    assert!(c.keys().all(|k| analysis.assignments.contains_key(k)));
    assert!(analysis.segment_sizes().iter().all(|&n| n > 0));

    let total: usize = analysis
        .segments
        .iter()
        .map(|s| analysis.members(s.id).len())
        .sum();
    assert_eq!(total, c.len());

    // members of a segment start inside it
    for segment in &analysis.segments {
        for member in analysis.members(segment.id) {
            assert!(segment.contains(c[member][0].time));
        }
    }
}

/// Within each segment the member shifts balance out around zero.
#[test]
fn segment_shifts_are_balanced() {
    let c = three_segments();
    let analysis = AnalysisConfig::new().analyze(&c).unwrap();
    for segment in &analysis.segments {
        let members = analysis.members(segment.id);
        let spans: Vec<f64> = members
            .iter()
            .map(|k| {
                let (t0, t1) = c[*k].time_range().unwrap();
                t1 - t0
            })
            .collect();
        let weighted: f64 = members
            .iter()
            .zip(&spans)
            .map(|(k, w)| analysis.shifts[*k] * w)
            .sum();
        assert!(weighted.abs() < 1e-9, "{}: {weighted}", segment.id);
    }
}

// ---------------------------------------------------------------------------
// e) align_all_round_trips
// ---------------------------------------------------------------------------

#[test]
fn align_all_round_trips() {
    let c = marker_surveys(1.5);
    let alignment = AlignConfig::new(500.0).align_all(&c).unwrap();
    let restored = alignment.restore();

    assert_eq!(restored.len(), c.len());
    for (k, original) in &c {
        for (p, q) in restored[k].points().iter().zip(original.points()) {
            assert_eq!(p.time, q.time);
            assert!((p.height - q.height).abs() < 1e-9);
        }
    }
}

#[test]
fn align_all_zeroes_median_at_reference_date() {
    let c = marker_surveys(1.5);
    let alignment = AlignConfig::new(730.0).align_all(&c).unwrap();
    let median = alignment.median().unwrap();
    let at_ref = peilmerk_series::interpolate(
        median.points(),
        730.0,
        peilmerk_series::Extrapolation::Clamp,
    )
    .unwrap();
    assert!(at_ref.abs() < 1e-9);

    // all surveys follow the same line, so after alignment they coincide
    let nap = alignment.series(&key("nap")).unwrap();
    let rws = alignment.series(&key("rws")).unwrap();
    assert!((nap[0].height - rws[0].height).abs() < 1e-6);
}

// ---------------------------------------------------------------------------
// f) segment_restricted_alignment
// ---------------------------------------------------------------------------

/// With the reference date inside the middle segment only its members come
/// back, each shifted by its own shift minus the segment's reference value.
#[test]
fn segment_restricted_alignment() {
    let c = three_segments();
    let config = AlignConfig::new(1050.0);
    let analysis = config.analysis().analyze(&c).unwrap();
    let alignment = config.align_segment(&c).unwrap().unwrap();

    let middle = &analysis.segments[1];
    let d = peilmerk_series::interpolate(
        middle.curve.points(),
        1050.0,
        peilmerk_series::Extrapolation::Clamp,
    )
    .unwrap();
    assert!((alignment.reference_offset - d).abs() < 1e-12);

    let keys: Vec<&str> = alignment.applied_shifts.keys().map(|k| k.as_str()).collect();
    assert_eq!(keys, vec!["c", "d"]);
    for (k, &applied) in &alignment.applied_shifts {
        assert!((applied - (analysis.shifts[k] - d)).abs() < 1e-12);
    }
    assert!(alignment.curves.contains_key(&CurveKey::Segment(middle.id)));
    assert!(!alignment.curves.contains_key(&CurveKey::Median));

    // hand-checked: c = +1, d = -1, curve 6..7
    assert!((alignment.applied_shifts[&key("c")] + 5.5).abs() < 1e-9);
    assert!((alignment.applied_shifts[&key("d")] + 7.5).abs() < 1e-9);
}

#[test]
fn segment_alignment_far_from_data_is_none() {
    let c = three_segments();
    assert!(AlignConfig::new(1500.0).align_segment(&c).unwrap().is_none());
    // within tolerance of a segment end still counts
    assert!(AlignConfig::new(1120.0).align_segment(&c).unwrap().is_some());
}

// ---------------------------------------------------------------------------
// g) two_level_alignment
// ---------------------------------------------------------------------------

#[test]
fn two_level_ties_markers_together() {
    let mut markers = BTreeMap::new();
    markers.insert(key("pm-001"), marker_surveys(0.0));
    markers.insert(key("pm-002"), marker_surveys(3.0));
    markers.insert(key("pm-003"), SeriesCollection::new());

    let result = AlignConfig::new(365.0).align_two_level(&markers).unwrap();
    assert_eq!(result.markers.len(), 3);
    assert_eq!(result.marker_shifts.len(), 2);

    let m1 = result.markers[&key("pm-001")].median().unwrap();
    let m2 = result.markers[&key("pm-002")].median().unwrap();
    for (p, q) in m1.points().iter().zip(m2.points()) {
        assert!((p.height - q.height).abs() < 1e-9);
    }

    let at_ref = peilmerk_series::interpolate(
        result.grand_median.points(),
        365.0,
        peilmerk_series::Extrapolation::Clamp,
    )
    .unwrap();
    assert!(at_ref.abs() < 1e-9);

    let restored = result.markers[&key("pm-002")].restore();
    let original = &markers[&key("pm-002")][&key("gem")];
    assert!((restored[&key("gem")][3].height - original[3].height).abs() < 1e-9);
}

// ---------------------------------------------------------------------------
// h) overlap_shift
// ---------------------------------------------------------------------------

#[test]
fn overlap_recovers_constant_offset() {
    let a = series(&[(0.0, 1.0), (100.0, 0.8), (250.0, 0.75), (400.0, 0.5)]);
    let b = a.shifted(-0.33);
    let shift = OverlapConfig::new().shift(&a, &b).unwrap();
    assert!((shift + 0.33).abs() < 1e-12);
}

#[test]
fn overlap_of_disjoint_series_fails() {
    let a = series(&[(0.0, 1.0)]);
    let b = series(&[(1000.0, 1.0)]);
    let err = OverlapConfig::new().with_time_tolerance(30.0).shift(&a, &b).unwrap_err();
    assert!(matches!(err, AlignError::NoOverlap));
}

// ---------------------------------------------------------------------------
// i) timings
// ---------------------------------------------------------------------------

#[test]
fn timings_accumulate_across_runs() {
    let c = three_segments();
    let timings = StageTimings::new();
    let config = AnalysisConfig::new();
    config.analyze_with_timings(&c, &timings).unwrap();
    config.analyze_with_timings(&c, &timings).unwrap();
    assert_eq!(timings.calls(Stage::Integrate), 2);
    assert_eq!(timings.snapshot().len(), Stage::ALL.len());
}
