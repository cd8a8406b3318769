//! JSON result writer for analysis, alignment and overlap outputs.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use peilmerk_align::{Alignment, AlignmentMode, CurveKey, MedianAnalysis, TwoLevelAlignment};
use peilmerk_series::{SeriesKey, TzSeries, median};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::dates::date_from_days;
use crate::domain::RunName;
use crate::IoError;

/// Writes results to JSON files.
///
/// Creates the output directory on construction if it does not exist.
/// Output files are named `{run}_analysis.json`, `{run}_aligned.json`,
/// `{run}_two_level.json` and `{run}_overlap.json`.
pub struct ResultWriter {
    output_dir: PathBuf,
    run: RunName,
}

impl ResultWriter {
    /// Create a new writer targeting the given directory and run name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display(), run = %run))]
    pub fn new(output_dir: &Path, run: RunName) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            run,
        })
    }

    /// Path of the output file with the given suffix.
    #[must_use]
    pub fn path_for(&self, suffix: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}_{suffix}.json", self.run.as_str()))
    }

    /// Write a median analysis of one collection to `{run}_analysis.json`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Serialize`] or [`IoError::WriteFile`] on failure.
    #[instrument(skip_all)]
    pub fn write_analysis(&self, analysis: &MedianAnalysis) -> Result<PathBuf, IoError> {
        let segments: Vec<SegmentEntry> = analysis
            .segments
            .iter()
            .map(|s| SegmentEntry {
                id: s.id.to_string(),
                start: s.start(),
                end: s.end(),
                members: analysis
                    .members(s.id)
                    .into_iter()
                    .map(SeriesKey::as_str)
                    .collect(),
                curve: points(&s.curve),
            })
            .collect();

        let artifact = AnalysisArtifact {
            run: self.run.as_str(),
            n_series: analysis.assignments.len(),
            n_segments: analysis.segments.len(),
            assignments: analysis
                .assignments
                .iter()
                .map(|(k, id)| (k.as_str(), id.to_string()))
                .collect(),
            shifts: key_map(&analysis.shifts),
            segments,
            median: points(&analysis.median()),
        };
        self.write_json("analysis", &artifact)
    }

    /// Write the output of an alignment policy to `{run}_aligned.json`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Serialize`] or [`IoError::WriteFile`] on failure.
    #[instrument(skip_all, fields(mode = %mode))]
    pub fn write_alignment(
        &self,
        mode: AlignmentMode,
        alignment: &Alignment,
    ) -> Result<PathBuf, IoError> {
        let artifact = AlignedArtifact {
            run: self.run.as_str(),
            mode: mode.as_str(),
            reference_offset: Some(alignment.reference_offset),
            applied_shifts: key_map(&alignment.applied_shifts),
            curves: curves(&alignment.curves),
        };
        self.write_json("aligned", &artifact)
    }

    /// Write a bare curve collection (a display mode without shifts) to
    /// `{run}_aligned.json`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Serialize`] or [`IoError::WriteFile`] on failure.
    #[instrument(skip_all, fields(mode = %mode))]
    pub fn write_curves(
        &self,
        mode: AlignmentMode,
        curve_map: &BTreeMap<CurveKey, TzSeries>,
    ) -> Result<PathBuf, IoError> {
        let artifact = AlignedArtifact {
            run: self.run.as_str(),
            mode: mode.as_str(),
            reference_offset: None,
            applied_shifts: BTreeMap::new(),
            curves: curves(curve_map),
        };
        self.write_json("aligned", &artifact)
    }

    /// Write a two-level alignment to `{run}_two_level.json`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Serialize`] or [`IoError::WriteFile`] on failure.
    #[instrument(skip_all)]
    pub fn write_two_level(&self, result: &TwoLevelAlignment) -> Result<PathBuf, IoError> {
        let markers = result
            .markers
            .iter()
            .map(|(marker, alignment)| {
                let entry = MarkerEntry {
                    marker_shift: result.marker_shifts.get(marker).copied(),
                    applied_shifts: key_map(&alignment.applied_shifts),
                    curves: curves(&alignment.curves),
                };
                (marker.as_str(), entry)
            })
            .collect();

        let artifact = TwoLevelArtifact {
            run: self.run.as_str(),
            n_markers: result.markers.len(),
            reference_offset: result.reference_offset,
            grand_median: points(&result.grand_median),
            markers,
        };
        self.write_json("two_level", &artifact)
    }

    /// Write per-marker overlap shifts between two surveys to
    /// `{run}_overlap.json`. `None` marks a marker where the surveys do not
    /// overlap.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Serialize`] or [`IoError::WriteFile`] on failure.
    #[instrument(skip_all, fields(survey_a = %survey_a, survey_b = %survey_b))]
    pub fn write_overlap(
        &self,
        survey_a: &str,
        survey_b: &str,
        shifts: &BTreeMap<SeriesKey, Option<f64>>,
    ) -> Result<PathBuf, IoError> {
        let mut found: Vec<f64> = shifts.values().flatten().copied().collect();
        let artifact = OverlapArtifact {
            run: self.run.as_str(),
            survey_a,
            survey_b,
            n_markers: shifts.len(),
            n_overlapping: found.len(),
            median_shift: median(&mut found),
            shifts: shifts.iter().map(|(k, &v)| (k.as_str(), v)).collect(),
        };
        self.write_json("overlap", &artifact)
    }

    fn write_json<T: Serialize>(&self, suffix: &str, artifact: &T) -> Result<PathBuf, IoError> {
        let path = self.path_for(suffix);
        let json = serde_json::to_string_pretty(artifact).map_err(|e| IoError::Serialize {
            path: path.clone(),
            source: e,
        })?;
        fs::write(&path, &json).map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;

        info!(path = %path.display(), "{suffix} result written");
        Ok(path)
    }
}

fn points(series: &TzSeries) -> Vec<PointEntry> {
    series
        .points()
        .iter()
        .map(|p| PointEntry {
            date: date_from_days(p.time).map(|d| d.format("%Y-%m-%d").to_string()),
            days: p.time,
            height: p.height,
        })
        .collect()
}

fn key_map(map: &BTreeMap<SeriesKey, f64>) -> BTreeMap<&str, f64> {
    map.iter().map(|(k, &v)| (k.as_str(), v)).collect()
}

fn curves(map: &BTreeMap<CurveKey, TzSeries>) -> Vec<CurveEntry> {
    map.iter()
        .map(|(key, series)| {
            let kind = match key {
                CurveKey::Series(_) => "series",
                CurveKey::Median => "median",
                CurveKey::Segment(_) => "segment",
                CurveKey::Merge => "merge",
            };
            CurveEntry {
                kind,
                name: key.to_string(),
                points: points(series),
            }
        })
        .collect()
}

// --- Shadow structs for JSON serialization ---

#[derive(Serialize)]
struct PointEntry {
    date: Option<String>,
    days: f64,
    height: f64,
}

#[derive(Serialize)]
struct CurveEntry {
    kind: &'static str,
    name: String,
    points: Vec<PointEntry>,
}

#[derive(Serialize)]
struct SegmentEntry<'a> {
    id: String,
    start: f64,
    end: f64,
    members: Vec<&'a str>,
    curve: Vec<PointEntry>,
}

#[derive(Serialize)]
struct AnalysisArtifact<'a> {
    run: &'a str,
    n_series: usize,
    n_segments: usize,
    assignments: BTreeMap<&'a str, String>,
    shifts: BTreeMap<&'a str, f64>,
    segments: Vec<SegmentEntry<'a>>,
    median: Vec<PointEntry>,
}

#[derive(Serialize)]
struct AlignedArtifact<'a> {
    run: &'a str,
    mode: &'static str,
    reference_offset: Option<f64>,
    applied_shifts: BTreeMap<&'a str, f64>,
    curves: Vec<CurveEntry>,
}

#[derive(Serialize)]
struct MarkerEntry<'a> {
    marker_shift: Option<f64>,
    applied_shifts: BTreeMap<&'a str, f64>,
    curves: Vec<CurveEntry>,
}

#[derive(Serialize)]
struct TwoLevelArtifact<'a> {
    run: &'a str,
    n_markers: usize,
    reference_offset: f64,
    grand_median: Vec<PointEntry>,
    markers: BTreeMap<&'a str, MarkerEntry<'a>>,
}

#[derive(Serialize)]
struct OverlapArtifact<'a> {
    run: &'a str,
    survey_a: &'a str,
    survey_b: &'a str,
    n_markers: usize,
    n_overlapping: usize,
    median_shift: Option<f64>,
    shifts: BTreeMap<&'a str, Option<f64>>,
}
