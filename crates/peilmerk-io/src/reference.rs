//! Manual per-survey, per-year height corrections.

use std::collections::BTreeMap;
use std::path::Path;

use peilmerk_align::{Alignment, CurveKey, TwoLevelAlignment};
use peilmerk_series::{Point, SeriesCollection, SeriesKey, TzSeries};
use tracing::{debug, info, instrument};

use crate::dates::year_of;
use crate::domain::HeightDataset;
use crate::reader::{Columns, csv_error, parse_finite};
use crate::IoError;

/// Height corrections keyed by survey and calendar year.
///
/// A correction is added to every point of that survey measured in that
/// year, before any analysis runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceShifts {
    shifts: BTreeMap<SeriesKey, BTreeMap<i32, f64>>,
}

impl ReferenceShifts {
    /// Create an empty correction table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the correction for `survey` in `year`, replacing any earlier one.
    pub fn insert(&mut self, survey: SeriesKey, year: i32, shift: f64) {
        self.shifts.entry(survey).or_default().insert(year, shift);
    }

    /// Correction for `survey` in `year`, if one is set.
    #[must_use]
    pub fn get(&self, survey: &SeriesKey, year: i32) -> Option<f64> {
        self.shifts.get(survey)?.get(&year).copied()
    }

    /// Return the number of (survey, year) corrections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shifts.values().map(BTreeMap::len).sum()
    }

    /// Return true if no correction is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read corrections from a CSV file with columns `survey,year,shift`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
    /// | [`IoError::CsvParse`] | Malformed CSV record |
    /// | [`IoError::MissingColumn`] | A required column is absent |
    /// | [`IoError::EmptyField`] | Survey cell is blank |
    /// | [`IoError::NonFiniteValue`] | Year or shift is not a finite number |
    #[instrument(skip(path), fields(path = %path.display()))]
    pub fn read(path: &Path) -> Result<Self, IoError> {
        let file = std::fs::File::open(path).map_err(|e| IoError::FileNotFound {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let header = rdr.headers().map_err(|e| csv_error(path, e))?;
        let Columns([survey_col, year_col, shift_col]) =
            Columns::find(header, ["survey", "year", "shift"], path)?;

        let mut table = Self::new();
        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| csv_error(path, e))?;
            let field = |col: usize| record.get(col).unwrap_or("").trim();

            let survey = field(survey_col);
            if survey.is_empty() {
                return Err(IoError::EmptyField {
                    path: path.to_path_buf(),
                    row_index,
                    column: "survey",
                });
            }
            let raw_year = field(year_col);
            let year: i32 = raw_year.parse().map_err(|_| IoError::NonFiniteValue {
                path: path.to_path_buf(),
                row_index,
                column: "year",
                raw: raw_year.to_string(),
            })?;
            let shift = parse_finite(field(shift_col), path, row_index, "shift")?;
            table.insert(SeriesKey::new(survey), year, shift);
        }

        info!(n_corrections = table.len(), "reference corrections loaded");
        Ok(table)
    }

    /// Return a copy of `collection` with the corrections applied.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Correction`] if a corrected height is not finite.
    pub fn apply(&self, collection: &SeriesCollection) -> Result<SeriesCollection, IoError> {
        collection
            .iter()
            .map(|(survey, series)| Ok((survey.clone(), self.correct(survey, series)?)))
            .collect()
    }

    /// Return a copy of `dataset` with the corrections applied to every
    /// marker.
    ///
    /// # Errors
    ///
    /// As for [`apply`](Self::apply).
    pub fn apply_dataset(&self, dataset: &HeightDataset) -> Result<HeightDataset, IoError> {
        let markers = dataset
            .markers()
            .iter()
            .map(|(marker, surveys)| Ok((marker.clone(), self.apply(surveys)?)))
            .collect::<Result<_, IoError>>()?;
        debug!(n_corrections = self.len(), "corrections applied to input");
        Ok(HeightDataset::new(markers))
    }

    /// Return a copy of `curves` with the corrections added to the input
    /// series entries. Derived curves are left as they are.
    ///
    /// # Errors
    ///
    /// As for [`apply`](Self::apply).
    pub fn apply_curves(
        &self,
        curves: &BTreeMap<CurveKey, TzSeries>,
    ) -> Result<BTreeMap<CurveKey, TzSeries>, IoError> {
        curves
            .iter()
            .map(|(key, series)| {
                let corrected = match key.as_series() {
                    Some(survey) => self.correct(survey, series)?,
                    None => series.clone(),
                };
                Ok((key.clone(), corrected))
            })
            .collect()
    }

    /// Return a copy of `alignment` with the corrections added on top of the
    /// aligned series.
    ///
    /// `applied_shifts` keeps the policy's shifts, so
    /// [`Alignment::restore`] yields the corrected input.
    ///
    /// # Errors
    ///
    /// As for [`apply`](Self::apply).
    pub fn apply_alignment(&self, alignment: &Alignment) -> Result<Alignment, IoError> {
        Ok(Alignment {
            curves: self.apply_curves(&alignment.curves)?,
            applied_shifts: alignment.applied_shifts.clone(),
            reference_offset: alignment.reference_offset,
        })
    }

    /// Return a copy of `result` with the corrections added to the aligned
    /// series of every marker.
    ///
    /// # Errors
    ///
    /// As for [`apply`](Self::apply).
    pub fn apply_two_level(
        &self,
        result: &TwoLevelAlignment,
    ) -> Result<TwoLevelAlignment, IoError> {
        let markers = result
            .markers
            .iter()
            .map(|(marker, alignment)| Ok((marker.clone(), self.apply_alignment(alignment)?)))
            .collect::<Result<_, IoError>>()?;
        debug!(n_corrections = self.len(), "corrections applied to aligned markers");
        Ok(TwoLevelAlignment {
            markers,
            grand_median: result.grand_median.clone(),
            marker_shifts: result.marker_shifts.clone(),
            reference_offset: result.reference_offset,
        })
    }

    fn correct(&self, survey: &SeriesKey, series: &TzSeries) -> Result<TzSeries, IoError> {
        let Some(years) = self.shifts.get(survey) else {
            return Ok(series.clone());
        };
        let points: Vec<Point> = series
            .points()
            .iter()
            .map(|p| {
                let dz = year_of(p.time)
                    .and_then(|y| years.get(&y).copied())
                    .unwrap_or(0.0);
                p.shifted(dz)
            })
            .collect();
        // times are untouched, so order is preserved
        TzSeries::new(points).map_err(|e| IoError::Correction {
            survey: survey.to_string(),
            source: e,
        })
    }
}
