//! CSV height reader with full input validation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use peilmerk_series::{Point, SeriesKey, TzSeries};
use tracing::{debug, info, instrument};

use crate::dates::parse_days;
use crate::domain::HeightDataset;
use crate::IoError;

/// Positions of the required columns in a header.
pub(crate) struct Columns<const N: usize>(pub(crate) [usize; N]);

impl<const N: usize> Columns<N> {
    /// Locate `names` in `header`, ignoring case and surrounding whitespace.
    pub(crate) fn find(
        header: &csv::StringRecord,
        names: [&'static str; N],
        path: &Path,
    ) -> Result<Self, IoError> {
        let mut idx = [0usize; N];
        for (slot, name) in idx.iter_mut().zip(names) {
            *slot = header
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
                .ok_or_else(|| IoError::MissingColumn {
                    path: path.to_path_buf(),
                    column: name,
                })?;
        }
        Ok(Self(idx))
    }
}

pub(crate) fn csv_error(path: &Path, e: csv::Error) -> IoError {
    IoError::CsvParse {
        path: path.to_path_buf(),
        offset: e.position().map_or(0, |p| p.byte()),
        source: e,
    }
}

pub(crate) fn parse_finite(
    raw: &str,
    path: &Path,
    row_index: usize,
    column: &'static str,
) -> Result<f64, IoError> {
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(IoError::NonFiniteValue {
            path: path.to_path_buf(),
            row_index,
            column,
            raw: raw.to_string(),
        }),
    }
}

/// Reads survey heights from a long-format CSV file.
///
/// Expected CSV format:
/// - Header row required, containing `marker`, `survey`, `date` and `height`
///   in any order (names are matched case-insensitively; extra columns are
///   ignored)
/// - One row per measurement, `date` as `YYYY-MM-DD`, `height` in metres
/// - Rows may come in any order; each survey's points are sorted by date
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::MissingColumn`] | A required column is absent |
/// | [`IoError::EmptyField`] | Marker or survey cell is blank |
/// | [`IoError::InvalidDate`] | Date is not `YYYY-MM-DD` |
/// | [`IoError::NonFiniteValue`] | Height is NaN, Inf, or unparseable |
/// | [`IoError::EmptyDataset`] | Zero data rows after header |
pub struct HeightReader {
    path: PathBuf,
}

impl HeightReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Read and validate the CSV file, returning a [`HeightDataset`].
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<HeightDataset, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let header = rdr.headers().map_err(|e| csv_error(&self.path, e))?;
        let Columns([marker_col, survey_col, date_col, height_col]) = Columns::find(
            header,
            ["marker", "survey", "date", "height"],
            &self.path,
        )?;
        debug!(n_columns = header.len(), "read CSV header");

        let mut raw: BTreeMap<SeriesKey, BTreeMap<SeriesKey, Vec<Point>>> = BTreeMap::new();
        let mut n_rows = 0usize;

        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| csv_error(&self.path, e))?;
            let field = |col: usize| record.get(col).unwrap_or("").trim();

            let marker = self.non_empty(field(marker_col), row_index, "marker")?;
            let survey = self.non_empty(field(survey_col), row_index, "survey")?;
            let date = field(date_col);
            let time = parse_days(date).map_err(|_| IoError::InvalidDate {
                path: self.path.clone(),
                row_index,
                raw: date.to_string(),
            })?;
            let height = parse_finite(field(height_col), &self.path, row_index, "height")?;

            raw.entry(SeriesKey::new(marker))
                .or_default()
                .entry(SeriesKey::new(survey))
                .or_default()
                .push(Point::new(time, height));
            n_rows += 1;
        }

        if n_rows == 0 {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }

        let mut markers = BTreeMap::new();
        for (marker, surveys) in raw {
            let mut collection = BTreeMap::new();
            for (survey, points) in surveys {
                let series =
                    TzSeries::from_unsorted(points).map_err(|e| IoError::InvalidSeries {
                        path: self.path.clone(),
                        marker: marker.to_string(),
                        survey: survey.to_string(),
                        source: e,
                    })?;
                collection.insert(survey, series);
            }
            markers.insert(marker, collection);
        }
        let dataset = HeightDataset::new(markers);

        info!(
            n_rows,
            n_markers = dataset.n_markers(),
            n_surveys = dataset.surveys().len(),
            "dataset loaded"
        );
        Ok(dataset)
    }

    fn non_empty<'a>(
        &self,
        value: &'a str,
        row_index: usize,
        column: &'static str,
    ) -> Result<&'a str, IoError> {
        if value.is_empty() {
            return Err(IoError::EmptyField {
                path: self.path.clone(),
                row_index,
                column,
            });
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    fn key(s: &str) -> SeriesKey {
        SeriesKey::new(s)
    }

    #[test]
    fn read_valid_two_markers() {
        let csv = "marker,survey,date,height\n\
                   pm1,nap,1990-01-01,1.50\n\
                   pm1,nap,2000-01-01,1.40\n\
                   pm1,rws,1995-06-01,1.80\n\
                   pm2,nap,1990-01-01,-0.25\n";
        let f = write_csv(csv);
        let ds = HeightReader::new(f.path()).read().unwrap();
        assert_eq!(ds.n_markers(), 2);
        assert_eq!(ds.n_points(), 4);
        let pm1 = ds.marker(&key("pm1")).unwrap();
        assert_eq!(pm1[&key("nap")].len(), 2);
        assert_eq!(pm1[&key("rws")][0].height, 1.80);
    }

    #[test]
    fn columns_in_any_order_and_case() {
        let csv = "Height,DATE,Survey,extra,Marker\n2.5,1970-01-11,nap,x,pm1\n";
        let f = write_csv(csv);
        let ds = HeightReader::new(f.path()).read().unwrap();
        let s = &ds.marker(&key("pm1")).unwrap()[&key("nap")];
        assert_eq!(s[0].time, 10.0);
        assert_eq!(s[0].height, 2.5);
    }

    #[test]
    fn rows_are_sorted_by_date() {
        let csv = "marker,survey,date,height\n\
                   pm1,nap,2000-01-01,1.0\n\
                   pm1,nap,1980-01-01,2.0\n\
                   pm1,nap,1990-01-01,3.0\n";
        let f = write_csv(csv);
        let ds = HeightReader::new(f.path()).read().unwrap();
        let s = &ds.marker(&key("pm1")).unwrap()[&key("nap")];
        let heights: Vec<f64> = s.points().iter().map(|p| p.height).collect();
        assert_eq!(heights, vec![2.0, 3.0, 1.0]);
    }

    #[test]
    fn error_file_not_found() {
        let result = HeightReader::new(Path::new("/nonexistent/heights.csv")).read();
        assert!(matches!(result, Err(IoError::FileNotFound { .. })));
    }

    #[test]
    fn error_empty_dataset() {
        let f = write_csv("marker,survey,date,height\n");
        let result = HeightReader::new(f.path()).read();
        assert!(matches!(result, Err(IoError::EmptyDataset { .. })));
    }

    #[test]
    fn error_missing_column() {
        let f = write_csv("marker,survey,height\npm1,nap,1.0\n");
        let result = HeightReader::new(f.path()).read();
        assert!(matches!(
            result,
            Err(IoError::MissingColumn { column: "date", .. })
        ));
    }

    #[test]
    fn error_invalid_date() {
        let f = write_csv("marker,survey,date,height\npm1,nap,1990-01-01,1.0\npm1,nap,31-12-1990,1.0\n");
        let result = HeightReader::new(f.path()).read();
        assert!(matches!(result, Err(IoError::InvalidDate { row_index: 1, .. })));
    }

    #[test]
    fn error_non_finite_height() {
        for bad in ["NaN", "inf", "abc", ""] {
            let f = write_csv(&format!("marker,survey,date,height\npm1,nap,1990-01-01,{bad}\n"));
            let result = HeightReader::new(f.path()).read();
            assert!(
                matches!(result, Err(IoError::NonFiniteValue { column: "height", .. })),
                "{bad}"
            );
        }
    }

    #[test]
    fn error_blank_marker() {
        let f = write_csv("marker,survey,date,height\n ,nap,1990-01-01,1.0\n");
        let result = HeightReader::new(f.path()).read();
        assert!(matches!(
            result,
            Err(IoError::EmptyField { column: "marker", .. })
        ));
    }
}
