//! Domain types for peilmerk-io.

use std::collections::{BTreeMap, BTreeSet};

use peilmerk_series::{SeriesCollection, SeriesKey};

use crate::IoError;

/// A validated run name for output file naming.
///
/// Must match `[a-zA-Z0-9_-]+`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunName(String);

impl RunName {
    /// Parse and validate a run name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidRunName`] if the name is empty or contains
    /// characters outside `[a-zA-Z0-9_-]`.
    pub fn new(name: String) -> Result<Self, IoError> {
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(IoError::InvalidRunName { name });
        }
        Ok(Self(name))
    }

    /// Return the run name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RunName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Height measurements of many markers, each holding one series per survey.
///
/// Produced by [`HeightReader`](crate::HeightReader).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeightDataset {
    markers: BTreeMap<SeriesKey, SeriesCollection>,
}

impl HeightDataset {
    /// Wrap a marker map.
    #[must_use]
    pub fn new(markers: BTreeMap<SeriesKey, SeriesCollection>) -> Self {
        Self { markers }
    }

    /// Return every marker with its survey series.
    #[must_use]
    pub fn markers(&self) -> &BTreeMap<SeriesKey, SeriesCollection> {
        &self.markers
    }

    /// Return the surveys of one marker.
    #[must_use]
    pub fn marker(&self, key: &SeriesKey) -> Option<&SeriesCollection> {
        self.markers.get(key)
    }

    /// Return the distinct survey names over all markers.
    #[must_use]
    pub fn surveys(&self) -> BTreeSet<&SeriesKey> {
        self.markers.values().flat_map(|c| c.keys()).collect()
    }

    /// Return the number of markers.
    #[must_use]
    pub fn n_markers(&self) -> usize {
        self.markers.len()
    }

    /// Return the number of points over all series.
    #[must_use]
    pub fn n_points(&self) -> usize {
        self.markers
            .values()
            .flat_map(|c| c.values())
            .map(|s| s.len())
            .sum()
    }

    /// Consume and return the marker map.
    #[must_use]
    pub fn into_markers(self) -> BTreeMap<SeriesKey, SeriesCollection> {
        self.markers
    }
}
