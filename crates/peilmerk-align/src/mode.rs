use std::fmt;
use std::str::FromStr;

use crate::error::AlignError;

/// Which curves to produce from a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AlignmentMode {
    /// The input series unchanged.
    #[default]
    Raw,
    /// Input series plus the median and every segment curve.
    AddMedian,
    /// Input series plus the merged curve of all points.
    AddMerge,
    /// Series and median shifted so the median is zero at the reference date.
    AlignMedian,
    /// Every series shifted onto the median, zero at the reference date.
    AlignAll,
    /// Like `AlignAll`, restricted to the segment around the reference date.
    AlignSegment,
}

impl AlignmentMode {
    /// All modes, in display order.
    pub const ALL: [AlignmentMode; 6] = [
        AlignmentMode::Raw,
        AlignmentMode::AddMedian,
        AlignmentMode::AddMerge,
        AlignmentMode::AlignMedian,
        AlignmentMode::AlignAll,
        AlignmentMode::AlignSegment,
    ];

    /// Name accepted by [`FromStr`].
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AlignmentMode::Raw => "raw",
            AlignmentMode::AddMedian => "add-median",
            AlignmentMode::AddMerge => "add-merge",
            AlignmentMode::AlignMedian => "median",
            AlignmentMode::AlignAll => "all",
            AlignmentMode::AlignSegment => "segment",
        }
    }
}

impl fmt::Display for AlignmentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlignmentMode {
    type Err = AlignError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == name)
            .ok_or(AlignError::UnknownMode { name })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for mode in AlignmentMode::ALL {
            assert_eq!(mode.to_string().parse::<AlignmentMode>().unwrap(), mode);
        }
    }

    #[test]
    fn parse_ignores_case_and_whitespace() {
        assert_eq!(" Add-Median ".parse::<AlignmentMode>().unwrap(), AlignmentMode::AddMedian);
    }

    #[test]
    fn unknown_name_is_rejected() {
        let err = "sideways".parse::<AlignmentMode>().unwrap_err();
        assert!(matches!(err, AlignError::UnknownMode { name } if name == "sideways"));
    }
}
