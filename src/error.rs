//! Crate-level error type.

use crate::units::UnitId;
use thiserror::Error;

/// Errors raised while validating inputs or building results.
///
/// Every error is raised before any output is produced; callers never see a
/// partially filled result.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AlignError {
    #[error("events and event_labels must be the same length ({labels} labels for {events} events)")]
    LengthMismatch { labels: usize, events: usize },

    #[error("unit id {0} not found in input")]
    KeyNotFound(UnitId),

    #[error("invalid window [{start}, {end}): end must be >= start and both finite")]
    InvalidWindow { start: f64, end: f64 },

    #[error(
        "bin width must be finite, positive and give at most {} bins, got {0}",
        crate::binning::MAX_BINS
    )]
    InvalidBinWidth(f64),

    #[error("table has no field named `{field}`")]
    MissingField { field: String },

    #[error("table field `{field}` does not hold timestamp series")]
    FieldType { field: String },

    #[error("column `{column}` has {found} rows, expected {expected}")]
    ColumnLength {
        column: String,
        expected: usize,
        found: usize,
    },

    #[error("column `{0}` not found")]
    ColumnNotFound(String),

    #[error("duplicate key `{0}`")]
    DuplicateKey(String),

    #[error("axis `{axis}` has {found} coordinates, array dimension is {expected}")]
    ShapeMismatch {
        axis: String,
        expected: usize,
        found: usize,
    },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Crate result alias.
pub type Result<T> = std::result::Result<T, AlignError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_mismatch_message() {
        let err = AlignError::LengthMismatch {
            labels: 5,
            events: 10,
        };
        assert!(err
            .to_string()
            .contains("events and event_labels must be the same length"));
    }

    #[test]
    fn test_key_not_found_names_unit() {
        let err = AlignError::KeyNotFound(UnitId::from("ch7"));
        assert_eq!(err.to_string(), "unit id ch7 not found in input");
        let err = AlignError::KeyNotFound(UnitId::Int(3));
        assert_eq!(err.to_string(), "unit id 3 not found in input");
    }
}
