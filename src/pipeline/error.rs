//! Domain errors raised by the pipeline steps.
//!
//! IO and polars failures travel as `anyhow::Error` with context attached;
//! the variants here cover invalid parameters and data that the pipeline
//! refuses to process.

use polars::prelude::*;
use thiserror::Error;

/// Errors raised when pipeline parameters or input data are invalid.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A required column is absent from the table.
    #[error("Column '{column}' not found in dataset. Available columns: {available:?}")]
    MissingColumn {
        column: String,
        available: Vec<String>,
    },

    /// The per-category sampling fraction is outside `(0, 1]`.
    #[error("Sampling fraction must be in (0, 1], got {0}")]
    InvalidFraction(f64),

    /// The training proportion is outside `(0, 1)`.
    #[error("Train proportion must be in (0, 1), got {0}")]
    InvalidProportion(f64),

    /// Fold count below two or above the number of rows.
    #[error("Fold count must be between 2 and {rows} (row count), got {folds}")]
    InvalidFoldCount { folds: usize, rows: usize },

    /// Fold count given before the row count is known.
    #[error("Fold count must be at least 2, got {0}")]
    TooFewFolds(usize),

    /// A stored fold assignment does not match its training partition.
    #[error("Fold assignment is inconsistent: {0}")]
    InconsistentFolds(String),

    /// Rows whose genre has no entry in the label table, under the reject policy.
    #[error("{count} row(s) have genres missing from the label table: {values:?}")]
    UnmappedGenres { count: usize, values: Vec<String> },

    /// The genre-to-label table is malformed.
    #[error("Invalid genre mapping: {0}")]
    InvalidMapping(String),

    /// The table has no rows to work with.
    #[error("Dataset '{0}' has no rows")]
    EmptyDataset(String),
}

/// Look up a column, reporting the available names when it is missing.
pub fn require_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Column, PipelineError> {
    df.column(name).map_err(|_| PipelineError::MissingColumn {
        column: name.to_string(),
        available: df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_column_lists_available() {
        let df = df! {
            "genre" => ["Rap", "techno"],
            "tempo" => [120.0f64, 128.0],
        }
        .unwrap();

        assert!(require_column(&df, "genre").is_ok());

        let err = require_column(&df, "label").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("'label'"));
        assert!(msg.contains("tempo"));
    }

    #[test]
    fn test_fold_count_message() {
        let err = PipelineError::InvalidFoldCount { folds: 1, rows: 50 };
        assert_eq!(
            err.to_string(),
            "Fold count must be between 2 and 50 (row count), got 1"
        );
    }
}
