//! Coarse label derivation
//!
//! Collapses the fine-grained genre column into a two-valued label through a
//! fixed lookup table. Genres absent from the table are handled according to
//! an explicit [`UnmappedPolicy`].

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Context, Result};
use clap::ValueEnum;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use super::error::{require_column, PipelineError};

/// Genres of the electronic playlists in the Spotify export
const ELECTRONIC_GENRES: [&str; 7] = [
    "techhouse",
    "techno",
    "trance",
    "psytrance",
    "trap",
    "dnb",
    "hardstyle",
];

/// Genres of the rap/hip-hop playlists (including Pop, Emo and RnB)
const RAP_GENRES: [&str; 8] = [
    "Dark Trap",
    "Underground Rap",
    "Trap Metal",
    "Emo",
    "Rap",
    "RnB",
    "Pop",
    "Hiphop",
];

/// Lookup table from coarse label to the genres it covers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GenreMapping {
    groups: BTreeMap<String, Vec<String>>,
}

impl Default for GenreMapping {
    fn default() -> Self {
        let mut groups = BTreeMap::new();
        groups.insert(
            "electronic".to_string(),
            ELECTRONIC_GENRES.iter().map(|g| g.to_string()).collect(),
        );
        groups.insert(
            "rap".to_string(),
            RAP_GENRES.iter().map(|g| g.to_string()).collect(),
        );
        Self { groups }
    }
}

impl GenreMapping {
    /// Build a mapping from `(label, genres)` groups
    pub fn new(groups: BTreeMap<String, Vec<String>>) -> Self {
        Self { groups }
    }

    /// The coarse label for a genre, or `None` if the genre is not in the table
    pub fn lookup(&self, genre: &str) -> Option<&str> {
        self.groups
            .iter()
            .find(|(_, genres)| genres.iter().any(|g| g == genre))
            .map(|(label, _)| label.as_str())
    }

    /// Coarse labels in sorted order
    pub fn labels(&self) -> Vec<&str> {
        self.groups.keys().map(|s| s.as_str()).collect()
    }

    /// Number of genres covered by the table
    pub fn genre_count(&self) -> usize {
        self.groups.values().map(|g| g.len()).sum()
    }

    /// Check the table describes a function onto exactly two labels
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.groups.len() != 2 {
            return Err(PipelineError::InvalidMapping(format!(
                "expected exactly 2 coarse labels, found {}",
                self.groups.len()
            )));
        }

        let mut seen: BTreeSet<&str> = BTreeSet::new();
        for (label, genres) in &self.groups {
            if genres.is_empty() {
                return Err(PipelineError::InvalidMapping(format!(
                    "label '{}' covers no genres",
                    label
                )));
            }
            for genre in genres {
                if !seen.insert(genre.as_str()) {
                    return Err(PipelineError::InvalidMapping(format!(
                        "genre '{}' is assigned to more than one label",
                        genre
                    )));
                }
            }
        }

        Ok(())
    }
}

/// What to do with rows whose genre has no entry in the lookup table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum UnmappedPolicy {
    /// Fail the run, listing the unmapped genres
    Reject,
    /// Keep the rows with a null label and log a warning
    Warn,
    /// Remove the rows and log a warning
    #[default]
    Drop,
}

impl std::fmt::Display for UnmappedPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnmappedPolicy::Reject => write!(f, "reject"),
            UnmappedPolicy::Warn => write!(f, "warn"),
            UnmappedPolicy::Drop => write!(f, "drop"),
        }
    }
}

/// Outcome of label derivation
#[derive(Debug, Clone, Default, Serialize)]
pub struct LabelStats {
    /// Rows per coarse label, in label order
    pub counts: Vec<(String, usize)>,
    /// Rows whose genre was not in the table (null genres included)
    pub unmapped_rows: usize,
    /// Distinct unmapped genre values, sorted
    pub unmapped_values: Vec<String>,
    /// Whether the unmapped rows were removed from the output
    pub dropped_unmapped: bool,
}

/// Convert a column to a Vec of Option<String> for comparison
pub fn column_to_string_vec(col: &Column) -> Result<Vec<Option<String>>> {
    let values: Vec<Option<String>> = match col.dtype() {
        DataType::String => col
            .str()?
            .into_iter()
            .map(|v| v.map(|s| s.to_string()))
            .collect(),
        DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64 => {
            let cast = col.cast(&DataType::Int64)?;
            cast.i64()?
                .into_iter()
                .map(|v| v.map(|n| n.to_string()))
                .collect()
        }
        DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64 => {
            let cast = col.cast(&DataType::UInt64)?;
            cast.u64()?
                .into_iter()
                .map(|v| v.map(|n| n.to_string()))
                .collect()
        }
        DataType::Float32 | DataType::Float64 => {
            let cast = col.cast(&DataType::Float64)?;
            cast.f64()?
                .into_iter()
                .map(|v| v.map(|n| format!("{}", n)))
                .collect()
        }
        DataType::Boolean => col
            .bool()?
            .into_iter()
            .map(|v| v.map(|b| b.to_string()))
            .collect(),
        _ => {
            // For other types, try to cast to string
            let cast = col.cast(&DataType::String)?;
            cast.str()?
                .into_iter()
                .map(|v| v.map(|s| s.to_string()))
                .collect()
        }
    };

    Ok(values)
}

/// Map every genre value through the table.
///
/// Returns one entry per row: `Some(label)` for known genres, `None` for
/// unknown or null genres.
pub fn create_label_values(
    df: &DataFrame,
    genre_column: &str,
    mapping: &GenreMapping,
) -> Result<Vec<Option<String>>> {
    let genre_col = require_column(df, genre_column)?;
    let genres = column_to_string_vec(genre_col)?;

    Ok(genres
        .iter()
        .map(|g| {
            g.as_deref()
                .and_then(|genre| mapping.lookup(genre))
                .map(|label| label.to_string())
        })
        .collect())
}

/// Add the coarse label column derived from the genre column.
///
/// Unmapped rows are rejected, kept with a null label, or removed depending
/// on `policy`.
pub fn derive_labels(
    df: &DataFrame,
    genre_column: &str,
    label_column: &str,
    mapping: &GenreMapping,
    policy: UnmappedPolicy,
) -> Result<(DataFrame, LabelStats)> {
    mapping.validate()?;

    let genre_col = require_column(df, genre_column)?;
    let genres = column_to_string_vec(genre_col)?;
    let labels = create_label_values(df, genre_column, mapping)?;

    let mut unmapped_values: BTreeSet<String> = BTreeSet::new();
    let mut unmapped_rows = 0usize;
    for (genre, label) in genres.iter().zip(labels.iter()) {
        if label.is_none() {
            unmapped_rows += 1;
            unmapped_values.insert(genre.clone().unwrap_or_else(|| "<null>".to_string()));
        }
    }
    let unmapped_values: Vec<String> = unmapped_values.into_iter().collect();

    if unmapped_rows > 0 {
        match policy {
            UnmappedPolicy::Reject => {
                return Err(PipelineError::UnmappedGenres {
                    count: unmapped_rows,
                    values: unmapped_values,
                }
                .into());
            }
            UnmappedPolicy::Warn => log::warn!(
                "{} row(s) have unmapped genres {:?}; keeping them with a null label",
                unmapped_rows,
                unmapped_values
            ),
            UnmappedPolicy::Drop => log::warn!(
                "{} row(s) have unmapped genres {:?}; dropping them",
                unmapped_rows,
                unmapped_values
            ),
        }
    }

    let mut labeled = df.clone();
    labeled
        .with_column(Column::new(label_column.into(), labels.clone()))
        .with_context(|| format!("Failed to add label column '{}'", label_column))?;

    let dropped_unmapped = unmapped_rows > 0 && policy == UnmappedPolicy::Drop;
    if dropped_unmapped {
        let keep: Vec<bool> = labels.iter().map(|l| l.is_some()).collect();
        let mask = BooleanChunked::from_slice("mask".into(), &keep);
        labeled = labeled
            .filter(&mask)
            .context("Failed to drop rows with unmapped genres")?;
    }

    let counts: Vec<(String, usize)> = mapping
        .labels()
        .into_iter()
        .map(|label| {
            let n = labels
                .iter()
                .filter(|l| l.as_deref() == Some(label))
                .count();
            (label.to_string(), n)
        })
        .collect();

    Ok((
        labeled,
        LabelStats {
            counts,
            unmapped_rows,
            unmapped_values,
            dropped_unmapped,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_df() -> DataFrame {
        df! {
            "genre" => ["Rap", "techno", "Pop", "dnb", "polka", "Emo"],
            "tempo" => [90.0f64, 128.0, 100.0, 174.0, 110.0, 140.0],
        }
        .unwrap()
    }

    #[test]
    fn test_default_mapping_covers_fifteen_genres() {
        let mapping = GenreMapping::default();
        assert_eq!(mapping.genre_count(), 15);
        assert_eq!(mapping.labels(), vec!["electronic", "rap"]);
        assert!(mapping.validate().is_ok());
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        let mapping = GenreMapping::default();
        assert_eq!(mapping.lookup("trap"), Some("electronic"));
        assert_eq!(mapping.lookup("Dark Trap"), Some("rap"));
        assert_eq!(mapping.lookup("Trap"), None);
    }

    #[test]
    fn test_validate_rejects_overlap() {
        let mut groups = BTreeMap::new();
        groups.insert("a".to_string(), vec!["x".to_string(), "y".to_string()]);
        groups.insert("b".to_string(), vec!["y".to_string()]);
        let err = GenreMapping::new(groups).validate().unwrap_err();
        assert!(err.to_string().contains("'y'"));
    }

    #[test]
    fn test_validate_rejects_three_labels() {
        let mut groups = BTreeMap::new();
        for label in ["a", "b", "c"] {
            groups.insert(label.to_string(), vec![format!("{}-genre", label)]);
        }
        assert!(GenreMapping::new(groups).validate().is_err());
    }

    #[test]
    fn test_derive_labels_drop_policy() {
        let df = create_test_df();
        let (labeled, stats) = derive_labels(
            &df,
            "genre",
            "coarse_genre",
            &GenreMapping::default(),
            UnmappedPolicy::Drop,
        )
        .unwrap();

        assert_eq!(labeled.height(), 5);
        assert_eq!(stats.unmapped_rows, 1);
        assert_eq!(stats.unmapped_values, vec!["polka".to_string()]);
        assert!(stats.dropped_unmapped);
        assert_eq!(
            stats.counts,
            vec![("electronic".to_string(), 2), ("rap".to_string(), 3)]
        );
        assert_eq!(labeled.column("coarse_genre").unwrap().null_count(), 0);
    }

    #[test]
    fn test_derive_labels_warn_policy_keeps_null() {
        let df = create_test_df();
        let (labeled, stats) = derive_labels(
            &df,
            "genre",
            "coarse_genre",
            &GenreMapping::default(),
            UnmappedPolicy::Warn,
        )
        .unwrap();

        assert_eq!(labeled.height(), 6);
        assert!(!stats.dropped_unmapped);
        let labels = column_to_string_vec(labeled.column("coarse_genre").unwrap()).unwrap();
        assert_eq!(labels[4], None);
        assert_eq!(labels[0].as_deref(), Some("rap"));
    }

    #[test]
    fn test_derive_labels_reject_policy() {
        let df = create_test_df();
        let result = derive_labels(
            &df,
            "genre",
            "coarse_genre",
            &GenreMapping::default(),
            UnmappedPolicy::Reject,
        );

        let msg = result.unwrap_err().to_string();
        assert!(msg.contains("polka"), "unexpected message: {}", msg);
    }

    #[test]
    fn test_missing_genre_column() {
        let df = create_test_df();
        let result = derive_labels(
            &df,
            "playlist_genre",
            "coarse_genre",
            &GenreMapping::default(),
            UnmappedPolicy::Drop,
        );
        assert!(result.unwrap_err().to_string().contains("playlist_genre"));
    }

    #[test]
    fn test_column_to_string_vec_integers() {
        let df = df! { "key" => [Some(0i64), None, Some(11)] }.unwrap();
        let values = column_to_string_vec(df.column("key").unwrap()).unwrap();
        assert_eq!(values, vec![Some("0".to_string()), None, Some("11".to_string())]);
    }
}
