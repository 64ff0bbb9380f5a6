//! Pipeline configuration
//!
//! Every parameter has a default; an optional TOML file can override any of
//! them, and command-line flags override the file.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::pipeline::{GenreMapping, PipelineError, UnmappedPolicy};

/// Columns of the Spotify export that carry no information for
/// classification (identifiers, URLs, and the mostly-empty `title`)
const DEFAULT_DROP_COLUMNS: [&str; 7] = [
    "type",
    "id",
    "uri",
    "track_href",
    "analysis_url",
    "title",
    "unnamed_0",
];

/// Value that turns off genre protection, in the config file and on the CLI
pub const NO_PROTECTED_GENRE: &str = "none";

/// Parse a protected-genre setting; `none` (any case) disables protection
pub fn parse_protected_genre(value: &str) -> Option<String> {
    let value = value.trim();
    if value.eq_ignore_ascii_case(NO_PROTECTED_GENRE) {
        None
    } else {
        Some(value.to_string())
    }
}

fn deserialize_protected_genre<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.as_deref().and_then(parse_protected_genre))
}

fn serialize_protected_genre<S>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(value.as_deref().unwrap_or(NO_PROTECTED_GENRE))
}

/// All tunable parameters of a pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Seed shared by the sampler, the splitter and the fold dealer
    pub seed: u64,
    /// Fraction of each non-protected genre to keep
    pub sample_fraction: f64,
    /// Genre kept in full by the sampler (`"none"` in the file for no protection)
    #[serde(
        serialize_with = "serialize_protected_genre",
        deserialize_with = "deserialize_protected_genre"
    )]
    pub protected_genre: Option<String>,
    /// Share of rows in the training partition
    pub train_prop: f64,
    /// Cross-validation folds over the training partition
    pub folds: usize,
    /// Bins per predictor in the frequency tables
    pub bins: usize,
    /// Pairs above this absolute correlation are listed in the EDA report
    pub correlation_threshold: f64,
    /// Columns removed right after loading (names after cleaning)
    pub drop_columns: Vec<String>,
    /// Fine-grained category column
    pub genre_column: String,
    /// Track identifier column
    pub name_column: String,
    /// Derived coarse label column
    pub label_column: String,
    /// Integer column treated as categorical by the preprocessing plan
    pub categorical_column: String,
    /// Handling of genres missing from the label table
    pub unmapped: UnmappedPolicy,
    /// Coarse label -> genres
    pub labels: GenreMapping,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            seed: 123,
            sample_fraction: 0.25,
            protected_genre: Some("Pop".to_string()),
            train_prop: 0.7,
            folds: 10,
            bins: 10,
            correlation_threshold: 0.75,
            drop_columns: DEFAULT_DROP_COLUMNS.iter().map(|s| s.to_string()).collect(),
            genre_column: "genre".to_string(),
            name_column: "song_name".to_string(),
            label_column: "coarse_genre".to_string(),
            categorical_column: "key".to_string(),
            unmapped: UnmappedPolicy::default(),
            labels: GenreMapping::default(),
        }
    }
}

impl PipelineConfig {
    /// Load a config file, or the defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            log::debug!("No config file given, using defaults");
            return Ok(Self::default());
        };

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: PipelineConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        log::info!("Loaded config from {}", path.display());

        Ok(config)
    }

    /// Check parameter ranges and the label table
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !(self.sample_fraction > 0.0 && self.sample_fraction <= 1.0) {
            return Err(PipelineError::InvalidFraction(self.sample_fraction));
        }
        if !(self.train_prop > 0.0 && self.train_prop < 1.0) {
            return Err(PipelineError::InvalidProportion(self.train_prop));
        }
        if self.folds < 2 {
            return Err(PipelineError::TooFewFolds(self.folds));
        }
        self.labels.validate()
    }

    /// Columns carried through preprocessing without transformation
    pub fn ignored_columns(&self) -> Vec<String> {
        vec![self.name_column.clone(), self.genre_column.clone()]
    }
}
