//! Command-line argument definitions using clap

use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser, Subcommand};

use crate::config::{parse_protected_genre, PipelineConfig};
use crate::pipeline::UnmappedPolicy;

/// trackprep - Prepare a track audio-feature dataset for genre classification
#[derive(Parser, Debug)]
#[command(name = "trackprep")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Input file path (CSV or Parquet)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Directory for the resampled CSV, the EDA report and the bundle.
    /// Defaults to the input file's directory.
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// TOML file with pipeline parameters. Flags below override it.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Random seed for sampling, splitting and fold assignment
    #[arg(long)]
    pub seed: Option<u64>,

    /// Fraction of each non-protected genre to keep (0, 1]
    #[arg(long, value_parser = validate_fraction)]
    pub sample_fraction: Option<f64>,

    /// Genre kept in full by the sampler. Use "none" to sample every genre.
    #[arg(long)]
    pub protected_genre: Option<String>,

    /// Share of rows in the training partition (0, 1)
    #[arg(long, value_parser = validate_proportion)]
    pub train_prop: Option<f64>,

    /// Number of cross-validation folds over the training partition
    #[arg(long, value_parser = validate_folds)]
    pub folds: Option<usize>,

    /// Bins per predictor in the frequency tables
    #[arg(long)]
    pub bins: Option<usize>,

    /// Handling of genres missing from the label table
    #[arg(long, value_enum)]
    pub unmapped: Option<UnmappedPolicy>,

    /// Columns to drop after loading (comma-separated, names after cleaning).
    /// Replaces the default drop list.
    #[arg(long, value_delimiter = ',')]
    pub drop_columns: Option<Vec<String>>,

    /// Number of rows to use for schema inference (CSV only).
    /// Use 0 for full table scan.
    #[arg(long, default_value = "10000")]
    pub infer_schema_length: usize,

    /// Skip interactive confirmation prompts
    #[arg(long, default_value = "false")]
    pub no_confirm: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print class counts, correlations and frequency tables without
    /// sampling or writing anything
    Describe {
        /// Input file path (CSV or Parquet)
        input: PathBuf,

        /// Also write the report as JSON to this path
        #[arg(long)]
        json: Option<PathBuf>,

        /// Number of rows to use for schema inference.
        /// Use 0 for full table scan.
        #[arg(long, default_value = "10000")]
        infer_schema_length: usize,
    },
}

impl Cli {
    /// Get the input path, if given
    pub fn input(&self) -> Option<&PathBuf> {
        self.input.as_ref()
    }

    /// Get the output directory: the explicit one, else the input's directory.
    pub fn output_dir(&self) -> Option<PathBuf> {
        if let Some(dir) = &self.output_dir {
            return Some(dir.clone());
        }
        let input = self.input.as_ref()?;
        Some(
            input
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."))
                .to_path_buf(),
        )
    }

    /// Log level selected by the `-v` count
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }

    /// Overwrite config values with the flags given on the command line
    pub fn apply_overrides(&self, config: &mut PipelineConfig) {
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(fraction) = self.sample_fraction {
            config.sample_fraction = fraction;
        }
        if let Some(genre) = &self.protected_genre {
            config.protected_genre = parse_protected_genre(genre);
        }
        if let Some(prop) = self.train_prop {
            config.train_prop = prop;
        }
        if let Some(folds) = self.folds {
            config.folds = folds;
        }
        if let Some(bins) = self.bins {
            config.bins = bins;
        }
        if let Some(policy) = self.unmapped {
            config.unmapped = policy;
        }
        if let Some(columns) = &self.drop_columns {
            config.drop_columns = columns
                .iter()
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect();
        }
    }
}

/// Validator for sample_fraction parameter
fn validate_fraction(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;

    if value > 0.0 && value <= 1.0 {
        Ok(value)
    } else {
        Err(format!(
            "sample_fraction must be in (0.0, 1.0], got {}",
            value
        ))
    }
}

/// Validator for train_prop parameter
fn validate_proportion(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;

    if value > 0.0 && value < 1.0 {
        Ok(value)
    } else {
        Err(format!("train_prop must be in (0.0, 1.0), got {}", value))
    }
}

/// Validator for folds parameter
fn validate_folds(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid fold count", s))?;

    if value >= 2 {
        Ok(value)
    } else {
        Err(format!("folds must be at least 2, got {}", value))
    }
}
