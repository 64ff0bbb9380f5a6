//! Declarative preprocessing plan
//!
//! A [`Recipe`] records which transformations to apply without touching any
//! data. Fitting it against the training partition learns category levels
//! and centering/scaling statistics; the resulting [`FittedRecipe`] can then
//! bake any partition with those training-only parameters.

use anyhow::{Context, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use super::correlation::numeric_columns;
use super::error::require_column;
use super::labels::column_to_string_vec;
use super::loader::clean_column_name;

/// One transformation of the plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum RecipeStep {
    /// Treat an integer (or any) column as categorical
    ToCategorical { column: String },
    /// Reference-coded dummy columns, first level dropped
    OneHot { column: String },
    /// Center to mean 0 and scale to standard deviation 1
    Normalize { columns: Vec<String> },
}

/// Unfitted preprocessing plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    /// Outcome column, passed through untouched
    pub outcome: String,
    /// Identifier and bookkeeping columns, passed through untouched
    pub ignored: Vec<String>,
    pub steps: Vec<RecipeStep>,
}

/// Learned parameters of a normalized column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    pub column: String,
    pub mean: f64,
    /// Sample standard deviation (n - 1); zero for constant columns
    pub sd: f64,
}

/// One transformation with its learned parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum FittedStep {
    ToCategorical { column: String, levels: Vec<String> },
    OneHot { column: String, levels: Vec<String> },
    Normalize { stats: Vec<ColumnStats> },
}

/// Preprocessing plan fitted on a training partition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedRecipe {
    pub outcome: String,
    pub ignored: Vec<String>,
    pub steps: Vec<FittedStep>,
    /// Rows of the partition the parameters were learned from
    pub trained_rows: usize,
}

impl Recipe {
    pub fn new(outcome: &str) -> Self {
        Self {
            outcome: outcome.to_string(),
            ignored: Vec::new(),
            steps: Vec::new(),
        }
    }

    pub fn ignore(mut self, columns: &[String]) -> Self {
        self.ignored.extend(columns.iter().cloned());
        self
    }

    pub fn to_categorical(mut self, column: &str) -> Self {
        self.steps.push(RecipeStep::ToCategorical {
            column: column.to_string(),
        });
        self
    }

    pub fn one_hot(mut self, column: &str) -> Self {
        self.steps.push(RecipeStep::OneHot {
            column: column.to_string(),
        });
        self
    }

    pub fn normalize(mut self, columns: Vec<String>) -> Self {
        self.steps.push(RecipeStep::Normalize { columns });
        self
    }

    /// The plan used by the pipeline: `categorical` becomes a categorical
    /// column and is one-hot encoded, every other numeric predictor is
    /// centered and scaled.
    pub fn default_for(
        df: &DataFrame,
        outcome: &str,
        ignored: &[String],
        categorical: &str,
    ) -> Result<Self> {
        require_column(df, categorical)?;

        let mut exclude: Vec<&str> = vec![outcome, categorical];
        exclude.extend(ignored.iter().map(|s| s.as_str()));
        let numeric = numeric_columns(df, &exclude);

        Ok(Recipe::new(outcome)
            .ignore(ignored)
            .to_categorical(categorical)
            .one_hot(categorical)
            .normalize(numeric))
    }

    /// Learn every step's parameters from `train`.
    ///
    /// Steps are fitted in order, each against the output of the previous
    /// fitted steps.
    pub fn fit(&self, train: &DataFrame) -> Result<FittedRecipe> {
        require_column(train, &self.outcome)?;

        let mut working = train.clone();
        let mut steps = Vec::with_capacity(self.steps.len());

        for step in &self.steps {
            let fitted = fit_step(step, &working)?;
            working = apply_step(&fitted, working)?;
            steps.push(fitted);
        }

        Ok(FittedRecipe {
            outcome: self.outcome.clone(),
            ignored: self.ignored.clone(),
            steps,
            trained_rows: train.height(),
        })
    }
}

impl FittedRecipe {
    /// Apply the fitted plan to a partition
    pub fn bake(&self, df: &DataFrame) -> Result<DataFrame> {
        let mut out = df.clone();
        for step in &self.steps {
            out = apply_step(step, out)?;
        }
        Ok(out)
    }
}

/// Sorted distinct non-null values; numeric order when every value parses
fn distinct_levels(values: &[Option<String>]) -> Vec<String> {
    let mut levels: Vec<String> = values.iter().flatten().cloned().collect();
    levels.sort();
    levels.dedup();

    let parsed: Option<Vec<f64>> = levels.iter().map(|l| l.parse::<f64>().ok()).collect();
    if let Some(numbers) = parsed {
        let mut pairs: Vec<(f64, String)> = numbers.into_iter().zip(levels).collect();
        pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        levels = pairs.into_iter().map(|(_, l)| l).collect();
    }

    levels
}

fn float_values(df: &DataFrame, column: &str) -> Result<Vec<Option<f64>>> {
    let col = require_column(df, column)?;
    let cast = col
        .cast(&DataType::Float64)
        .with_context(|| format!("Column '{}' is not numeric", column))?;
    Ok(cast.f64()?.into_iter().collect())
}

fn column_stats(column: &str, values: &[Option<f64>]) -> ColumnStats {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    let n = present.len();
    let mean = if n == 0 {
        0.0
    } else {
        present.iter().sum::<f64>() / n as f64
    };
    let sd = if n < 2 {
        0.0
    } else {
        (present.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / (n - 1) as f64).sqrt()
    };

    ColumnStats {
        column: column.to_string(),
        mean,
        sd,
    }
}

fn fit_step(step: &RecipeStep, df: &DataFrame) -> Result<FittedStep> {
    let fitted = match step {
        RecipeStep::ToCategorical { column } => FittedStep::ToCategorical {
            column: column.clone(),
            levels: distinct_levels(&column_to_string_vec(require_column(df, column)?)?),
        },
        RecipeStep::OneHot { column } => FittedStep::OneHot {
            column: column.clone(),
            levels: distinct_levels(&column_to_string_vec(require_column(df, column)?)?),
        },
        RecipeStep::Normalize { columns } => {
            let stats = columns
                .iter()
                .map(|column| Ok(column_stats(column, &float_values(df, column)?)))
                .collect::<Result<Vec<_>>>()?;
            FittedStep::Normalize { stats }
        }
    };

    Ok(fitted)
}

fn apply_step(step: &FittedStep, mut df: DataFrame) -> Result<DataFrame> {
    match step {
        FittedStep::ToCategorical { column, levels } => {
            let values = column_to_string_vec(require_column(&df, column)?)?;
            let mut unseen = 0usize;
            let categorical: Vec<Option<String>> = values
                .into_iter()
                .map(|v| match v {
                    Some(level) if levels.contains(&level) => Some(level),
                    Some(_) => {
                        unseen += 1;
                        None
                    }
                    None => None,
                })
                .collect();
            if unseen > 0 {
                log::warn!(
                    "{} value(s) of '{}' were not seen during fitting and became null",
                    unseen,
                    column
                );
            }
            df.with_column(Column::new(column.as_str().into(), categorical))?;
        }
        FittedStep::OneHot { column, levels } => {
            let values = column_to_string_vec(require_column(&df, column)?)?;
            df = df
                .drop(column)
                .with_context(|| format!("Failed to replace '{}' with dummies", column))?;
            for level in levels.iter().skip(1) {
                let name = clean_column_name(&format!("{}_{}", column, level));
                let dummy: Vec<Option<f64>> = values
                    .iter()
                    .map(|v| v.as_ref().map(|v| if v == level { 1.0 } else { 0.0 }))
                    .collect();
                df.with_column(Column::new(name.into(), dummy))?;
            }
        }
        FittedStep::Normalize { stats } => {
            for stat in stats {
                let values = float_values(&df, &stat.column)?;
                let scaled: Vec<Option<f64>> = values
                    .iter()
                    .map(|v| {
                        v.map(|x| {
                            let centered = x - stat.mean;
                            if stat.sd > 0.0 {
                                centered / stat.sd
                            } else {
                                centered
                            }
                        })
                    })
                    .collect();
                df.with_column(Column::new(stat.column.as_str().into(), scaled))?;
            }
        }
    }

    Ok(df)
}
