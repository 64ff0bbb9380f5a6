//! Per-category down-sampling
//!
//! Every category except the protected one is reduced to a uniform random
//! `floor(count * fraction)` subset drawn without replacement. The protected
//! category passes through untouched. Categories are visited in sorted order
//! with a single RNG seeded from the configured seed, so a fixed seed always
//! selects the same rows.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use super::error::{require_column, PipelineError};
use super::labels::column_to_string_vec;

/// Parameters of the class-balancing sampler
#[derive(Debug, Clone)]
pub struct SamplerConfig {
    /// Fraction of each non-protected category to keep, in `(0, 1]`
    pub fraction: f64,
    /// Category value kept in full
    pub protected: Option<String>,
    /// RNG seed
    pub seed: u64,
}

/// Per-category outcome of the sampler
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategorySample {
    /// Category value (`None` for rows with a null category)
    pub category: Option<String>,
    /// Rows before sampling
    pub original: usize,
    /// Rows kept
    pub kept: usize,
    /// Whether the category was passed through unchanged
    pub protected: bool,
}

impl CategorySample {
    /// Category value for display, with nulls shown as `<null>`
    pub fn display_name(&self) -> &str {
        self.category.as_deref().unwrap_or("<null>")
    }
}

/// Absorbs representation error in `count * fraction` (0.7 * 90 is 62.99..)
const FLOOR_TOLERANCE: f64 = 1e-9;

/// Number of rows kept from a category of `count` rows: `floor(count * fraction)`
pub fn sample_size(count: usize, fraction: f64) -> usize {
    ((count as f64 * fraction) + FLOOR_TOLERANCE).floor() as usize
}

/// Select the row indices to keep, grouped by category.
///
/// Returns a keep-mask over all rows and the per-category statistics in
/// sorted category order.
pub fn select_rows(
    categories: &[Option<String>],
    config: &SamplerConfig,
) -> Result<(Vec<bool>, Vec<CategorySample>)> {
    if !(config.fraction > 0.0 && config.fraction <= 1.0) {
        return Err(PipelineError::InvalidFraction(config.fraction).into());
    }

    let mut groups: BTreeMap<Option<&str>, Vec<usize>> = BTreeMap::new();
    for (row, category) in categories.iter().enumerate() {
        groups.entry(category.as_deref()).or_default().push(row);
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut keep = vec![false; categories.len()];
    let mut stats = Vec::with_capacity(groups.len());

    for (category, rows) in &groups {
        let protected = category.is_some() && *category == config.protected.as_deref();

        let kept = if protected {
            for &row in rows {
                keep[row] = true;
            }
            rows.len()
        } else {
            let n = sample_size(rows.len(), config.fraction);
            for i in rand::seq::index::sample(&mut rng, rows.len(), n).iter() {
                keep[rows[i]] = true;
            }
            n
        };

        log::debug!(
            "Category {:?}: kept {} of {} rows{}",
            category,
            kept,
            rows.len(),
            if protected { " (protected)" } else { "" }
        );

        stats.push(CategorySample {
            category: category.map(|c| c.to_string()),
            original: rows.len(),
            kept,
            protected,
        });
    }

    if let Some(protected) = &config.protected {
        if !groups.contains_key(&Some(protected.as_str())) {
            log::warn!("Protected category '{}' does not occur in the data", protected);
        }
    }

    Ok((keep, stats))
}

/// Down-sample every non-protected category of `column`.
///
/// Rows keep their source order in the result.
pub fn rebalance(
    df: &DataFrame,
    column: &str,
    config: &SamplerConfig,
) -> Result<(DataFrame, Vec<CategorySample>)> {
    let categories = column_to_string_vec(require_column(df, column)?)?;
    let (keep, stats) = select_rows(&categories, config)?;

    let mask = BooleanChunked::from_slice("mask".into(), &keep);
    let sampled = df
        .filter(&mask)
        .with_context(|| format!("Failed to sample rows by '{}'", column))?;

    Ok((sampled, stats))
}
